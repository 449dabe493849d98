//! Google Gemini `generateContent` adapter.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::send_json;
use super::{LlmProvider, ProviderError, ProviderKind, ProviderRequest, ProviderResponse, Usage};
use crate::config::ProviderSettings;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let api_key = settings
            .credential
            .clone()
            .context("gemini requires an API key")?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model_id.clone(),
            timeout: settings.timeout,
        })
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

fn build_body(request: &ProviderRequest) -> GenerateContentRequest<'_> {
    let system_instruction = (!request.system.is_empty()).then(|| Content {
        role: None,
        parts: vec![Part {
            text: &request.system,
        }],
    });

    GenerateContentRequest {
        system_instruction,
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.params.temperature,
            max_output_tokens: request.params.max_tokens,
            response_mime_type: request.params.force_json.then_some("application/json"),
        },
    }
}

fn into_response(model: &str, body: GenerateContentResponse) -> ProviderResponse {
    let candidate = body.candidates.into_iter().next();
    // Anything but STOP means the text was cut short (MAX_TOKENS) or withheld (SAFETY).
    let success = candidate
        .as_ref()
        .map(|c| matches!(c.finish_reason.as_deref(), None | Some("STOP")))
        .unwrap_or(false);
    let text = candidate
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    ProviderResponse {
        provider: ProviderKind::Gemini,
        model_id: model.to_string(),
        text,
        success,
        usage: body.usage_metadata.map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn supports_json_mode(&self) -> bool {
        true
    }

    fn call_timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let model = request.model_id.as_deref().unwrap_or(&self.model);
        debug!("gemini generateContent: model={}, json={}", model, request.params.force_json);

        let http = self
            .client
            .post(self.url_for(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&build_body(request));
        let response: GenerateContentResponse = send_json(ProviderKind::Gemini, http).await?;

        Ok(into_response(model, response))
    }
}
