//! OpenAI-compatible chat completions adapter. Serves both `openai` and `groq`,
//! which expose the same wire format at different endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::send_json;
use super::{LlmProvider, ProviderError, ProviderKind, ProviderRequest, ProviderResponse, Usage};
use crate::config::ProviderSettings;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiCompatibleProvider {
    pub fn new(kind: ProviderKind, settings: &ProviderSettings) -> Result<Self> {
        let api_key = settings
            .credential
            .clone()
            .with_context(|| format!("{kind} requires an API key"))?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            kind,
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
            model: settings.model_id.clone(),
            timeout: settings.timeout,
        })
    }

    fn build_body<'a>(&'a self, request: &'a ProviderRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: request.model_id.as_deref().unwrap_or(&self.model),
            messages,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            response_format: request.params.force_json.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

fn into_response(kind: ProviderKind, model: &str, body: ChatResponse) -> ProviderResponse {
    let choice = body.choices.into_iter().next();
    let success = choice
        .as_ref()
        .map(|c| c.finish_reason.as_deref() != Some("length"))
        .unwrap_or(false);
    let text = choice.and_then(|c| c.message.content).unwrap_or_default();

    ProviderResponse {
        provider: kind,
        model_id: model.to_string(),
        text,
        success,
        usage: body.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
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
        let body = self.build_body(request);
        let model = body.model.to_string();
        debug!("{} chat completion: model={}, json={}", self.kind, model, request.params.force_json);

        let http = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = send_json(self.kind, http).await?;

        Ok(into_response(self.kind, &model, response))
    }
}
