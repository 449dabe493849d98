//! Ollama local inference adapter (`/api/chat`, non-streaming). No credential.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::send_json;
use super::{LlmProvider, ProviderError, ProviderKind, ProviderRequest, ProviderResponse, Usage};
use crate::config::ProviderSettings;

pub const OLLAMA_DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaProvider {
    client: Client,
    chat_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            chat_url: format!("{}/api/chat", settings.endpoint.trim_end_matches('/')),
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
            stream: false,
            format: request.params.force_json.then_some("json"),
            options: ChatOptions {
                temperature: request.params.temperature,
                num_predict: request.params.max_tokens,
            },
        }
    }
}

fn into_response(model: &str, body: ChatResponse) -> ProviderResponse {
    let usage = match (body.prompt_eval_count, body.eval_count) {
        (Some(input_tokens), Some(output_tokens)) => Some(Usage {
            input_tokens,
            output_tokens,
        }),
        _ => None,
    };

    ProviderResponse {
        provider: ProviderKind::Ollama,
        model_id: model.to_string(),
        success: body.message.is_some() && body.done_reason.as_deref() != Some("length"),
        text: body.message.map(|m| m.content).unwrap_or_default(),
        usage,
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
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
        debug!("ollama chat: model={}, json={}", model, request.params.force_json);

        let http = self.client.post(&self.chat_url).json(&body);
        let response: ChatResponse = send_json(ProviderKind::Ollama, http).await?;

        Ok(into_response(&model, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::GenerationParams;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(&ProviderSettings {
            endpoint: format!("{OLLAMA_DEFAULT_ENDPOINT}/"),
            credential: None,
            model_id: OLLAMA_DEFAULT_MODEL.to_string(),
            is_local: true,
            timeout: Duration::from_secs(180),
        })
        .unwrap()
    }

    #[test]
    fn test_chat_url_is_normalised() {
        assert_eq!(provider().chat_url, "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_body_is_non_streaming_json_chat() {
        let p = provider();
        let request = ProviderRequest::new(
            ProviderKind::Ollama,
            "Return JSON only.",
            "Score this resume",
            GenerationParams::default(),
        );
        let body = serde_json::to_value(p.build_body(&request)).unwrap();

        assert_eq!(body["model"], OLLAMA_DEFAULT_MODEL);
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["num_predict"], 2000);
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "llama3.1",
            "message": {"role": "assistant", "content": "{\"overallFit\": 70}"},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 250,
            "eval_count": 30
        }"#;
        let body: ChatResponse = serde_json::from_str(raw).unwrap();
        let response = into_response(OLLAMA_DEFAULT_MODEL, body);

        assert!(response.success);
        assert_eq!(response.text, "{\"overallFit\": 70}");
        assert_eq!(response.usage.map(|u| u.input_tokens), Some(250));
    }

    #[test]
    fn test_length_cutoff_is_not_success() {
        let raw = r#"{"message": {"role": "assistant", "content": "{\"over"}, "done_reason": "length"}"#;
        let body: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(!into_response(OLLAMA_DEFAULT_MODEL, body).success);
    }
}
