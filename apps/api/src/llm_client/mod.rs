/// LLM Client: the single point of entry for every provider call in the engine.
///
/// ARCHITECTURAL RULE: matching and email generation never talk to a provider
/// API directly. They resolve an `LlmProvider` from the `ProviderRegistry` and
/// go through `retry::generate_validated`.
///
/// Adapters are stateless and never retry. Retry, backoff and failover live in `retry`.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderSettings;

pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

// ────────────────────────────────────────────────────────────────────────────
// Provider identity
// ────────────────────────────────────────────────────────────────────────────

/// The supported backends. Selection is always by this key, never by inspecting
/// the adapter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Groq,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Local inference (no credential, longer default timeout).
    pub fn is_local(self) -> bool {
        matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown provider '{0}' (expected one of: openai, gemini, groq, ollama)")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for its native JSON mode when it has one.
    pub force_json: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2000,
            force_json: true,
        }
    }
}

/// One provider call. Lives for a single call and is never persisted.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub provider: ProviderKind,
    /// Overrides the adapter's configured model when set.
    pub model_id: Option<String>,
    pub system: String,
    pub prompt: String,
    pub params: GenerationParams,
}

impl ProviderRequest {
    pub fn new(
        provider: ProviderKind,
        system: impl Into<String>,
        prompt: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            provider,
            model_id: None,
            system: system.into(),
            prompt: prompt.into(),
            params,
        }
    }

    /// Same request with a different user prompt.
    pub fn with_prompt(&self, prompt: String) -> Self {
        Self {
            prompt,
            ..self.clone()
        }
    }

    /// Same request routed to another provider, using that provider's own model.
    pub fn rerouted(&self, provider: ProviderKind) -> Self {
        Self {
            provider,
            model_id: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub provider: ProviderKind,
    pub model_id: String,
    /// Raw reply text. Untrusted: always validated before use.
    pub text: String,
    /// False when the backend reported truncated or blocked output.
    pub success: bool,
    pub usage: Option<Usage>,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("provider {provider} unavailable: {message}")]
    Unavailable {
        provider: ProviderKind,
        message: String,
    },

    #[error("provider {provider} timed out after {}ms", .elapsed.as_millis())]
    Timeout {
        provider: ProviderKind,
        elapsed: Duration,
    },

    #[error("provider {provider} rate limited")]
    RateLimited {
        provider: ProviderKind,
        retry_after: Option<Duration>,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::Unavailable { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::RateLimited { provider, .. } => *provider,
        }
    }

    /// Timeouts and rate limits are retried with backoff; unavailability is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. } | ProviderError::RateLimited { .. }
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter trait
// ────────────────────────────────────────────────────────────────────────────

/// Uniform contract over every backend: text prompt in, text (or JSON) out.
///
/// Each call is independent. Implementations must not keep conversation state
/// and must not retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model_id(&self) -> &str;

    /// Whether the backend has a native "force JSON output" mode. Without it,
    /// `force_json` is cleared and the prompt's JSON instruction stands alone.
    fn supports_json_mode(&self) -> bool;

    /// Upper bound for one call; enforced by the caller as well as the transport.
    fn call_timeout(&self) -> Duration;

    async fn generate(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// The configured providers, keyed by `ProviderKind`. Adapters hold pooled
/// HTTP clients and are shared across concurrent matching units.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one HTTP adapter per configured provider.
    pub fn from_settings<'a>(
        settings: impl IntoIterator<Item = (&'a ProviderKind, &'a ProviderSettings)>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for (&kind, settings) in settings {
            let adapter: Arc<dyn LlmProvider> = match kind {
                ProviderKind::OpenAi | ProviderKind::Groq => Arc::new(
                    openai::OpenAiCompatibleProvider::new(kind, settings)
                        .with_context(|| format!("Failed to build {kind} adapter"))?,
                ),
                ProviderKind::Gemini => Arc::new(
                    gemini::GeminiProvider::new(settings)
                        .context("Failed to build gemini adapter")?,
                ),
                ProviderKind::Ollama => Arc::new(
                    ollama::OllamaProvider::new(settings)
                        .context("Failed to build ollama adapter")?,
                ),
            };
            registry.register(adapter);
        }
        Ok(registry)
    }

    /// Registers (or replaces) the adapter for its own `kind()`.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.register(provider);
        self
    }

    /// A provider that is not configured is reported as unavailable, which makes
    /// it eligible for failover like any other outage.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable {
                provider: kind,
                message: "provider is not configured".to_string(),
            })
    }

    pub fn configured(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::FnProvider;

    #[test]
    fn test_provider_kind_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!(" groq ".parse::<ProviderKind>(), Ok(ProviderKind::Groq));
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serde_is_lowercase() {
        let json = serde_json::to_string(&ProviderKind::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
        let kind: ProviderKind = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(kind, ProviderKind::Ollama);
        assert!(kind.is_local());
    }

    #[test]
    fn test_only_timeouts_and_rate_limits_are_transient() {
        let timeout = ProviderError::Timeout {
            provider: ProviderKind::Gemini,
            elapsed: Duration::from_secs(30),
        };
        let limited = ProviderError::RateLimited {
            provider: ProviderKind::Gemini,
            retry_after: Some(Duration::from_secs(2)),
        };
        let down = ProviderError::Unavailable {
            provider: ProviderKind::Gemini,
            message: "connection refused".to_string(),
        };
        assert!(timeout.is_transient());
        assert!(limited.is_transient());
        assert!(!down.is_transient());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_unconfigured_provider_is_unavailable() {
        let registry = ProviderRegistry::new();
        match registry.get(ProviderKind::Groq) {
            Err(ProviderError::Unavailable { provider, .. }) => {
                assert_eq!(provider, ProviderKind::Groq)
            }
            other => panic!("expected Unavailable, got {:?}", other.map(|p| p.kind())),
        }
    }

    #[test]
    fn test_registry_keys_adapters_by_kind() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(FnProvider::always(ProviderKind::Ollama, "{}")))
            .with(Arc::new(FnProvider::always(ProviderKind::Gemini, "{}")));
        assert_eq!(
            registry.configured(),
            vec![ProviderKind::Gemini, ProviderKind::Ollama]
        );
        assert!(registry.get(ProviderKind::Ollama).is_ok());
        assert!(matches!(
            registry.get(ProviderKind::OpenAi),
            Err(ProviderError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_rerouted_request_drops_model_override() {
        let mut request = ProviderRequest::new(
            ProviderKind::OpenAi,
            "system",
            "prompt",
            GenerationParams::default(),
        );
        request.model_id = Some("gpt-4o".to_string());
        let rerouted = request.rerouted(ProviderKind::Groq);
        assert_eq!(rerouted.provider, ProviderKind::Groq);
        assert!(rerouted.model_id.is_none());
        assert_eq!(rerouted.prompt, "prompt");
    }
}
