use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::llm_client::gemini::{GEMINI_API_BASE, GEMINI_DEFAULT_MODEL};
use crate::llm_client::ollama::{OLLAMA_DEFAULT_ENDPOINT, OLLAMA_DEFAULT_MODEL};
use crate::llm_client::openai::{GROQ_CHAT_URL, GROQ_DEFAULT_MODEL, OPENAI_CHAT_URL, OPENAI_DEFAULT_MODEL};
use crate::llm_client::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES};
use crate::llm_client::ProviderKind;
use crate::matching::batch::DEFAULT_POOL_SIZE;
use crate::matching::scoring::ScoringWeights;

const DEFAULT_CLOUD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOCAL_TIMEOUT_SECS: u64 = 180;
const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 300;

/// Connection settings for one provider adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub credential: Option<String>,
    pub model_id: String,
    pub is_local: bool,
    pub timeout: Duration,
}

/// Engine-wide knobs shared by every matching and email call.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub default_provider: ProviderKind,
    pub retry: RetryPolicy,
    pub pool_size: usize,
    /// `None` when disabled (`BATCH_TIMEOUT_SECS=0`).
    pub batch_timeout: Option<Duration>,
    pub weights: ScoringWeights,
}

/// Application configuration loaded from environment variables.
/// Startup fails if any value is present but invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
    pub engine: EngineConfig,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cloud_timeout = Duration::from_secs(parse_or(&env, "CLOUD_TIMEOUT_SECS", DEFAULT_CLOUD_TIMEOUT_SECS)?);
        let local_timeout = Duration::from_secs(parse_or(&env, "LOCAL_TIMEOUT_SECS", DEFAULT_LOCAL_TIMEOUT_SECS)?);

        let mut providers = BTreeMap::new();
        for kind in ProviderKind::ALL {
            if let Some(settings) = provider_settings(&env, kind, cloud_timeout, local_timeout)? {
                providers.insert(kind, settings);
            }
        }

        let default_provider: ProviderKind = parse_or(&env, "DEFAULT_PROVIDER", ProviderKind::OpenAi)?;
        if !providers.contains_key(&default_provider) {
            bail!(
                "DEFAULT_PROVIDER '{default_provider}' is not configured (set {})",
                provider_switch(default_provider)
            );
        }

        let fallback = env("FALLBACK_PROVIDER")
            .map(|v| v.parse::<ProviderKind>())
            .transpose()
            .context("FALLBACK_PROVIDER must be one of openai, gemini, groq, ollama")?;
        if let Some(fallback) = fallback {
            if !providers.contains_key(&fallback) {
                bail!(
                    "FALLBACK_PROVIDER '{fallback}' is not configured (set {})",
                    provider_switch(fallback)
                );
            }
        }

        let retry = RetryPolicy {
            max_retries: parse_or(&env, "MATCH_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            base_delay: Duration::from_millis(parse_or(
                &env,
                "RETRY_BASE_DELAY_MS",
                DEFAULT_BASE_DELAY.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_or(
                &env,
                "RETRY_MAX_DELAY_MS",
                DEFAULT_MAX_DELAY.as_millis() as u64,
            )?),
            fallback,
        };

        let pool_size: usize = parse_or(&env, "BATCH_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            bail!("BATCH_POOL_SIZE must be at least 1");
        }

        let batch_timeout = match parse_or(&env, "BATCH_TIMEOUT_SECS", DEFAULT_BATCH_TIMEOUT_SECS)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let weights = match env("SCORE_WEIGHTS") {
            Some(raw) => raw
                .parse::<ScoringWeights>()
                .map_err(|e| anyhow!("SCORE_WEIGHTS is invalid: {e}"))?,
            None => ScoringWeights::default(),
        };

        Ok(Config {
            providers,
            engine: EngineConfig {
                default_provider,
                retry,
                pool_size,
                batch_timeout,
                weights,
            },
            port: parse_or(&env, "PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// `None` when the provider is not switched on.
fn provider_settings(
    env: &impl Fn(&str) -> Option<String>,
    kind: ProviderKind,
    cloud_timeout: Duration,
    local_timeout: Duration,
) -> Result<Option<ProviderSettings>> {
    let prefix = kind.as_str().to_uppercase();
    let model_key = format!("{prefix}_MODEL");
    let endpoint_key = format!("{prefix}_ENDPOINT");

    let (credential, default_endpoint, default_model) = match kind {
        ProviderKind::OpenAi => (env("OPENAI_API_KEY"), OPENAI_CHAT_URL, OPENAI_DEFAULT_MODEL),
        ProviderKind::Gemini => (env("GEMINI_API_KEY"), GEMINI_API_BASE, GEMINI_DEFAULT_MODEL),
        ProviderKind::Groq => (env("GROQ_API_KEY"), GROQ_CHAT_URL, GROQ_DEFAULT_MODEL),
        ProviderKind::Ollama => (None, OLLAMA_DEFAULT_ENDPOINT, OLLAMA_DEFAULT_MODEL),
    };

    let enabled = if kind.is_local() {
        parse_or(env, "OLLAMA_ENABLED", false)? || env(&endpoint_key).is_some()
    } else {
        credential.is_some()
    };
    if !enabled {
        return Ok(None);
    }

    Ok(Some(ProviderSettings {
        endpoint: env(&endpoint_key).unwrap_or_else(|| default_endpoint.to_string()),
        credential,
        model_id: env(&model_key).unwrap_or_else(|| default_model.to_string()),
        is_local: kind.is_local(),
        timeout: if kind.is_local() { local_timeout } else { cloud_timeout },
    }))
}

fn provider_switch(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Gemini => "GEMINI_API_KEY",
        ProviderKind::Groq => "GROQ_API_KEY",
        ProviderKind::Ollama => "OLLAMA_ENABLED=true or OLLAMA_ENDPOINT",
    }
}

fn parse_or<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("Environment variable '{key}' has invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}
