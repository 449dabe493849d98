//! Retry policy and the validated-generation loop shared by matching and email generation.
//!
//! Order of recovery for one logical call:
//! 1. transient provider errors (timeout, rate limit) → backoff and retry, up to `max_retries`
//! 2. schema violation → exactly one corrective retry with `STRICT_JSON_RETRY` appended
//! 3. provider unavailable → one failover to `fallback`, if set and different from the primary

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::prompts::STRICT_JSON_RETRY;
use super::{
    GenerationParams, LlmProvider, ProviderError, ProviderKind, ProviderRegistry, ProviderRequest,
    ProviderResponse,
};
use crate::validator::ValidationError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Passed explicitly into every orchestrated call so tests can simulate
/// exhaustion deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt for timeouts and rate limits.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub fallback: Option<ProviderKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            fallback: None,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: ProviderKind) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Delay before retry number `attempt` (1-based): `base · 2^(attempt−1)`,
    /// or the server's `Retry-After` hint when one was given. Capped at `max_delay`.
    pub fn backoff(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let computed = hint.unwrap_or_else(|| {
            let factor = 1u32 << attempt.saturating_sub(1).min(16);
            self.base_delay.saturating_mul(factor)
        });
        computed.min(self.max_delay)
    }
}

/// Root cause of a failed orchestrated call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallFailure {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One provider call bounded by the adapter's timeout, retried with backoff on
/// timeouts and rate limits. Unavailability is returned immediately.
pub async fn call_with_backoff(
    provider: &dyn LlmProvider,
    request: &ProviderRequest,
    policy: &RetryPolicy,
) -> Result<ProviderResponse, ProviderError> {
    let mut attempt = 0;

    loop {
        let limit = provider.call_timeout();
        let result = match tokio::time::timeout(limit, provider.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: provider.kind(),
                elapsed: limit,
            }),
        };

        match result {
            Ok(response) => {
                if let Some(usage) = response.usage {
                    debug!(
                        "{} call succeeded: model={}, input_tokens={}, output_tokens={}",
                        response.provider, response.model_id, usage.input_tokens, usage.output_tokens
                    );
                }
                return Ok(response);
            }
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff(attempt, err.retry_after());
                warn!(
                    "{} (attempt {}/{}), retrying after {}ms...",
                    err,
                    attempt,
                    policy.max_retries + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Calls the requested provider and validates the reply with `validate`,
/// applying the corrective retry and failover rules described above.
pub async fn generate_validated<T, F>(
    registry: &ProviderRegistry,
    request: &ProviderRequest,
    policy: &RetryPolicy,
    validate: F,
) -> Result<T, CallFailure>
where
    F: Fn(&str) -> Result<T, ValidationError>,
{
    let primary = request.provider;

    match attempt_provider(registry, request, policy, &validate).await {
        Err(CallFailure::Provider(err @ ProviderError::Unavailable { .. })) => {
            match policy.fallback.filter(|fallback| *fallback != primary) {
                Some(fallback) => {
                    warn!("{err}; failing over to {fallback}");
                    attempt_provider(registry, &request.rerouted(fallback), policy, &validate).await
                }
                None => Err(err.into()),
            }
        }
        other => other,
    }
}

async fn attempt_provider<T, F>(
    registry: &ProviderRegistry,
    request: &ProviderRequest,
    policy: &RetryPolicy,
    validate: &F,
) -> Result<T, CallFailure>
where
    F: Fn(&str) -> Result<T, ValidationError>,
{
    let provider = registry.get(request.provider)?;
    let native_json;
    let request = if request.params.force_json && !provider.supports_json_mode() {
        debug!(
            "{} ({}) has no native JSON mode; relying on the prompt instruction",
            provider.kind(),
            provider.model_id()
        );
        native_json = ProviderRequest {
            params: GenerationParams {
                force_json: false,
                ..request.params
            },
            ..request.clone()
        };
        &native_json
    } else {
        request
    };

    let response = call_with_backoff(provider.as_ref(), request, policy).await?;
    if !response.success {
        warn!("{} reported incomplete output; validating what was returned", response.provider);
    }

    match validate(&response.text) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(
                "{} reply failed validation ({}); retrying once with strict JSON instruction",
                response.provider, err
            );
            let strict = request.with_prompt(format!("{}\n\n{}", request.prompt, STRICT_JSON_RETRY));
            let response = call_with_backoff(provider.as_ref(), &strict, policy).await?;
            validate(&response.text).map_err(CallFailure::from)
        }
    }
}
