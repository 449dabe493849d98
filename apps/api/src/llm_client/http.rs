//! Shared HTTP plumbing for the remote and local adapters: send, classify failures.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::{ProviderError, ProviderKind};

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Sends a prepared request and decodes the JSON envelope.
///
/// No retries here. Every failure is mapped onto the three-way
/// `ProviderError` taxonomy so the retry layer can decide what to do.
pub(crate) async fn send_json<R: DeserializeOwned>(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<R, ProviderError> {
    let started = Instant::now();

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, &e, started.elapsed()))?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        warn!("{} API returned {}: {}", provider, status, truncate(&body));
        return Err(classify_status(
            provider,
            status.as_u16(),
            &body,
            retry_after,
            started.elapsed(),
        ));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| transport_error(provider, &e, started.elapsed()))
}

fn transport_error(provider: ProviderKind, err: &reqwest::Error, elapsed: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { provider, elapsed }
    } else if err.is_decode() {
        ProviderError::Unavailable {
            provider,
            message: format!("unexpected response envelope: {err}"),
        }
    } else {
        ProviderError::Unavailable {
            provider,
            message: err.to_string(),
        }
    }
}

/// 429 → rate limited, 408/504 → timeout, anything else → unavailable.
pub(crate) fn classify_status(
    provider: ProviderKind,
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
    elapsed: Duration,
) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            provider,
            retry_after,
        },
        408 | 504 => ProviderError::Timeout { provider, elapsed },
        _ => ProviderError::Unavailable {
            provider,
            message: format!("status {status}: {}", error_message(body)),
        },
    }
}

/// Pulls `error.message` (OpenAI, Groq, Gemini) or `error` (Ollama) out of an
/// error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| v.get("error").and_then(Value::as_str))
    });
    truncate(message.unwrap_or(body)).to_string()
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
