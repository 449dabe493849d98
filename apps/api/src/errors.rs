use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::retry::CallFailure;
use crate::validator::ValidationError;

/// Failure of one matching unit, or of a whole batch before any unit started.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Too many resumes: {count} submitted, at most {max} per batch")]
    TooManyResumes { count: usize, max: usize },

    #[error("Matching failed for candidate '{candidate_id}': {cause}")]
    MatchingFailed {
        candidate_id: String,
        #[source]
        cause: CallFailure,
    },

    #[error("Cancelled before completion")]
    Cancelled,

    #[error("Batch deadline of {}s reached before completion", .0.as_secs())]
    BatchTimedOut(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmailError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Email generation failed for candidate '{candidate_id}': {cause}")]
    GenerationFailed {
        candidate_id: String,
        #[source]
        cause: CallFailure,
    },
}

impl MatchError {
    /// Stable machine-readable code used in per-candidate outcomes and error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "INVALID_INPUT",
            MatchError::TooManyResumes { .. } => "TOO_MANY_RESUMES",
            MatchError::MatchingFailed { cause, .. } => failure_code(cause),
            MatchError::Cancelled => "CANCELLED",
            MatchError::BatchTimedOut(_) => "BATCH_TIMED_OUT",
            MatchError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

fn failure_code(cause: &CallFailure) -> &'static str {
    match cause {
        CallFailure::Provider(_) => "PROVIDER_ERROR",
        CallFailure::Validation(_) => "INVALID_MODEL_OUTPUT",
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidInput(_) | MatchError::TooManyResumes { .. } => {
                AppError::Validation(err.to_string())
            }
            MatchError::MatchingFailed { .. } => AppError::Llm(err.to_string()),
            MatchError::Cancelled | MatchError::BatchTimedOut(_) => {
                AppError::Unavailable(err.to_string())
            }
            MatchError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidInput(_) => AppError::Validation(err.to_string()),
            EmailError::GenerationFailed { .. } => AppError::Llm(err.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Unavailable(msg) => {
                tracing::warn!("Request not completed: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
