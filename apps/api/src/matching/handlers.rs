//! Axum route handlers for the Matching API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::{AppError, MatchError};
use crate::llm_client::ProviderKind;
use crate::matching::batch::BatchReport;
use crate::matching::models::{JobDescription, MatchResult, ResumeText};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub job: JobDescription,
    pub resumes: Vec<ResumeText>,
    /// Falls back to the configured default provider.
    #[serde(default)]
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub batch_id: Uuid,
    pub provider: ProviderKind,
    pub total_candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<CandidateOutcome>,
    /// Input index of the best successful match.
    pub best_match: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CandidateOutcome {
    Matched {
        index: usize,
        #[serde(rename = "isBestMatch")]
        is_best_match: bool,
        result: MatchResult,
    },
    Failed {
        index: usize,
        #[serde(rename = "candidateId")]
        candidate_id: String,
        error: OutcomeError,
    },
}

#[derive(Debug, Serialize)]
pub struct OutcomeError {
    pub code: &'static str,
    pub message: String,
}

impl MatchResponse {
    fn from_report(report: BatchReport, candidate_ids: Vec<String>) -> Self {
        let best_match = report.best_match().map(|(index, _)| index);
        let (batch_id, provider) = (report.batch_id, report.provider);
        let (succeeded, failed) = (report.succeeded(), report.failed());

        let results: Vec<CandidateOutcome> = report
            .into_outcomes()
            .into_iter()
            .zip(candidate_ids)
            .enumerate()
            .map(|(index, (outcome, candidate_id))| match outcome {
                Ok(result) => CandidateOutcome::Matched {
                    index,
                    is_best_match: best_match == Some(index),
                    result,
                },
                Err(err) => CandidateOutcome::Failed {
                    index,
                    candidate_id,
                    error: OutcomeError {
                        code: err.code(),
                        message: err.to_string(),
                    },
                },
            })
            .collect();

        Self {
            batch_id,
            provider,
            total_candidates: results.len(),
            succeeded,
            failed,
            results,
            best_match,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/matches
///
/// Matches up to ten résumés against one job description. Per-candidate
/// failures are reported in their slot; only input-contract violations fail
/// the whole request. A client disconnect cancels the unfinished candidates.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    if request.job.text.trim().is_empty() {
        return Err(MatchError::InvalidInput("job.text cannot be empty".to_string()).into());
    }
    if request.resumes.is_empty() {
        return Err(MatchError::InvalidInput("at least one resume is required".to_string()).into());
    }

    let provider = request.provider.unwrap_or(state.default_provider);
    let candidate_ids: Vec<String> = request
        .resumes
        .iter()
        .map(|r| r.candidate_id.clone())
        .collect();

    // Dropping the handler future (client gone) cancels the batch.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let report = state
        .batch
        .match_all_with_cancel(&request.job, request.resumes, provider, cancel)
        .await?;
    guard.disarm();

    Ok(Json(MatchResponse::from_report(report, candidate_ids)))
}
