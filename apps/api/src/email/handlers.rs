//! Axum route handlers for the Email API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::email::models::{CandidateInfo, CompanyInfo, Email, EmailCategory, EmailContext};
use crate::errors::AppError;
use crate::llm_client::ProviderKind;
use crate::matching::models::MatchResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub match_result: MatchResult,
    /// Other candidates' results for the same job, for the ranking line.
    #[serde(default)]
    pub peers: Vec<MatchResult>,
    pub candidate: CandidateInfo,
    #[serde(default)]
    pub company: CompanyInfo,
    pub category: EmailCategory,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
}

/// POST /api/v1/emails
///
/// Generates an interview or rejection email from a previously returned
/// MatchResult. Scores in the request are range-checked and recomputed
/// before use.
pub async fn handle_generate_email(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Email>, AppError> {
    let matcher = state.batch.matcher();
    let match_result = matcher.rescore(request.match_result)?;
    let peers = request
        .peers
        .into_iter()
        .map(|peer| matcher.rescore(peer))
        .collect::<Result<Vec<_>, _>>()?;

    let ctx = EmailContext {
        match_result: &match_result,
        peers: &peers,
        candidate: &request.candidate,
        company: &request.company,
        category: request.category,
    };
    let provider = request.provider.unwrap_or(state.default_provider);

    let email = state.emails.generate_for(ctx, provider, &state.policy).await?;

    Ok(Json(email))
}
