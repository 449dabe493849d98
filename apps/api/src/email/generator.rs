//! Email Generator: one LLM call per email, reusing an existing MatchResult.
//!
//! The reply carries subject, body and a tone tag together so nothing has to
//! be extracted from prose in a second call.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::email::models::{CandidateInfo, CompanyInfo, Email, EmailCategory, EmailContext};
use crate::email::prompts::{
    EMAIL_PROMPT_TEMPLATE, EMAIL_SYSTEM, INTERVIEW_INTENT, NONE_IDENTIFIED, REJECTION_INTENT,
    UNSPECIFIED_POSITION,
};
use crate::errors::EmailError;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::retry::{generate_validated, RetryPolicy};
use crate::llm_client::{GenerationParams, ProviderKind, ProviderRegistry, ProviderRequest};
use crate::matching::models::MatchResult;
use crate::validator::validate_email_reply;

const MAX_MATCHING_SKILLS_IN_PROMPT: usize = 5;
const MAX_MISSING_SKILLS_IN_PROMPT: usize = 3;

const EMAIL_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.7,
    max_tokens: 1200,
    force_json: true,
};

pub struct EmailGenerator {
    registry: Arc<ProviderRegistry>,
}

impl EmailGenerator {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub async fn generate(
        &self,
        match_result: &MatchResult,
        candidate: &CandidateInfo,
        company: &CompanyInfo,
        category: EmailCategory,
        provider: ProviderKind,
        policy: &RetryPolicy,
    ) -> Result<Email, EmailError> {
        let ctx = EmailContext {
            match_result,
            peers: &[],
            candidate,
            company,
            category,
        };
        self.generate_for(ctx, provider, policy).await
    }

    /// Generates one email. Fails with `InvalidInput` before any provider call
    /// when the candidate cannot be addressed, and with `GenerationFailed`
    /// once retries are exhausted.
    pub async fn generate_for(
        &self,
        ctx: EmailContext<'_>,
        provider: ProviderKind,
        policy: &RetryPolicy,
    ) -> Result<Email, EmailError> {
        let candidate_id = &ctx.match_result.candidate_id;
        if candidate_id.trim().is_empty() {
            return Err(EmailError::InvalidInput("match result has no candidate id".to_string()));
        }
        if ctx.candidate.name.trim().is_empty() {
            return Err(EmailError::InvalidInput("candidate name cannot be empty".to_string()));
        }

        let request = ProviderRequest::new(provider, EMAIL_SYSTEM, build_email_prompt(&ctx), EMAIL_PARAMS);

        let reply = generate_validated(&self.registry, &request, policy, validate_email_reply)
            .await
            .map_err(|cause| {
                warn!("Email generation failed for candidate {candidate_id}: {cause}");
                EmailError::GenerationFailed {
                    candidate_id: candidate_id.clone(),
                    cause,
                }
            })?;

        info!(
            "Generated {} email for candidate {} (tone: {})",
            ctx.category.as_str(),
            candidate_id,
            reply.tone.as_deref().unwrap_or("unspecified")
        );

        Ok(Email {
            candidate_id: candidate_id.clone(),
            subject: reply.subject,
            body: reply.body,
            category: ctx.category,
            tone: reply.tone,
            generated_at: Utc::now(),
        })
    }
}

pub(crate) fn build_email_prompt(ctx: &EmailContext<'_>) -> String {
    let result = ctx.match_result;
    let intent = match ctx.category {
        EmailCategory::Interview => INTERVIEW_INTENT,
        EmailCategory::Rejection => REJECTION_INTENT,
    };
    let job_title = ctx
        .company
        .job_title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(UNSPECIFIED_POSITION);
    let remarks = if result.remarks.trim().is_empty() {
        NONE_IDENTIFIED
    } else {
        result.remarks.trim()
    };

    let score = result.overall_score.to_string();
    let peers = peer_comparison(result, ctx.peers);
    let matching = skill_list(&result.matching_skills, MAX_MATCHING_SKILLS_IN_PROMPT);
    let missing = skill_list(&result.missing_skills, MAX_MISSING_SKILLS_IN_PROMPT);

    fill_template(
        EMAIL_PROMPT_TEMPLATE,
        &[
            ("category_intent", intent),
            ("score", score.as_str()),
            ("peer_comparison", peers.as_str()),
            ("matching_skills", matching.as_str()),
            ("missing_skills", missing.as_str()),
            ("remarks", remarks),
            ("job_title", job_title),
            ("company_name", ctx.company.name.as_str()),
            ("manager_name", ctx.company.hiring_manager.as_str()),
            ("candidate_email", ctx.candidate.email.as_str()),
            ("candidate_name", ctx.candidate.name.trim()),
        ],
    )
}

fn skill_list<'a>(skills: impl IntoIterator<Item = &'a String>, limit: usize) -> String {
    let listed: Vec<&str> = skills.into_iter().take(limit).map(String::as_str).collect();
    if listed.is_empty() {
        NONE_IDENTIFIED.to_string()
    } else {
        listed.join(", ")
    }
}

/// "ranks N of M" among the peers plus this candidate. Empty without peers.
fn peer_comparison(result: &MatchResult, peers: &[MatchResult]) -> String {
    let others: Vec<&MatchResult> = peers
        .iter()
        .filter(|peer| peer.candidate_id != result.candidate_id)
        .collect();
    if others.is_empty() {
        return String::new();
    }

    let rank = 1 + others
        .iter()
        .filter(|peer| peer.overall_score > result.overall_score)
        .count();
    let top = others
        .iter()
        .map(|peer| peer.overall_score)
        .chain([result.overall_score])
        .max()
        .unwrap_or(result.overall_score);

    format!(
        "Peer Comparison: ranks {rank} of {} candidates for this job; top score {top}%.\n",
        others.len() + 1
    )
}
