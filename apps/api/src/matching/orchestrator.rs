//! Matching Orchestrator: one (job, résumé) pair in, one `MatchResult` out.
//!
//! Flow: input checks → build prompt → provider call (backoff / failover) →
//!       validate (one corrective retry) → recompute overall score → MatchResult.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::MatchError;
use crate::llm_client::prompts::{fill_template, truncate_chars};
use crate::llm_client::retry::{generate_validated, RetryPolicy};
use crate::llm_client::{GenerationParams, ProviderKind, ProviderRegistry, ProviderRequest};
use crate::matching::models::{JobDescription, MatchResult, ResumeText};
use crate::matching::prompts::{MATCH_PROMPT_TEMPLATE, MATCH_SYSTEM, NO_STRUCTURED_REQUIREMENTS};
use crate::matching::scoring::ScoringWeights;
use crate::validator::{check_breakdown, validate_match_reply, ValidationError};

/// Résumé characters embedded in the prompt; the rest is dropped to bound token cost.
pub const MAX_RESUME_PROMPT_CHARS: usize = 12_000;
/// Job description characters embedded in the prompt.
pub const MAX_JOB_PROMPT_CHARS: usize = 8_000;

const MATCH_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.3,
    max_tokens: 1500,
    force_json: true,
};

/// Stateless between calls; cheap to share behind an `Arc` across concurrent units.
pub struct Matcher {
    registry: Arc<ProviderRegistry>,
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(registry: Arc<ProviderRegistry>, weights: ScoringWeights) -> Self {
        Self { registry, weights }
    }

    /// Matches one résumé against one job.
    ///
    /// Fails fast with `InvalidInput` (no provider call) on empty résumé or job
    /// text. Every other failure surfaces as `MatchingFailed` carrying the root
    /// cause once retries are exhausted.
    pub async fn match_resume(
        &self,
        job: &JobDescription,
        resume: &ResumeText,
        provider: ProviderKind,
        policy: &RetryPolicy,
    ) -> Result<MatchResult, MatchError> {
        if resume.text.trim().is_empty() {
            return Err(MatchError::InvalidInput(format!(
                "resume text for candidate '{}' is empty",
                resume.candidate_id
            )));
        }
        if job.text.trim().is_empty() {
            return Err(MatchError::InvalidInput(
                "job description text is empty".to_string(),
            ));
        }

        let request = ProviderRequest::new(
            provider,
            MATCH_SYSTEM,
            build_match_prompt(job, resume),
            MATCH_PARAMS,
        );

        let reply = generate_validated(&self.registry, &request, policy, validate_match_reply)
            .await
            .map_err(|cause| {
                warn!("Matching failed for candidate {}: {}", resume.candidate_id, cause);
                MatchError::MatchingFailed {
                    candidate_id: resume.candidate_id.clone(),
                    cause,
                }
            })?;

        let result = MatchResult::assemble(resume.candidate_id.clone(), reply, &self.weights);
        info!(
            "Matched candidate {}: {}/100 ({} matching, {} missing skills)",
            result.candidate_id,
            result.overall_score,
            result.matching_skills.len(),
            result.missing_skills.len()
        );
        Ok(result)
    }

    /// Re-checks and re-scores a result that came back from outside the engine,
    /// so a caller-supplied `overall_score` is never trusted either.
    pub fn rescore(&self, result: MatchResult) -> Result<MatchResult, ValidationError> {
        check_breakdown(&result.breakdown)?;
        Ok(MatchResult {
            overall_score: self.weights.overall_score(&result.breakdown),
            ..result
        })
    }
}

/// Builds the single matching prompt: structured requirements (if any), job
/// text, résumé text.
pub(crate) fn build_match_prompt(job: &JobDescription, resume: &ResumeText) -> String {
    let requirements = requirements_summary(job);
    fill_template(
        MATCH_PROMPT_TEMPLATE,
        &[
            ("requirements_summary", requirements.as_str()),
            ("jd_text", truncate_chars(job.text.trim(), MAX_JOB_PROMPT_CHARS)),
            ("resume_text", truncate_chars(resume.text.trim(), MAX_RESUME_PROMPT_CHARS)),
        ],
    )
}

fn requirements_summary(job: &JobDescription) -> String {
    if !job.has_structured_fields() {
        return NO_STRUCTURED_REQUIREMENTS.to_string();
    }

    let mut lines = Vec::new();
    if let Some(title) = &job.title {
        lines.push(format!("Position: {title}"));
    }
    if !job.required_skills.is_empty() {
        lines.push(format!("Required Skills: {}", job.required_skills.join(", ")));
    }
    if let Some(years) = job.experience_years {
        lines.push(format!("Required Experience: {years}+ years"));
    }
    if let Some(seniority) = &job.seniority {
        lines.push(format!("Seniority: {seniority}"));
    }
    lines.join("\n")
}
