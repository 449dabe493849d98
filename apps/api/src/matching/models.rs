use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::matching::scoring::ScoringWeights;
use crate::validator::MatchReply;

/// Job description as handed over by the upload/persistence layer. Read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescription {
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub seniority: Option<String>,
}

impl JobDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_required_skills<S: Into<String>>(mut self, skills: impl IntoIterator<Item = S>) -> Self {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_structured_fields(&self) -> bool {
        self.title.is_some()
            || !self.required_skills.is_empty()
            || self.experience_years.is_some()
            || self.seniority.is_some()
    }
}

/// Plain text extracted from one candidate's résumé file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeText {
    pub candidate_id: String,
    pub text: String,
}

impl ResumeText {
    pub fn new(candidate_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            text: text.into(),
        }
    }
}

/// Four sub-scores, each in [0, 100]. Out-of-range values never get this far:
/// the validator rejects them instead of clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub skills_match: f64,
    pub experience_level: f64,
    pub education_relevance: f64,
    pub overall_fit: f64,
}

/// Outcome of matching one résumé against one job. Immutable once returned.
///
/// `overall_score` is always derived from `breakdown` by the scoring weights,
/// never taken from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub candidate_id: String,
    pub overall_score: u8,
    pub breakdown: ScoreBreakdown,
    pub matching_skills: BTreeSet<String>,
    pub missing_skills: BTreeSet<String>,
    pub remarks: String,
}

impl MatchResult {
    pub fn assemble(candidate_id: impl Into<String>, reply: MatchReply, weights: &ScoringWeights) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            overall_score: weights.overall_score(&reply.breakdown),
            breakdown: reply.breakdown,
            matching_skills: reply.matching_skills,
            missing_skills: reply.missing_skills,
            remarks: reply.remarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_recomputes_overall_score() {
        let reply = MatchReply {
            breakdown: ScoreBreakdown {
                skills_match: 80.0,
                experience_level: 60.0,
                education_relevance: 50.0,
                overall_fit: 70.0,
            },
            matching_skills: BTreeSet::from(["Python".to_string()]),
            missing_skills: BTreeSet::new(),
            remarks: "ok".to_string(),
        };
        let result = MatchResult::assemble("cand-1", reply, &ScoringWeights::default());
        // 32 + 18 + 10 + 7
        assert_eq!(result.overall_score, 67);
        assert_eq!(result.candidate_id, "cand-1");
    }

    #[test]
    fn test_match_result_serializes_camel_case() {
        let result = MatchResult {
            candidate_id: "c-9".to_string(),
            overall_score: 72,
            breakdown: ScoreBreakdown {
                skills_match: 70.0,
                experience_level: 70.0,
                education_relevance: 80.0,
                overall_fit: 70.0,
            },
            matching_skills: BTreeSet::from(["Docker".to_string(), "Python".to_string()]),
            missing_skills: BTreeSet::from(["AWS".to_string()]),
            remarks: "".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["candidateId"], "c-9");
        assert_eq!(json["overallScore"], 72);
        assert_eq!(json["breakdown"]["skillsMatch"], 70.0);
        assert_eq!(json["matchingSkills"], serde_json::json!(["Docker", "Python"]));
    }

    #[test]
    fn test_job_description_optional_fields_default() {
        let job: JobDescription = serde_json::from_str(r#"{"text": "Backend engineer"}"#).unwrap();
        assert!(!job.has_structured_fields());
        let job = job.with_required_skills(["Rust"]);
        assert!(job.has_structured_fields());
    }
}
