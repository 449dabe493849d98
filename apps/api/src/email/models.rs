use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::models::MatchResult;

pub const DEFAULT_COMPANY_NAME: &str = "Our Company";
pub const DEFAULT_HIRING_MANAGER: &str = "Hiring Manager";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailCategory {
    Interview,
    Rejection,
}

impl EmailCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailCategory::Interview => "interview",
            EmailCategory::Rejection => "rejection",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    #[serde(default = "default_company_name")]
    pub name: String,
    #[serde(default = "default_hiring_manager")]
    pub hiring_manager: String,
    #[serde(default)]
    pub job_title: Option<String>,
}

fn default_company_name() -> String {
    DEFAULT_COMPANY_NAME.to_string()
}

fn default_hiring_manager() -> String {
    DEFAULT_HIRING_MANAGER.to_string()
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            hiring_manager: default_hiring_manager(),
            job_title: None,
        }
    }
}

/// Generated follow-up email, handed to a delivery/storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub candidate_id: String,
    pub subject: String,
    pub body: String,
    pub category: EmailCategory,
    /// Tone tag self-reported by the model, lowercased.
    pub tone: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Everything one email is generated from. `peers` are other candidates'
/// results for the same job; when present they add a ranking line.
#[derive(Debug, Clone, Copy)]
pub struct EmailContext<'a> {
    pub match_result: &'a MatchResult,
    pub peers: &'a [MatchResult],
    pub candidate: &'a CandidateInfo,
    pub company: &'a CompanyInfo,
    pub category: EmailCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_info_defaults() {
        let company: CompanyInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(company.name, DEFAULT_COMPANY_NAME);
        assert_eq!(company.hiring_manager, DEFAULT_HIRING_MANAGER);
        assert!(company.job_title.is_none());
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(serde_json::to_value(EmailCategory::Interview).unwrap(), "interview");
        let category: EmailCategory = serde_json::from_str(r#""rejection""#).unwrap();
        assert_eq!(category, EmailCategory::Rejection);
    }
}
