// Email Generator: follow-up emails driven by an existing MatchResult.
// All LLM calls go through llm_client; no provider-specific code here.

pub mod generator;
pub mod handlers;
pub mod models;
pub mod prompts;

pub use generator::EmailGenerator;
pub use models::{CandidateInfo, CompanyInfo, Email, EmailCategory, EmailContext};
