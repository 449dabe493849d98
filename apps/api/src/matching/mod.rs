//! Candidate matching: prompt, provider call, validation, scoring and batching.

pub mod batch;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod scoring;

pub use batch::{BatchCoordinator, BatchReport, MatchOutcome, MAX_RESUMES_PER_BATCH};
pub use models::{JobDescription, MatchResult, ResumeText, ScoreBreakdown};
pub use orchestrator::Matcher;
pub use scoring::ScoringWeights;
