//! Candidate matching and follow-up email engine.
//!
//! `matching` turns (job description, résumé) pairs into validated, scored
//! `MatchResult`s, one at a time or in batches of up to ten. `email` reuses a
//! `MatchResult` to write an interview or rejection email. Every provider call
//! goes through `llm_client`.

pub mod config;
pub mod email;
pub mod errors;
pub mod llm_client;
pub mod matching;
pub mod routes;
pub mod state;
pub mod validator;
