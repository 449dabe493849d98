use std::sync::Arc;

use crate::config::EngineConfig;
use crate::email::EmailGenerator;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{ProviderKind, ProviderRegistry};
use crate::matching::{BatchCoordinator, Matcher};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the matcher; handlers that only rescore reach it through `batch.matcher()`.
    pub batch: BatchCoordinator,
    pub emails: Arc<EmailGenerator>,
    /// Used when a request does not name a provider.
    pub default_provider: ProviderKind,
    pub policy: RetryPolicy,
}

impl AppState {
    pub fn new(registry: Arc<ProviderRegistry>, engine: &EngineConfig) -> Self {
        let matcher = Arc::new(Matcher::new(registry.clone(), engine.weights));
        let batch = BatchCoordinator::new(matcher, engine.retry.clone())
            .with_pool_size(engine.pool_size)
            .with_batch_timeout(engine.batch_timeout);

        Self {
            batch,
            emails: Arc::new(EmailGenerator::new(registry)),
            default_provider: engine.default_provider,
            policy: engine.retry.clone(),
        }
    }
}
