//! Batch Coordinator: fans the matcher out over up to ten résumés.
//!
//! Each résumé is an independent task on a `JoinSet`; a semaphore bounds how
//! many are talking to the provider at once. Results come back tagged with
//! their input index and land in a slot vector, so the outcome list is always
//! index-aligned with the input regardless of completion order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::MatchError;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::ProviderKind;
use crate::matching::models::{JobDescription, MatchResult, ResumeText};
use crate::matching::orchestrator::Matcher;

pub const MAX_RESUMES_PER_BATCH: usize = 10;
pub const DEFAULT_POOL_SIZE: usize = 4;

pub type MatchOutcome = Result<MatchResult, MatchError>;

#[derive(Clone)]
pub struct BatchCoordinator {
    matcher: Arc<Matcher>,
    pool_size: usize,
    batch_timeout: Option<Duration>,
    policy: RetryPolicy,
}

/// Per-candidate outcomes of one batch, index-aligned with the submitted résumés.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub provider: ProviderKind,
    pub outcomes: Vec<MatchOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchCoordinator {
    pub fn new(matcher: Arc<Matcher>, policy: RetryPolicy) -> Self {
        Self {
            matcher,
            pool_size: DEFAULT_POOL_SIZE,
            batch_timeout: None,
            policy,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Aggregate deadline for a whole batch. `None` disables it.
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn matcher(&self) -> &Arc<Matcher> {
        &self.matcher
    }

    pub async fn match_all(
        &self,
        job: &JobDescription,
        resumes: Vec<ResumeText>,
        provider: ProviderKind,
    ) -> Result<BatchReport, MatchError> {
        self.match_all_with_cancel(job, resumes, provider, CancellationToken::new())
            .await
    }

    /// Matches every résumé against `job`.
    ///
    /// Only input-contract violations fail the call as a whole. Per-candidate
    /// failures, cancellation and the batch deadline are recorded in the
    /// affected slots; results finished before either are kept.
    pub async fn match_all_with_cancel(
        &self,
        job: &JobDescription,
        resumes: Vec<ResumeText>,
        provider: ProviderKind,
        cancel: CancellationToken,
    ) -> Result<BatchReport, MatchError> {
        if resumes.len() > MAX_RESUMES_PER_BATCH {
            return Err(MatchError::TooManyResumes {
                count: resumes.len(),
                max: MAX_RESUMES_PER_BATCH,
            });
        }
        if job.text.trim().is_empty() {
            return Err(MatchError::InvalidInput(
                "job description text is empty".to_string(),
            ));
        }

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = resumes.len();
        info!(
            "Batch {batch_id}: matching {total} resumes via {provider} (pool size {})",
            self.pool_size
        );

        let job = Arc::new(job.clone());
        let permits = Arc::new(Semaphore::new(self.pool_size));
        let mut tasks = JoinSet::new();

        for (index, resume) in resumes.into_iter().enumerate() {
            let matcher = self.matcher.clone();
            let job = job.clone();
            let permits = permits.clone();
            let policy = self.policy.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(MatchError::Cancelled),
                    outcome = async {
                        let _permit = permits
                            .acquire_owned()
                            .await
                            .map_err(|e| MatchError::Internal(e.to_string()))?;
                        matcher.match_resume(&job, &resume, provider, &policy).await
                    } => outcome,
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<MatchOutcome>> = (0..total).map(|_| None).collect();
        let deadline = self.batch_timeout.map(|t| Instant::now() + t);
        let mut timed_out = false;

        loop {
            let joined = match deadline {
                Some(deadline) => tokio::select! {
                    joined = tasks.join_next() => joined,
                    _ = sleep_until(deadline) => {
                        timed_out = true;
                        break;
                    }
                },
                None => tasks.join_next().await,
            };
            let Some(joined) = joined else { break };

            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!("Batch {batch_id}: matching task failed: {e}"),
            }
        }

        if timed_out {
            warn!("Batch {batch_id}: deadline reached, abandoning unfinished candidates");
            tasks.abort_all();
            // Tasks that finished between the deadline and the abort still count.
            while let Some(joined) = tasks.join_next().await {
                if let Ok((index, outcome)) = joined {
                    slots[index] = Some(outcome);
                }
            }
        }

        let outcomes: Vec<MatchOutcome> = slots
            .into_iter()
            .map(|slot| match (slot, self.batch_timeout) {
                (Some(outcome), _) => outcome,
                (None, Some(limit)) if timed_out => Err(MatchError::BatchTimedOut(limit)),
                (None, _) => Err(MatchError::Internal("matching task panicked".to_string())),
            })
            .collect();

        let report = BatchReport {
            batch_id,
            provider,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Batch {batch_id}: {} matched, {} failed in {}ms",
            report.succeeded(),
            report.failed(),
            (report.finished_at - report.started_at).num_milliseconds()
        );
        Ok(report)
    }
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Highest-scoring successful result with its input index. Ties go to the
    /// lower index.
    pub fn best_match(&self) -> Option<(usize, &MatchResult)> {
        self.ranked().into_iter().next()
    }

    /// Successful results by descending overall score, stable on input index.
    pub fn ranked(&self) -> Vec<(usize, &MatchResult)> {
        let mut ranked: Vec<(usize, &MatchResult)> = self
            .outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.as_ref().ok().map(|r| (index, r)))
            .collect();
        ranked.sort_by(|a, b| b.1.overall_score.cmp(&a.1.overall_score));
        ranked
    }

    pub fn into_outcomes(self) -> Vec<MatchOutcome> {
        self.outcomes
    }
}
