//! Scripted in-process provider for tests. Records every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{LlmProvider, ProviderError, ProviderKind, ProviderRegistry, ProviderRequest, ProviderResponse};

type Script = dyn Fn(&ProviderRequest, usize) -> Result<String, ProviderError> + Send + Sync;

/// A well-formed matching reply: partial overlap on {Python, AWS, Docker}.
pub(crate) const GOOD_MATCH_REPLY: &str = r#"{
    "skillsMatch": 67,
    "experienceLevel": 80,
    "educationRelevance": 70,
    "overallFit": 75,
    "matchingSkills": ["Python", "Docker"],
    "missingSkills": ["AWS"],
    "remarks": "Solid Python and Docker background; no AWS exposure."
}"#;

pub(crate) struct FnProvider {
    kind: ProviderKind,
    timeout: Duration,
    delay: Option<Duration>,
    json_mode: bool,
    script: Box<Script>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FnProvider {
    /// `script` receives the request and the zero-based call number.
    pub(crate) fn new(
        kind: ProviderKind,
        script: impl Fn(&ProviderRequest, usize) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            timeout: Duration::from_secs(30),
            delay: None,
            json_mode: true,
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(kind: ProviderKind, text: &str) -> Self {
        let text = text.to_string();
        Self::new(kind, move |_, _| Ok(text.clone()))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn without_json_mode(mut self) -> Self {
        self.json_mode = false;
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn registry(self: &Arc<Self>) -> Arc<ProviderRegistry> {
        Arc::new(ProviderRegistry::new().with(self.clone()))
    }
}

#[async_trait]
impl LlmProvider for FnProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    fn supports_json_mode(&self) -> bool {
        self.json_mode
    }

    fn call_timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.script)(request, call).map(|text| ProviderResponse {
            provider: self.kind,
            model_id: "scripted".to_string(),
            text,
            success: true,
            usage: None,
        })
    }
}
