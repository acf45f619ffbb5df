//! Shared test helpers: a scripted provider.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use codeclaw_core::error::ProviderError;
use codeclaw_core::provider::{CompletionRequest, Provider};

/// One scripted reply.
pub enum Step {
    Text(String),
    Fail(ProviderError),
    /// Panic inside `complete`.
    Panic,
    /// Never resolve.
    Stall,
}

impl Step {
    pub fn text(text: &str) -> Self {
        Step::Text(text.to_string())
    }

    pub fn fail(error: ProviderError) -> Self {
        Step::Fail(error)
    }
}

/// A provider that replays scripted steps in order.
///
/// Once the script runs out every call fails with `InvalidResponse`.
pub struct ScriptedProvider {
    healthy: bool,
    steps: Mutex<Vec<Step>>,
    calls: AtomicUsize,
    health_checks: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn healthy(steps: Vec<Step>) -> Self {
        let mut steps = steps;
        steps.reverse();
        Self {
            healthy: true,
            steps: Mutex::new(steps),
            calls: AtomicUsize::new(0),
            health_checks: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::healthy(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop();
        match step {
            Some(Step::Text(text)) => Ok(text),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Panic) => panic!("scripted provider panic"),
            Some(Step::Stall) => std::future::pending().await,
            None => Err(ProviderError::InvalidResponse("script exhausted".into())),
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.healthy)
    }
}
