//! A scripted completion provider for tests.

use async_trait::async_trait;
use care_coordinator_ai::{
    Completion, CompletionError, CompletionProvider, CompletionRequest, ToolCall,
};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// Replays a fixed script of completions and records every request.
///
/// Once the script runs out the provider falls back to its repeating
/// completion, if one is set, and otherwise fails.
///
/// A gated provider holds every request until a permit is added to its
/// gate, which lets tests observe how many requests overlap.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    repeat: Mutex<Option<Completion>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedProvider {
    /// Plays `script` in order.
    #[must_use]
    pub fn new(script: Vec<Completion>) -> Self {
        Self::from_results(script.into_iter().map(Ok).collect())
    }

    /// Plays `script` in order, failures included.
    #[must_use]
    pub fn from_results(script: Vec<Result<Completion, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Answers with `completion` once the script is exhausted.
    #[must_use]
    pub fn repeating(self, completion: Completion) -> Self {
        *lock(&self.repeat) = Some(completion);
        self
    }

    /// Holds each request until `gate` hands out a permit. Permits are
    /// consumed.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn stop_repeating(&self) {
        *lock(&self.repeat) = None;
    }

    /// Appends a step to the script.
    pub fn push(&self, step: Result<Completion, CompletionError>) {
        lock(&self.script).push_back(step);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// Requests currently being answered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most requests ever answered at the same time.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Result<Completion, CompletionError> {
        if let Some(step) = lock(&self.script).pop_front() {
            return step;
        }
        lock(&self.repeat)
            .clone()
            .ok_or_else(|| CompletionError::ResponseParseFailed {
                reason: "script exhausted".to_string(),
            })
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        lock(&self.requests).push(request.clone());
        let step = self.next_step();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        step
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// A batch with one call to `name`, identified as `call_<name>`.
#[must_use]
pub fn tool_batch(name: &str, arguments: JsonValue) -> Completion {
    Completion::ToolCallBatch(vec![ToolCall::new(format!("call_{name}"), name, arguments)])
}
