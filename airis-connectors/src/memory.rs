//! In-memory sink for tests
//!
//! Useful for unit and integration testing of the transmission path and for
//! scripting failure sequences (fail, fail, succeed, ...). Every accepted
//! payload is kept, so a long-running node uses [`LogSink`](crate::LogSink)
//! instead.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::{TelemetryPayload, TelemetrySink, TransportError};

#[derive(Debug, Default)]
struct Inner {
    script: VecDeque<Result<(), TransportError>>,
    accepted: Vec<TelemetryPayload>,
    attempts: usize,
}

/// Sink that keeps accepted payloads in memory
///
/// Outcomes are taken from a script in order; once the script is exhausted
/// every attempt succeeds. Clones share state, so a test can keep a handle
/// while the pipeline owns the sink.
///
/// ```rust
/// use airis_connectors::{MemorySink, TransportError};
///
/// let sink = MemorySink::new();
/// sink.push_failure(TransportError::Request("connection refused".into()));
/// assert_eq!(sink.accepted().len(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
    delay: Option<Duration>,
}

impl MemorySink {
    /// Sink that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before answering each attempt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue one failed attempt
    pub fn push_failure(&self, error: TransportError) {
        self.lock().script.push_back(Err(error));
    }

    /// Queue one successful attempt
    pub fn push_success(&self) {
        self.lock().script.push_back(Ok(()));
    }

    /// Payloads accepted so far
    pub fn accepted(&self) -> Vec<TelemetryPayload> {
        self.lock().accepted.clone()
    }

    /// Number of delivery attempts seen
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-push
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl TelemetrySink for MemorySink {
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        inner.attempts += 1;
        let outcome = inner.script.pop_front().unwrap_or(Ok(()));
        if outcome.is_ok() {
            inner.accepted.push(payload.clone());
        }
        outcome
    }

    fn name(&self) -> &str {
        "memory"
    }
}
