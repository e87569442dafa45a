//! Resilient Transmission Pipeline
//!
//! ## Overview
//!
//! One call to [`TransmissionPipeline::deliver`] is one delivery attempt for
//! one record. The pipeline counts consecutive failures across calls and
//! decides what a failure means:
//!
//! | consecutive failures | outcome                      |
//! |----------------------|------------------------------|
//! | 0 (success)          | `Delivered`, counter reset   |
//! | 1 ..< 3              | `Dropped`                    |
//! | ≥ 3                  | `Spilled` (or `Lost`)        |
//!
//! The counter is *not* reset by a spill. While the sink stays down every
//! further record is spilled; one success resets the counter and three fresh
//! failures are needed before the next spill.
//!
//! Every attempt is bounded by a timeout, so a sink that hangs counts as a
//! failure instead of stalling the caller.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use airis_core::{
    constants::{time::REQUEST_TIMEOUT_S, transport::MAX_CONSECUTIVE_ERRORS},
    CompositeRecord,
};

use crate::{DeliveryStats, SpillStore, SpillWriteError, TelemetryPayload, TelemetrySink, TransportError};

/// Consecutive-failure counter, lives for the process run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmissionState {
    consecutive_failures: u32,
}

impl TransmissionState {
    /// Failures since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// A delivery succeeded
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// A delivery failed; returns the new count
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }
}

/// What happened to one record
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Sink accepted the record
    Delivered,
    /// Delivery failed and the record was discarded
    Dropped {
        /// Consecutive failures so far
        failures: u32,
        /// Why the attempt failed
        error: TransportError,
    },
    /// Delivery failed and the record was written to disk
    Spilled {
        /// Spill file
        path: PathBuf,
        /// Consecutive failures so far
        failures: u32,
    },
    /// Delivery and spill both failed; the record is gone
    Lost(SpillWriteError),
}

impl DeliveryOutcome {
    /// Whether the sink accepted the record
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => f.write_str("delivered"),
            DeliveryOutcome::Dropped { failures, error } => {
                write!(f, "dropped after failure {}: {}", failures, error)
            }
            DeliveryOutcome::Spilled { path, failures } => {
                write!(f, "spilled to {} after {} failures", path.display(), failures)
            }
            DeliveryOutcome::Lost(err) => write!(f, "lost: {}", err),
        }
    }
}

/// Sink plus spill fallback plus failure accounting
pub struct TransmissionPipeline<S> {
    sink: S,
    spill: SpillStore,
    state: TransmissionState,
    stats: DeliveryStats,
    location: Option<String>,
    timeout: Duration,
    max_failures: u32,
}

impl<S: TelemetrySink> TransmissionPipeline<S> {
    /// Pipeline with the default 10 s attempt budget and spill threshold of 3
    pub fn new(sink: S, spill: SpillStore) -> Self {
        Self {
            sink,
            spill,
            state: TransmissionState::default(),
            stats: DeliveryStats::default(),
            location: None,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_S),
            max_failures: MAX_CONSECUTIVE_ERRORS,
        }
    }

    /// Attach an installation location to every payload
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Override the per-attempt budget
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deliver one record
    ///
    /// Never fails: every error ends up in the returned outcome.
    pub async fn deliver(&mut self, record: CompositeRecord) -> DeliveryOutcome {
        let payload = TelemetryPayload::from_record(&record, self.location.as_deref());

        let attempt = match tokio::time::timeout(self.timeout, self.sink.send(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        match attempt {
            Ok(()) => {
                self.state.record_success();
                self.stats.sent += 1;
                log::info!(
                    "Delivered record {} from {} to {}",
                    payload.id,
                    payload.device_id,
                    self.sink.name()
                );
                DeliveryOutcome::Delivered
            }
            Err(error) => self.handle_failure(payload, error).await,
        }
    }

    async fn handle_failure(&mut self, payload: TelemetryPayload, error: TransportError) -> DeliveryOutcome {
        let failures = self.state.record_failure();
        self.stats.failed += 1;
        self.stats.last_error = Some(error.to_string());

        if failures < self.max_failures {
            log::warn!(
                "Delivery failed ({}/{}), dropping record {}: {}",
                failures,
                self.max_failures,
                payload.id,
                error
            );
            return DeliveryOutcome::Dropped { failures, error };
        }

        log::error!(
            "Delivery failed {} times in a row ({}), spilling record {} to {}",
            failures,
            error,
            payload.id,
            self.spill.dir().display()
        );

        match self.spill_blocking(payload.clone()).await {
            Ok(path) => {
                self.stats.spilled += 1;
                DeliveryOutcome::Spilled { path, failures }
            }
            Err(err) => {
                self.stats.lost += 1;
                self.stats.last_error = Some(err.to_string());
                log::error!(
                    "Record {} from {} at {} LOST: {}",
                    payload.id,
                    payload.device_id,
                    payload.timestamp.to_rfc3339(),
                    err
                );
                DeliveryOutcome::Lost(err)
            }
        }
    }

    /// Write the spill file on a blocking worker, off the async executor
    async fn spill_blocking(&self, payload: TelemetryPayload) -> Result<PathBuf, SpillWriteError> {
        let store = self.spill.clone();
        match tokio::task::spawn_blocking(move || store.write(&payload)).await {
            Ok(result) => result,
            Err(join) => Err(SpillWriteError::Task(join.to_string())),
        }
    }

    /// Failure counter
    pub fn state(&self) -> TransmissionState {
        self.state
    }

    /// Delivery statistics
    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }

    /// Borrow the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySink;
    use airis_core::{
        record::{device_id, RecordBuilder},
        AlertLevel, CalibratedReading, SensorType,
    };

    fn record() -> CompositeRecord {
        let mut builder = RecordBuilder::new();
        builder.push(CalibratedReading::new(SensorType::Co, 4.2), AlertLevel::Normal);
        builder.finish(device_id("esp32-01").unwrap(), 1_700_000_000_000)
    }

    fn refused() -> TransportError {
        TransportError::Request("connection refused".into())
    }

    fn pipeline(sink: MemorySink, dir: &std::path::Path) -> TransmissionPipeline<MemorySink> {
        TransmissionPipeline::new(sink, SpillStore::new(dir))
    }

    #[tokio::test]
    async fn success_delivers_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        sink.push_failure(refused());
        let mut pipeline = pipeline(sink.clone(), dir.path()).with_location("Lab");

        assert!(matches!(pipeline.deliver(record()).await, DeliveryOutcome::Dropped { failures: 1, .. }));
        assert!(pipeline.deliver(record()).await.is_delivered());
        assert_eq!(pipeline.state().consecutive_failures(), 0);

        let accepted = sink.accepted();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].location.as_deref(), Some("Lab"));
        assert_eq!(pipeline.stats().sent, 1);
        assert_eq!(pipeline.stats().failed, 1);
    }

    #[tokio::test]
    async fn third_consecutive_failure_spills() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        for _ in 0..4 {
            sink.push_failure(refused());
        }
        let mut pipeline = pipeline(sink, dir.path());

        assert!(matches!(pipeline.deliver(record()).await, DeliveryOutcome::Dropped { failures: 1, .. }));
        assert!(matches!(pipeline.deliver(record()).await, DeliveryOutcome::Dropped { failures: 2, .. }));

        let path = match pipeline.deliver(record()).await {
            DeliveryOutcome::Spilled { path, failures: 3 } => path,
            other => panic!("expected spill, got {}", other),
        };
        assert!(path.starts_with(dir.path()));
        let spilled: TelemetryPayload =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(spilled.co, Some(4.2));

        // Counter not reset by the spill
        assert!(matches!(pipeline.deliver(record()).await, DeliveryOutcome::Spilled { failures: 4, .. }));
        assert_eq!(pipeline.stats().spilled, 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn success_in_between_needs_fresh_run() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        sink.push_failure(refused());
        sink.push_failure(refused());
        sink.push_success();
        sink.push_failure(refused());
        sink.push_failure(refused());
        let mut pipeline = pipeline(sink, dir.path());

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(pipeline.deliver(record()).await);
        }

        assert!(outcomes[2].is_delivered());
        assert!(outcomes
            .iter()
            .all(|o| !matches!(o, DeliveryOutcome::Spilled { .. })));
        assert_eq!(pipeline.state().consecutive_failures(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn spills_from_a_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        for _ in 0..3 {
            sink.push_failure(refused());
        }
        let mut pipeline = pipeline(sink, dir.path());

        pipeline.deliver(record()).await;
        pipeline.deliver(record()).await;
        let path = match pipeline.deliver(record()).await {
            DeliveryOutcome::Spilled { path, failures: 3 } => path,
            other => panic!("expected spill, got {}", other),
        };
        assert!(path.is_file());
        assert_eq!(pipeline.stats().spilled, 1);
    }

    #[tokio::test]
    async fn spill_failure_is_lost() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let sink = MemorySink::new();
        for _ in 0..3 {
            sink.push_failure(refused());
        }
        let mut pipeline = pipeline(sink, &blocker.join("spill"));

        pipeline.deliver(record()).await;
        pipeline.deliver(record()).await;
        assert!(matches!(pipeline.deliver(record()).await, DeliveryOutcome::Lost(_)));
        assert_eq!(pipeline.stats().lost, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_sink_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new().with_delay(Duration::from_secs(60));
        let mut pipeline = pipeline(sink.clone(), dir.path());

        match pipeline.deliver(record()).await {
            DeliveryOutcome::Dropped { error: TransportError::Timeout(budget), .. } => {
                assert_eq!(budget, Duration::from_secs(10));
            }
            other => panic!("expected timeout, got {}", other),
        }
        assert!(sink.accepted().is_empty());
    }

    #[test]
    fn state_counter() {
        let mut state = TransmissionState::default();
        assert_eq!(state.record_failure(), 1);
        assert_eq!(state.record_failure(), 2);
        state.record_success();
        assert_eq!(state.consecutive_failures(), 0);
    }
}
