//! Log-only sink for dry runs
//!
//! Accepts every payload, writes it to the log as JSON and keeps nothing
//! but a counter, so a node can run without a backend for as long as it
//! likes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{TelemetryPayload, TelemetrySink, TransportError};

/// Sink that logs payloads instead of sending them
///
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    delivered: Arc<AtomicU64>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads logged so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl TelemetrySink for LogSink {
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| TransportError::Serialization(err.to_string()))?;
        log::info!("Dry run, not sent: {}", body);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SpillStore, TransmissionPipeline};
    use airis_core::{
        record::{device_id, RecordBuilder},
        AlertLevel, CalibratedReading, CompositeRecord, SensorType,
    };

    fn record(n: u64) -> CompositeRecord {
        let mut builder = RecordBuilder::new();
        builder.push(CalibratedReading::new(SensorType::Pm25, 0.03), AlertLevel::Normal);
        builder.finish(device_id("esp32-dry").unwrap(), 1_700_000_000_000 + n * 30_000)
    }

    #[tokio::test]
    async fn long_dry_run_only_counts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::new();
        let mut pipeline = TransmissionPipeline::new(sink.clone(), SpillStore::new(dir.path()));

        // A day of 30 s cycles
        for n in 0..2_880 {
            assert!(pipeline.deliver(record(n)).await.is_delivered());
        }

        assert_eq!(sink.delivered(), 2_880);
        assert_eq!(pipeline.stats().sent, 2_880);
        // No per-payload storage
        assert_eq!(std::mem::size_of::<LogSink>(), std::mem::size_of::<Arc<AtomicU64>>());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn clones_share_the_counter() {
        let sink = LogSink::new();
        let handle = sink.clone();
        let payload = TelemetryPayload::from_record(&record(0), Some("Lab"));

        sink.send(&payload).await.unwrap();
        sink.send(&payload).await.unwrap();

        assert_eq!(handle.delivered(), 2);
        assert_eq!(handle.name(), "log");
    }
}
