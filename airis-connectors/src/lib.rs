//! Telemetry Delivery for AIRIS Nodes
//!
//! ## Overview
//!
//! This crate moves a finished [`CompositeRecord`](airis_core::CompositeRecord)
//! off the device. The network is assumed to be unreliable: Wi-Fi drops,
//! the backend restarts, captive portals return HTML. Delivery is therefore
//! built as a small pipeline with a local fallback:
//!
//! ```text
//! CompositeRecord
//!       │
//!       ▼
//! TelemetryPayload ──► TelemetrySink (HTTP POST, 10 s budget)
//!                            │
//!                   ok ◄─────┴─────► error
//!                   │                  │
//!               Delivered       consecutive_failures += 1
//!                                      │
//!                         < 3 ◄────────┴────────► ≥ 3
//!                          │                       │
//!                       Dropped              SpillStore (JSON file)
//!                                                  │
//!                                      ok ◄────────┴────────► io error
//!                                      │                       │
//!                                   Spilled                   Lost
//! ```
//!
//! ## Components
//!
//! - [`payload`]: the JSON document the datastore expects
//! - [`http`]: blocking `ureq` client run on a Tokio blocking worker
//! - [`memory`]: in-process sink for tests
//! - [`logging`]: log-only sink for dry runs
//! - [`spill`]: write-once JSON files for records that could not be sent
//! - [`transmission`]: failure counting and the deliver/drop/spill decision
//!
//! ## Failure Policy
//!
//! There is no retry inside a cycle. A failed delivery is either dropped
//! (the next cycle comes soon enough) or, once failures keep piling up,
//! written to disk so an operator can replay it later. Writing the spill file
//! is the last line of defence: if that fails too, the record is lost and the
//! loss is logged at `error` level.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use airis_connectors::http::{HttpConfig, HttpSink};
//! use airis_connectors::spill::SpillStore;
//! use airis_connectors::transmission::TransmissionPipeline;
//!
//! # async fn example(record: airis_core::CompositeRecord) -> Result<(), Box<dyn std::error::Error>> {
//! let sink = HttpSink::new(
//!     HttpConfig::new("https://project.supabase.co").service_key("anon-key"),
//! )?;
//! let mut pipeline = TransmissionPipeline::new(sink, SpillStore::new("/var/lib/airis/spill"));
//!
//! let outcome = pipeline.deliver(record).await;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "http")]
pub mod http;
pub mod logging;
pub mod memory;
pub mod payload;
pub mod spill;
pub mod transmission;

pub use logging::LogSink;
pub use memory::MemorySink;
pub use payload::TelemetryPayload;
pub use spill::{SpillStore, SpillWriteError};
pub use transmission::{DeliveryOutcome, TransmissionPipeline, TransmissionState};

use std::time::Duration;

use thiserror::Error;

/// Delivery attempt failed; counted towards the spill threshold
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Sink answered with a non-success status
    #[error("Server error {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// No answer within the attempt budget
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Sink is misconfigured
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Destination for telemetry payloads
///
/// One call is one delivery attempt. Implementations must not retry
/// internally; retry policy belongs to the transmission pipeline.
#[async_trait::async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Deliver one payload
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TransportError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

#[async_trait::async_trait]
impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TransportError> {
        (**self).send(payload).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Delivery statistics kept by the pipeline for logging
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeliveryStats {
    /// Payloads accepted by the sink
    pub sent: u64,
    /// Failed attempts (dropped or spilled)
    pub failed: u64,
    /// Payloads written to the spill directory
    pub spilled: u64,
    /// Payloads lost because the spill write failed
    pub lost: u64,
    /// Last transport or spill error message
    pub last_error: Option<String>,
}
