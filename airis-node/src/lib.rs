//! # AIRIS Node
//!
//! Runs the telemetry pipeline on a host: loads the node configuration,
//! builds the aggregator and transmission pipeline from it, and drives them
//! from the sampling scheduler.
//!
//! ```text
//! airis.toml + AIRIS_* env + CLI
//!          │
//!          ▼
//!     NodeConfig ──► NodeContext ──► Aggregator ──┐
//!                                                 ├──► Scheduler::run
//!                                  Pipeline ──────┘
//! ```
//!
//! The binary uses [`hardware::SimulatedBus`]; on a board the same scheduler
//! runs against the real peripheral implementation of
//! [`airis_core::traits::SensorBus`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod hardware;
pub mod scheduler;
pub mod sink;

pub use config::{NodeConfig, NodeContext, WiringConfig};
pub use hardware::SimulatedBus;
pub use scheduler::{CycleOutcome, Scheduler, SchedulerStats};
pub use sink::SinkChoice;

use thiserror::Error;

/// Start-up failures of the node
#[derive(Error, Debug)]
pub enum NodeError {
    /// Threshold, calibration or profile data rejected
    #[error("schema error: {0}")]
    Schema(#[from] airis_schemas::SchemaError),

    /// Sensor table or device identity unusable
    #[error("setup error: {0}")]
    Setup(#[from] airis_core::SetupError),

    /// Sink could not be built
    #[error("transport error: {0}")]
    Transport(#[from] airis_connectors::TransportError),

    /// Configuration source could not be read or parsed
    #[error("config error: {0}")]
    Load(#[from] ::config::ConfigError),

    /// Configuration parsed but inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for node set-up
pub type Result<T> = std::result::Result<T, NodeError>;
