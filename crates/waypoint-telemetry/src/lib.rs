//! # Waypoint Telemetry
//!
//! Logging setup and dispatch metrics for Waypoint.
//!
//! - [`logging`] - `tracing-subscriber` initialisation (JSON or pretty)
//! - [`metrics`] - `waypoint_dispatch_total` and
//!   `waypoint_dispatch_duration_seconds` through the `metrics` facade

#![doc(html_root_url = "https://docs.rs/waypoint-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use crate::metrics::{describe_metrics, record_dispatch, DispatchOutcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
