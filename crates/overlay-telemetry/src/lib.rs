//! # Overlay Telemetry
//!
//! Logging bootstrap for the NAKT overlay simulation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use overlay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Simulation runs here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NK_SERVICE_NAME` | `nakt-overlay` | Service name in log lines |
//! | `NK_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `NK_CONSOLE_OUTPUT` | `true` | Write logs to stderr |
//! | `NK_JSON_LOGS` | `false` | JSON lines instead of pretty output |

#![warn(missing_docs)]

mod config;
mod logging;
mod subscriber;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed
    #[error("Telemetry already initialized: {0}")]
    AlreadyInitialized(String),

    /// The log filter directive could not be parsed
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Install the global `tracing` subscriber.
///
/// Returns a guard to hold for the lifetime of the application. A second
/// call in the same process fails with [`TelemetryError::AlreadyInitialized`].
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    subscriber::install(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active. Logs a shutdown line on drop.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
