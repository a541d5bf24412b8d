//! # Wallet Telemetry
//!
//! Tracing bootstrap for hw-wallet processes.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HW_LOG_LEVEL` or `RUST_LOG` | `info` | Log level filter |
//! | `HW_SERVICE_NAME` | `hw-wallet` | Service name in log lines |
//!
//! ```rust,ignore
//! use wallet_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() {
//!     init_tracing(&TelemetryConfig::from_env()).expect("telemetry init");
//! }
//! ```

mod config;

pub use config::TelemetryConfig;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors from telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Initialize the global tracing subscriber.
///
/// Idempotent callers (e.g. parallel tests) should treat
/// [`TelemetryError::AlreadyInitialized`] as success.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
