//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for wallet logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for log lines.
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error), EnvFilter syntax.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "hw-wallet".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// - `HW_SERVICE_NAME`: service name (default: hw-wallet)
    /// - `HW_LOG_LEVEL` or `RUST_LOG`: log level (default: info)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("HW_SERVICE_NAME").unwrap_or_else(|_| "hw-wallet".to_string()),
            log_level: env::var("HW_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
        }
    }
}
