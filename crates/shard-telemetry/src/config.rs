//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every event.
    pub service_name: String,

    /// Shard served by this process.
    pub shard_id: u16,

    /// Filter directive (trace, debug, info, warn, error, or `target=level` lists)
    pub log_level: String,

    /// Whether to write events to stdout at all
    pub console_output: bool,

    /// Whether to format events as JSON
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "shard-execution".to_string(),
            shard_id: 1,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHARD_SERVICE_NAME`: Service name (default: shard-execution)
    /// - `SHARD_ID`: Shard served (default: 1)
    /// - `SHARD_LOG_LEVEL` or `RUST_LOG`: Filter directive (default: info)
    /// - `SHARD_CONSOLE_OUTPUT`: Enable stdout output (default: true)
    /// - `SHARD_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    #[must_use]
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SHARD_SERVICE_NAME")
                .unwrap_or_else(|_| "shard-execution".to_string()),

            shard_id: env::var("SHARD_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),

            log_level: env::var("SHARD_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("SHARD_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v).unwrap_or(true))
                .unwrap_or(true),

            json_logs: env::var("SHARD_JSON_LOGS")
                .map(|v| parse_flag(&v).unwrap_or(false))
                .unwrap_or(is_container),
        }
    }

    /// Configuration for the engine of `shard`.
    #[must_use]
    pub fn for_shard(shard_id: u16) -> Self {
        Self {
            shard_id,
            ..Self::from_env()
        }
    }

    /// Service name including the shard.
    #[must_use]
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.shard_id)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
