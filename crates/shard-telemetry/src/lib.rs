//! # Shard Telemetry
//!
//! Logging bootstrap for processes hosting a shard execution engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shard_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // Engine events are now written to stdout
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SHARD_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `SHARD_JSON_LOGS` | `false` (`true` in containers) | JSON formatting |
//! | `SHARD_CONSOLE_OUTPUT` | `true` | Write events to stdout |
//! | `SHARD_SERVICE_NAME` | `shard-execution` | Service name |
//! | `SHARD_ID` | `1` | Shard served |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};

#[doc(hidden)]
pub use tracing;

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    Init(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Root span for a shard's events.
///
/// ```rust,ignore
/// let _span = shard_telemetry::shard_span!(1).entered();
/// ```
#[macro_export]
macro_rules! shard_span {
    ($shard:expr) => {
        $crate::tracing::info_span!("shard", shard = $shard)
    };
}
