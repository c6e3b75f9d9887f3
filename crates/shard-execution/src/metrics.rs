//! # Execution Metrics
//!
//! Prometheus metrics for message and block execution.
//!
//! Enable with the `metrics` feature:
//! ```toml
//! shard-execution = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `shard_messages_processed_total{status}` - messages processed, by final status
//! - `shard_gas_used_total` - gas charged to processed messages
//! - `shard_blocks_executed_total` - blocks committed

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Messages processed, labeled by status.
    pub static ref MESSAGES_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "shard_messages_processed_total",
        "Total number of messages processed",
        &["status"]
    )
    .expect("Failed to create MESSAGES_PROCESSED metric");

    /// Gas charged to processed messages.
    pub static ref GAS_USED: IntCounter = register_int_counter!(
        "shard_gas_used_total",
        "Total gas charged to processed messages"
    )
    .expect("Failed to create GAS_USED metric");

    /// Blocks committed.
    pub static ref BLOCKS_EXECUTED: IntCounter = register_int_counter!(
        "shard_blocks_executed_total",
        "Total number of blocks executed and committed"
    )
    .expect("Failed to create BLOCKS_EXECUTED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record one processed message.
#[cfg(feature = "metrics")]
pub fn record_message(status: &str, gas_used: u64) {
    MESSAGES_PROCESSED.with_label_values(&[status]).inc();
    GAS_USED.inc_by(gas_used);
}

/// Record a committed block.
#[cfg(feature = "metrics")]
pub fn record_block() {
    BLOCKS_EXECUTED.inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

/// Record one processed message.
#[cfg(not(feature = "metrics"))]
pub fn record_message(_status: &str, _gas_used: u64) {}

/// Record a committed block.
#[cfg(not(feature = "metrics"))]
pub fn record_block() {}
