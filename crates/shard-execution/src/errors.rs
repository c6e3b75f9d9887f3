//! # Error Types
//!
//! All error types for shard message execution.
//!
//! Per-message failures never surface as `Err`; they become an
//! [`ExecutionStatus`](crate::domain::ExecutionStatus) inside the receipt.
//! Only [`EngineError`] aborts a block.

use crate::domain::value_objects::{Address, Value};
use thiserror::Error;

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from the account store or the block state cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Required state missing from the store.
    #[error("state not found for address: {0:?}")]
    NotFound(Address),

    /// Stored data is inconsistent.
    #[error("state corruption detected: {0}")]
    Corrupted(String),

    /// Backend unreachable.
    #[error("state backend unavailable")]
    Unavailable,

    /// Other state error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// INTERPRETER ERRORS
// =============================================================================

/// Interpreter invariant violations. Always fatal to the block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    /// The interpreter broke one of its own invariants.
    #[error("interpreter fault: {0}")]
    Fatal(String),

    /// A state callback failed.
    #[error("state error during execution: {0}")]
    State(#[from] StateError),
}

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors from precompiled contract execution.
///
/// Captured into the call result and handed back to the calling contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Required gas exceeds the gas supplied to the call.
    #[error("precompile out of gas")]
    OutOfGas,

    /// Arguments could not be decoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller balance too low.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount needed.
        required: Value,
        /// Amount held.
        available: Value,
    },

    /// Caller currency balance too low.
    #[error("insufficient currency {currency:?}: required {required}")]
    InsufficientCurrency {
        /// Currency id.
        currency: Address,
        /// Amount needed.
        required: Value,
    },

    /// Outbound message addressed to the main shard.
    #[error("message to main shard is forbidden")]
    MessageToMainShard,

    /// Synchronous operation targeting another shard.
    #[error("cross-shard destination {0:?} not allowed for synchronous call")]
    CrossShardMessage(Address),

    /// Address in the table without an implementation.
    #[error("precompile not implemented: {0:?}")]
    NotImplemented(Address),

    /// Explicit revert.
    #[error("precompile reverted: {0}")]
    Reverted(String),

    /// State failure inside the precompile. Fatal.
    #[error(transparent)]
    State(#[from] StateError),
}

// =============================================================================
// FORWARDING ERRORS
// =============================================================================

/// Fee budget could not cover the queued async calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForwardingError {
    /// `Value`-kind reservations exceed the budget.
    #[error("insufficient fee budget: requested {requested}, available {available}")]
    InsufficientBudget {
        /// Amount requested by the failing call.
        requested: Value,
        /// Budget left when it was processed.
        available: Value,
    },

    /// `Percentage`-kind requests sum above 100.
    #[error("forwarded percentages exceed 100")]
    PercentageOverflow,
}

// =============================================================================
// ABI / CODEC / CONFIG ERRORS
// =============================================================================

/// Precompile argument decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Input ended before the requested word.
    #[error("input too short: need {needed} bytes, have {actual}")]
    TooShort {
        /// Bytes needed.
        needed: usize,
        /// Bytes present.
        actual: usize,
    },

    /// A word does not fit the requested type.
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
}

/// Wire format errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// bincode failure.
    #[error("serialization failed: {0}")]
    Bincode(#[from] bincode::Error),

    /// Frame header or body truncated.
    #[error("truncated frame: need {needed} bytes, have {actual}")]
    Truncated {
        /// Bytes needed.
        needed: usize,
        /// Bytes present.
        actual: usize,
    },

    /// Payload larger than a frame can describe.
    #[error("payload too large: {0} bytes")]
    TooLarge(usize),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// An environment variable could not be parsed.
    #[error("invalid environment variable {name}: {value}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// JSON parse failure.
    #[error("config parse error: {0}")]
    Parse(String),
}

// =============================================================================
// ENGINE ERRORS
// =============================================================================

/// Fatal errors that abort block execution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine invariant violated.
    #[error("fatal engine error: {0}")]
    Fatal(String),

    /// Storage failure.
    #[error(transparent)]
    State(#[from] StateError),

    /// Interpreter failure.
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),

    /// Unusable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<PrecompileError> for EngineError {
    fn from(err: PrecompileError) -> Self {
        match err {
            PrecompileError::State(state) => EngineError::State(state),
            other => EngineError::Fatal(other.to_string()),
        }
    }
}

// =============================================================================
// SERVICE ERRORS
// =============================================================================

/// Errors from the async service facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Block execution aborted.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Request targeted a different shard.
    #[error("wrong shard: service runs {expected}, request for {actual}")]
    WrongShard {
        /// Service shard.
        expected: u16,
        /// Requested shard.
        actual: u16,
    },

    /// Inbound batch above the configured limit.
    #[error("too many inbound messages: {count} (max {max})")]
    TooManyMessages {
        /// Messages submitted.
        count: usize,
        /// Configured limit.
        max: usize,
    },

    /// Blocking task panicked or was cancelled.
    #[error("execution task failed: {0}")]
    Join(String),
}
