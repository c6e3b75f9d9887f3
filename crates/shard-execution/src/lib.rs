//! # Shard Execution - Per-Shard Message Execution Engine
//!
//! Executes the messages of one shard of a sharded EVM-style ledger:
//! gas purchase from value-denominated fee credit, value and currency
//! transfer, forwarding of the unspent budget to outbound calls, and the
//! bounce and refund of funds when a message fails.
//!
//! ## Message Lifecycle
//!
//! | Kind | Funding | On failure |
//! |------|---------|------------|
//! | External | Debited from the payer after authentication | Value and leftover fee credited back in place |
//! | Internal | Pre-funded by the source shard | Bounce message (value) and Refund message (fee) |
//! | Response | Pre-funded; resumes a recorded request | As internal |
//! | Refund / Bounce | Value only; never executes code | Never bounced |
//!
//! ## Guarantees
//!
//! - **Conservation**: value is moved, charged as gas, or carried by an
//!   emitted message; never created or destroyed
//! - **Isolation**: a failing message reverts only its own body
//! - **Idempotence**: a message hash executes at most once per block
//! - **Shard boundary**: synchronous effects never leave this shard
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Engine | `engine/` | Kind dispatch, settlement, receipts, block loop |
//! | Forwarding | `domain/forwarding.rs` | Splits the unspent budget |
//! | Precompiles | `precompiles/` | Crypto, messaging and currency built-ins |
//! | Block state | `state/` | Journaled account cache with snapshots |
//! | Service | `service.rs` | Async facade with stats |
//!
//! ## Usage Example
//!
//! ```ignore
//! use shard_execution::prelude::*;
//!
//! let engine = ExecutionEngine::new(EngineConfig::for_shard(ShardId(1)), interpreter)?;
//! let executor = BlockExecutor::new(engine);
//! let output = executor.execute_block(store, &block, inbound)?;
//! for receipt in &output.receipts {
//!     println!("{:?}: {}", receipt.msg_hash, receipt.status);
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod abi;
pub mod adapters;
pub mod codec;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod ports;
pub mod precompiles;
pub mod service;
pub mod state;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{
        Account, AsyncContext, BlockContext, ForwardKind, Log, OutMessage,
    };
    pub use crate::domain::forwarding::{resolve as resolve_forwarding, ForwardRequest, ForwardingPlan};
    pub use crate::domain::message::{DeployPayload, Message, MessageFlags, MessageKind};
    pub use crate::domain::receipt::{ExecutionStatus, Receipt};
    pub use crate::domain::value_objects::{
        Address, Bytes, CurrencyBalance, CurrencyId, Gas, Hash, ShardId, StorageKey,
        StorageValue, Value, U256,
    };

    // Engine
    pub use crate::config::{EngineConfig, StaticConfig};
    pub use crate::engine::{BlockExecutor, BlockOutput, ExecutionEngine};
    pub use crate::precompiles::{PrecompileSet, PrecompiledContract};
    pub use crate::state::BlockState;

    // Errors
    pub use crate::errors::{EngineError, ServiceError, StateError};

    // Ports
    pub use crate::ports::inbound::ShardExecutionApi;
    pub use crate::ports::outbound::{
        AccountStore, BlockHashOracle, CallFrame, CallKind, ConfigAccessor, ExitStatus,
        Interpreter, InterpreterOutcome, StateDb,
    };

    // Adapters
    pub use crate::adapters::{InMemoryAccountStore, InMemoryBlockHashes, NativeInterpreter};

    // Service
    pub use crate::service::{ServiceConfig, ServiceStats, ShardExecutionService};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
