//! # Execution Engine
//!
//! Processes one message at a time against the block state:
//!
//! ```text
//! message ──► kind dispatch ──► debit / credit ──► Interpreter ──► forwarding
//!                                   │                  │               │
//!                                   │            precompiles           ▼
//!                                   └────────────────────────► bounce / refund ──► Receipt
//! ```
//!
//! A failing message never disturbs other messages of the block: its body is
//! reverted through a snapshot, gas already used is still charged, attached
//! value is bounced and the unused fee is refunded. Only state or interpreter
//! faults surface as [`EngineError`] and abort the block.

pub mod block;
mod context;
mod dispatch;
mod receipt_builder;
mod settlement;

pub use block::{BlockExecutor, BlockOutput};
pub use context::ExecutionState;
pub use receipt_builder::{revert_reason, ReceiptBuilder};

use crate::adapters::InMemoryBlockHashes;
use crate::config::{EngineConfig, StaticConfig};
use crate::domain::entities::BlockContext;
use crate::domain::message::{Message, MessageKind};
use crate::domain::receipt::Receipt;
use crate::domain::value_objects::ShardId;
use crate::errors::EngineError;
use crate::metrics;
use crate::ports::outbound::{BlockHashOracle, ConfigAccessor, Interpreter};
use crate::precompiles::PrecompileSet;
use crate::state::BlockState;
use dispatch::MessageRun;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Per-shard message processor.
pub struct ExecutionEngine {
    config: EngineConfig,
    interpreter: Arc<dyn Interpreter>,
    precompiles: PrecompileSet,
    accessor: Arc<dyn ConfigAccessor>,
    block_hashes: Arc<dyn BlockHashOracle>,
}

impl ExecutionEngine {
    /// Creates an engine with the standard precompile table.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` does not validate.
    pub fn new(config: EngineConfig, interpreter: Arc<dyn Interpreter>) -> Result<Self, EngineError> {
        config.validate()?;
        let accessor: Arc<dyn ConfigAccessor> = Arc::new(StaticConfig::new(config.clone()));
        Ok(Self {
            config,
            interpreter,
            precompiles: PrecompileSet::standard(),
            accessor,
            block_hashes: Arc::new(InMemoryBlockHashes::new()),
        })
    }

    /// Replaces the precompile table.
    #[must_use]
    pub fn with_precompiles(mut self, precompiles: PrecompileSet) -> Self {
        self.precompiles = precompiles;
        self
    }

    /// Replaces the protocol parameter source.
    #[must_use]
    pub fn with_config_accessor(mut self, accessor: Arc<dyn ConfigAccessor>) -> Self {
        self.accessor = accessor;
        self
    }

    /// Replaces the block hash history.
    #[must_use]
    pub fn with_block_hashes(mut self, block_hashes: Arc<dyn BlockHashOracle>) -> Self {
        self.block_hashes = block_hashes;
        self
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shard this engine executes.
    #[must_use]
    pub fn shard_id(&self) -> ShardId {
        self.config.shard_id
    }

    /// Processes one message and returns its receipt.
    ///
    /// Every per-message failure is reported in the receipt. Outbound
    /// messages are listed in `receipt.out_messages`; delivering them is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// Storage or interpreter faults, and a block context for another shard.
    /// The block must be abandoned.
    #[instrument(skip(self, state, block, msg), fields(shard = %self.config.shard_id, block = block.number))]
    pub fn process_message(
        &self,
        state: &mut BlockState,
        block: &BlockContext,
        msg: &Message,
    ) -> Result<Receipt, EngineError> {
        if block.shard_id != self.config.shard_id {
            return Err(EngineError::Fatal(format!(
                "block of {} handed to engine of {}",
                block.shard_id, self.config.shard_id
            )));
        }

        state.begin_message();
        let run = MessageRun::new(self, state, block, msg);
        let receipt = match msg.kind() {
            MessageKind::External => run.external()?,
            MessageKind::Refund | MessageKind::Bounce => run.value_return()?,
            MessageKind::Internal | MessageKind::Response => run.internal()?,
        };

        metrics::record_message(receipt.status.as_str(), receipt.gas_used.0);
        debug!(
            msg_hash = ?receipt.msg_hash,
            status = %receipt.status,
            gas_used = receipt.gas_used.0,
            out_messages = receipt.out_messages.len(),
            "message processed"
        );
        Ok(receipt)
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("config", &self.config)
            .field("precompiles", &self.precompiles)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================
