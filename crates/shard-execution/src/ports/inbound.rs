//! # Driving Ports (API - Inbound)
//!
//! The interface a block producer uses to run blocks on one shard.

use crate::domain::entities::{Account, BlockContext};
use crate::domain::message::Message;
use crate::domain::receipt::Receipt;
use crate::domain::value_objects::{Address, Hash};
use crate::engine::BlockOutput;
use crate::errors::ServiceError;
use async_trait::async_trait;

/// Per-shard execution API.
#[async_trait]
pub trait ShardExecutionApi: Send + Sync {
    /// Executes `inbound` as one block and commits it.
    ///
    /// Per-message failures are reported in the receipts; an error means the
    /// block was abandoned and nothing was committed.
    async fn execute_block(
        &self,
        block: BlockContext,
        inbound: Vec<Message>,
    ) -> Result<BlockOutput, ServiceError>;

    /// Runs one message against committed state and discards the effects.
    async fn simulate_message(
        &self,
        block: BlockContext,
        message: Message,
    ) -> Result<Receipt, ServiceError>;

    /// Committed account, if any.
    async fn account(&self, address: Address) -> Result<Option<Account>, ServiceError>;

    /// Current state root.
    async fn state_root(&self) -> Result<Hash, ServiceError>;
}
