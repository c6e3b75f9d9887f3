//! # Shard Execution Service
//!
//! Async facade over the synchronous [`BlockExecutor`].
//!
//! - One block at a time per shard: requests serialize on a `tokio` mutex
//! - Execution runs on the blocking pool, off the async workers
//! - Every request is tagged with a correlation id and counted in
//!   [`ServiceStats`]

use crate::adapters::{InMemoryAccountStore, NativeInterpreter};
use crate::config::EngineConfig;
use crate::domain::entities::{Account, BlockContext};
use crate::domain::message::Message;
use crate::domain::receipt::Receipt;
use crate::domain::value_objects::{Address, Hash, ShardId};
use crate::engine::{BlockExecutor, BlockOutput, ExecutionEngine};
use crate::errors::{EngineError, ServiceError};
use crate::ports::inbound::ShardExecutionApi;
use crate::ports::outbound::AccountStore;
use crate::state::BlockState;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Largest inbound batch accepted for one block.
    pub max_inbound_messages: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_inbound_messages: 10_000,
        }
    }
}

/// Statistics for the execution service.
#[derive(Debug, Default, Clone)]
pub struct ServiceStats {
    /// Blocks committed.
    pub blocks_executed: u64,
    /// Blocks abandoned on an engine error.
    pub blocks_failed: u64,
    /// Messages processed, nested ones included.
    pub messages_processed: u64,
    /// Messages that ended in `Success`.
    pub successful_messages: u64,
    /// Messages with any other status.
    pub failed_messages: u64,
    /// Gas charged across all blocks.
    pub total_gas_used: u64,
    /// Average block execution time in microseconds.
    pub avg_block_time_us: u64,
    /// Simulated messages.
    pub simulations: u64,
    /// Requests rejected before execution.
    pub rejected_requests: u64,
}

/// Async execution service of one shard.
pub struct ShardExecutionService {
    config: ServiceConfig,
    executor: Arc<BlockExecutor>,
    store: Arc<dyn AccountStore>,
    block_lock: Arc<Mutex<()>>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl ShardExecutionService {
    /// Create a service over `store`.
    pub fn new(executor: BlockExecutor, store: Arc<dyn AccountStore>, config: ServiceConfig) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
            store,
            block_lock: Arc::new(Mutex::new(())),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Shard served.
    #[must_use]
    pub fn shard_id(&self) -> ShardId {
        self.executor.engine().shard_id()
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    async fn admit(&self, block: &BlockContext, inbound: usize) -> Result<(), ServiceError> {
        let expected = self.shard_id();
        if block.shard_id != expected {
            warn!(expected = %expected, actual = %block.shard_id, "request for another shard");
            self.stats.write().await.rejected_requests += 1;
            return Err(ServiceError::WrongShard {
                expected: expected.0,
                actual: block.shard_id.0,
            });
        }
        if inbound > self.config.max_inbound_messages {
            warn!(inbound, max = self.config.max_inbound_messages, "inbound batch too large");
            self.stats.write().await.rejected_requests += 1;
            return Err(ServiceError::TooManyMessages {
                count: inbound,
                max: self.config.max_inbound_messages,
            });
        }
        Ok(())
    }

    /// Executes and commits one block.
    ///
    /// # Errors
    ///
    /// [`ServiceError::WrongShard`] and [`ServiceError::TooManyMessages`]
    /// before execution; [`ServiceError::Engine`] if the block was abandoned.
    #[instrument(skip(self, block, inbound), fields(correlation_id = %correlation_id, block = block.number))]
    pub async fn handle_execute_block(
        &self,
        correlation_id: Uuid,
        block: BlockContext,
        inbound: Vec<Message>,
    ) -> Result<BlockOutput, ServiceError> {
        self.admit(&block, inbound.len()).await?;
        info!(inbound = inbound.len(), "Processing block execution request");

        let guard = Arc::clone(&self.block_lock).lock_owned().await;
        let executor = Arc::clone(&self.executor);
        let store = Arc::clone(&self.store);
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            executor.execute_block(store, &block, inbound)
        })
        .await
        .map_err(|e| ServiceError::Join(e.to_string()))?;
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        let mut stats = self.stats.write().await;
        match &result {
            Ok(output) => {
                stats.blocks_executed += 1;
                for receipt in output.receipts.iter().flat_map(Receipt::iter_tree) {
                    stats.messages_processed += 1;
                    if receipt.success {
                        stats.successful_messages += 1;
                    } else {
                        stats.failed_messages += 1;
                    }
                }
                stats.total_gas_used = stats.total_gas_used.saturating_add(output.gas_used.0);
                let total = stats.blocks_executed;
                stats.avg_block_time_us = (stats.avg_block_time_us * (total - 1) + elapsed_us) / total;
                debug!(state_root = ?output.state_root, elapsed_us, "Block execution completed");
            }
            Err(e) => {
                stats.blocks_failed += 1;
                error!(error = %e, "Block execution failed");
            }
        }
        result.map_err(ServiceError::from)
    }

    /// Runs one message against committed state without committing.
    ///
    /// # Errors
    ///
    /// As [`handle_execute_block`](Self::handle_execute_block).
    #[instrument(skip(self, block, message), fields(correlation_id = %correlation_id))]
    pub async fn handle_simulate(
        &self,
        correlation_id: Uuid,
        block: BlockContext,
        message: Message,
    ) -> Result<Receipt, ServiceError> {
        self.admit(&block, 1).await?;

        let guard = Arc::clone(&self.block_lock).lock_owned().await;
        let executor = Arc::clone(&self.executor);
        let store = Arc::clone(&self.store);
        let receipt = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut state = BlockState::new(store);
            executor.engine().process_message(&mut state, &block, &message)
        })
        .await
        .map_err(|e| ServiceError::Join(e.to_string()))??;

        self.stats.write().await.simulations += 1;
        debug!(status = %receipt.status, gas_used = receipt.gas_used.0, "Simulation completed");
        Ok(receipt)
    }
}

impl std::fmt::Debug for ShardExecutionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardExecutionService")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Create a service with in-memory adapters and no contracts (for testing).
///
/// # Errors
///
/// Never with the default configuration.
pub fn create_test_service() -> Result<ShardExecutionService, EngineError> {
    let engine = ExecutionEngine::new(EngineConfig::default(), Arc::new(NativeInterpreter::new()))?;
    Ok(ShardExecutionService::new(
        BlockExecutor::new(engine),
        Arc::new(InMemoryAccountStore::new()),
        ServiceConfig::default(),
    ))
}

// =============================================================================
// ShardExecutionApi Implementation
// =============================================================================

#[async_trait]
impl ShardExecutionApi for ShardExecutionService {
    async fn execute_block(
        &self,
        block: BlockContext,
        inbound: Vec<Message>,
    ) -> Result<BlockOutput, ServiceError> {
        self.handle_execute_block(Uuid::new_v4(), block, inbound).await
    }

    async fn simulate_message(
        &self,
        block: BlockContext,
        message: Message,
    ) -> Result<Receipt, ServiceError> {
        self.handle_simulate(Uuid::new_v4(), block, message).await
    }

    async fn account(&self, address: Address) -> Result<Option<Account>, ServiceError> {
        Ok(self.store.load_account(address).map_err(EngineError::from)?)
    }

    async fn state_root(&self) -> Result<Hash, ServiceError> {
        Ok(self.store.state_root().map_err(EngineError::from)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
