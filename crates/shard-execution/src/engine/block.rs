//! # Block Executor
//!
//! Runs a batch of inbound messages as one block:
//!
//! 1. Inbound messages in the given order
//! 2. Same-shard messages they spawn, FIFO, up to `max_same_block_messages`
//! 3. One commit of all buffered writes
//!
//! Receipts of messages spawned and executed within the block are nested in
//! the receipt of the message that spawned them. Messages left undelivered
//! (other shards, or past the cap) are returned for routing.

use super::ExecutionEngine;
use crate::domain::entities::BlockContext;
use crate::domain::message::Message;
use crate::domain::receipt::Receipt;
use crate::domain::value_objects::{Gas, Hash};
use crate::errors::EngineError;
use crate::metrics;
use crate::ports::outbound::AccountStore;
use crate::state::BlockState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Result of one executed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOutput {
    /// One receipt per inbound message, in order, with nested receipts.
    pub receipts: Vec<Receipt>,
    /// Messages to route to other shards or to later blocks.
    pub out_messages: Vec<Message>,
    /// State root after commit.
    pub state_root: Hash,
    /// Gas charged across every processed message.
    pub gas_used: Gas,
}

impl BlockOutput {
    /// Number of processed messages, nested ones included.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.receipts.iter().map(|r| r.iter_tree().count()).sum()
    }
}

/// Executes whole blocks on one shard.
#[derive(Debug)]
pub struct BlockExecutor {
    engine: ExecutionEngine,
}

impl BlockExecutor {
    /// Wraps `engine`.
    #[must_use]
    pub fn new(engine: ExecutionEngine) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Processes `inbound` and commits the result to `store`.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`] aborts the block; nothing is committed.
    #[instrument(skip(self, store, block, inbound), fields(shard = %block.shard_id, block = block.number, inbound = inbound.len()))]
    pub fn execute_block(
        &self,
        store: Arc<dyn AccountStore>,
        block: &BlockContext,
        inbound: Vec<Message>,
    ) -> Result<BlockOutput, EngineError> {
        let mut state = BlockState::new(Arc::clone(&store));
        let (receipts, out_messages) = self.run(&mut state, block, inbound).map_err(|err| {
            error!(%err, "block aborted");
            err
        })?;

        let state_root = store.commit(state.into_writes())?;
        let gas_used = receipts
            .iter()
            .flat_map(Receipt::iter_tree)
            .fold(Gas::ZERO, |acc, r| acc.saturating_add(r.gas_used));
        let output = BlockOutput {
            receipts,
            out_messages,
            state_root,
            gas_used,
        };

        metrics::record_block();
        info!(
            processed = output.processed_count(),
            out_messages = output.out_messages.len(),
            gas_used = gas_used.0,
            ?state_root,
            "block executed"
        );
        Ok(output)
    }

    /// Processes `inbound` against `state` without committing.
    ///
    /// # Errors
    ///
    /// As [`execute_block`](Self::execute_block).
    pub fn run(
        &self,
        state: &mut BlockState,
        block: &BlockContext,
        inbound: Vec<Message>,
    ) -> Result<(Vec<Receipt>, Vec<Message>), EngineError> {
        let config = self.engine.config();
        let mut receipts = Vec::with_capacity(inbound.len());
        let mut queue: VecDeque<(Vec<usize>, Message)> = VecDeque::new();
        let mut out_messages = Vec::new();
        let mut delivered = 0usize;

        for msg in inbound {
            let receipt = self.engine.process_message(state, block, &msg)?;
            let path = vec![receipts.len()];
            self.route(&receipt, &path, &mut queue, &mut out_messages, &mut delivered);
            receipts.push(receipt);
        }

        while let Some((parent, msg)) = queue.pop_front() {
            let receipt = self.engine.process_message(state, block, &msg)?;
            let Some(slot) = receipt_at(&mut receipts, &parent) else {
                return Err(EngineError::Fatal("receipt tree out of sync".into()));
            };
            let mut path = parent;
            path.push(slot.out_receipts.len());
            self.route(&receipt, &path, &mut queue, &mut out_messages, &mut delivered);
            if let Some(slot) = receipt_at(&mut receipts, &path[..path.len() - 1]) {
                slot.out_receipts.push(receipt);
            }
        }

        if delivered >= config.max_same_block_messages {
            info!(cap = config.max_same_block_messages, "same-block delivery cap reached");
        }
        Ok((receipts, out_messages))
    }

    /// Queues same-shard spawns for this block, everything else for routing.
    fn route(
        &self,
        receipt: &Receipt,
        path: &[usize],
        queue: &mut VecDeque<(Vec<usize>, Message)>,
        out_messages: &mut Vec<Message>,
        delivered: &mut usize,
    ) {
        let config = self.engine.config();
        for msg in &receipt.out_messages {
            let local = msg.destination_shard() == config.shard_id;
            if local && config.same_block_delivery && *delivered < config.max_same_block_messages {
                *delivered += 1;
                queue.push_back((path.to_vec(), msg.clone()));
            } else {
                out_messages.push(msg.clone());
            }
        }
    }
}

fn receipt_at<'r>(receipts: &'r mut [Receipt], path: &[usize]) -> Option<&'r mut Receipt> {
    let (first, rest) = path.split_first()?;
    let mut current = receipts.get_mut(*first)?;
    for index in rest {
        current = current.out_receipts.get_mut(*index)?;
    }
    Some(current)
}
