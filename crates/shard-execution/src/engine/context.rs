//! # Execution State
//!
//! The engine's implementation of [`StateDb`], handed to the interpreter for
//! the duration of one invocation.

use crate::domain::entities::{BlockContext, Log};
use crate::domain::message::Message;
use crate::domain::receipt::ExecutionStatus;
use crate::domain::value_objects::{
    Address, Bytes, CurrencyId, Hash, ShardId, StorageKey, StorageValue, Value,
};
use crate::errors::{PrecompileError, StateError};
use crate::ports::outbound::{BlockHashOracle, ConfigAccessor, StateDb};
use crate::precompiles::{PrecompileCall, PrecompileCallResult, PrecompileEnv, PrecompileSet};
use crate::state::{BlockState, SnapshotId};
use tracing::{trace, warn};

/// Capability interface over the block state for one interpreter run.
pub struct ExecutionState<'a> {
    state: &'a mut BlockState,
    block: &'a BlockContext,
    precompiles: &'a PrecompileSet,
    config: &'a dyn ConfigAccessor,
    block_hashes: &'a dyn BlockHashOracle,
    message: &'a Message,
    /// Contract whose code is running. Precompiles and transfers act for it.
    address: Address,
    last_precompile_error: Option<PrecompileError>,
}

impl<'a> ExecutionState<'a> {
    /// Wraps `state` for running the code at `address` on behalf of `message`.
    pub fn new(
        state: &'a mut BlockState,
        block: &'a BlockContext,
        precompiles: &'a PrecompileSet,
        config: &'a dyn ConfigAccessor,
        block_hashes: &'a dyn BlockHashOracle,
        message: &'a Message,
        address: Address,
    ) -> Self {
        Self {
            state,
            block,
            precompiles,
            config,
            block_hashes,
            message,
            address,
            last_precompile_error: None,
        }
    }

    /// Most recent failed precompile call, if any.
    #[must_use]
    pub fn last_precompile_error(&self) -> Option<&PrecompileError> {
        self.last_precompile_error.as_ref()
    }

    /// Status of a failed run, refined by the last precompile failure.
    #[must_use]
    pub fn failure_status(&self) -> ExecutionStatus {
        match &self.last_precompile_error {
            Some(PrecompileError::MessageToMainShard) => ExecutionStatus::MessageToMainShardForbidden,
            Some(PrecompileError::CrossShardMessage(_)) => ExecutionStatus::CrossShardMessageForbidden,
            Some(_) => ExecutionStatus::PrecompileReverted,
            None => ExecutionStatus::ExecutionReverted,
        }
    }
}

impl StateDb for ExecutionState<'_> {
    fn shard_id(&self) -> ShardId {
        self.block.shard_id
    }

    fn block(&self) -> &BlockContext {
        self.block
    }

    fn exists(&mut self, address: Address) -> Result<bool, StateError> {
        self.state.exists(address)
    }

    fn get_balance(&mut self, address: Address) -> Result<Value, StateError> {
        self.state.balance(address)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Value) -> Result<bool, StateError> {
        if from != self.address {
            warn!(?from, executing = ?self.address, "transfer from a foreign account refused");
            return Ok(false);
        }
        if to.shard_id() != self.block.shard_id || to.precompile_id().is_some() {
            return Ok(false);
        }
        if !self.state.sub_balance(from, amount)? {
            return Ok(false);
        }
        self.state.add_balance(to, amount)?;
        Ok(true)
    }

    fn get_code(&mut self, address: Address) -> Result<Bytes, StateError> {
        self.state.code(address)
    }

    fn get_code_hash(&mut self, address: Address) -> Result<Hash, StateError> {
        self.state.code_hash(address)
    }

    fn get_state(&mut self, address: Address, key: StorageKey) -> Result<StorageValue, StateError> {
        self.state.storage(address, key)
    }

    fn set_state(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        self.state.set_storage(address, key, value)
    }

    fn get_currency(
        &mut self,
        address: Address,
        currency: CurrencyId,
    ) -> Result<Value, StateError> {
        self.state.currency(address, currency)
    }

    fn add_log(&mut self, log: Log) {
        self.state.add_log(log);
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.state.snapshot()
    }

    fn revert_to_snapshot(&mut self, id: SnapshotId) -> Result<(), StateError> {
        self.state.revert_to_snapshot(id)
    }

    fn is_precompile(&self, address: Address) -> bool {
        self.precompiles.contains(address)
    }

    fn call_precompile(&mut self, call: PrecompileCall) -> Result<PrecompileCallResult, StateError> {
        if call.caller != self.address {
            warn!(claimed = ?call.caller, executing = ?self.address, "precompile caller overridden");
        }
        let mut env = PrecompileEnv {
            state: &mut *self.state,
            block: self.block,
            config: self.config,
            message: self.message,
            caller: self.address,
            value: call.value,
        };
        let result = self.precompiles.call(&mut env, &call)?;
        trace!(
            address = ?call.address,
            gas_used = result.gas_used.0,
            ok = result.is_success(),
            "precompile call"
        );
        if let Some(err) = &result.error {
            self.last_precompile_error = Some(err.clone());
        }
        Ok(result)
    }

    fn block_hash(&self, number: u64) -> Option<Hash> {
        if number >= self.block.number {
            return None;
        }
        self.block_hashes.block_hash(number)
    }
}
