//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the execution engine depends on:
//! - [`AccountStore`]: committed per-shard account state
//! - [`Interpreter`]: contract bytecode execution
//! - [`BlockHashOracle`]: historical block hashes
//! - [`ConfigAccessor`]: read-only protocol parameters
//!
//! plus [`StateDb`], the capability interface the engine hands to the
//! interpreter for every state-touching operation.
//!
//! All ports are synchronous. Block execution never waits on I/O between
//! messages.

use crate::domain::entities::{Account, BlockContext, Log};
use crate::domain::value_objects::{
    Address, Bytes, CurrencyId, Gas, Hash, ShardId, StorageKey, StorageValue, Value,
};
use crate::errors::{InterpreterError, StateError};
use crate::precompiles::{PrecompileCall, PrecompileCallResult};
use crate::state::SnapshotId;
use serde::{Deserialize, Serialize};

// =============================================================================
// ACCOUNT STORE
// =============================================================================

/// Writes produced by one successfully executed block.
///
/// Accounts and slots are sorted by address (and key) so that every replica
/// applies them in the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWrites {
    /// Full post-block state of every touched account.
    pub accounts: Vec<Account>,
    /// Written storage slots.
    pub storage: Vec<(Address, StorageKey, StorageValue)>,
}

impl BlockWrites {
    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.storage.is_empty()
    }
}

/// Committed account state of one shard.
///
/// The engine reads through this while executing and writes only once, via
/// [`AccountStore::commit`], after the whole block succeeded.
pub trait AccountStore: Send + Sync {
    /// Loads an account. `None` if it was never created.
    fn load_account(&self, address: Address) -> Result<Option<Account>, StateError>;

    /// Loads a storage slot. Zero if never written.
    fn load_storage(&self, address: Address, key: StorageKey) -> Result<StorageValue, StateError>;

    /// Applies a block's writes atomically and returns the new state root.
    fn commit(&self, writes: BlockWrites) -> Result<Hash, StateError>;

    /// Current state root.
    fn state_root(&self) -> Result<Hash, StateError>;

    /// Storage root of one account.
    fn storage_root(&self, address: Address) -> Result<Hash, StateError>;
}

// =============================================================================
// INTERPRETER
// =============================================================================

/// Why the interpreter is being invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Run the constructor of freshly installed code.
    Deploy,
    /// Ordinary message execution.
    Call,
    /// Resume the caller with the result of a request.
    Response,
    /// Authenticate an external message. Must not mutate state.
    VerifyExternal,
}

/// One top-level interpreter invocation.
#[derive(Clone, Debug)]
pub struct CallFrame<'a> {
    /// Invocation kind.
    pub kind: CallKind,
    /// Message sender.
    pub caller: Address,
    /// Executing contract.
    pub address: Address,
    /// Code to run.
    pub code: &'a [u8],
    /// Call data.
    pub input: &'a [u8],
    /// Value credited to `address` with this message.
    pub value: Value,
    /// Gas available.
    pub gas_limit: Gas,
    /// True for internal messages.
    pub is_internal: bool,
    /// Request id for responses, zero otherwise.
    pub request_id: u64,
}

/// How an interpreter run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal return.
    Success,
    /// Explicit revert with return data.
    Revert,
    /// Gas exhausted.
    OutOfGas,
    /// Any other exceptional halt.
    Failed(String),
}

/// Result of an interpreter run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpreterOutcome {
    /// Exit status.
    pub status: ExitStatus,
    /// Return data (or revert data).
    pub output: Bytes,
    /// Gas consumed. Must not exceed the frame's limit.
    pub gas_used: Gas,
}

impl InterpreterOutcome {
    /// Successful run.
    #[must_use]
    pub fn success(output: impl Into<Bytes>, gas_used: Gas) -> Self {
        Self {
            status: ExitStatus::Success,
            output: output.into(),
            gas_used,
        }
    }

    /// Reverted run.
    #[must_use]
    pub fn revert(output: impl Into<Bytes>, gas_used: Gas) -> Self {
        Self {
            status: ExitStatus::Revert,
            output: output.into(),
            gas_used,
        }
    }

    /// Out-of-gas run; all gas consumed.
    #[must_use]
    pub fn out_of_gas(gas_limit: Gas) -> Self {
        Self {
            status: ExitStatus::OutOfGas,
            output: Bytes::new(),
            gas_used: gas_limit,
        }
    }

    /// Returns true on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExitStatus::Success
    }
}

/// Contract code executor.
///
/// Implementations call back into [`StateDb`] for every state access. The
/// engine wraps each invocation in a snapshot and reverts it unless the
/// outcome is a success.
pub trait Interpreter: Send + Sync {
    /// Runs `frame` against `state`.
    ///
    /// # Errors
    ///
    /// Only for invariant violations or state failures. Contract-level
    /// failures are reported through [`InterpreterOutcome::status`].
    fn execute(
        &self,
        frame: CallFrame<'_>,
        state: &mut dyn StateDb,
    ) -> Result<InterpreterOutcome, InterpreterError>;
}

// =============================================================================
// STATE CAPABILITY INTERFACE
// =============================================================================

/// State operations available to running contract code.
///
/// Implemented once by the engine's execution state.
pub trait StateDb {
    /// Shard being executed.
    fn shard_id(&self) -> ShardId;

    /// Block environment.
    fn block(&self) -> &BlockContext;

    /// Returns true if the account exists.
    fn exists(&mut self, address: Address) -> Result<bool, StateError>;

    /// Native balance.
    fn get_balance(&mut self, address: Address) -> Result<Value, StateError>;

    /// Moves `amount` between two accounts on this shard.
    ///
    /// Only the running contract may be `from`. Returns false (and changes
    /// nothing) otherwise, or if `from` cannot cover it or `to` is on
    /// another shard.
    fn transfer(&mut self, from: Address, to: Address, amount: Value) -> Result<bool, StateError>;

    /// Contract code.
    fn get_code(&mut self, address: Address) -> Result<Bytes, StateError>;

    /// Hash of contract code.
    fn get_code_hash(&mut self, address: Address) -> Result<Hash, StateError>;

    /// Reads a storage slot.
    fn get_state(&mut self, address: Address, key: StorageKey) -> Result<StorageValue, StateError>;

    /// Writes a storage slot.
    fn set_state(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError>;

    /// Currency balance.
    fn get_currency(&mut self, address: Address, currency: CurrencyId)
        -> Result<Value, StateError>;

    /// Records a log.
    fn add_log(&mut self, log: Log);

    /// Takes a snapshot.
    fn snapshot(&mut self) -> SnapshotId;

    /// Reverts everything done since `id`.
    fn revert_to_snapshot(&mut self, id: SnapshotId) -> Result<(), StateError>;

    /// Returns true if `address` is a precompile.
    fn is_precompile(&self, address: Address) -> bool;

    /// Calls a precompile on behalf of the running contract, whatever
    /// `call.caller` claims. Precompile failures come back inside the
    /// result; only state failures are errors.
    fn call_precompile(&mut self, call: PrecompileCall) -> Result<PrecompileCallResult, StateError>;

    /// Hash of a historical block.
    fn block_hash(&self, number: u64) -> Option<Hash>;
}

// =============================================================================
// BLOCK HASHES
// =============================================================================

/// Historical block hash lookup.
pub trait BlockHashOracle: Send + Sync {
    /// Hash of block `number`, if known.
    fn block_hash(&self, number: u64) -> Option<Hash>;
}

// =============================================================================
// CONFIG ACCESSOR
// =============================================================================

/// Read-only protocol parameters.
pub trait ConfigAccessor: Send + Sync {
    /// The coordinating shard.
    fn main_shard(&self) -> ShardId;

    /// Number of shards including the main shard.
    fn shard_count(&self) -> u16;

    /// The only account allowed to mint currency.
    fn minter(&self) -> Address;

    /// Gas price used where a block leaves a shard's price at zero.
    fn gas_price_scale(&self) -> Value;

    /// Validator accounts of `shard`.
    fn validators(&self, shard: ShardId) -> Vec<Address>;

    /// Whether contracts may address messages to the main shard.
    fn forbids_main_shard_messages(&self) -> bool {
        true
    }

    /// Returns true if `shard` exists.
    fn is_valid_shard(&self, shard: ShardId) -> bool {
        shard.0 < self.shard_count()
    }
}
