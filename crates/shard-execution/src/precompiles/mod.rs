//! # Precompiled Contracts
//!
//! Fixed address table of native operations reachable from contract code.
//!
//! | Address | Operation |
//! |---------|-----------|
//! | `0x01`-`0x13` | Conventional crypto (`ecrecover`, `sha256`, `identity`, `modexp`; the rest reserved) |
//! | `0xd0`-`0xd5` | Currency mint/balance/transfer, message tokens, gas price, send request |
//! | `0xfc`-`0xff` | Raw send, async call, verify signature, is-internal |
//!
//! The table is built once by [`PrecompileSet::standard`] and handed to the
//! engine. These addresses never change.
//!
//! Each call charges [`PrecompiledContract::required_gas`] before running and
//! runs inside a snapshot that is reverted when the precompile fails. A
//! failure is returned to the calling contract; only state errors escape.

pub mod currency;
pub mod ecrecover;
pub mod identity;
pub mod messaging;
pub mod modexp;
pub mod sha256;

use crate::domain::entities::BlockContext;
use crate::domain::message::Message;
use crate::domain::value_objects::{Address, Bytes, Gas, Value};
use crate::errors::{PrecompileError, StateError};
use crate::ports::outbound::ConfigAccessor;
use crate::state::BlockState;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

// =============================================================================
// TABLE ADDRESSES
// =============================================================================

/// Table bytes of every precompile.
pub mod ids {
    /// Signer recovery.
    pub const ECRECOVER: u8 = 0x01;
    /// SHA-256.
    pub const SHA256: u8 = 0x02;
    /// RIPEMD-160 (reserved, not implemented).
    pub const RIPEMD160: u8 = 0x03;
    /// Identity copy.
    pub const IDENTITY: u8 = 0x04;
    /// Modular exponentiation.
    pub const MODEXP: u8 = 0x05;
    /// Last reserved crypto slot.
    pub const LAST_CRYPTO: u8 = 0x13;
    /// Mint currency.
    pub const MINT_CURRENCY: u8 = 0xd0;
    /// Currency balance.
    pub const CURRENCY_BALANCE: u8 = 0xd1;
    /// Synchronous token transfer.
    pub const SEND_TOKENS: u8 = 0xd2;
    /// Tokens attached to the current message.
    pub const MESSAGE_TOKENS: u8 = 0xd3;
    /// Gas price query.
    pub const GAS_PRICE: u8 = 0xd4;
    /// Async call expecting a response.
    pub const SEND_REQUEST: u8 = 0xd5;
    /// Raw outbound message.
    pub const SEND_RAW_MESSAGE: u8 = 0xfc;
    /// Async call.
    pub const ASYNC_CALL: u8 = 0xfd;
    /// Signature verification.
    pub const VERIFY_SIGNATURE: u8 = 0xfe;
    /// Is-internal check.
    pub const IS_INTERNAL: u8 = 0xff;
}

// =============================================================================
// CALL TYPES
// =============================================================================

/// A precompile invocation coming from contract code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileCall {
    /// Precompile address.
    pub address: Address,
    /// Calling contract.
    pub caller: Address,
    /// Call data.
    pub input: Bytes,
    /// Value attached to the call.
    pub value: Value,
    /// Gas supplied to the call.
    pub gas: Gas,
}

/// Result handed back to the calling contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileCallResult {
    /// Return data. Empty on failure.
    pub output: Bytes,
    /// Gas charged.
    pub gas_used: Gas,
    /// Failure, if any. State changes of a failed call are reverted.
    pub error: Option<PrecompileError>,
}

impl PrecompileCallResult {
    /// Returns true when the call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn failed(error: PrecompileError, gas_used: Gas) -> Self {
        Self {
            output: Bytes::new(),
            gas_used,
            error: Some(error),
        }
    }
}

/// Everything a precompile may touch.
pub struct PrecompileEnv<'a> {
    /// Block state of the executing shard.
    pub state: &'a mut BlockState,
    /// Block environment.
    pub block: &'a BlockContext,
    /// Protocol parameters.
    pub config: &'a dyn ConfigAccessor,
    /// Message being executed.
    pub message: &'a Message,
    /// Calling contract.
    pub caller: Address,
    /// Value attached to the call.
    pub value: Value,
}

/// A native contract at a fixed address.
pub trait PrecompiledContract: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Gas charged before `run`.
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Whether a non-zero call value is meaningful to this precompile.
    fn accepts_value(&self) -> bool {
        false
    }

    /// Executes the precompile.
    ///
    /// # Errors
    ///
    /// Any [`PrecompileError`] reverts the call. [`PrecompileError::State`]
    /// additionally aborts the block.
    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError>;
}

/// Placeholder for reserved addresses.
#[derive(Clone, Copy, Debug)]
pub struct Unimplemented(pub u8);

impl PrecompiledContract for Unimplemented {
    fn name(&self) -> &'static str {
        "unimplemented"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        0
    }

    fn run(&self, _env: &mut PrecompileEnv<'_>, _input: &[u8]) -> Result<Bytes, PrecompileError> {
        Err(PrecompileError::NotImplemented(Address::precompile(self.0)))
    }
}

// =============================================================================
// DISPATCH TABLE
// =============================================================================

/// Address to handler table.
pub struct PrecompileSet {
    table: BTreeMap<u8, Box<dyn PrecompiledContract>>,
}

impl PrecompileSet {
    /// An empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// The standard table.
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.insert(ids::ECRECOVER, ecrecover::Ecrecover);
        set.insert(ids::SHA256, sha256::Sha256Precompile);
        set.insert(ids::IDENTITY, identity::Identity);
        set.insert(ids::MODEXP, modexp::ModExp);
        for id in (ids::RIPEMD160..=ids::LAST_CRYPTO)
            .filter(|id| !matches!(*id, ids::IDENTITY | ids::MODEXP))
        {
            set.insert(id, Unimplemented(id));
        }
        set.insert(ids::MINT_CURRENCY, currency::MintCurrency);
        set.insert(ids::CURRENCY_BALANCE, currency::CurrencyBalanceOf);
        set.insert(ids::SEND_TOKENS, currency::SendTokens);
        set.insert(ids::MESSAGE_TOKENS, currency::MessageTokens);
        set.insert(ids::GAS_PRICE, currency::GasPrice);
        set.insert(ids::SEND_REQUEST, messaging::SendRequest);
        set.insert(ids::SEND_RAW_MESSAGE, messaging::SendRawMessage);
        set.insert(ids::ASYNC_CALL, messaging::AsyncCall);
        set.insert(ids::VERIFY_SIGNATURE, messaging::VerifySignature);
        set.insert(ids::IS_INTERNAL, messaging::IsInternal);
        set
    }

    /// Registers `contract` under table byte `id`.
    pub fn insert(&mut self, id: u8, contract: impl PrecompiledContract + 'static) {
        self.table.insert(id, Box::new(contract));
    }

    /// Returns true if `address` is in the table.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        address
            .precompile_id()
            .is_some_and(|id| self.table.contains_key(&id))
    }

    fn get(&self, address: Address) -> Option<&dyn PrecompiledContract> {
        let id = address.precompile_id()?;
        self.table.get(&id).map(|c| &**c)
    }

    /// Runs a call against the table.
    ///
    /// # Errors
    ///
    /// Only state failures, which abort the block.
    pub fn call(
        &self,
        env: &mut PrecompileEnv<'_>,
        call: &PrecompileCall,
    ) -> Result<PrecompileCallResult, StateError> {
        let Some(contract) = self.get(call.address) else {
            return Ok(PrecompileCallResult::failed(
                PrecompileError::NotImplemented(call.address),
                Gas::ZERO,
            ));
        };

        let input = call.input.as_slice();
        let required = Gas(contract.required_gas(input));
        if required > call.gas {
            return Ok(PrecompileCallResult::failed(PrecompileError::OutOfGas, call.gas));
        }
        if !call.value.is_zero() && !contract.accepts_value() {
            return Ok(PrecompileCallResult::failed(
                PrecompileError::Reverted(format!("{} does not accept value", contract.name())),
                required,
            ));
        }

        let snapshot = env.state.snapshot();
        match contract.run(env, input) {
            Ok(output) => Ok(PrecompileCallResult {
                output,
                gas_used: required,
                error: None,
            }),
            Err(PrecompileError::State(err)) => Err(err),
            Err(err) => {
                debug!(precompile = contract.name(), error = %err, "precompile failed");
                env.state.revert_to_snapshot(snapshot)?;
                Ok(PrecompileCallResult::failed(err, required))
            }
        }
    }
}

impl Default for PrecompileSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for PrecompileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.table.iter().map(|(id, c)| format!("0x{id:02x}:{}", c.name())))
            .finish()
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================
