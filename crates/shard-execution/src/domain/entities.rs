//! # Domain Entities
//!
//! Accounts, block context, logs and outbound messages.

use crate::domain::message::Message;
use crate::domain::value_objects::{
    Address, Bytes, CurrencyBalance, CurrencyId, Hash, ShardId, Value, U256,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ACCOUNT
// =============================================================================

/// Continuation recorded by a request and consumed by its response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncContext {
    /// Request id echoed back by the response.
    pub request_id: u64,
    /// Opaque context bytes handed back to the caller's code.
    pub context: Bytes,
}

/// Per-shard account state.
///
/// Storage slots are kept by the [`AccountStore`](crate::ports::outbound::AccountStore)
/// separately; `storage_root` commits to them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: Address,
    /// Native balance.
    pub balance: Value,
    /// Counter of internal messages emitted by this account.
    pub seqno: u64,
    /// Next accepted external sequence number.
    pub ext_seqno: u64,
    /// Contract code (empty for plain accounts).
    pub code: Bytes,
    /// Keccak of `code`.
    pub code_hash: Hash,
    /// Commitment to the storage slots.
    pub storage_root: Hash,
    /// Non-native balances.
    pub currencies: BTreeMap<CurrencyId, Value>,
    /// Pending request continuations by request id.
    pub async_contexts: BTreeMap<u64, AsyncContext>,
}

impl Account {
    /// Creates an empty account at `address`.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            code_hash: crate::domain::services::keccak256(&[]),
            ..Self::default()
        }
    }

    /// Creates a funded plain account.
    #[must_use]
    pub fn with_balance(address: Address, balance: Value) -> Self {
        Self {
            balance,
            ..Self::new(address)
        }
    }

    /// Installs `code` and its hash.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<Bytes>) -> Self {
        self.code = code.into();
        self.code_hash = crate::domain::services::keccak256(self.code.as_slice());
        self
    }

    /// Returns true if the account has code.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }

    /// Balance of `currency`, zero when absent.
    #[must_use]
    pub fn currency(&self, currency: CurrencyId) -> Value {
        self.currencies.get(&currency).copied().unwrap_or_default()
    }

    /// Non-zero currency balances in id order.
    #[must_use]
    pub fn currency_list(&self) -> Vec<CurrencyBalance> {
        self.currencies
            .iter()
            .filter(|(_, balance)| !balance.is_zero())
            .map(|(currency, balance)| CurrencyBalance::new(*currency, *balance))
            .collect()
    }
}

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Block-level environment fixed for the whole block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Shard producing the block.
    pub shard_id: ShardId,
    /// Block number.
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Gas price per shard, when known.
    pub gas_prices: BTreeMap<ShardId, Value>,
    /// Gas price for shards absent from `gas_prices`.
    pub default_gas_price: Value,
}

impl BlockContext {
    /// Creates a block context with a uniform gas price.
    #[must_use]
    pub fn new(shard_id: ShardId, number: u64, gas_price: Value) -> Self {
        Self {
            shard_id,
            number,
            timestamp: 0,
            gas_prices: BTreeMap::new(),
            default_gas_price: gas_price,
        }
    }

    /// Sets the price for one shard.
    #[must_use]
    pub fn with_gas_price(mut self, shard: ShardId, price: Value) -> Self {
        self.gas_prices.insert(shard, price);
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Gas price on `shard`. Never zero.
    #[must_use]
    pub fn gas_price(&self, shard: ShardId) -> Value {
        self.gas_price_or(shard, U256::one())
    }

    /// Gas price on `shard`, with `fallback` standing in for a price left
    /// at zero. Never zero.
    #[must_use]
    pub fn gas_price_or(&self, shard: ShardId, fallback: Value) -> Value {
        let price = self
            .gas_prices
            .get(&shard)
            .copied()
            .unwrap_or(self.default_gas_price);
        let price = if price.is_zero() { fallback } else { price };
        price.max(U256::one())
    }

    /// Gas price on this block's shard.
    #[must_use]
    pub fn local_gas_price(&self) -> Value {
        self.gas_price(self.shard_id)
    }
}

// =============================================================================
// LOGS
// =============================================================================

/// Event log emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics (0 to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// OUTBOUND MESSAGES
// =============================================================================

/// How an outbound call's fee credit is funded.
///
/// The discriminants are the values used in precompile arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForwardKind {
    /// Even share of what is left after the other kinds.
    Remaining = 0,
    /// Integer percentage of the budget left after fixed reservations.
    Percentage = 1,
    /// Fixed amount reserved from the message budget.
    Value = 2,
    /// Explicit fee credit, reserved from the message budget like `Value`.
    None = 3,
}

impl ForwardKind {
    /// Parses the argument encoding.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Remaining),
            1 => Some(Self::Percentage),
            2 => Some(Self::Value),
            3 => Some(Self::None),
            _ => None,
        }
    }
}

/// A message queued during execution, awaiting fee resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutMessage {
    /// The message. `fee_credit` is final once forwarding is resolved.
    pub message: Message,
    /// Funding policy.
    pub forward_kind: ForwardKind,
    /// Requested fee credit (`Value`/`None`) or percentage (`Percentage`).
    pub requested: Value,
    /// Fee credit already paid from the caller's balance. Such messages
    /// keep their credit and take no part in forwarding.
    pub prepaid: bool,
}

impl OutMessage {
    /// Queues a message under `forward_kind`.
    #[must_use]
    pub fn new(message: Message, forward_kind: ForwardKind, requested: Value) -> Self {
        Self {
            message,
            forward_kind,
            requested,
            prepaid: false,
        }
    }

    /// Queues a message whose fee credit the caller has already paid.
    #[must_use]
    pub fn prepaid(message: Message) -> Self {
        let requested = message.fee_credit;
        Self {
            message,
            forward_kind: ForwardKind::None,
            requested,
            prepaid: true,
        }
    }

    /// Returns true if the fee credit comes out of the enclosing message's budget.
    #[must_use]
    pub const fn is_budget_funded(&self) -> bool {
        !self.prepaid
    }
}
