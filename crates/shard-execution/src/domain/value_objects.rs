//! # Value Objects
//!
//! Immutable domain primitives for shard message execution.
//! Addresses, hashes, amounts and gas: plain values compared by content.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use primitive_types::U256;

/// Native-token amount. Always non-negative by construction.
pub type Value = U256;

// =============================================================================
// SHARD ID
// =============================================================================

/// Identifier of an independently executing shard.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize, Deserialize,
)]
pub struct ShardId(pub u16);

impl ShardId {
    /// The main (coordinating) shard.
    pub const MAIN: Self = Self(0);

    /// Returns true for the main shard.
    #[must_use]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard-{}", self.0)
    }
}

impl From<u16> for ShardId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

// =============================================================================
// ADDRESS (20 bytes, shard-prefixed)
// =============================================================================

/// A 20-byte account address.
///
/// The two high-order bytes carry the owning [`ShardId`] in big-endian order.
/// Precompile addresses are the exception: nineteen zero bytes followed by
/// the table byte.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The empty address. Used as "unset" for `refund_to` / `bounce_to`.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Wraps raw address bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address on `shard` whose remaining 18 bytes are `tail`.
    #[must_use]
    pub fn from_shard(shard: ShardId, tail: [u8; 18]) -> Self {
        let mut bytes = [0u8; 20];
        bytes[..2].copy_from_slice(&shard.0.to_be_bytes());
        bytes[2..].copy_from_slice(&tail);
        Self(bytes)
    }

    /// Parses exactly 20 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Address of the precompile registered under table byte `id`.
    #[must_use]
    pub const fn precompile(id: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = id;
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the empty address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Shard encoded in the high-order bytes.
    #[must_use]
    pub const fn shard_id(&self) -> ShardId {
        ShardId(u16::from_be_bytes([self.0[0], self.0[1]]))
    }

    /// Returns the table byte if this has the shape of a precompile address.
    #[must_use]
    pub fn precompile_id(&self) -> Option<u8> {
        if self.0[..19] == [0u8; 19] && self.0[19] != 0 {
            Some(self.0[19])
        } else {
            None
        }
    }

    /// Returns `self`, or `fallback` when `self` is the empty address.
    #[must_use]
    pub fn or(self, fallback: Address) -> Address {
        if self.is_zero() {
            fallback
        } else {
            self
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[18..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wraps raw hash bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses exactly 32 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(slice).ok().map(Self)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// All-zero check.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[28..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// STORAGE KEY & VALUE (32 bytes each)
// =============================================================================

/// A 32-byte storage slot key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct StorageKey(pub [u8; 32]);

impl StorageKey {
    /// Big-endian slot key.
    #[must_use]
    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", U256::from_big_endian(&self.0))
    }
}

impl From<U256> for StorageKey {
    fn from(value: U256) -> Self {
        Self::from_u256(value)
    }
}

/// A 32-byte storage slot value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct StorageValue(pub [u8; 32]);

impl StorageValue {
    /// The zero value.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Big-endian slot value.
    #[must_use]
    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }

    /// Converts to U256.
    #[must_use]
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// True for an empty slot.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageValue({})", self.to_u256())
    }
}

impl From<U256> for StorageValue {
    fn from(value: U256) -> Self {
        Self::from_u256(value)
    }
}

// =============================================================================
// BYTES (variable length)
// =============================================================================

/// Variable-length byte vector for payloads, return data, and code.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Copies `slice`.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Unwraps the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Borrowed contents.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        if self.0.len() <= 8 {
            for byte in &self.0 {
                write!(f, "{byte:02x}")?;
            }
        } else {
            for byte in &self.0[..4] {
                write!(f, "{byte:02x}")?;
            }
            write!(f, "..({} bytes)", self.0.len())?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// GAS
// =============================================================================

/// An amount of gas.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize, Deserialize,
)]
pub struct Gas(pub u64);

impl Gas {
    /// No gas.
    pub const ZERO: Self = Self(0);

    /// Converts a value-denominated budget into gas at `price`, capped at `cap`.
    ///
    /// A zero price yields `cap`.
    #[must_use]
    pub fn from_value(budget: Value, price: Value, cap: Gas) -> Self {
        if price.is_zero() {
            return cap;
        }
        let gas = budget / price;
        if gas > U256::from(cap.0) {
            cap
        } else {
            Self(gas.low_u64())
        }
    }

    /// Cost of this much gas at `price`, saturating at `U256::MAX`.
    #[must_use]
    pub fn to_value(self, price: Value) -> Value {
        U256::from(self.0).saturating_mul(price)
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Gas) -> Gas {
        Gas(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[must_use]
    pub const fn saturating_sub(self, other: Gas) -> Gas {
        Gas(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks gas consumption inside one call frame.
///
/// ## Invariants
/// - `used <= limit` at all times
/// - A charge that would exceed the limit exhausts the meter and fails
#[derive(Clone, Copy, Debug, Default)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Creates a meter with the given limit.
    #[must_use]
    pub const fn new(limit: Gas) -> Self {
        Self {
            limit: limit.0,
            used: 0,
        }
    }

    /// Gas consumed so far.
    #[must_use]
    pub const fn used(&self) -> Gas {
        Gas(self.used)
    }

    /// Gas still available.
    #[must_use]
    pub const fn remaining(&self) -> Gas {
        Gas(self.limit.saturating_sub(self.used))
    }

    /// Charges `amount`. On failure the meter is exhausted and false is returned.
    pub fn charge(&mut self, amount: u64) -> bool {
        if self.used.saturating_add(amount) > self.limit {
            self.used = self.limit;
            false
        } else {
            self.used += amount;
            true
        }
    }
}

// =============================================================================
// CURRENCIES
// =============================================================================

/// Identifier of a non-native currency. By convention the address of its minter.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize, Deserialize,
)]
pub struct CurrencyId(pub Address);

/// An amount of one currency attached to a message or held by an account.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CurrencyBalance {
    /// Which currency.
    pub currency: CurrencyId,
    /// How much of it.
    pub balance: Value,
}

impl CurrencyBalance {
    /// Creates a currency amount.
    #[must_use]
    pub const fn new(currency: CurrencyId, balance: Value) -> Self {
        Self { currency, balance }
    }
}

// =============================================================================
// TESTS
// =============================================================================
