//! # Domain Services
//!
//! Pure functions shared by the engine and the precompiles.
//! Deterministic, no I/O, no async.

use crate::domain::value_objects::{Address, Hash, ShardId};
use sha3::{Digest, Keccak256};

// =============================================================================
// HASHING
// =============================================================================

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash::new(out)
}

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the address of a contract deployed on `shard`.
///
/// Address = `shard_be(2) || keccak256(code_hash || salt)[14..32]`
#[must_use]
pub fn create_address(shard: ShardId, salt: Hash, code_hash: Hash) -> Address {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(code_hash.as_bytes());
    data[32..].copy_from_slice(salt.as_bytes());
    let hash = keccak256(&data);

    let mut tail = [0u8; 18];
    tail.copy_from_slice(&hash.as_bytes()[14..32]);
    Address::from_shard(shard, tail)
}

// =============================================================================
// WORD HELPERS
// =============================================================================

/// Number of 32-byte words needed for `len` bytes.
#[must_use]
pub const fn words(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

/// A 32-byte big-endian boolean word.
#[must_use]
pub fn bool_word(value: bool) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[31] = u8::from(value);
    word
}
