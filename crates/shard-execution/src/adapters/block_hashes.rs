//! # Block Hash Oracle
//!
//! In-memory history of recent block hashes.

use crate::domain::value_objects::Hash;
use crate::ports::outbound::BlockHashOracle;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Number of past blocks visible to contracts.
pub const BLOCK_HASH_HISTORY: u64 = 256;

/// Recent block hashes kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryBlockHashes {
    hashes: RwLock<BTreeMap<u64, Hash>>,
}

impl InMemoryBlockHashes {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hash of block `number` and prunes entries older than
    /// [`BLOCK_HASH_HISTORY`] blocks.
    pub fn record(&self, number: u64, hash: Hash) {
        let mut hashes = self.hashes.write();
        hashes.insert(number, hash);
        let floor = number.saturating_sub(BLOCK_HASH_HISTORY);
        hashes.retain(|n, _| *n >= floor);
    }

    /// Latest recorded block number.
    #[must_use]
    pub fn latest(&self) -> Option<u64> {
        self.hashes.read().keys().next_back().copied()
    }
}

impl BlockHashOracle for InMemoryBlockHashes {
    fn block_hash(&self, number: u64) -> Option<Hash> {
        self.hashes.read().get(&number).copied()
    }
}
