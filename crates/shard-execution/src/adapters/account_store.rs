//! # In-Memory Account Store
//!
//! Reference [`AccountStore`] used by tests and embedders that do not bring a
//! trie. Roots are keccak digests over the sorted entries, so two stores
//! holding the same state always agree on them.

use crate::codec;
use crate::domain::entities::Account;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Hash, StorageKey, StorageValue};
use crate::errors::StateError;
use crate::ports::outbound::{AccountStore, BlockWrites};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// In-memory account state.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<BTreeMap<Address, Account>>,
    storage: RwLock<BTreeMap<(Address, StorageKey), StorageValue>>,
}

impl InMemoryAccountStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account, replacing any previous one.
    pub fn insert_account(&self, account: Account) {
        self.accounts.write().insert(account.address, account);
    }

    /// Seeds a storage slot.
    pub fn insert_storage(&self, address: Address, key: StorageKey, value: StorageValue) {
        let mut storage = self.storage.write();
        if value.is_zero() {
            storage.remove(&(address, key));
        } else {
            storage.insert((address, key), value);
        }
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    /// Snapshot of every account, sorted by address.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.read().values().cloned().collect()
    }

    fn compute_storage_root(
        storage: &BTreeMap<(Address, StorageKey), StorageValue>,
        address: Address,
    ) -> Hash {
        let lower = (address, StorageKey([0u8; 32]));
        let upper = (address, StorageKey([0xff; 32]));
        let mut preimage = Vec::new();
        for ((_, key), value) in storage.range(lower..=upper) {
            preimage.extend_from_slice(&key.0);
            preimage.extend_from_slice(&value.0);
        }
        if preimage.is_empty() {
            Hash::ZERO
        } else {
            keccak256(&preimage)
        }
    }
}

impl AccountStore for InMemoryAccountStore {
    fn load_account(&self, address: Address) -> Result<Option<Account>, StateError> {
        Ok(self.accounts.read().get(&address).cloned())
    }

    fn load_storage(&self, address: Address, key: StorageKey) -> Result<StorageValue, StateError> {
        Ok(self
            .storage
            .read()
            .get(&(address, key))
            .copied()
            .unwrap_or(StorageValue::ZERO))
    }

    fn commit(&self, writes: BlockWrites) -> Result<Hash, StateError> {
        {
            let mut accounts = self.accounts.write();
            let mut storage = self.storage.write();

            let mut touched: BTreeSet<Address> = BTreeSet::new();
            for (address, key, value) in writes.storage {
                touched.insert(address);
                if value.is_zero() {
                    storage.remove(&(address, key));
                } else {
                    storage.insert((address, key), value);
                }
            }
            for account in writes.accounts {
                touched.insert(account.address);
                accounts.insert(account.address, account);
            }
            for address in &touched {
                if let Some(account) = accounts.get_mut(address) {
                    account.storage_root = Self::compute_storage_root(&storage, *address);
                }
            }
            debug!(accounts = touched.len(), "committed block writes");
        }
        self.state_root()
    }

    fn state_root(&self) -> Result<Hash, StateError> {
        let accounts = self.accounts.read();
        if accounts.is_empty() {
            return Ok(Hash::ZERO);
        }
        let mut preimage = Vec::new();
        for account in accounts.values() {
            let encoded = codec::encode(account)
                .map_err(|e| StateError::Corrupted(format!("account encoding: {e}")))?;
            preimage.extend_from_slice(keccak256(&encoded).as_bytes());
        }
        Ok(keccak256(&preimage))
    }

    fn storage_root(&self, address: Address) -> Result<Hash, StateError> {
        Ok(Self::compute_storage_root(&self.storage.read(), address))
    }
}

// =============================================================================
// TESTS
// =============================================================================
