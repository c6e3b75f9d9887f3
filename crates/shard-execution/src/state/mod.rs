//! # Block State
//!
//! In-block account cache layered over an [`AccountStore`]. Reads fall
//! through to the store on first access and are cached; writes stay in the
//! cache until [`BlockState::into_writes`] hands them to the store at the end
//! of the block.
//!
//! Every mutation is journaled so that a message (or a nested frame of it)
//! can be rolled back with [`BlockState::revert_to_snapshot`].

mod journal;

pub use journal::SnapshotId;

use crate::domain::entities::{Account, AsyncContext, Log, OutMessage};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{
    Address, Bytes, CurrencyId, Hash, StorageKey, StorageValue, Value,
};
use crate::errors::StateError;
use crate::ports::outbound::{AccountStore, BlockWrites};
use journal::{Journal, JournalEntry, MessageScratch};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// Mutable view of one shard for the duration of one block.
pub struct BlockState {
    store: Arc<dyn AccountStore>,
    accounts: HashMap<Address, Option<Account>>,
    storage: HashMap<(Address, StorageKey), StorageValue>,
    dirty_accounts: BTreeSet<Address>,
    dirty_storage: BTreeSet<(Address, StorageKey)>,
    processed: HashSet<Hash>,
    journal: Journal,
    scratch: MessageScratch,
}

impl BlockState {
    /// Creates an empty cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            accounts: HashMap::new(),
            storage: HashMap::new(),
            dirty_accounts: BTreeSet::new(),
            dirty_storage: BTreeSet::new(),
            processed: HashSet::new(),
            journal: Journal::default(),
            scratch: MessageScratch::default(),
        }
    }

    // =========================================================================
    // CACHE PLUMBING
    // =========================================================================

    fn cached(&mut self, address: Address) -> Result<Option<&Account>, StateError> {
        if !self.accounts.contains_key(&address) {
            let loaded = self.store.load_account(address)?;
            self.accounts.insert(address, loaded);
        }
        Ok(self.accounts.get(&address).and_then(Option::as_ref))
    }

    fn existing_mut(&mut self, address: Address) -> Result<Option<&mut Account>, StateError> {
        self.cached(address)?;
        let account = self.accounts.get_mut(&address).and_then(Option::as_mut);
        if account.is_some() {
            self.dirty_accounts.insert(address);
        }
        Ok(account)
    }

    fn get_or_create(&mut self, address: Address) -> Result<&mut Account, StateError> {
        if self.cached(address)?.is_none() {
            trace!(?address, "creating account");
            self.journal.push(JournalEntry::AccountCreated { address });
            self.accounts.insert(address, Some(Account::new(address)));
        }
        self.dirty_accounts.insert(address);
        self.accounts
            .get_mut(&address)
            .and_then(Option::as_mut)
            .ok_or(StateError::NotFound(address))
    }

    fn required_mut(&mut self, address: Address) -> Result<&mut Account, StateError> {
        self.existing_mut(address)?
            .ok_or(StateError::NotFound(address))
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Returns a copy of the account, if it exists.
    pub fn account(&mut self, address: Address) -> Result<Option<Account>, StateError> {
        Ok(self.cached(address)?.cloned())
    }

    /// Returns true if the account exists.
    pub fn exists(&mut self, address: Address) -> Result<bool, StateError> {
        Ok(self.cached(address)?.is_some())
    }

    /// Creates the account if absent.
    pub fn create_account(&mut self, address: Address) -> Result<(), StateError> {
        self.get_or_create(address).map(|_| ())
    }

    /// Native balance, zero for absent accounts.
    pub fn balance(&mut self, address: Address) -> Result<Value, StateError> {
        Ok(self
            .cached(address)?
            .map(|a| a.balance)
            .unwrap_or_default())
    }

    /// Overwrites the balance, creating the account if needed.
    pub fn set_balance(&mut self, address: Address, balance: Value) -> Result<(), StateError> {
        let account = self.get_or_create(address)?;
        let prev = std::mem::replace(&mut account.balance, balance);
        self.journal.push(JournalEntry::Balance { address, prev });
        Ok(())
    }

    /// Credits `amount`, creating the account if needed.
    pub fn add_balance(&mut self, address: Address, amount: Value) -> Result<(), StateError> {
        if amount.is_zero() && self.exists(address)? {
            return Ok(());
        }
        let current = self.balance(address)?;
        let next = current
            .checked_add(amount)
            .ok_or_else(|| StateError::Corrupted(format!("balance overflow at {address:?}")))?;
        self.set_balance(address, next)
    }

    /// Debits `amount`. Returns false and changes nothing if the balance is
    /// too low.
    pub fn sub_balance(&mut self, address: Address, amount: Value) -> Result<bool, StateError> {
        if amount.is_zero() {
            return Ok(true);
        }
        let current = self.balance(address)?;
        match current.checked_sub(amount) {
            Some(next) => {
                self.set_balance(address, next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Contract code, empty for absent accounts.
    pub fn code(&mut self, address: Address) -> Result<Bytes, StateError> {
        Ok(self
            .cached(address)?
            .map(|a| a.code.clone())
            .unwrap_or_default())
    }

    /// Code hash, hash of empty code for absent accounts.
    pub fn code_hash(&mut self, address: Address) -> Result<Hash, StateError> {
        match self.cached(address)? {
            Some(account) => Ok(account.code_hash),
            None => Ok(keccak256(&[])),
        }
    }

    /// Installs code, creating the account if needed.
    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        let code_hash = keccak256(code.as_slice());
        let account = self.get_or_create(address)?;
        let prev_code = std::mem::replace(&mut account.code, code);
        let prev_hash = std::mem::replace(&mut account.code_hash, code_hash);
        self.journal.push(JournalEntry::Code {
            address,
            prev_code,
            prev_hash,
        });
        Ok(())
    }

    /// Internal message counter.
    pub fn seqno(&mut self, address: Address) -> Result<u64, StateError> {
        Ok(self.cached(address)?.map(|a| a.seqno).unwrap_or_default())
    }

    /// Increments the internal counter and returns the new value.
    pub fn increment_seqno(&mut self, address: Address) -> Result<u64, StateError> {
        let account = self.required_mut(address)?;
        let prev = account.seqno;
        account.seqno = prev.saturating_add(1);
        let next = account.seqno;
        self.journal.push(JournalEntry::Seqno { address, prev });
        Ok(next)
    }

    /// External message counter.
    pub fn ext_seqno(&mut self, address: Address) -> Result<u64, StateError> {
        Ok(self
            .cached(address)?
            .map(|a| a.ext_seqno)
            .unwrap_or_default())
    }

    /// Increments the external counter.
    pub fn increment_ext_seqno(&mut self, address: Address) -> Result<(), StateError> {
        let account = self.required_mut(address)?;
        let prev = account.ext_seqno;
        account.ext_seqno = prev.saturating_add(1);
        self.journal.push(JournalEntry::ExtSeqno { address, prev });
        Ok(())
    }

    // =========================================================================
    // CURRENCIES
    // =========================================================================

    /// Currency balance, zero when absent.
    pub fn currency(&mut self, address: Address, currency: CurrencyId) -> Result<Value, StateError> {
        Ok(self
            .cached(address)?
            .map(|a| a.currency(currency))
            .unwrap_or_default())
    }

    /// Overwrites a currency balance, creating the account if needed.
    pub fn set_currency(
        &mut self,
        address: Address,
        currency: CurrencyId,
        balance: Value,
    ) -> Result<(), StateError> {
        let account = self.get_or_create(address)?;
        let replaced = if balance.is_zero() {
            account.currencies.remove(&currency)
        } else {
            account.currencies.insert(currency, balance)
        };
        let prev = replaced.unwrap_or_default();
        self.journal.push(JournalEntry::Currency {
            address,
            currency,
            prev,
        });
        Ok(())
    }

    /// Credits a currency.
    pub fn add_currency(
        &mut self,
        address: Address,
        currency: CurrencyId,
        amount: Value,
    ) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        let next = self
            .currency(address, currency)?
            .checked_add(amount)
            .ok_or_else(|| StateError::Corrupted(format!("currency overflow at {address:?}")))?;
        self.set_currency(address, currency, next)
    }

    /// Debits a currency. Returns false and changes nothing if too low.
    pub fn sub_currency(
        &mut self,
        address: Address,
        currency: CurrencyId,
        amount: Value,
    ) -> Result<bool, StateError> {
        if amount.is_zero() {
            return Ok(true);
        }
        match self.currency(address, currency)?.checked_sub(amount) {
            Some(next) => {
                self.set_currency(address, currency, next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // STORAGE
    // =========================================================================

    /// Reads a storage slot.
    pub fn storage(&mut self, address: Address, key: StorageKey) -> Result<StorageValue, StateError> {
        if let Some(value) = self.storage.get(&(address, key)) {
            return Ok(*value);
        }
        let value = self.store.load_storage(address, key)?;
        self.storage.insert((address, key), value);
        Ok(value)
    }

    /// Writes a storage slot. The account must exist.
    pub fn set_storage(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        let prev = self.storage(address, key)?;
        self.required_mut(address)?;
        self.storage.insert((address, key), value);
        self.dirty_storage.insert((address, key));
        self.journal.push(JournalEntry::Storage { address, key, prev });
        Ok(())
    }

    // =========================================================================
    // ASYNC CONTEXTS
    // =========================================================================

    /// Records a pending request on `address`.
    pub fn insert_async_context(
        &mut self,
        address: Address,
        context: AsyncContext,
    ) -> Result<(), StateError> {
        let request_id = context.request_id;
        let account = self.required_mut(address)?;
        let prev = account.async_contexts.insert(request_id, context);
        self.journal.push(JournalEntry::AsyncContext {
            address,
            request_id,
            prev,
        });
        Ok(())
    }

    /// Removes and returns a pending request.
    pub fn take_async_context(
        &mut self,
        address: Address,
        request_id: u64,
    ) -> Result<Option<AsyncContext>, StateError> {
        let Some(account) = self.existing_mut(address)? else {
            return Ok(None);
        };
        let prev = account.async_contexts.remove(&request_id);
        if prev.is_some() {
            self.journal.push(JournalEntry::AsyncContext {
                address,
                request_id,
                prev: prev.clone(),
            });
        }
        Ok(prev)
    }

    // =========================================================================
    // PROCESSED SET
    // =========================================================================

    /// Returns true if an internal message with this hash ran in this block.
    #[must_use]
    pub fn is_processed(&self, hash: &Hash) -> bool {
        self.processed.contains(hash)
    }

    /// Marks an internal message as processed.
    pub fn mark_processed(&mut self, hash: Hash) {
        if self.processed.insert(hash) {
            self.journal.push(JournalEntry::Processed { hash });
        }
    }

    // =========================================================================
    // MESSAGE SCRATCH
    // =========================================================================

    /// Records a log for the current message.
    pub fn add_log(&mut self, log: Log) {
        self.scratch.logs.push(log);
        self.journal.push(JournalEntry::LogAdded);
    }

    /// Queues an outbound message for the current message.
    pub fn queue_out_message(&mut self, out: OutMessage) {
        self.scratch.outbox.push(out);
        self.journal.push(JournalEntry::OutMessageQueued);
    }

    /// Outbound messages queued so far by the current message.
    #[must_use]
    pub fn outbox(&self) -> &[OutMessage] {
        &self.scratch.outbox
    }

    /// Takes the current message's logs and queued messages.
    pub fn take_scratch(&mut self) -> (Vec<Log>, Vec<OutMessage>) {
        let scratch = std::mem::take(&mut self.scratch);
        (scratch.logs, scratch.outbox)
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Starts a new message: clears the journal and the scratch.
    pub fn begin_message(&mut self) {
        self.journal.reset();
        self.scratch = MessageScratch::default();
    }

    /// Takes a snapshot of the current message's state.
    pub fn snapshot(&mut self) -> SnapshotId {
        self.journal.snapshot()
    }

    /// Rolls back everything done since `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Other`] for a snapshot from another message or
    /// one already reverted past.
    pub fn revert_to_snapshot(&mut self, id: SnapshotId) -> Result<(), StateError> {
        if !self.journal.is_valid(id) {
            return Err(StateError::Other(format!("invalid snapshot {id:?}")));
        }
        let undone = self.journal.drain_to(id.depth);
        trace!(entries = undone.len(), depth = id.depth, "reverting to snapshot");
        for entry in undone {
            self.undo(entry)?;
        }
        Ok(())
    }

    fn undo(&mut self, entry: JournalEntry) -> Result<(), StateError> {
        match entry {
            JournalEntry::AccountCreated { address } => {
                self.accounts.insert(address, None);
                self.dirty_accounts.remove(&address);
            }
            JournalEntry::Balance { address, prev } => {
                self.required_mut(address)?.balance = prev;
            }
            JournalEntry::Seqno { address, prev } => {
                self.required_mut(address)?.seqno = prev;
            }
            JournalEntry::ExtSeqno { address, prev } => {
                self.required_mut(address)?.ext_seqno = prev;
            }
            JournalEntry::Code {
                address,
                prev_code,
                prev_hash,
            } => {
                let account = self.required_mut(address)?;
                account.code = prev_code;
                account.code_hash = prev_hash;
            }
            JournalEntry::Currency {
                address,
                currency,
                prev,
            } => {
                let account = self.required_mut(address)?;
                if prev.is_zero() {
                    account.currencies.remove(&currency);
                } else {
                    account.currencies.insert(currency, prev);
                }
            }
            JournalEntry::Storage { address, key, prev } => {
                self.storage.insert((address, key), prev);
            }
            JournalEntry::AsyncContext {
                address,
                request_id,
                prev,
            } => {
                let account = self.required_mut(address)?;
                match prev {
                    Some(context) => account.async_contexts.insert(request_id, context),
                    None => account.async_contexts.remove(&request_id),
                };
            }
            JournalEntry::Processed { hash } => {
                self.processed.remove(&hash);
            }
            JournalEntry::LogAdded => {
                self.scratch.logs.pop();
            }
            JournalEntry::OutMessageQueued => {
                self.scratch.outbox.pop();
            }
        }
        Ok(())
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    /// Collects the block's writes in address order.
    #[must_use]
    pub fn into_writes(self) -> BlockWrites {
        let accounts = self
            .dirty_accounts
            .iter()
            .filter_map(|address| self.accounts.get(address).cloned().flatten())
            .collect();
        let storage = self
            .dirty_storage
            .iter()
            .filter_map(|slot| {
                let value = self.storage.get(slot)?;
                let account_exists = matches!(self.accounts.get(&slot.0), Some(Some(_)));
                account_exists.then_some((slot.0, slot.1, *value))
            })
            .collect();
        BlockWrites { accounts, storage }
    }
}

impl std::fmt::Debug for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockState")
            .field("cached_accounts", &self.accounts.len())
            .field("dirty_accounts", &self.dirty_accounts.len())
            .field("journal_len", &self.journal.len())
            .finish_non_exhaustive()
    }
}
