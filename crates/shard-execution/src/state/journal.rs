//! # Undo Journal
//!
//! Every mutation of the block state pushes its inverse here. A snapshot is
//! the journal length at the time it was taken; reverting pops and applies
//! inverses down to that length. The journal is scoped to one message and
//! cleared when the next message begins, which bumps the generation so stale
//! snapshot ids are rejected.

use crate::domain::entities::{AsyncContext, Log, OutMessage};
use crate::domain::value_objects::{Address, Bytes, CurrencyId, Hash, StorageKey, StorageValue, Value};

/// Handle returned by `snapshot()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotId {
    /// Message generation the snapshot belongs to.
    pub generation: u64,
    /// Journal length when taken.
    pub depth: usize,
}

/// Inverse of one state mutation.
#[derive(Clone, Debug)]
pub(crate) enum JournalEntry {
    AccountCreated {
        address: Address,
    },
    Balance {
        address: Address,
        prev: Value,
    },
    Seqno {
        address: Address,
        prev: u64,
    },
    ExtSeqno {
        address: Address,
        prev: u64,
    },
    Code {
        address: Address,
        prev_code: Bytes,
        prev_hash: Hash,
    },
    Currency {
        address: Address,
        currency: CurrencyId,
        prev: Value,
    },
    Storage {
        address: Address,
        key: StorageKey,
        prev: StorageValue,
    },
    AsyncContext {
        address: Address,
        request_id: u64,
        prev: Option<AsyncContext>,
    },
    Processed {
        hash: Hash,
    },
    LogAdded,
    OutMessageQueued,
}

/// Per-message undo log.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    generation: u64,
}

impl Journal {
    pub(crate) fn push(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn snapshot(&self) -> SnapshotId {
        SnapshotId {
            generation: self.generation,
            depth: self.entries.len(),
        }
    }

    /// Returns true if `id` can still be reverted to.
    pub(crate) fn is_valid(&self, id: SnapshotId) -> bool {
        id.generation == self.generation && id.depth <= self.entries.len()
    }

    /// Pops entries above `depth`, newest first.
    pub(crate) fn drain_to(&mut self, depth: usize) -> Vec<JournalEntry> {
        let mut undone = self.entries.split_off(depth);
        undone.reverse();
        undone
    }

    /// Starts a new message scope.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-message scratch that is rolled back with the journal.
#[derive(Debug, Default)]
pub(crate) struct MessageScratch {
    pub(crate) logs: Vec<Log>,
    pub(crate) outbox: Vec<OutMessage>,
}
