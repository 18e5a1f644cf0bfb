//! Append-only, key-deduplicated record ledgers.
//!
//! Both the price series and the quarterly flow history are ledgers: a record
//! is identified by its natural key, the first record seen for a key is kept,
//! and merging never rewrites an existing entry. Persistence is delegated to a
//! [`LedgerBackend`] so the same ledger can live in memory or on disk.

use anyhow::Result;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Debug;
use tracing::debug;

/// A record with a natural key.
pub trait Keyed {
    type Key: Ord + Clone + Debug;

    fn key(&self) -> Self::Key;
}

/// Loads and saves the full contents of a ledger.
pub trait LedgerBackend<R>: Send + Sync {
    fn load(&self) -> Result<Vec<R>>;
    fn save(&self, records: &[R]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Ledger<R: Keyed> {
    records: BTreeMap<R::Key, R>,
}

impl<R: Keyed> Ledger<R> {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Loads a ledger from `backend`. Duplicate keys in the stored data are
    /// collapsed to their first occurrence.
    pub fn load(backend: &dyn LedgerBackend<R>) -> Result<Self> {
        let mut ledger = Self::new();
        let added = ledger.record_batch(backend.load()?);
        debug!("Loaded {} records", added);
        Ok(ledger)
    }

    pub fn save(&self, backend: &dyn LedgerBackend<R>) -> Result<()>
    where
        R: Clone,
    {
        let records: Vec<R> = self.records.values().cloned().collect();
        backend.save(&records)
    }

    /// Merges `batch` after the existing records. On a key collision the
    /// record already present wins, so merging the same batch twice is a
    /// no-op. Returns how many records were added.
    pub fn record_batch<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = R>,
    {
        let mut added = 0;
        for record in batch {
            match self.records.entry(record.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    added += 1;
                }
                Entry::Occupied(slot) => {
                    debug!("Skipping duplicate record for key {:?}", slot.key());
                }
            }
        }
        added
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &R::Key) -> bool {
        self.records.contains_key(key)
    }

    /// Records in natural key order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R: Keyed> Default for Ledger<R> {
    fn default() -> Self {
        Self::new()
    }
}
