//! Parse cache for record-level caching.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use wingmate_parser::SourceId;

use crate::{CacheEntry, Fingerprint};

struct Slot {
    entry: Arc<CacheEntry>,
    seq: u64,
}

#[derive(Default)]
struct Entries {
    slots: HashMap<SourceId, Slot>,
    /// Insertion sequence -> identity, oldest first.
    order: BTreeMap<u64, SourceId>,
    next_seq: u64,
}

/// Counters describing cache activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently held.
    pub entries: usize,
    /// Successful `put` calls.
    pub puts: u64,
    /// Entries dropped by the size bound.
    pub evictions: u64,
    /// Entries removed by `invalidate`.
    pub invalidations: u64,
    /// `invalidate_all` calls.
    pub clears: u64,
}

/// Keyed store of parsed records.
///
/// Every operation takes the internal lock for a single-entry mutation or
/// lookup, so a reader on another thread never waits on a whole batch. The
/// cache performs no I/O and never re-parses on its own; staleness is decided
/// by the caller comparing fingerprints.
pub struct ParseCache {
    entries: RwLock<Entries>,
    capacity: Option<NonZeroUsize>,
    generation: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    clears: AtomicU64,
}

impl ParseCache {
    /// Creates an unbounded cache.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Creates a cache holding at most `capacity` entries.
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    /// Creates a cache with an optional bound.
    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity,
            generation: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            clears: AtomicU64::new(0),
        }
    }

    /// Returns the size bound, if any.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Looks up an entry. Performs no I/O.
    pub fn get(&self, identity: &SourceId) -> Option<Arc<CacheEntry>> {
        self.entries
            .read()
            .slots
            .get(identity)
            .map(|slot| Arc::clone(&slot.entry))
    }

    /// Returns true if an entry exists for `identity`.
    pub fn contains(&self, identity: &SourceId) -> bool {
        self.entries.read().slots.contains_key(identity)
    }

    /// Inserts or overwrites the entry for `identity`.
    ///
    /// Overwriting moves the entry to the back of the eviction order. Returns
    /// the stored entry.
    pub fn put(
        &self,
        identity: SourceId,
        value: impl Into<Arc<Value>>,
        fingerprint: Fingerprint,
    ) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(identity, value.into(), fingerprint));
        let evicted = self.insert_locked(&mut self.entries.write(), Arc::clone(&entry));
        self.record_put(&evicted);
        entry
    }

    /// Like [`put`](Self::put), but only while the cache is still at
    /// `generation`.
    ///
    /// The generation is compared under the write lock, so a concurrent
    /// [`invalidate_all`](Self::invalidate_all) either happens before (and
    /// the value is dropped) or after (and clears it). Returns `None` when
    /// the value was dropped.
    pub fn put_if_generation(
        &self,
        generation: u64,
        identity: SourceId,
        value: impl Into<Arc<Value>>,
        fingerprint: Fingerprint,
    ) -> Option<Arc<CacheEntry>> {
        let entry = Arc::new(CacheEntry::new(identity, value.into(), fingerprint));
        let evicted = {
            let mut guard = self.entries.write();
            if self.generation() != generation {
                debug!("Dropped {} parsed under generation {}", entry.identity, generation);
                return None;
            }
            self.insert_locked(&mut guard, Arc::clone(&entry))
        };
        self.record_put(&evicted);
        Some(entry)
    }

    fn insert_locked(
        &self,
        entries: &mut Entries,
        entry: Arc<CacheEntry>,
    ) -> Vec<Arc<CacheEntry>> {
        let identity = entry.identity.clone();
        let seq = entries.next_seq;
        entries.next_seq += 1;

        if let Some(previous) = entries.slots.insert(identity.clone(), Slot { entry, seq }) {
            entries.order.remove(&previous.seq);
        }
        entries.order.insert(seq, identity);

        let mut evicted = Vec::new();
        if let Some(capacity) = self.capacity {
            while entries.slots.len() > capacity.get() {
                let Some((_, oldest)) = entries.order.pop_first() else {
                    break;
                };
                if let Some(slot) = entries.slots.remove(&oldest) {
                    evicted.push(slot.entry);
                }
            }
        }
        evicted
    }

    fn record_put(&self, evicted: &[Arc<CacheEntry>]) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        if !evicted.is_empty() {
            self.evictions
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
            for old in evicted {
                debug!("Evicted {} from parse cache", old.identity);
            }
        }
    }

    /// Removes a single entry. Returns true if one was present.
    pub fn invalidate(&self, identity: &SourceId) -> bool {
        let removed = Self::remove_locked(&mut self.entries.write(), identity);
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Like [`invalidate`](Self::invalidate), but a no-op once the cache
    /// has moved past `generation`.
    pub fn invalidate_if_generation(&self, generation: u64, identity: &SourceId) -> bool {
        let removed = {
            let mut guard = self.entries.write();
            self.generation() == generation && Self::remove_locked(&mut guard, identity)
        };
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    fn remove_locked(entries: &mut Entries, identity: &SourceId) -> bool {
        match entries.slots.remove(identity) {
            Some(slot) => {
                entries.order.remove(&slot.seq);
                true
            }
            None => false,
        }
    }

    /// Removes every entry and starts a new generation.
    ///
    /// The map is swapped out under the lock and dropped after the lock is
    /// released, so concurrent readers only wait for the swap.
    pub fn invalidate_all(&self) {
        let previous = {
            let mut guard = self.entries.write();
            self.generation.fetch_add(1, Ordering::AcqRel);
            std::mem::take(&mut *guard)
        };

        self.clears.fetch_add(1, Ordering::Relaxed);
        debug!("Cleared {} parse cache entries", previous.slots.len());
    }

    /// Number of `invalidate_all` calls so far.
    ///
    /// Values derived from the cache can record the generation they were
    /// produced under and compare it later to detect a session switch.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().slots.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().slots.is_empty()
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}
