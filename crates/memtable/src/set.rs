//! The active memtable plus its flush queue, guarded by a single
//! multi-reader/single-writer lock.

use crate::Memtable;
use std::collections::VecDeque;
use std::sync::RwLock;

struct Inner {
    active: Memtable,
    /// Sealed memtables awaiting flush. Front is the oldest (flushed first),
    /// back is the most recently sealed.
    queue: VecDeque<Memtable>,
}

/// Holds the single active (mutable) memtable and a FIFO queue of sealed
/// memtables waiting to be flushed to disk.
///
/// All reads and writes go through [`MemtableSet`] rather than a bare
/// [`Memtable`]: a write that pushes the active memtable's size past
/// `threshold_bytes` seals it (moves it to the back of the flush queue) and
/// replaces it with a fresh, empty memtable, atomically with respect to
/// concurrent readers and the flush worker.
///
/// Reads consult the active memtable first, then the flush queue from
/// newest to oldest -- the same "most recent write wins" rule that applies
/// across on-disk levels.
pub struct MemtableSet {
    inner: RwLock<Inner>,
    threshold_bytes: usize,
}

impl MemtableSet {
    /// Creates an empty set with a single active memtable and no queued
    /// memtables. `threshold_bytes` is the `approx_size` at or above which a
    /// write seals the active memtable.
    pub fn new(threshold_bytes: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                active: Memtable::new(),
                queue: VecDeque::new(),
            }),
            threshold_bytes,
        }
    }

    /// Writes `key`/`value` into the active memtable, then rotates if the
    /// active memtable's size now meets `threshold_bytes`.
    ///
    /// Returns `true` if this write triggered a rotation.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        let mut inner = self.inner.write().unwrap();
        inner.active.put(key, value);
        Self::maybe_rotate(&mut inner, self.threshold_bytes)
    }

    /// Records a tombstone for `key` in the active memtable, then rotates if
    /// the active memtable's size now meets `threshold_bytes`.
    ///
    /// Returns `true` if this write triggered a rotation.
    pub fn delete(&self, key: Vec<u8>) -> bool {
        let mut inner = self.inner.write().unwrap();
        inner.active.delete(key);
        Self::maybe_rotate(&mut inner, self.threshold_bytes)
    }

    fn maybe_rotate(inner: &mut Inner, threshold_bytes: usize) -> bool {
        if inner.active.approx_size() < threshold_bytes {
            return false;
        }
        let sealed = std::mem::replace(&mut inner.active, Memtable::new());
        inner.queue.push_back(sealed);
        true
    }

    /// Looks up `key` across the active memtable and the flush queue,
    /// newest first. Returns the raw entry: `None` if `key` does not appear
    /// anywhere in the set, `Some(None)` for a tombstone, `Some(Some(value))`
    /// for a live value.
    pub fn get(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        let inner = self.inner.read().unwrap();
        if let Some(entry) = inner.active.get_entry(key) {
            return Some(entry.clone());
        }
        for sealed in inner.queue.iter().rev() {
            if let Some(entry) = sealed.get_entry(key) {
                return Some(entry.clone());
            }
        }
        None
    }

    /// Returns the number of memtables currently queued for flush (not
    /// counting the active memtable).
    #[must_use]
    pub fn flush_queue_len(&self) -> usize {
        self.inner.read().unwrap().queue.len()
    }

    /// Returns the approximate byte size of the active memtable.
    #[must_use]
    pub fn active_size(&self) -> usize {
        self.inner.read().unwrap().active.approx_size()
    }

    /// Returns `true` if the flush queue holds at least one memtable ready
    /// to be flushed.
    #[must_use]
    pub fn has_flushable(&self) -> bool {
        !self.inner.read().unwrap().queue.is_empty()
    }

    /// Returns a clone of the oldest queued memtable, if any, without
    /// removing it from the queue.
    ///
    /// The flush worker uses this (rather than [`poll_flushable`]) to write
    /// and install the segment *before* the sealed memtable disappears from
    /// the set: a `get` for a key that lives only in the not-yet-installed
    /// segment must still find it here in the meantime.
    ///
    /// [`poll_flushable`]: MemtableSet::poll_flushable
    pub fn peek_flushable(&self) -> Option<Memtable> {
        self.inner.read().unwrap().queue.front().cloned()
    }

    /// Removes the oldest queued memtable, if any.
    ///
    /// Called by the flush worker only after the memtable returned by
    /// [`peek_flushable`](MemtableSet::peek_flushable) has been durably
    /// written and installed into the manifest, so the memtable is never
    /// visible as "gone" before its data is visible as "on disk".
    pub fn poll_flushable(&self) -> Option<Memtable> {
        self.inner.write().unwrap().queue.pop_front()
    }

    /// Forces the active memtable to seal immediately, regardless of its
    /// size. Used when shutting down the engine so that buffered writes are
    /// not lost.
    ///
    /// Returns `true` if a non-empty active memtable was sealed.
    pub fn force_rotate(&self) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.active.is_empty() {
            return false;
        }
        let sealed = std::mem::replace(&mut inner.active, Memtable::new());
        inner.queue.push_back(sealed);
        true
    }
}

#[cfg(test)]
#[path = "set_tests.rs"]
mod tests;
