//! # Memtable
//!
//! An in-memory, sorted, mutable write buffer for the storage engine, plus
//! [`MemtableSet`], the active-buffer-and-flush-queue wrapper the engine
//! actually holds.
//!
//! The memtable is the first point of contact for every write operation. It
//! buffers recent `put`/`delete` operations in a sorted structure
//! (`BTreeMap`) before they are flushed to an immutable on-disk segment.
//!
//! ## Key properties
//! - **Sorted order**: entries are always in ascending key order (required
//!   for segment writes, which must produce strictly ascending keys on disk).
//! - **Tombstone support**: deletes are recorded as `None` value markers and
//!   are retained (not removed) so that they can shadow older values in
//!   lower levels once flushed.
//! - **Approximate size tracking**: tracks the byte size of keys + values
//!   (tombstones count only their key bytes) for rotation-threshold decisions.
//!
//! There are no sequence numbers here: a memtable never sees two writes to
//! the same key arrive out of order, because all writes to the *active*
//! memtable go through a single writer lock, and ordering between *sealed*
//! memtables and on-disk levels is determined purely by structural position
//! (see [`MemtableSet`] and the manifest's level ordering), not by a
//! per-entry timestamp.
//!
//! ## Example
//! ```rust
//! use memtable::Memtable;
//!
//! let mut m = Memtable::new();
//! m.put(b"hello".to_vec(), b"world".to_vec());
//! assert_eq!(m.get(b"hello").unwrap().as_deref(), Some(b"world".as_slice()));
//!
//! m.delete(b"hello".to_vec());
//! assert_eq!(m.get(b"hello"), Some(&None));
//! ```

mod set;

pub use set::MemtableSet;

use std::collections::BTreeMap;

/// An ordered, in-memory write buffer backed by a `BTreeMap`.
///
/// Each key maps to `Some(value)` for a live write or `None` for a
/// tombstone (delete marker). The memtable tracks an approximate byte size
/// (keys + live value bytes) so [`MemtableSet`] can decide when to rotate.
#[derive(Debug, Clone)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    approx_size: usize,
}

impl Memtable {
    /// Creates a new, empty memtable.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            approx_size: 0,
        }
    }

    /// Inserts a key-value pair, overwriting any previous entry for `key`.
    ///
    /// Adjusts `approx_size` by removing the old entry's contribution (if
    /// any) and adding the new one.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.remove_old_contribution(&key);
        self.approx_size = self.approx_size.saturating_add(key.len() + value.len());
        self.map.insert(key, Some(value));
    }

    /// Records a tombstone (delete marker) for `key`.
    ///
    /// A tombstone is stored as `None` and is retained in the memtable (and
    /// later in the flushed segment) so that it shadows any older value in
    /// lower levels during reads. Tombstones contribute only their key bytes
    /// to `approx_size`.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.remove_old_contribution(&key);
        self.approx_size = self.approx_size.saturating_add(key.len());
        self.map.insert(key, None);
    }

    /// Returns the value for `key` if it exists and is **not** a tombstone.
    ///
    /// Returns `Some(Some(bytes))` ... actually returns `None` for a missing
    /// key or a tombstone, `Some(bytes)` for a live value. Prefer
    /// [`get_entry`](Memtable::get_entry) when "missing" and "deleted" must
    /// be told apart.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).and_then(|v| v.as_deref())
    }

    /// Returns the raw entry for `key`: `None` if the key has never been
    /// written, `Some(None)` if it is a tombstone, `Some(Some(value))` if it
    /// holds a live value.
    pub fn get_entry(&self, key: &[u8]) -> Option<&Option<Vec<u8>>> {
        self.map.get(key)
    }

    /// Returns `true` if the memtable has an entry (live or tombstone) for
    /// `key`.
    #[must_use]
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    /// Returns an iterator over all entries in ascending key order,
    /// including tombstones. Required for correct segment writes.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Option<Vec<u8>>)> {
        self.map.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Returns the number of entries (including tombstones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the memtable contains zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the approximate byte size of all keys and live values stored.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }

    fn remove_old_contribution(&mut self, key: &[u8]) {
        if let Some(old) = self.map.get(key) {
            self.approx_size = self.approx_size.saturating_sub(key.len());
            if let Some(old_value) = old {
                self.approx_size = self.approx_size.saturating_sub(old_value.len());
            }
        }
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}
