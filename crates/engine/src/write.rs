//! Write path: `Engine::put` and `Engine::delete`.
//!
//! Both forward directly to the memtable set; rotation past
//! `memtable_threshold_bytes` happens inside [`memtable::MemtableSet`] and
//! is invisible to the caller.

use crate::error::{EngineError, Result};
use crate::Engine;

impl Engine {
    /// Inserts or overwrites `key` with `value`.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(EngineError::EmptyKey);
        }
        self.memtables.put(key, value);
        Ok(())
    }

    /// Records a tombstone for `key`, shadowing any older value once
    /// flushed.
    pub fn delete(&self, key: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(EngineError::EmptyKey);
        }
        self.memtables.delete(key);
        Ok(())
    }
}
