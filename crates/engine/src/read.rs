//! Read path: `Engine::get`.
//!
//! Consults the memtable set first (freshest data, including tombstones),
//! then segments in level order, newest-first within a level. The first
//! hit -- live value or tombstone -- terminates the search.

use crate::error::{EngineError, Result};
use crate::Engine;

impl Engine {
    /// Looks up `key`, returning `Ok(Some(value))` if a live value is
    /// found, `Ok(None)` if the key is absent or its most recent write was
    /// a tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(EngineError::EmptyKey);
        }

        if let Some(entry) = self.memtables.get(key) {
            return Ok(entry);
        }

        let Some(max_level) = self.manifest.max_level() else {
            return Ok(None);
        };

        for level in 0..=max_level {
            for segment in self.manifest.get_sstables(level) {
                if let Some(entry) = segment.get(key)? {
                    return Ok(entry);
                }
            }
        }

        Ok(None)
    }
}
