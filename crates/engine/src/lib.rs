//! # Engine - embedded LSM storage facade
//!
//! Ties [`memtable`], [`sstable`], and this crate's own [`Manifest`] into
//! the complete key-value store: `put`/`get`/`delete` dispatch across the
//! memtable set then the manifest's segments, and two background workers
//! (flush, compaction) keep the on-disk state converging without
//! foreground help.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → MemtableSet.put/delete            │
//! │              |  (rotation past threshold,    │
//! │              |   handled inside MemtableSet) │
//! │              v                                │
//! │           FlushWorker (periodic tick)        │
//! │              → new level-0 segment            │
//! │              v                                │
//! │           CompactionWorker (periodic tick)   │
//! │              → merges first overfull level    │
//! │                into the next                  │
//! │                                               │
//! │ read.rs → MemtableSet.get → levels 0..N       │
//! │            (first match wins, incl. tombstones)│
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                                |
//! |---------------|---------------------------------------------------------|
//! | [`lib.rs`]     | `Engine` struct, constructor, `start`/`stop`, accessors |
//! | [`error`]      | `EngineError` taxonomy (I/O, corruption, invariant)    |
//! | [`manifest`]   | Durable, crash-safe per-level segment catalog           |
//! | [`flush`]      | Periodic drain of the memtable set's flush queue       |
//! | [`compaction`] | Periodic level merge via `sstable::merge`               |
//! | [`write`]      | `put()`, `delete()`                                     |
//! | [`read`]       | `get()`                                                 |
//!
//! ## Crash Safety
//!
//! There is no write-ahead log: data still sitting in the active or queued
//! memtables is lost on crash. Everything that has made it into a segment
//! referenced by the current manifest survives a restart, because segment
//! files are immutable once written (atomic temp-file-then-rename) and the
//! manifest's `CURRENT` pointer is only repointed after the new manifest
//! file is fully synced to disk.
mod compaction;
mod error;
mod flush;
mod manifest;
mod read;
mod write;

pub use error::{EngineError, Result};
pub use manifest::Manifest;

use compaction::CompactionWorker;
use config::EngineConfig;
use flush::FlushWorker;
use memtable::MemtableSet;
use std::sync::{Arc, Mutex};

/// The embedded LSM key-value store.
///
/// Cheap to share across threads: every field is independently
/// synchronized (`MemtableSet` and `Manifest` each hold their own
/// reader/writer lock), so `put`/`get`/`delete` all take `&self`.
pub struct Engine {
    memtables: Arc<MemtableSet>,
    manifest: Arc<Manifest>,
    config: Arc<EngineConfig>,
    flush_worker: Mutex<Option<FlushWorker>>,
    compaction_worker: Mutex<Option<CompactionWorker>>,
}

impl Engine {
    /// Opens (or creates) the store rooted at `config.data_directory`.
    ///
    /// Creates the data directory if missing, then loads the manifest --
    /// and with it every live segment -- if `CURRENT` exists, or
    /// bootstraps an empty catalog otherwise. Does **not** start the
    /// background workers; call [`Engine::start`] once the caller is
    /// ready to accept background I/O.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let config = Arc::new(config);
        let manifest = Arc::new(Manifest::open(&config)?);
        let memtables = Arc::new(MemtableSet::new(config.memtable_threshold_bytes));

        tracing::info!(
            data_directory = %config.data_directory.display(),
            max_level = ?manifest.max_level(),
            "engine opened"
        );

        Ok(Self {
            memtables,
            manifest,
            config,
            flush_worker: Mutex::new(None),
            compaction_worker: Mutex::new(None),
        })
    }

    /// Spawns the flush and compaction background workers, if not already
    /// running. Idempotent.
    pub fn start(&self) {
        let mut flush_worker = self.flush_worker.lock().unwrap();
        if flush_worker.is_none() {
            *flush_worker = Some(FlushWorker::start(
                Arc::clone(&self.memtables),
                Arc::clone(&self.manifest),
                Arc::clone(&self.config),
            ));
        }
        drop(flush_worker);

        let mut compaction_worker = self.compaction_worker.lock().unwrap();
        if compaction_worker.is_none() {
            *compaction_worker = Some(CompactionWorker::start(
                Arc::clone(&self.manifest),
                Arc::clone(&self.config),
            ));
        }
        drop(compaction_worker);

        tracing::info!("engine background workers started");
    }

    /// Signals both background workers to exit and waits (best-effort)
    /// for their current tick to finish. Idempotent; safe to call even if
    /// [`Engine::start`] was never called.
    pub fn stop(&self) {
        if let Some(worker) = self.flush_worker.lock().unwrap().take() {
            worker.stop();
        }
        if let Some(worker) = self.compaction_worker.lock().unwrap().take() {
            worker.stop();
        }
        tracing::info!("engine background workers stopped");
    }

    /// Returns the engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the approximate byte size of the active memtable.
    #[must_use]
    pub fn active_memtable_size(&self) -> usize {
        self.memtables.active_size()
    }

    /// Returns the number of sealed memtables awaiting flush.
    #[must_use]
    pub fn flush_queue_len(&self) -> usize {
        self.memtables.flush_queue_len()
    }

    /// Returns `(level, segment_count)` pairs for every non-empty level, in
    /// ascending level order. Used by the CLI's `STATS` command.
    #[must_use]
    pub fn level_segment_counts(&self) -> Vec<(usize, usize)> {
        match self.manifest.max_level() {
            Some(max_level) => (0..=max_level)
                .map(|level| (level, self.manifest.get_sstables(level).len()))
                .filter(|(_, count)| *count > 0)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Seals the active memtable (if non-empty) and drains the entire
    /// flush queue to level 0, bypassing the periodic flush worker.
    ///
    /// Used by operators who want a synchronous flush (the CLI's `FLUSH`
    /// command) rather than waiting for the next tick. Returns the number
    /// of memtables flushed.
    pub fn force_flush(&self) -> usize {
        self.memtables.force_rotate();
        let mut flushed = 0;
        while self.memtables.has_flushable() {
            flush::tick(&self.memtables, &self.manifest, &self.config);
            flushed += 1;
        }
        flushed
    }

    /// Runs a single compaction pass immediately, bypassing the periodic
    /// compaction worker. Used by the CLI's `COMPACT` command.
    pub fn run_compaction_tick(&self) {
        compaction::tick(&self.manifest, &self.config);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
impl Engine {
    /// Exposes the raw memtable set and manifest so tests can drive a
    /// flush or compaction tick directly instead of sleeping for the
    /// background worker.
    pub(crate) fn memtables_for_test(&self) -> Arc<MemtableSet> {
        Arc::clone(&self.memtables)
    }

    pub(crate) fn manifest_for_test(&self) -> Arc<Manifest> {
        Arc::clone(&self.manifest)
    }
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
