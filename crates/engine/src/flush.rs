//! The flush worker: periodically drains one sealed memtable to a new
//! level-0 segment.

use crate::manifest::Manifest;
use config::EngineConfig;
use memtable::MemtableSet;
use sstable::Segment;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the flush background thread. Dropping a handle without calling
/// [`FlushWorker::stop`] still signals shutdown (via `Drop`), but `stop`
/// additionally waits for the in-flight tick to finish.
pub struct FlushWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FlushWorker {
    /// Spawns the flush thread, waking every `config.flush_period` to drain
    /// the head of the memtable set's flush queue.
    pub fn start(memtables: Arc<MemtableSet>, manifest: Arc<Manifest>, config: Arc<EngineConfig>) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let period = config.flush_period;
        let handle = thread::Builder::new()
            .name("engine-flush".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => tick(&memtables, &manifest, &config),
                }
            })
            .expect("spawning the flush thread should never fail");

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Signals the flush thread to exit and waits (best-effort) for its
    /// current tick to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drains the head of the flush queue to a new level-0 segment.
///
/// The sealed memtable is only *peeked*, never removed, until its segment
/// has been written and installed into the manifest. Removing it up front
/// (then doing the I/O) would open a window where a concurrent `get` for a
/// key that lives only in that memtable finds it in neither the memtable
/// set nor any installed segment -- a key that was `put` and never deleted
/// would spuriously read back as absent. Peeking keeps the memtable visible
/// to readers for the entire window; it is removed only once the segment is
/// durably installed, so "gone from the set" and "visible on disk" change
/// together.
pub(crate) fn tick(memtables: &MemtableSet, manifest: &Manifest, config: &EngineConfig) {
    let Some(sealed) = memtables.peek_flushable() else {
        return;
    };
    if sealed.is_empty() {
        // Can't happen in practice (rotation never seals an empty
        // memtable), but an empty entry would otherwise peek forever and
        // starve every later entry in the queue.
        memtables.poll_flushable();
        return;
    }

    let id = manifest.next_segment_id();
    let entries = sealed.len();
    let bytes = sealed.approx_size();
    match Segment::create_from_memtable(
        &config.data_directory,
        id,
        &sealed,
        config.bloom_bits,
        config.bloom_hashes,
        config.block_size,
    ) {
        Ok(segment) => {
            let path = segment.path().to_path_buf();
            if let Err(e) = manifest.add_sstable(0, segment) {
                tracing::warn!(error = %e, "flush: failed to install level-0 segment, retrying next tick");
            } else {
                memtables.poll_flushable();
                tracing::debug!(path = %path.display(), entries, bytes, "flush: sealed memtable written to level 0");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, entries, bytes, "flush: failed to write segment, retrying next tick");
        }
    }
}
