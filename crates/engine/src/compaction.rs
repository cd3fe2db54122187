//! The compaction worker: periodically finds the first overfull level and
//! merges it into the next one via the sorted-run builder.

use crate::manifest::Manifest;
use config::EngineConfig;
use sstable::Segment;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the compaction background thread.
pub struct CompactionWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CompactionWorker {
    /// Spawns the compaction thread, waking every `config.compaction_period`
    /// to run one compaction pass.
    pub fn start(manifest: Arc<Manifest>, config: Arc<EngineConfig>) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let period = config.compaction_period;
        let handle = thread::Builder::new()
            .name("engine-compaction".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => tick(&manifest, &config),
                }
            })
            .expect("spawning the compaction thread should never fail");

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Signals the compaction thread to exit and waits (best-effort) for
    /// its current tick to finish.
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

impl Drop for CompactionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs one compaction pass: scans levels from 0 upward and merges the
/// first one whose table count exceeds its configured threshold into the
/// next level. Only one level is merged per tick (matching the scheduling
/// table in the concurrency model) even if several levels are overfull;
/// a level left overfull this tick is picked up on a later tick.
pub(crate) fn tick(manifest: &Manifest, config: &EngineConfig) {
    let Some(max_level) = manifest.max_level() else {
        return;
    };

    for level in 0..=max_level {
        let sources = manifest.get_sstables(level);
        let threshold = config.level_threshold(level);
        if sources.len() <= threshold {
            continue;
        }

        let targets = manifest.get_sstables(level + 1);
        let mut inputs: Vec<&Segment> = Vec::with_capacity(sources.len() + targets.len());
        inputs.extend(sources.iter().map(Arc::as_ref));
        inputs.extend(targets.iter().map(Arc::as_ref));

        let merged = sstable::merge(
            &config.data_directory,
            || manifest.next_segment_id(),
            &inputs,
            config.segment_target_size,
            config.bloom_bits,
            config.bloom_hashes,
            config.block_size,
        );

        let merged = match merged {
            Ok(segments) => segments,
            Err(e) => {
                tracing::warn!(level, error = %e, "compaction: merge failed, abandoning tick");
                return;
            }
        };

        let input_count = sources.len() + targets.len();
        match manifest.replace(level, &sources, level + 1, &targets, merged) {
            Ok(removed) => {
                for old in removed {
                    if let Err(e) = old.delete() {
                        tracing::error!(path = %old.path().display(), error = %e, "compaction: failed to unlink old segment");
                    }
                }
                tracing::info!(level, inputs = input_count, "compaction: merged level into next");
            }
            Err((e, orphaned)) => {
                // The manifest never recorded `orphaned` -- they were
                // written and renamed into place by the merge above but
                // never installed, so nothing else will ever unlink them.
                for seg in &orphaned {
                    if let Err(del_err) = seg.delete() {
                        tracing::error!(path = %seg.path().display(), error = %del_err, "compaction: failed to unlink orphaned merge output after aborted replace");
                    }
                }
                tracing::warn!(level, error = %e, "compaction: replace failed, abandoning tick");
            }
        }
        return;
    }
}
