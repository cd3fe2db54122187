//! The authoritative, crash-safe catalog of live segments per level.
//!
//! A [`Manifest`] is the single source of truth for which segment files are
//! live and which level they belong to. It is guarded by one
//! multi-reader/single-writer lock; every mutation (`add_sstable`,
//! `replace`) persists a brand-new `MANIFEST-NNNNNN` file and repoints
//! `CURRENT` at it before returning, so a crash between two mutations
//! leaves the previous, still-valid manifest in place.
//!
//! ## On-disk layout
//!
//! ```text
//! MANIFEST-000001   <level>:<filename>  (one per line, in level order)
//! CURRENT           "MANIFEST-000002"   (name of the active manifest file)
//! ```
//!
//! Lines starting with `#` are comments, skipped on read. Within a level,
//! line order mirrors in-memory order: newest-first for level 0, and the
//! same append convention for every level above it.

use crate::error::{EngineError, Result};
use config::EngineConfig;
use sstable::Segment;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

const CURRENT_FILENAME: &str = "CURRENT";
const CURRENT_TMP_FILENAME: &str = "CURRENT.tmp";

fn manifest_file_name(seq: u64) -> String {
    format!("MANIFEST-{seq:06}")
}

struct Inner {
    levels: BTreeMap<usize, Vec<Arc<Segment>>>,
    manifest_seq: u64,
}

/// The per-level segment catalog, durable across restarts.
pub struct Manifest {
    data_dir: PathBuf,
    inner: RwLock<Inner>,
    next_segment_id: AtomicU64,
}

impl Manifest {
    /// Opens the manifest rooted at `config.data_directory`, reconstructing
    /// segments from `CURRENT` if present, or initializing an empty catalog
    /// and writing `MANIFEST-000001`/`CURRENT` otherwise.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let data_dir = config.data_directory.clone();
        fs::create_dir_all(&data_dir).map_err(|e| EngineError::io(&data_dir, e))?;
        cleanup_tmp_segments(&data_dir);

        let current_path = data_dir.join(CURRENT_FILENAME);
        let (levels, manifest_seq, max_segment_id) = if current_path.exists() {
            let manifest_name = read_current(&current_path)?;
            let manifest_seq = parse_manifest_seq(&manifest_name, &current_path)?;
            let entries = read_manifest_entries(&data_dir.join(&manifest_name))?;
            let mut levels: BTreeMap<usize, Vec<Arc<Segment>>> = BTreeMap::new();
            let mut max_id = 0u64;
            for (level, filename) in entries {
                let path = data_dir.join(&filename);
                if let Some(id) = parse_segment_id(&filename) {
                    max_id = max_id.max(id);
                }
                let segment = Segment::open(
                    &path,
                    config.block_size,
                    config.bloom_bits,
                    config.bloom_hashes,
                )?;
                levels.entry(level).or_default().push(Arc::new(segment));
            }
            (levels, manifest_seq, max_id)
        } else {
            (BTreeMap::new(), 0, 0)
        };

        let manifest = Manifest {
            data_dir,
            inner: RwLock::new(Inner {
                levels,
                manifest_seq,
            }),
            next_segment_id: AtomicU64::new(max_segment_id + 1),
        };

        if !current_path.exists() {
            let mut inner = manifest.inner.write().unwrap();
            manifest.persist_locked(&mut inner)?;
        }

        Ok(manifest)
    }

    /// Returns the next monotonically increasing segment id, shared by the
    /// flush and compaction workers so output segment names never collide.
    pub fn next_segment_id(&self) -> u64 {
        self.next_segment_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns a snapshot copy of the segment list at `level`. Readers
    /// operate on the copy; they never see mutations made after this call
    /// returns.
    pub fn get_sstables(&self, level: usize) -> Vec<Arc<Segment>> {
        self.inner
            .read()
            .unwrap()
            .levels
            .get(&level)
            .cloned()
            .unwrap_or_default()
    }

    /// Prepends `segment` at `level` (newest-first) and persists. Callers
    /// always pass `level = 0`; the parameter stays general because the
    /// underlying list/persist mechanics don't care which level a flush
    /// lands on.
    pub fn add_sstable(&self, level: usize, segment: Segment) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .levels
            .entry(level)
            .or_default()
            .insert(0, Arc::new(segment));
        self.persist_locked(&mut inner)
    }

    /// Clears `source_level` and `target_level` and installs `new_segments`
    /// as the entire new contents of `target_level`, persisting the
    /// result.
    ///
    /// The reference's `replace(src, old, dst, new)` clears `src`
    /// unconditionally and *appends* `new` to `dst` -- but compaction
    /// always folds `dst`'s own current contents into the merge input
    /// (see `CompactionWorker::tick`), so a plain append would leave the
    /// pre-merge `dst` segments behind alongside their already-merged
    /// replacements, violating "no key appears in more than one segment
    /// of the target level" (see `DESIGN.md`). This implementation clears
    /// both levels and installs `new_segments` as the target's full
    /// contents, which is the only reading consistent with that
    /// invariant; it is sound because compaction runs on a single
    /// dedicated thread, so no concurrent `replace` can observe or mutate
    /// `target_level` between this call's read and write.
    ///
    /// On success, returns the segments removed from both levels so the
    /// caller can unlink their files once it has released the manifest
    /// lock. On failure, hands `new_segments` back unchanged (rather than
    /// silently dropping them) since they are freshly written, already
    /// on-disk files the caller is responsible for unlinking -- this
    /// manifest never recorded them, so nothing else will ever clean them
    /// up.
    pub fn replace(
        &self,
        source_level: usize,
        expected_source: &[Arc<Segment>],
        target_level: usize,
        expected_target: &[Arc<Segment>],
        new_segments: Vec<Segment>,
    ) -> std::result::Result<Vec<Arc<Segment>>, (EngineError, Vec<Segment>)> {
        let mut inner = self.inner.write().unwrap();
        if let Err(e) = check_unchanged(&inner.levels, source_level, expected_source) {
            return Err((e, new_segments));
        }
        if let Err(e) = check_unchanged(&inner.levels, target_level, expected_target) {
            return Err((e, new_segments));
        }

        let mut removed = inner.levels.insert(source_level, Vec::new()).unwrap_or_default();
        let old_target = inner.levels.insert(target_level, Vec::new()).unwrap_or_default();
        removed.extend(old_target);

        inner
            .levels
            .insert(target_level, new_segments.into_iter().map(Arc::new).collect());

        if let Err(e) = self.persist_locked(&mut inner) {
            return Err((e, Vec::new()));
        }
        Ok(removed)
    }

    /// Returns the largest level with a non-empty segment list, or `None`
    /// when the manifest is entirely empty (the reference's `-1`).
    pub fn max_level(&self) -> Option<usize> {
        self.inner
            .read()
            .unwrap()
            .levels
            .iter()
            .filter(|(_, segs)| !segs.is_empty())
            .map(|(level, _)| *level)
            .max()
    }

    fn persist_locked(&self, inner: &mut Inner) -> Result<()> {
        let new_seq = inner.manifest_seq + 1;
        let manifest_name = manifest_file_name(new_seq);
        let manifest_path = self.data_dir.join(&manifest_name);
        let tmp_path = manifest_path.with_extension("tmp");

        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| EngineError::io(&tmp_path, e))?;
            writeln!(f, "# engine manifest").map_err(|e| EngineError::io(&tmp_path, e))?;
            for (level, segments) in &inner.levels {
                for segment in segments {
                    let filename = segment
                        .path()
                        .file_name()
                        .and_then(|n| n.to_str())
                        .expect("segment paths are always valid UTF-8 file names");
                    writeln!(f, "{level}:{filename}").map_err(|e| EngineError::io(&tmp_path, e))?;
                }
            }
            f.flush().map_err(|e| EngineError::io(&tmp_path, e))?;
            f.sync_all().map_err(|e| EngineError::io(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, &manifest_path).map_err(|e| EngineError::io(&manifest_path, e))?;

        let current_path = self.data_dir.join(CURRENT_FILENAME);
        let current_tmp = self.data_dir.join(CURRENT_TMP_FILENAME);
        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&current_tmp)
                .map_err(|e| EngineError::io(&current_tmp, e))?;
            write!(f, "{manifest_name}").map_err(|e| EngineError::io(&current_tmp, e))?;
            f.flush().map_err(|e| EngineError::io(&current_tmp, e))?;
            f.sync_all().map_err(|e| EngineError::io(&current_tmp, e))?;
        }
        fs::rename(&current_tmp, &current_path).map_err(|e| EngineError::io(&current_path, e))?;

        inner.manifest_seq = new_seq;
        tracing::debug!(manifest = %manifest_name, "manifest persisted");
        Ok(())
    }
}

fn check_unchanged(
    levels: &BTreeMap<usize, Vec<Arc<Segment>>>,
    level: usize,
    expected: &[Arc<Segment>],
) -> Result<()> {
    let current = levels.get(&level).map(Vec::as_slice).unwrap_or_default();
    let matches = current.len() == expected.len()
        && current
            .iter()
            .zip(expected.iter())
            .all(|(a, b)| Arc::ptr_eq(a, b) || a.path() == b.path());
    if matches {
        Ok(())
    } else {
        Err(EngineError::InvariantViolation(format!(
            "replace: level {level} contents changed since the caller observed them"
        )))
    }
}

fn read_current(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let name = contents.trim().to_string();
    if name.is_empty() {
        return Err(EngineError::corruption(path, "CURRENT is empty"));
    }
    Ok(name)
}

fn parse_manifest_seq(manifest_name: &str, current_path: &Path) -> Result<u64> {
    manifest_name
        .strip_prefix("MANIFEST-")
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            EngineError::corruption(
                current_path,
                format!("CURRENT points at malformed manifest name {manifest_name:?}"),
            )
        })
}

fn read_manifest_entries(path: &Path) -> Result<Vec<(usize, String)>> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineError::io(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (level_str, filename) = trimmed.split_once(':').ok_or_else(|| {
            EngineError::corruption(
                path,
                format!("line {}: expected '<level>:<filename>', got {trimmed:?}", line_num + 1),
            )
        })?;
        let level: usize = level_str.parse().map_err(|_| {
            EngineError::corruption(path, format!("line {}: invalid level {level_str:?}", line_num + 1))
        })?;
        entries.push((level, filename.to_string()));
    }
    Ok(entries)
}

fn parse_segment_id(filename: &str) -> Option<u64> {
    filename
        .strip_prefix("sstable_")
        .and_then(|s| s.strip_suffix(".sst"))
        .and_then(|s| s.parse::<u64>().ok())
}

/// Removes leftover `.sst.tmp` files left behind by an interrupted segment
/// write (a segment is written to a `.sst.tmp` path and renamed into place
/// only once fully flushed; see `sstable::Segment`).
fn cleanup_tmp_segments(data_dir: &Path) {
    let Ok(entries) = fs::read_dir(data_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
            let _ = fs::remove_file(&path);
        }
    }
}
