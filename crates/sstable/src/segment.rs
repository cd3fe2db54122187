//! Immutable, on-disk sorted segments ("SSTables").
//!
//! A segment is write-once, read-many: once created it is never modified,
//! only replaced wholesale during compaction. The on-disk body is nothing
//! but a sequence of entries (see `crate::format`); the block index and
//! bloom filter named below are pure in-memory structures, rebuilt by
//! scanning the file every time a segment is opened.

use crate::error::{Result, SstableError};
use crate::format::{self, MAX_KEY_BYTES};
use crate::iterator::SegmentIterator;
use bloom::BloomFilter;
use memtable::Memtable;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Tracks block boundaries as entries are accumulated in on-disk order,
/// recording `firstKeyOfBlock -> (offset, length)` exactly as described in
/// the segment's block-index invariant. The same accounting rule is used
/// whether the caller is writing a new segment or rescanning an existing
/// one, so the index is reproducible from the bytes alone.
struct BlockAccountant {
    block_size: u64,
    current_start: u64,
    current_len: u64,
    first_key: Option<Vec<u8>>,
    index: BTreeMap<Vec<u8>, (u64, u64)>,
}

impl BlockAccountant {
    fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size as u64,
            current_start: 0,
            current_len: 0,
            first_key: None,
            index: BTreeMap::new(),
        }
    }

    /// Registers the entry at `entry_offset` with encoded length
    /// `entry_len`. Must be called in ascending-offset order, once per
    /// entry, before the next entry is considered.
    fn record(&mut self, key: &[u8], entry_offset: u64, entry_len: u64) {
        if self.current_len > 0 && self.current_len + entry_len > self.block_size {
            self.finalize_block();
        }
        if self.current_len == 0 {
            self.current_start = entry_offset;
        }
        if self.first_key.is_none() {
            self.first_key = Some(key.to_vec());
        }
        self.current_len += entry_len;
    }

    fn finalize_block(&mut self) {
        if let Some(first_key) = self.first_key.take() {
            self.index
                .insert(first_key, (self.current_start, self.current_len));
        }
        self.current_len = 0;
    }

    fn finish(mut self) -> BTreeMap<Vec<u8>, (u64, u64)> {
        self.finalize_block();
        self.index
    }
}

/// An immutable, sorted, on-disk segment with an in-memory block index and
/// bloom filter.
pub struct Segment {
    path: PathBuf,
    min_key: Vec<u8>,
    max_key: Vec<u8>,
    block_index: BTreeMap<Vec<u8>, (u64, u64)>,
    bloom: BloomFilter,
    entry_count: usize,
    file: Mutex<File>,
}

impl Segment {
    /// Builds the on-disk file name for segment `id` under `dir`.
    pub fn file_name(id: u64) -> String {
        format!("sstable_{id:020}.sst")
    }

    /// Flushes every entry in `mem` (in its existing ascending-key order)
    /// to a new segment file named from `id`.
    ///
    /// # Errors
    /// Returns [`SstableError::InvariantViolation`] if `mem` is empty.
    pub fn create_from_memtable(
        dir: &Path,
        id: u64,
        mem: &Memtable,
        bloom_bits: u64,
        bloom_hashes: u32,
        block_size: usize,
    ) -> Result<Segment> {
        if mem.is_empty() {
            return Err(SstableError::InvariantViolation(
                "refusing to flush an empty memtable to a segment".to_string(),
            ));
        }
        let entries = mem.iter().map(|(k, v)| (k.to_vec(), v.clone()));
        Self::create_from_entries(dir, id, entries, bloom_bits, bloom_hashes, block_size)
    }

    /// Writes a new segment from an arbitrary sorted (ascending key)
    /// iterator of entries. This is the entry point compaction uses to
    /// write merge output without materializing it in a [`Memtable`]
    /// first.
    ///
    /// # Errors
    /// Returns [`SstableError::InvariantViolation`] if `entries` yields
    /// nothing, or an I/O error on any failed file operation.
    pub fn create_from_entries<I>(
        dir: &Path,
        id: u64,
        entries: I,
        bloom_bits: u64,
        bloom_hashes: u32,
        block_size: usize,
    ) -> Result<Segment>
    where
        I: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
    {
        let final_path = dir.join(Self::file_name(id));
        let tmp_path = final_path.with_extension("sst.tmp");

        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| SstableError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(raw_file);

        let mut bloom = BloomFilter::new(bloom_bits, bloom_hashes);
        let mut accountant = BlockAccountant::new(block_size);
        let mut offset: u64 = 0;
        let mut min_key: Option<Vec<u8>> = None;
        let mut max_key: Option<Vec<u8>> = None;
        let mut entry_count = 0usize;

        for (key, value) in entries {
            if key.is_empty() {
                let _ = fs::remove_file(&tmp_path);
                return Err(SstableError::InvariantViolation(
                    "segment entries must have non-empty keys".to_string(),
                ));
            }
            let entry_len = format::encoded_len(&key, value.as_deref()) as u64;
            accountant.record(&key, offset, entry_len);
            format::write_entry(&mut writer, &key, value.as_deref())
                .map_err(|e| SstableError::io(&tmp_path, e))?;
            offset += entry_len;

            bloom.add(&key);
            if min_key.is_none() {
                min_key = Some(key.clone());
            }
            max_key = Some(key.clone());
            entry_count += 1;
        }

        if entry_count == 0 {
            drop(writer);
            let _ = fs::remove_file(&tmp_path);
            return Err(SstableError::InvariantViolation(
                "refusing to create a segment with zero entries".to_string(),
            ));
        }

        writer.flush().map_err(|e| SstableError::io(&tmp_path, e))?;
        writer
            .into_inner()
            .map_err(|e| SstableError::io(&tmp_path, e.into_error()))?
            .sync_all()
            .map_err(|e| SstableError::io(&tmp_path, e))?;

        fs::rename(&tmp_path, &final_path).map_err(|e| SstableError::io(&final_path, e))?;
        if let Some(parent) = final_path.parent() {
            if let Ok(dir_handle) = File::open(parent) {
                let _ = dir_handle.sync_all();
            }
        }

        let file = File::open(&final_path).map_err(|e| SstableError::io(&final_path, e))?;

        tracing::debug!(
            path = %final_path.display(),
            entries = entry_count,
            blocks = accountant.index.len(),
            "segment created"
        );

        Ok(Segment {
            path: final_path,
            min_key: min_key.expect("entry_count > 0 implies min_key is set"),
            max_key: max_key.expect("entry_count > 0 implies max_key is set"),
            block_index: accountant.finish(),
            bloom,
            entry_count,
            file: Mutex::new(file),
        })
    }

    /// Opens an existing segment file, rebuilding its block index, bloom
    /// filter, and min/max keys by scanning the entries sequentially.
    ///
    /// `block_size`, `bloom_bits`, and `bloom_hashes` must match the
    /// configuration the segment was originally written with -- none of
    /// the three are persisted in the file, so the caller (the manifest,
    /// reading `EngineConfig`) is responsible for supplying the same
    /// values used at write time.
    pub fn open(
        path: impl Into<PathBuf>,
        block_size: usize,
        bloom_bits: u64,
        bloom_hashes: u32,
    ) -> Result<Segment> {
        let path = path.into();
        let raw = File::open(&path).map_err(|e| SstableError::io(&path, e))?;
        let mut reader = BufReader::new(raw);

        let mut bloom = BloomFilter::new(bloom_bits, bloom_hashes);
        let mut accountant = BlockAccountant::new(block_size);
        let mut offset: u64 = 0;
        let mut min_key: Option<Vec<u8>> = None;
        let mut max_key: Option<Vec<u8>> = None;
        let mut entry_count = 0usize;

        loop {
            match format::read_entry(&mut reader) {
                Ok(Some((key, _value, len))) => {
                    if key.len() as u32 > MAX_KEY_BYTES {
                        return Err(SstableError::corruption(&path, "key exceeds maximum size"));
                    }
                    accountant.record(&key, offset, len as u64);
                    offset += len as u64;
                    bloom.add(&key);
                    if min_key.is_none() {
                        min_key = Some(key.clone());
                    }
                    max_key = Some(key);
                    entry_count += 1;
                }
                Ok(None) => break,
                Err(e) => return Err(SstableError::corruption(&path, e.to_string())),
            }
        }

        if entry_count == 0 {
            return Err(SstableError::corruption(&path, "segment contains no entries"));
        }

        let file = File::open(&path).map_err(|e| SstableError::io(&path, e))?;

        tracing::debug!(
            path = %path.display(),
            entries = entry_count,
            blocks = accountant.index.len(),
            "segment opened"
        );

        Ok(Segment {
            path,
            min_key: min_key.expect("entry_count > 0 implies min_key is set"),
            max_key: max_key.expect("entry_count > 0 implies max_key is set"),
            block_index: accountant.finish(),
            bloom,
            entry_count,
            file: Mutex::new(file),
        })
    }

    /// Looks up `key` in this segment.
    ///
    /// Returns `Ok(None)` if the key does not appear in this segment at
    /// all, `Ok(Some(None))` if it is present as a tombstone, `Ok(Some(Some(value)))`
    /// if it holds a live value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Option<Vec<u8>>>> {
        if key < self.min_key.as_slice() || key > self.max_key.as_slice() {
            return Ok(None);
        }
        if !self.bloom.might_contain(key) {
            return Ok(None);
        }

        let (block_offset, block_len) = match self
            .block_index
            .range::<[u8], _>(..=key)
            .next_back()
        {
            Some((_, &range)) => range,
            None => return Ok(None),
        };

        let mut buf = vec![0u8; block_len as usize];
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| SstableError::InvariantViolation("segment file lock poisoned".into()))?;
            file.seek(SeekFrom::Start(block_offset))
                .map_err(|e| SstableError::io(&self.path, e))?;
            file.read_exact(&mut buf)
                .map_err(|e| SstableError::io(&self.path, e))?;
        }

        let mut cursor = std::io::Cursor::new(buf);
        loop {
            match format::read_entry(&mut cursor) {
                Ok(Some((k, v, _))) => {
                    if k == key {
                        return Ok(Some(v));
                    }
                }
                Ok(None) => return Ok(None),
                Err(e) => return Err(SstableError::corruption(&self.path, e.to_string())),
            }
        }
    }

    /// Removes the segment's underlying file. Failure to unlink an
    /// existing file is treated as fatal by the caller (see the manifest's
    /// `replace` implementation).
    pub fn delete(&self) -> Result<()> {
        fs::remove_file(&self.path).map_err(|e| SstableError::io(&self.path, e))
    }

    /// Returns a fresh forward iterator over every entry in this segment,
    /// in ascending key order, including tombstones.
    pub fn iter(&self) -> Result<SegmentIterator> {
        SegmentIterator::new(self.path.clone(), &self.block_index)
    }

    /// Path to the segment's file on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Smallest key contained in this segment.
    #[must_use]
    pub fn min_key(&self) -> &[u8] {
        &self.min_key
    }

    /// Largest key contained in this segment.
    #[must_use]
    pub fn max_key(&self) -> &[u8] {
        &self.max_key
    }

    /// Number of entries (including tombstones) in this segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// Returns `true` if this segment has zero entries. Segments are never
    /// created empty, so this is always `false` in practice; kept for
    /// parity with the collection-like types it sits alongside.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Number of blocks in the block index.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_index.len()
    }
}
