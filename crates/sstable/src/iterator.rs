//! Forward-only, block-buffered iteration over a segment's entries.

use crate::error::{Result, SstableError};
use crate::format;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

/// A restartable, single-pass, forward-only iterator over a segment's
/// entries in ascending key order.
///
/// Walks the block index one block at a time. Each block is read into
/// memory in full (a single seek + read), then decoded entry by entry; a
/// point lookup never needs to cross a block boundary, but a full scan
/// naturally visits every block in sequence. Closing (dropping) the
/// iterator releases its file handle.
pub struct SegmentIterator {
    path: PathBuf,
    file: File,
    block_ranges: std::vec::IntoIter<(u64, u64)>,
    current_block: Option<Cursor<Vec<u8>>>,
}

impl SegmentIterator {
    pub(crate) fn new(
        path: PathBuf,
        block_index: &BTreeMap<Vec<u8>, (u64, u64)>,
    ) -> Result<Self> {
        let file = File::open(&path).map_err(|e| SstableError::io(&path, e))?;
        let mut ranges: Vec<(u64, u64)> = block_index.values().copied().collect();
        ranges.sort_unstable_by_key(|&(offset, _)| offset);
        Ok(Self {
            path,
            file,
            block_ranges: ranges.into_iter(),
            current_block: None,
        })
    }

    fn load_next_block(&mut self) -> Result<bool> {
        match self.block_ranges.next() {
            Some((offset, len)) => {
                self.file
                    .seek(SeekFrom::Start(offset))
                    .map_err(|e| SstableError::io(&self.path, e))?;
                let mut buf = vec![0u8; len as usize];
                self.file
                    .read_exact(&mut buf)
                    .map_err(|e| SstableError::io(&self.path, e))?;
                self.current_block = Some(Cursor::new(buf));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Iterator for SegmentIterator {
    type Item = Result<(Vec<u8>, Option<Vec<u8>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = self.current_block.as_mut() {
                match format::read_entry(cursor) {
                    Ok(Some((key, value, _))) => return Some(Ok((key, value))),
                    Ok(None) => {
                        self.current_block = None;
                        continue;
                    }
                    Err(e) => {
                        return Some(Err(SstableError::corruption(&self.path, e.to_string())))
                    }
                }
            }
            match self.load_next_block() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
