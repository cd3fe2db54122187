//! k-way merge over multiple segments, producing one or more size-bounded
//! output segments -- the core primitive behind compaction.
//!
//! Duplicate keys across inputs are resolved by source ordering, not by a
//! sequence number: the caller arranges `segments` so that index 0 is the
//! "newest" source and later indices are progressively older (the
//! reference convention is level-0 inputs first, newest-first, followed by
//! the target-level inputs). Ties on key are broken by the smaller source
//! index, which is how "newest wins" is expressed without timestamps.

use crate::error::Result;
use crate::format;
use crate::segment::Segment;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;

struct HeapEntry {
    key: Vec<u8>,
    value: Option<Vec<u8>>,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the key comparison so the
        // smallest key pops first. On a tie, the smaller source index pops
        // first -- that's the caller's "newer" source.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges `segments` into one or more new segments under `dir`, each no
/// larger than `target_size` bytes of encoded entries.
///
/// `next_id` is called once per output segment to obtain its on-disk id;
/// callers typically thread a shared monotonic counter through so output
/// segment names never collide with any other segment in the store.
///
/// Returns the newly created segments in the order they were finalized
/// (ascending key ranges, since input keys are merged in ascending order).
pub fn merge(
    dir: &Path,
    mut next_id: impl FnMut() -> u64,
    segments: &[&Segment],
    target_size: usize,
    bloom_bits: u64,
    bloom_hashes: u32,
    block_size: usize,
) -> Result<Vec<Segment>> {
    let mut iters = segments
        .iter()
        .map(|s| s.iter())
        .collect::<Result<Vec<_>>>()?;

    let mut heap = BinaryHeap::new();
    for (source, iter) in iters.iter_mut().enumerate() {
        if let Some(entry) = iter.next() {
            let (key, value) = entry?;
            heap.push(HeapEntry { key, value, source });
        }
    }

    let mut outputs: Vec<Segment> = Vec::new();
    let mut current_entries: Vec<(Vec<u8>, Option<Vec<u8>>)> = Vec::new();
    let mut current_size: usize = 0;
    let mut last_emitted_key: Option<Vec<u8>> = None;

    // A failure partway through produces a `return` below, not a `?` --
    // by then `outputs` may already hold segments that were fully written
    // and renamed into place. Leaving them behind would orphan files that
    // no manifest entry ever points at, so every failure path unlinks
    // whatever this call has created before propagating the error.
    macro_rules! fail {
        ($err:expr) => {{
            for seg in &outputs {
                let _ = seg.delete();
            }
            return Err($err);
        }};
    }

    while let Some(top) = heap.pop() {
        match iters[top.source].next() {
            Some(Ok((key, value))) => heap.push(HeapEntry {
                key,
                value,
                source: top.source,
            }),
            Some(Err(e)) => fail!(e),
            None => {}
        }

        if last_emitted_key.as_deref() == Some(top.key.as_slice()) {
            // Stale duplicate: a newer source already emitted this key.
            continue;
        }

        let entry_size = format::encoded_len(&top.key, top.value.as_deref());
        if !current_entries.is_empty() && current_size + entry_size > target_size {
            match Segment::create_from_entries(
                dir,
                next_id(),
                current_entries.drain(..),
                bloom_bits,
                bloom_hashes,
                block_size,
            ) {
                Ok(seg) => outputs.push(seg),
                Err(e) => fail!(e),
            }
            current_size = 0;
        }

        last_emitted_key = Some(top.key.clone());
        current_size += entry_size;
        current_entries.push((top.key, top.value));
    }

    if !current_entries.is_empty() {
        match Segment::create_from_entries(
            dir,
            next_id(),
            current_entries.into_iter(),
            bloom_bits,
            bloom_hashes,
            block_size,
        ) {
            Ok(seg) => outputs.push(seg),
            Err(e) => fail!(e),
        }
    }

    Ok(outputs)
}
