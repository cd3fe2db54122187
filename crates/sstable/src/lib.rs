//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk storage files for the storage engine.
//!
//! When a memtable seals (see `memtable::MemtableSet`) the engine flushes
//! it to disk as a segment. Segments are *write-once, read-many* — once
//! created they are never modified, only replaced wholesale during
//! compaction.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ repeated: keyLen (u32 BE) | key | valueLen (u32 BE) | value     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no header, footer, or checksum. A tombstone is written as
//! `valueLen = 0` with no value bytes -- this aliases an empty-string
//! value on disk, a deliberate format choice (see `DESIGN.md`); the
//! distinction between "deleted" and "empty" is preserved only in the
//! in-memory API (`Option<Vec<u8>>`), not across a restart.
//!
//! The block index and bloom filter are never persisted: both are rebuilt
//! by scanning the file's entries on every open, using the same
//! block-size accounting rule used when the file was written.

mod error;
mod format;
mod iterator;
mod segment;
mod sorted_run;

pub use error::{Result, SstableError};
pub use iterator::SegmentIterator;
pub use segment::Segment;
pub use sorted_run::merge;
