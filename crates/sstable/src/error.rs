//! Typed error taxonomy for the segment boundary.
//!
//! Mirrors the three error kinds used throughout the engine: I/O failure,
//! on-disk corruption, and programming-invariant violations. Low-level,
//! single-purpose helpers (entry encode/decode) still surface plain
//! `std::io::Error`; this taxonomy is the public boundary type for
//! [`crate::Segment`] and [`crate::SortedRunBuilder`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by segment creation, opening, lookup, and merging.
#[derive(Debug, Error)]
pub enum SstableError {
    /// An I/O operation (read, write, rename, unlink) failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The segment file's contents could not be parsed as valid entries.
    #[error("corrupt segment {path}: {reason}")]
    Corruption {
        /// Path of the offending segment file.
        path: PathBuf,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A programming invariant was violated (e.g. a merge input list did not
    /// match what the caller believed it contained).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl SstableError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a corruption error for `path` with the given reason.
    pub fn corruption(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corruption {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results returned at the segment/merge boundary.
pub type Result<T> = std::result::Result<T, SstableError>;
