//! Typed error taxonomy for the engine boundary.
//!
//! Realizes the three error kinds named by the storage engine design: I/O
//! failure, on-disk corruption, and programming-invariant violations, plus
//! an `EmptyKey` variant for the one foreground input validation the
//! facade owns. [`crate::sstable::SstableError`] already distinguishes the
//! same three kinds at the segment boundary; this type wraps it rather
//! than re-deriving it.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the engine facade, the manifest, and the background
/// workers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `put`/`delete` was called with an empty key.
    #[error("key must not be empty")]
    EmptyKey,

    /// An I/O operation on the manifest or a segment file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest's on-disk contents could not be parsed.
    #[error("corrupt manifest {path}: {reason}")]
    Corruption {
        /// Path of the offending manifest or pointer file.
        path: PathBuf,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A programming invariant was violated, e.g. a `replace` whose
    /// observed source-level contents didn't match what the caller
    /// believed it was replacing.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A failure surfaced by the segment/merge boundary in the `sstable`
    /// crate.
    #[error(transparent)]
    Segment(#[from] sstable::SstableError),
}

impl EngineError {
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

/// Convenience alias for results returned at the engine boundary.
pub type Result<T> = std::result::Result<T, EngineError>;
