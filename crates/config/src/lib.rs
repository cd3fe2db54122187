//! # Config
//!
//! Typed, validated configuration for the storage engine.
//!
//! [`EngineConfig`] gathers every tuning knob named by the engine's write
//! path, segment format, and background workers into one place, with
//! defaults matching the reference design and eager validation so a bad
//! configuration fails at construction time rather than deep inside a flush
//! or compaction tick.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default memtable rotation threshold: 4 MiB.
pub const DEFAULT_MEMTABLE_THRESHOLD_BYTES: usize = 4 * 1024 * 1024;
/// Default block size for segment block accounting: 4 KiB.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
/// Default target size for a single compaction output segment: 4 MiB.
pub const DEFAULT_SEGMENT_TARGET_SIZE: usize = 4 * 1024 * 1024;
/// Default bloom filter bit count.
pub const DEFAULT_BLOOM_BITS: u64 = 1000;
/// Default bloom filter hash count.
pub const DEFAULT_BLOOM_HASHES: u32 = 3;
/// Default level-0 table-count trigger.
pub const DEFAULT_LEVEL_ZERO_THRESHOLD: usize = 4;
/// Default base threshold for levels >= 1 (`base * factor^level`).
pub const DEFAULT_BASE_THRESHOLD: usize = 4;
/// Default growth factor per level for levels >= 1.
pub const DEFAULT_INCREASE_FACTOR: f64 = 4.0;
/// Default flush worker tick period.
pub const DEFAULT_FLUSH_PERIOD: Duration = Duration::from_millis(50);
/// Default compaction worker tick period.
pub const DEFAULT_COMPACTION_PERIOD: Duration = Duration::from_millis(200);
/// Default data directory, relative to the process's working directory.
pub const DEFAULT_DATA_DIRECTORY: &str = "./data";

/// Errors raised while validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A size-like field (memtable threshold, block size, segment target
    /// size) was zero.
    #[error("{field} must be greater than zero")]
    ZeroSize {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The bloom filter hash count was zero.
    #[error("bloom_hashes must be greater than zero")]
    ZeroBloomHashes,

    /// The per-level growth factor was not greater than 1.0, which would
    /// make `levelThreshold` non-increasing and compaction never converge.
    #[error("increase_factor must be greater than 1.0, got {0}")]
    InvalidIncreaseFactor(f64),

    /// `data_directory` exists but is not a directory.
    #[error("data_directory {0:?} exists and is not a directory")]
    DataDirectoryNotADirectory(PathBuf),
}

/// Typed configuration for every engine tuning knob.
///
/// Construct with [`EngineConfig::new`] (validated) or start from
/// [`EngineConfig::default`] and override individual fields with the
/// builder-style `with_*` methods before calling [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Root directory for segment files and the manifest.
    pub data_directory: PathBuf,
    /// Byte-size threshold at which the active memtable is rotated.
    pub memtable_threshold_bytes: usize,
    /// Maximum on-disk byte size of a single block within a segment.
    pub block_size: usize,
    /// Target byte size for a single segment produced by compaction.
    pub segment_target_size: usize,
    /// Bit count for each segment's bloom filter.
    pub bloom_bits: u64,
    /// Hash count for each segment's bloom filter.
    pub bloom_hashes: u32,
    /// Table-count trigger for level 0 (checked exactly, not via the
    /// base/factor formula used for higher levels).
    pub level_zero_threshold: usize,
    /// Base table-count trigger for level 1; levels above multiply by
    /// `increase_factor` per additional level.
    pub base_threshold: usize,
    /// Per-level growth factor applied to `base_threshold` for levels >= 1.
    pub increase_factor: f64,
    /// How often the flush worker wakes up to drain the flush queue.
    pub flush_period: Duration,
    /// How often the compaction worker wakes up to scan levels.
    pub compaction_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from(DEFAULT_DATA_DIRECTORY),
            memtable_threshold_bytes: DEFAULT_MEMTABLE_THRESHOLD_BYTES,
            block_size: DEFAULT_BLOCK_SIZE,
            segment_target_size: DEFAULT_SEGMENT_TARGET_SIZE,
            bloom_bits: DEFAULT_BLOOM_BITS,
            bloom_hashes: DEFAULT_BLOOM_HASHES,
            level_zero_threshold: DEFAULT_LEVEL_ZERO_THRESHOLD,
            base_threshold: DEFAULT_BASE_THRESHOLD,
            increase_factor: DEFAULT_INCREASE_FACTOR,
            flush_period: DEFAULT_FLUSH_PERIOD,
            compaction_period: DEFAULT_COMPACTION_PERIOD,
        }
    }
}

impl EngineConfig {
    /// Builds the default configuration rooted at `data_directory`, then
    /// validates it.
    pub fn new(data_directory: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self {
            data_directory: data_directory.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns the table-count threshold above which `level` is considered
    /// overfull and eligible for compaction into `level + 1`.
    ///
    /// Level 0 uses `level_zero_threshold` directly; levels >= 1 use
    /// `base_threshold * increase_factor^(level - 1)`, rounded down.
    #[must_use]
    pub fn level_threshold(&self, level: usize) -> usize {
        if level == 0 {
            return self.level_zero_threshold;
        }
        let scaled = self.base_threshold as f64 * self.increase_factor.powi((level - 1) as i32);
        scaled.floor().max(1.0) as usize
    }

    /// Validates every field, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memtable_threshold_bytes == 0 {
            return Err(ConfigError::ZeroSize {
                field: "memtable_threshold_bytes",
            });
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroSize { field: "block_size" });
        }
        if self.segment_target_size == 0 {
            return Err(ConfigError::ZeroSize {
                field: "segment_target_size",
            });
        }
        if self.bloom_bits == 0 {
            return Err(ConfigError::ZeroSize { field: "bloom_bits" });
        }
        if self.bloom_hashes == 0 {
            return Err(ConfigError::ZeroBloomHashes);
        }
        if self.increase_factor <= 1.0 {
            return Err(ConfigError::InvalidIncreaseFactor(self.increase_factor));
        }
        if self.data_directory.exists() && !self.data_directory.is_dir() {
            return Err(ConfigError::DataDirectoryNotADirectory(
                self.data_directory.clone(),
            ));
        }
        Ok(())
    }
}
