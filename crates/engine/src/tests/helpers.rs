use config::EngineConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Builds a config rooted at a fresh temp directory with a tiny memtable
/// threshold, so a handful of writes is enough to force a rotation without
/// waiting on the real multi-megabyte default.
pub fn test_config(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        memtable_threshold_bytes: 64,
        ..EngineConfig::new(dir.path()).expect("temp dir config should validate")
    }
}

pub fn count_sst_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}
