//! # CLI - interactive shell over the storage engine
//!
//! A REPL-style command-line interface for the embedded LSM store. Reads
//! commands from stdin, executes them against an [`engine::Engine`], and
//! prints results to stdout. Designed for both interactive use and
//! scripted testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! PUT key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DELETE key         Delete a key (writes a tombstone)
//! FLUSH              Force-seal the active memtable and drain the flush queue
//! COMPACT            Run one compaction tick over the levels
//! STATS              Print memtable/level debug info
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! There is no `SCAN`: the engine has no range-scan support (see
//! `DESIGN.md`).
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! ENGINE_DATA_DIR           data directory                 (default: "./data")
//! ENGINE_MEMTABLE_BYTES     memtable rotation threshold     (default: 4 MiB)
//! ENGINE_SEGMENT_BYTES      compaction output target size   (default: 4 MiB)
//! ENGINE_L0_TRIGGER         level-0 table-count trigger      (default: 4)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! engine started (data_dir=./data, memtable_threshold=4194304B, l0_trigger=4)
//! > PUT name Alice
//! OK
//! > GET name
//! Alice
//! > STATS
//! active_memtable_bytes=9 flush_queue_len=0 levels=[]
//! > EXIT
//! bye
//! ```

use anyhow::{Context, Result};
use config::EngineConfig;
use engine::Engine;
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn build_config() -> Result<EngineConfig> {
    let data_dir = env_or("ENGINE_DATA_DIR", config::DEFAULT_DATA_DIRECTORY);
    let config = EngineConfig {
        memtable_threshold_bytes: env_parsed(
            "ENGINE_MEMTABLE_BYTES",
            config::DEFAULT_MEMTABLE_THRESHOLD_BYTES,
        ),
        segment_target_size: env_parsed(
            "ENGINE_SEGMENT_BYTES",
            config::DEFAULT_SEGMENT_TARGET_SIZE,
        ),
        level_zero_threshold: env_parsed(
            "ENGINE_L0_TRIGGER",
            config::DEFAULT_LEVEL_ZERO_THRESHOLD,
        ),
        ..EngineConfig::new(data_dir)?
    };
    config.validate().context("invalid engine configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = build_config()?;
    let engine = Engine::open(config)?;
    engine.start();

    println!(
        "engine started (data_dir={}, memtable_threshold={}B, l0_trigger={})",
        engine.config().data_directory.display(),
        engine.config().memtable_threshold_bytes,
        engine.config().level_zero_threshold,
    );
    println!("commands: PUT key value | GET key | DELETE key | FLUSH | COMPACT | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some(cmd) => match cmd.to_uppercase().as_str() {
                "PUT" => match parts.next() {
                    Some(key) => {
                        let value: String = parts.collect::<Vec<&str>>().join(" ");
                        if value.is_empty() {
                            println!("ERR usage: PUT key value");
                        } else {
                            match engine.put(key.as_bytes().to_vec(), value.into_bytes()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR {e}"),
                            }
                        }
                    }
                    None => println!("ERR usage: PUT key value"),
                },
                "GET" => match parts.next() {
                    Some(key) => match engine.get(key.as_bytes()) {
                        Ok(Some(value)) => println!("{}", String::from_utf8_lossy(&value)),
                        Ok(None) => println!("(nil)"),
                        Err(e) => println!("ERR {e}"),
                    },
                    None => println!("ERR usage: GET key"),
                },
                "DELETE" => match parts.next() {
                    Some(key) => match engine.delete(key.as_bytes().to_vec()) {
                        Ok(()) => println!("OK"),
                        Err(e) => println!("ERR {e}"),
                    },
                    None => println!("ERR usage: DELETE key"),
                },
                "FLUSH" => {
                    let flushed = engine.force_flush();
                    println!("OK (flushed={flushed} levels={:?})", engine.level_segment_counts());
                }
                "COMPACT" => {
                    engine.run_compaction_tick();
                    println!("OK (levels={:?})", engine.level_segment_counts());
                }
                "STATS" => {
                    println!(
                        "active_memtable_bytes={} flush_queue_len={} levels={:?}",
                        engine.active_memtable_size(),
                        engine.flush_queue_len(),
                        engine.level_segment_counts(),
                    );
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => println!("unknown command: {other}"),
            },
            None => {}
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    engine.stop();
    Ok(())
}
