//! End-to-end tests that drive the CLI binary as a subprocess over stdin/stdout.

use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Spawns the CLI binary against `data_dir`, feeds it `commands`, and returns
/// everything it printed to stdout.
fn run_cli_command(data_dir: &Path, commands: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(env!("CARGO_BIN_EXE_cli"))
        .env("ENGINE_DATA_DIR", data_dir)
        .env("ENGINE_MEMTABLE_BYTES", "1024")
        .env("ENGINE_L0_TRIGGER", "2")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn cli binary");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin
            .write_all(commands.as_bytes())
            .expect("failed to write commands");
        stdin.write_all(b"EXIT\n").expect("failed to write EXIT");
    }

    let output = child.wait_with_output().expect("failed to read output");
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn basic_set_and_get() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "PUT key1 value1\nGET key1\n");

    assert!(output.contains("OK"));
    assert!(output.contains("value1"));
}

#[test]
fn multiple_keys_are_independently_readable() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "PUT a 1\nPUT b 2\nPUT c 3\nGET a\nGET b\nGET c\n");

    assert!(output.contains('1'));
    assert!(output.contains('2'));
    assert!(output.contains('3'));
}

#[test]
fn overwrite_returns_the_newest_value() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(
        dir.path(),
        "PUT mykey oldvalue\nGET mykey\nPUT mykey newvalue\nGET mykey\n",
    );

    assert!(output.contains("oldvalue"));
    assert!(output.contains("newvalue"));
}

#[test]
fn delete_then_get_reports_nil() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "PUT delme value\nGET delme\nDELETE delme\nGET delme\n");

    assert!(output.contains("value"));
    assert!(output.contains("(nil)"));
}

#[test]
fn get_of_unknown_key_reports_nil() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "GET never-set\n");

    assert!(output.contains("(nil)"));
}

#[test]
fn flush_writes_a_segment_file() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "PUT a 1\nPUT b 2\nFLUSH\nGET a\nGET b\n");

    assert!(output.contains("OK"));
    assert!(output.contains('1'));
    assert!(output.contains('2'));

    let sst_files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "sst").unwrap_or(false))
        .collect();
    assert!(!sst_files.is_empty(), "expected a segment file after FLUSH");
}

#[test]
fn auto_rotation_on_threshold_keeps_all_keys_readable() {
    let dir = tempdir().unwrap();
    let mut commands = String::new();
    for i in 0..50 {
        commands.push_str(&format!("PUT key{i:03} value_with_some_data_{i}\n"));
    }
    for i in 0..50 {
        commands.push_str(&format!("GET key{i:03}\n"));
    }

    let output = run_cli_command(dir.path(), &commands);
    assert!(output.contains("value_with_some_data_0"));
    assert!(output.contains("value_with_some_data_49"));
}

#[test]
fn manual_compaction_keeps_all_keys_readable() {
    let dir = tempdir().unwrap();
    let mut commands = String::new();
    for batch in 0..3 {
        for i in 0..5 {
            commands.push_str(&format!("PUT batch{batch}_key{i} val{}\n", batch * 10 + i));
        }
        commands.push_str("FLUSH\n");
    }
    commands.push_str("COMPACT\n");
    for batch in 0..3 {
        for i in 0..5 {
            commands.push_str(&format!("GET batch{batch}_key{i}\n"));
        }
    }

    let output = run_cli_command(dir.path(), &commands);
    assert!(output.contains("val0"));
    assert!(output.contains("val10"));
    assert!(output.contains("val20"));
}

#[test]
fn tombstone_survives_a_flush() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(
        dir.path(),
        "PUT a 1\nPUT b 2\nPUT c 3\nPUT d 4\nDELETE b\nFLUSH\nGET b\n",
    );

    assert!(output.contains("(nil)"));
}

#[test]
fn mixed_case_keys_are_distinct() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(
        dir.path(),
        "PUT KEY1 VALUE1\nPUT Key2 Value2\nPUT key3 value3\nGET KEY1\nGET Key2\nGET key3\n",
    );

    assert!(output.contains("VALUE1"));
    assert!(output.contains("Value2"));
    assert!(output.contains("value3"));
}

#[test]
fn stats_reports_memtable_and_level_state() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "PUT a 1\nSTATS\n");

    assert!(output.contains("active_memtable_bytes="));
    assert!(output.contains("flush_queue_len="));
}
