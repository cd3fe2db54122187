//! Durability across a simulated restart: data that made it into a
//! segment referenced by the manifest survives re-opening the engine;
//! data still sitting in an unflushed memtable does not (there is no
//! write-ahead log).

use crate::tests::helpers::test_config;
use crate::Engine;
use tempfile::tempdir;

#[test]
fn flushed_data_survives_reopening_the_engine() {
    let dir = tempdir().unwrap();
    {
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.put(b"durable".to_vec(), b"value".to_vec()).unwrap();
        let memtables = engine.memtables_for_test();
        let manifest = engine.manifest_for_test();
        memtables.force_rotate();
        crate::flush::tick(&memtables, &manifest, engine.config());
    }

    let engine = Engine::open(test_config(&dir)).unwrap();
    assert_eq!(engine.get(b"durable").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn unflushed_data_does_not_survive_reopening_the_engine() {
    let dir = tempdir().unwrap();
    {
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.put(b"ephemeral".to_vec(), b"value".to_vec()).unwrap();
        // deliberately dropped without forcing a flush
    }

    let engine = Engine::open(test_config(&dir)).unwrap();
    assert_eq!(engine.get(b"ephemeral").unwrap(), None);
}

#[test]
fn segment_levels_survive_reopening_after_compaction() {
    let dir = tempdir().unwrap();
    {
        let engine = Engine::open(test_config(&dir)).unwrap();
        let memtables = engine.memtables_for_test();
        let manifest = engine.manifest_for_test();
        // Each entry is 4 (key) + 16 (value) = 20 bytes, so the 64-byte test
        // threshold rotates every 4th write; 20 writes produce 5 level-0
        // segments, which exceeds the default level_zero_threshold of 4.
        for i in 0..20u32 {
            engine
                .put(format!("k{i:03}").into_bytes(), vec![1u8; 16])
                .unwrap();
            while memtables.has_flushable() {
                crate::flush::tick(&memtables, &manifest, engine.config());
            }
        }
        crate::compaction::tick(&manifest, engine.config());
        assert!(engine.level_segment_counts().iter().any(|(l, c)| *l == 1 && *c > 0));
    }

    let engine = Engine::open(test_config(&dir)).unwrap();
    assert!(engine.level_segment_counts().iter().any(|(l, c)| *l == 1 && *c > 0));
    for i in 0..20u32 {
        let key = format!("k{i:03}").into_bytes();
        assert_eq!(engine.get(&key).unwrap(), Some(vec![1u8; 16]));
    }
}

#[test]
fn start_and_stop_are_idempotent_and_do_not_panic() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(test_config(&dir)).unwrap();

    engine.start();
    engine.start();
    engine.put(b"k".to_vec(), b"v".to_vec()).unwrap();
    engine.stop();
    engine.stop();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
}
