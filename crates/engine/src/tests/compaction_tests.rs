use crate::tests::helpers::test_config;
use crate::Engine;
use tempfile::tempdir;

/// Writes `count` distinct keys, draining the flush queue after each write
/// so every key lands in its own level-0 segment (the test config's 64-byte
/// threshold seals the memtable on nearly every write).
fn write_and_flush_each(engine: &Engine, count: u32) {
    let memtables = engine.memtables_for_test();
    let manifest = engine.manifest_for_test();
    for i in 0..count {
        engine
            .put(format!("key-{i:05}").into_bytes(), vec![0u8; 32])
            .unwrap();
        while memtables.has_flushable() {
            crate::flush::tick(&memtables, &manifest, engine.config());
        }
    }
}

#[test]
fn compaction_merges_an_overfull_level_zero_into_level_one() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(test_config(&dir)).unwrap();

    // level_zero_threshold defaults to 4. Each entry is 9 (key) + 32 (value)
    // = 41 bytes, so the 64-byte test threshold rotates every other write;
    // 10 writes therefore produce 5 level-0 segments, which exceeds 4.
    write_and_flush_each(&engine, 10);
    assert!(engine.level_segment_counts().iter().any(|(l, _)| *l == 0));

    let manifest = engine.manifest_for_test();
    crate::compaction::tick(&manifest, engine.config());

    let counts: std::collections::HashMap<_, _> = engine.level_segment_counts().into_iter().collect();
    assert_eq!(counts.get(&0).copied().unwrap_or(0), 0, "level 0 should be drained by compaction");
    assert!(counts.get(&1).copied().unwrap_or(0) >= 1, "level 1 should receive the merged output");
}

#[test]
fn all_keys_remain_readable_through_compaction() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(test_config(&dir)).unwrap();

    write_and_flush_each(&engine, 10);
    let manifest = engine.manifest_for_test();
    crate::compaction::tick(&manifest, engine.config());

    for i in 0..10u32 {
        let key = format!("key-{i:05}").into_bytes();
        assert_eq!(engine.get(&key).unwrap(), Some(vec![0u8; 32]));
    }
}

#[test]
fn compaction_drops_tombstones_only_from_segments_it_merges() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(test_config(&dir)).unwrap();

    write_and_flush_each(&engine, 5);
    engine.delete(b"key-00000".to_vec()).unwrap();
    let memtables = engine.memtables_for_test();
    let manifest = engine.manifest_for_test();
    while memtables.has_flushable() {
        crate::flush::tick(&memtables, &manifest, engine.config());
    }
    // force the tombstone itself into a segment too
    memtables.force_rotate();
    while memtables.has_flushable() {
        crate::flush::tick(&memtables, &manifest, engine.config());
    }

    crate::compaction::tick(&manifest, engine.config());

    assert_eq!(engine.get(b"key-00000").unwrap(), None, "tombstone must still shadow the deleted key after merge");
}

#[test]
fn compaction_is_a_no_op_when_no_level_is_overfull() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(test_config(&dir)).unwrap();

    write_and_flush_each(&engine, 1);
    let before = engine.level_segment_counts();

    let manifest = engine.manifest_for_test();
    crate::compaction::tick(&manifest, engine.config());

    assert_eq!(engine.level_segment_counts(), before);
}
