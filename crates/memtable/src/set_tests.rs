use super::*;

// -------------------- Basic put / get --------------------

#[test]
fn put_then_get_from_active() {
    let set = MemtableSet::new(1024);
    set.put(b"k".to_vec(), b"v".to_vec());
    assert_eq!(set.get(b"k"), Some(Some(b"v".to_vec())));
}

#[test]
fn get_missing_key_returns_none() {
    let set = MemtableSet::new(1024);
    assert_eq!(set.get(b"missing"), None);
}

#[test]
fn delete_then_get_returns_tombstone() {
    let set = MemtableSet::new(1024);
    set.put(b"k".to_vec(), b"v".to_vec());
    set.delete(b"k".to_vec());
    assert_eq!(set.get(b"k"), Some(None));
}

// -------------------- Rotation --------------------

#[test]
fn put_under_threshold_does_not_rotate() {
    let set = MemtableSet::new(1024);
    let rotated = set.put(b"k".to_vec(), b"v".to_vec());
    assert!(!rotated);
    assert_eq!(set.flush_queue_len(), 0);
}

#[test]
fn put_at_threshold_rotates() {
    let set = MemtableSet::new(4); // key(1) + value(3) = 4
    let rotated = set.put(b"k".to_vec(), b"val".to_vec());
    assert!(rotated);
    assert_eq!(set.flush_queue_len(), 1);
    assert_eq!(set.active_size(), 0);
}

#[test]
fn rotation_preserves_visibility_of_sealed_entries() {
    let set = MemtableSet::new(4);
    set.put(b"k".to_vec(), b"val".to_vec()); // rotates, "k" now sealed
    assert_eq!(set.get(b"k"), Some(Some(b"val".to_vec())));
}

#[test]
fn newest_sealed_memtable_wins_over_older() {
    let set = MemtableSet::new(1); // any write rotates
    set.put(b"k".to_vec(), b"old".to_vec()); // sealed: k=old
    set.put(b"k".to_vec(), b"new".to_vec()); // sealed: k=new
    assert_eq!(set.flush_queue_len(), 2);
    assert_eq!(set.get(b"k"), Some(Some(b"new".to_vec())));
}

#[test]
fn active_memtable_always_wins_over_sealed() {
    let set = MemtableSet::new(1);
    set.put(b"k".to_vec(), b"old".to_vec()); // rotates to sealed
    // new active memtable now holds nothing for "k"; write again without
    // rotating by using a throwaway key to keep the size low is not
    // possible since threshold is 1, so this verifies sealed value is seen
    assert_eq!(set.get(b"k"), Some(Some(b"old".to_vec())));
}

// -------------------- Flush queue draining --------------------

#[test]
fn poll_flushable_returns_oldest_first() {
    let set = MemtableSet::new(1);
    set.put(b"a".to_vec(), b"1".to_vec());
    set.put(b"b".to_vec(), b"2".to_vec());
    assert_eq!(set.flush_queue_len(), 2);

    let first = set.poll_flushable().unwrap();
    assert!(first.contains_key(b"a"));

    let second = set.poll_flushable().unwrap();
    assert!(second.contains_key(b"b"));

    assert!(set.poll_flushable().is_none());
}

#[test]
fn poll_flushable_on_empty_queue_returns_none() {
    let set = MemtableSet::new(1024);
    assert!(set.poll_flushable().is_none());
}

#[test]
fn peek_flushable_does_not_remove_the_entry() {
    let set = MemtableSet::new(1);
    set.put(b"a".to_vec(), b"1".to_vec());
    set.put(b"b".to_vec(), b"2".to_vec());

    let peeked = set.peek_flushable().unwrap();
    assert!(peeked.contains_key(b"a"));
    assert_eq!(set.flush_queue_len(), 2, "peek must not remove the memtable");

    let peeked_again = set.peek_flushable().unwrap();
    assert!(peeked_again.contains_key(b"a"), "peek is idempotent");

    let polled = set.poll_flushable().unwrap();
    assert!(polled.contains_key(b"a"));
    assert_eq!(set.flush_queue_len(), 1);
}

#[test]
fn peek_flushable_on_empty_queue_returns_none() {
    let set = MemtableSet::new(1024);
    assert!(set.peek_flushable().is_none());
}

#[test]
fn has_flushable_reflects_queue_state() {
    let set = MemtableSet::new(1);
    assert!(!set.has_flushable());
    set.put(b"k".to_vec(), b"v".to_vec());
    assert!(set.has_flushable());
    set.poll_flushable();
    assert!(!set.has_flushable());
}

// -------------------- Forced rotation --------------------

#[test]
fn force_rotate_seals_nonempty_active() {
    let set = MemtableSet::new(1024);
    set.put(b"k".to_vec(), b"v".to_vec());
    let rotated = set.force_rotate();
    assert!(rotated);
    assert_eq!(set.flush_queue_len(), 1);
    assert_eq!(set.active_size(), 0);
}

#[test]
fn force_rotate_on_empty_active_is_noop() {
    let set = MemtableSet::new(1024);
    let rotated = set.force_rotate();
    assert!(!rotated);
    assert_eq!(set.flush_queue_len(), 0);
}

// -------------------- Concurrency smoke test --------------------

#[test]
fn concurrent_writers_do_not_lose_updates() {
    use std::sync::Arc;
    use std::thread;

    let set = Arc::new(MemtableSet::new(1024 * 1024));
    let mut handles = Vec::new();
    for t in 0..8 {
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            for i in 0..200 {
                let key = format!("t{}-k{}", t, i).into_bytes();
                set.put(key, b"v".to_vec());
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    for t in 0..8 {
        for i in 0..200 {
            let key = format!("t{}-k{}", t, i).into_bytes();
            assert_eq!(set.get(&key), Some(Some(b"v".to_vec())));
        }
    }
}
