use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memtable::Memtable;

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn memtable_put_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_put_10k", |b| {
        b.iter_batched(
            Memtable::new,
            |mut mem| {
                for i in 0..N_KEYS {
                    mem.put(format!("key{i:06}").into_bytes(), vec![b'x'; VALUE_SIZE]);
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn memtable_get_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_get_10k", |b| {
        b.iter_batched(
            || {
                let mut mem = Memtable::new();
                for i in 0..N_KEYS {
                    mem.put(format!("key{i:06}").into_bytes(), vec![b'x'; VALUE_SIZE]);
                }
                mem
            },
            |mem| {
                for i in 0..N_KEYS {
                    let key = format!("key{i:06}").into_bytes();
                    assert!(mem.get(&key).is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn memtable_put_overwrite_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_put_overwrite_10k", |b| {
        b.iter_batched(
            || {
                let mut mem = Memtable::new();
                for i in 0..N_KEYS {
                    mem.put(format!("key{i:06}").into_bytes(), vec![b'x'; VALUE_SIZE]);
                }
                mem
            },
            |mut mem| {
                for i in 0..N_KEYS {
                    mem.put(format!("key{i:06}").into_bytes(), vec![b'y'; VALUE_SIZE]);
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    memtable_put_benchmark,
    memtable_get_benchmark,
    memtable_put_overwrite_benchmark
);
criterion_main!(benches);
