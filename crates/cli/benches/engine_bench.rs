use config::EngineConfig;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::Engine;
use tempfile::tempdir;

const N_KEYS: usize = 2_000;
const VALUE_SIZE: usize = 100;

fn bench_config(dir: &tempfile::TempDir) -> EngineConfig {
    EngineConfig {
        memtable_threshold_bytes: 64 * 1024,
        ..EngineConfig::new(dir.path()).unwrap()
    }
}

fn engine_put_benchmark(c: &mut Criterion) {
    c.bench_function("engine_put_2k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine = Engine::open(bench_config(&dir)).unwrap();
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    engine
                        .put(format!("key{i:06}").into_bytes(), vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn engine_get_through_memtable_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_through_memtable_2k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine = Engine::open(bench_config(&dir)).unwrap();
                for i in 0..N_KEYS {
                    engine
                        .put(format!("key{i:06}").into_bytes(), vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    let key = format!("key{i:06}").into_bytes();
                    assert!(engine.get(&key).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_get_through_segments_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_through_segments_2k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine = Engine::open(bench_config(&dir)).unwrap();
                for i in 0..N_KEYS {
                    engine
                        .put(format!("key{i:06}").into_bytes(), vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
                engine.force_flush();
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    let key = format!("key{i:06}").into_bytes();
                    assert!(engine.get(&key).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    engine_put_benchmark,
    engine_get_through_memtable_benchmark,
    engine_get_through_segments_benchmark
);
criterion_main!(benches);
