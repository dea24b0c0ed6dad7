//! Benchmarks for fix ingestion and batch replay on synthetic streams.
//!
//! Run with: `cargo bench --bench ingest --features synthetic`

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tripmeter::synthetic::FixStreamScenario;
use tripmeter::{
    MemoryStore, NoopProvider, OdometerConfig, OdometerEngine, TrackingSessionController,
    replay_fixes, replay_tracks,
};

fn noisy_scenario(sample_count: usize, seed: u64) -> FixStreamScenario {
    FixStreamScenario {
        sample_count,
        spike_probability: 0.02,
        unknown_accuracy_probability: 0.02,
        duplicate_probability: 0.05,
        seed,
        ..FixStreamScenario::default()
    }
}

fn bench_engine_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_ingest");

    for size in [1_000usize, 10_000, 100_000] {
        let stream = noisy_scenario(size, 7).generate();
        group.throughput(Throughput::Elements(stream.fixes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &stream.fixes, |b, fixes| {
            b.iter(|| {
                let engine = OdometerEngine::new();
                for fix in fixes {
                    let _ = engine.ingest(*fix);
                }
                engine.snapshot()
            });
        });
    }

    group.finish();
}

fn bench_controller_ingest(c: &mut Criterion) {
    let stream = noisy_scenario(10_000, 11).generate();

    c.bench_function("controller_ingest_10k", |b| {
        b.iter(|| {
            let controller = TrackingSessionController::new(
                Arc::new(OdometerEngine::new()),
                Arc::new(NoopProvider),
                Arc::new(MemoryStore::new()),
            );
            let _ = controller.set_tracking_enabled(true);
            for fix in &stream.fixes {
                let _ = controller.on_fix_received(*fix);
            }
            controller.snapshot()
        });
    });
}

fn bench_replay(c: &mut Criterion) {
    let config = OdometerConfig::default();
    let tracks: Vec<_> = (0..32)
        .map(|i| {
            let stream = noisy_scenario(2_000, i).generate();
            (format!("track-{}", i), stream.fixes)
        })
        .collect();

    let mut group = c.benchmark_group("replay");
    group.bench_function("single_track", |b| {
        b.iter(|| replay_fixes(&tracks[0].0, &tracks[0].1, &config));
    });
    group.bench_function("sequential_32", |b| {
        b.iter(|| replay_tracks(&tracks, &config));
    });
    #[cfg(feature = "parallel")]
    group.bench_function("parallel_32", |b| {
        b.iter(|| tripmeter::replay_tracks_parallel(&tracks, &config));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_engine_ingest,
    bench_controller_ingest,
    bench_replay
);
criterion_main!(benches);
