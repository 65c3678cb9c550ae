use std::hint::black_box;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tierlib::config::{SimulationConfig, StructureKind, WorkloadSize};
use tierlib::search_structures::SearchStructure;
use tierlib::simulator::SimulationEngine;

/// Raw backend lookups over the whole corpus, without the cache in front
pub fn lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Lookups");
    let engine = SimulationEngine::new(SimulationConfig::default()).unwrap();
    let keys = engine.corpus().iter().map(|r| r.key.clone()).collect::<Vec<_>>();
    for kind in StructureKind::ALL {
        let backend = engine.backend(kind);
        group.bench_with_input(BenchmarkId::new("Corpus", kind), &keys, |bench, keys| {
            bench.iter(|| {
                for key in keys {
                    black_box(backend.search(key));
                }
            });
        });
    }
    group.finish();
}

/// Whole simulations, cache included, for each preset workload size
pub fn simulation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Simulations");
    let mut engine = SimulationEngine::new(SimulationConfig::default()).unwrap();
    for size in [WorkloadSize::Small, WorkloadSize::Medium, WorkloadSize::Large] {
        let operations = size.operations();
        for kind in StructureKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.name(), operations), &operations, |bench, &operations| {
                bench.iter(|| black_box(engine.run(kind, operations)));
            });
        }
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = lookup_benchmark, simulation_benchmark
);
criterion_main!(benches);
