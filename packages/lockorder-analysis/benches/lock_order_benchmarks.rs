//! Performance benchmarks for the lock-order detectors
//!
//! Synthetic programs: `n` sections in a ring, each acquiring two adjacent
//! locks and calling the next section, so every pass sees a full cycle.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lockorder_analysis::config::{DetectionMode, LockOrderConfig, Preset, ReachabilityStrategy};
use lockorder_analysis::features::concurrency_analysis::{
    AnalysisContext, CriticalSection, FilteredCallGraph, GroupDeadlockDetector, LockKey,
    LockOrderAnalysis, LocksetDeadlockDetector, PointsToSet,
};

/// Ring of `n` sections; `grouped` puts each in its own group
fn ring(n: usize, grouped: bool) -> (AnalysisContext, FilteredCallGraph) {
    let mut ctx = AnalysisContext::new();
    let mut graph = FilteredCallGraph::new();
    for i in 0..n {
        ctx.lock_table_mut().register_dynamic(
            LockKey::value(format!("lock{}", i)),
            PointsToSet::new([format!("new@{}", i)]),
        );
    }
    let shared = ctx.add_group();

    let guards: Vec<_> = (0..n)
        .map(|i| graph.add_method(format!("app.S{}.guard", i)))
        .collect();
    for i in 0..n {
        let body = graph.add_method(format!("app.S{}.body", i));
        let site = graph.add_call(body, guards[(i + 1) % n]).unwrap();
        let tn = CriticalSection::new(format!("S{}", i), guards[i], format!("app.S{}", i))
            .with_invoke(site)
            .with_locks([
                LockKey::value(format!("lock{}", i)),
                LockKey::value(format!("lock{}", (i + 1) % n)),
            ]);
        let group = if grouped { ctx.add_group() } else { shared };
        ctx.add_section_in_group(tn, group).unwrap();
    }
    (ctx, graph)
}

fn bench_lockset_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("lockset_detect");

    for n in [8, 32, 128] {
        let (ctx, graph) = ring(n, false);
        let config = LockOrderConfig::from_preset(Preset::Detect);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut ctx = ctx.clone();
                let result = LocksetDeadlockDetector::new(&config)
                    .detect(&mut ctx, &graph)
                    .unwrap();
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_lockset_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("lockset_repair");
    group.sample_size(20);

    for n in [8, 32] {
        let (ctx, graph) = ring(n, false);
        let analysis = LockOrderAnalysis::new(LockOrderConfig::from_preset(Preset::Repair)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut ctx = ctx.clone();
                black_box(analysis.analyze(&mut ctx, &graph).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_group_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_repair");

    for strategy in [
        ReachabilityStrategy::SuccessorExpansion,
        ReachabilityStrategy::TransitiveClosure,
    ] {
        for n in [16, 64] {
            let (ctx, graph) = ring(n, true);
            let config = LockOrderConfig::from_preset(Preset::Custom)
                .mode(DetectionMode::Group)
                .repair(true)
                .reachability(strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), n),
                &n,
                |b, _| {
                    b.iter(|| {
                        let mut ctx = ctx.clone();
                        let result = GroupDeadlockDetector::new(&config)
                            .detect(&mut ctx, &graph)
                            .unwrap();
                        black_box(result)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_lockset_detect,
    bench_lockset_repair,
    bench_group_repair
);
criterion_main!(benches);
