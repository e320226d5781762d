//! Benchmarks for include-chain resolution.
//!
//! Covers the shapes callers actually declare:
//! - a single deep chain declared leaf-first
//! - many independent roots
//! - a shared child reachable from several parents

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use stow_query::{Entity, EntityKind, IncludeResolver, Navigation, NavigationPath, QueryOptions};

#[derive(Clone)]
struct Node<const N: usize>;

const NODE_NAMES: [&str; 16] = [
    "Node0", "Node1", "Node2", "Node3",
    "Node4", "Node5", "Node6", "Node7",
    "Node8", "Node9", "Node10", "Node11",
    "Node12", "Node13", "Node14", "Node15",
];

impl<const N: usize> Entity for Node<N> {
    const ENTITY_NAME: &'static str = NODE_NAMES[N];
}

fn kind<const N: usize>() -> EntityKind {
    EntityKind::of::<Node<N>>()
}

// Kinds 0..16 as a table so chains can be built at runtime.
fn kinds() -> Vec<EntityKind> {
    vec![
        kind::<0>(),
        kind::<1>(),
        kind::<2>(),
        kind::<3>(),
        kind::<4>(),
        kind::<5>(),
        kind::<6>(),
        kind::<7>(),
        kind::<8>(),
        kind::<9>(),
        kind::<10>(),
        kind::<11>(),
        kind::<12>(),
        kind::<13>(),
        kind::<14>(),
        kind::<15>(),
    ]
}

fn chain(depth: usize) -> Vec<NavigationPath> {
    let kinds = kinds();
    (0..depth)
        .rev()
        .map(|i| {
            NavigationPath::new(
                format!("next{i}"),
                kinds[i],
                kinds[i + 1],
                stow_query::Cardinality::One,
            )
        })
        .collect()
}

fn fan_out(width: usize) -> Vec<NavigationPath> {
    let kinds = kinds();
    (0..width)
        .map(|i| {
            NavigationPath::new(
                format!("edge{i}"),
                kinds[2 * i],
                kinds[2 * i + 1],
                stow_query::Cardinality::Many,
            )
        })
        .collect()
}

fn bench_chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_chain");

    for depth in [1usize, 4, 8, 15] {
        let paths = chain(depth);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &paths, |b, paths| {
            b.iter(|| black_box(IncludeResolver::new(paths.iter().cloned()).resolve()))
        });
    }

    group.finish();
}

fn bench_independent_roots(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_roots");

    for width in [2usize, 4, 8] {
        let paths = fan_out(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &paths, |b, paths| {
            b.iter(|| black_box(IncludeResolver::new(paths.iter().cloned()).resolve()))
        });
    }

    group.finish();
}

fn bench_options(c: &mut Criterion) {
    c.bench_function("options_shared_child", |b| {
        b.iter(|| {
            let options = QueryOptions::new()
                .include(Navigation::<Node<0>, Node<2>>::reference("shared"))
                .include(Navigation::<Node<1>, Node<2>>::reference("shared"))
                .include(Navigation::<Node<2>, Node<3>>::collection("leaves"));
            black_box(options.resolve())
        })
    });

    c.bench_function("instructions_deep_chain", |b| {
        let plan = IncludeResolver::new(chain(8)).resolve().ok();
        b.iter(|| black_box(plan.as_ref().map(|p| p.instructions())))
    });
}

criterion_group!(benches, bench_chain_depth, bench_independent_roots, bench_options);
criterion_main!(benches);
