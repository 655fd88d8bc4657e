use std::hint::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;

use pd_tree::Tree;
use pd_tree::TreeBuilder;
use pd_epidemic::EpidemicIncrements;
use pd_epidemic::recompute;

/// A balanced, ultrametric tree over 2^depth tips.
fn balanced_tree(depth: u32) -> Tree {
    let mut builder = TreeBuilder::new();
    let mut level: Vec<usize> = (0..1usize << depth)
        .map(|i| builder.add_tip(Some(format!("t{i}")), 0.0))
        .collect();
    let mut height = 0.0;
    while level.len() > 1 {
        height += 1.0;
        level = level.chunks(2)
            .map(|pair| builder.join(pair, height).unwrap())
            .collect();
    }
    builder.finish().unwrap()
}

fn increments(dim: usize) -> EpidemicIncrements {
    // Slow depletion that never drops below the lineage count.
    EpidemicIncrements {
        s0: 1_000_000,
        ds: vec![100; dim],
        de: None,
        dr: vec![10; dim],
    }
}

fn recompute_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute");
    for (depth, dim) in [(5, 10), (8, 100), (10, 1000)] {
        let tree = balanced_tree(depth);
        let inc = increments(dim);
        group.bench_function(format!("tips{}_dim{}", 1 << depth, dim), |b| {
            b.iter(|| recompute(black_box(&inc), &tree, 0.5, 1.0))
        });
    }
    group.finish();
}

criterion_group!(benches, recompute_benchmark);
criterion_main!(benches);
