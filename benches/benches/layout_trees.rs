// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use canopy_hierarchy::{Hierarchy, HierarchyBuilder, Lineage, RecordId, TaxonRecord};
use canopy_layout::LayoutEngine;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// Deterministic synthetic taxonomy: branch choices at each rank with small
/// fanouts, names chain-encoded so shared prefixes dedup into shared
/// ancestors and every record gets a unique species leaf.
fn gen_taxonomy(count: usize, seed: u64) -> Vec<TaxonRecord> {
    let mut rng = Rng::new(seed);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let k = rng.next_below(3);
        let p = rng.next_below(4);
        let c = rng.next_below(5);
        let o = rng.next_below(6);
        let f = rng.next_below(8);
        let g = rng.next_below(10);
        let lineage = Lineage {
            kingdom: Some(format!("k{k}")),
            phylum: Some(format!("p{k}.{p}")),
            class: Some(format!("c{k}.{p}.{c}")),
            order: Some(format!("o{k}.{p}.{c}.{o}")),
            family: Some(format!("f{k}.{p}.{c}.{o}.{f}")),
            genus: Some(format!("g{k}.{p}.{c}.{o}.{f}.{g}")),
            species: Some(format!("s{i}")),
            ..Default::default()
        };
        out.push(TaxonRecord {
            id: RecordId(i as u64),
            lineage,
            discovery: None,
            ordering: i as u64,
        });
    }
    out
}

/// Every record its own kingdom: one node with `count` children.
fn gen_star(count: usize) -> Vec<TaxonRecord> {
    (0..count)
        .map(|i| TaxonRecord {
            id: RecordId(i as u64),
            lineage: Lineage {
                kingdom: Some(format!("k{i:05}")),
                ..Default::default()
            },
            discovery: None,
            ordering: i as u64,
        })
        .collect()
}

fn build_hierarchy(records: &[TaxonRecord]) -> Hierarchy {
    HierarchyBuilder::default().build(records).hierarchy
}

fn bench_hierarchy_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_build");
    for &n in &[1_000usize, 10_000, 50_000] {
        let records = gen_taxonomy(n, 0x5EED_CA11_F00D_0001);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("records_n{}", n), |b| {
            b.iter(|| {
                let built = HierarchyBuilder::default().build(black_box(&records));
                black_box(built.hierarchy.len());
            })
        });
    }
    group.finish();
}

fn bench_tidy_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("tidy_layout");
    for &n in &[1_000usize, 10_000, 50_000] {
        let records = gen_taxonomy(n, 0x5EED_CA11_F00D_0002);
        let hierarchy = build_hierarchy(&records);
        group.throughput(Throughput::Elements(hierarchy.len() as u64));
        group.bench_function(format!("taxonomy_n{}", n), |b| {
            let engine = LayoutEngine::default();
            b.iter(|| {
                let layout = engine.compute(black_box(&hierarchy));
                black_box(layout.positions.len());
            })
        });
    }
    group.finish();
}

fn bench_tidy_layout_star(c: &mut Criterion) {
    let mut group = c.benchmark_group("tidy_layout_star");
    let records = gen_star(10_000);
    let hierarchy = build_hierarchy(&records);
    group.throughput(Throughput::Elements(hierarchy.len() as u64));
    group.bench_function("children_n10000", |b| {
        let engine = LayoutEngine::default();
        b.iter(|| {
            let layout = engine.compute(black_box(&hierarchy));
            black_box(layout.bounds.x1);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_hierarchy_build,
    bench_tidy_layout,
    bench_tidy_layout_star,
);
criterion_main!(benches);
