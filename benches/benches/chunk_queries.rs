// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Rect;

use canopy_chunks::{ChunkConfig, ChunkIndex};
use canopy_hierarchy::{HierarchyBuilder, Lineage, RecordId, TaxonRecord};
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
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

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

fn bench_chunk_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_index_build");
    for &n in &[10_000usize, 50_000] {
        let records = gen_taxonomy(n, 0x0C11_4D5E_ED00_0001);
        let built = HierarchyBuilder::default().build(&records);
        let layout = LayoutEngine::default().compute(&built.hierarchy);
        group.throughput(Throughput::Elements(built.hierarchy.len() as u64));
        group.bench_function(format!("nodes_n{}", n), |b| {
            b.iter(|| {
                let index = ChunkIndex::build(
                    black_box(&built.hierarchy),
                    black_box(&layout),
                    ChunkConfig::default(),
                );
                black_box(index.len());
            })
        });
    }
    group.finish();
}

fn bench_viewport_rect_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_rect_query");
    let records = gen_taxonomy(50_000, 0x0C11_4D5E_ED00_0002);
    let built = HierarchyBuilder::default().build(&records);
    let layout = LayoutEngine::default().compute(&built.hierarchy);
    let index = ChunkIndex::build(&built.hierarchy, &layout, ChunkConfig::default());

    // 256 viewport-sized rects scattered over the layout, the shape of a
    // consumer panning across the tree.
    let mut rng = Rng::new(0x0C11_4D5E_ED00_0003);
    let viewports: Vec<Rect> = (0..256)
        .map(|_| {
            let x = rng.next_f64() * layout.bounds.x1;
            let y = rng.next_f64() * layout.bounds.y1;
            Rect::new(x, y, x + 1920.0, y + 1080.0)
        })
        .collect();

    group.throughput(Throughput::Elements(viewports.len() as u64));
    group.bench_function("viewports_256", |b| {
        b.iter(|| {
            let mut nodes = 0usize;
            for rect in &viewports {
                for chunk in index.chunks_in_rect(*rect) {
                    nodes += chunk.len();
                }
            }
            black_box(nodes);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_chunk_index_build, bench_viewport_rect_queries);
criterion_main!(benches);
