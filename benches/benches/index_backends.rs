// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_index::{Aabb2D, Index, Query};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Aabb2D<f64>> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            out.push(Aabb2D::<f64>::from_xywh(
                x as f64 * cell,
                y as f64 * cell,
                cell,
                cell,
            ));
        }
    }
    out
}

struct Rng(u64);

impl Rng {
    fn next_f64(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1_u64 << 53) as f64
    }
}

fn gen_clustered_rects(clusters: usize, per_cluster: usize, spread: f64) -> Vec<Aabb2D<f64>> {
    let mut rng = Rng(0xC1A5_7E55_9999_ABCD);
    let mut out = Vec::with_capacity(clusters * per_cluster);
    for _ in 0..clusters {
        let (cx, cy) = (rng.next_f64() * 2000.0, rng.next_f64() * 2000.0);
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push(Aabb2D::<f64>::from_xywh(cx + dx, cy + dy, 12.0, 12.0));
        }
    }
    out
}

fn bench_build_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_query");
    let window = Aabb2D::<f64>::from_xywh(100.0, 100.0, 400.0, 400.0);
    for &n in &[32_usize, 64, 128] {
        let rects = gen_grid_rects(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("flatvec_grid_n{n}"), |b| {
            b.iter_batched(
                Index::<f64, usize>::new,
                |mut idx| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        idx.insert(r, i);
                    }
                    idx.ensure_built();
                    black_box(idx.query_rect(window).count());
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("rtree_grid_n{n}"), |b| {
            b.iter_batched(
                Index::<f64, usize>::with_rtree,
                |mut idx| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        idx.insert(r, i);
                    }
                    idx.ensure_built();
                    black_box(idx.query_rect(window).count());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_quad_skipping(c: &mut Criterion) {
    let mut group = c.benchmark_group("quad_skipping");
    let rects = gen_clustered_rects(64, 256, 120.0);
    let mut idx = Index::<f64, usize>::with_rtree();
    for (i, r) in rects.iter().copied().enumerate() {
        idx.insert(r, i);
    }
    idx.ensure_built();
    // Reject everything in the left half without looking at the items.
    let keep = Aabb2D::<f64>::new(1000.0, 0.0, 2100.0, 2100.0);
    group.bench_function("item_filter", |b| {
        b.iter(|| {
            let hits = idx
                .query(Query::All)
                .filter(|(k, _)| idx.aabb(*k).is_some_and(|a| a.touches(&keep)))
                .count();
            black_box(hits);
        });
    });
    group.bench_function("skip_quad", |b| {
        b.iter(|| {
            let mut cursor = idx.query(Query::All);
            let mut hits = 0_usize;
            while let Some((_, aabb, _)) = cursor.current() {
                if cursor.quad_box().is_some_and(|q| !q.touches(&keep)) {
                    cursor.skip_quad();
                    continue;
                }
                hits += usize::from(aabb.touches(&keep));
                cursor.advance();
            }
            black_box(hits);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_build_query, bench_quad_skipping);
criterion_main!(benches);
