// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_index::{Aabb2D, Index};

use rstar::primitives::Rectangle;
use rstar::{AABB, RTree};

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

fn bench_rtree_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare");
    let window = Aabb2D::<f64>::from_xywh(100.0, 100.0, 400.0, 400.0);
    for &n in &[64_usize, 128] {
        let rects = gen_grid_rects(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("understory_build_query_n{n}"), |b| {
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

        group.bench_function(format!("rstar_build_query_n{n}"), |b| {
            b.iter_batched(
                || {
                    rects
                        .iter()
                        .map(|r| Rectangle::from_corners([r.min_x, r.min_y], [r.max_x, r.max_y]))
                        .collect::<Vec<_>>()
                },
                |rectangles| {
                    let tree = RTree::bulk_load(rectangles);
                    let aabb = AABB::from_corners(
                        [window.min_x, window.min_y],
                        [window.max_x, window.max_y],
                    );
                    black_box(tree.locate_in_envelope_intersecting(&aabb).count());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rtree_external_compare);
criterion_main!(benches);
