// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Affine, Rect};
use understory_layout::{CellId, Instance, LayerId, LayerInfo, Layout, Polygon, Repetition, Shape};
use understory_shape_iter::RecursiveShapeIter;

/// A memory-like hierarchy: bit cells arrayed into words, words arrayed into a bank.
fn bank(words: u32, bits: u32) -> (Layout, CellId, LayerId) {
    let mut layout = Layout::new();
    let metal = layout.add_layer(LayerInfo::new(1, 0));
    let poly = layout.add_layer(LayerInfo::new(2, 0));
    let top = layout.add_cell("BANK").unwrap();
    let word = layout.add_cell("WORD").unwrap();
    let bit = layout.add_cell("BIT").unwrap();
    let strap = layout.add_cell("STRAP").unwrap();

    let b = layout.cell_mut(bit);
    b.insert_shape(metal, Shape::rect(Rect::new(0.0, 0.0, 6.0, 2.0)));
    b.insert_shape(metal, Shape::rect(Rect::new(0.0, 4.0, 6.0, 6.0)));
    b.insert_shape(poly, Shape::rect(Rect::new(2.0, -1.0, 3.0, 7.0)));
    layout
        .cell_mut(strap)
        .insert_shape(poly, Shape::rect(Rect::new(0.0, 0.0, 1.0, 1.0)));

    let w = layout.cell_mut(word);
    w.insert_instance(Instance::array(
        bit,
        Affine::IDENTITY,
        Repetition::grid(8.0, 0.0, bits, 1),
    ));
    w.insert_instance(Instance::new(strap, Affine::translate((-4.0, 2.0))));
    layout.cell_mut(top).insert_instance(Instance::array(
        word,
        Affine::IDENTITY,
        Repetition::grid(0.0, 8.0, 1, words),
    ));
    layout.ensure_built().unwrap();
    (layout, top, metal)
}

fn bench_windows(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_iter_window");
    let (layout, top, metal) = bank(256, 64);
    for &side in &[16.0_f64, 64.0, 256.0] {
        let window = Rect::new(100.0, 100.0, 100.0 + side, 100.0 + side);
        let mut iter = RecursiveShapeIter::new(&layout, top, metal);
        iter.set_region(window);
        let hits = iter.by_ref().count();
        group.throughput(Throughput::Elements(hits as u64));
        group.bench_function(format!("box_{side}"), |b| {
            b.iter(|| {
                iter.reset();
                black_box(iter.by_ref().count());
            });
        });
    }
    group.finish();
}

fn bench_complex_region(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_iter_complex");
    let (layout, top, metal) = bank(256, 64);
    let holes: Vec<_> = (0..8)
        .map(|k| {
            let x = 40.0 + f64::from(k) * 60.0;
            Polygon::from_rect(Rect::new(x, 200.0, x + 30.0, 1800.0))
        })
        .collect();
    let window = Rect::new(0.0, 0.0, 520.0, 2048.0);
    let mut iter = RecursiveShapeIter::new(&layout, top, metal);
    iter.set_region_excluding(window, &holes).unwrap();
    group.bench_function("window_minus_stripes", |b| {
        b.iter(|| {
            iter.reset();
            black_box(iter.by_ref().count());
        });
    });
    group.bench_function("rebuild_region", |b| {
        b.iter(|| {
            iter.set_region_excluding(window, &holes).unwrap();
            black_box(iter.at_end());
        });
    });
    group.finish();
}

fn bench_full_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_iter_full");
    let (layout, top, metal) = bank(64, 64);
    let mut iter = RecursiveShapeIter::new(&layout, top, metal);
    group.throughput(Throughput::Elements(iter.by_ref().count() as u64));
    group.bench_function("all_shapes", |b| {
        b.iter(|| {
            iter.reset();
            black_box(iter.by_ref().count());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_windows, bench_complex_region, bench_full_walk);
criterion_main!(benches);
