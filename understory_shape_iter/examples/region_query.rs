// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Walk an arrayed hierarchy inside a window with a hole, printing every hit and its path.

use kurbo::{Affine, Rect};
use understory_layout::util::transform_rect_bbox;
use understory_layout::{Instance, LayerInfo, Layout, Polygon, Repetition, Shape};
use understory_shape_iter::RecursiveShapeIter;

fn main() {
    let mut layout = Layout::new();
    let metal = layout.add_layer(LayerInfo::new(1, 0).with_name("metal1"));
    let top = layout.add_cell("TOP").unwrap();
    let row = layout.add_cell("ROW").unwrap();
    let bit = layout.add_cell("BIT").unwrap();

    layout
        .cell_mut(bit)
        .insert_shape(metal, Shape::rect(Rect::new(0.0, 0.0, 4.0, 2.0)));
    layout.cell_mut(row).insert_instance(Instance::array(
        bit,
        Affine::IDENTITY,
        Repetition::grid(10.0, 0.0, 16, 1),
    ));
    layout.cell_mut(top).insert_instance(Instance::array(
        row,
        Affine::translate((0.0, 5.0)),
        Repetition::grid(0.0, 10.0, 1, 8),
    ));
    layout.ensure_built().unwrap();

    let mut iter = RecursiveShapeIter::new(&layout, top, metal);
    let hole = Polygon::from_rect(Rect::new(40.0, 20.0, 80.0, 50.0));
    iter.set_region_excluding(Rect::new(20.0, 0.0, 100.0, 60.0), &[hole])
        .unwrap();
    println!("visiting at most {:?}", iter.region_bbox());

    while !iter.at_end() {
        let (_, shape) = iter.shape();
        let placed = shape.bbox().map(|b| transform_rect_bbox(iter.trans(), b));
        let path: Vec<_> = iter.path().iter().map(|e| e.member).collect();
        println!(
            "{} depth {} at {:?} via {:?}",
            layout.cell(iter.cell().unwrap()).name(),
            iter.depth(),
            placed,
            path
        );
        iter.advance();
    }
}
