// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cells: per-layer shapes plus placements of other cells.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::Rect;

use crate::instance::Instance;
use crate::instances::{InstId, Instances};
use crate::shape::Shape;
use crate::shapes::{ShapeId, Shapes};
use crate::types::{CellId, LayerId};
use crate::util::union_opt;

/// A cell of a [`Layout`](crate::Layout).
///
/// Bounding boxes include the geometry of placed cells and are only valid after
/// [`Layout::ensure_built`](crate::Layout::ensure_built).
#[derive(Debug)]
pub struct Cell {
    name: String,
    shapes: Vec<Shapes>,
    instances: Instances,
    pub(crate) bboxes: Vec<Option<Rect>>,
    pub(crate) bbox: Option<Rect>,
}

impl Cell {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            shapes: Vec::new(),
            instances: Instances::new(),
            bboxes: Vec::new(),
            bbox: None,
        }
    }

    /// Cell name, unique within its layout.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bounding box on one layer, including placed cells. `None` when empty.
    pub fn bbox_on(&self, layer: LayerId) -> Option<Rect> {
        self.bboxes.get(layer.index()).copied().flatten()
    }

    /// Bounding box over every layer.
    pub fn bbox(&self) -> Option<Rect> {
        self.bbox
    }

    /// Bounding box over a set of layers.
    pub fn bbox_over(&self, layers: &[LayerId]) -> Option<Rect> {
        layers
            .iter()
            .fold(None, |acc, l| union_opt(acc, self.bbox_on(*l)))
    }

    /// Insert a shape on `layer`. Returns `None` for shapes without a bounding box.
    pub fn insert_shape(&mut self, layer: LayerId, shape: Shape) -> Option<ShapeId> {
        if self.shapes.len() <= layer.index() {
            self.shapes.resize_with(layer.index() + 1, Shapes::new);
        }
        self.shapes[layer.index()].insert(shape)
    }

    /// Remove a shape from `layer`.
    pub fn remove_shape(&mut self, layer: LayerId, id: ShapeId) -> Option<Shape> {
        self.shapes.get_mut(layer.index())?.remove(id)
    }

    /// Shapes on `layer`; `None` if the cell never had any there.
    pub fn shapes(&self, layer: LayerId) -> Option<&Shapes> {
        self.shapes.get(layer.index())
    }

    /// Layers this cell holds shapes on.
    pub fn shape_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .map(|(i, _)| LayerId::new(i))
    }

    /// Placed cells.
    pub fn instances(&self) -> &Instances {
        &self.instances
    }

    /// Place a cell.
    pub fn insert_instance(&mut self, inst: Instance) -> InstId {
        self.instances.insert(inst)
    }

    /// Remove a placement.
    pub fn remove_instance(&mut self, id: InstId) -> Option<Instance> {
        self.instances.remove(id)
    }

    /// Directly placed cells, without duplicates, in first-placement order.
    pub fn child_cells(&self) -> Vec<CellId> {
        let mut out: Vec<CellId> = Vec::new();
        for c in self.instances.targets() {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    pub(crate) fn shapes_mut(&mut self) -> &mut [Shapes] {
        &mut self.shapes
    }

    pub(crate) fn instances_mut(&mut self) -> &mut Instances {
        &mut self.instances
    }
}
