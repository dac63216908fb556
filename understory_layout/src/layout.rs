// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout: layer table, cell table, and the bulk build step.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashMap;
use kurbo::Rect;

use crate::cell::Cell;
use crate::error::LayoutError;
use crate::types::{CellId, LayerId, LayerInfo};
use crate::util::union_opt;

/// A hierarchical layout database.
///
/// Cells are edited through [`Layout::cell_mut`], which marks the layout unbuilt.
/// [`Layout::ensure_built`] validates the hierarchy, computes per-layer cell
/// bounding boxes bottom-up and builds every spatial index. Readers (such as
/// shape iterators) require a built layout; building is a mutation, so it must
/// happen before the layout is shared across threads.
#[derive(Debug)]
pub struct Layout {
    layers: Vec<LayerInfo>,
    cells: Vec<Cell>,
    names: HashMap<String, CellId>,
    built: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            cells: Vec::new(),
            names: HashMap::new(),
            // An empty layout is trivially built.
            built: true,
        }
    }

    /// Register a layer. Registering the same layer/datatype pair again returns
    /// the existing id.
    pub fn add_layer(&mut self, info: LayerInfo) -> LayerId {
        if let Some(id) = self.find_layer(info.layer, info.datatype) {
            return id;
        }
        self.layers.push(info);
        self.built = false;
        LayerId::new(self.layers.len() - 1)
    }

    /// Look up a layer by layer/datatype pair.
    pub fn find_layer(&self, layer: i16, datatype: i16) -> Option<LayerId> {
        self.layers
            .iter()
            .position(|l| l.layer == layer && l.datatype == datatype)
            .map(LayerId::new)
    }

    /// Description of a layer.
    pub fn layer_info(&self, id: LayerId) -> Option<&LayerInfo> {
        self.layers.get(id.index())
    }

    /// All registered layers in registration order.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..self.layers.len()).map(LayerId::new)
    }

    /// Add an empty cell.
    pub fn add_cell(&mut self, name: impl Into<String>) -> Result<CellId, LayoutError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(LayoutError::DuplicateCellName(name));
        }
        let id = CellId::new(self.cells.len());
        self.names.insert(name.clone(), id);
        self.cells.push(Cell::new(name));
        self.built = false;
        Ok(id)
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Access a cell.
    ///
    /// Panics if `id` does not belong to this layout.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// Mutable access to a cell. Marks the layout unbuilt.
    ///
    /// Panics if `id` does not belong to this layout.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        self.built = false;
        &mut self.cells[id.index()]
    }

    /// Look up a cell by name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.names.get(name).copied()
    }

    /// All cell ids in creation order.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cells.len()).map(CellId::new)
    }

    /// Cells not placed by any other cell.
    pub fn top_cells(&self) -> Vec<CellId> {
        let mut placed = vec![false; self.cells.len()];
        for cell in &self.cells {
            for target in cell.instances().targets() {
                if let Some(p) = placed.get_mut(target.index()) {
                    *p = true;
                }
            }
        }
        self.cell_ids().filter(|c| !placed[c.index()]).collect()
    }

    /// Whether every edit has been folded into boxes and indexes.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Validate the hierarchy, compute cell bounding boxes, and build all indexes.
    pub fn ensure_built(&mut self) -> Result<(), LayoutError> {
        if self.built {
            return Ok(());
        }
        let order = self.bottom_up_order()?;
        let n_layers = self.layers.len();
        for &c in &order {
            let cell = &self.cells[c.index()];
            let mut bboxes: Vec<Option<Rect>> = (0..n_layers)
                .map(|l| cell.shapes(LayerId::new(l)).and_then(|s| s.bbox()))
                .collect();
            for (_, inst) in cell.instances().iter() {
                let child = &self.cells[inst.cell.index()];
                for (l, bb) in bboxes.iter_mut().enumerate() {
                    if let Some(cb) = child.bbox_on(LayerId::new(l)) {
                        *bb = union_opt(*bb, Some(inst.array_bbox(cb)));
                    }
                }
            }
            let total = bboxes.iter().fold(None, |acc, b| union_opt(acc, *b));
            let cell = &mut self.cells[c.index()];
            cell.bboxes = bboxes;
            cell.bbox = total;
            for shapes in cell.shapes_mut() {
                shapes.ensure_built();
            }
        }
        let boxes: Vec<Option<Rect>> = self.cells.iter().map(Cell::bbox).collect();
        for cell in &mut self.cells {
            cell.instances_mut().rebuild(|c| boxes[c.index()]);
        }
        self.built = true;
        log::debug!(
            "layout built: {} cells, {} layers",
            self.cells.len(),
            n_layers
        );
        Ok(())
    }

    /// Cells ordered so that every cell comes after all cells it places.
    fn bottom_up_order(&self) -> Result<Vec<CellId>, LayoutError> {
        #[derive(Copy, Clone, PartialEq, Eq)]
        enum Mark {
            New,
            Open,
            Done,
        }

        let n = self.cells.len();
        for (i, cell) in self.cells.iter().enumerate() {
            if let Some(target) = cell.instances().targets().find(|t| t.index() >= n) {
                return Err(LayoutError::UnknownCell {
                    parent: CellId::new(i),
                    target,
                });
            }
        }

        let mut marks = vec![Mark::New; n];
        let mut order = Vec::with_capacity(n);
        let mut stack: Vec<(usize, Vec<CellId>, usize)> = Vec::new();
        for root in 0..n {
            if marks[root] != Mark::New {
                continue;
            }
            marks[root] = Mark::Open;
            stack.push((root, self.cells[root].child_cells(), 0));
            loop {
                let Some(top) = stack.last_mut() else { break };
                let cell = top.0;
                let next = top.1.get(top.2).copied();
                top.2 += 1;
                match next {
                    Some(child) => match marks[child.index()] {
                        Mark::New => {
                            marks[child.index()] = Mark::Open;
                            let grandchildren = self.cells[child.index()].child_cells();
                            stack.push((child.index(), grandchildren, 0));
                        }
                        Mark::Open => return Err(LayoutError::Recursive { cell: child }),
                        Mark::Done => {}
                    },
                    None => {
                        marks[cell] = Mark::Done;
                        order.push(CellId::new(cell));
                        stack.pop();
                    }
                }
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Instance, Repetition};
    use crate::shape::Shape;
    use kurbo::Affine;

    #[test]
    fn boxes_include_placed_cells_per_layer() {
        let mut layout = Layout::new();
        let l1 = layout.add_layer(LayerInfo::new(1, 0));
        let l2 = layout.add_layer(LayerInfo::new(2, 0));
        let top = layout.add_cell("TOP").unwrap();
        let leaf = layout.add_cell("LEAF").unwrap();
        layout
            .cell_mut(leaf)
            .insert_shape(l2, Shape::rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
        layout
            .cell_mut(top)
            .insert_shape(l1, Shape::rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        layout.cell_mut(top).insert_instance(Instance::array(
            leaf,
            Affine::translate((100.0, 0.0)),
            Repetition::grid(10.0, 10.0, 2, 1),
        ));
        layout.ensure_built().unwrap();

        let cell = layout.cell(top);
        assert_eq!(cell.bbox_on(l1), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(cell.bbox_on(l2), Some(Rect::new(100.0, 0.0, 115.0, 5.0)));
        assert_eq!(cell.bbox(), Some(Rect::new(0.0, 0.0, 115.0, 10.0)));
        assert_eq!(layout.top_cells(), [top]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut layout = Layout::new();
        layout.add_cell("A").unwrap();
        assert_eq!(
            layout.add_cell("A"),
            Err(LayoutError::DuplicateCellName("A".into()))
        );
        assert_eq!(layout.cell_by_name("A"), Some(CellId::new(0)));
    }

    #[test]
    fn recursion_is_detected() {
        let mut layout = Layout::new();
        let a = layout.add_cell("A").unwrap();
        let b = layout.add_cell("B").unwrap();
        layout
            .cell_mut(a)
            .insert_instance(Instance::new(b, Affine::IDENTITY));
        layout
            .cell_mut(b)
            .insert_instance(Instance::new(a, Affine::IDENTITY));
        assert!(matches!(
            layout.ensure_built(),
            Err(LayoutError::Recursive { .. })
        ));
        assert!(!layout.is_built());
    }

    #[test]
    fn unknown_targets_are_reported() {
        let mut layout = Layout::new();
        let a = layout.add_cell("A").unwrap();
        layout
            .cell_mut(a)
            .insert_instance(Instance::new(CellId::new(7), Affine::IDENTITY));
        assert_eq!(
            layout.ensure_built(),
            Err(LayoutError::UnknownCell {
                parent: a,
                target: CellId::new(7)
            })
        );
    }

    #[test]
    fn adding_a_known_layer_returns_its_id() {
        let mut layout = Layout::new();
        let l = layout.add_layer(LayerInfo::new(3, 1));
        assert_eq!(layout.add_layer(LayerInfo::new(3, 1)), l);
        assert_eq!(layout.find_layer(3, 1), Some(l));
        assert_eq!(layout.layers().count(), 1);
    }
}
