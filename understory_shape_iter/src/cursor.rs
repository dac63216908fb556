// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traversal cursors built from an [`IterConfig`].
//!
//! [`build_cursor`] turns a configuration and a [`Source`] into a [`Cursor`]
//! positioned at the first matching shape. A flat source walks one shape
//! container; a hierarchy source walks a cell and everything placed in it,
//! depth first, with an explicit stack of levels.

use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use kurbo::{Affine, Rect};
use understory_index::{QuadId, Query};
use understory_layout::util::{rect_to_aabb, transform_rect_bbox};
use understory_layout::{
    ArrayIter, ArrayMember, CellId, InstCursor, InstId, Instance, LayerId, Layout, PropertyFilter,
    Shape, ShapeCursor, ShapeId, Shapes,
};

use crate::config::IterConfig;
use crate::region::{BoxRegion, Overlap, TileIndex, reduce};

/// The data an iteration walks. The data must be built before iterating.
#[derive(Copy, Clone, Debug)]
pub enum Source<'a> {
    /// A single shape container.
    Flat(&'a Shapes),
    /// A cell of a layout and everything placed in it.
    Hierarchy {
        /// The layout.
        layout: &'a Layout,
        /// The iteration root.
        top: CellId,
    },
}

/// One placement on the way from the iteration root to the current cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InstElement {
    /// Cell holding the placement.
    pub parent: CellId,
    /// The placement's id in `parent`.
    pub inst: InstId,
    /// The placement.
    pub instance: Instance,
    /// Array member that was entered, `(0, 0)` for single placements.
    pub member: (u32, u32),
}

impl InstElement {
    /// Transform of the entered member, from child to parent coordinates.
    pub fn trans(&self) -> Affine {
        self.instance.member_trans(self.member.0, self.member.1)
    }
}

/// The protocol shared by the flat and hierarchical cursors.
///
/// Accessors describe the current shape and panic once [`Traversal::at_end`]
/// returns true.
pub trait Traversal<'a> {
    /// True when every matching shape has been visited.
    fn at_end(&self) -> bool;

    /// Move to the next matching shape.
    fn advance(&mut self);

    /// The current shape, in the coordinates of its cell.
    fn shape(&self) -> (ShapeId, &'a Shape);

    /// Transform from the current shape's cell into reported coordinates.
    fn trans(&self) -> Affine;

    /// Cell owning the current shape; `None` for flat sources.
    fn cell(&self) -> Option<CellId>;

    /// Layer of the current shape; `None` for flat sources.
    fn layer(&self) -> Option<LayerId>;

    /// Nesting depth of the current shape's cell; the root is at depth 0.
    fn depth(&self) -> usize;

    /// Placements from the root down to the current cell.
    fn path(&self) -> Vec<InstElement>;

    /// Abandon the rest of the current cell, including everything placed in it,
    /// and continue with the parent level.
    fn skip_instance(&mut self);
}

/// Build a cursor positioned at the first shape matching `config`.
///
/// Panics if the source has unbuilt edits.
pub fn build_cursor<'a>(config: &IterConfig, source: Source<'a>) -> Cursor<'a> {
    match source {
        Source::Flat(shapes) => {
            log::debug!("building flat shape cursor over {} shapes", shapes.len());
            Cursor::Flat(FlatCursor::new(shapes, config))
        }
        Source::Hierarchy { layout, top } => {
            log::debug!(
                "building hierarchical shape cursor from cell {} over {} layers",
                top.index(),
                config.layers.len()
            );
            Cursor::Hier(HierCursor::new(layout, top, config))
        }
    }
}

/// A cursor over a flat or hierarchical source.
#[derive(Debug)]
pub enum Cursor<'a> {
    /// Walks one shape container.
    Flat(FlatCursor<'a>),
    /// Walks a cell hierarchy.
    Hier(HierCursor<'a>),
}

impl<'a> Traversal<'a> for Cursor<'a> {
    fn at_end(&self) -> bool {
        match self {
            Self::Flat(c) => c.at_end(),
            Self::Hier(c) => c.at_end(),
        }
    }

    fn advance(&mut self) {
        match self {
            Self::Flat(c) => c.advance(),
            Self::Hier(c) => c.advance(),
        }
    }

    fn shape(&self) -> (ShapeId, &'a Shape) {
        match self {
            Self::Flat(c) => c.shape(),
            Self::Hier(c) => c.shape(),
        }
    }

    fn trans(&self) -> Affine {
        match self {
            Self::Flat(c) => c.trans(),
            Self::Hier(c) => c.trans(),
        }
    }

    fn cell(&self) -> Option<CellId> {
        match self {
            Self::Flat(c) => c.cell(),
            Self::Hier(c) => c.cell(),
        }
    }

    fn layer(&self) -> Option<LayerId> {
        match self {
            Self::Flat(c) => c.layer(),
            Self::Hier(c) => c.layer(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Flat(c) => c.depth(),
            Self::Hier(c) => c.depth(),
        }
    }

    fn path(&self) -> Vec<InstElement> {
        match self {
            Self::Flat(c) => c.path(),
            Self::Hier(c) => c.path(),
        }
    }

    fn skip_instance(&mut self) {
        match self {
            Self::Flat(c) => c.skip_instance(),
            Self::Hier(c) => c.skip_instance(),
        }
    }
}

/// True for transforms mapping axis-aligned boxes exactly onto axis-aligned boxes.
fn is_manhattan(t: Affine) -> bool {
    let [a, b, c, d, _, _] = t.as_coeffs();
    (b == 0.0 && c == 0.0) || (a == 0.0 && d == 0.0)
}

/// Per-shape acceptance shared by both cursors.
#[derive(Clone, Debug)]
struct ShapeTest {
    overlap: Overlap,
    /// Applied here, after the quad tests. Container cursors borrow from the
    /// layout and cannot hold a filter owned by the iterator's configuration.
    properties: Option<PropertyFilter>,
    root_query: Query<f64>,
    root_tiles: Option<Arc<TileIndex>>,
}

impl ShapeTest {
    fn new(config: &IterConfig, root_query: Query<f64>) -> Self {
        Self {
            overlap: config.overlap,
            properties: config.properties.clone(),
            root_query,
            root_tiles: config.complex.as_ref().map(|c| c.shared()),
        }
    }

    /// Test against the configured regions in reported coordinates.
    fn in_root_region(&self, b: Rect) -> bool {
        self.root_query.admits(&rect_to_aabb(b))
            && self
                .root_tiles
                .as_ref()
                .is_none_or(|t| !t.is_outside(b, self.overlap))
    }

    /// Move `sc` to the first shape that is not provably outside the region.
    ///
    /// Whole quads are skipped when they miss every tile of the level.
    fn seek(
        &self,
        sc: &mut ShapeCursor<'_>,
        tiles: Option<&TileIndex>,
        passed: &mut Option<QuadId>,
        full: Affine,
    ) -> bool {
        let exact = is_manhattan(full);
        while let Some((_, shape, bbox)) = sc.current() {
            if let Some(t) = tiles {
                let quad = sc.quad_id();
                if quad != *passed {
                    if sc.quad_box().is_some_and(|q| t.is_outside(q, self.overlap)) {
                        sc.skip_quad();
                        continue;
                    }
                    *passed = quad;
                }
                if t.is_outside(bbox, self.overlap) {
                    sc.advance();
                    continue;
                }
            }
            if self
                .properties
                .as_ref()
                .is_some_and(|f| !f.matches(shape.properties))
            {
                sc.advance();
                continue;
            }
            // Local regions are conservative under rotation; recheck in reported coordinates.
            if !exact && !self.in_root_region(transform_rect_bbox(full, bbox)) {
                sc.advance();
                continue;
            }
            return true;
        }
        false
    }
}

/// Cursor over a single shape container.
#[derive(Debug)]
pub struct FlatCursor<'a> {
    shapes: Option<ShapeCursor<'a>>,
    tiles: Option<Arc<TileIndex>>,
    passed: Option<QuadId>,
    test: Option<ShapeTest>,
    global: Affine,
}

impl<'a> FlatCursor<'a> {
    fn new(shapes: &'a Shapes, config: &IterConfig) -> Self {
        assert!(
            shapes.is_built(),
            "shapes iterated with pending edits; call ensure_built() first"
        );
        let mut cursor = Self {
            shapes: None,
            tiles: None,
            passed: None,
            test: None,
            global: config.global_trans,
        };
        let Some(root_query) = config.root_query() else {
            return cursor;
        };
        if config.min_depth > 0 {
            return cursor;
        }
        let (region, tiles) = reduce(
            config.region,
            config.complex.as_ref().map(|c| c.tiles()),
            config.global_trans,
            shapes.bbox(),
        );
        if let Some(q) = region.query(config.overlap) {
            cursor.shapes = Some(shapes.begin(q, config.shape_types, None));
        }
        cursor.tiles = tiles;
        cursor.test = Some(ShapeTest::new(config, root_query));
        cursor.settle();
        cursor
    }

    fn settle(&mut self) {
        let found = match (self.shapes.as_mut(), self.test.as_ref()) {
            (Some(sc), Some(test)) => {
                test.seek(sc, self.tiles.as_deref(), &mut self.passed, self.global)
            }
            _ => false,
        };
        if !found {
            self.shapes = None;
        }
    }

    fn current(&self) -> (ShapeId, &'a Shape) {
        let (id, shape, _) = self
            .shapes
            .as_ref()
            .and_then(ShapeCursor::current)
            .expect("shape cursor read at end");
        (id, shape)
    }
}

impl<'a> Traversal<'a> for FlatCursor<'a> {
    fn at_end(&self) -> bool {
        self.shapes.is_none()
    }

    fn advance(&mut self) {
        if let Some(sc) = self.shapes.as_mut() {
            sc.advance();
            self.settle();
        }
    }

    fn shape(&self) -> (ShapeId, &'a Shape) {
        self.current()
    }

    fn trans(&self) -> Affine {
        assert!(!self.at_end(), "shape cursor read at end");
        self.global
    }

    fn cell(&self) -> Option<CellId> {
        assert!(!self.at_end(), "shape cursor read at end");
        None
    }

    fn layer(&self) -> Option<LayerId> {
        assert!(!self.at_end(), "shape cursor read at end");
        None
    }

    fn depth(&self) -> usize {
        assert!(!self.at_end(), "shape cursor read at end");
        0
    }

    fn path(&self) -> Vec<InstElement> {
        Vec::new()
    }

    fn skip_instance(&mut self) {
        self.shapes = None;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Shapes,
    Instances,
    Done,
}

#[derive(Debug)]
struct ArrayState<'a> {
    id: InstId,
    inst: &'a Instance,
    members: ArrayIter,
    child_box: Rect,
}

/// State of one hierarchy level: the cell being visited and where to resume.
#[derive(Debug)]
struct Level<'a> {
    cell: CellId,
    active: bool,
    // Cell coordinates to root cell coordinates (global transform excluded).
    trans: Affine,
    region: BoxRegion,
    tiles: Option<Arc<TileIndex>>,
    phase: Phase,
    layer_pos: usize,
    shapes: Option<ShapeCursor<'a>>,
    shape_quad: Option<QuadId>,
    insts: Option<InstCursor<'a>>,
    inst_quad: Option<QuadId>,
    array: Option<ArrayState<'a>>,
    via: Option<InstElement>,
}

struct Descent<'a> {
    id: InstId,
    inst: &'a Instance,
    member: ArrayMember,
    child_box: Rect,
}

/// Depth-first cursor over a cell hierarchy.
///
/// Levels live on an explicit stack, so deep hierarchies do not recurse. Each
/// level keeps its region in its own coordinates, derived from the parent level
/// when it is entered.
#[derive(Debug)]
pub struct HierCursor<'a> {
    layout: &'a Layout,
    config: IterConfig,
    test: Option<ShapeTest>,
    stack: Vec<Level<'a>>,
    // Bounding box over the selected layers; `None` marks an empty cell.
    cell_boxes: HashMap<CellId, Option<Rect>>,
}

impl<'a> HierCursor<'a> {
    fn new(layout: &'a Layout, top: CellId, config: &IterConfig) -> Self {
        assert!(
            layout.is_built(),
            "layout iterated with pending edits; call Layout::ensure_built() first"
        );
        let mut cursor = Self {
            layout,
            config: config.clone(),
            test: None,
            stack: Vec::new(),
            cell_boxes: HashMap::new(),
        };
        let Some(root_query) = config.root_query() else {
            return cursor;
        };
        cursor.test = Some(ShapeTest::new(config, root_query));
        let root_box = cursor.cell_box(top);
        let (region, tiles) = reduce(
            config.region,
            config.complex.as_ref().map(|c| c.tiles()),
            config.global_trans,
            root_box,
        );
        let active = config.selection.activation(top, true);
        cursor.push(top, active, Affine::IDENTITY, region, tiles, None);
        cursor.settle();
        cursor
    }

    fn cell_box(&mut self, cell: CellId) -> Option<Rect> {
        let (layout, layers) = (self.layout, &self.config.layers);
        *self
            .cell_boxes
            .entry(cell)
            .or_insert_with(|| layout.cell(cell).bbox_over(layers))
    }

    fn push(
        &mut self,
        cell: CellId,
        active: bool,
        trans: Affine,
        region: BoxRegion,
        tiles: Option<Arc<TileIndex>>,
        via: Option<InstElement>,
    ) {
        let depth = self.stack.len();
        let emits = active
            && depth >= self.config.min_depth
            && region != BoxRegion::Empty
            && !self.config.layers.is_empty();
        self.stack.push(Level {
            cell,
            active,
            trans,
            region,
            tiles,
            phase: if emits { Phase::Shapes } else { Phase::Instances },
            layer_pos: 0,
            shapes: None,
            shape_quad: None,
            insts: None,
            inst_quad: None,
            array: None,
            via,
        });
    }

    /// Run the state machine until a shape is current or the stack is empty.
    fn settle(&mut self) {
        while let Some(phase) = self.stack.last().map(|l| l.phase) {
            match phase {
                Phase::Shapes => {
                    if self.step_shapes() {
                        return;
                    }
                }
                Phase::Instances => {
                    if let Some(d) = self.step_instances() {
                        self.descend(d);
                    }
                }
                Phase::Done => self.ascend(),
            }
        }
    }

    /// Look for a shape at the current level; false moves the level on to its instances.
    fn step_shapes(&mut self) -> bool {
        let layout = self.layout;
        let Some(test) = self.test.as_ref() else {
            return false;
        };
        let Some(level) = self.stack.last_mut() else {
            return false;
        };
        let full = self.config.global_trans * level.trans;
        loop {
            if let Some(sc) = level.shapes.as_mut() {
                if test.seek(sc, level.tiles.as_deref(), &mut level.shape_quad, full) {
                    return true;
                }
                level.shapes = None;
                level.layer_pos += 1;
            }
            let (Some(&layer), Some(query)) = (
                self.config.layers.get(level.layer_pos),
                level.region.query(self.config.overlap),
            ) else {
                level.phase = Phase::Instances;
                return false;
            };
            match layout.cell(level.cell).shapes(layer) {
                Some(shapes) if !shapes.is_empty() => {
                    level.shapes = Some(shapes.begin(query, self.config.shape_types, None));
                    level.shape_quad = None;
                }
                _ => level.layer_pos += 1,
            }
        }
    }

    /// Find the next array member to descend into; `None` when the level is done
    /// or when it only needed to move on.
    fn step_instances(&mut self) -> Option<Descent<'a>> {
        let layout = self.layout;
        let depth = self.stack.len().checked_sub(1)?;
        let overlap = self.config.overlap;
        let level = self.stack.last_mut()?;
        let Some(query) = level.region.query(overlap) else {
            level.phase = Phase::Done;
            return None;
        };
        if depth >= self.config.max_depth {
            level.phase = Phase::Done;
            return None;
        }
        let cell = level.cell;
        let insts = level
            .insts
            .get_or_insert_with(|| layout.cell(cell).instances().begin(query));
        let tiles = level.tiles.as_deref();

        loop {
            if let Some(array) = level.array.as_mut() {
                while let Some(member) = array.members.current() {
                    if let Some(t) = tiles {
                        let placed = transform_rect_bbox(member.trans, array.child_box);
                        if t.is_outside(placed, overlap) {
                            array.members.advance();
                            continue;
                        }
                    }
                    return Some(Descent {
                        id: array.id,
                        inst: array.inst,
                        member,
                        child_box: array.child_box,
                    });
                }
                level.array = None;
                insts.advance();
            }

            let Some((id, inst, abox)) = insts.current() else {
                level.phase = Phase::Done;
                return None;
            };
            if let Some(t) = tiles {
                let quad = insts.quad_id();
                if quad != level.inst_quad {
                    if insts.quad_box().is_some_and(|q| t.is_outside(q, overlap)) {
                        insts.skip_quad();
                        continue;
                    }
                    level.inst_quad = quad;
                }
                if t.is_outside(abox, overlap) {
                    insts.advance();
                    continue;
                }
            }
            let layers = &self.config.layers;
            let child_box = *self
                .cell_boxes
                .entry(inst.cell)
                .or_insert_with(|| layout.cell(inst.cell).bbox_over(layers));
            let Some(child_box) = child_box else {
                // Nothing on the selected layers below this placement.
                insts.advance();
                continue;
            };
            level.array = Some(ArrayState {
                id,
                inst,
                members: inst.members(child_box, query),
                child_box,
            });
        }
    }

    fn descend(&mut self, d: Descent<'a>) {
        let Some(parent) = self.stack.last() else {
            return;
        };
        let trans = parent.trans * d.member.trans;
        let (region, tiles) = reduce(
            parent.region,
            parent.tiles.as_deref(),
            d.member.trans,
            Some(d.child_box),
        );
        let active = self.config.selection.activation(d.inst.cell, parent.active);
        let via = InstElement {
            parent: parent.cell,
            inst: d.id,
            instance: *d.inst,
            member: d.member.index,
        };
        log::trace!(
            "descend into cell {} at depth {}",
            d.inst.cell.index(),
            self.stack.len()
        );
        self.push(d.inst.cell, active, trans, region, tiles, Some(via));
    }

    fn ascend(&mut self) {
        if let Some(level) = self.stack.pop() {
            log::trace!(
                "leave cell {} at depth {}",
                level.cell.index(),
                self.stack.len()
            );
        }
        if let Some(parent) = self.stack.last_mut() {
            if let Some(array) = parent.array.as_mut() {
                array.members.advance();
            }
        }
    }

    fn top(&self) -> &Level<'a> {
        self.stack.last().expect("shape cursor read at end")
    }
}

impl<'a> Traversal<'a> for HierCursor<'a> {
    fn at_end(&self) -> bool {
        self.stack.is_empty()
    }

    fn advance(&mut self) {
        if let Some(sc) = self.stack.last_mut().and_then(|l| l.shapes.as_mut()) {
            sc.advance();
            self.settle();
        }
    }

    fn shape(&self) -> (ShapeId, &'a Shape) {
        let (id, shape, _) = self
            .top()
            .shapes
            .as_ref()
            .and_then(ShapeCursor::current)
            .expect("shape cursor read at end");
        (id, shape)
    }

    fn trans(&self) -> Affine {
        self.config.global_trans * self.top().trans
    }

    fn cell(&self) -> Option<CellId> {
        Some(self.top().cell)
    }

    fn layer(&self) -> Option<LayerId> {
        Some(self.config.layers[self.top().layer_pos])
    }

    fn depth(&self) -> usize {
        assert!(!self.at_end(), "shape cursor read at end");
        self.stack.len() - 1
    }

    fn path(&self) -> Vec<InstElement> {
        self.stack.iter().filter_map(|l| l.via).collect()
    }

    fn skip_instance(&mut self) {
        if let Some(level) = self.stack.last_mut() {
            level.shapes = None;
            level.array = None;
            level.phase = Phase::Done;
            self.settle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_layout::LayerInfo;

    #[test]
    fn empty_cells_are_never_entered() {
        let mut layout = Layout::new();
        let l1 = layout.add_layer(LayerInfo::new(1, 0));
        let l2 = layout.add_layer(LayerInfo::new(2, 0));
        let top = layout.add_cell("TOP").unwrap();
        let only_l2 = layout.add_cell("ONLY_L2").unwrap();
        layout
            .cell_mut(top)
            .insert_shape(l1, Shape::rect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        layout
            .cell_mut(only_l2)
            .insert_shape(l2, Shape::rect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        for k in 0..3 {
            layout.cell_mut(top).insert_instance(Instance::new(
                only_l2,
                Affine::translate((f64::from(k) * 10.0, 0.0)),
            ));
        }
        layout.ensure_built().unwrap();

        let config = IterConfig::new([l1]);
        let source = Source::Hierarchy {
            layout: &layout,
            top,
        };
        let Cursor::Hier(mut c) = build_cursor(&config, source) else {
            panic!("hierarchy sources build hierarchical cursors");
        };
        let mut depths = Vec::new();
        while !c.at_end() {
            depths.push(c.depth());
            c.advance();
        }
        assert_eq!(depths, [0]);
        // The placed cell was looked up once and found empty on layer 1.
        assert_eq!(c.cell_boxes.get(&only_l2), Some(&None));
    }

    #[test]
    fn manhattan_detection() {
        assert!(is_manhattan(Affine::translate((3.0, 4.0)) * Affine::scale(2.0)));
        assert!(!is_manhattan(Affine::rotate(0.3)));
        assert!(is_manhattan(Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0])));
    }
}
