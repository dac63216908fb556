// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The lazy recursive shape iterator.

use alloc::vec::Vec;
use kurbo::{Affine, Rect};
use understory_layout::util::{intersect_rect, transform_rect_bbox};
use understory_layout::{
    CellId, LayerId, Layout, Polygon, PropertyFilter, Shape, ShapeId, ShapeTypes, Shapes,
};

use crate::boolean::BooleanError;
use crate::config::IterConfig;
use crate::cursor::{Cursor, InstElement, Source, Traversal, build_cursor};
use crate::region::{BoxRegion, ComplexRegion, ComplexRegionBuilder, Overlap};

/// One shape yielded by [`RecursiveShapeIter`].
#[derive(Copy, Clone, Debug)]
pub struct ShapeHit<'a> {
    /// Shape id inside its container.
    pub id: ShapeId,
    /// The shape, in the coordinates of its cell.
    pub shape: &'a Shape,
    /// Owning cell; `None` for flat iteration.
    pub cell: Option<CellId>,
    /// Layer; `None` for flat iteration.
    pub layer: Option<LayerId>,
    /// Transform from the cell into reported coordinates.
    pub trans: Affine,
    /// Nesting depth of the owning cell.
    pub depth: usize,
}

impl ShapeHit<'_> {
    /// Bounding box of the shape in reported coordinates.
    pub fn bbox(&self) -> Option<Rect> {
        self.shape.bbox().map(|b| transform_rect_bbox(self.trans, b))
    }
}

/// Walks the shapes of a cell and of everything placed in it, clipped to a region.
///
/// The iterator borrows the data it walks. Setters only change the
/// configuration and drop the current cursor; the cursor is rebuilt from the
/// configuration by the next reading call. Reading calls take `&mut self` for
/// that reason.
///
/// ```
/// use kurbo::{Affine, Rect};
/// use understory_layout::{Instance, LayerInfo, Layout, Shape};
/// use understory_shape_iter::RecursiveShapeIter;
///
/// let mut layout = Layout::new();
/// let metal = layout.add_layer(LayerInfo::new(1, 0));
/// let top = layout.add_cell("TOP").unwrap();
/// let via = layout.add_cell("VIA").unwrap();
/// layout.cell_mut(via).insert_shape(metal, Shape::rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
/// for k in 0..4 {
///     let at = Affine::translate((f64::from(k) * 20.0, 0.0));
///     layout.cell_mut(top).insert_instance(Instance::new(via, at));
/// }
/// layout.ensure_built().unwrap();
///
/// let mut iter = RecursiveShapeIter::new(&layout, top, metal);
/// iter.set_region(Rect::new(18.0, 0.0, 42.0, 5.0));
/// let mut xs: Vec<f64> = iter.map(|hit| hit.bbox().unwrap().x0).collect();
/// xs.sort_by(f64::total_cmp);
/// assert_eq!(xs, [20.0, 40.0]);
/// ```
#[derive(Debug)]
pub struct RecursiveShapeIter<'a> {
    source: Source<'a>,
    config: IterConfig,
    cursor: Option<Cursor<'a>>,
}

impl<'a> RecursiveShapeIter<'a> {
    /// Iterate `top` and its placements on one layer.
    pub fn new(layout: &'a Layout, top: CellId, layer: LayerId) -> Self {
        Self::with_layers(layout, top, [layer])
    }

    /// Iterate `top` and its placements on several layers, visited in the given order.
    pub fn with_layers(
        layout: &'a Layout,
        top: CellId,
        layers: impl IntoIterator<Item = LayerId>,
    ) -> Self {
        Self {
            source: Source::Hierarchy { layout, top },
            config: IterConfig::new(layers),
            cursor: None,
        }
    }

    /// Iterate a single shape container.
    pub fn flat(shapes: &'a Shapes) -> Self {
        Self {
            source: Source::Flat(shapes),
            config: IterConfig::default(),
            cursor: None,
        }
    }

    /// Iterate `source` with an explicit configuration.
    pub fn with_config(source: Source<'a>, config: IterConfig) -> Self {
        Self {
            source,
            config,
            cursor: None,
        }
    }

    /// The data walked.
    pub fn source(&self) -> Source<'a> {
        self.source
    }

    /// The current configuration.
    pub fn config(&self) -> &IterConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: IterConfig) {
        self.config = config;
        self.reset();
    }

    /// Restart from the first shape on the next read; configuration is kept.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Restrict the walk to a box.
    pub fn set_region(&mut self, region: Rect) {
        self.config.region = BoxRegion::rect(region);
        self.reset();
    }

    /// Remove every region restriction, including a complex region.
    pub fn clear_region(&mut self) {
        self.config.region = BoxRegion::World;
        self.config.complex = None;
        self.reset();
    }

    /// Intersect the current box region with `region`.
    pub fn confine_region(&mut self, region: Rect) {
        self.config.region = self.config.region.intersect(region);
        self.reset();
    }

    /// Restrict the walk to a complex region.
    ///
    /// The box region is kept; both apply.
    pub fn set_complex_region(&mut self, region: ComplexRegion) {
        self.config.complex = Some(region);
        self.reset();
    }

    /// Restrict the walk to `rect` minus the `holes`.
    pub fn set_region_excluding(
        &mut self,
        rect: Rect,
        holes: &[Polygon],
    ) -> Result<(), BooleanError> {
        let complex = ComplexRegionBuilder::new().excluding(rect, holes)?;
        self.config.region = BoxRegion::rect(rect);
        self.set_complex_region(complex);
        Ok(())
    }

    /// Restrict the walk to the union of `polygons`.
    pub fn set_region_including(&mut self, polygons: &[Polygon]) -> Result<(), BooleanError> {
        let complex = ComplexRegionBuilder::new().including(polygons)?;
        self.config.region = complex.bbox().map_or(BoxRegion::Empty, BoxRegion::Rect);
        self.set_complex_region(complex);
        Ok(())
    }

    /// Deepest level visited; 0 yields only the top cell's own shapes.
    pub fn set_max_depth(&mut self, depth: usize) {
        self.config.max_depth = depth;
        self.reset();
    }

    /// Shallowest level shapes are taken from. Shallower levels are still walked.
    pub fn set_min_depth(&mut self, depth: usize) {
        self.config.min_depth = depth;
        self.reset();
    }

    /// Layers visited, in order.
    pub fn set_layers(&mut self, layers: impl IntoIterator<Item = LayerId>) {
        self.config.layers = layers.into_iter().collect();
        self.reset();
    }

    /// Shape classes yielded.
    pub fn set_shape_types(&mut self, types: ShapeTypes) {
        self.config.shape_types = types;
        self.reset();
    }

    /// Property predicate; `None` accepts every shape.
    pub fn set_property_filter(&mut self, filter: Option<PropertyFilter>) {
        self.config.properties = filter;
        self.reset();
    }

    /// Touching or overlapping selection.
    pub fn set_overlap(&mut self, overlap: Overlap) {
        self.config.overlap = overlap;
        self.reset();
    }

    /// Transform applied on top of every reported transform.
    ///
    /// Regions are interpreted after this transform.
    pub fn set_global_trans(&mut self, trans: Affine) {
        self.config.global_trans = trans;
        self.reset();
    }

    /// Force the subtrees of `cells` active.
    pub fn select_cells(&mut self, cells: impl IntoIterator<Item = CellId>) {
        self.config.selection.select(cells);
        self.reset();
    }

    /// Force the subtrees of `cells` inactive.
    pub fn unselect_cells(&mut self, cells: impl IntoIterator<Item = CellId>) {
        self.config.selection.unselect(cells);
        self.reset();
    }

    /// Make every cell of the layout a start cell.
    pub fn select_all_cells(&mut self) {
        if let Source::Hierarchy { layout, .. } = self.source {
            self.config.selection.select_all(layout.cell_ids());
        }
        self.reset();
    }

    /// Make every cell of the layout a stop cell.
    pub fn unselect_all_cells(&mut self) {
        if let Source::Hierarchy { layout, .. } = self.source {
            self.config.selection.unselect_all(layout.cell_ids());
        }
        self.reset();
    }

    /// Drop every activation override.
    pub fn reset_selection(&mut self) {
        self.config.selection.reset();
        self.reset();
    }

    /// Bound of the area the walk can visit, in reported coordinates.
    ///
    /// This depends on the configuration and on the bounding box of the root,
    /// not on which shapes lie in the region.
    pub fn region_bbox(&self) -> Option<Rect> {
        let root = match self.source {
            Source::Flat(shapes) => shapes.bbox(),
            Source::Hierarchy { layout, top } => layout.cell(top).bbox_over(&self.config.layers),
        }?;
        let mut b = transform_rect_bbox(self.config.global_trans, root);
        if let Some(r) = self.config.region.as_rect() {
            b = intersect_rect(b, r)?;
        } else if self.config.region == BoxRegion::Empty {
            return None;
        }
        if let Some(c) = self.config.complex.as_ref() {
            b = intersect_rect(b, c.bbox()?)?;
        }
        Some(b)
    }

    fn cursor(&mut self) -> &mut Cursor<'a> {
        let (config, source) = (&self.config, self.source);
        self.cursor
            .get_or_insert_with(|| build_cursor(config, source))
    }

    /// True when every matching shape has been visited.
    pub fn at_end(&mut self) -> bool {
        self.cursor().at_end()
    }

    /// Move to the next shape.
    pub fn advance(&mut self) {
        self.cursor().advance();
    }

    /// The current shape. Panics at the end.
    pub fn shape(&mut self) -> (ShapeId, &'a Shape) {
        self.cursor().shape()
    }

    /// Transform from the current shape's cell into reported coordinates.
    pub fn trans(&mut self) -> Affine {
        self.cursor().trans()
    }

    /// Cell owning the current shape.
    pub fn cell(&mut self) -> Option<CellId> {
        self.cursor().cell()
    }

    /// Layer of the current shape.
    pub fn layer(&mut self) -> Option<LayerId> {
        self.cursor().layer()
    }

    /// Depth of the current shape's cell.
    pub fn depth(&mut self) -> usize {
        self.cursor().depth()
    }

    /// Placements from the root to the current shape's cell.
    pub fn path(&mut self) -> Vec<InstElement> {
        self.cursor().path()
    }

    /// Leave the current cell, with everything placed in it, and continue in its parent.
    pub fn skip_instance(&mut self) {
        self.cursor().skip_instance();
    }

    /// The current shape as a [`ShapeHit`], `None` at the end.
    pub fn current(&mut self) -> Option<ShapeHit<'a>> {
        let c = self.cursor();
        if c.at_end() {
            return None;
        }
        let (id, shape) = c.shape();
        Some(ShapeHit {
            id,
            shape,
            cell: c.cell(),
            layer: c.layer(),
            trans: c.trans(),
            depth: c.depth(),
        })
    }
}

impl<'a> Iterator for RecursiveShapeIter<'a> {
    type Item = ShapeHit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let hit = self.current()?;
        self.advance();
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use understory_layout::{Instance, LayerInfo};

    struct Fixture {
        layout: Layout,
        layer: LayerId,
        top: CellId,
        r: CellId,
        c: CellId,
    }

    // R holds a box at the origin and a placement of C at (100, 100).
    fn fixture() -> Fixture {
        let mut layout = Layout::new();
        let layer = layout.add_layer(LayerInfo::new(1, 0));
        let top = layout.add_cell("TOP").unwrap();
        let r = layout.add_cell("R").unwrap();
        let c = layout.add_cell("C").unwrap();
        layout
            .cell_mut(r)
            .insert_shape(layer, Shape::rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        layout
            .cell_mut(r)
            .insert_instance(Instance::new(c, Affine::translate((100.0, 100.0))));
        layout
            .cell_mut(c)
            .insert_shape(layer, Shape::rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
        layout
            .cell_mut(top)
            .insert_instance(Instance::new(r, Affine::IDENTITY));
        layout.ensure_built().unwrap();
        Fixture {
            layout,
            layer,
            top,
            r,
            c,
        }
    }

    fn cells(iter: &mut RecursiveShapeIter<'_>) -> Vec<CellId> {
        iter.reset();
        iter.map(|h| h.cell.unwrap()).collect()
    }

    #[test]
    fn region_restricts_to_the_origin_box() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        iter.set_region(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(cells(&mut iter), vec![f.r]);
    }

    #[test]
    fn world_region_reports_composed_transforms() {
        let f = fixture();
        let iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        let mut hits: Vec<_> = iter.map(|h| (h.cell.unwrap(), h.trans, h.depth)).collect();
        hits.sort_by_key(|h| h.2);
        assert_eq!(
            hits,
            vec![
                (f.r, Affine::IDENTITY, 0),
                (f.c, Affine::translate((100.0, 100.0)), 1)
            ]
        );
    }

    #[test]
    fn depth_zero_is_the_root_only() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        iter.set_max_depth(0);
        assert_eq!(cells(&mut iter), vec![f.r]);
    }

    #[test]
    fn selection_reactivates_below_an_inactive_root() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        iter.unselect_cells([f.r]);
        iter.select_cells([f.c]);
        assert_eq!(cells(&mut iter), vec![f.c]);
        iter.reset_selection();
        assert_eq!(cells(&mut iter).len(), 2);
    }

    #[test]
    fn bulk_selection_uses_the_layout_cell_list() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.top, f.layer);
        iter.unselect_all_cells();
        assert!(cells(&mut iter).is_empty());
        iter.select_cells([f.c]);
        assert_eq!(cells(&mut iter), vec![f.c]);
        iter.select_all_cells();
        assert_eq!(cells(&mut iter).len(), 2);
    }

    #[test]
    fn min_depth_suppresses_shallow_shapes() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.top, f.layer);
        iter.set_min_depth(2);
        assert_eq!(cells(&mut iter), vec![f.c]);
        let mut iter = RecursiveShapeIter::new(&f.layout, f.top, f.layer);
        iter.set_min_depth(1);
        iter.set_max_depth(1);
        assert_eq!(cells(&mut iter), vec![f.r]);
    }

    #[test]
    fn skip_instance_leaves_the_subtree() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.top, f.layer);
        let mut seen = Vec::new();
        while !iter.at_end() {
            seen.push(iter.cell().unwrap());
            if iter.cell() == Some(f.r) {
                iter.skip_instance();
            } else {
                iter.advance();
            }
        }
        assert_eq!(seen, vec![f.r]);
    }

    #[test]
    fn path_lists_entered_placements() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.top, f.layer);
        iter.set_min_depth(2);
        assert!(!iter.at_end());
        let path = iter.path();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].parent, f.top);
        assert_eq!(path[1].parent, f.r);
        assert_eq!(path[1].instance.cell, f.c);
        assert_eq!(path[0].trans() * path[1].trans(), iter.trans());
    }

    #[test]
    fn region_bbox_follows_configuration() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        assert_eq!(iter.region_bbox(), Some(Rect::new(0.0, 0.0, 105.0, 105.0)));
        iter.set_region(Rect::new(50.0, 50.0, 200.0, 200.0));
        assert_eq!(iter.region_bbox(), Some(Rect::new(50.0, 50.0, 105.0, 105.0)));
        iter.confine_region(Rect::new(0.0, 0.0, 60.0, 60.0));
        assert_eq!(iter.region_bbox(), Some(Rect::new(50.0, 50.0, 60.0, 60.0)));
        iter.set_global_trans(Affine::translate((1000.0, 0.0)));
        assert_eq!(iter.region_bbox(), None);
    }

    #[test]
    fn global_transform_is_applied_before_the_region() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        iter.set_global_trans(Affine::translate((1000.0, 0.0)));
        iter.set_region(Rect::new(1100.0, 100.0, 1105.0, 105.0));
        let hits: Vec<_> = iter.collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cell, Some(f.c));
        assert_eq!(hits[0].bbox(), Some(Rect::new(1100.0, 100.0, 1105.0, 105.0)));
    }

    #[test]
    fn excluding_a_hole_hides_the_placed_cell() {
        let f = fixture();
        let mut iter = RecursiveShapeIter::new(&f.layout, f.r, f.layer);
        let hole = Polygon::from_rect(Rect::new(90.0, 90.0, 120.0, 120.0));
        iter.set_region_excluding(Rect::new(0.0, 0.0, 200.0, 200.0), &[hole])
            .unwrap();
        assert_eq!(cells(&mut iter), vec![f.r]);
    }

    #[test]
    fn flat_iteration_has_no_cells() {
        let mut shapes = Shapes::new();
        shapes.insert(Shape::rect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        shapes.insert(Shape::rect(Rect::new(10.0, 0.0, 11.0, 1.0)));
        shapes.ensure_built();
        let mut iter = RecursiveShapeIter::flat(&shapes);
        iter.set_region(Rect::new(5.0, 0.0, 20.0, 1.0));
        let hits: Vec<_> = iter.collect();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].cell, hits[0].layer, hits[0].depth), (None, None, 0));
    }
}
