// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query regions: boxes, tile indexes, and complex (polygonal) regions.

use alloc::sync::Arc;
use kurbo::{Affine, Rect};
use understory_index::{Index, IndexGeneric, Query, RTreeF64};
use understory_layout::Polygon;
use understory_layout::util::{
    aabb_to_rect, intersect_rect, rect_to_aabb, transform_rect_bbox, union_opt,
};

use crate::boolean::{BooleanError, BooleanOp, PlanarBoolean, ScanlineBoolean};

/// Whether a shape must share a point with the region or overlap it with
/// positive extent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Overlap {
    /// Closed intersection: shared edges and corners count.
    #[default]
    Touching,
    /// Positive-extent intersection in both axes.
    Overlapping,
}

impl Overlap {
    /// Index query admitting boxes related to `r` in this mode.
    pub fn query(self, r: Rect) -> Query<f64> {
        match self {
            Self::Touching => Query::Touching(rect_to_aabb(r)),
            Self::Overlapping => Query::Overlapping(rect_to_aabb(r)),
        }
    }
}

/// A rectangular query region.
///
/// [`BoxRegion::World`] is the unbounded region; it is never transformed, only
/// intersected with finite boxes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum BoxRegion {
    /// The whole coordinate space.
    #[default]
    World,
    /// A closed axis-aligned box.
    Rect(Rect),
    /// Nothing.
    Empty,
}

impl BoxRegion {
    /// Region covering `r`.
    pub fn rect(r: Rect) -> Self {
        Self::Rect(r.abs())
    }

    /// Intersection with a box.
    pub fn intersect(self, r: Rect) -> Self {
        match self {
            Self::World => Self::Rect(r.abs()),
            Self::Rect(a) => intersect_rect(a, r.abs()).map_or(Self::Empty, Self::Rect),
            Self::Empty => Self::Empty,
        }
    }

    /// Index query for this region, `None` for the empty region.
    pub fn query(self, overlap: Overlap) -> Option<Query<f64>> {
        match self {
            Self::World => Some(Query::All),
            Self::Rect(r) => Some(overlap.query(r)),
            Self::Empty => None,
        }
    }

    /// Bounding box, `None` for world and empty regions.
    pub fn as_rect(self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(r),
            _ => None,
        }
    }
}

/// An index over axis-aligned tiles approximating an area.
///
/// Tiles come from a trapezoid decomposition, so they are disjoint and their union
/// covers the area; slanted trapezoids contribute their bounding box, which
/// makes the union a superset of the area.
#[derive(Debug)]
pub struct TileIndex {
    index: IndexGeneric<f64, (), RTreeF64>,
    bbox: Option<Rect>,
}

impl Default for TileIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TileIndex {
    /// Create an empty tile index.
    pub fn new() -> Self {
        Self {
            index: Index::<f64, _>::with_rtree(),
            bbox: None,
        }
    }

    /// Add a tile. Call [`TileIndex::finish`] before querying.
    pub fn insert(&mut self, tile: Rect) {
        let tile = tile.abs();
        self.index.insert(rect_to_aabb(tile), ());
        self.bbox = union_opt(self.bbox, Some(tile));
    }

    /// Build the index for range queries.
    pub fn finish(&mut self) {
        self.index.ensure_built();
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True without tiles.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Union of all tiles.
    pub fn bbox(&self) -> Option<Rect> {
        self.bbox
    }

    /// Every tile, in insertion order.
    pub fn tiles(&self) -> impl Iterator<Item = Rect> + '_ {
        self.index.iter().map(|(_, a, _)| aabb_to_rect(*a))
    }

    /// Tiles sharing at least one point with `r`.
    pub fn touching(&self, r: Rect) -> impl Iterator<Item = Rect> + '_ {
        let mut cursor = self.index.query(Query::Touching(rect_to_aabb(r)));
        core::iter::from_fn(move || {
            let (_, a, _) = cursor.current()?;
            cursor.advance();
            Some(aabb_to_rect(*a))
        })
    }

    /// True if no tile relates to `r` in the given mode.
    pub fn is_outside(&self, r: Rect, overlap: Overlap) -> bool {
        if self
            .bbox
            .is_none_or(|b| !overlap.query(r).admits(&rect_to_aabb(b)))
        {
            return true;
        }
        self.index.query(overlap.query(r)).at_end()
    }
}

/// A polygonal query region, stored as a shared tile index.
///
/// Cloning is cheap; clones share the tiles.
#[derive(Clone, Debug)]
pub struct ComplexRegion {
    tiles: Arc<TileIndex>,
}

impl ComplexRegion {
    /// Region made of the given tiles.
    pub fn from_tiles(tiles: impl IntoIterator<Item = Rect>) -> Self {
        let mut index = TileIndex::new();
        for t in tiles {
            index.insert(t);
        }
        index.finish();
        Self {
            tiles: Arc::new(index),
        }
    }

    /// The tiles.
    pub fn tiles(&self) -> &TileIndex {
        &self.tiles
    }

    /// Bounding box of the region, `None` if it is empty.
    pub fn bbox(&self) -> Option<Rect> {
        self.tiles.bbox()
    }

    pub(crate) fn shared(&self) -> Arc<TileIndex> {
        self.tiles.clone()
    }
}

/// Builds [`ComplexRegion`]s from polygons with a [`PlanarBoolean`] engine.
#[derive(Debug, Default)]
pub struct ComplexRegionBuilder<E = ScanlineBoolean> {
    engine: E,
}

impl ComplexRegionBuilder {
    /// Builder using the bundled scanline engine.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: PlanarBoolean> ComplexRegionBuilder<E> {
    /// Builder using a custom engine.
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    /// The area of `rect` not covered by any of `exclude`.
    pub fn excluding(
        &mut self,
        rect: Rect,
        exclude: &[Polygon],
    ) -> Result<ComplexRegion, BooleanError> {
        self.engine.clear();
        self.engine.insert(&Polygon::from_rect(rect.abs()), 0)?;
        for p in exclude {
            self.engine.insert(p, 1)?;
        }
        self.finish(BooleanOp::ANotB)
    }

    /// The union of `include`.
    pub fn including(&mut self, include: &[Polygon]) -> Result<ComplexRegion, BooleanError> {
        self.engine.clear();
        for (tag, p) in include.iter().enumerate() {
            self.engine.insert(p, tag)?;
        }
        self.finish(BooleanOp::Merge)
    }

    fn finish(&mut self, op: BooleanOp) -> Result<ComplexRegion, BooleanError> {
        let traps = self.engine.trapezoids(op)?;
        self.engine.clear();
        log::debug!("complex region built from {} trapezoids", traps.len());
        Ok(ComplexRegion::from_tiles(traps.iter().map(|t| t.bbox())))
    }
}

/// Region of a child level, derived from its parent level.
///
/// `trans` maps child coordinates to parent coordinates and `child_bbox` bounds
/// the child's geometry on the selected layers. The box region is mapped back
/// through `trans` and clipped to the child box; parent tiles near it are mapped
/// back and clipped the same way, and their union shrinks the box further.
pub(crate) fn reduce(
    parent: BoxRegion,
    parent_tiles: Option<&TileIndex>,
    trans: Affine,
    child_bbox: Option<Rect>,
) -> (BoxRegion, Option<Arc<TileIndex>>) {
    let empty_tiles = || parent_tiles.map(|_| Arc::new(TileIndex::new()));
    let Some(cb) = child_bbox else {
        return (BoxRegion::Empty, empty_tiles());
    };
    let inv = trans.inverse();
    let local = match parent {
        BoxRegion::World => BoxRegion::World,
        BoxRegion::Empty => BoxRegion::Empty,
        BoxRegion::Rect(r) => BoxRegion::Rect(transform_rect_bbox(inv, r)).intersect(cb),
    };
    let Some(tiles) = parent_tiles else {
        return (local, None);
    };
    let probe = match local {
        BoxRegion::World => cb,
        BoxRegion::Rect(r) => r,
        BoxRegion::Empty => return (BoxRegion::Empty, empty_tiles()),
    };

    let mut reduced = TileIndex::new();
    for tile in tiles.touching(transform_rect_bbox(trans, probe)) {
        if let Some(t) = intersect_rect(transform_rect_bbox(inv, tile), probe) {
            reduced.insert(t);
        }
    }
    reduced.finish();
    let local = match reduced.bbox() {
        Some(u) => local.intersect(u),
        None => BoxRegion::Empty,
    };
    log::trace!("complex region reduced to {} tiles", reduced.len());
    (local, Some(Arc::new(reduced)))
}
