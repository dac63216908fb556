// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-cell, per-layer shape container with region queries.

use kurbo::Rect;
use understory_index::{Index, IndexGeneric, Key, Query, QuadId, QueryCursor, RTreeF64};

use crate::shape::{PropertyFilter, Shape};
use crate::types::ShapeTypes;
use crate::util::{aabb_to_rect, rect_to_aabb};

/// Identifier of a shape inside its [`Shapes`] container (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) Key);

/// A container of shapes with a spatial index over their bounding boxes.
///
/// Shapes without a bounding box (for example a polygon without vertices) are
/// not stored. Edits mark the container unbuilt; queries require
/// [`Shapes::ensure_built`] (or [`Layout::ensure_built`](crate::Layout::ensure_built)).
#[derive(Debug, Default)]
pub struct Shapes {
    index: IndexGeneric<f64, Shape, RTreeF64>,
}

impl Shapes {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            index: Index::<f64, _>::with_rtree(),
        }
    }

    /// Insert a shape. Returns `None` if the shape has no bounding box.
    pub fn insert(&mut self, shape: Shape) -> Option<ShapeId> {
        let bbox = shape.bbox()?;
        Some(ShapeId(self.index.insert(rect_to_aabb(bbox), shape)))
    }

    /// Remove a shape, returning it. Stale ids yield `None`.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        self.index.remove(id.0)
    }

    /// Access a shape.
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.index.get(id.0)
    }

    /// Number of shapes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the container holds no shapes.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate all shapes in storage order (works on unbuilt containers).
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> + '_ {
        self.index.iter().map(|(k, _, s)| (ShapeId(k), s))
    }

    /// Bounding box of all shapes, `None` when empty.
    pub fn bbox(&self) -> Option<Rect> {
        self.index.bbox().map(aabb_to_rect)
    }

    /// Whether the spatial index reflects every edit.
    pub fn is_built(&self) -> bool {
        self.index.is_built()
    }

    /// Build the spatial index if needed.
    pub fn ensure_built(&mut self) {
        self.index.ensure_built();
    }

    /// Shapes whose bounding box shares at least one point with `region`.
    pub fn begin_touching<'a>(
        &'a self,
        region: Rect,
        types: ShapeTypes,
        properties: Option<&'a PropertyFilter>,
    ) -> ShapeCursor<'a> {
        self.begin(Query::Touching(rect_to_aabb(region)), types, properties)
    }

    /// Shapes whose bounding box intersects `region` with positive extent.
    pub fn begin_overlapping<'a>(
        &'a self,
        region: Rect,
        types: ShapeTypes,
        properties: Option<&'a PropertyFilter>,
    ) -> ShapeCursor<'a> {
        self.begin(Query::Overlapping(rect_to_aabb(region)), types, properties)
    }

    /// Every shape passing the class and property filters.
    pub fn begin_all<'a>(
        &'a self,
        types: ShapeTypes,
        properties: Option<&'a PropertyFilter>,
    ) -> ShapeCursor<'a> {
        self.begin(Query::All, types, properties)
    }

    /// General form of the `begin_*` queries.
    pub fn begin<'a>(
        &'a self,
        query: Query<f64>,
        types: ShapeTypes,
        properties: Option<&'a PropertyFilter>,
    ) -> ShapeCursor<'a> {
        let mut cursor = ShapeCursor {
            inner: self.index.query(query),
            types,
            properties,
        };
        cursor.settle();
        cursor
    }
}

/// Cursor over the shapes of a [`Shapes`] container.
///
/// Shapes failing the class or property filter are skipped. The quad operations
/// refer to the container's spatial index; a quad box encloses every remaining
/// candidate of the quad, filtered or not.
#[derive(Clone, Debug)]
pub struct ShapeCursor<'a> {
    inner: QueryCursor<'a, f64, Shape, RTreeF64>,
    types: ShapeTypes,
    properties: Option<&'a PropertyFilter>,
}

impl<'a> ShapeCursor<'a> {
    /// True when no shape is left.
    pub fn at_end(&self) -> bool {
        self.inner.at_end()
    }

    /// Current shape, its id, and its bounding box.
    pub fn current(&self) -> Option<(ShapeId, &'a Shape, Rect)> {
        let (key, aabb, shape) = self.inner.current()?;
        Some((ShapeId(key), shape, aabb_to_rect(*aabb)))
    }

    /// Move to the next matching shape.
    pub fn advance(&mut self) {
        self.inner.advance();
        self.settle();
    }

    /// Identity of the current quad.
    pub fn quad_id(&self) -> Option<QuadId> {
        self.inner.quad_id()
    }

    /// Box enclosing the rest of the current quad.
    pub fn quad_box(&self) -> Option<Rect> {
        self.inner.quad_box().map(aabb_to_rect)
    }

    /// Drop the rest of the current quad.
    pub fn skip_quad(&mut self) {
        self.inner.skip_quad();
        self.settle();
    }

    fn settle(&mut self) {
        while let Some((_, _, shape)) = self.inner.current() {
            if self.types.contains(shape.geometry.shape_type())
                && self.properties.is_none_or(|f| f.matches(shape.properties))
            {
                return;
            }
            self.inner.advance();
        }
    }
}

impl<'a> Iterator for ShapeCursor<'a> {
    type Item = (ShapeId, &'a Shape);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, shape, _) = self.current()?;
        self.advance();
        Some((id, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Geometry;
    use crate::types::PropertiesId;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use kurbo::Point;

    fn sample() -> Shapes {
        let mut s = Shapes::new();
        s.insert(Shape::rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        s.insert(Shape::rect(Rect::new(10.0, 0.0, 20.0, 10.0)).with_properties(PropertiesId(3)));
        s.insert(Shape::new(Geometry::Text {
            text: "A".to_string(),
            anchor: Point::new(15.0, 5.0),
        }));
        s.ensure_built();
        s
    }

    #[test]
    fn touching_versus_overlapping() {
        let s = sample();
        let q = Rect::new(10.0, 2.0, 12.0, 4.0);
        assert_eq!(s.begin_touching(q, ShapeTypes::all(), None).count(), 2);
        assert_eq!(s.begin_overlapping(q, ShapeTypes::all(), None).count(), 1);
    }

    #[test]
    fn class_and_property_filters() {
        let s = sample();
        assert_eq!(s.begin_all(ShapeTypes::TEXTS, None).count(), 1);
        let props = PropertyFilter::accepting([PropertiesId(3)]);
        let hits: Vec<_> = s.begin_all(ShapeTypes::all(), Some(&props)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.properties, Some(PropertiesId(3)));
        let inverse = PropertyFilter::rejecting([PropertiesId(3)]);
        assert_eq!(s.begin_all(ShapeTypes::all(), Some(&inverse)).count(), 2);
    }

    #[test]
    fn shapes_without_bbox_are_rejected() {
        let mut s = Shapes::new();
        assert!(
            s.insert(Shape::new(Geometry::Polygon(crate::Polygon::new(Vec::new()))))
                .is_none()
        );
        assert!(s.is_empty());
        assert_eq!(s.bbox(), None);
    }
}
