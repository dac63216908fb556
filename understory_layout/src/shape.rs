// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape records stored in [`Shapes`](crate::Shapes) containers.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;
use kurbo::{Affine, Point, Rect};

use crate::types::{PropertiesId, ShapeTypes};

/// A simple polygon given by its hull vertices (closing edge implied).
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// Hull vertices in order; orientation is not significant.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Polygon from a vertex list.
    pub fn new(points: impl Into<Vec<Point>>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// Axis-aligned rectangle as a four-vertex polygon.
    pub fn from_rect(r: Rect) -> Self {
        Self::new([
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        ])
    }

    /// Bounding box of the vertices, `None` without vertices.
    pub fn bbox(&self) -> Option<Rect> {
        let mut it = self.points.iter();
        let first = it.next()?;
        Some(it.fold(Rect::from_points(*first, *first), |acc, p| {
            acc.union_pt(*p)
        }))
    }

    /// The polygon with every vertex transformed.
    pub fn transformed(&self, t: Affine) -> Self {
        Self {
            points: self.points.iter().map(|p| t * *p).collect(),
        }
    }
}

/// Geometry of a shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box.
    Box(Rect),
    /// Polygon.
    Polygon(Polygon),
    /// Path: a centerline widened by `width`.
    Path {
        /// Centerline vertices.
        points: Vec<Point>,
        /// Full path width.
        width: f64,
    },
    /// Text label anchored at a point.
    Text {
        /// Label string.
        text: String,
        /// Anchor position.
        anchor: Point,
    },
}

impl Geometry {
    /// Shape class of this geometry.
    pub fn shape_type(&self) -> ShapeTypes {
        match self {
            Self::Box(_) => ShapeTypes::BOXES,
            Self::Polygon(_) => ShapeTypes::POLYGONS,
            Self::Path { .. } => ShapeTypes::PATHS,
            Self::Text { .. } => ShapeTypes::TEXTS,
        }
    }

    /// Conservative bounding box; `None` for geometry without any vertex.
    ///
    /// Paths are widened by half their width on every side, which covers any
    /// end or join style. Texts have a degenerate box at their anchor.
    pub fn bbox(&self) -> Option<Rect> {
        match self {
            Self::Box(r) => Some(r.abs()),
            Self::Polygon(p) => p.bbox(),
            Self::Path { points, width } => {
                let hull = Polygon {
                    points: points.clone(),
                }
                .bbox()?;
                let hw = (width * 0.5).max(0.0);
                Some(hull.inflate(hw, hw))
            }
            Self::Text { anchor, .. } => Some(Rect::from_points(*anchor, *anchor)),
        }
    }
}

/// A stored shape: geometry plus an optional property set.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    /// The geometry.
    pub geometry: Geometry,
    /// Attached property set, if any.
    pub properties: Option<PropertiesId>,
}

impl Shape {
    /// Shape without properties.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: None,
        }
    }

    /// Axis-aligned box shape.
    pub fn rect(r: Rect) -> Self {
        Self::new(Geometry::Box(r))
    }

    /// Attach a property set.
    #[must_use]
    pub fn with_properties(mut self, id: PropertiesId) -> Self {
        self.properties = Some(id);
        self
    }

    /// Conservative bounding box.
    pub fn bbox(&self) -> Option<Rect> {
        self.geometry.bbox()
    }
}

/// Property predicate for shape queries: a set of accepted property ids.
///
/// A shape passes when its property id is in the set; with `inverse` set, a shape
/// passes when it is not (shapes without properties never match the set).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    ids: HashSet<PropertiesId>,
    inverse: bool,
}

impl PropertyFilter {
    /// Filter accepting the given property ids.
    pub fn accepting(ids: impl IntoIterator<Item = PropertiesId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            inverse: false,
        }
    }

    /// Filter rejecting the given property ids.
    pub fn rejecting(ids: impl IntoIterator<Item = PropertiesId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            inverse: true,
        }
    }

    /// Whether the filter is inverted.
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Whether a shape with the given property id passes.
    pub fn matches(&self, properties: Option<PropertiesId>) -> bool {
        let hit = properties.is_some_and(|p| self.ids.contains(&p));
        hit != self.inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn path_bbox_is_widened() {
        let g = Geometry::Path {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            width: 2.0,
        };
        assert_eq!(g.bbox(), Some(Rect::new(-1.0, -1.0, 11.0, 1.0)));
        assert_eq!(g.shape_type(), ShapeTypes::PATHS);
    }

    #[test]
    fn empty_polygon_has_no_bbox() {
        assert_eq!(Geometry::Polygon(Polygon::new(Vec::new())).bbox(), None);
    }

    #[test]
    fn property_filter_inversion() {
        let keep = PropertyFilter::accepting([PropertiesId(1)]);
        assert!(keep.matches(Some(PropertiesId(1))));
        assert!(!keep.matches(Some(PropertiesId(2))));
        assert!(!keep.matches(None));

        let drop = PropertyFilter::rejecting([PropertiesId(1)]);
        assert!(!drop.matches(Some(PropertiesId(1))));
        assert!(drop.matches(Some(PropertiesId(2))));
        assert!(drop.matches(None));
    }
}
