// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

/// Axis-aligned bounding box in 2D.
///
/// Boxes are closed: a box whose `min` equals its `max` on an axis is a
/// degenerate (zero-width) box, not an empty one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Aabb2D<T> {
    /// Minimum x (left)
    pub min_x: T,
    /// Minimum y (top)
    pub min_y: T,
    /// Maximum x (right)
    pub max_x: T,
    /// Maximum y (bottom)
    pub max_y: T,
}

impl<T> Aabb2D<T> {
    /// Create a new AABB from min/max corners.
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Copy + PartialOrd> Aabb2D<T> {
    /// Whether this AABB contains the point.
    pub fn contains_point(&self, x: T, y: T) -> bool {
        le(self.min_x, x) && le(self.min_y, y) && le(x, self.max_x) && le(y, self.max_y)
    }

    /// The intersection of two AABBs. May be empty; check with [`Aabb2D::is_empty`].
    pub fn intersect(&self, other: &Self) -> Self {
        let min_x = max_t(self.min_x, other.min_x);
        let min_y = max_t(self.min_y, other.min_y);
        let max_x = min_t(self.max_x, other.max_x);
        let max_y = min_t(self.max_y, other.max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The smallest AABB enclosing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        union_aabb(*self, *other)
    }

    /// Return true if the AABB is empty or inverted (no area). Assumes no NaN.
    pub fn is_empty(&self) -> bool {
        lt(self.max_x, self.min_x) || lt(self.max_y, self.min_y)
    }

    /// Whether the two boxes share at least one point (boundary contact counts).
    pub fn touches(&self, other: &Self) -> bool {
        le(self.min_x, other.max_x)
            && le(other.min_x, self.max_x)
            && le(self.min_y, other.max_y)
            && le(other.min_y, self.max_y)
    }

    /// Whether the two boxes intersect with a positive extent on both axes.
    ///
    /// Boxes that only share an edge or a corner do not overlap.
    /// A degenerate box never overlaps anything, even a box that contains it.
    pub fn overlaps(&self, other: &Self) -> bool {
        lt(max_t(self.min_x, other.min_x), min_t(self.max_x, other.max_x))
            && lt(max_t(self.min_y, other.min_y), min_t(self.max_y, other.max_y))
    }
}

impl Aabb2D<f32> {
    /// Create an AABB from origin and size in f32.
    pub const fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }
}

impl Aabb2D<f64> {
    /// Create an AABB from origin and size in f64.
    pub const fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }
}

impl Aabb2D<i64> {
    /// Create an AABB from origin and size in i64.
    pub const fn from_xywh(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }
}

/// Box predicate used by index queries.
///
/// Index nodes are pruned with the same predicate as items: a node box encloses
/// all of its items, so an item can only pass if its node passes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Query<T> {
    /// Every entry.
    All,
    /// Entries whose box shares at least one point with the query box.
    Touching(Aabb2D<T>),
    /// Entries whose box intersects the query box with positive extent.
    Overlapping(Aabb2D<T>),
}

impl<T: Copy + PartialOrd> Query<T> {
    /// Whether an entry with box `b` passes this query.
    pub fn admits(&self, b: &Aabb2D<T>) -> bool {
        match self {
            Self::All => true,
            Self::Touching(q) => q.touches(b),
            Self::Overlapping(q) => q.overlaps(b),
        }
    }

    /// The query box, or `None` for [`Query::All`].
    pub fn rect(&self) -> Option<Aabb2D<T>> {
        match self {
            Self::All => None,
            Self::Touching(q) | Self::Overlapping(q) => Some(*q),
        }
    }
}

/// Numeric scalar abstraction for 2D AABBs used by backends.
///
/// Bulk builders only need a zero value and a midpoint for centroid ordering.
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// Midpoint between a and b (used for centroid ordering).
    fn mid(a: Self, b: Self) -> Self;
}

impl Scalar for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }
}

impl Scalar for f64 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }
}

impl Scalar for i64 {
    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        // Average without overflow: (a & b) + ((a ^ b) >> 1)
        (a & b) + ((a ^ b) >> 1)
    }
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

pub(crate) fn le<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o != Ordering::Greater)
        .unwrap_or(false)
}
pub(crate) fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o == Ordering::Less)
        .unwrap_or(false)
}

pub(crate) fn union_aabb<T: PartialOrd + Copy>(a: Aabb2D<T>, b: Aabb2D<T>) -> Aabb2D<T> {
    Aabb2D {
        min_x: min_t(a.min_x, b.min_x),
        min_y: min_t(a.min_y, b.min_y),
        max_x: max_t(a.max_x, b.max_x),
        max_y: max_t(a.max_y, b.max_y),
    }
}
