// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers shared by the containers.

use kurbo::{Affine, Point, Rect};
use understory_index::Aabb2D;

/// Transform an axis-aligned `Rect` by an `Affine` and return a conservative
/// axis-aligned bounding box in the target space.
///
/// Exact for transforms that are combinations of translation, scaling, mirroring
/// and rotation by multiples of 90 degrees.
pub fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let p0 = affine * Point::new(rect.x0, rect.y0);
    let p1 = affine * Point::new(rect.x1, rect.y0);
    let p2 = affine * Point::new(rect.x0, rect.y1);
    let p3 = affine * Point::new(rect.x1, rect.y1);
    let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
    let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
    let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
    let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);
    Rect::new(min_x, min_y, max_x, max_y)
}

/// Convert a `Rect` into an index box.
pub fn rect_to_aabb(r: Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}

/// Convert an index box into a `Rect`.
pub fn aabb_to_rect(a: Aabb2D<f64>) -> Rect {
    Rect::new(a.min_x, a.min_y, a.max_x, a.max_y)
}

/// Intersection of two closed rectangles, `None` if they share no point.
pub fn intersect_rect(a: Rect, b: Rect) -> Option<Rect> {
    let r = Rect::new(a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1));
    (r.x0 <= r.x1 && r.y0 <= r.y1).then_some(r)
}

/// Union of two optional rectangles, treating `None` as empty.
pub fn union_opt(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::FRAC_PI_2;

    fn close(a: f64, b: f64) -> bool {
        let d = a - b;
        d < 1e-9 && d > -1e-9
    }

    #[test]
    fn rotation_by_quarter_turn_is_exact() {
        let r = Rect::new(0.0, 0.0, 10.0, 5.0);
        let t = transform_rect_bbox(Affine::rotate(FRAC_PI_2), r);
        assert!(close(t.x0, -5.0));
        assert!(close(t.x1, 0.0));
        assert!(close(t.y0, 0.0));
        assert!(close(t.y1, 10.0));
    }

    #[test]
    fn intersect_keeps_degenerate_contacts() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(intersect_rect(a, b), Some(Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert_eq!(intersect_rect(a, Rect::new(11.0, 0.0, 20.0, 10.0)), None);
        assert_eq!(union_opt(None, Some(a)), Some(a));
    }
}
