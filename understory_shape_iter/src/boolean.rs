// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Planar boolean operations producing trapezoids.
//!
//! Complex query regions are built from polygons by a [`PlanarBoolean`] engine:
//! operands are inserted with a tag, then the engine reports the result of a
//! [`BooleanOp`] as a set of disjoint trapezoids with horizontal top and bottom.
//! The bundled [`ScanlineBoolean`] cuts the plane into horizontal slabs at every
//! vertex and edge crossing and evaluates nonzero winding per tag inside each slab.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use kurbo::{Point, Rect};
use understory_layout::Polygon;

/// Boolean operation evaluated over tagged operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BooleanOp {
    /// Union of every operand.
    Merge,
    /// Area inside tag 0 and outside every other tag.
    ANotB,
}

/// A trapezoid with horizontal bottom (`y0`) and top (`y1`) edges.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Trapezoid {
    /// Bottom edge ordinate.
    pub y0: f64,
    /// Top edge ordinate.
    pub y1: f64,
    /// Left edge abscissa at `y0` and at `y1`.
    pub left: (f64, f64),
    /// Right edge abscissa at `y0` and at `y1`.
    pub right: (f64, f64),
}

impl Trapezoid {
    /// Bounding box.
    pub fn bbox(&self) -> Rect {
        Rect::new(
            self.left.0.min(self.left.1),
            self.y0,
            self.right.0.max(self.right.1),
            self.y1,
        )
    }

    /// True if both side edges are vertical.
    pub fn is_rectilinear(&self) -> bool {
        self.left.0 == self.left.1 && self.right.0 == self.right.1
    }
}

/// Error reported by a [`PlanarBoolean`] engine for malformed input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BooleanError {
    /// A polygon has fewer than three distinct vertices.
    Degenerate {
        /// Tag the polygon was inserted with.
        tag: usize,
    },
    /// A polygon has a NaN or infinite coordinate.
    NonFinite {
        /// Tag the polygon was inserted with.
        tag: usize,
    },
}

impl fmt::Display for BooleanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degenerate { tag } => {
                write!(f, "polygon with tag {tag} has fewer than three distinct vertices")
            }
            Self::NonFinite { tag } => {
                write!(f, "polygon with tag {tag} has a non-finite coordinate")
            }
        }
    }
}

impl core::error::Error for BooleanError {}

/// A planar boolean engine with trapezoid output.
pub trait PlanarBoolean {
    /// Drop every inserted operand.
    fn clear(&mut self);

    /// Add a polygon as part of operand `tag`.
    fn insert(&mut self, polygon: &Polygon, tag: usize) -> Result<(), BooleanError>;

    /// Evaluate `op` over the inserted operands.
    fn trapezoids(&mut self, op: BooleanOp) -> Result<Vec<Trapezoid>, BooleanError>;
}

#[derive(Copy, Clone, Debug)]
struct Edge {
    // Lower and upper end points (y0 < y1).
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    // +1 for edges running upward in polygon order, -1 otherwise.
    dir: i32,
    tag: usize,
}

impl Edge {
    fn x_at(&self, y: f64) -> f64 {
        if y <= self.y0 {
            self.x0
        } else if y >= self.y1 {
            self.x1
        } else {
            self.x0 + (y - self.y0) * (self.x1 - self.x0) / (self.y1 - self.y0)
        }
    }

    /// Ordinate where the open segments cross, if they do.
    fn crossing_y(&self, other: &Self) -> Option<f64> {
        let (p, r) = (
            Point::new(self.x0, self.y0),
            Point::new(self.x1, self.y1) - Point::new(self.x0, self.y0),
        );
        let (q, s) = (
            Point::new(other.x0, other.y0),
            Point::new(other.x1, other.y1) - Point::new(other.x0, other.y0),
        );
        let denom = r.cross(s);
        if denom == 0.0 {
            return None;
        }
        let qp = q - p;
        let t = qp.cross(s) / denom;
        let u = qp.cross(r) / denom;
        (t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0).then(|| p.y + t * r.y)
    }
}

/// Scanline engine: slab decomposition with nonzero winding per tag.
///
/// Intersections are found by testing every pair of edges, which is adequate for
/// the small polygon sets query regions are built from. Vertically adjacent
/// rectangular results with identical sides are merged into one trapezoid.
#[derive(Clone, Debug, Default)]
pub struct ScanlineBoolean {
    edges: Vec<Edge>,
    max_tag: usize,
}

impl ScanlineBoolean {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn inside(op: BooleanOp, winding: &[i32]) -> bool {
        match op {
            BooleanOp::Merge => winding.iter().any(|w| *w != 0),
            BooleanOp::ANotB => {
                winding.first().is_some_and(|w| *w != 0)
                    && winding.iter().skip(1).all(|w| *w == 0)
            }
        }
    }

    fn slab_ordinates(&self) -> Vec<f64> {
        let mut ys: Vec<f64> = Vec::with_capacity(self.edges.len() * 2);
        for e in &self.edges {
            ys.push(e.y0);
            ys.push(e.y1);
        }
        for (i, e) in self.edges.iter().enumerate() {
            for f in &self.edges[i + 1..] {
                if e.y1 <= f.y0 || f.y1 <= e.y0 {
                    continue;
                }
                if let Some(y) = e.crossing_y(f) {
                    ys.push(y);
                }
            }
        }
        ys.sort_by(f64::total_cmp);
        ys.dedup();
        ys
    }
}

impl PlanarBoolean for ScanlineBoolean {
    fn clear(&mut self) {
        self.edges.clear();
        self.max_tag = 0;
    }

    fn insert(&mut self, polygon: &Polygon, tag: usize) -> Result<(), BooleanError> {
        let pts = &polygon.points;
        if pts.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(BooleanError::NonFinite { tag });
        }
        let mut distinct: Vec<Point> = Vec::with_capacity(pts.len());
        for p in pts {
            if !distinct.contains(p) {
                distinct.push(*p);
                if distinct.len() == 3 {
                    break;
                }
            }
        }
        if distinct.len() < 3 {
            return Err(BooleanError::Degenerate { tag });
        }
        self.max_tag = self.max_tag.max(tag);
        for (i, a) in pts.iter().enumerate() {
            let b = pts[(i + 1) % pts.len()];
            if a.y == b.y {
                // Horizontal edges do not change the winding of any slab.
                continue;
            }
            let (lo, hi, dir) = if a.y < b.y { (*a, b, 1) } else { (b, *a, -1) };
            self.edges.push(Edge {
                x0: lo.x,
                y0: lo.y,
                x1: hi.x,
                y1: hi.y,
                dir,
                tag,
            });
        }
        Ok(())
    }

    fn trapezoids(&mut self, op: BooleanOp) -> Result<Vec<Trapezoid>, BooleanError> {
        let ys = self.slab_ordinates();
        let mut out: Vec<Trapezoid> = Vec::new();
        // Indices into `out` of the rectilinear results of the previous slab.
        let mut open: Vec<usize> = Vec::new();
        let mut next_open: Vec<usize> = Vec::new();
        let mut winding = vec![0_i32; self.max_tag + 1];
        let mut active: Vec<(f64, &Edge)> = Vec::new();

        for w in ys.windows(2) {
            let (ya, yb) = (w[0], w[1]);
            if ya >= yb {
                continue;
            }
            let ym = 0.5 * (ya + yb);
            active.clear();
            active.extend(
                self.edges
                    .iter()
                    .filter(|e| e.y0 <= ya && e.y1 >= yb)
                    .map(|e| (e.x_at(ym), e)),
            );
            active.sort_by(|a, b| a.0.total_cmp(&b.0));

            winding.iter_mut().for_each(|w| *w = 0);
            next_open.clear();
            let mut left: Option<&Edge> = None;
            for &(_, e) in &active {
                let was = Self::inside(op, &winding);
                winding[e.tag] += e.dir;
                let now = Self::inside(op, &winding);
                match (was, now, left) {
                    (false, true, _) => left = Some(e),
                    (true, false, Some(l)) => {
                        left = None;
                        let t = Trapezoid {
                            y0: ya,
                            y1: yb,
                            left: (l.x_at(ya), l.x_at(yb)),
                            right: (e.x_at(ya), e.x_at(yb)),
                        };
                        if t.left.0 >= t.right.0 && t.left.1 >= t.right.1 {
                            continue;
                        }
                        let merged = t.is_rectilinear().then(|| {
                            open.iter().copied().find(|&i| {
                                let o = &out[i];
                                o.y1 == ya && o.left == t.left && o.right == t.right
                            })
                        });
                        if let Some(Some(i)) = merged {
                            out[i].y1 = yb;
                            next_open.push(i);
                        } else {
                            out.push(t);
                            if t.is_rectilinear() {
                                next_open.push(out.len() - 1);
                            }
                        }
                    }
                    _ => {}
                }
            }
            core::mem::swap(&mut open, &mut next_open);
        }
        log::trace!(
            "scanline boolean: {} edges, {} slabs, {} trapezoids",
            self.edges.len(),
            ys.len().saturating_sub(1),
            out.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(ts: &[Trapezoid]) -> f64 {
        ts.iter()
            .map(|t| 0.5 * ((t.right.0 - t.left.0) + (t.right.1 - t.left.1)) * (t.y1 - t.y0))
            .sum()
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::from_rect(Rect::new(x0, y0, x1, y1))
    }

    #[test]
    fn rectangle_minus_hole() {
        let mut e = ScanlineBoolean::new();
        e.insert(&rect(0.0, 0.0, 10.0, 10.0), 0).unwrap();
        e.insert(&rect(4.0, 4.0, 6.0, 6.0), 1).unwrap();
        let ts = e.trapezoids(BooleanOp::ANotB).unwrap();
        assert_eq!(area(&ts), 96.0);
        // Bottom band, two side pieces, top band.
        assert_eq!(ts.len(), 4);
        assert!(ts.iter().all(|t| !t.bbox().contains(kurbo::Point::new(5.0, 5.0))));
    }

    #[test]
    fn overlapping_union_is_counted_once() {
        let mut e = ScanlineBoolean::new();
        e.insert(&rect(0.0, 0.0, 10.0, 10.0), 0).unwrap();
        e.insert(&rect(5.0, 5.0, 15.0, 15.0), 1).unwrap();
        let ts = e.trapezoids(BooleanOp::Merge).unwrap();
        assert_eq!(area(&ts), 175.0);
    }

    #[test]
    fn slanted_edges_produce_trapezoids() {
        let mut e = ScanlineBoolean::new();
        let tri = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]);
        e.insert(&tri, 0).unwrap();
        let ts = e.trapezoids(BooleanOp::Merge).unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(area(&ts), 50.0);
        assert_eq!(ts[0].bbox(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn crossing_edges_split_slabs() {
        // Bow tie: the two lobes meet at (5, 5).
        let mut e = ScanlineBoolean::new();
        let bow = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]);
        e.insert(&bow, 0).unwrap();
        let ts = e.trapezoids(BooleanOp::Merge).unwrap();
        assert_eq!(area(&ts), 50.0);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let mut e = ScanlineBoolean::new();
        let line = Polygon::new([Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 0.0)]);
        assert_eq!(e.insert(&line, 2), Err(BooleanError::Degenerate { tag: 2 }));
        let nan = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 1.0),
            Point::new(1.0, 0.0),
        ]);
        assert_eq!(e.insert(&nan, 0), Err(BooleanError::NonFinite { tag: 0 }));
        e.clear();
        assert!(e.trapezoids(BooleanOp::Merge).unwrap().is_empty());
    }
}
