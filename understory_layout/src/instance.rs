// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell placements and regular array repetitions.

use kurbo::{Affine, Rect, Vec2};
use understory_index::Query;

use crate::types::CellId;
use crate::util::{rect_to_aabb, transform_rect_bbox};

/// Regular two-dimensional repetition of a placement.
///
/// Member `(i, j)` with `i < na`, `j < nb` is displaced by `i * a + j * b`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Repetition {
    /// First step vector.
    pub a: Vec2,
    /// Second step vector.
    pub b: Vec2,
    /// Number of steps along `a` (at least 1).
    pub na: u32,
    /// Number of steps along `b` (at least 1).
    pub nb: u32,
}

impl Repetition {
    /// Repetition along `a` and `b`. Zero counts are clamped to 1.
    pub fn new(a: Vec2, b: Vec2, na: u32, nb: u32) -> Self {
        Self {
            a,
            b,
            na: na.max(1),
            nb: nb.max(1),
        }
    }

    /// Orthogonal array with `nx` columns spaced `dx` and `ny` rows spaced `dy`.
    pub fn grid(dx: f64, dy: f64, nx: u32, ny: u32) -> Self {
        Self::new(Vec2::new(dx, 0.0), Vec2::new(0.0, dy), nx, ny)
    }

    /// Displacement of member `(i, j)`.
    pub fn offset(&self, i: u32, j: u32) -> Vec2 {
        self.a * f64::from(i) + self.b * f64::from(j)
    }
}

/// A placement of a cell inside another cell, possibly repeated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Instance {
    /// The placed cell.
    pub cell: CellId,
    /// Placement transform from the child's coordinates into the parent's.
    pub trans: Affine,
    /// Array repetition, `None` for a single placement.
    pub repetition: Option<Repetition>,
}

impl Instance {
    /// Single placement.
    pub fn new(cell: CellId, trans: Affine) -> Self {
        Self {
            cell,
            trans,
            repetition: None,
        }
    }

    /// Repeated placement.
    pub fn array(cell: CellId, trans: Affine, repetition: Repetition) -> Self {
        Self {
            cell,
            trans,
            repetition: Some(repetition),
        }
    }

    /// Number of placed members.
    pub fn member_count(&self) -> u64 {
        self.repetition
            .map_or(1, |r| u64::from(r.na) * u64::from(r.nb))
    }

    /// Transform of member `(i, j)`: the array displacement applied after the
    /// placement transform.
    pub fn member_trans(&self, i: u32, j: u32) -> Affine {
        match self.repetition {
            Some(r) => Affine::translate(r.offset(i, j)) * self.trans,
            None => self.trans,
        }
    }

    /// Bounding box of every member, given the target cell's box.
    pub fn array_bbox(&self, cell_box: Rect) -> Rect {
        let base = transform_rect_bbox(self.trans, cell_box);
        let Some(r) = self.repetition else {
            return base;
        };
        let ea = r.a * f64::from(r.na.saturating_sub(1));
        let eb = r.b * f64::from(r.nb.saturating_sub(1));
        base.union(base + ea)
            .union(base + eb)
            .union(base + ea + eb)
    }

    /// Members whose placed `cell_box` is admitted by `query`.
    pub fn members(&self, cell_box: Rect, query: Query<f64>) -> ArrayIter {
        ArrayIter::new(self, cell_box, query)
    }
}

/// One member of an instance array.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ArrayMember {
    /// Position in the array, `(0, 0)` for single placements.
    pub index: (u32, u32),
    /// Composed member transform.
    pub trans: Affine,
}

/// Cursor over the members of an instance whose placed box passes a query.
///
/// Orthogonal arrays restrict the visited index ranges up front; other arrays
/// test every member.
#[derive(Clone, Debug)]
pub struct ArrayIter {
    base: Rect,
    trans: Affine,
    rep: Repetition,
    query: Query<f64>,
    i_range: (u32, u32),
    j_range: (u32, u32),
    i: u32,
    j: u32,
    done: bool,
}

impl ArrayIter {
    fn new(inst: &Instance, cell_box: Rect, query: Query<f64>) -> Self {
        let base = transform_rect_bbox(inst.trans, cell_box);
        let rep = inst
            .repetition
            .unwrap_or(Repetition::new(Vec2::ZERO, Vec2::ZERO, 1, 1));
        let mut i_range = (0, rep.na.saturating_sub(1));
        let mut j_range = (0, rep.nb.saturating_sub(1));
        if let Some(q) = query.rect() {
            let (qx0, qy0, qx1, qy1) = (q.min_x, q.min_y, q.max_x, q.max_y);
            if rep.a.y == 0.0 && rep.b.x == 0.0 {
                i_range = clamp_range(rep.a.x, base.x0, base.x1, qx0, qx1, rep.na);
                j_range = clamp_range(rep.b.y, base.y0, base.y1, qy0, qy1, rep.nb);
            } else if rep.a.x == 0.0 && rep.b.y == 0.0 {
                i_range = clamp_range(rep.a.y, base.y0, base.y1, qy0, qy1, rep.na);
                j_range = clamp_range(rep.b.x, base.x0, base.x1, qx0, qx1, rep.nb);
            }
        }
        let mut it = Self {
            base,
            trans: inst.trans,
            rep,
            query,
            i_range,
            j_range,
            i: i_range.0,
            j: j_range.0,
            done: rep.na == 0 || rep.nb == 0 || i_range.0 > i_range.1 || j_range.0 > j_range.1,
        };
        it.settle();
        it
    }

    /// True when no member is left.
    pub fn at_end(&self) -> bool {
        self.done
    }

    /// The current member.
    pub fn current(&self) -> Option<ArrayMember> {
        (!self.done).then(|| ArrayMember {
            index: (self.i, self.j),
            trans: Affine::translate(self.rep.offset(self.i, self.j)) * self.trans,
        })
    }

    /// Move to the next admitted member.
    pub fn advance(&mut self) {
        if !self.done {
            self.step();
            self.settle();
        }
    }

    fn step(&mut self) {
        if self.j < self.j_range.1 {
            self.j += 1;
        } else if self.i < self.i_range.1 {
            self.i += 1;
            self.j = self.j_range.0;
        } else {
            self.done = true;
        }
    }

    fn settle(&mut self) {
        while !self.done {
            let placed = self.base + self.rep.offset(self.i, self.j);
            if self.query.admits(&rect_to_aabb(placed)) {
                return;
            }
            self.step();
        }
    }
}

impl Iterator for ArrayIter {
    type Item = ArrayMember;

    fn next(&mut self) -> Option<ArrayMember> {
        let m = self.current()?;
        self.advance();
        Some(m)
    }
}

/// Conservative member index range along one axis of an orthogonal array.
///
/// The exact test in [`ArrayIter`] removes the extra members at both ends.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float to int casts saturate; the result is clamped to the array size."
)]
fn clamp_range(step: f64, lo: f64, hi: f64, q_lo: f64, q_hi: f64, n: u32) -> (u32, u32) {
    if step == 0.0 {
        return (0, n.saturating_sub(1));
    }
    // Member k covers [lo + k * step, hi + k * step].
    let (a, b) = ((q_lo - hi) / step, (q_hi - lo) / step);
    let (a, b) = if step > 0.0 { (a, b) } else { (b, a) };
    let first = (a as i64).saturating_sub(1).max(0);
    let last = (b as i64).saturating_add(1).min(i64::from(n) - 1);
    if first > last {
        // Empty range.
        return (1, 0);
    }
    (first as u32, last as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kurbo::Point;

    fn cell() -> CellId {
        CellId::new(0)
    }

    #[test]
    fn member_transform_applies_displacement_after_placement() {
        let inst = Instance::array(
            cell(),
            Affine::scale(2.0),
            Repetition::grid(10.0, 20.0, 3, 2),
        );
        assert_eq!(inst.member_count(), 6);
        let p = inst.member_trans(2, 1) * Point::new(1.0, 1.0);
        assert_eq!(p, Point::new(22.0, 22.0));
    }

    #[test]
    fn array_bbox_covers_all_members() {
        let inst = Instance::array(
            cell(),
            Affine::translate((5.0, 0.0)),
            Repetition::grid(10.0, 10.0, 4, 3),
        );
        let bb = inst.array_bbox(Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(bb, Rect::new(5.0, 0.0, 37.0, 22.0));
    }

    #[test]
    fn orthogonal_members_are_range_limited() {
        let inst = Instance::array(
            cell(),
            Affine::IDENTITY,
            Repetition::grid(10.0, 10.0, 100, 100),
        );
        let q = Query::Touching(rect_to_aabb(Rect::new(25.0, 25.0, 35.0, 30.0)));
        let hits: Vec<_> = inst
            .members(Rect::new(0.0, 0.0, 5.0, 5.0), q)
            .map(|m| m.index)
            .collect();
        // Columns 2 (touching at x = 25) and 3.
        // Rows 2 (touching at y = 25) and 3 (touching at y = 30).
        assert_eq!(hits, [(2, 2), (2, 3), (3, 2), (3, 3)]);
        let q = Query::Overlapping(rect_to_aabb(Rect::new(25.0, 25.0, 35.0, 32.0)));
        let hits: Vec<_> = inst
            .members(Rect::new(0.0, 0.0, 5.0, 5.0), q)
            .map(|m| m.index)
            .collect();
        assert_eq!(hits, [(3, 3)]);
    }

    #[test]
    fn skewed_arrays_fall_back_to_exact_tests() {
        let rep = Repetition::new(Vec2::new(10.0, 10.0), Vec2::new(-10.0, 10.0), 5, 5);
        let inst = Instance::array(cell(), Affine::IDENTITY, rep);
        let q = Query::Touching(rect_to_aabb(Rect::new(0.0, 20.0, 1.0, 21.0)));
        let hits: Vec<_> = inst
            .members(Rect::new(0.0, 0.0, 1.0, 1.0), q)
            .map(|m| m.index)
            .collect();
        assert_eq!(hits, [(1, 1)]);
    }

    #[test]
    fn single_placement_yields_one_member() {
        let inst = Instance::new(cell(), Affine::translate((100.0, 100.0)));
        let all: Vec<_> = inst.members(Rect::new(0.0, 0.0, 5.0, 5.0), Query::All).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].trans, Affine::translate((100.0, 100.0)));
        let none = inst.members(
            Rect::new(0.0, 0.0, 5.0, 5.0),
            Query::Touching(rect_to_aabb(Rect::new(0.0, 0.0, 10.0, 10.0))),
        );
        assert!(none.at_end());
    }
}
