// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-cell instance container with a spatial index over array boxes.

use alloc::vec::Vec;
use kurbo::Rect;
use understory_index::{Index, IndexGeneric, Query, QuadId, QueryCursor, RTreeF64};

use crate::instance::Instance;
use crate::types::CellId;
use crate::util::{aabb_to_rect, rect_to_aabb};

/// Identifier of an instance inside its cell (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct InstId(u32, u32);

impl InstId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "InstId uses 32-bit indices by design."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    inst: Instance,
}

/// The instances placed in one cell.
///
/// The spatial index holds the array bounding box of every instance whose target
/// cell has geometry; it is rebuilt by [`Layout::ensure_built`](crate::Layout::ensure_built),
/// since those boxes depend on the target cells.
pub struct Instances {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    len: usize,
    built: bool,
    index: IndexGeneric<f64, InstId, RTreeF64>,
}

impl Default for Instances {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Instances {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Instances")
            .field("len", &self.len)
            .field("indexed", &self.index.len())
            .field("built", &self.built)
            .finish_non_exhaustive()
    }
}

impl Instances {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            // An empty container is trivially built.
            built: true,
            index: Index::<f64, _>::with_rtree(),
        }
    }

    /// Insert an instance.
    pub fn insert(&mut self, inst: Instance) -> InstId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generations[idx] = self.generations[idx].saturating_add(1);
            idx
        } else {
            self.slots.push(None);
            self.generations.push(1);
            self.slots.len() - 1
        };
        let generation = self.generations[idx];
        self.slots[idx] = Some(Slot { generation, inst });
        self.len += 1;
        self.built = false;
        InstId::new(idx, generation)
    }

    /// Remove an instance. Stale ids yield `None`.
    pub fn remove(&mut self, id: InstId) -> Option<Instance> {
        self.get(id)?;
        let slot = self.slots[id.idx()].take()?;
        self.free_list.push(id.idx());
        self.len -= 1;
        self.built = false;
        Some(slot.inst)
    }

    /// Access an instance.
    pub fn get(&self, id: InstId) -> Option<&Instance> {
        let s = self.slots.get(id.idx())?.as_ref()?;
        (s.generation == id.1).then_some(&s.inst)
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if there are no instances.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate instances in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (InstId, &Instance)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.as_ref()
                .map(|s| (InstId::new(i, s.generation), &s.inst))
        })
    }

    /// Target cells, one entry per instance.
    pub fn targets(&self) -> impl Iterator<Item = CellId> + '_ {
        self.iter().map(|(_, inst)| inst.cell)
    }

    /// Whether the spatial index reflects the current instances.
    ///
    /// Changes in target cells are not tracked here; the layout rebuilds every
    /// instance index when anything changed.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Rebuild the spatial index, looking up target cell boxes with `cell_box`.
    pub(crate) fn rebuild(&mut self, cell_box: impl Fn(CellId) -> Option<Rect>) {
        self.index.clear();
        for (i, s) in self.slots.iter().enumerate() {
            let Some(s) = s else { continue };
            if let Some(b) = cell_box(s.inst.cell) {
                self.index.insert(
                    rect_to_aabb(s.inst.array_bbox(b)),
                    InstId::new(i, s.generation),
                );
            }
        }
        self.index.ensure_built();
        self.built = true;
    }

    /// Bounding box of every indexed instance array.
    pub fn bbox(&self) -> Option<Rect> {
        self.index.bbox().map(aabb_to_rect)
    }

    /// Instances whose array box is admitted by `query`.
    ///
    /// Panics if the container was edited since the last layout build.
    pub fn begin(&self, query: Query<f64>) -> InstCursor<'_> {
        assert!(
            self.built,
            "instances queried with pending edits; call Layout::ensure_built() first"
        );
        InstCursor {
            inner: self.index.query(query),
            slots: &self.slots,
        }
    }
}

/// Cursor over the instances of a cell, with the quad operations of the
/// underlying spatial index.
#[derive(Clone)]
pub struct InstCursor<'a> {
    inner: QueryCursor<'a, f64, InstId, RTreeF64>,
    slots: &'a [Option<Slot>],
}

impl core::fmt::Debug for InstCursor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstCursor")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<'a> InstCursor<'a> {
    /// True when no instance is left.
    pub fn at_end(&self) -> bool {
        self.inner.at_end()
    }

    /// Current instance with its id and array box.
    pub fn current(&self) -> Option<(InstId, &'a Instance, Rect)> {
        let (_, aabb, id) = self.inner.current()?;
        let slot = self.slots[id.idx()]
            .as_ref()
            .expect("indexed instance vanished while built");
        Some((*id, &slot.inst, aabb_to_rect(*aabb)))
    }

    /// Move to the next instance.
    pub fn advance(&mut self) {
        self.inner.advance();
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
    }
}

impl<'a> Iterator for InstCursor<'a> {
    type Item = (InstId, &'a Instance);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, inst, _) = self.current()?;
        self.advance();
        Some((id, inst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Affine;

    #[test]
    fn rebuild_skips_empty_targets() {
        let full = CellId::new(1);
        let empty = CellId::new(2);
        let mut insts = Instances::new();
        let a = insts.insert(Instance::new(full, Affine::translate((100.0, 0.0))));
        insts.insert(Instance::new(empty, Affine::IDENTITY));
        assert!(!insts.is_built());
        insts.rebuild(|c| (c == full).then_some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        assert_eq!(insts.len(), 2);
        let hits: Vec<_> = insts.begin(Query::All).map(|(id, _)| id).collect();
        assert_eq!(hits, [a]);
        assert_eq!(insts.bbox(), Some(Rect::new(100.0, 0.0, 105.0, 5.0)));
    }

    #[test]
    fn stale_ids_are_ignored() {
        let mut insts = Instances::new();
        let a = insts.insert(Instance::new(CellId::new(0), Affine::IDENTITY));
        assert!(insts.remove(a).is_some());
        assert!(insts.remove(a).is_none());
        let b = insts.insert(Instance::new(CellId::new(0), Affine::IDENTITY));
        assert_ne!(a, b);
        assert!(insts.get(a).is_none());
        assert!(insts.get(b).is_some());
    }

    #[test]
    #[should_panic(expected = "ensure_built")]
    fn unbuilt_query_panics() {
        let mut insts = Instances::new();
        insts.insert(Instance::new(CellId::new(0), Affine::IDENTITY));
        let _ = insts.begin(Query::All);
    }
}
