// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::cursor::QueryCursor;
use crate::types::{Aabb2D, Query, union_aabb};

/// Generational handle for entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u32, u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Index keys are intentionally 32-bit; higher bits are truncated by design."
    )]
    pub(crate) const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Entry<T, P> {
    pub(crate) generation: u32,
    pub(crate) aabb: Aabb2D<T>,
    pub(crate) payload: P,
}

/// A generic AABB index parameterized by a spatial backend.
///
/// Edits are cheap and only mark the index stale; [`IndexGeneric::ensure_built`]
/// rebuilds the backend in one bulk pass. Queries require a built index: building
/// is a mutation, so it must happen before the index is shared for reading.
#[derive(Debug)]
pub struct IndexGeneric<T: Copy + PartialOrd + Debug, P, B: Backend<T>> {
    entries: Vec<Option<Entry<T, P>>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    len: usize,
    built: bool,
    backend: B,
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T> + Default,
{
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::with_backend(B::default())
    }
}

impl<T, P, B> Default for IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    /// Create an empty index over an explicitly configured backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            // An empty index is trivially built.
            built: true,
            backend,
        }
    }

    /// Reserve space for at least `n` entries.
    pub fn reserve(&mut self, n: usize) {
        self.entries.reserve(n);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a new AABB with payload. Returns a stable handle `Key`.
    pub fn insert(&mut self, aabb: Aabb2D<T>, payload: P) -> Key {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generations[idx] = self.generations[idx].saturating_add(1);
            idx
        } else {
            self.entries.push(None);
            self.generations.push(1);
            self.entries.len() - 1
        };
        let generation = self.generations[idx];
        self.entries[idx] = Some(Entry {
            generation,
            aabb,
            payload,
        });
        self.len += 1;
        self.built = false;
        Key::new(idx, generation)
    }

    /// Update an existing AABB. Stale keys are ignored.
    pub fn update(&mut self, key: Key, aabb: Aabb2D<T>) {
        if let Some(e) = self.entry_mut(key) {
            if e.aabb != aabb {
                e.aabb = aabb;
                self.built = false;
            }
        }
    }

    /// Remove an existing entry, returning its payload. Stale keys yield `None`.
    pub fn remove(&mut self, key: Key) -> Option<P> {
        self.entry_mut(key)?;
        let e = self.entries[key.idx()].take()?;
        self.free_list.push(key.idx());
        self.len -= 1;
        self.built = false;
        Some(e.payload)
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generations.clear();
        self.free_list.clear();
        self.len = 0;
        self.backend.clear();
        self.built = true;
    }

    /// Whether `key` refers to a live entry.
    pub fn contains(&self, key: Key) -> bool {
        self.entry(key).is_some()
    }

    /// Payload of a live entry.
    pub fn get(&self, key: Key) -> Option<&P> {
        self.entry(key).map(|e| &e.payload)
    }

    /// Mutable payload of a live entry. Payload edits do not invalidate the build.
    pub fn get_mut(&mut self, key: Key) -> Option<&mut P> {
        self.entry_mut(key).map(|e| &mut e.payload)
    }

    /// Box of a live entry.
    pub fn aabb(&self, key: Key) -> Option<Aabb2D<T>> {
        self.entry(key).map(|e| e.aabb)
    }

    /// Iterate live entries in slot order. Works on unbuilt indexes.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Aabb2D<T>, &P)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.as_ref()
                .map(|e| (Key::new(i, e.generation), &e.aabb, &e.payload))
        })
    }

    /// Union of all live boxes, or `None` when empty. Works on unbuilt indexes.
    pub fn bbox(&self) -> Option<Aabb2D<T>> {
        self.iter().map(|(_, b, _)| *b).reduce(union_aabb)
    }

    /// Whether the backend reflects every edit made so far.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Rebuild the backend if any entry changed since the last build.
    pub fn ensure_built(&mut self) {
        if self.built {
            return;
        }
        let mut items: Vec<(usize, Aabb2D<T>)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e.aabb)))
            .collect();
        self.backend.build(&mut items);
        self.built = true;
    }

    /// Start a cursor over the entries admitted by `query`.
    ///
    /// Panics if the index has unbuilt edits; call [`IndexGeneric::ensure_built`] first.
    pub fn query(&self, query: Query<T>) -> QueryCursor<'_, T, P, B> {
        assert!(
            self.built,
            "index queried with pending edits; call ensure_built() first"
        );
        QueryCursor::new(&self.backend, &self.entries, query)
    }

    /// Convenience: entries whose AABB touches the given rectangle.
    pub fn query_rect(&self, rect: Aabb2D<T>) -> QueryCursor<'_, T, P, B> {
        self.query(Query::Touching(rect))
    }

    fn entry(&self, key: Key) -> Option<&Entry<T, P>> {
        let e = self.entries.get(key.idx())?.as_ref()?;
        (e.generation == key.1).then_some(e)
    }

    fn entry_mut(&mut self, key: Key) -> Option<&mut Entry<T, P>> {
        let e = self.entries.get_mut(key.idx())?.as_mut()?;
        if e.generation != key.1 {
            return None;
        }
        Some(e)
    }
}

/// Default index using a flat vector backend.
pub type Index<T, P> = IndexGeneric<T, P, crate::backends::flatvec::FlatVec<T>>;

impl<P> Index<f64, P> {
    /// Create an R-tree-backed index (f64 coordinates).
    pub fn with_rtree() -> IndexGeneric<f64, P, crate::backends::rtree::RTreeF64> {
        IndexGeneric::new()
    }
}

impl<P> Index<i64, P> {
    /// Create an i64 R-tree-backed index.
    pub fn with_rtree() -> IndexGeneric<i64, P, crate::backends::rtree::RTreeI64> {
        IndexGeneric::new()
    }
}

impl<P> Index<f32, P> {
    /// Create an R-tree-backed index (f32 coordinates).
    pub fn with_rtree() -> IndexGeneric<f32, P, crate::backends::rtree::RTreeF32> {
        IndexGeneric::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::rtree::RTree;
    use alloc::vec;

    #[test]
    fn insert_build_and_query() {
        let mut idx: Index<i64, u32> = Index::new();
        let k1 = idx.insert(Aabb2D::new(0, 0, 10, 10), 1);
        assert!(!idx.is_built());
        idx.ensure_built();
        idx.update(k1, Aabb2D::new(5, 5, 15, 15));
        assert!(!idx.is_built());
        idx.ensure_built();

        let hits: Vec<_> = idx.query_rect(Aabb2D::new(6, 6, 6, 6)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].1, 1);
    }

    #[test]
    fn removed_slot_is_reused_with_new_generation() {
        let mut idx: Index<i64, u32> = Index::new();
        let k = idx.insert(Aabb2D::new(0, 0, 10, 10), 1);
        assert_eq!(idx.remove(k), Some(1));
        assert_eq!(idx.remove(k), None, "stale keys are ignored");
        let k2 = idx.insert(Aabb2D::new(0, 0, 10, 10), 2);
        assert_eq!(k.idx(), k2.idx());
        assert_ne!(k, k2);
        assert!(idx.get(k).is_none());
        assert_eq!(idx.get(k2), Some(&2));
        idx.ensure_built();
        assert_eq!(idx.query(Query::All).count(), 1);
    }

    #[test]
    #[should_panic(expected = "ensure_built")]
    fn querying_unbuilt_index_panics() {
        let mut idx: Index<i64, u32> = Index::new();
        idx.insert(Aabb2D::new(0, 0, 1, 1), 0);
        let _ = idx.query(Query::All);
    }

    #[test]
    fn touching_and_overlapping_differ_on_shared_edges() {
        let mut idx = Index::<i64, &str>::with_rtree();
        idx.insert(Aabb2D::new(0, 0, 10, 10), "left");
        idx.insert(Aabb2D::new(10, 0, 20, 10), "right");
        idx.ensure_built();
        let q = Aabb2D::new(10, 2, 12, 4);
        let mut touching: Vec<_> = idx.query(Query::Touching(q)).map(|(_, p)| *p).collect();
        touching.sort_unstable();
        assert_eq!(touching, vec!["left", "right"]);
        let overlapping: Vec<_> = idx.query(Query::Overlapping(q)).map(|(_, p)| *p).collect();
        assert_eq!(overlapping, vec!["right"]);
    }

    #[test]
    fn skip_quad_drops_the_rest_of_a_leaf() {
        let mut idx: IndexGeneric<i64, usize, RTree<i64>> =
            IndexGeneric::with_backend(RTree::with_max_children(4));
        for i in 0..64_i64 {
            idx.insert(
                Aabb2D::<i64>::from_xywh(i * 10, 0, 5, 5),
                usize::try_from(i).unwrap(),
            );
        }
        idx.ensure_built();

        let mut cursor = idx.query(Query::All);
        let first_quad = cursor.quad_id().unwrap();
        let quad_box = cursor.quad_box().unwrap();
        let (_, b, _) = cursor.current().unwrap();
        assert_eq!(quad_box.union(b), quad_box);
        cursor.skip_quad();
        assert_ne!(cursor.quad_id(), Some(first_quad));

        let mut visited = 0;
        let mut cursor = idx.query(Query::All);
        while !cursor.at_end() {
            visited += 1;
            cursor.skip_quad();
        }
        assert_eq!(visited, 16, "64 items in leaves of 4");
    }

    #[test]
    fn flatvec_is_a_single_quad() {
        let mut idx: Index<f64, u8> = Index::new();
        idx.insert(Aabb2D::new(0.0, 0.0, 1.0, 1.0), 0);
        idx.insert(Aabb2D::new(5.0, 5.0, 6.0, 6.0), 1);
        idx.ensure_built();
        let mut cursor = idx.query(Query::All);
        assert_eq!(cursor.quad_box(), Some(Aabb2D::new(0.0, 0.0, 6.0, 6.0)));
        cursor.skip_quad();
        assert!(cursor.at_end());
        assert_eq!(idx.bbox(), Some(Aabb2D::new(0.0, 0.0, 6.0, 6.0)));
    }
}
