// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Forward query cursor with quad access.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::{Backend, Children, NodeIdx};
use crate::index::{Entry, Key};
use crate::types::{Aabb2D, Query};

/// Identity of a leaf node ("quad") of a built index.
///
/// Quad ids are only meaningful for the build they came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadId(pub usize);

/// A forward-only cursor over the entries of an index that pass a [`Query`].
///
/// Besides the usual "current / advance" protocol the cursor exposes the leaf
/// ("quad") it is currently positioned in: [`QueryCursor::quad_box`] gives a box
/// enclosing every remaining member of that leaf, and [`QueryCursor::skip_quad`]
/// drops them without testing each one. Callers with an extra, more expensive
/// predicate can reject a whole quad with one test.
///
/// Visiting order is the backend's build order; it is stable for a given build
/// but is not part of the contract.
pub struct QueryCursor<'a, T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    backend: &'a B,
    entries: &'a [Option<Entry<T, P>>],
    query: Query<T>,
    stack: Vec<NodeIdx>,
    leaf: Option<(NodeIdx, &'a [(usize, Aabb2D<T>)])>,
    pos: usize,
}

impl<'a, T, P, B> QueryCursor<'a, T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    pub(crate) fn new(backend: &'a B, entries: &'a [Option<Entry<T, P>>], query: Query<T>) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = backend.root() {
            stack.push(root);
        }
        let mut cursor = Self {
            backend,
            entries,
            query,
            stack,
            leaf: None,
            pos: 0,
        };
        cursor.settle();
        cursor
    }

    /// The query this cursor was started with.
    pub fn query(&self) -> Query<T> {
        self.query
    }

    /// True once every admitted entry has been visited.
    pub fn at_end(&self) -> bool {
        self.leaf.is_none()
    }

    /// The current entry, or `None` at the end.
    pub fn current(&self) -> Option<(Key, &'a Aabb2D<T>, &'a P)> {
        let (_, items) = self.leaf?;
        let (slot, _) = items[self.pos];
        let e = self.entries[slot]
            .as_ref()
            .expect("index entry vanished while built");
        Some((Key::new(slot, e.generation), &e.aabb, &e.payload))
    }

    /// Move to the next admitted entry.
    pub fn advance(&mut self) {
        if self.leaf.is_some() {
            self.pos += 1;
            self.settle();
        }
    }

    /// Identity of the current quad; `None` at the end.
    pub fn quad_id(&self) -> Option<QuadId> {
        self.leaf.map(|(n, _)| QuadId(n.get()))
    }

    /// Box enclosing every member of the current quad; `None` at the end.
    pub fn quad_box(&self) -> Option<Aabb2D<T>> {
        self.leaf.map(|(n, _)| self.backend.node(n).bbox)
    }

    /// Drop the remaining members of the current quad and move to the first
    /// admitted entry of the next one.
    pub fn skip_quad(&mut self) {
        if let Some((_, items)) = self.leaf {
            self.pos = items.len();
            self.settle();
        }
    }

    fn settle(&mut self) {
        loop {
            if let Some((_, items)) = self.leaf {
                while self.pos < items.len() {
                    if self.query.admits(&items[self.pos].1) {
                        return;
                    }
                    self.pos += 1;
                }
                self.leaf = None;
            }
            if !self.next_leaf() {
                return;
            }
        }
    }

    fn next_leaf(&mut self) -> bool {
        while let Some(idx) = self.stack.pop() {
            let node = self.backend.node(idx);
            if !self.query.admits(&node.bbox) {
                continue;
            }
            match node.children {
                Children::Nodes(children) => {
                    // Reverse so that children are visited in build order.
                    self.stack.extend(children.iter().rev().copied());
                }
                Children::Items(items) => {
                    self.leaf = Some((idx, items));
                    self.pos = 0;
                    return true;
                }
            }
        }
        false
    }
}

impl<'a, T, P, B> Iterator for QueryCursor<'a, T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    type Item = (Key, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, _, payload) = self.current()?;
        self.advance();
        Some((key, payload))
    }
}

impl<T, P, B> Clone for QueryCursor<'_, T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
            entries: self.entries,
            query: self.query,
            stack: self.stack.clone(),
            leaf: self.leaf,
            pos: self.pos,
        }
    }
}

impl<T, P, B> Debug for QueryCursor<'_, T, P, B>
where
    T: Copy + PartialOrd + Debug,
    B: Backend<T>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueryCursor")
            .field("query", &self.query)
            .field("quad", &self.quad_id())
            .field("pos", &self.pos)
            .field("pending_nodes", &self.stack.len())
            .finish_non_exhaustive()
    }
}
