// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial indexing implementations.
//!
//! A backend is a packed hierarchy of nodes built in one pass from `(slot, box)`
//! pairs. Leaf nodes are the "quads" exposed by [`QueryCursor`](crate::QueryCursor):
//! a cursor can report the box of the leaf it is currently inside and drop the
//! rest of that leaf without testing its members.

use crate::types::Aabb2D;
use core::fmt::Debug;

/// Handle of a node inside a backend's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub(crate) usize);

impl NodeIdx {
    /// Wrap a raw arena position.
    pub const fn new(i: usize) -> Self {
        Self(i)
    }

    /// The raw arena position.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Children of a backend node.
#[derive(Copy, Clone, Debug)]
pub enum Children<'a, T> {
    /// Interior node: child nodes.
    Nodes(&'a [NodeIdx]),
    /// Leaf node: `(slot, box)` items.
    Items(&'a [(usize, Aabb2D<T>)]),
}

/// Borrowed view of one backend node.
#[derive(Copy, Clone, Debug)]
pub struct NodeRef<'a, T> {
    /// Box enclosing every item below this node.
    pub bbox: Aabb2D<T>,
    /// Child nodes or leaf items.
    pub children: Children<'a, T>,
}

/// Spatial backend abstraction used by `IndexGeneric`.
pub trait Backend<T: Copy + PartialOrd + Debug> {
    /// Rebuild the structure from scratch out of `(slot, box)` pairs.
    ///
    /// Backends may reorder `items`.
    fn build(&mut self, items: &mut [(usize, Aabb2D<T>)]);

    /// Clear all spatial structures.
    fn clear(&mut self);

    /// Root node, or `None` when nothing was built.
    fn root(&self) -> Option<NodeIdx>;

    /// Access a node; panics if `idx` does not belong to this backend.
    fn node(&self, idx: NodeIdx) -> NodeRef<'_, T>;
}
