// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed R-tree backend generic over scalar `T: Scalar`.

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

use crate::backend::{Backend, Children, NodeIdx, NodeRef};
use crate::types::{Aabb2D, Scalar, union_aabb};

/// R-tree backend bulk-loaded with a sort-tile-recursive (STR) pass.
///
/// Every leaf holds at most `max_children` items, so a leaf is a compact
/// group of nearby boxes: a good "quad" for cursors that skip whole groups.
pub struct RTree<T: Scalar> {
    max_children: usize,
    root: Option<NodeIdx>,
    arena: Vec<RNode<T>>,
}

#[derive(Clone)]
struct RNode<T: Scalar> {
    bbox: Aabb2D<T>,
    kids: RKids<T>,
}

#[derive(Clone)]
enum RKids<T: Scalar> {
    Nodes(Vec<NodeIdx>),
    Items(Vec<(usize, Aabb2D<T>)>),
}

impl<T: Scalar> Default for RTree<T> {
    fn default() -> Self {
        Self::with_max_children(8)
    }
}

impl<T: Scalar> RTree<T> {
    /// Create an empty tree whose nodes hold at most `max_children` entries.
    pub fn with_max_children(max_children: usize) -> Self {
        assert!(max_children >= 2, "R-tree fan-out must be at least 2");
        Self {
            max_children,
            root: None,
            arena: Vec::new(),
        }
    }

    /// Number of leaves (quads) in the current build.
    pub fn leaf_count(&self) -> usize {
        self.arena
            .iter()
            .filter(|n| matches!(n.kids, RKids::Items(_)))
            .count()
    }

    #[inline]
    fn ceil_div(a: usize, b: usize) -> usize {
        a.div_ceil(b)
    }

    fn centroid_x_of_aabb(a: &Aabb2D<T>) -> T {
        Scalar::mid(a.min_x, a.max_x)
    }

    fn centroid_y_of_aabb(a: &Aabb2D<T>) -> T {
        Scalar::mid(a.min_y, a.max_y)
    }

    fn cmp_t(a: T, b: T) -> Ordering {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }

    fn bbox_of_items(items: &[(usize, Aabb2D<T>)]) -> Aabb2D<T> {
        let mut it = items.iter().map(|(_, b)| *b);
        let first = it.next().unwrap_or_else(|| {
            let z = T::zero();
            Aabb2D::new(z, z, z, z)
        });
        it.fold(first, union_aabb)
    }

    fn bbox_of_nodes(arena: &[RNode<T>], nodes: &[NodeIdx]) -> Aabb2D<T> {
        let mut it = nodes.iter().map(|i| arena[i.get()].bbox);
        let first = it.next().unwrap_or_else(|| {
            let z = T::zero();
            Aabb2D::new(z, z, z, z)
        });
        it.fold(first, union_aabb)
    }

    /// Smallest `g` with `g * g >= n`: the number of vertical slices of an STR pass.
    fn slice_count(n: usize) -> usize {
        let mut g = 1_usize;
        while g * g < n {
            g += 1;
        }
        g
    }

    /// STR bulk builder: creates a packed tree from items in one pass into `arena`.
    fn bulk_build_nodes(
        arena: &mut Vec<RNode<T>>,
        items: &mut [(usize, Aabb2D<T>)],
        max_children: usize,
    ) -> Option<NodeIdx> {
        if items.is_empty() {
            return None;
        }

        // Leaf level: slice by x centroid, then pack runs sorted by y centroid.
        let n = items.len();
        let gx = Self::slice_count(Self::ceil_div(n, max_children));
        items.sort_by(|a, b| {
            Self::cmp_t(
                Self::centroid_x_of_aabb(&a.1),
                Self::centroid_x_of_aabb(&b.1),
            )
        });
        let slice_size = Self::ceil_div(n, gx);
        let mut level: Vec<NodeIdx> = Vec::new();
        for slice in items.chunks_mut(slice_size) {
            slice.sort_by(|a, b| {
                Self::cmp_t(
                    Self::centroid_y_of_aabb(&a.1),
                    Self::centroid_y_of_aabb(&b.1),
                )
            });
            for chunk in slice.chunks(max_children) {
                let bbox = Self::bbox_of_items(chunk);
                level.push(NodeIdx::new(arena.len()));
                arena.push(RNode {
                    bbox,
                    kids: RKids::Items(chunk.to_vec()),
                });
            }
        }

        // Promote until a single root remains.
        while level.len() > max_children {
            let n_nodes = level.len();
            let gx = Self::slice_count(Self::ceil_div(n_nodes, max_children));
            level.sort_by(|a, b| {
                Self::cmp_t(
                    Self::centroid_x_of_aabb(&arena[a.get()].bbox),
                    Self::centroid_x_of_aabb(&arena[b.get()].bbox),
                )
            });
            let slice_size = Self::ceil_div(n_nodes, gx);
            let mut next: Vec<NodeIdx> = Vec::new();
            for slice in level.chunks_mut(slice_size) {
                slice.sort_by(|a, b| {
                    Self::cmp_t(
                        Self::centroid_y_of_aabb(&arena[a.get()].bbox),
                        Self::centroid_y_of_aabb(&arena[b.get()].bbox),
                    )
                });
                for chunk in slice.chunks(max_children) {
                    let bbox = Self::bbox_of_nodes(arena, chunk);
                    next.push(NodeIdx::new(arena.len()));
                    arena.push(RNode {
                        bbox,
                        kids: RKids::Nodes(chunk.to_vec()),
                    });
                }
            }
            level = next;
        }

        if level.len() == 1 {
            Some(level[0])
        } else {
            // Pack remaining nodes under a new root.
            let bbox = Self::bbox_of_nodes(arena, &level);
            let root = NodeIdx::new(arena.len());
            arena.push(RNode {
                bbox,
                kids: RKids::Nodes(level),
            });
            Some(root)
        }
    }
}

impl<T: Scalar> Backend<T> for RTree<T> {
    fn build(&mut self, items: &mut [(usize, Aabb2D<T>)]) {
        self.arena.clear();
        self.root = Self::bulk_build_nodes(&mut self.arena, items, self.max_children);
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
    }

    fn root(&self) -> Option<NodeIdx> {
        self.root
    }

    fn node(&self, idx: NodeIdx) -> NodeRef<'_, T> {
        let n = &self.arena[idx.get()];
        NodeRef {
            bbox: n.bbox,
            children: match &n.kids {
                RKids::Nodes(v) => Children::Nodes(v),
                RKids::Items(v) => Children::Items(v),
            },
        }
    }
}

impl<T: Scalar> Debug for RTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("max_children", &self.max_children)
            .field("arena_nodes", &self.arena.len())
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}

/// Convenience type aliases.
/// R-tree with i64 coordinates.
pub type RTreeI64 = RTree<i64>;

/// R-tree with f32 coordinates.
pub type RTreeF32 = RTree<f32>;

/// R-tree with f64 coordinates.
pub type RTreeF64 = RTree<f64>;
