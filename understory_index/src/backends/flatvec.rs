// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector backend with linear scans. Small and simple; good for tiny sets.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::{Backend, Children, NodeIdx, NodeRef};
use crate::types::{Aabb2D, Scalar, union_aabb};

/// Flat vector backend: every item lives in one leaf, so the whole set is a single quad.
pub struct FlatVec<T: Scalar> {
    items: Vec<(usize, Aabb2D<T>)>,
    bbox: Option<Aabb2D<T>>,
}

impl<T: Scalar> Default for FlatVec<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            bbox: None,
        }
    }
}

impl<T: Scalar> Debug for FlatVec<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlatVec")
            .field("items", &self.items.len())
            .field("bbox", &self.bbox)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar> Backend<T> for FlatVec<T> {
    fn build(&mut self, items: &mut [(usize, Aabb2D<T>)]) {
        self.items.clear();
        self.items.extend_from_slice(items);
        self.bbox = items
            .iter()
            .map(|(_, b)| *b)
            .reduce(|acc, b| union_aabb(acc, b));
    }

    fn clear(&mut self) {
        self.items.clear();
        self.bbox = None;
    }

    fn root(&self) -> Option<NodeIdx> {
        self.bbox.map(|_| NodeIdx::new(0))
    }

    fn node(&self, idx: NodeIdx) -> NodeRef<'_, T> {
        assert_eq!(idx.get(), 0, "FlatVec has a single node");
        let zero = T::zero();
        NodeRef {
            bbox: self.bbox.unwrap_or(Aabb2D::new(zero, zero, zero, zero)),
            children: Children::Items(&self.items),
        }
    }
}
