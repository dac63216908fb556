// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_index --heading-base-level=0

//! Understory Index: a generic 2D AABB index with quad-aware cursors.
//!
//! Understory Index is a reusable building block for spatial queries.
//!
//! - Insert, update, and remove axis-aligned bounding boxes (AABBs) with user payloads.
//! - Rebuild the spatial structure in bulk with [`IndexGeneric::ensure_built`].
//! - Query with "touching" (closed) or "overlapping" (positive extent) semantics.
//! - Walk results with a [`QueryCursor`] that exposes the leaf ("quad") it is in, so
//!   callers can reject a whole group of nearby boxes with one test.
//!
//! It is generic over the scalar type `T` and does not depend on any geometry crate.
//! Higher layers (like a layout database) compute boxes and feed them here.
//!
//! Backends are pluggable via a simple trait so you can swap the spatial strategy without API churn.
//! The default backend is a flat vector (one leaf). The R-tree backend is bulk-loaded
//! with a sort-tile-recursive pass and is generic over the scalar.
//!
//! # Example
//!
//! ```rust
//! use understory_index::{Aabb2D, Index, Query};
//!
//! let mut idx = Index::<i64, u32>::with_rtree();
//! let k1 = idx.insert(Aabb2D::new(0, 0, 10, 10), 1);
//! let _k2 = idx.insert(Aabb2D::new(10, 0, 20, 10), 2);
//! idx.ensure_built();
//!
//! // Both boxes touch x = 10, only the second one overlaps a box right of it.
//! assert_eq!(idx.query(Query::Touching(Aabb2D::new(10, 2, 12, 4))).count(), 2);
//! assert_eq!(idx.query(Query::Overlapping(Aabb2D::new(10, 2, 12, 4))).count(), 1);
//!
//! // Edits invalidate the build until the next `ensure_built`.
//! idx.update(k1, Aabb2D::new(100, 0, 110, 10));
//! assert!(!idx.is_built());
//! idx.ensure_built();
//! ```
//!
//! Skipping whole quads:
//!
//! ```rust
//! use understory_index::{Aabb2D, Index, Query};
//!
//! let mut idx = Index::<f64, usize>::with_rtree();
//! for i in 0..100 {
//!     idx.insert(Aabb2D::<f64>::from_xywh(i as f64 * 10.0, 0.0, 5.0, 5.0), i);
//! }
//! idx.ensure_built();
//!
//! let keep_out = Aabb2D::new(0.0, 0.0, 500.0, 10.0);
//! let mut cursor = idx.query(Query::All);
//! let mut kept = 0;
//! while !cursor.at_end() {
//!     let quad = cursor.quad_box().unwrap();
//!     if quad.min_x >= keep_out.min_x && quad.max_x <= keep_out.max_x {
//!         cursor.skip_quad();
//!         continue;
//!     }
//!     kept += 1;
//!     cursor.advance();
//! }
//! assert!(kept >= 49);
//! ```
//!
//! ## Choosing a backend
//!
//! - `FlatVec` (default): simplest and smallest; a single quad, linear scans. Good for very
//!   small sets.
//! - `RTreeF32`/`RTreeF64`/`RTreeI64`: packed R-tree; good general-purpose index for sets that
//!   are built once and queried many times.
//!   See the [`backends`] docs for a brief STR overview.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod cursor;
pub mod index;
pub mod types;

pub use backend::{Backend, Children, NodeIdx, NodeRef};
pub use backends::flatvec::FlatVec;
pub use backends::rtree::{RTree, RTreeF32, RTreeF64, RTreeI64};
pub use cursor::{QuadId, QueryCursor};
pub use index::{Index, IndexGeneric, Key};
pub use types::{Aabb2D, Query, Scalar};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn query_after_remove_and_rebuild() {
        let mut idx = Index::<i64, u32>::with_rtree();
        let keys: Vec<Key> = (0..20)
            .map(|i| {
                idx.insert(
                    Aabb2D::<i64>::from_xywh(i * 3, 0, 2, 2),
                    u32::try_from(i).unwrap(),
                )
            })
            .collect();
        idx.ensure_built();
        for k in keys.iter().step_by(2) {
            idx.remove(*k);
        }
        idx.ensure_built();
        let mut found: Vec<u32> = idx.query(Query::All).map(|(_, p)| *p).collect();
        found.sort_unstable();
        assert_eq!(found, (1..20).step_by(2).collect::<Vec<_>>());
    }

    #[test]
    fn cursor_reports_entry_boxes() {
        let mut idx: Index<i64, u32> = Index::new();
        let k = idx.insert(Aabb2D::new(1, 2, 3, 4), 7);
        idx.ensure_built();
        let cursor = idx.query(Query::Touching(Aabb2D::new(0, 0, 1, 2)));
        let (key, aabb, payload) = cursor.current().unwrap();
        assert_eq!(key, k);
        assert_eq!(*aabb, Aabb2D::new(1, 2, 3, 4));
        assert_eq!(*payload, 7);
    }
}
