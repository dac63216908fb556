// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: a single leaf holding every item (small, simple).
//! - `rtree`: generic packed R-tree (`T: Scalar`) (aliases: `RTreeI64`, `RTreeF32`, `RTreeF64`).
//!
//! STR note
//! --------
//! The R-tree is bulk-loaded with a sort-tile-recursive pass: items are sorted by
//! x centroid, cut into `ceil(sqrt(n / M))` vertical slices, each slice is sorted by
//! y centroid and packed into leaves of `M` items. Parents are packed the same way
//! until a single root remains. Builds are `O(n log n)` and leaves end up spatially
//! compact, which is what quad skipping in [`QueryCursor`](crate::QueryCursor) relies on.

pub mod flatvec;
pub mod rtree;
