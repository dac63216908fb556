// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_shape_iter --heading-base-level=0

//! Understory Shape Iter: lazy, region-clipped iteration over layout hierarchies.
//!
//! [`RecursiveShapeIter`] walks the shapes of a cell from an
//! [`understory_layout::Layout`] and of every cell placed in it, depth first,
//! yielding each shape with its owning cell, layer, depth and the transform that
//! places it in the root's coordinates.
//!
//! - Restrict the walk to a box with [`RecursiveShapeIter::set_region`], or to a
//!   polygonal [`ComplexRegion`] built by [`ComplexRegionBuilder`] from a
//!   rectangle with holes or a union of polygons.
//! - Bound the walk with minimum and maximum depths, pick layers, shape classes
//!   ([`understory_layout::ShapeTypes`]) and a property predicate.
//! - Switch whole subtrees on or off with a [`SelectionSet`]: a cell listed as a
//!   start cell is active with its subtree, a stop cell is inactive, and every
//!   other cell inherits from the level it is entered from.
//!
//! Each level keeps the region in its own coordinates, derived from the parent
//! level on the way down. Placements whose target has nothing on the selected
//! layers are never entered, and index nodes outside a complex region are
//! skipped whole.
//!
//! ## Configuration and cursors
//!
//! An [`IterConfig`] is a plain value. [`build_cursor`] turns it and a [`Source`]
//! into a [`Cursor`], either a flat cursor over one shape container or a
//! hierarchical one; both implement [`Traversal`]. [`RecursiveShapeIter`] holds a
//! configuration and rebuilds its cursor lazily after every setter.
//!
//! ## Minimal usage
//!
//! ```
//! use kurbo::{Affine, Rect};
//! use understory_layout::{Instance, LayerInfo, Layout, Polygon, Shape};
//! use understory_shape_iter::RecursiveShapeIter;
//!
//! let mut layout = Layout::new();
//! let metal = layout.add_layer(LayerInfo::new(1, 0));
//! let top = layout.add_cell("TOP").unwrap();
//! let pad = layout.add_cell("PAD").unwrap();
//! layout.cell_mut(pad).insert_shape(metal, Shape::rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
//! layout.cell_mut(top).insert_instance(Instance::new(pad, Affine::translate((0.0, 0.0))));
//! layout.cell_mut(top).insert_instance(Instance::new(pad, Affine::translate((50.0, 50.0))));
//! layout.ensure_built().unwrap();
//!
//! let mut iter = RecursiveShapeIter::new(&layout, top, metal);
//! assert_eq!(iter.by_ref().count(), 2);
//!
//! // Everything in the window except a hole around the second pad.
//! let hole = Polygon::from_rect(Rect::new(40.0, 40.0, 70.0, 70.0));
//! iter.set_region_excluding(Rect::new(0.0, 0.0, 100.0, 100.0), &[hole]).unwrap();
//! let hits: Vec<_> = iter.collect();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].trans, Affine::translate((0.0, 0.0)));
//! ```
//!
//! ## Threads
//!
//! Iterators only read the layout. Build the layout once with
//! `Layout::ensure_built`, then any number of iterators may walk it, from any
//! number of threads.

#![no_std]

extern crate alloc;

mod boolean;
mod config;
mod cursor;
mod iter;
mod region;
mod selection;

pub use boolean::{BooleanError, BooleanOp, PlanarBoolean, ScanlineBoolean, Trapezoid};
pub use config::IterConfig;
pub use cursor::{Cursor, FlatCursor, HierCursor, InstElement, Source, Traversal, build_cursor};
pub use iter::{RecursiveShapeIter, ShapeHit};
pub use region::{BoxRegion, ComplexRegion, ComplexRegionBuilder, Overlap, TileIndex};
pub use selection::SelectionSet;
