// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_layout --heading-base-level=0

//! Understory Layout: a Kurbo-native hierarchical layout database.
//!
//! Understory Layout stores geometric design data the way chip and mask layouts
//! are organized: named cells holding shapes on numbered layers, plus placements
//! ("instances") of other cells, optionally repeated as regular arrays.
//!
//! - Shapes live in per-cell, per-layer [`Shapes`] containers backed by an
//!   [`understory_index`] R-tree, queryable with touching or overlapping semantics
//!   and filtered by [`ShapeTypes`] and a [`PropertyFilter`].
//! - Placements live in per-cell [`Instances`] containers whose index holds the
//!   bounding box of every placed array.
//! - [`Layout::ensure_built`] validates the hierarchy (unknown targets and
//!   recursion are reported as [`LayoutError`]), computes per-layer cell bounding
//!   boxes bottom-up and builds every index in one pass.
//!
//! Hierarchical traversal with region clipping lives in `understory_shape_iter`;
//! this crate only provides the data and its indexes.
//!
//! ## Building is explicit
//!
//! Edits go through [`Layout::cell_mut`] and mark the layout unbuilt. Queries on
//! unbuilt containers panic, so call [`Layout::ensure_built`] once after editing
//! and before sharing the layout with readers. A built layout is only read, so
//! several readers may walk it from different threads.
//!
//! ## Minimal usage
//!
//! ```
//! use kurbo::{Affine, Rect};
//! use understory_layout::{Instance, LayerInfo, Layout, Shape, ShapeTypes};
//!
//! let mut layout = Layout::new();
//! let metal = layout.add_layer(LayerInfo::new(1, 0));
//! let top = layout.add_cell("TOP").unwrap();
//! let via = layout.add_cell("VIA").unwrap();
//!
//! layout
//!     .cell_mut(via)
//!     .insert_shape(metal, Shape::rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
//! layout
//!     .cell_mut(top)
//!     .insert_instance(Instance::new(via, Affine::translate((100.0, 100.0))));
//! layout.ensure_built().unwrap();
//!
//! let cell = layout.cell(top);
//! assert_eq!(cell.bbox_on(metal), Some(Rect::new(100.0, 100.0, 105.0, 105.0)));
//!
//! let shapes = layout.cell(via).shapes(metal).unwrap();
//! let hits = shapes.begin_touching(Rect::new(5.0, 5.0, 6.0, 6.0), ShapeTypes::all(), None);
//! assert_eq!(hits.count(), 1);
//! ```
//!
//! ## Coordinates
//!
//! Coordinates are `f64` and assumed finite. Cell bounding boxes under rotated
//! placements are conservative (the box of the transformed box).

#![no_std]

extern crate alloc;

mod cell;
mod error;
mod instance;
mod instances;
mod layout;
mod shape;
mod shapes;
mod types;
pub mod util;

pub use cell::Cell;
pub use error::LayoutError;
pub use instance::{ArrayIter, ArrayMember, Instance, Repetition};
pub use instances::{InstCursor, InstId, Instances};
pub use layout::Layout;
pub use shape::{Geometry, Polygon, PropertyFilter, Shape};
pub use shapes::{ShapeCursor, ShapeId, Shapes};
pub use types::{CellId, LayerId, LayerInfo, PropertiesId, ShapeTypes};
