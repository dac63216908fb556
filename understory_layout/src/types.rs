// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public handle types and flags.

use alloc::string::String;

/// Identifier of a cell inside a [`Layout`](crate::Layout).
///
/// Cells are never removed, so a `CellId` stays valid for the lifetime of its layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) u32);

impl CellId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "CellId uses 32-bit indices by design."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    /// Position of the cell in its layout's cell table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a layer inside a [`Layout`](crate::Layout).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "LayerId uses 32-bit indices by design."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    /// Position of the layer in its layout's layer table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a property set attached to shapes.
///
/// The layout does not interpret property sets; it only compares ids.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PropertiesId(pub u32);

/// Description of a layer: a stream layer/datatype pair plus an optional name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    /// Layer number.
    pub layer: i16,
    /// Datatype number.
    pub datatype: i16,
    /// Optional display name.
    pub name: Option<String>,
}

impl LayerInfo {
    /// Layer/datatype pair without a name.
    pub const fn new(layer: i16, datatype: i16) -> Self {
        Self {
            layer,
            datatype,
            name: None,
        }
    }

    /// The same layer with a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

bitflags::bitflags! {
    /// Shape classes, used to filter shape queries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ShapeTypes: u8 {
        /// Axis-aligned boxes.
        const BOXES    = 0b0000_0001;
        /// Polygons.
        const POLYGONS = 0b0000_0010;
        /// Paths (centerline plus width).
        const PATHS    = 0b0000_0100;
        /// Text labels.
        const TEXTS    = 0b0000_1000;
    }
}

impl Default for ShapeTypes {
    fn default() -> Self {
        Self::all()
    }
}
