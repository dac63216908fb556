// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by layout edits and builds.

use alloc::string::String;
use core::fmt;

use crate::types::CellId;

/// Error returned by [`Layout`](crate::Layout) operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A cell with this name already exists.
    DuplicateCellName(String),
    /// An instance in `parent` refers to a cell that does not exist.
    UnknownCell {
        /// Cell holding the instance.
        parent: CellId,
        /// The missing target.
        target: CellId,
    },
    /// The hierarchy contains a cycle through `cell`.
    Recursive {
        /// A cell on the cycle.
        cell: CellId,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCellName(name) => write!(f, "a cell named {name:?} already exists"),
            Self::UnknownCell { parent, target } => write!(
                f,
                "cell {} instantiates unknown cell {}",
                parent.index(),
                target.index()
            ),
            Self::Recursive { cell } => {
                write!(f, "cell {} is part of a recursive hierarchy", cell.index())
            }
        }
    }
}

impl core::error::Error for LayoutError {}
