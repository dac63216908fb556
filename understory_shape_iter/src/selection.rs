// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explicit subtree activation.

use hashbrown::HashSet;
use understory_layout::CellId;

/// Cells that force their subtree active (`start`) or inactive (`stop`).
///
/// The two sets are kept disjoint. A cell in neither set inherits the activation
/// of the level it is entered from; the iteration root is active unless listed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    start: HashSet<CellId>,
    stop: HashSet<CellId>,
}

impl SelectionSet {
    /// Empty selection: everything active.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the subtrees of `ids` active.
    pub fn select(&mut self, ids: impl IntoIterator<Item = CellId>) {
        for id in ids {
            self.stop.remove(&id);
            self.start.insert(id);
        }
    }

    /// Force the subtrees of `ids` inactive.
    pub fn unselect(&mut self, ids: impl IntoIterator<Item = CellId>) {
        for id in ids {
            self.start.remove(&id);
            self.stop.insert(id);
        }
    }

    /// Clear the stop set and list every id in `all` as a start cell.
    pub fn select_all(&mut self, all: impl IntoIterator<Item = CellId>) {
        self.stop.clear();
        self.start.extend(all);
    }

    /// Clear the start set and list every id in `all` as a stop cell.
    pub fn unselect_all(&mut self, all: impl IntoIterator<Item = CellId>) {
        self.start.clear();
        self.stop.extend(all);
    }

    /// Forget every override.
    pub fn reset(&mut self) {
        self.start.clear();
        self.stop.clear();
    }

    /// True without overrides.
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty()
    }

    /// Forced activation of `cell`, if any.
    pub fn override_for(&self, cell: CellId) -> Option<bool> {
        if self.start.contains(&cell) {
            Some(true)
        } else if self.stop.contains(&cell) {
            Some(false)
        } else {
            None
        }
    }

    /// Activation of `cell` entered from a level with activation `inherited`.
    pub fn activation(&self, cell: CellId, inherited: bool) -> bool {
        self.override_for(cell).unwrap_or(inherited)
    }
}
