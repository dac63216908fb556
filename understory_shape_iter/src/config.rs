// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Iteration parameters.

use kurbo::{Affine, Rect};
use smallvec::SmallVec;
use understory_layout::{LayerId, PropertyFilter, ShapeTypes};

use crate::region::{BoxRegion, ComplexRegion, Overlap};
use crate::selection::SelectionSet;

/// Everything that determines which shapes an iteration yields.
///
/// A configuration is a plain value: cursors are built from it by
/// [`build_cursor`](crate::build_cursor) and keep their own copy.
///
/// Regions are given in the coordinate space reported by the iteration, that is
/// after the global transform.
#[derive(Clone, Debug)]
pub struct IterConfig {
    pub(crate) region: BoxRegion,
    pub(crate) complex: Option<ComplexRegion>,
    pub(crate) min_depth: usize,
    pub(crate) max_depth: usize,
    pub(crate) layers: SmallVec<[LayerId; 4]>,
    pub(crate) shape_types: ShapeTypes,
    pub(crate) properties: Option<PropertyFilter>,
    pub(crate) overlap: Overlap,
    pub(crate) selection: SelectionSet,
    pub(crate) global_trans: Affine,
}

impl Default for IterConfig {
    fn default() -> Self {
        Self {
            region: BoxRegion::World,
            complex: None,
            min_depth: 0,
            max_depth: usize::MAX,
            layers: SmallVec::new(),
            shape_types: ShapeTypes::all(),
            properties: None,
            overlap: Overlap::Touching,
            selection: SelectionSet::new(),
            global_trans: Affine::IDENTITY,
        }
    }
}

impl IterConfig {
    /// Configuration over the given layers with every other parameter at its default.
    pub fn new(layers: impl IntoIterator<Item = LayerId>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Restrict the iteration to a box.
    #[must_use]
    pub fn with_region(mut self, region: Rect) -> Self {
        self.region = BoxRegion::rect(region);
        self
    }

    /// Restrict the iteration to a complex region.
    #[must_use]
    pub fn with_complex_region(mut self, region: ComplexRegion) -> Self {
        self.complex = Some(region);
        self
    }

    /// Deepest level shapes and instances are taken from; the root is level 0.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Shallowest level shapes are taken from.
    #[must_use]
    pub fn with_min_depth(mut self, depth: usize) -> Self {
        self.min_depth = depth;
        self
    }

    /// Shape classes to report.
    #[must_use]
    pub fn with_shape_types(mut self, types: ShapeTypes) -> Self {
        self.shape_types = types;
        self
    }

    /// Property predicate shapes must pass.
    #[must_use]
    pub fn with_property_filter(mut self, filter: PropertyFilter) -> Self {
        self.properties = Some(filter);
        self
    }

    /// Touching or overlapping selection.
    #[must_use]
    pub fn with_overlap(mut self, overlap: Overlap) -> Self {
        self.overlap = overlap;
        self
    }

    /// Subtree activation overrides.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionSet) -> Self {
        self.selection = selection;
        self
    }

    /// Transform applied on top of every reported transform.
    #[must_use]
    pub fn with_global_trans(mut self, trans: Affine) -> Self {
        self.global_trans = trans;
        self
    }

    /// The box region.
    pub fn region(&self) -> BoxRegion {
        self.region
    }

    /// The complex region, if any.
    pub fn complex_region(&self) -> Option<&ComplexRegion> {
        self.complex.as_ref()
    }

    /// Shallowest level shapes are taken from.
    pub fn min_depth(&self) -> usize {
        self.min_depth
    }

    /// Deepest level visited.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Layers visited, in order.
    pub fn layers(&self) -> &[LayerId] {
        &self.layers
    }

    /// Shape classes reported.
    pub fn shape_types(&self) -> ShapeTypes {
        self.shape_types
    }

    /// Property predicate, if any.
    pub fn property_filter(&self) -> Option<&PropertyFilter> {
        self.properties.as_ref()
    }

    /// Touching or overlapping selection.
    pub fn overlap(&self) -> Overlap {
        self.overlap
    }

    /// Activation overrides.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Global transform.
    pub fn global_trans(&self) -> Affine {
        self.global_trans
    }

    /// Index query for the configured box region in reported coordinates.
    pub(crate) fn root_query(&self) -> Option<understory_index::Query<f64>> {
        let region = match (self.region, self.complex.as_ref()) {
            (r, Some(c)) => match c.bbox() {
                Some(b) => r.intersect(b),
                None => BoxRegion::Empty,
            },
            (r, None) => r,
        };
        region.query(self.overlap)
    }
}
