// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout output: node positions and the overall bounding box.

use kurbo::{Point, Rect};
use rustc_hash::FxHashMap;

use canopy_hierarchy::TaxonId;

/// The positioned tree.
///
/// Positions are node centers in layout units, translated so the bounding
/// box origin sits at (0, 0). Coordinates are plain floating point; any
/// rounding or quantization is a renderer concern and never happens here.
#[derive(Clone, Default)]
pub struct Layout {
    /// Center position per node id.
    pub positions: FxHashMap<TaxonId, Point>,
    /// Bounding box of all rendered node extents. `Rect::ZERO` when empty.
    pub bounds: Rect,
}

impl core::fmt::Debug for Layout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Layout")
            .field("nodes", &self.positions.len())
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl Layout {
    /// Position of a node, if it was laid out.
    pub fn position(&self, id: TaxonId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    /// True when nothing was laid out.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
