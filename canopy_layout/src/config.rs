// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout configuration and the node sizing seam.

use canopy_hierarchy::TaxonNode;

/// Spacing configuration, in layout units.
///
/// All three values are inputs, not algorithm constants. Gaps are measured
/// between the facing edges of two nodes' rendered boxes: the actual
/// center-to-center separation additionally includes half of each node's
/// width, so variably sized nodes never overlap.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Minimum horizontal gap between adjacent same-parent nodes.
    pub sibling_gap: f64,
    /// Minimum horizontal gap between nodes of adjacent subtrees.
    pub subtree_gap: f64,
    /// Vertical distance between consecutive tree levels.
    pub level_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sibling_gap: 24.0,
            subtree_gap: 48.0,
            level_spacing: 120.0,
        }
    }
}

/// Rendered node extents, queried during layout.
///
/// The engine only needs widths; callers with real text metrics implement
/// this for label-accurate spacing. Layout output is unaffected by anything
/// else about rendering.
pub trait NodeSizing {
    /// Rendered width of `node`, in layout units.
    fn width(&self, node: &TaxonNode) -> f64;
}

/// Uniform width for every node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FixedSizing {
    /// Width applied to all nodes.
    pub width: f64,
}

impl Default for FixedSizing {
    fn default() -> Self {
        Self { width: 160.0 }
    }
}

impl NodeSizing for FixedSizing {
    fn width(&self, _node: &TaxonNode) -> f64 {
        self.width
    }
}
