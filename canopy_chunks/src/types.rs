// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chunk identity, geometry, and payload types.

use kurbo::{Point, Rect};

use canopy_hierarchy::TaxonId;

/// Integer grid coordinates of a chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkCoords {
    /// Column index.
    pub cx: i32,
    /// Row index.
    pub cy: i32,
}

impl ChunkCoords {
    /// Coordinates at `(cx, cy)`.
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }
}

/// Grid cell size, in layout units.
///
/// Chosen so a chunk holds a renderer-friendly node count at expected
/// density; both dimensions are inputs, not constants.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChunkConfig {
    /// Cell width.
    pub chunk_w: f64,
    /// Cell height.
    pub chunk_h: f64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_w: 2048.0,
            chunk_h: 2048.0,
        }
    }
}

/// Shape of a built chunk grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChunkGrid {
    /// Cell width, in layout units.
    pub chunk_w: f64,
    /// Cell height, in layout units.
    pub chunk_h: f64,
    /// Covered cell counts as (columns, rows). `(0, 0)` for an empty layout.
    pub dims: (u32, u32),
}

/// One spatial chunk of the laid-out tree.
///
/// A chunk payload is self-contained: `edges` are local indices into the
/// concatenation of `node_ids` and `guests`, so a renderer can draw every
/// edge touching this chunk, including half-edges crossing its boundary,
/// without fetching any neighbor.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// Grid coordinates of this chunk.
    pub coords: ChunkCoords,
    /// Region of layout space this chunk covers.
    pub bounds: Rect,
    /// Nodes whose position falls inside `bounds`.
    pub node_ids: Vec<TaxonId>,
    /// Positions parallel to `node_ids`.
    pub positions: Vec<Point>,
    /// Off-chunk endpoints of boundary-crossing edges, with their positions.
    pub guests: Vec<(TaxonId, Point)>,
    /// Parent→child edges with at least one endpoint in this chunk, as
    /// indices into `node_ids` followed by `guests`.
    pub edges: Vec<(u32, u32)>,
}

impl Chunk {
    /// Number of member nodes.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// True when the chunk has no member nodes.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Resolve a local edge index to the node id it names.
    pub fn local(&self, index: u32) -> Option<TaxonId> {
        let index = index as usize;
        if index < self.node_ids.len() {
            Some(self.node_ids[index])
        } else {
            self.guests.get(index - self.node_ids.len()).map(|(id, _)| *id)
        }
    }
}
