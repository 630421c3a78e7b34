// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building the chunk grid and querying it.

use kurbo::{Point, Rect};
use rustc_hash::FxHashMap;

use canopy_hierarchy::{Hierarchy, TaxonId};
use canopy_layout::Layout;

use crate::types::{Chunk, ChunkConfig, ChunkCoords, ChunkGrid};

/// Uniform-grid partition of a laid-out tree.
///
/// Every node belongs to exactly one chunk, keyed by floor-division of its
/// position; every parent→child edge belongs to every chunk containing at
/// least one endpoint, so a boundary-crossing edge is visible from either
/// side at the cost of modest duplication. Like the layout it is built from,
/// the index is a derived artifact: built once per generation, never updated
/// in place.
#[derive(Clone)]
pub struct ChunkIndex {
    config: ChunkConfig,
    dims: (u32, u32),
    chunks: FxHashMap<ChunkCoords, Chunk>,
    order: Vec<ChunkCoords>,
}

impl core::fmt::Debug for ChunkIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkIndex")
            .field("dims", &self.dims)
            .field("chunks", &self.order.len())
            .finish_non_exhaustive()
    }
}

impl ChunkIndex {
    /// Partition the laid-out hierarchy into fixed-size chunks.
    ///
    /// Positions are expected to be non-negative, as produced by the layout
    /// engine's origin normalization. An empty layout yields an empty grid.
    pub fn build(hierarchy: &Hierarchy, layout: &Layout, config: ChunkConfig) -> Self {
        debug_assert!(
            config.chunk_w > 0.0 && config.chunk_h > 0.0,
            "chunk sizes must be positive"
        );
        if layout.is_empty() {
            return Self {
                config,
                dims: (0, 0),
                chunks: FxHashMap::default(),
                order: Vec::new(),
            };
        }

        let mut chunks: FxHashMap<ChunkCoords, Chunk> = FxHashMap::default();
        let mut order = Vec::new();
        // Member slot per node: owning chunk plus local index into node_ids.
        let mut slots: FxHashMap<TaxonId, (ChunkCoords, u32)> =
            FxHashMap::with_capacity_and_hasher(hierarchy.len(), Default::default());
        let mut max_cell = (0_i32, 0_i32);

        for id in hierarchy.ids() {
            let pos = layout.position(id).expect("layout covers the hierarchy");
            let coords = cell_for(&config, pos);
            max_cell = (max_cell.0.max(coords.cx), max_cell.1.max(coords.cy));
            let chunk = chunks.entry(coords).or_insert_with(|| {
                order.push(coords);
                Chunk {
                    coords,
                    bounds: cell_bounds(&config, coords),
                    node_ids: Vec::new(),
                    positions: Vec::new(),
                    guests: Vec::new(),
                    edges: Vec::new(),
                }
            });
            #[allow(
                clippy::cast_possible_truncation,
                reason = "per-chunk node counts stay far below u32::MAX"
            )]
            let local = chunk.node_ids.len() as u32;
            chunk.node_ids.push(id);
            chunk.positions.push(pos);
            slots.insert(id, (coords, local));
        }

        // The grid must cover both the bounding box and every occupied cell;
        // a bottom-row node can sit exactly on the bounds edge and floor into
        // the cell past the box-derived count.
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "cell counts are small non-negative integers"
        )]
        let dims = (
            ((layout.bounds.x1 / config.chunk_w).ceil() as u32).max(max_cell.0 as u32 + 1),
            ((layout.bounds.y1 / config.chunk_h).ceil() as u32).max(max_cell.1 as u32 + 1),
        );

        // Guest slot per (chunk, node): local index past the member range.
        let mut guest_slots: FxHashMap<(ChunkCoords, TaxonId), u32> = FxHashMap::default();
        for (parent, child) in hierarchy.edges() {
            let (pc, pi) = slots[&parent];
            let (cc, ci) = slots[&child];
            if pc == cc {
                chunks
                    .get_mut(&pc)
                    .expect("member chunk exists")
                    .edges
                    .push((pi, ci));
            } else {
                let child_pos = layout.position(child).expect("layout covers the hierarchy");
                let parent_pos = layout.position(parent).expect("layout covers the hierarchy");
                let gi = guest_local(&mut chunks, &mut guest_slots, pc, child, child_pos);
                chunks.get_mut(&pc).expect("member chunk exists").edges.push((pi, gi));
                let gi = guest_local(&mut chunks, &mut guest_slots, cc, parent, parent_pos);
                chunks.get_mut(&cc).expect("member chunk exists").edges.push((gi, ci));
            }
        }

        Self {
            config,
            dims,
            chunks,
            order,
        }
    }

    /// Grid shape and cell size.
    pub fn grid(&self) -> ChunkGrid {
        ChunkGrid {
            chunk_w: self.config.chunk_w,
            chunk_h: self.config.chunk_h,
            dims: self.dims,
        }
    }

    /// The chunk at `coords`, if any node landed there.
    pub fn chunk(&self, coords: ChunkCoords) -> Option<&Chunk> {
        self.chunks.get(&coords)
    }

    /// Number of non-empty chunks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the grid holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All chunks, in first-occupancy order over the hierarchy.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.order.iter().map(|c| &self.chunks[c])
    }

    /// Chunks whose bounds intersect `rect`.
    ///
    /// Cost is proportional to the grid cells the rectangle covers, not to
    /// the node count, so viewport-driven progressive loading stays cheap on
    /// large trees.
    pub fn chunks_in_rect(&self, rect: Rect) -> impl Iterator<Item = &Chunk> + '_ {
        let rect = rect.abs();
        let lo = cell_for(&self.config, Point::new(rect.x0, rect.y0));
        let hi = cell_for(&self.config, Point::new(rect.x1, rect.y1));
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            reason = "grid dims are small cell counts"
        )]
        let (cols, rows) = (self.dims.0 as i32, self.dims.1 as i32);
        let min_cx = lo.cx.max(0);
        let min_cy = lo.cy.max(0);
        let max_cx = hi.cx.min(cols - 1);
        let max_cy = hi.cy.min(rows - 1);
        (min_cy..=max_cy).flat_map(move |cy| {
            (min_cx..=max_cx).filter_map(move |cx| self.chunks.get(&ChunkCoords::new(cx, cy)))
        })
    }
}

fn cell_for(config: &ChunkConfig, pos: Point) -> ChunkCoords {
    ChunkCoords::new(
        floor_to_i32(pos.x / config.chunk_w),
        floor_to_i32(pos.y / config.chunk_h),
    )
}

fn cell_bounds(config: &ChunkConfig, coords: ChunkCoords) -> Rect {
    let x0 = f64::from(coords.cx) * config.chunk_w;
    let y0 = f64::from(coords.cy) * config.chunk_h;
    Rect::new(x0, y0, x0 + config.chunk_w, y0 + config.chunk_h)
}

#[inline]
fn floor_to_i32(v: f64) -> i32 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "cell indices are small; the adjustment below restores floor semantics"
    )]
    let i = v as i32;
    if f64::from(i) > v { i - 1 } else { i }
}

fn guest_local(
    chunks: &mut FxHashMap<ChunkCoords, Chunk>,
    guest_slots: &mut FxHashMap<(ChunkCoords, TaxonId), u32>,
    coords: ChunkCoords,
    id: TaxonId,
    pos: Point,
) -> u32 {
    *guest_slots.entry((coords, id)).or_insert_with(|| {
        let chunk = chunks.get_mut(&coords).expect("member chunk exists");
        #[allow(
            clippy::cast_possible_truncation,
            reason = "per-chunk node counts stay far below u32::MAX"
        )]
        let local = (chunk.node_ids.len() + chunk.guests.len()) as u32;
        chunk.guests.push((id, pos));
        local
    })
}
