// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Chunks: uniform-grid spatial partitioning of laid-out trees.
//!
//! A laid-out taxonomy can hold hundreds of thousands of nodes; a renderer
//! should never need all of them at once. This crate slices a [`Layout`]
//! into fixed-size rectangular chunks that can be streamed incrementally:
//!
//! - Every node lands in exactly one [`Chunk`], keyed by which grid cell its
//!   position falls into.
//! - Every parent→child edge is listed in every chunk containing at least
//!   one endpoint; the far endpoint travels along as a guest, so a chunk
//!   payload is self-contained and independently transmittable.
//! - Rectangle queries cost time proportional to the cells touched, not the
//!   node count, which is what makes viewport-driven loading viable.
//!
//! # Example
//!
//! ```rust
//! use canopy_chunks::{ChunkConfig, ChunkIndex};
//! use canopy_hierarchy::{HierarchyBuilder, Lineage, RecordId, TaxonRecord};
//! use canopy_layout::LayoutEngine;
//!
//! let wolf = TaxonRecord {
//!     id: RecordId(1),
//!     lineage: Lineage {
//!         kingdom: Some("Animalia".into()),
//!         species: Some("lupus".into()),
//!         ..Default::default()
//!     },
//!     discovery: None,
//!     ordering: 1,
//! };
//!
//! let built = HierarchyBuilder::default().build(&[wolf]);
//! let layout = LayoutEngine::default().compute(&built.hierarchy);
//! let index = ChunkIndex::build(&built.hierarchy, &layout, ChunkConfig::default());
//!
//! let total: usize = index.chunks().map(|c| c.len()).sum();
//! assert_eq!(total, built.hierarchy.len());
//! ```
//!
//! [`Layout`]: canopy_layout::Layout

pub mod index;
pub mod types;

pub use index::ChunkIndex;
pub use types::{Chunk, ChunkConfig, ChunkCoords, ChunkGrid};
