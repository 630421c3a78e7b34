// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Layout: linear-time tidy tree layout for taxonomic hierarchies.
//!
//! Canopy Layout assigns every node of a [`Hierarchy`] an (x, y) position,
//! minimizing horizontal width while keeping siblings apart, centering each
//! parent over its children's span, and producing congruent relative layouts
//! for structurally identical subtrees wherever they are attached.
//!
//! - The algorithm is the linear-time generalization of the two-pass
//!   tidy-tree layout to m-ary trees (contour threading and a default
//!   ancestor), so a hundred-thousand-node hierarchy lays out in one linear
//!   sweep, not a quadratic contour walk.
//! - Sibling separation is a function of both nodes' rendered widths via the
//!   [`NodeSizing`] seam, so variably sized labels never overlap.
//! - Output is deterministic: identical input yields bit-identical positions,
//!   which downstream caching relies on.
//!
//! # Example
//!
//! ```rust
//! use canopy_hierarchy::{HierarchyBuilder, Lineage, RecordId, TaxonRecord};
//! use canopy_layout::LayoutEngine;
//!
//! let wolf = TaxonRecord {
//!     id: RecordId(1),
//!     lineage: Lineage {
//!         kingdom: Some("Animalia".into()),
//!         genus: Some("Canis".into()),
//!         species: Some("lupus".into()),
//!         ..Default::default()
//!     },
//!     discovery: None,
//!     ordering: 1,
//! };
//!
//! let built = HierarchyBuilder::default().build(&[wolf]);
//! let layout = LayoutEngine::default().compute(&built.hierarchy);
//! assert_eq!(layout.positions.len(), built.hierarchy.len());
//! assert_eq!(layout.bounds.origin(), kurbo::Point::ZERO);
//! ```
//!
//! [`Hierarchy`]: canopy_hierarchy::Hierarchy

pub mod config;
pub mod engine;
pub mod layout;

pub use config::{FixedSizing, LayoutConfig, NodeSizing};
pub use engine::LayoutEngine;
pub use layout::Layout;
