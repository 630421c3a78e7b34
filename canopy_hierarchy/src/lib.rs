// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Hierarchy: taxonomic records folded into one rooted, ordered tree.
//!
//! This crate is the first stage of the canopy pipeline. It takes a flat,
//! ordered sequence of [`TaxonRecord`]s — each carrying a sparse rank lineage
//! and optional discovery metadata — and folds them into a single rooted
//! general tree, deduplicating shared ancestors along the way.
//!
//! - One [`TaxonNode`] per unique (rank, full-lineage-prefix): all species
//!   under one genus share exactly one genus node.
//! - Node ids ([`TaxonId`]) are derived from rank + lineage path, so
//!   repeated builds over identical input are idempotent.
//! - Missing ranks are skipped, never padded with placeholder nodes.
//! - Per-record anomalies (no lineage, duplicate ids) are recovered and
//!   reported as [`BuildWarning`]s, never silently dropped.
//!
//! # Example
//!
//! ```rust
//! use canopy_hierarchy::{HierarchyBuilder, Lineage, RecordId, TaxonRecord};
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
//! assert!(built.warnings.is_empty());
//! assert_eq!(built.hierarchy.leaf_count(), 1);
//! ```

pub mod builder;
pub mod hierarchy;
pub mod types;

pub use builder::{BuildWarning, Built, BuilderConfig, HierarchyBuilder, UnrankedGrouping};
pub use hierarchy::{Hierarchy, TaxonNode};
pub use types::{Discovery, Lineage, ParticipantId, Rank, RecordId, TaxonId, TaxonRecord};
