// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Service: scoped layout queries with single-flight caching.
//!
//! This crate ties the canopy pipeline together behind one façade. A
//! [`LayoutService`] resolves a [`ScopeDescriptor`] through a caller-provided
//! [`RecordSource`], runs records through hierarchy construction, tidy
//! layout, and chunk indexing, and memoizes the product per content
//! fingerprint:
//!
//! - The cache key hashes the ordered `(record id, last-modified)` pairs of
//!   the resolved scope plus its parameters — cheap to derive, impossible to
//!   read stale through.
//! - A miss computes synchronously; concurrent requesters for the same key
//!   wait on the one in-flight computation instead of duplicating it.
//! - Invalidation is push-based and fans out: one record edit evicts every
//!   cached generation of every scope whose record set included it.
//!
//! # Example
//!
//! ```rust
//! use canopy_hierarchy::{Lineage, ParticipantId, RecordId, TaxonRecord};
//! use canopy_service::{
//!     LayoutService, RecordSource, ScopeDescriptor, ScopedRecord, SourceError, Visibility,
//! };
//!
//! struct OneWolf;
//!
//! impl RecordSource for OneWolf {
//!     fn scoped_records(
//!         &self,
//!         _scope: &ScopeDescriptor,
//!     ) -> Result<Vec<ScopedRecord>, SourceError> {
//!         Ok(vec![ScopedRecord {
//!             record: TaxonRecord {
//!                 id: RecordId(1),
//!                 lineage: Lineage {
//!                     kingdom: Some("Animalia".into()),
//!                     genus: Some("Canis".into()),
//!                     species: Some("lupus".into()),
//!                     ..Default::default()
//!                 },
//!                 discovery: None,
//!                 ordering: 1,
//!             },
//!             modified: 1,
//!         }])
//!     }
//! }
//!
//! let service = LayoutService::new(OneWolf);
//! let scope = ScopeDescriptor {
//!     viewer: ParticipantId(1),
//!     visibility: Visibility::Everyone,
//! };
//!
//! let full = service.get_full_layout(&scope).unwrap();
//! assert_eq!(full.nodes.len(), 4); // root, Animalia, Canis, lupus
//!
//! let hits = service.search(&scope, "lupus").unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

pub mod cache;
pub mod scope;
pub mod service;
pub mod source;

pub use cache::{CacheStats, ComputeError, LayoutCache, ScopeLayout};
pub use scope::{ScopeDescriptor, ScopeFingerprint, ScopeParamsDigest, Visibility};
pub use service::{FullLayout, LayoutService, SearchHit, ServiceConfig, ServiceError};
pub use source::{RecordSource, ScopedRecord, SourceError};
