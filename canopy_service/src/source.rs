// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The record-source seam: the sole call into the surrounding system.

use canopy_hierarchy::TaxonRecord;

use crate::scope::ScopeDescriptor;

/// One record as resolved for a scope, with its last-modified marker.
///
/// The marker feeds the scope fingerprint so a record edit changes the cache
/// key without the fingerprint having to hash the record payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopedRecord {
    /// The record itself.
    pub record: TaxonRecord,
    /// Opaque monotonic marker bumped whenever the record changes upstream.
    pub modified: u64,
}

/// Failure to resolve a scope's records.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The backing store could not serve the request.
    #[error("record source unavailable: {0}")]
    Unavailable(String),
}

/// Produces the ordered record sequence for a scope.
///
/// Implemented by the surrounding system; visibility resolution (who counts
/// as a friend, which discoveries are shared) happens entirely behind this
/// trait. Records must arrive ordered by their ordering index and fully
/// materialized; nothing downstream performs I/O.
pub trait RecordSource: Send + Sync {
    /// Resolve the records visible in `scope`, in ordering-index order.
    fn scoped_records(&self, scope: &ScopeDescriptor) -> Result<Vec<ScopedRecord>, SourceError>;
}
