// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scope descriptors and the cache-key fingerprints derived from them.

use core::fmt;
use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use canopy_hierarchy::ParticipantId;

use crate::source::ScopedRecord;

/// Whose discoveries are visible in a scope.
///
/// Resolution of friendship and selection happens entirely in the
/// surrounding system; here the variants only parameterize cache keys and
/// the record-source call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Only the viewer's own discoveries.
    SelfOnly,
    /// The viewer's discoveries plus all of their friends'.
    SelfAndFriends,
    /// The viewer's discoveries plus a chosen set of friends'.
    Selected(BTreeSet<ParticipantId>),
    /// Every participant's discoveries.
    Everyone,
}

/// The caller-defined subset of records a layout request covers.
///
/// Always threaded through calls as an explicit value; there is no ambient
/// "current participant" anywhere in this pipeline. That is what keeps cache
/// keys well-defined and each computation independently testable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeDescriptor {
    /// Participant the scope is resolved for.
    pub viewer: ParticipantId,
    /// Visibility mode.
    pub visibility: Visibility,
}

impl ScopeDescriptor {
    /// Stable digest of the scope-defining parameters.
    ///
    /// Two descriptors digest equal exactly when they denote the same scope;
    /// the `Selected` set is ordered, so insertion order cannot leak in.
    pub fn params_digest(&self) -> ScopeParamsDigest {
        let mut hasher = Sha256::new();
        hasher.update(self.viewer.0.to_le_bytes());
        match &self.visibility {
            Visibility::SelfOnly => hasher.update([0_u8]),
            Visibility::SelfAndFriends => hasher.update([1_u8]),
            Visibility::Selected(chosen) => {
                hasher.update([2_u8]);
                for participant in chosen {
                    hasher.update(participant.0.to_le_bytes());
                }
            }
            Visibility::Everyone => hasher.update([3_u8]),
        }
        ScopeParamsDigest(truncate(&hasher.finalize()))
    }
}

/// Digest of a scope's defining parameters, independent of record state.
///
/// Groups all generations of one scope for invalidation purposes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeParamsDigest(u128);

impl fmt::Debug for ScopeParamsDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeParamsDigest({self})")
    }
}

impl fmt::Display for ScopeParamsDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Content hash identifying one generation of one scope: the cache key.
///
/// Covers the scope parameters plus the ordered `(record id, last-modified)`
/// pairs of the resolved record set. Record payloads are deliberately left
/// out to keep hashing cheap; the modified marker stands in for them. Any
/// change to membership, order, or a record's marker produces a new key, so
/// a stale entry can never be read through its old fingerprint.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeFingerprint(u128);

impl ScopeFingerprint {
    /// Fingerprint of `scope` resolved to `records`.
    pub fn of(scope: &ScopeDescriptor, records: &[ScopedRecord]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(scope.params_digest().0.to_le_bytes());
        for scoped in records {
            hasher.update(scoped.record.id.0.to_le_bytes());
            hasher.update(scoped.modified.to_le_bytes());
        }
        Self(truncate(&hasher.finalize()))
    }
}

impl fmt::Debug for ScopeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeFingerprint({self})")
    }
}

impl fmt::Display for ScopeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

fn truncate(digest: &[u8]) -> u128 {
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(bytes)
}
