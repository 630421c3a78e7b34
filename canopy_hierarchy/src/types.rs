// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Record-level types: ranks, lineages, identifiers, discovery metadata.

use core::fmt;

use sha2::{Digest, Sha256};
use smallvec::SmallVec;

/// A taxonomic level.
///
/// `Root` and `Unranked` are structural: `Root` names the single synthetic
/// apex every hierarchy has, and `Unranked` marks leaves built from records
/// that carried no lineage information at all. Neither appears in input
/// records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Rank {
    /// Synthetic apex of every hierarchy.
    Root = 0,
    /// Kingdom.
    Kingdom,
    /// Phylum.
    Phylum,
    /// Class.
    Class,
    /// Order.
    Order,
    /// Family.
    Family,
    /// Genus.
    Genus,
    /// Species.
    Species,
    /// Subspecies.
    Subspecies,
    /// No rank information available.
    Unranked,
}

impl Rank {
    /// The named ranks a record may carry, outermost first.
    pub const NAMED: [Self; 8] = [
        Self::Kingdom,
        Self::Phylum,
        Self::Class,
        Self::Order,
        Self::Family,
        Self::Genus,
        Self::Species,
        Self::Subspecies,
    ];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Kingdom => "kingdom",
            Self::Phylum => "phylum",
            Self::Class => "class",
            Self::Order => "order",
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
            Self::Subspecies => "subspecies",
            Self::Unranked => "unranked",
        };
        f.write_str(name)
    }
}

/// External identifier of a source record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// External identifier of a participant (discoverer).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier of a node in the hierarchy.
///
/// Derived deterministically from the node's rank and full lineage path, so
/// repeated builds over identical input reproduce identical ids. The id is a
/// truncated `Sha256` digest; 128 bits keeps collisions out of practical
/// reach while staying `Copy`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaxonId(u128);

impl TaxonId {
    /// Derive the id for a node at `rank` reached through `path`
    /// (lineage names from the outermost rank down to the node itself).
    pub fn derive(rank: Rank, path: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([rank as u8]);
        for name in path {
            hasher.update(name.as_bytes());
            // Separator byte keeps ("ab","c") distinct from ("a","bc").
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        let mut bytes = [0_u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(u128::from_be_bytes(bytes))
    }
}

impl fmt::Debug for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaxonId({self})")
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Discovery metadata carried by a record and, after the build, by its leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discovery {
    /// Participant credited with the discovery.
    pub by: ParticipantId,
}

/// Sparse rank lineage of a record. Every field is optional; missing ranks
/// are skipped when the chain is built, never filled with placeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lineage {
    /// Kingdom name, if recorded.
    pub kingdom: Option<String>,
    /// Phylum name, if recorded.
    pub phylum: Option<String>,
    /// Class name, if recorded.
    pub class: Option<String>,
    /// Order name, if recorded.
    pub order: Option<String>,
    /// Family name, if recorded.
    pub family: Option<String>,
    /// Genus name, if recorded.
    pub genus: Option<String>,
    /// Species name, if recorded.
    pub species: Option<String>,
    /// Subspecies name, if recorded.
    pub subspecies: Option<String>,
}

impl Lineage {
    /// The present `(rank, name)` entries, outermost first.
    pub fn entries(&self) -> SmallVec<[(Rank, &str); 8]> {
        let fields = [
            (Rank::Kingdom, &self.kingdom),
            (Rank::Phylum, &self.phylum),
            (Rank::Class, &self.class),
            (Rank::Order, &self.order),
            (Rank::Family, &self.family),
            (Rank::Genus, &self.genus),
            (Rank::Species, &self.species),
            (Rank::Subspecies, &self.subspecies),
        ];
        fields
            .into_iter()
            .filter_map(|(rank, name)| name.as_deref().map(|n| (rank, n)))
            .collect()
    }

    /// True when no rank is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// One scoped input record, as produced by the surrounding system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxonRecord {
    /// Stable external id.
    pub id: RecordId,
    /// Sparse rank lineage.
    pub lineage: Lineage,
    /// Discovery metadata; `None` when the taxon is undiscovered in scope.
    pub discovery: Option<Discovery>,
    /// Ordering index assigned upstream; the input sequence is sorted by it.
    pub ordering: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxon_id_is_deterministic() {
        let a = TaxonId::derive(Rank::Genus, &["Animalia", "Chordata", "Canis"]);
        let b = TaxonId::derive(Rank::Genus, &["Animalia", "Chordata", "Canis"]);
        assert_eq!(a, b);
    }

    #[test]
    fn taxon_id_separates_rank_and_path() {
        let genus = TaxonId::derive(Rank::Genus, &["Animalia", "Canis"]);
        let family = TaxonId::derive(Rank::Family, &["Animalia", "Canis"]);
        assert_ne!(genus, family, "same path at different ranks must differ");

        let joined = TaxonId::derive(Rank::Genus, &["AnimaliaCanis"]);
        assert_ne!(genus, joined, "component boundaries must be preserved");
    }

    #[test]
    fn lineage_entries_skip_missing_ranks() {
        let lineage = Lineage {
            kingdom: Some("Animalia".into()),
            class: Some("Mammalia".into()),
            genus: Some("Canis".into()),
            ..Default::default()
        };
        let entries = lineage.entries();
        assert_eq!(
            entries.as_slice(),
            &[
                (Rank::Kingdom, "Animalia"),
                (Rank::Class, "Mammalia"),
                (Rank::Genus, "Canis"),
            ]
        );
    }

    #[test]
    fn empty_lineage_reports_empty() {
        assert!(Lineage::default().is_empty());
    }
}
