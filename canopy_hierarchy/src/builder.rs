// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Folding a flat record sequence into one rooted, ordered hierarchy.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::hierarchy::{Hierarchy, TaxonNode};
use crate::types::{Rank, RecordId, TaxonId, TaxonRecord};

/// Display name of the synthetic root node.
const ROOT_NAME: &str = "Life";

/// Display name of the shared bucket for lineage-less records.
const UNRANKED_BUCKET_NAME: &str = "unranked";

/// How records with no lineage information at all are attached under root.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnrankedGrouping {
    /// All lineage-less records share one bucket leaf under root.
    #[default]
    Pooled,
    /// Each lineage-less record becomes its own leaf under root.
    PerRecord,
}

/// Builder configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Placement policy for records without any lineage.
    pub unranked_grouping: UnrankedGrouping,
}

/// Per-record anomaly recovered during the build. Warnings are aggregated
/// and returned alongside the hierarchy; a record is never silently dropped.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildWarning {
    /// The record carried no lineage at all; it was attached under root.
    #[error("record {record} has no lineage; attached under root")]
    EmptyLineage {
        /// Offending record.
        record: RecordId,
    },
    /// A record with this id was already processed; the later one is skipped.
    #[error("record {record} appears more than once; duplicate skipped")]
    DuplicateRecord {
        /// Offending record.
        record: RecordId,
    },
}

/// Result of a build: the hierarchy plus recovered warnings.
#[derive(Clone, Debug)]
pub struct Built {
    /// The constructed hierarchy.
    pub hierarchy: Hierarchy,
    /// Per-record anomalies recovered during construction.
    pub warnings: Vec<BuildWarning>,
}

/// Converts an ordered record sequence into one rooted, ordered tree,
/// deduplicating shared ancestors.
///
/// Pure function of its input: identical records in identical order always
/// produce an identical hierarchy, including child order and node ids. That
/// determinism is load-bearing for both layout congruence and cache keying.
#[derive(Copy, Clone, Debug, Default)]
pub struct HierarchyBuilder {
    config: BuilderConfig,
}

impl HierarchyBuilder {
    /// Create a builder with the given configuration.
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Build a hierarchy from the record sequence.
    ///
    /// Every record contributes exactly one root-to-leaf chain; chains reuse
    /// any node whose (rank, full-lineage-prefix) already exists. Missing
    /// ranks are skipped rather than padded with placeholder nodes, so a
    /// class-level node may parent a genus-level node directly.
    pub fn build(&self, records: &[TaxonRecord]) -> Built {
        let mut state = BuildState::new();
        let mut warnings = Vec::new();
        let mut seen = FxHashSet::default();

        for record in records {
            if !seen.insert(record.id) {
                warnings.push(BuildWarning::DuplicateRecord { record: record.id });
                continue;
            }

            let entries = record.lineage.entries();
            if entries.is_empty() {
                warnings.push(BuildWarning::EmptyLineage { record: record.id });
                self.attach_unranked(&mut state, record);
                continue;
            }

            let mut parent = state.root;
            let mut path: SmallVec<[&str; 8]> = SmallVec::new();
            let last = entries.len() - 1;
            for (i, (rank, name)) in entries.iter().enumerate() {
                path.push(name);
                let id = TaxonId::derive(*rank, &path);
                state.intern(id, *rank, name, parent);
                if i == last {
                    // Leaf of this record's chain: carry discovery metadata.
                    let node = state.node_mut(id);
                    if node.discovery.is_none() {
                        node.discovery = record.discovery;
                    }
                }
                parent = id;
            }
        }

        Built {
            hierarchy: state.finish(),
            warnings,
        }
    }

    fn attach_unranked(&self, state: &mut BuildState, record: &TaxonRecord) {
        let (id, name) = match self.config.unranked_grouping {
            UnrankedGrouping::Pooled => (
                TaxonId::derive(Rank::Unranked, &[UNRANKED_BUCKET_NAME]),
                UNRANKED_BUCKET_NAME.to_owned(),
            ),
            UnrankedGrouping::PerRecord => {
                let name = record.id.to_string();
                let id = TaxonId::derive(Rank::Unranked, &[UNRANKED_BUCKET_NAME, &name]);
                (id, name)
            }
        };
        let root = state.root;
        state.intern(id, Rank::Unranked, &name, root);
        let node = state.node_mut(id);
        if node.discovery.is_none() {
            node.discovery = record.discovery;
        }
    }
}

/// Mutable construction state. Exists only inside [`HierarchyBuilder::build`];
/// the returned [`Hierarchy`] is immutable.
struct BuildState {
    root: TaxonId,
    nodes: FxHashMap<TaxonId, TaxonNode>,
    order: Vec<TaxonId>,
}

impl BuildState {
    fn new() -> Self {
        let root = TaxonId::derive(Rank::Root, &[]);
        let mut nodes = FxHashMap::default();
        nodes.insert(
            root,
            TaxonNode {
                id: root,
                rank: Rank::Root,
                name: ROOT_NAME.to_owned(),
                parent: None,
                children: Vec::new(),
                subtree_size: 0,
                depth: 0,
                discovery: None,
            },
        );
        Self {
            root,
            nodes,
            order: vec![root],
        }
    }

    /// Ensure a node exists, linking it under `parent` on first sight.
    fn intern(&mut self, id: TaxonId, rank: Rank, name: &str, parent: TaxonId) {
        if self.nodes.contains_key(&id) {
            return;
        }
        let depth = self.nodes[&parent].depth + 1;
        self.nodes.insert(
            id,
            TaxonNode {
                id,
                rank,
                name: name.to_owned(),
                parent: Some(parent),
                children: Vec::new(),
                subtree_size: 0,
                depth,
                discovery: None,
            },
        );
        self.order.push(id);
        self.node_mut(parent).children.push(id);
    }

    fn node_mut(&mut self, id: TaxonId) -> &mut TaxonNode {
        self.nodes.get_mut(&id).expect("node interned before use")
    }

    /// Fill in subtree sizes and freeze the hierarchy.
    ///
    /// `order` places parents before children, so one reverse pass sees every
    /// child before its parent.
    fn finish(mut self) -> Hierarchy {
        for i in (0..self.order.len()).rev() {
            let id = self.order[i];
            let (size, parent) = {
                let node = &self.nodes[&id];
                let size = if node.is_leaf() { 1 } else { node.subtree_size };
                (size, node.parent)
            };
            self.node_mut(id).subtree_size = size;
            if let Some(parent) = parent {
                self.node_mut(parent).subtree_size += size;
            }
        }
        Hierarchy::new(self.root, self.nodes, self.order)
    }
}
