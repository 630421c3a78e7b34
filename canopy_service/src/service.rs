// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The query façade over the record → hierarchy → layout → chunk pipeline.

use std::sync::Arc;
use std::time::Instant;

use kurbo::{Point, Rect};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use canopy_chunks::{Chunk, ChunkConfig, ChunkCoords, ChunkGrid, ChunkIndex};
use canopy_hierarchy::{
    BuildWarning, BuilderConfig, HierarchyBuilder, RecordId, TaxonId, TaxonNode, TaxonRecord,
};
use canopy_layout::{FixedSizing, LayoutConfig, LayoutEngine};

use crate::cache::{CacheStats, ComputeError, LayoutCache, ScopeLayout};
use crate::scope::{ScopeDescriptor, ScopeFingerprint};
use crate::source::{RecordSource, ScopedRecord, SourceError};

/// Hard failure of a service call.
///
/// Per-record anomalies never surface here; they ride along as warnings on
/// successful output. No user-facing prose originates in this crate beyond
/// the terse `Display` strings; translation is the surrounding system's job.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ServiceError {
    /// The record source could not resolve the scope.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The layout pipeline failed as a whole.
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

/// Pipeline configuration, fixed per service instance.
///
/// Baked into the service rather than passed per call so every generation
/// of every scope is computed under the same geometry, keeping fingerprints
/// comparable across requests.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ServiceConfig {
    /// Hierarchy construction options.
    pub builder: BuilderConfig,
    /// Layout spacing.
    pub layout: LayoutConfig,
    /// Node sizing for separation.
    pub sizing: FixedSizing,
    /// Chunk grid cell size.
    pub chunks: ChunkConfig,
}

/// The whole laid-out tree for a scope, in one payload.
///
/// For small scopes, or callers that prefer a single round trip over chunked
/// streaming. An empty scope yields empty collections and zero bounds, not
/// an error.
#[derive(Clone, Debug)]
pub struct FullLayout {
    /// All laid-out nodes, parents before children.
    pub nodes: Vec<TaxonNode>,
    /// Parent→child edges.
    pub edges: Vec<(TaxonId, TaxonId)>,
    /// Center position per node.
    pub positions: FxHashMap<TaxonId, Point>,
    /// Bounding box of the layout, anchored at the origin.
    pub bounds: Rect,
    /// Shape of the chunk grid covering `bounds`.
    pub chunk_grid: ChunkGrid,
    /// Per-record anomalies recovered while building.
    pub warnings: Vec<BuildWarning>,
}

/// One search match, with enough context to jump a viewport to it.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    /// Matched node.
    pub id: TaxonId,
    /// Its position in the laid-out tree.
    pub position: Point,
    /// Lineage names from the outermost rank down to the node.
    pub lineage_path: Vec<String>,
}

/// Scoped layout queries over a record source, memoized per generation.
///
/// One instance serves many scopes; independent scopes compute concurrently
/// and share nothing but the cache store. Chunk queries read an immutable
/// snapshot, so they are lock-free once the generation is materialized.
pub struct LayoutService<S> {
    source: S,
    config: ServiceConfig,
    cache: LayoutCache,
}

impl<S> core::fmt::Debug for LayoutService<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutService")
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl<S: RecordSource> LayoutService<S> {
    /// Service over `source` with default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, ServiceConfig::default())
    }

    /// Service over `source` with explicit configuration.
    pub fn with_config(source: S, config: ServiceConfig) -> Self {
        Self {
            source,
            config,
            cache: LayoutCache::new(),
        }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Snapshot of the cache activity counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The complete laid-out tree for `scope`.
    pub fn get_full_layout(&self, scope: &ScopeDescriptor) -> Result<FullLayout, ServiceError> {
        let snapshot = self.snapshot(scope)?;
        // An empty scope has a bare synthetic root and no positions; it
        // surfaces as empty collections rather than a root-only payload.
        let nodes: Vec<TaxonNode> = snapshot
            .hierarchy
            .iter()
            .filter(|node| snapshot.layout.position(node.id).is_some())
            .cloned()
            .collect();
        let edges = snapshot.hierarchy.edges().collect();
        Ok(FullLayout {
            nodes,
            edges,
            positions: snapshot.layout.positions.clone(),
            bounds: snapshot.layout.bounds,
            chunk_grid: snapshot.chunks.grid(),
            warnings: snapshot.warnings.clone(),
        })
    }

    /// The chunk at `(cx, cy)` for `scope`.
    ///
    /// `Ok(None)` means the cell holds no nodes — an answer, not a failure.
    pub fn get_chunk(
        &self,
        scope: &ScopeDescriptor,
        cx: i32,
        cy: i32,
    ) -> Result<Option<Chunk>, ServiceError> {
        let snapshot = self.snapshot(scope)?;
        Ok(snapshot.chunks.chunk(ChunkCoords::new(cx, cy)).cloned())
    }

    /// All chunks of `scope` whose bounds intersect `rect`.
    pub fn get_chunks_in_rect(
        &self,
        scope: &ScopeDescriptor,
        rect: Rect,
    ) -> Result<Vec<Chunk>, ServiceError> {
        let snapshot = self.snapshot(scope)?;
        Ok(snapshot.chunks.chunks_in_rect(rect).cloned().collect())
    }

    /// Case-insensitive substring search over the scoped node names.
    ///
    /// Scans only the already-resolved scope, never the global taxonomy;
    /// hits carry positions so a caller can jump a viewport to them.
    pub fn search(
        &self,
        scope: &ScopeDescriptor,
        query: &str,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        let snapshot = self.snapshot(scope)?;
        let needle = query.to_lowercase();
        let root = snapshot.hierarchy.root();
        let hits = snapshot
            .hierarchy
            .iter()
            .filter(|node| node.id != root && node.name.to_lowercase().contains(&needle))
            .filter_map(|node| {
                snapshot.layout.position(node.id).map(|position| SearchHit {
                    id: node.id,
                    position,
                    lineage_path: snapshot.hierarchy.lineage_path(node.id),
                })
            })
            .collect();
        Ok(hits)
    }

    /// Evict every cached generation whose record set includes `record`.
    ///
    /// Called by the surrounding system whenever an upstream record changes
    /// in a way that could alter any scoped tree.
    pub fn invalidate_record(&self, record: RecordId) {
        self.cache.invalidate_record(record);
    }

    /// Evict every cached generation of `scope`.
    pub fn invalidate_scope(&self, scope: &ScopeDescriptor) {
        self.cache.invalidate_scope(scope.params_digest());
    }

    /// Resolve the scope and return its cached or freshly computed layout.
    fn snapshot(&self, scope: &ScopeDescriptor) -> Result<Arc<ScopeLayout>, ServiceError> {
        let records = self.source.scoped_records(scope)?;
        let key = ScopeFingerprint::of(scope, &records);
        let ids: Vec<RecordId> = records.iter().map(|scoped| scoped.record.id).collect();
        debug!(%key, records = ids.len(), "resolving scope layout");
        let snapshot = self
            .cache
            .get_or_compute(key, scope.params_digest(), &ids, || Ok(self.compute(&records)))?;
        Ok(snapshot)
    }

    fn compute(&self, records: &[ScopedRecord]) -> ScopeLayout {
        let started = Instant::now();
        let input: Vec<TaxonRecord> = records.iter().map(|scoped| scoped.record.clone()).collect();
        let built = HierarchyBuilder::new(self.config.builder).build(&input);
        for warning in &built.warnings {
            warn!(%warning, "recovered record anomaly");
        }
        let layout =
            LayoutEngine::with_sizing(self.config.layout, self.config.sizing).compute(&built.hierarchy);
        let chunks = ChunkIndex::build(&built.hierarchy, &layout, self.config.chunks);
        info!(
            nodes = built.hierarchy.len(),
            chunks = chunks.len(),
            elapsed = ?started.elapsed(),
            "computed scope layout"
        );
        ScopeLayout {
            hierarchy: built.hierarchy,
            layout,
            chunks,
            warnings: built.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use canopy_hierarchy::{Lineage, ParticipantId};

    use crate::scope::Visibility;

    /// In-memory source; records can be swapped between calls to emulate
    /// upstream edits.
    struct StaticSource {
        records: Mutex<Vec<ScopedRecord>>,
    }

    impl StaticSource {
        fn new(records: Vec<ScopedRecord>) -> Self {
            Self {
                records: Mutex::new(records),
            }
        }

        fn replace(&self, records: Vec<ScopedRecord>) {
            *self.records.lock().unwrap() = records;
        }
    }

    impl RecordSource for StaticSource {
        fn scoped_records(
            &self,
            _scope: &ScopeDescriptor,
        ) -> Result<Vec<ScopedRecord>, SourceError> {
            Ok(self.records.lock().unwrap().clone())
        }
    }

    struct FailingSource;

    impl RecordSource for FailingSource {
        fn scoped_records(
            &self,
            _scope: &ScopeDescriptor,
        ) -> Result<Vec<ScopedRecord>, SourceError> {
            Err(SourceError::Unavailable("store offline".into()))
        }
    }

    fn scope() -> ScopeDescriptor {
        ScopeDescriptor {
            viewer: ParticipantId(1),
            visibility: Visibility::Everyone,
        }
    }

    fn carnivoran(id: u64, family: &str, genus: &str, species: &str) -> ScopedRecord {
        ScopedRecord {
            record: TaxonRecord {
                id: RecordId(id),
                lineage: Lineage {
                    kingdom: Some("Animalia".into()),
                    phylum: Some("Chordata".into()),
                    class: Some("Mammalia".into()),
                    order: Some("Carnivora".into()),
                    family: Some(family.into()),
                    genus: Some(genus.into()),
                    species: Some(species.into()),
                    ..Default::default()
                },
                discovery: None,
                ordering: id,
            },
            modified: 1,
        }
    }

    fn carnivorans() -> Vec<ScopedRecord> {
        vec![
            carnivoran(1, "Canidae", "Canis", "lupus"),
            carnivoran(2, "Canidae", "Canis", "familiaris"),
            carnivoran(3, "Felidae", "Felis", "catus"),
        ]
    }

    #[test]
    fn full_layout_runs_the_whole_pipeline() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));
        let full = service.get_full_layout(&scope()).unwrap();

        assert!(full.warnings.is_empty());
        assert_eq!(full.nodes.len(), full.positions.len());
        assert_eq!(full.edges.len(), full.nodes.len() - 1, "tree edge count");

        let carnivora = full
            .nodes
            .iter()
            .find(|n| n.name == "Carnivora")
            .expect("shared order node");
        assert_eq!(carnivora.children.len(), 2, "Canidae and Felidae branches");
        let canis = full.nodes.iter().find(|n| n.name == "Canis").unwrap();
        assert_eq!(canis.children.len(), 2);

        assert!(full.bounds.x1 > 0.0 && full.bounds.y1 > 0.0);
        assert!(full.chunk_grid.dims.0 >= 1 && full.chunk_grid.dims.1 >= 1);
    }

    #[test]
    fn empty_scope_returns_a_well_formed_empty_layout() {
        let service = LayoutService::new(StaticSource::new(Vec::new()));
        let full = service.get_full_layout(&scope()).unwrap();
        assert!(full.nodes.is_empty());
        assert!(full.edges.is_empty());
        assert!(full.positions.is_empty());
        assert_eq!(full.bounds, Rect::ZERO);
        assert_eq!(full.chunk_grid.dims, (0, 0));
    }

    #[test]
    fn chunk_miss_is_an_answer_not_an_error() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));
        let missing = service.get_chunk(&scope(), 999, 999).unwrap();
        assert!(missing.is_none());
        let present = service.get_chunk(&scope(), 0, 0).unwrap();
        assert!(present.is_some());
    }

    #[test]
    fn rect_query_covers_the_scope() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));
        let full = service.get_full_layout(&scope()).unwrap();
        let chunks = service
            .get_chunks_in_rect(&scope(), full.bounds)
            .unwrap();
        let total: usize = chunks.iter().map(Chunk::len).sum();
        assert_eq!(total, full.nodes.len());
    }

    #[test]
    fn search_matches_substrings_case_insensitively() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));

        let canids = service.search(&scope(), "can").unwrap();
        let names: Vec<_> = canids
            .iter()
            .map(|hit| hit.lineage_path.last().unwrap().as_str())
            .collect();
        assert_eq!(names, ["Canidae", "Canis"]);

        let cat = service.search(&scope(), "CATUS").unwrap();
        assert_eq!(cat.len(), 1);
        assert_eq!(
            cat[0].lineage_path,
            ["Animalia", "Chordata", "Mammalia", "Carnivora", "Felidae", "Felis", "catus"]
        );

        assert!(service.search(&scope(), "wombat").unwrap().is_empty());
    }

    #[test]
    fn repeated_queries_reuse_the_cached_generation() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));
        service.get_full_layout(&scope()).unwrap();
        service.get_chunk(&scope(), 0, 0).unwrap();
        service.search(&scope(), "canis").unwrap();

        let stats = service.cache_stats();
        assert_eq!(stats.misses, 1, "one computation serves all queries");
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn record_invalidation_forces_recomputation() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));
        service.get_full_layout(&scope()).unwrap();
        service.get_full_layout(&scope()).unwrap();
        assert_eq!(service.cache_stats().misses, 1);

        service.invalidate_record(RecordId(2));
        service.get_full_layout(&scope()).unwrap();
        let stats = service.cache_stats();
        assert_eq!(stats.misses, 2, "eviction forces a fresh computation");
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn scope_invalidation_forces_recomputation() {
        let service = LayoutService::new(StaticSource::new(carnivorans()));
        service.get_full_layout(&scope()).unwrap();
        service.invalidate_scope(&scope());
        service.get_full_layout(&scope()).unwrap();
        assert_eq!(service.cache_stats().misses, 2);
    }

    #[test]
    fn upstream_edit_rolls_the_generation() {
        let source = StaticSource::new(carnivorans());
        let service = LayoutService::new(source);
        service.get_full_layout(&scope()).unwrap();

        // Same records, one bumped modified marker: a new fingerprint.
        let mut edited = carnivorans();
        edited[0].modified = 2;
        service.source.replace(edited);
        service.get_full_layout(&scope()).unwrap();

        let stats = service.cache_stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions, 1, "old generation evicted on turnover");
    }

    #[test]
    fn source_failure_is_a_hard_error() {
        let service = LayoutService::new(FailingSource);
        let err = service.get_full_layout(&scope()).unwrap_err();
        assert!(matches!(err, ServiceError::Source(_)));
    }

    #[test]
    fn malformed_records_surface_as_warnings_not_errors() {
        let mut records = carnivorans();
        records.push(ScopedRecord {
            record: TaxonRecord {
                id: RecordId(99),
                lineage: Lineage::default(),
                discovery: None,
                ordering: 99,
            },
            modified: 1,
        });
        let service = LayoutService::new(StaticSource::new(records));
        let full = service.get_full_layout(&scope()).unwrap();
        assert_eq!(
            full.warnings,
            vec![BuildWarning::EmptyLineage { record: RecordId(99) }]
        );
        // The anomalous record is attached, never dropped.
        assert!(full.nodes.iter().any(|n| n.name == "unranked"));
    }

    #[test]
    fn concurrent_scopes_share_only_the_cache() {
        let service = Arc::new(LayoutService::new(StaticSource::new(carnivorans())));
        let mut handles = Vec::new();
        for viewer in 0..4_u64 {
            let service = service.clone();
            handles.push(std::thread::spawn(move || {
                let scope = ScopeDescriptor {
                    viewer: ParticipantId(viewer),
                    visibility: Visibility::SelfOnly,
                };
                service.get_full_layout(&scope).unwrap()
            }));
        }
        let layouts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for layout in &layouts {
            assert_eq!(layout.nodes.len(), layouts[0].nodes.len());
        }
    }
}
