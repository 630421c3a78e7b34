// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-flight layout cache with push-based fan-out invalidation.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::{Arc, Condvar, Mutex};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use canopy_chunks::ChunkIndex;
use canopy_hierarchy::{BuildWarning, Hierarchy, RecordId};
use canopy_layout::Layout;

use crate::scope::{ScopeFingerprint, ScopeParamsDigest};

/// The full pipeline product for one generation of one scope.
///
/// Immutable once built; shared behind `Arc` so chunk queries read a
/// consistent snapshot without locks while newer generations replace it in
/// the cache.
#[derive(Clone, Debug)]
pub struct ScopeLayout {
    /// The constructed hierarchy.
    pub hierarchy: Hierarchy,
    /// Node positions and bounds.
    pub layout: Layout,
    /// The spatial chunk grid.
    pub chunks: ChunkIndex,
    /// Per-record anomalies recovered while building.
    pub warnings: Vec<BuildWarning>,
}

/// Hard failure of a whole computation.
///
/// Per-record anomalies never land here; they are recovered into
/// [`ScopeLayout::warnings`]. A failed computation is never stored: the
/// in-flight slot is evicted so the next requester retries.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    /// The computing caller unwound before producing a result.
    #[error("layout computation was abandoned before completing")]
    Abandoned,
}

/// Cache activity counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a ready entry.
    pub hits: u64,
    /// Requests that computed a fresh entry.
    pub misses: u64,
    /// Requests that waited on another requester's in-flight computation.
    pub waits: u64,
    /// Entries removed by invalidation or generation turnover.
    pub evictions: u64,
}

/// Memoizes the build→layout→chunk pipeline per scope fingerprint.
///
/// The store is the only mutable state shared between scopes. Lookups are a
/// two-phase ready/in-flight scheme: a miss installs an in-flight marker
/// under the lock, computes outside it, and publishes the result to any
/// requesters that arrived meanwhile — one computation per key, ever.
/// Compute errors evict the marker so later callers retry; a stale entry is
/// never served past invalidation because eviction drops it from the map
/// before `invalidate_*` returns.
///
/// Secondary indexes by record id and by scope parameters drive fan-out
/// invalidation: one record edit must evict every generation of every scope
/// whose resolved record set included it.
#[derive(Debug, Default)]
pub struct LayoutCache {
    inner: Mutex<Inner>,
    stats: AtomicStats,
}

impl LayoutCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached layout for `key`, computing and storing it if
    /// absent.
    ///
    /// `records` is the resolved record-id set backing this generation; it
    /// feeds the invalidation indexes. Concurrent requesters for the same
    /// key block on the first requester's computation instead of repeating
    /// it, and observe the same `Arc`.
    pub fn get_or_compute<F>(
        &self,
        key: ScopeFingerprint,
        params: ScopeParamsDigest,
        records: &[RecordId],
        compute: F,
    ) -> Result<Arc<ScopeLayout>, ComputeError>
    where
        F: FnOnce() -> Result<ScopeLayout, ComputeError>,
    {
        enum Action {
            Hit(Arc<ScopeLayout>),
            Wait(Arc<Flight>),
            Compute(Arc<Flight>),
        }

        let action = {
            let mut inner = self.inner.lock().expect("cache lock poisoned");
            match inner.entries.get(&key) {
                Some(entry) => match &entry.slot {
                    Slot::Ready(snapshot) => {
                        self.stats.hits.fetch_add(1, Relaxed);
                        Action::Hit(snapshot.clone())
                    }
                    Slot::InFlight(flight) => {
                        self.stats.waits.fetch_add(1, Relaxed);
                        Action::Wait(flight.clone())
                    }
                },
                None => {
                    self.stats.misses.fetch_add(1, Relaxed);
                    let flight = Arc::new(Flight::default());
                    inner.insert(key, params, records, Slot::InFlight(flight.clone()));
                    Action::Compute(flight)
                }
            }
        };

        match action {
            Action::Hit(snapshot) => Ok(snapshot),
            Action::Wait(flight) => {
                let mut result = flight.result.lock().expect("flight lock poisoned");
                while result.is_none() {
                    result = flight.ready.wait(result).expect("flight lock poisoned");
                }
                result.clone().expect("checked above")
            }
            Action::Compute(flight) => {
                // The guard publishes `Abandoned` and evicts the marker if
                // `compute` unwinds, so waiters can never hang on it.
                let mut guard = FlightGuard {
                    cache: self,
                    key,
                    flight,
                    finished: false,
                };
                let result = compute().map(Arc::new);
                guard.finish(result.clone());
                result
            }
        }
    }

    /// Evict every entry whose resolved record set includes `record`.
    ///
    /// This is the conservative fan-out reading: the record's own scope and
    /// every aggregate scope built over it all recorded the id, so all of
    /// them go.
    pub fn invalidate_record(&self, record: RecordId) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let keys: Vec<_> = inner
            .by_record
            .get(&record)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        let evicted = keys.len() as u64;
        for key in keys {
            inner.remove(key);
        }
        if evicted > 0 {
            self.stats.evictions.fetch_add(evicted, Relaxed);
            debug!(%record, evicted, "record invalidation fan-out");
        }
    }

    /// Evict every generation of the scope identified by `params`.
    pub fn invalidate_scope(&self, params: ScopeParamsDigest) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let keys: Vec<_> = inner
            .by_params
            .get(&params)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        let evicted = keys.len() as u64;
        for key in keys {
            inner.remove(key);
        }
        if evicted > 0 {
            self.stats.evictions.fetch_add(evicted, Relaxed);
            debug!(%params, evicted, "scope invalidation");
        }
    }

    /// Number of ready entries.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner
            .entries
            .values()
            .filter(|e| matches!(e.slot, Slot::Ready(_)))
            .count()
    }

    /// True when no entry is ready.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Relaxed),
            misses: self.stats.misses.load(Relaxed),
            waits: self.stats.waits.load(Relaxed),
            evictions: self.stats.evictions.load(Relaxed),
        }
    }

    /// Store the finished computation, or clean up after a failed one.
    fn settle(
        &self,
        key: ScopeFingerprint,
        flight: &Arc<Flight>,
        result: &Result<Arc<ScopeLayout>, ComputeError>,
    ) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        // The marker may have been evicted mid-flight by an invalidation;
        // in that case the result still reaches the waiters through the
        // flight cell, but it must not re-enter the map.
        let still_ours = matches!(
            inner.entries.get(&key),
            Some(entry) if matches!(&entry.slot, Slot::InFlight(f) if Arc::ptr_eq(f, flight))
        );
        if !still_ours {
            return;
        }
        match result {
            Ok(snapshot) => {
                let params = inner.entries[&key].params;
                inner
                    .entries
                    .get_mut(&key)
                    .expect("entry present")
                    .slot = Slot::Ready(snapshot.clone());
                // New generation supersedes older ones of the same scope;
                // they are unreachable through current fingerprints and
                // would otherwise linger until a matching invalidation.
                let stale: Vec<_> = inner
                    .by_params
                    .get(&params)
                    .map(|set| set.iter().copied().filter(|k| *k != key).collect())
                    .unwrap_or_default();
                let evicted = stale.len() as u64;
                for old in stale {
                    inner.remove(old);
                }
                if evicted > 0 {
                    self.stats.evictions.fetch_add(evicted, Relaxed);
                }
            }
            Err(_) => {
                inner.remove(key);
            }
        }
    }
}

#[derive(Debug, Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    waits: AtomicU64,
    evictions: AtomicU64,
}

/// Shared cell a computing requester publishes its result through.
#[derive(Debug, Default)]
struct Flight {
    result: Mutex<Option<Result<Arc<ScopeLayout>, ComputeError>>>,
    ready: Condvar,
}

impl Flight {
    fn publish(&self, result: Result<Arc<ScopeLayout>, ComputeError>) {
        let mut slot = self.result.lock().expect("flight lock poisoned");
        if slot.is_none() {
            *slot = Some(result);
        }
        self.ready.notify_all();
    }
}

#[derive(Debug)]
enum Slot {
    Ready(Arc<ScopeLayout>),
    InFlight(Arc<Flight>),
}

#[derive(Debug)]
struct CacheEntry {
    slot: Slot,
    params: ScopeParamsDigest,
    records: Vec<RecordId>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: FxHashMap<ScopeFingerprint, CacheEntry>,
    by_record: FxHashMap<RecordId, FxHashSet<ScopeFingerprint>>,
    by_params: FxHashMap<ScopeParamsDigest, FxHashSet<ScopeFingerprint>>,
}

impl Inner {
    fn insert(
        &mut self,
        key: ScopeFingerprint,
        params: ScopeParamsDigest,
        records: &[RecordId],
        slot: Slot,
    ) {
        for record in records {
            self.by_record.entry(*record).or_default().insert(key);
        }
        self.by_params.entry(params).or_default().insert(key);
        self.entries.insert(
            key,
            CacheEntry {
                slot,
                params,
                records: records.to_vec(),
            },
        );
    }

    fn remove(&mut self, key: ScopeFingerprint) {
        let Some(entry) = self.entries.remove(&key) else {
            return;
        };
        for record in &entry.records {
            if let Some(set) = self.by_record.get_mut(record) {
                set.remove(&key);
                if set.is_empty() {
                    self.by_record.remove(record);
                }
            }
        }
        if let Some(set) = self.by_params.get_mut(&entry.params) {
            set.remove(&key);
            if set.is_empty() {
                self.by_params.remove(&entry.params);
            }
        }
    }
}

/// Cleans up an in-flight computation on unwind.
struct FlightGuard<'a> {
    cache: &'a LayoutCache,
    key: ScopeFingerprint,
    flight: Arc<Flight>,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(&mut self, result: Result<Arc<ScopeLayout>, ComputeError>) {
        self.flight.publish(result.clone());
        self.cache.settle(self.key, &self.flight, &result);
        self.finished = true;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.flight.publish(Err(ComputeError::Abandoned));
            self.cache
                .settle(self.key, &self.flight, &Err(ComputeError::Abandoned));
        }
    }
}
