use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::api::ResourceFetcher;
use crate::catalogue::CatalogueIndex;
use crate::error::DatasetError;
use crate::labels::{LabelRegistry, LabelView};
use crate::models::{Dataset, DatasetDescriptor, DatasetKind, LabelInfo, Place};
use crate::utils::{format_age, Stopwatch};

/// Datasets kept resident per kind unless configured otherwise.
pub const DEFAULT_CAPACITY_PER_KIND: usize = 5;

/// Resident-dataset bound, tracked independently for themes and trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCapacity {
    pub theme: usize,
    pub trip: usize,
}

impl Default for CacheCapacity {
    fn default() -> Self {
        Self::uniform(DEFAULT_CAPACITY_PER_KIND)
    }
}

impl CacheCapacity {
    pub fn uniform(per_kind: usize) -> Self {
        Self {
            theme: per_kind,
            trip: per_kind,
        }
    }

    /// A zero bound would evict the entry just inserted, so at least one
    /// dataset of each kind always stays resident.
    pub fn for_kind(&self, kind: DatasetKind) -> usize {
        let limit = match kind {
            DatasetKind::Theme => self.theme,
            DatasetKind::Trip => self.trip,
        };
        limit.max(1)
    }
}

/// A dataset body together with its merged label view.
#[derive(Debug)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub labels: LabelView,
    pub locator: String,
}

impl LoadedDataset {
    pub fn id(&self) -> &str {
        &self.dataset.id
    }

    pub fn kind(&self) -> DatasetKind {
        self.dataset.kind
    }

    pub fn places(&self) -> &[Place] {
        &self.dataset.places
    }

    pub fn label_info(&self, name: &str) -> LabelInfo {
        self.labels.resolve(name)
    }
}

struct CacheEntry {
    dataset: Arc<LoadedDataset>,
    /// Logical recency marker; larger is more recent
    last_used: u64,
    loaded_at: DateTime<Utc>,
}

impl CacheEntry {
    fn age_minutes(&self) -> i64 {
        (Utc::now() - self.loaded_at).num_minutes()
    }
}

type LoadResult = Result<Arc<LoadedDataset>, DatasetError>;
type LoadFuture = Shared<BoxFuture<'static, LoadResult>>;

#[derive(Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    /// Outstanding fetches keyed by id, tagged with a generation so a
    /// completion only installs its entry while it still owns the slot
    in_flight: HashMap<String, (u64, LoadFuture)>,
    clock: u64,
    next_generation: u64,
    fetches: usize,
}

impl StoreState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, id: &str) -> Option<Arc<LoadedDataset>> {
        let now = self.tick();
        self.entries.get_mut(id).map(|entry| {
            entry.last_used = now;
            Arc::clone(&entry.dataset)
        })
    }

    fn insert(&mut self, id: &str, dataset: Arc<LoadedDataset>) {
        let now = self.tick();
        self.entries.insert(
            id.to_string(),
            CacheEntry {
                dataset,
                last_used: now,
                loaded_at: Utc::now(),
            },
        );
    }

    fn resident_count(&self, kind: DatasetKind) -> usize {
        self.entries
            .values()
            .filter(|e| e.dataset.kind() == kind)
            .count()
    }
}

/// Bounded LRU cache of fully loaded datasets, fetched on demand.
///
/// All methods take `&self`; concurrent `get_or_load` calls for the same id
/// share one fetch. The internal lock is only held for bookkeeping, never
/// across a fetch.
pub struct DatasetStore {
    catalogue: Arc<CatalogueIndex>,
    labels: Arc<LabelRegistry>,
    fetcher: Arc<dyn ResourceFetcher>,
    capacity: CacheCapacity,
    state: Mutex<StoreState>,
}

impl DatasetStore {
    pub fn new(
        catalogue: Arc<CatalogueIndex>,
        labels: Arc<LabelRegistry>,
        fetcher: Arc<dyn ResourceFetcher>,
        capacity: CacheCapacity,
    ) -> Self {
        Self {
            catalogue,
            labels,
            fetcher,
            capacity,
            state: Mutex::new(StoreState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the dataset, fetching it if it is not resident.
    ///
    /// A hit refreshes the entry's recency. A miss resolves the locator
    /// through the catalogue, fetches and validates the body, inserts it and
    /// evicts the least recently used dataset of the same kind if the kind
    /// is over capacity.
    pub async fn get_or_load(&self, id: &str) -> LoadResult {
        let (generation, load) = {
            let mut state = self.lock();
            if let Some(dataset) = state.touch(id) {
                debug!(id, "Dataset cache hit");
                return Ok(dataset);
            }

            match state.in_flight.get(id) {
                Some((generation, load)) => {
                    debug!(id, "Joining in-flight dataset fetch");
                    (*generation, load.clone())
                }
                None => {
                    let descriptor = self
                        .catalogue
                        .get(id)
                        .cloned()
                        .ok_or_else(|| DatasetError::UnknownDataset(id.to_string()))?;

                    let generation = state.next_generation;
                    state.next_generation += 1;
                    state.fetches += 1;
                    debug!(id, locator = %descriptor.locator, "Dataset cache miss, fetching");

                    let load = Self::fetch(
                        Arc::clone(&self.fetcher),
                        Arc::clone(&self.labels),
                        descriptor,
                    )
                    .boxed()
                    .shared();
                    state
                        .in_flight
                        .insert(id.to_string(), (generation, load.clone()));
                    (generation, load)
                }
            }
        };

        let result = load.await;
        self.complete(id, generation, result)
    }

    async fn fetch(
        fetcher: Arc<dyn ResourceFetcher>,
        labels: Arc<LabelRegistry>,
        descriptor: DatasetDescriptor,
    ) -> LoadResult {
        let watch = Stopwatch::start("dataset_fetch");

        let body = fetcher
            .fetch(&descriptor.locator)
            .await
            .map_err(|e| DatasetError::Fetch {
                id: descriptor.id.clone(),
                source: Arc::new(e),
            })?;

        let dataset = Dataset::parse(&body).map_err(|e| DatasetError::Malformed {
            id: descriptor.id.clone(),
            reason: e.reason,
        })?;

        if dataset.id != descriptor.id {
            warn!(requested = %descriptor.id, declared = %dataset.id, "Dataset body declares a different id");
        }
        if dataset.kind != descriptor.kind {
            warn!(id = %descriptor.id, indexed = %descriptor.kind, loaded = %dataset.kind, "Dataset kind changed since indexing");
        }

        let label_view = labels.view(&dataset.label_overrides);
        watch.finish();
        info!(
            id = %descriptor.id,
            kind = %dataset.kind,
            places = dataset.places.len(),
            "Dataset loaded"
        );

        Ok(Arc::new(LoadedDataset {
            dataset,
            labels: label_view,
            locator: descriptor.locator,
        }))
    }

    fn complete(&self, id: &str, generation: u64, result: LoadResult) -> LoadResult {
        let mut state = self.lock();
        let owns_slot = state
            .in_flight
            .get(id)
            .map(|(g, _)| *g == generation)
            .unwrap_or(false);
        if owns_slot {
            state.in_flight.remove(id);
        }

        let dataset = match result {
            Ok(dataset) => dataset,
            Err(e) => {
                if owns_slot {
                    warn!(id, error = %e, "Dataset fetch failed");
                }
                return Err(e);
            }
        };

        if owns_slot {
            state.insert(id, Arc::clone(&dataset));
            self.evict_over_capacity(&mut state, dataset.kind(), id);
        } else if let Some(resident) = state.touch(id) {
            // Coalesced waiter: the owner already installed the entry
            return Ok(resident);
        }
        Ok(dataset)
    }

    fn evict_over_capacity(&self, state: &mut StoreState, kind: DatasetKind, keep: &str) {
        let limit = self.capacity.for_kind(kind);
        while state.resident_count(kind) > limit {
            let victim = state
                .entries
                .iter()
                .filter(|(key, entry)| entry.dataset.kind() == kind && key.as_str() != keep)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());

            match victim {
                Some(victim) => {
                    state.entries.remove(&victim);
                    debug!(evicted = %victim, %kind, limit, "Evicted least recently used dataset");
                }
                None => break,
            }
        }
    }

    /// Drop a resident dataset. The next `get_or_load` fetches it again.
    pub fn invalidate(&self, id: &str) -> bool {
        let mut state = self.lock();
        let in_flight = state.in_flight.remove(id).is_some();
        let removed = state.entries.remove(id).is_some();
        if removed || in_flight {
            debug!(id, "Dataset invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.in_flight.clear();
    }

    /// Resident dataset without refreshing its recency
    pub fn peek(&self, id: &str) -> Option<Arc<LoadedDataset>> {
        self.lock()
            .entries
            .get(id)
            .map(|entry| Arc::clone(&entry.dataset))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Resident ids of one kind, least recently used first
    pub fn resident(&self, kind: DatasetKind) -> Vec<String> {
        let state = self.lock();
        let mut resident: Vec<(&String, u64)> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.dataset.kind() == kind)
            .map(|(id, entry)| (id, entry.last_used))
            .collect();
        resident.sort_by_key(|(_, last_used)| *last_used);
        resident.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Human-readable age of a resident dataset
    pub fn entry_age(&self, id: &str) -> Option<String> {
        self.lock()
            .entries
            .get(id)
            .map(|entry| format_age(entry.age_minutes()))
    }

    /// Number of fetches started since construction
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    pub fn capacity(&self) -> CacheCapacity {
        self.capacity
    }

    pub fn catalogue(&self) -> &CatalogueIndex {
        &self.catalogue
    }
}

// ============================================================================
// Tests
// ============================================================================
