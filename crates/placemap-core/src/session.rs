//! A browsing session over one catalogue.
//!
//! `BrowseSession` owns the catalogue index, label registry, dataset store
//! and dispatcher, and drives the filter-then-search pipeline for the active
//! dataset. Results arrive asynchronously; call [`BrowseSession::pump`] from
//! a UI tick or [`BrowseSession::settle`] to wait for everything outstanding.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{fetch_json, ResourceFetcher};
use crate::cache::{DatasetStore, LoadedDataset};
use crate::catalogue::{discover, CatalogueIndex};
use crate::config::Config;
use crate::dispatch::{DispatchEvent, DispatchMode, Dispatcher};
use crate::error::{CatalogueError, DatasetError};
use crate::filter::{derive_facets, Facet, FilterSelection};
use crate::labels::{LabelRegistry, LabelSource};
use crate::models::{DayStop, LabelInfo, Place, Transportation, TransportationTable};
use crate::search::SearchOptions;

/// One trip stop resolved to its place and transportation mode.
#[derive(Debug, Clone, Copy)]
pub struct StopView<'a> {
    pub stop: &'a DayStop,
    pub place: &'a Place,
    pub transportation: Option<&'a Transportation>,
}

async fn load_transportations(fetcher: &dyn ResourceFetcher, locator: &str) -> TransportationTable {
    match fetch_json::<TransportationTable>(fetcher, locator).await {
        Ok(table) => {
            debug!(modes = table.len(), "Transportation table loaded");
            table
        }
        Err(e) => {
            warn!(locator = %locator, error = %e, "Failed to load transportation table");
            TransportationTable::default()
        }
    }
}

pub struct BrowseSession {
    catalogue: Arc<CatalogueIndex>,
    labels: Arc<LabelRegistry>,
    transportations: TransportationTable,
    store: DatasetStore,
    dispatcher: Dispatcher,
    search_options: SearchOptions,

    active: Option<Arc<LoadedDataset>>,
    active_places: Arc<[Place]>,
    selection: FilterSelection,
    query: String,
    /// Latest filter result over the active dataset
    filtered: Arc<[Place]>,
    /// Latest search result over `filtered`
    visible: Vec<Place>,
    last_error: Option<String>,
}

impl BrowseSession {
    /// Load labels, transportations and the catalogue, then build the store
    /// and dispatcher. Only a missing catalogue is fatal.
    pub async fn start(
        config: &Config,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Result<Self, CatalogueError> {
        info!(source = %fetcher.describe(), "Starting browse session");

        let layout = config.layout();
        let (labels, transportations, catalogue) = tokio::join!(
            LabelRegistry::load(fetcher.as_ref(), &config.labels_path),
            load_transportations(fetcher.as_ref(), &config.transportations_path),
            discover(fetcher.as_ref(), &layout),
        );
        let catalogue = Arc::new(catalogue?);
        let labels = Arc::new(labels);

        let store = DatasetStore::new(
            Arc::clone(&catalogue),
            Arc::clone(&labels),
            fetcher,
            config.capacity(),
        );
        let dispatcher = Dispatcher::new(config.use_worker);

        Ok(Self {
            catalogue,
            labels,
            transportations,
            store,
            dispatcher,
            search_options: config.search_options(),
            active: None,
            active_places: Arc::from(Vec::new()),
            selection: FilterSelection::new(),
            query: String::new(),
            filtered: Arc::from(Vec::new()),
            visible: Vec::new(),
            last_error: None,
        })
    }

    /// Make `id` the active dataset.
    ///
    /// The filter selection is cleared and the current query is re-run over
    /// the new places. Requests still outstanding for the previous dataset
    /// are superseded. On failure the previous dataset stays active.
    pub async fn select(&mut self, id: &str) -> Result<Arc<LoadedDataset>, DatasetError> {
        let dataset = self.store.get_or_load(id).await?;

        self.active_places = Arc::from(dataset.places());
        self.active = Some(Arc::clone(&dataset));
        self.selection.clear();
        self.filtered = Arc::clone(&self.active_places);
        self.visible = self.active_places.to_vec();
        self.last_error = None;
        info!(id, kind = %dataset.kind(), places = self.active_places.len(), "Dataset selected");

        self.dispatch_filter();
        self.dispatch_search();
        Ok(dataset)
    }

    /// Toggle a facet value. Returns whether it is now selected.
    pub fn toggle_filter(&mut self, category: &str, value: &str) -> bool {
        let selected = self.selection.toggle(category, value);
        self.dispatch_filter();
        selected
    }

    pub fn clear_filters(&mut self) {
        self.selection.clear();
        self.dispatch_filter();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.dispatch_search();
    }

    fn dispatch_filter(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.dispatcher
            .submit_filter(Arc::clone(&self.active_places), self.selection.clone());
    }

    /// Every search is dispatched, including the empty query, so an older
    /// search can never overwrite a newer pipeline result.
    fn dispatch_search(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.dispatcher.submit_search(
            Arc::clone(&self.filtered),
            self.query.clone(),
            self.search_options,
        );
    }

    fn apply_event(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::Filtered { places, .. } => {
                self.filtered = Arc::from(places);
                if self.query.trim().is_empty() {
                    self.visible = self.filtered.to_vec();
                }
                self.dispatch_search();
            }
            DispatchEvent::Searched { places, .. } => {
                self.visible = places;
            }
            DispatchEvent::Failed { token, kind, message } => {
                warn!(token, %kind, error = %message, "Dispatch request failed");
                self.last_error = Some(format!("{} failed: {}", kind, message));
            }
        }
    }

    /// Apply every result already delivered. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let events = self.dispatcher.try_recv();
        let applied = events.len();
        for event in events {
            self.apply_event(event);
        }
        applied
    }

    /// Wait until no request is outstanding, applying results as they arrive.
    pub async fn settle(&mut self) {
        while let Some(event) = self.dispatcher.recv().await {
            self.apply_event(event);
        }
    }

    pub fn catalogue(&self) -> &CatalogueIndex {
        &self.catalogue
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn active(&self) -> Option<&Arc<LoadedDataset>> {
        self.active.as_ref()
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Places passing the current filter and query
    pub fn visible_places(&self) -> &[Place] {
        &self.visible
    }

    /// Facets of the whole active dataset
    pub fn facets(&self) -> Vec<Facet> {
        derive_facets(&self.active_places)
    }

    pub fn label_info(&self, name: &str) -> LabelInfo {
        match &self.active {
            Some(dataset) => dataset.label_info(name),
            None => self.labels.resolve(name, None),
        }
    }

    pub fn label_source(&self) -> LabelSource {
        self.labels.source()
    }

    /// Stops of one day of the active trip, in visit order
    pub fn day_stops(&self, day_index: usize) -> Option<Vec<StopView<'_>>> {
        let dataset = self.active.as_ref()?;
        let stops = dataset.dataset.day_stops(day_index)?;
        Some(
            stops
                .into_iter()
                .map(|(stop, place)| StopView {
                    stop,
                    place,
                    transportation: stop
                        .transportation_id
                        .as_deref()
                        .and_then(|id| self.transportations.get(id)),
                })
                .collect(),
        )
    }

    pub fn transportations(&self) -> &TransportationTable {
        &self.transportations
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatcher.mode()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryFetcher;
    use crate::filter::DEFAULT_CATEGORY;
    use crate::models::DatasetKind;

    const FOOD: &str = r##"{
        "id": "jeju_food",
        "title": "Jeju Food",
        "labelOverrides": {"Cafe": {"color": "#00FF00"}},
        "places": [
            {"id": "1", "title": "Blue Cafe", "labels": ["Cafe", "Ocean View"], "location": {"lat": 33.4, "lng": 126.3}},
            {"id": "2", "title": "Cafe Blue", "labels": ["Cafe"], "location": {"lat": 33.5, "lng": 126.5}},
            {"id": "3", "title": "Ocean Cafe", "address": "Aewol", "labels": ["Restaurant", "Ocean View"], "location": {"lat": 33.4, "lng": 126.2}},
            {"id": "4", "title": "Black Pork Street", "location": {"lat": 33.5, "lng": 126.5}}
        ]
    }"##;

    const TRIP: &str = r#"{
        "id": "jeju_trip",
        "title": "Three days in Jeju",
        "places": [
            {"id": "a", "title": "Airport", "location": {"lat": 33.5, "lng": 126.4}},
            {"id": "b", "title": "Hallasan", "location": {"lat": 33.3, "lng": 126.5}}
        ],
        "days": [
            {"title": "Day 1", "places": [
                {"placeId": "b", "order": 2, "transportationId": "car"},
                {"placeId": "a", "order": 1}
            ]}
        ]
    }"#;

    fn fetcher() -> Arc<MemoryFetcher> {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("maps/jeju_food.json", FOOD);
        fetcher.insert("maps/jeju_trip.json", TRIP);
        fetcher.insert(
            "system/transportations.json",
            r#"{"transportations":[{"id":"car","type":"car","iconName":"mdi:car"}]}"#,
        );
        Arc::new(fetcher)
    }

    async fn session(use_worker: bool) -> BrowseSession {
        let config = Config {
            use_worker,
            ..Default::default()
        };
        let fetcher: Arc<dyn ResourceFetcher> = fetcher();
        BrowseSession::start(&config, fetcher).await.unwrap()
    }

    fn titles(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_start_absorbs_label_failure() {
        let session = session(false).await;
        assert_eq!(session.catalogue().len(), 2);
        assert_eq!(session.label_source(), LabelSource::BuiltIn);
        assert_eq!(session.transportations().len(), 1);
        assert!(session.active().is_none());
    }

    #[tokio::test]
    async fn test_start_without_catalogue_fails() {
        let fetcher: Arc<dyn ResourceFetcher> = Arc::new(MemoryFetcher::new());
        let result = BrowseSession::start(&Config::default(), fetcher).await;
        assert!(matches!(result, Err(CatalogueError::NoCatalogue { attempted: 0 })));
    }

    #[tokio::test]
    async fn test_filter_then_search_pipeline() {
        let mut session = session(true).await;
        session.select("jeju_food").await.unwrap();
        session.settle().await;
        assert_eq!(session.visible_places().len(), 4);

        session.toggle_filter(DEFAULT_CATEGORY, "Ocean View");
        session.settle().await;
        assert_eq!(titles(session.visible_places()), vec!["Blue Cafe", "Ocean Cafe"]);

        session.set_query("cafe");
        session.settle().await;
        assert_eq!(titles(session.visible_places()), vec!["Blue Cafe", "Ocean Cafe"]);

        session.clear_filters();
        session.settle().await;
        assert_eq!(
            titles(session.visible_places()),
            vec!["Cafe Blue", "Blue Cafe", "Ocean Cafe"]
        );

        session.set_query("");
        session.settle().await;
        assert_eq!(session.visible_places().len(), 4);
    }

    #[tokio::test]
    async fn test_rapid_changes_settle_on_latest() {
        let mut session = session(false).await;
        session.select("jeju_food").await.unwrap();
        session.set_query("c");
        session.set_query("ca");
        session.set_query("oce");
        session.toggle_filter(DEFAULT_CATEGORY, "Restaurant");
        session.toggle_filter(DEFAULT_CATEGORY, "Restaurant");
        session.toggle_filter(DEFAULT_CATEGORY, "Ocean View");
        session.settle().await;

        assert_eq!(titles(session.visible_places()), vec!["Ocean Cafe", "Blue Cafe"]);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_select_clears_selection_and_keeps_query() {
        let mut session = session(false).await;
        session.select("jeju_food").await.unwrap();
        session.toggle_filter(DEFAULT_CATEGORY, "Cafe");
        session.set_query("hall");
        session.settle().await;
        assert!(session.visible_places().is_empty());

        session.select("jeju_trip").await.unwrap();
        assert!(session.selection().is_empty());
        assert_eq!(session.query(), "hall");
        session.settle().await;
        assert_eq!(titles(session.visible_places()), vec!["Hallasan"]);
    }

    #[tokio::test]
    async fn test_failed_select_keeps_previous_dataset() {
        let mut session = session(false).await;
        session.select("jeju_food").await.unwrap();
        let err = session.select("nowhere").await.unwrap_err();
        assert!(matches!(err, DatasetError::UnknownDataset(_)));
        assert_eq!(session.active().map(|d| d.id()), Some("jeju_food"));
    }

    #[tokio::test]
    async fn test_facets_and_labels_follow_active_dataset() {
        let mut session = session(false).await;
        assert_eq!(session.label_info("Cafe").color, "#795548");

        session.select("jeju_food").await.unwrap();
        let facets = session.facets();
        assert_eq!(facets[0].value, "Cafe");
        assert_eq!(facets[0].count, 2);
        assert_eq!(session.label_info("Cafe").color, "#00FF00");
    }

    #[tokio::test]
    async fn test_day_stops_resolve_transportation() {
        let mut session = session(false).await;
        let trip = session.select("jeju_trip").await.unwrap();
        assert_eq!(trip.kind(), DatasetKind::Trip);

        let stops = session.day_stops(0).unwrap();
        let ids: Vec<&str> = stops.iter().map(|s| s.place.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(stops[0].transportation.is_none());
        assert_eq!(stops[1].transportation.map(|t| t.icon_name.as_str()), Some("mdi:car"));
        assert!(session.day_stops(1).is_none());
    }

    #[tokio::test]
    async fn test_pump_applies_inline_results() {
        let mut session = session(false).await;
        session.select("jeju_food").await.unwrap();
        session.toggle_filter(DEFAULT_CATEGORY, "Restaurant");
        // The first filter is superseded; the select search and the new
        // filter are applied, then the search that filter triggers
        assert_eq!(session.pump(), 2);
        assert_eq!(session.pump(), 1);
        assert_eq!(titles(session.visible_places()), vec!["Ocean Cafe"]);
        assert_eq!(session.pump(), 0);
    }

    #[tokio::test]
    async fn test_pump_after_select_never_shows_previous_dataset() {
        let mut session = session(false).await;
        session.select("jeju_food").await.unwrap();
        session.set_query("a");
        session.pump();
        assert_eq!(session.visible_places().len(), 4);

        session.select("jeju_trip").await.unwrap();
        session.pump();
        assert_eq!(session.active().map(|d| d.id()), Some("jeju_trip"));
        assert_eq!(titles(session.visible_places()), vec!["Airport", "Hallasan"]);

        session.settle().await;
        assert_eq!(titles(session.visible_places()), vec!["Airport", "Hallasan"]);
    }
}
