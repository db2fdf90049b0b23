use std::fmt;
use std::sync::{Arc};

use rand::thread_rng;

use crate::restaurants::converter::RestaurantConverter;
use crate::restaurants::error::{RestaurantsError, RestaurantsResult};
use crate::restaurants::filters::{ActiveFilterLabels, FilterState};
use crate::restaurants::model::Restaurant;
use crate::restaurants::query_builder::{base_query, FilterSelection};
use crate::restaurants::seed::{populate, random_image_url};
use crate::restaurants::settings::RestaurantListSettings;
use crate::restaurants::subscription::LiveQuerySubscription;
use crate::restaurants::synchronizer::{ListSynchronizer, RefreshSink};
use crate::store::model::ResourcePath;
use crate::store::{
    CollectionReference, DocumentReference, DocumentStore, QueryDefinition, StoreResult,
};

/// Everything needed to show one restaurant on its own screen.
#[derive(Clone, Debug, PartialEq)]
pub struct RestaurantDetail {
    pub restaurant: Restaurant,
    pub reference: DocumentReference,
    pub title_image_url: String,
}

/// The restaurant directory screen: a filterable list bound to the
/// `restaurants` collection.
///
/// The store is injected; the list owns its subscription and synchronizer
/// and wires them together on construction. Nothing is observed until
/// `start` is called, and dropping the list removes its listener.
pub struct RestaurantList {
    settings: RestaurantListSettings,
    collection: CollectionReference,
    subscription: Arc<LiveQuerySubscription<RestaurantConverter>>,
    synchronizer: Arc<ListSynchronizer<Restaurant>>,
    filters: FilterState<RestaurantConverter>,
}

impl RestaurantList {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        settings: RestaurantListSettings,
        refresh: Arc<dyn RefreshSink>,
    ) -> RestaurantsResult<Self> {
        let path = ResourcePath::from_string(&settings.collection)?;
        let collection = CollectionReference::new(Arc::clone(&store), path)?;

        let synchronizer = Arc::new(ListSynchronizer::new(refresh));
        let subscription = Arc::new(LiveQuerySubscription::new(
            store,
            RestaurantConverter,
            settings.malformed_policy,
        ));
        subscription.bind_sink(synchronizer.clone());

        let filters = FilterState::new(base_query(&collection), Arc::clone(&subscription));

        Ok(Self {
            settings,
            collection,
            subscription,
            synchronizer,
            filters,
        })
    }

    /// Receives push failures and rejected snapshots.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(RestaurantsError) + Send + Sync + 'static,
    {
        self.subscription.on_error(callback);
    }

    /// Starts observing the query for the current filters.
    pub fn start(&self) -> RestaurantsResult<()> {
        self.filters.observe()
    }

    /// Stops observing. The last snapshot stays readable.
    pub fn stop(&self) {
        self.subscription.detach();
    }

    pub fn is_observing(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn apply_filters(&self, selection: FilterSelection) -> RestaurantsResult<()> {
        self.filters.apply_filters(selection)
    }

    pub fn clear_filters(&self) -> RestaurantsResult<()> {
        self.filters.clear_filters()
    }

    pub fn filter_selection(&self) -> FilterSelection {
        self.filters.selection()
    }

    pub fn active_filter_labels(&self) -> ActiveFilterLabels {
        self.filters.labels()
    }

    pub fn current_query(&self) -> QueryDefinition {
        self.filters.current_query()
    }

    /// Writes a batch of random restaurants into the collection.
    pub fn populate(&self) -> RestaurantsResult<Vec<DocumentReference>> {
        let written = populate(
            &self.collection,
            &RestaurantConverter,
            &mut thread_rng(),
            self.settings.seed_batch_size,
        )?;
        log::info!(
            "added {} restaurants to {}",
            written.len(),
            self.collection.path()
        );
        Ok(written)
    }

    pub fn row_count(&self) -> usize {
        self.synchronizer.row_count()
    }

    pub fn row_at(&self, index: usize) -> RestaurantsResult<Restaurant> {
        self.synchronizer.record_at(index)
    }

    pub fn rows(&self) -> Vec<Restaurant> {
        self.synchronizer.records()
    }

    pub fn select_row(&self, index: usize) -> RestaurantsResult<RestaurantDetail> {
        let (restaurant, reference) = self.synchronizer.row(index)?;
        Ok(RestaurantDetail {
            restaurant,
            reference,
            title_image_url: random_image_url(&mut thread_rng()),
        })
    }

    /// Deletes the document behind row `index`; the row disappears with the
    /// next snapshot.
    pub fn delete_row(&self, index: usize) -> RestaurantsResult<()> {
        self.synchronizer.delete_at(index)
    }

    pub fn delete_row_with<F>(&self, index: usize, completion: F) -> RestaurantsResult<()>
    where
        F: FnOnce(StoreResult<()>) + Send + 'static,
    {
        self.synchronizer.delete_at_with(index, completion)
    }

    pub fn settings(&self) -> &RestaurantListSettings {
        &self.settings
    }
}

impl Drop for RestaurantList {
    fn drop(&mut self) {
        self.subscription.detach();
    }
}

impl fmt::Debug for RestaurantList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestaurantList")
            .field("collection", &self.collection)
            .field("rows", &self.row_count())
            .field("observing", &self.is_observing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn list(store: &MemoryStore) -> RestaurantList {
        RestaurantList::new(
            Arc::new(store.clone()),
            RestaurantListSettings::default(),
            Arc::new(|| {}),
        )
        .unwrap()
    }

    #[test]
    fn nothing_is_observed_before_start() {
        let store = MemoryStore::new();
        let list = list(&store);
        assert!(!list.is_observing());
        assert_eq!(store.listener_count(), 0);

        list.start().unwrap();
        assert!(list.is_observing());
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn stop_keeps_rows_and_start_resumes_current_filters() {
        let store = MemoryStore::new();
        let list = list(&store);
        list.start().unwrap();
        list.populate().unwrap();
        assert_eq!(list.row_count(), 20);

        list.stop();
        assert_eq!(store.listener_count(), 0);
        assert_eq!(list.row_count(), 20);

        list.apply_filters(FilterSelection::new().with_price(2)).unwrap();
        list.stop();
        list.start().unwrap();
        assert!(list.rows().iter().all(|restaurant| restaurant.price == 2));
    }

    #[test]
    fn select_row_pairs_record_with_reference() {
        let store = MemoryStore::new();
        let list = list(&store);
        list.start().unwrap();
        list.populate().unwrap();

        let detail = list.select_row(3).unwrap();
        let stored = store.document(detail.reference.key()).unwrap();
        assert_eq!(Restaurant::from_map(&stored).unwrap(), detail.restaurant);
        assert!(detail.title_image_url.ends_with(".png"));
        assert!(list.select_row(20).is_err());
    }

    #[test]
    fn rejects_document_paths_as_collection() {
        let store = MemoryStore::new();
        let settings = RestaurantListSettings {
            collection: "restaurants/abc".into(),
            ..Default::default()
        };
        let err = RestaurantList::new(Arc::new(store), settings, Arc::new(|| {})).unwrap_err();
        assert_eq!(err.code_str(), "restaurants/store");
    }

    #[test]
    fn dropping_the_list_removes_its_listener() {
        let store = MemoryStore::new();
        let list = list(&store);
        list.start().unwrap();
        drop(list);
        assert_eq!(store.listener_count(), 0);
    }
}
