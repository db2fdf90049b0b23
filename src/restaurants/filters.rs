use std::sync::{Arc, Mutex};

use crate::restaurants::converter::DocumentConverter;
use crate::restaurants::error::RestaurantsResult;
use crate::restaurants::model::price_string;
use crate::restaurants::query_builder::{build_query, FilterSelection};
use crate::restaurants::subscription::LiveQuerySubscription;
use crate::store::QueryDefinition;

/// Labels shown above the list for the filters in effect. `None` hides a label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveFilterLabels {
    pub category: Option<String>,
    pub city: Option<String>,
    pub price: Option<&'static str>,
}

impl ActiveFilterLabels {
    pub fn from_selection(selection: &FilterSelection) -> Self {
        let selection = selection.clone().normalized();
        Self {
            category: selection.category,
            city: selection.city,
            price: selection.price.map(price_string),
        }
    }

    /// Whether the whole label row can be hidden.
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.city.is_none() && self.price.is_none()
    }
}

#[derive(Clone, Debug)]
struct AppliedFilters {
    selection: FilterSelection,
    query: QueryDefinition,
}

/// The filter selection in effect and the query derived from it.
///
/// Applying filters rebuilds the query from the base and hands it to the
/// subscription, which swaps its listener.
pub struct FilterState<C>
where
    C: DocumentConverter,
{
    base: QueryDefinition,
    subscription: Arc<LiveQuerySubscription<C>>,
    applied: Mutex<AppliedFilters>,
}

impl<C> FilterState<C>
where
    C: DocumentConverter,
{
    pub fn new(base: QueryDefinition, subscription: Arc<LiveQuerySubscription<C>>) -> Self {
        let applied = AppliedFilters {
            selection: FilterSelection::default(),
            query: base.clone(),
        };
        Self {
            base,
            subscription,
            applied: Mutex::new(applied),
        }
    }

    /// Rebuilds the query for `selection` and attaches it. The selection is
    /// recorded only once its listener is in place. A failed attach leaves
    /// nothing observed and the previous selection recorded, so `observe`
    /// retries the last working query.
    pub fn apply_filters(&self, selection: FilterSelection) -> RestaurantsResult<()> {
        let selection = selection.normalized();
        let query = build_query(&self.base, &selection);
        self.subscription.attach(query.clone())?;

        let mut applied = self.applied.lock().unwrap();
        // A concurrent apply may have attached after us; keep whichever
        // selection the subscription actually observes.
        if self.subscription.query().as_ref() == Some(&query) {
            *applied = AppliedFilters { selection, query };
        }
        Ok(())
    }

    pub fn clear_filters(&self) -> RestaurantsResult<()> {
        self.apply_filters(FilterSelection::default())
    }

    /// Attaches the query for the current selection, e.g. when the list
    /// becomes visible again.
    pub fn observe(&self) -> RestaurantsResult<()> {
        let query = self.current_query();
        self.subscription.attach(query)
    }

    pub fn selection(&self) -> FilterSelection {
        self.applied.lock().unwrap().selection.clone()
    }

    pub fn current_query(&self) -> QueryDefinition {
        self.applied.lock().unwrap().query.clone()
    }

    pub fn base_query(&self) -> &QueryDefinition {
        &self.base
    }

    pub fn labels(&self) -> ActiveFilterLabels {
        ActiveFilterLabels::from_selection(&self.applied.lock().unwrap().selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restaurants::converter::RestaurantConverter;
    use crate::restaurants::settings::MalformedDocumentPolicy;
    use crate::store::model::ResourcePath;
    use crate::store::error::permission_denied;
    use crate::store::MemoryStore;
    use std::thread;

    fn state(store: &MemoryStore) -> FilterState<RestaurantConverter> {
        let base = QueryDefinition::new(ResourcePath::from_string("restaurants").unwrap())
            .unwrap()
            .limit(50);
        let subscription = Arc::new(LiveQuerySubscription::new(
            Arc::new(store.clone()),
            RestaurantConverter,
            MalformedDocumentPolicy::Skip,
        ));
        FilterState::new(base, subscription)
    }

    #[test]
    fn apply_attaches_the_rebuilt_query() {
        let store = MemoryStore::new();
        let filters = state(&store);

        filters
            .apply_filters(FilterSelection::new().with_category("Pizza").with_price(1))
            .unwrap();

        assert_eq!(store.listener_count(), 1);
        assert_eq!(filters.current_query().filters().len(), 2);
        assert_eq!(filters.subscription.query(), Some(filters.current_query()));
        assert_eq!(
            filters.labels(),
            ActiveFilterLabels {
                category: Some("Pizza".into()),
                city: None,
                price: Some("$"),
            }
        );
    }

    #[test]
    fn later_selection_replaces_earlier_predicates() {
        let store = MemoryStore::new();
        let filters = state(&store);

        filters
            .apply_filters(FilterSelection::new().with_category("Pizza"))
            .unwrap();
        filters
            .apply_filters(FilterSelection::new().with_city("Millbrae"))
            .unwrap();

        let query = filters.current_query();
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].field(), "city");
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn failed_attach_keeps_the_previous_selection() {
        let store = MemoryStore::new();
        let filters = state(&store);
        filters
            .apply_filters(FilterSelection::new().with_category("Pizza"))
            .unwrap();

        store.fail_next_listen(permission_denied("rules rejected the query"));
        let err = filters
            .apply_filters(FilterSelection::new().with_city("Millbrae"))
            .unwrap_err();

        assert_eq!(err.code_str(), "restaurants/store");
        assert_eq!(filters.selection(), FilterSelection::new().with_category("Pizza"));
        assert_eq!(filters.labels().city, None);
        assert!(filters.subscription.query().is_none());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn concurrent_applies_agree_with_the_subscription() {
        let store = MemoryStore::new();
        let filters = Arc::new(state(&store));

        let workers: Vec<_> = ["Pizza", "Pho", "Burgers", "Dim Sum"]
            .into_iter()
            .map(|category| {
                let filters = Arc::clone(&filters);
                thread::spawn(move || {
                    for _ in 0..25 {
                        filters
                            .apply_filters(FilterSelection::new().with_category(category))
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(filters.subscription.query(), Some(filters.current_query()));
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn clear_reverts_to_base() {
        let store = MemoryStore::new();
        let filters = state(&store);
        filters
            .apply_filters(FilterSelection::new().with_sort_by("name"))
            .unwrap();

        filters.clear_filters().unwrap();

        assert_eq!(&filters.current_query(), filters.base_query());
        assert_eq!(filters.selection(), FilterSelection::default());
        assert!(filters.labels().is_empty());
    }
}
