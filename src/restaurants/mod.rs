//! The restaurant directory: typed records, filter-driven queries and the
//! live list kept in sync with the store.
//!
//! ```no_run
//! use std::sync::Arc;
//! use fire_eats::restaurants::{FilterSelection, RestaurantList, RestaurantListSettings};
//! use fire_eats::store::MemoryStore;
//!
//! let list = RestaurantList::new(
//!     Arc::new(MemoryStore::new()),
//!     RestaurantListSettings::default(),
//!     Arc::new(|| println!("reload")),
//! )?;
//! list.start()?;
//! list.populate()?;
//! list.apply_filters(FilterSelection::new().with_category("Pizza"))?;
//! for restaurant in list.rows() {
//!     println!("{} {}", restaurant.name, restaurant.price_label());
//! }
//! # Ok::<(), fire_eats::restaurants::RestaurantsError>(())
//! ```

mod converter;
pub mod error;
mod filters;
mod list;
mod model;
mod query_builder;
pub mod seed;
mod settings;
mod subscription;
mod synchronizer;

pub use converter::{DocumentConverter, RestaurantConverter};
pub use error::{RestaurantsError, RestaurantsErrorCode, RestaurantsResult};
pub use filters::{ActiveFilterLabels, FilterState};
pub use list::{RestaurantDetail, RestaurantList};
pub use model::{
    price_string, Restaurant, FIELD_AVERAGE_RATING, FIELD_CATEGORY, FIELD_CITY, FIELD_NAME,
    FIELD_PRICE, FIELD_RATING_COUNT,
};
pub use query_builder::{base_query, build_query, FilterSelection};
pub use settings::{
    MalformedDocumentPolicy, RestaurantListSettings, DEFAULT_COLLECTION, DEFAULT_SEED_BATCH_SIZE,
    RESULT_LIMIT,
};
pub use subscription::{ErrorCallback, LiveQuerySubscription, SnapshotSink, UpdateCallback};
pub use synchronizer::{ListSynchronizer, RefreshSink};
