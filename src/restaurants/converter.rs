use crate::restaurants::error::RestaurantsResult;
use crate::restaurants::model::Restaurant;
use crate::store::value::MapValue;

/// Describes how to convert between typed models and stored document fields.
///
/// Writes use `to_map`, reads use `from_map`. A read failure marks the
/// document as malformed; the subscription's `MalformedDocumentPolicy`
/// decides whether that drops the document or rejects the whole snapshot.
pub trait DocumentConverter: Send + Sync + 'static {
    type Model: Clone + Send + Sync + 'static;

    fn to_map(&self, value: &Self::Model) -> RestaurantsResult<MapValue>;

    fn from_map(&self, value: &MapValue) -> RestaurantsResult<Self::Model>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RestaurantConverter;

impl DocumentConverter for RestaurantConverter {
    type Model = Restaurant;

    fn to_map(&self, value: &Restaurant) -> RestaurantsResult<MapValue> {
        value.to_map()
    }

    fn from_map(&self, value: &MapValue) -> RestaurantsResult<Restaurant> {
        Restaurant::from_map(value)
    }
}
