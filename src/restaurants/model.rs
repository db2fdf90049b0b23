use serde::{Deserialize, Serialize};

use crate::restaurants::error::{invalid_document, RestaurantsResult};
use crate::store::value::MapValue;

pub const FIELD_NAME: &str = "name";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_CITY: &str = "city";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_RATING_COUNT: &str = "numRatings";
pub const FIELD_AVERAGE_RATING: &str = "avgRating";

/// A restaurant as stored in the `restaurants` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub category: String,
    pub city: String,
    /// Price tier, 1 through 3.
    pub price: i64,
    #[serde(rename = "numRatings")]
    pub rating_count: i64,
    /// Mean star rating, 0 through 5.
    #[serde(rename = "avgRating")]
    pub average_rating: f64,
}

impl Restaurant {
    /// Builds a restaurant from document fields, rejecting missing, mistyped or
    /// out-of-range values.
    pub fn from_map(map: &MapValue) -> RestaurantsResult<Self> {
        let restaurant: Self = serde_json::from_value(map.to_json())
            .map_err(|err| invalid_document(err.to_string()))?;
        restaurant.validate()?;
        Ok(restaurant)
    }

    /// Encodes the restaurant as document fields under their stored names.
    pub fn to_map(&self) -> RestaurantsResult<MapValue> {
        self.validate()?;
        let json = serde_json::to_value(self).map_err(|err| invalid_document(err.to_string()))?;
        MapValue::from_json(json).map_err(|err| invalid_document(err.message()))
    }

    fn validate(&self) -> RestaurantsResult<()> {
        if !(1..=3).contains(&self.price) {
            return Err(invalid_document(format!(
                "'{FIELD_PRICE}' must be between 1 and 3, found {}",
                self.price
            )));
        }
        if self.rating_count < 0 {
            return Err(invalid_document(format!(
                "'{FIELD_RATING_COUNT}' must not be negative, found {}",
                self.rating_count
            )));
        }
        if !(0.0..=5.0).contains(&self.average_rating) {
            return Err(invalid_document(format!(
                "'{FIELD_AVERAGE_RATING}' must be between 0 and 5, found {}",
                self.average_rating
            )));
        }
        Ok(())
    }

    /// Star count shown in the list, the average rating rounded to the nearest whole star.
    pub fn star_count(&self) -> u8 {
        self.average_rating.round().clamp(0.0, 5.0) as u8
    }

    pub fn price_label(&self) -> &'static str {
        price_string(self.price)
    }
}

/// Renders a price tier as dollar signs; unknown tiers render empty.
pub fn price_string(price: i64) -> &'static str {
    match price {
        1 => "$",
        2 => "$$",
        3 => "$$$",
        _ => "",
    }
}
