use crate::restaurants::model::{FIELD_CATEGORY, FIELD_CITY, FIELD_PRICE};
use crate::restaurants::settings::RESULT_LIMIT;
use crate::store::{CollectionReference, OrderDirection, QueryDefinition};

/// The filter choices a user has made. `None` means "no constraint".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub category: Option<String>,
    pub city: Option<String>,
    pub price: Option<i64>,
    pub sort_by: Option<String>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    /// Returns the selection with empty strings treated as unset.
    pub fn normalized(self) -> Self {
        Self {
            category: non_empty(self.category),
            city: non_empty(self.city),
            price: self.price,
            sort_by: non_empty(self.sort_by),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clone().normalized() == Self::default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Every restaurant in `collection`, capped at `RESULT_LIMIT`.
pub fn base_query(collection: &CollectionReference) -> QueryDefinition {
    collection.query().limit(RESULT_LIMIT)
}

/// Refines `base` with one equality constraint per set filter, then the sort.
///
/// Constraints are always added in the order category, city, price, so equal
/// selections produce equal definitions.
pub fn build_query(base: &QueryDefinition, selection: &FilterSelection) -> QueryDefinition {
    let selection = selection.clone().normalized();
    let mut filtered = base.clone();

    if let Some(category) = selection.category {
        filtered = filtered.where_equal(FIELD_CATEGORY, category);
    }

    if let Some(city) = selection.city {
        filtered = filtered.where_equal(FIELD_CITY, city);
    }

    if let Some(price) = selection.price {
        filtered = filtered.where_equal(FIELD_PRICE, price);
    }

    if let Some(sort_by) = selection.sort_by {
        filtered = filtered.order_by(sort_by, OrderDirection::Ascending);
    }

    filtered
}
