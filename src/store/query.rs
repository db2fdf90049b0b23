use crate::store::error::{invalid_argument, StoreResult};
use crate::store::model::{DocumentKey, ResourcePath};
use crate::store::value::FieldValue;

/// An equality constraint on a top-level document field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: String,
    value: FieldValue,
}

impl FieldFilter {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    field: String,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// Declarative description of the documents a listener receives.
///
/// Definitions are immutable values: every builder method consumes the
/// definition and returns a refined copy, so a definition shared with an
/// active listener can never change underneath it.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    collection_path: ResourcePath,
    filters: Vec<FieldFilter>,
    order_by: Vec<OrderBy>,
    limit: Option<u32>,
}

impl QueryDefinition {
    pub fn new(collection_path: ResourcePath) -> StoreResult<Self> {
        if collection_path.len() % 2 == 0 {
            return Err(invalid_argument(
                "Queries must reference a collection (odd number of path segments)",
            ));
        }
        Ok(Self {
            collection_path,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        })
    }

    /// Caps the number of documents in every snapshot.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn where_equal(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by_fields(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn result_limit(&self) -> Option<u32> {
        self.limit
    }

    pub(crate) fn targets(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }
}
