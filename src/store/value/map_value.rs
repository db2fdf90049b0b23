use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::store::error::{invalid_argument, StoreResult};
use crate::store::value::FieldValue;

/// The field map stored in a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: BTreeMap<String, FieldValue>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn into_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(field, value)| (field.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Reads a JSON object as document fields.
    pub fn from_json(value: JsonValue) -> StoreResult<Self> {
        match value {
            JsonValue::Object(entries) => entries
                .into_iter()
                .map(|(field, value)| FieldValue::from_json(value).map(|value| (field, value)))
                .collect(),
            other => Err(invalid_argument(format!("Expected a JSON object, found {other}"))),
        }
    }
}

impl<K> FromIterator<(K, FieldValue)> for MapValue
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
