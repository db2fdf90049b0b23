use std::cmp::Ordering;

use serde_json::{Number, Value as JsonValue};

use crate::store::error::{invalid_argument, StoreResult};

#[derive(Clone, Debug, PartialEq)]
pub struct FieldValue {
    kind: ValueKind,
}

#[derive(Clone, Debug, PartialEq)]
enum ValueKind {
    Null,
    Integer(i64),
    Double(f64),
    String(String),
}

impl FieldValue {
    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            kind: ValueKind::Double(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// Reads a numeric value as a double; integers widen losslessly for the
    /// ranges stored in documents.
    pub fn as_double(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Double(value) => Some(value),
            ValueKind::Integer(value) => Some(value as f64),
            _ => None,
        }
    }

    /// Orders two values of comparable kinds. Integers and doubles compare
    /// numerically with each other; mixed kinds are unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => Some(Ordering::Equal),
            (ValueKind::Integer(a), ValueKind::Integer(b)) => Some(a.cmp(b)),
            (ValueKind::Double(a), ValueKind::Double(b)) => a.partial_cmp(b),
            (ValueKind::Integer(a), ValueKind::Double(b)) => (*a as f64).partial_cmp(b),
            (ValueKind::Double(a), ValueKind::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Encodes the value as JSON. Doubles JSON cannot represent become null.
    pub fn to_json(&self) -> JsonValue {
        match &self.kind {
            ValueKind::Null => JsonValue::Null,
            ValueKind::Integer(value) => JsonValue::from(*value),
            ValueKind::Double(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ValueKind::String(value) => JsonValue::String(value.clone()),
        }
    }

    /// Decodes a JSON scalar. Whole numbers that fit an `i64` become integers;
    /// booleans, arrays and objects are not document field values.
    pub fn from_json(value: JsonValue) -> StoreResult<Self> {
        match value {
            JsonValue::Null => Ok(Self::null()),
            JsonValue::String(value) => Ok(Self::from_string(value)),
            JsonValue::Number(number) => match number.as_i64() {
                Some(value) => Ok(Self::from_integer(value)),
                None => number
                    .as_f64()
                    .map(Self::from_double)
                    .ok_or_else(|| invalid_argument(format!("Number {number} is not supported"))),
            },
            other => Err(invalid_argument(format!("Unsupported field value {other}"))),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::from_string(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::from_string(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::from_integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::from_double(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_widen_to_doubles() {
        assert_eq!(FieldValue::from_integer(4).as_double(), Some(4.0));
        assert_eq!(FieldValue::from_double(4.5).as_integer(), None);
        assert_eq!(FieldValue::from_string("4").as_double(), None);
    }

    #[test]
    fn compares_numbers_across_kinds() {
        let two = FieldValue::from_integer(2);
        let two_and_half = FieldValue::from_double(2.5);
        assert_eq!(two.compare(&two_and_half), Some(Ordering::Less));
        assert_eq!(
            FieldValue::from_string("Pho").compare(&FieldValue::from_string("Pizza")),
            Some(Ordering::Less)
        );
        assert_eq!(two.compare(&FieldValue::from_string("2")), None);
    }

    #[test]
    fn json_numbers_keep_their_kind() {
        let integer = FieldValue::from_json(serde_json::json!(3)).unwrap();
        let double = FieldValue::from_json(serde_json::json!(3.0)).unwrap();
        assert_eq!(integer.as_integer(), Some(3));
        assert_eq!(double.as_integer(), None);
        assert_eq!(double.to_json(), serde_json::json!(3.0));
        assert_eq!(FieldValue::from_double(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn rejects_json_without_a_field_kind() {
        let err = FieldValue::from_json(serde_json::json!(true)).unwrap_err();
        assert_eq!(err.code_str(), "store/invalid-argument");
        assert!(FieldValue::from_json(serde_json::json!(["Pho"])).is_err());
    }
}
