use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::store::StoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestaurantsErrorCode {
    InvalidDocument,
    IndexOutOfRange,
    MismatchedSnapshot,
    Store,
}

impl RestaurantsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestaurantsErrorCode::InvalidDocument => "restaurants/invalid-document",
            RestaurantsErrorCode::IndexOutOfRange => "restaurants/index-out-of-range",
            RestaurantsErrorCode::MismatchedSnapshot => "restaurants/mismatched-snapshot",
            RestaurantsErrorCode::Store => "restaurants/store",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RestaurantsError {
    pub code: RestaurantsErrorCode,
    message: String,
    source: Option<StoreError>,
}

impl RestaurantsError {
    pub fn new(code: RestaurantsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The store failure this error wraps, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        self.source.as_ref()
    }
}

impl Display for RestaurantsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for RestaurantsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|err| err as &(dyn Error + 'static))
    }
}

impl From<StoreError> for RestaurantsError {
    fn from(error: StoreError) -> Self {
        Self {
            code: RestaurantsErrorCode::Store,
            message: error.to_string(),
            source: Some(error),
        }
    }
}

pub type RestaurantsResult<T> = Result<T, RestaurantsError>;

pub fn invalid_document(message: impl Into<String>) -> RestaurantsError {
    RestaurantsError::new(RestaurantsErrorCode::InvalidDocument, message)
}

pub fn index_out_of_range(index: usize, len: usize) -> RestaurantsError {
    RestaurantsError::new(
        RestaurantsErrorCode::IndexOutOfRange,
        format!("Row {index} is out of range for a list of {len} rows"),
    )
}

pub fn mismatched_snapshot(records: usize, handles: usize) -> RestaurantsError {
    RestaurantsError::new(
        RestaurantsErrorCode::MismatchedSnapshot,
        format!("Snapshot has {records} records but {handles} document handles"),
    )
}
