//! Document-store contract consumed by the restaurant list, plus an
//! in-memory implementation used for tests and local demos.

pub mod error;
mod listener;
mod memory;
pub mod model;
mod query;
mod query_evaluator;
mod reference;
mod snapshot;
pub mod value;

pub use error::{StoreError, StoreErrorCode, StoreResult};
pub use listener::{DeleteCallback, DocumentStore, ListenerRegistration, SnapshotCallback};
pub use memory::MemoryStore;
pub use query::{FieldFilter, OrderBy, OrderDirection, QueryDefinition};
pub use reference::{generate_document_id, CollectionReference, DocumentReference};
pub use snapshot::{DocumentSnapshot, QuerySnapshot};
