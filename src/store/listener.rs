use std::fmt;
use std::sync::Arc;

use crate::store::error::StoreResult;
use crate::store::model::{DocumentKey, ResourcePath};
use crate::store::query::QueryDefinition;
use crate::store::snapshot::QuerySnapshot;
use crate::store::value::MapValue;

pub type SnapshotCallback = Arc<dyn Fn(StoreResult<QuerySnapshot>) + Send + Sync>;
pub type DeleteCallback = Box<dyn FnOnce(StoreResult<()>) + Send>;

/// The capabilities a document store exposes to the restaurant list.
///
/// Implementations deliver every snapshot as the complete result set of the
/// query, in the order the store produced them. Delivery may happen on any
/// thread, including synchronously from within `register_listener`.
pub trait DocumentStore: Send + Sync {
    /// Starts pushing snapshots of `query` to `callback` until the returned
    /// registration is removed or dropped.
    fn register_listener(
        &self,
        query: &QueryDefinition,
        callback: SnapshotCallback,
    ) -> StoreResult<ListenerRegistration>;

    /// Creates a document with a generated id inside `collection`.
    fn add_document(&self, collection: &ResourcePath, data: MapValue) -> StoreResult<DocumentKey>;

    /// Deletes the document at `key` and reports the outcome through `completion`.
    fn delete_document(&self, key: &DocumentKey, completion: DeleteCallback);
}

/// RAII-style listener registration; dropping the handle detaches the
/// underlying listener.
pub struct ListenerRegistration {
    remover: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new<F>(remover: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            remover: Some(Box::new(remover)),
        }
    }

    /// Stops the listener. Calling this more than once is a no-op.
    pub fn remove(&mut self) {
        if let Some(remover) = self.remover.take() {
            remover();
        }
    }

    pub fn is_active(&self) -> bool {
        self.remover.is_some()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.is_active())
            .finish()
    }
}
