use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt;
use std::sync::Arc;

use crate::store::error::{invalid_argument, StoreResult};
use crate::store::listener::DocumentStore;
use crate::store::model::{DocumentKey, ResourcePath};
use crate::store::query::QueryDefinition;
use crate::store::value::MapValue;

/// Handle to one stored document, used to issue mutations against it.
#[derive(Clone)]
pub struct DocumentReference {
    store: Arc<dyn DocumentStore>,
    key: DocumentKey,
}

impl DocumentReference {
    pub fn new(store: Arc<dyn DocumentStore>, key: DocumentKey) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// Deletes the document. Returns immediately; `completion` receives the
    /// outcome once the store has processed the request.
    pub fn delete<F>(&self, completion: F)
    where
        F: FnOnce(StoreResult<()>) + Send + 'static,
    {
        self.store.delete_document(&self.key, Box::new(completion));
    }
}

impl PartialEq for DocumentReference {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DocumentReference {}

impl fmt::Debug for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentReference")
            .field("path", &self.key.path().canonical_string())
            .finish()
    }
}

#[derive(Clone)]
pub struct CollectionReference {
    store: Arc<dyn DocumentStore>,
    path: ResourcePath,
}

impl CollectionReference {
    pub fn new(store: Arc<dyn DocumentStore>, path: ResourcePath) -> StoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(
                "Collection references must point to a collection (odd number of segments)",
            ));
        }
        Ok(Self { store, path })
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// A query over every document in this collection.
    pub fn query(&self) -> QueryDefinition {
        QueryDefinition::new(self.path.clone())
            .expect("collection references always hold collection paths")
    }

    pub fn add_document(&self, data: MapValue) -> StoreResult<DocumentReference> {
        let key = self.store.add_document(&self.path, data)?;
        Ok(DocumentReference::new(Arc::clone(&self.store), key))
    }
}

impl fmt::Debug for CollectionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionReference")
            .field("path", &self.path.canonical_string())
            .finish()
    }
}

/// Generates a 20 character alphanumeric document id.
pub fn generate_document_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(20)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = generate_document_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_document_id());
    }
}
