use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::store::error::{invalid_argument, not_found, StoreError, StoreResult};
use crate::store::listener::{DeleteCallback, DocumentStore, ListenerRegistration, SnapshotCallback};
use crate::store::model::{DocumentKey, ResourcePath};
use crate::store::query::QueryDefinition;
use crate::store::query_evaluator::apply_query_to_documents;
use crate::store::reference::generate_document_id;
use crate::store::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::store::value::MapValue;

/// Process-local document store.
///
/// Every mutation re-evaluates each registered query and pushes the full
/// result set to its listener. Delivery can be paused to hold snapshots "in
/// flight": queued snapshots keep the callback they were produced for and are
/// delivered on resume even if the listener was removed in between.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    documents: Mutex<BTreeMap<DocumentKey, MapValue>>,
    listeners: Mutex<HashMap<u64, ListenerEntry>>,
    next_listener_id: AtomicU64,
    delivery: Mutex<DeliveryState>,
    delete_failures: Mutex<VecDeque<StoreError>>,
    listen_failures: Mutex<VecDeque<StoreError>>,
}

#[derive(Clone)]
struct ListenerEntry {
    query: QueryDefinition,
    callback: SnapshotCallback,
}

#[derive(Default)]
struct DeliveryState {
    paused: bool,
    queued: VecDeque<PendingDelivery>,
}

struct PendingDelivery {
    callback: SnapshotCallback,
    result: StoreResult<QuerySnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `data` at `key`, replacing any existing document.
    pub fn set_document(&self, key: DocumentKey, data: MapValue) {
        self.inner.documents.lock().unwrap().insert(key, data);
        self.inner.dispatch_all();
    }

    pub fn document(&self, key: &DocumentKey) -> Option<MapValue> {
        self.inner.documents.lock().unwrap().get(key).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.inner.documents.lock().unwrap().len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().unwrap().len()
    }

    /// Pushes `error` to every registered listener, as a broken watch stream would.
    pub fn emit_error(&self, error: StoreError) {
        let callbacks: Vec<SnapshotCallback> = {
            let listeners = self.inner.listeners.lock().unwrap();
            listeners.values().map(|entry| Arc::clone(&entry.callback)).collect()
        };
        for callback in callbacks {
            self.inner.deliver(callback, Err(error.clone()));
        }
    }

    /// Makes the next delete request fail with `error` without touching data.
    pub fn fail_next_delete(&self, error: StoreError) {
        self.inner.delete_failures.lock().unwrap().push_back(error);
    }

    /// Makes the next listener registration fail with `error`.
    pub fn fail_next_listen(&self, error: StoreError) {
        self.inner.listen_failures.lock().unwrap().push_back(error);
    }

    /// Holds every subsequent snapshot until `resume_delivery` is called.
    pub fn pause_delivery(&self) {
        self.inner.delivery.lock().unwrap().paused = true;
    }

    /// Delivers held snapshots in production order, then resumes direct delivery.
    pub fn resume_delivery(&self) {
        loop {
            let next = {
                let mut delivery = self.inner.delivery.lock().unwrap();
                match delivery.queued.pop_front() {
                    Some(pending) => pending,
                    None => {
                        delivery.paused = false;
                        return;
                    }
                }
            };
            (next.callback)(next.result);
        }
    }

    pub fn pending_deliveries(&self) -> usize {
        self.inner.delivery.lock().unwrap().queued.len()
    }
}

impl MemoryStoreInner {
    fn snapshot_for(&self, query: &QueryDefinition) -> QuerySnapshot {
        let documents: Vec<DocumentSnapshot> = {
            let documents = self.documents.lock().unwrap();
            documents
                .iter()
                .map(|(key, data)| DocumentSnapshot::new(key.clone(), data.clone()))
                .collect()
        };
        QuerySnapshot::new(apply_query_to_documents(documents, query))
    }

    fn dispatch_all(&self) {
        let listeners: Vec<ListenerEntry> = {
            let listeners = self.listeners.lock().unwrap();
            let mut ids: Vec<_> = listeners.keys().copied().collect();
            ids.sort_unstable();
            ids.into_iter().map(|id| listeners[&id].clone()).collect()
        };
        for listener in listeners {
            let snapshot = self.snapshot_for(&listener.query);
            self.deliver(listener.callback, Ok(snapshot));
        }
    }

    fn deliver(&self, callback: SnapshotCallback, result: StoreResult<QuerySnapshot>) {
        {
            let mut delivery = self.delivery.lock().unwrap();
            if delivery.paused {
                delivery.queued.push_back(PendingDelivery { callback, result });
                return;
            }
        }
        callback(result);
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().unwrap().remove(&id);
    }
}

impl DocumentStore for MemoryStore {
    fn register_listener(
        &self,
        query: &QueryDefinition,
        callback: SnapshotCallback,
    ) -> StoreResult<ListenerRegistration> {
        let injected = self.inner.listen_failures.lock().unwrap().pop_front();
        if let Some(error) = injected {
            return Err(error);
        }
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().unwrap().insert(
            id,
            ListenerEntry {
                query: query.clone(),
                callback: Arc::clone(&callback),
            },
        );
        log::debug!("listener {id} registered on {}", query.collection_path());

        let weak: Weak<MemoryStoreInner> = Arc::downgrade(&self.inner);
        let registration = ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove_listener(id);
            }
        });

        let snapshot = self.inner.snapshot_for(query);
        self.inner.deliver(callback, Ok(snapshot));
        Ok(registration)
    }

    fn add_document(&self, collection: &ResourcePath, data: MapValue) -> StoreResult<DocumentKey> {
        if collection.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "'{collection}' is not a collection path"
            )));
        }
        let key = DocumentKey::from_path(collection.child(generate_document_id()))?;
        self.set_document(key.clone(), data);
        Ok(key)
    }

    fn delete_document(&self, key: &DocumentKey, completion: DeleteCallback) {
        let injected = self.inner.delete_failures.lock().unwrap().pop_front();
        if let Some(error) = injected {
            completion(Err(error));
            return;
        }
        let removed = self.inner.documents.lock().unwrap().remove(key);
        match removed {
            Some(_) => {
                completion(Ok(()));
                self.inner.dispatch_all();
            }
            None => completion(Err(not_found(format!("No document to delete at {key}")))),
        }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("documents", &self.document_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
