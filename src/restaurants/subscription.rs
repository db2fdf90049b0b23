use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use crate::restaurants::converter::DocumentConverter;
use crate::restaurants::error::{invalid_document, RestaurantsError, RestaurantsResult};
use crate::restaurants::settings::MalformedDocumentPolicy;
use crate::store::{
    DocumentReference, DocumentStore, ListenerRegistration, QueryDefinition, QuerySnapshot,
    SnapshotCallback, StoreResult,
};

pub type UpdateCallback<M> = Arc<dyn Fn(Vec<M>, Vec<DocumentReference>) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(RestaurantsError) + Send + Sync>;

/// Receiver of converted snapshots. Records and handles are index aligned and
/// always arrive as the complete replacement for the previous batch.
pub trait SnapshotSink<M>: Send + Sync {
    fn on_snapshot(
        &self,
        records: Vec<M>,
        handles: Vec<DocumentReference>,
    ) -> RestaurantsResult<()>;
}

/// Keeps at most one live store listener for a query and republishes its
/// pushes as typed records.
///
/// Attaching a new query first removes the previous listener. Every listener
/// is tagged with a generation; pushes carrying a generation other than the
/// active one are discarded. Pushes are delivered one at a time, and `attach`
/// and `detach` wait for a delivery running on another thread to finish, so
/// nothing is published for a detached listener once they return.
///
/// Callbacks run without any subscription lock held and may call back into
/// the subscription, including `attach` and `detach`.
pub struct LiveQuerySubscription<C>
where
    C: DocumentConverter,
{
    shared: Arc<SubscriptionShared<C>>,
}

struct SubscriptionShared<C>
where
    C: DocumentConverter,
{
    store: Arc<dyn DocumentStore>,
    converter: C,
    policy: MalformedDocumentPolicy,
    state: Mutex<SubscriptionState>,
    delivery: Mutex<()>,
    delivering: Mutex<Option<ThreadId>>,
    on_update: RwLock<Option<UpdateCallback<C::Model>>>,
    on_error: RwLock<Option<ErrorCallback>>,
}

#[derive(Default)]
struct SubscriptionState {
    last_generation: u64,
    active: Option<ActiveListener>,
}

struct ActiveListener {
    generation: u64,
    query: QueryDefinition,
    registration: Option<ListenerRegistration>,
}

/// Marks the current thread as the one delivering a push until dropped.
struct DeliveryScope<'a> {
    delivering: &'a Mutex<Option<ThreadId>>,
    _serial: MutexGuard<'a, ()>,
}

impl Drop for DeliveryScope<'_> {
    fn drop(&mut self) {
        *self
            .delivering
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<C> LiveQuerySubscription<C>
where
    C: DocumentConverter,
{
    pub fn new(
        store: Arc<dyn DocumentStore>,
        converter: C,
        policy: MalformedDocumentPolicy,
    ) -> Self {
        Self {
            shared: Arc::new(SubscriptionShared {
                store,
                converter,
                policy,
                state: Mutex::new(SubscriptionState::default()),
                delivery: Mutex::new(()),
                delivering: Mutex::new(None),
                on_update: RwLock::new(None),
                on_error: RwLock::new(None),
            }),
        }
    }

    /// Sets the callback receiving every converted snapshot.
    pub fn on_update<F>(&self, callback: F)
    where
        F: Fn(Vec<C::Model>, Vec<DocumentReference>) + Send + Sync + 'static,
    {
        *self.shared.on_update.write().unwrap() = Some(Arc::new(callback));
    }

    /// Routes converted snapshots into `sink`; a sink rejection is reported
    /// like any other subscription error.
    pub fn bind_sink(&self, sink: Arc<dyn SnapshotSink<C::Model>>) {
        let shared = Arc::downgrade(&self.shared);
        self.on_update(move |records, handles| {
            if let Err(err) = sink.on_snapshot(records, handles) {
                if let Some(shared) = shared.upgrade() {
                    shared.report_error(err);
                }
            }
        });
    }

    /// Sets the callback receiving push failures and rejected batches.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(RestaurantsError) + Send + Sync + 'static,
    {
        *self.shared.on_error.write().unwrap() = Some(Arc::new(callback));
    }

    /// Replaces the observed query. The previous listener, if any, is removed
    /// before the new one is registered.
    pub fn attach(&self, query: QueryDefinition) -> RestaurantsResult<()> {
        let (generation, previous) = {
            let _serial = self.shared.exclusive();
            let mut state = self.shared.state.lock().unwrap();
            state.last_generation += 1;
            let generation = state.last_generation;
            let previous = state.active.replace(ActiveListener {
                generation,
                query: query.clone(),
                registration: None,
            });
            (generation, previous)
        };
        if let Some(previous) = previous {
            release(previous);
        }

        let shared = Arc::clone(&self.shared);
        let callback: SnapshotCallback = Arc::new(move |result: StoreResult<QuerySnapshot>| {
            shared.deliver(generation, result);
        });

        // The store may deliver the initial snapshot before returning, so no
        // lock is held here.
        match self.shared.store.register_listener(&query, callback) {
            Ok(registration) => {
                let superseded = {
                    let mut state = self.shared.state.lock().unwrap();
                    match state.active.as_mut() {
                        Some(active) if active.generation == generation => {
                            active.registration = Some(registration);
                            None
                        }
                        _ => Some(registration),
                    }
                };
                match superseded {
                    Some(mut registration) => registration.remove(),
                    None => log::debug!(
                        "attached listener {generation} to {}",
                        query.collection_path()
                    ),
                }
                Ok(())
            }
            Err(err) => {
                let mut state = self.shared.state.lock().unwrap();
                if state
                    .active
                    .as_ref()
                    .is_some_and(|active| active.generation == generation)
                {
                    state.active = None;
                }
                Err(err.into())
            }
        }
    }

    /// Removes the active listener. Safe to call when nothing is attached.
    pub fn detach(&self) {
        let previous = {
            let _serial = self.shared.exclusive();
            self.shared.state.lock().unwrap().active.take()
        };
        if let Some(previous) = previous {
            release(previous);
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().unwrap().active.is_some()
    }

    /// The query currently observed, if attached.
    pub fn query(&self) -> Option<QueryDefinition> {
        self.shared
            .state
            .lock()
            .unwrap()
            .active
            .as_ref()
            .map(|active| active.query.clone())
    }
}

fn release(mut listener: ActiveListener) {
    if let Some(mut registration) = listener.registration.take() {
        registration.remove();
    }
    log::debug!("detached listener {}", listener.generation);
}

impl<C> SubscriptionShared<C>
where
    C: DocumentConverter,
{
    /// Waits for a push being delivered on another thread. Returns `None` when
    /// called from within a delivery on this thread.
    fn exclusive(&self) -> Option<MutexGuard<'_, ()>> {
        let current = thread::current().id();
        if *self.delivering.lock().unwrap() == Some(current) {
            return None;
        }
        Some(self.delivery.lock().unwrap())
    }

    fn enter_delivery(&self) -> Option<DeliveryScope<'_>> {
        let serial = self.exclusive()?;
        *self.delivering.lock().unwrap() = Some(thread::current().id());
        Some(DeliveryScope {
            delivering: &self.delivering,
            _serial: serial,
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state
            .lock()
            .unwrap()
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    fn deliver(&self, generation: u64, result: StoreResult<QuerySnapshot>) {
        let _scope = self.enter_delivery();
        if !self.is_current(generation) {
            log::debug!("discarding snapshot for detached listener {generation}");
            return;
        }

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::error!("Error fetching snapshot results: {err}");
                self.report_error(err.into());
                return;
            }
        };

        match self.convert(snapshot) {
            Ok((records, handles)) => {
                let callback = self.on_update.read().unwrap().clone();
                if let Some(callback) = callback {
                    callback(records, handles);
                }
            }
            Err(err) => {
                log::error!("Rejected snapshot: {err}");
                self.report_error(err);
            }
        }
    }

    fn convert(
        &self,
        snapshot: QuerySnapshot,
    ) -> RestaurantsResult<(Vec<C::Model>, Vec<DocumentReference>)> {
        let mut records = Vec::with_capacity(snapshot.len());
        let mut handles = Vec::with_capacity(snapshot.len());

        for document in snapshot {
            match self.converter.from_map(document.data()) {
                Ok(model) => {
                    records.push(model);
                    handles.push(DocumentReference::new(
                        Arc::clone(&self.store),
                        document.key().clone(),
                    ));
                }
                Err(err) => match self.policy {
                    MalformedDocumentPolicy::Skip => log::warn!(
                        "Skipping malformed document {}: {}",
                        document.key(),
                        err.message()
                    ),
                    MalformedDocumentPolicy::Abort => {
                        return Err(invalid_document(format!(
                            "Document {} is malformed: {}",
                            document.key(),
                            err.message()
                        )));
                    }
                },
            }
        }

        Ok((records, handles))
    }

    fn report_error(&self, error: RestaurantsError) {
        let callback = self.on_error.read().unwrap().clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }
}

impl<C> Drop for LiveQuerySubscription<C>
where
    C: DocumentConverter,
{
    fn drop(&mut self) {
        self.detach();
    }
}

impl<C> fmt::Debug for LiveQuerySubscription<C>
where
    C: DocumentConverter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuerySubscription")
            .field("active", &self.is_active())
            .field("policy", &self.shared.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restaurants::converter::RestaurantConverter;
    use crate::restaurants::model::{Restaurant, FIELD_PRICE};
    use crate::store::error::unavailable;
    use crate::store::model::{DocumentKey, ResourcePath};
    use crate::store::value::FieldValue;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    type Batches = Arc<Mutex<Vec<(Vec<String>, Vec<String>)>>>;

    fn restaurant(name: &str, category: &str) -> Restaurant {
        Restaurant {
            name: name.into(),
            category: category.into(),
            city: "Cupertino".into(),
            price: 1,
            rating_count: 0,
            average_rating: 0.0,
        }
    }

    fn put(store: &MemoryStore, id: &str, restaurant: &Restaurant) {
        let key = DocumentKey::from_string(&format!("restaurants/{id}")).unwrap();
        store.set_document(key, restaurant.to_map().unwrap());
    }

    fn all() -> QueryDefinition {
        QueryDefinition::new(ResourcePath::from_string("restaurants").unwrap()).unwrap()
    }

    fn subscription(
        store: &MemoryStore,
        policy: MalformedDocumentPolicy,
    ) -> (LiveQuerySubscription<RestaurantConverter>, Batches) {
        let subscription =
            LiveQuerySubscription::new(Arc::new(store.clone()), RestaurantConverter, policy);
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&batches);
        subscription.on_update(move |records, handles| {
            captured.lock().unwrap().push((
                records.into_iter().map(|r| r.name).collect(),
                handles.iter().map(|h| h.id().to_string()).collect(),
            ));
        });
        (subscription, batches)
    }

    #[test]
    fn attach_publishes_initial_snapshot_and_updates() {
        let store = MemoryStore::new();
        put(&store, "a", &restaurant("Best Bar", "Pizza"));
        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Skip);

        subscription.attach(all()).unwrap();
        put(&store, "b", &restaurant("Prime Spot", "Pho"));

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].0, ["Best Bar", "Prime Spot"]);
        assert_eq!(batches[1].1, ["a", "b"]);
    }

    #[test]
    fn reattaching_replaces_the_listener() {
        let store = MemoryStore::new();
        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Skip);

        subscription.attach(all()).unwrap();
        subscription
            .attach(all().where_equal("category", "Pizza"))
            .unwrap();
        assert_eq!(store.listener_count(), 1);

        put(&store, "a", &restaurant("Fire Place", "Pho"));
        let batches = batches.lock().unwrap();
        // two initial snapshots, then one push from the filtered listener only
        assert_eq!(batches.len(), 3);
        assert!(batches[2].0.is_empty());
    }

    #[test]
    fn detach_is_idempotent_and_silences_pushes() {
        let store = MemoryStore::new();
        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Skip);

        subscription.attach(all()).unwrap();
        subscription.detach();
        subscription.detach();
        assert!(!subscription.is_active());
        assert!(subscription.query().is_none());
        assert_eq!(store.listener_count(), 0);

        put(&store, "a", &restaurant("Fire Place", "Pho"));
        assert_eq!(batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn in_flight_push_after_detach_is_discarded() {
        let store = MemoryStore::new();
        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Skip);
        subscription.attach(all()).unwrap();

        store.pause_delivery();
        put(&store, "a", &restaurant("Fire Place", "Pho"));
        subscription.detach();
        store.resume_delivery();

        assert_eq!(batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn skip_policy_drops_only_the_malformed_document() {
        let store = MemoryStore::new();
        put(&store, "a", &restaurant("Best Bar", "Pizza"));
        let mut broken = restaurant("Bad Data", "Pizza")
            .to_map()
            .unwrap()
            .into_fields();
        broken.insert(FIELD_PRICE.into(), FieldValue::from_string("cheap"));
        store.set_document(
            DocumentKey::from_string("restaurants/b").unwrap(),
            broken.into_iter().collect(),
        );

        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Skip);
        subscription.attach(all()).unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(batches[0].0, ["Best Bar"]);
        assert_eq!(batches[0].1, ["a"]);
    }

    #[test]
    fn abort_policy_rejects_the_batch() {
        let store = MemoryStore::new();
        store.set_document(
            DocumentKey::from_string("restaurants/b").unwrap(),
            [("name", FieldValue::from_string("Nameless"))]
                .into_iter()
                .collect(),
        );
        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Abort);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&errors);
        subscription.on_error(move |err| captured.lock().unwrap().push(err.code_str()));

        subscription.attach(all()).unwrap();

        assert!(batches.lock().unwrap().is_empty());
        assert_eq!(
            errors.lock().unwrap().as_slice(),
            &["restaurants/invalid-document"]
        );
    }

    #[test]
    fn push_errors_are_reported_without_publishing() {
        let store = MemoryStore::new();
        let (subscription, batches) = subscription(&store, MalformedDocumentPolicy::Skip);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&errors);
        subscription.on_error(move |err| {
            captured
                .lock()
                .unwrap()
                .push(err.store_error().map(|e| e.code_str()));
        });

        subscription.attach(all()).unwrap();
        store.emit_error(unavailable("stream reset"));

        assert_eq!(batches.lock().unwrap().len(), 1);
        assert_eq!(
            errors.lock().unwrap().as_slice(),
            &[Some("store/unavailable")]
        );
    }

    #[test]
    fn dropping_the_subscription_removes_the_listener() {
        let store = MemoryStore::new();
        let (subscription, _batches) = subscription(&store, MalformedDocumentPolicy::Skip);
        subscription.attach(all()).unwrap();
        assert_eq!(store.listener_count(), 1);

        drop(subscription);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn callbacks_may_call_back_into_the_subscription() {
        let store = MemoryStore::new();
        let subscription = Arc::new(LiveQuerySubscription::new(
            Arc::new(store.clone()),
            RestaurantConverter,
            MalformedDocumentPolicy::Skip,
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let weak = Arc::downgrade(&subscription);
        subscription.on_update(move |records, _| {
            if let Some(subscription) = weak.upgrade() {
                captured.lock().unwrap().push((
                    records.len(),
                    subscription.is_active(),
                    subscription.query().is_some(),
                ));
            }
        });
        let weak = Arc::downgrade(&subscription);
        subscription.on_error(move |_| {
            if let Some(subscription) = weak.upgrade() {
                subscription.detach();
            }
        });

        subscription.attach(all()).unwrap();
        store.emit_error(unavailable("stream reset"));

        assert_eq!(*seen.lock().unwrap(), [(0, true, true)]);
        assert!(!subscription.is_active());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn detach_waits_for_a_delivery_in_progress() {
        let store = MemoryStore::new();
        let subscription = Arc::new(LiveQuerySubscription::new(
            Arc::new(store.clone()),
            RestaurantConverter,
            MalformedDocumentPolicy::Skip,
        ));
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        subscription.on_update(move |records, _| {
            if !records.is_empty() {
                entered_tx.lock().unwrap().send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
        });
        subscription.attach(all()).unwrap();

        let writer = {
            let store = store.clone();
            thread::spawn(move || put(&store, "a", &restaurant("Fire Place", "Pho")))
        };
        entered_rx.recv().unwrap();

        let detached = Arc::new(AtomicBool::new(false));
        let detacher = {
            let subscription = Arc::clone(&subscription);
            let detached = Arc::clone(&detached);
            thread::spawn(move || {
                subscription.detach();
                detached.store(true, Ordering::SeqCst);
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!detached.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        detacher.join().unwrap();
        writer.join().unwrap();
        assert!(detached.load(Ordering::SeqCst));
        assert_eq!(store.listener_count(), 0);
    }
}
