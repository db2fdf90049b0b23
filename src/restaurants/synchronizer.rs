use std::fmt;
use std::sync::{Arc, RwLock};

use crate::restaurants::error::{
    index_out_of_range, mismatched_snapshot, RestaurantsError, RestaurantsResult,
};
use crate::restaurants::subscription::SnapshotSink;
use crate::store::{DocumentReference, StoreResult};

/// Presentation-side signal that the whole list must be redrawn.
pub trait RefreshSink: Send + Sync {
    fn request_full_refresh(&self);
}

impl<F> RefreshSink for F
where
    F: Fn() + Send + Sync,
{
    fn request_full_refresh(&self) {
        self()
    }
}

struct RowSnapshot<M> {
    records: Vec<M>,
    handles: Vec<DocumentReference>,
}

impl<M> Default for RowSnapshot<M> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            handles: Vec::new(),
        }
    }
}

/// Holds the rows currently shown by the list.
///
/// Records and their document handles live in one immutable snapshot that is
/// swapped as a unit, so readers see either the old pair or the new pair and
/// never a mix. Rows change only when a new snapshot arrives; deleting a row
/// just asks the store to delete the backing document.
pub struct ListSynchronizer<M> {
    snapshot: RwLock<Arc<RowSnapshot<M>>>,
    refresh: Arc<dyn RefreshSink>,
}

impl<M> ListSynchronizer<M>
where
    M: Clone + Send + Sync + 'static,
{
    pub fn new(refresh: Arc<dyn RefreshSink>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RowSnapshot::default())),
            refresh,
        }
    }

    /// Replaces every row, then requests a full refresh.
    pub fn on_snapshot(
        &self,
        records: Vec<M>,
        handles: Vec<DocumentReference>,
    ) -> RestaurantsResult<()> {
        if records.len() != handles.len() {
            return Err(mismatched_snapshot(records.len(), handles.len()));
        }
        let rows = records.len();
        *self.snapshot.write().unwrap() = Arc::new(RowSnapshot { records, handles });
        log::debug!("applied snapshot with {rows} rows");
        self.refresh.request_full_refresh();
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.current().records.len()
    }

    pub fn record_at(&self, index: usize) -> RestaurantsResult<M> {
        self.row(index).map(|(record, _)| record)
    }

    pub fn handle_at(&self, index: usize) -> RestaurantsResult<DocumentReference> {
        self.row(index).map(|(_, handle)| handle)
    }

    /// Reads a record and its handle from the same snapshot.
    pub fn row(&self, index: usize) -> RestaurantsResult<(M, DocumentReference)> {
        let snapshot = self.current();
        match (snapshot.records.get(index), snapshot.handles.get(index)) {
            (Some(record), Some(handle)) => Ok((record.clone(), handle.clone())),
            _ => Err(out_of_range(index, snapshot.records.len())),
        }
    }

    /// All records of the current snapshot, in display order.
    pub fn records(&self) -> Vec<M> {
        self.current().records.clone()
    }

    /// Issues a delete for the document behind row `index`. Failures are logged.
    pub fn delete_at(&self, index: usize) -> RestaurantsResult<()> {
        self.delete_at_with(index, |_| {})
    }

    /// Issues a delete for the document behind row `index` and hands the
    /// outcome to `completion`. The row stays until a snapshot without it
    /// arrives.
    pub fn delete_at_with<F>(&self, index: usize, completion: F) -> RestaurantsResult<()>
    where
        F: FnOnce(StoreResult<()>) + Send + 'static,
    {
        let handle = self.handle_at(index)?;
        let path = handle.key().to_string();
        handle.delete(move |result| {
            if let Err(err) = &result {
                log::warn!("Error deleting document {path}: {err}");
            }
            completion(result);
        });
        Ok(())
    }

    fn current(&self) -> Arc<RowSnapshot<M>> {
        Arc::clone(&self.snapshot.read().unwrap())
    }
}

fn out_of_range(index: usize, len: usize) -> RestaurantsError {
    let err = index_out_of_range(index, len);
    log::error!("{err}");
    err
}

impl<M> SnapshotSink<M> for ListSynchronizer<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn on_snapshot(
        &self,
        records: Vec<M>,
        handles: Vec<DocumentReference>,
    ) -> RestaurantsResult<()> {
        ListSynchronizer::on_snapshot(self, records, handles)
    }
}

impl<M> fmt::Debug for ListSynchronizer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSynchronizer")
            .field("rows", &self.snapshot.read().unwrap().records.len())
            .finish()
    }
}
