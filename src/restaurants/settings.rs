/// Maximum number of restaurants in any snapshot.
pub const RESULT_LIMIT: u32 = 50;

pub const DEFAULT_COLLECTION: &str = "restaurants";
pub const DEFAULT_SEED_BATCH_SIZE: usize = 20;

/// What a live subscription does with a pushed document that fails conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MalformedDocumentPolicy {
    /// Drop the document, log a warning and publish the rest of the batch.
    #[default]
    Skip,
    /// Reject the whole batch through the error callback and keep the
    /// previously published snapshot.
    Abort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestaurantListSettings {
    /// Collection the list is bound to.
    pub collection: String,
    /// Number of restaurants written by one `populate` call.
    pub seed_batch_size: usize,
    pub malformed_policy: MalformedDocumentPolicy,
}

impl Default for RestaurantListSettings {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            seed_batch_size: DEFAULT_SEED_BATCH_SIZE,
            malformed_policy: MalformedDocumentPolicy::default(),
        }
    }
}
