use super::blobs::BlobStorage;
use crate::store::MemoryStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Interviews, candidates, recordings and failure logs
    pub store: MemoryStore,

    /// Uploaded recordings on disk
    pub blobs: BlobStorage,
}

impl AppState {
    pub fn new(store: MemoryStore, blobs: BlobStorage) -> Self {
        Self { store, blobs }
    }
}
