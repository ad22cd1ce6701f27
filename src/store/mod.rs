//! Recording Store collaborator
//!
//! The interview flow only ever talks to these traits. `MemoryStore` is the
//! in-process implementation behind the HTTP server; `HttpRecordingStore` is
//! the client the flow uses against a remote server.

mod client;
mod memory;
mod types;

pub use client::HttpRecordingStore;
pub use memory::MemoryStore;
pub use types::{Candidate, Interview, RecordingRecord, SessionIds, StoreError, UploadFailure};

/// Persists recordings and serves interview/candidate metadata
#[async_trait::async_trait]
pub trait RecordingStore: Send + Sync {
    async fn get_interview(&self, interview_id: &str) -> Result<Interview, StoreError>;

    async fn get_candidate(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Candidate, StoreError>;

    /// Must accept late and out-of-order writes
    async fn save_recording(
        &self,
        interview_id: &str,
        candidate_id: &str,
        record: RecordingRecord,
    ) -> Result<(), StoreError>;

    async fn get_recordings(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Vec<RecordingRecord>, StoreError>;
}

/// Durable sink for abandoned uploads
#[async_trait::async_trait]
pub trait FailureSink: Send + Sync {
    async fn log_upload_failure(&self, failure: UploadFailure) -> Result<(), StoreError>;
}
