//! Answer upload pipeline
//!
//! Finished answers are handed to [`UploadPipeline`], which transfers the
//! blob, records it in the Recording Store, and retries failures with capped
//! exponential backoff before abandoning them to the failure log.

mod client;
mod pipeline;
mod retry;

pub use client::{HttpUploader, UploadResponse};
pub use pipeline::{LastUploadOutcome, UploadPipeline, UploadTask};
pub use retry::RetryPolicy;

use anyhow::Result;

use crate::recorder::MediaBlob;
use crate::store::SessionIds;

/// Blob transfer endpoint
#[async_trait::async_trait]
pub trait BlobUploader: Send + Sync {
    /// Transfer one answer; returns the durable URL of the stored blob
    async fn upload(
        &self,
        ids: &SessionIds,
        question_index: usize,
        blob: &MediaBlob,
    ) -> Result<String>;
}
