use anyhow::{bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::BlobUploader;
use crate::recorder::MediaBlob;
use crate::store::SessionIds;

/// Response of the blob transfer endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Uploads recordings to `PUT /uploads/:interview_id/:candidate_id/:question_index`
#[derive(Clone)]
pub struct HttpUploader {
    client: Client,
    base_url: String,
}

impl HttpUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl BlobUploader for HttpUploader {
    async fn upload(
        &self,
        ids: &SessionIds,
        question_index: usize,
        blob: &MediaBlob,
    ) -> Result<String> {
        let url = format!(
            "{}/uploads/{}/{}/{}",
            self.base_url, ids.interview_id, ids.candidate_id, question_index
        );
        debug!("PUT {} ({} bytes, {})", url, blob.len(), blob.mime_type());

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, blob.mime_type())
            .body(blob.to_vec())
            .send()
            .await
            .context("Failed to send recording")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Upload rejected with HTTP {}: {}", status, body);
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("Malformed upload response")?;

        Ok(body.url)
    }
}
