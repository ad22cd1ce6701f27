use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Candidate, Interview, RecordingRecord, StoreError, UploadFailure};
use super::{FailureSink, RecordingStore};

/// Recording Store reached over the HTTP API
#[derive(Clone)]
pub struct HttpRecordingStore {
    client: Client,
    base_url: String,
}

impl HttpRecordingStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn candidate_url(&self, interview_id: &str, candidate_id: &str) -> String {
        format!(
            "{}/interviews/{}/candidates/{}",
            self.base_url, interview_id, candidate_id
        )
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, StoreError> {
        let response = Self::check(response, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Transport(format!("malformed {what}: {e}")))
    }

    async fn check(response: Response, what: &str) -> Result<Response, StoreError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(what.to_string())),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Invalid(body))
            }
            status => Err(StoreError::Transport(format!("{what}: HTTP {status}"))),
        }
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

#[async_trait::async_trait]
impl RecordingStore for HttpRecordingStore {
    async fn get_interview(&self, interview_id: &str) -> Result<Interview, StoreError> {
        let url = format!("{}/interviews/{}", self.base_url, interview_id);
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(transport)?;
        Self::read_json(response, &format!("interview {interview_id}")).await
    }

    async fn get_candidate(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Candidate, StoreError> {
        let url = self.candidate_url(interview_id, candidate_id);
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(transport)?;
        Self::read_json(response, &format!("candidate {candidate_id}")).await
    }

    async fn save_recording(
        &self,
        interview_id: &str,
        candidate_id: &str,
        record: RecordingRecord,
    ) -> Result<(), StoreError> {
        let url = format!("{}/recordings", self.candidate_url(interview_id, candidate_id));
        debug!("POST {} (question {})", url, record.question_index);
        let response = self
            .client
            .post(url)
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response, &format!("candidate {candidate_id}")).await?;
        Ok(())
    }

    async fn get_recordings(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Vec<RecordingRecord>, StoreError> {
        let url = format!("{}/recordings", self.candidate_url(interview_id, candidate_id));
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(transport)?;
        Self::read_json(response, &format!("candidate {candidate_id}")).await
    }
}

#[async_trait::async_trait]
impl FailureSink for HttpRecordingStore {
    async fn log_upload_failure(&self, failure: UploadFailure) -> Result<(), StoreError> {
        let url = format!("{}/upload-failures", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&failure)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response, "upload failure log").await?;
        Ok(())
    }
}
