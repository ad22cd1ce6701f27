use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{Candidate, Interview, RecordingRecord, StoreError, UploadFailure};
use super::{FailureSink, RecordingStore};
use crate::interview::generate_question_order;

#[derive(Default)]
struct Tables {
    interviews: HashMap<String, Interview>,
    /// (interview_id, candidate_id) → candidate
    candidates: HashMap<(String, String), Candidate>,
    /// (interview_id, candidate_id) → recordings keyed by question index
    recordings: HashMap<(String, String), HashMap<usize, RecordingRecord>>,
    failures: Vec<UploadFailure>,
}

/// In-process Recording Store
///
/// Backs the HTTP server and the tests. Recordings are upserted by question
/// index, so a late retry of an earlier answer simply replaces the record.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interview with a generated id
    pub async fn create_interview(
        &self,
        job_title: String,
        questions: Vec<String>,
    ) -> Result<Interview, StoreError> {
        if questions.is_empty() {
            return Err(StoreError::Invalid(
                "an interview needs at least one question".to_string(),
            ));
        }

        let interview = Interview {
            id: uuid::Uuid::new_v4().to_string(),
            job_title,
            questions,
            created_at: Utc::now(),
        };

        info!(
            "Created interview {} ({} questions)",
            interview.id,
            interview.questions.len()
        );

        self.tables
            .write()
            .await
            .interviews
            .insert(interview.id.clone(), interview.clone());

        Ok(interview)
    }

    /// Register a candidate and fix their question order
    pub async fn register_candidate(
        &self,
        interview_id: &str,
        name: String,
        email: String,
    ) -> Result<Candidate, StoreError> {
        let mut tables = self.tables.write().await;

        let total_questions = tables
            .interviews
            .get(interview_id)
            .map(|i| i.questions.len())
            .ok_or_else(|| StoreError::NotFound(format!("interview {interview_id}")))?;

        let candidate = Candidate {
            id: uuid::Uuid::new_v4().to_string(),
            interview_id: interview_id.to_string(),
            name,
            email,
            question_order: generate_question_order(total_questions),
            registered_at: Utc::now(),
        };

        info!(
            "Registered candidate {} for interview {}",
            candidate.id, interview_id
        );

        tables.candidates.insert(
            (interview_id.to_string(), candidate.id.clone()),
            candidate.clone(),
        );

        Ok(candidate)
    }

    /// Insert a candidate with a caller-chosen question order
    pub async fn insert_candidate(&self, candidate: Candidate) {
        self.tables.write().await.candidates.insert(
            (candidate.interview_id.clone(), candidate.id.clone()),
            candidate,
        );
    }

    /// Insert an interview as-is
    pub async fn insert_interview(&self, interview: Interview) {
        self.tables
            .write()
            .await
            .interviews
            .insert(interview.id.clone(), interview);
    }

    /// Every upload failure logged so far
    pub async fn failures(&self) -> Vec<UploadFailure> {
        self.tables.read().await.failures.clone()
    }
}

#[async_trait::async_trait]
impl RecordingStore for MemoryStore {
    async fn get_interview(&self, interview_id: &str) -> Result<Interview, StoreError> {
        self.tables
            .read()
            .await
            .interviews
            .get(interview_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("interview {interview_id}")))
    }

    async fn get_candidate(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Candidate, StoreError> {
        self.tables
            .read()
            .await
            .candidates
            .get(&(interview_id.to_string(), candidate_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("candidate {candidate_id}")))
    }

    async fn save_recording(
        &self,
        interview_id: &str,
        candidate_id: &str,
        record: RecordingRecord,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let key = (interview_id.to_string(), candidate_id.to_string());

        if !tables.candidates.contains_key(&key) {
            return Err(StoreError::NotFound(format!("candidate {candidate_id}")));
        }

        info!(
            "Saved recording for {}/{} question {}",
            interview_id, candidate_id, record.question_index
        );

        tables
            .recordings
            .entry(key)
            .or_default()
            .insert(record.question_index, record);

        Ok(())
    }

    async fn get_recordings(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Vec<RecordingRecord>, StoreError> {
        let tables = self.tables.read().await;
        let key = (interview_id.to_string(), candidate_id.to_string());

        if !tables.candidates.contains_key(&key) {
            return Err(StoreError::NotFound(format!("candidate {candidate_id}")));
        }

        let mut records: Vec<RecordingRecord> = tables
            .recordings
            .get(&key)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.question_index);

        Ok(records)
    }
}

#[async_trait::async_trait]
impl FailureSink for MemoryStore {
    async fn log_upload_failure(&self, failure: UploadFailure) -> Result<(), StoreError> {
        warn!(
            "Upload abandoned: {}/{} question {} after {} attempts",
            failure.interview_id, failure.candidate_id, failure.question_index, failure.attempts
        );
        self.tables.write().await.failures.push(failure);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::is_permutation;

    #[tokio::test]
    async fn registered_candidate_gets_a_permutation() {
        let store = MemoryStore::new();
        let interview = store
            .create_interview(
                "Engineer".into(),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
            )
            .await
            .unwrap();

        let candidate = store
            .register_candidate(&interview.id, "Sam".into(), "sam@example.com".into())
            .await
            .unwrap();

        assert!(is_permutation(&candidate.question_order, 4));
        let fetched = store
            .get_candidate(&interview.id, &candidate.id)
            .await
            .unwrap();
        assert_eq!(fetched, candidate);
    }

    #[tokio::test]
    async fn late_recording_replaces_earlier_one() {
        let store = MemoryStore::new();
        let interview = store
            .create_interview("Engineer".into(), vec!["a".into(), "b".into()])
            .await
            .unwrap();
        let candidate = store
            .register_candidate(&interview.id, "Sam".into(), "sam@example.com".into())
            .await
            .unwrap();

        for url in ["first", "second"] {
            store
                .save_recording(
                    &interview.id,
                    &candidate.id,
                    RecordingRecord {
                        question_index: 1,
                        video_url: url.into(),
                        uploaded_at: Utc::now(),
                    },
                )
                .await
                .unwrap();
        }

        let recordings = store
            .get_recordings(&interview.id, &candidate.id)
            .await
            .unwrap();
        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].video_url, "second");
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_interview("missing").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store
                .register_candidate("missing", "x".into(), "y".into())
                .await,
            Err(StoreError::NotFound(_))
        ));
    }
}
