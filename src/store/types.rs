use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interview definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub job_title: String,
    /// Questions in definition order; recordings are filed by index into this list
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Candidate registered against an interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub interview_id: String,
    pub name: String,
    pub email: String,
    /// Fixed permutation of question indices this candidate answers in
    pub question_order: Vec<usize>,
    pub registered_at: DateTime<Utc>,
}

/// A saved answer recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRecord {
    /// Original (pre-shuffle) question index
    pub question_index: usize,
    pub video_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Durable record of an upload that was given up on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub interview_id: String,
    pub candidate_id: String,
    pub question_index: usize,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

/// Interview + candidate pair that a session records for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIds {
    pub interview_id: String,
    pub candidate_id: String,
}

impl SessionIds {
    pub fn new(interview_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            interview_id: interview_id.into(),
            candidate_id: candidate_id.into(),
        }
    }
}

/// Recording Store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Transport(String),
}
