use serde::{Deserialize, Serialize};

use crate::recorder::MediaBlob;

/// Where a question's recording is in the upload pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    NotStarted,
    InFlight,
    Succeeded,
    Failed,
    Retrying,
    Abandoned,
}

/// Progress shown to the candidate
///
/// `current_index` and `uploaded_count` never decrease and never exceed
/// `total_questions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewProgress {
    /// Position in the shuffled order
    pub current_index: usize,

    pub total_questions: usize,

    /// Questions whose recording reached the store
    pub uploaded_count: usize,

    pub total_elapsed_seconds: u64,

    /// Seconds left in the global budget, once loaded
    pub remaining_global_seconds: Option<u64>,
}

impl InterviewProgress {
    pub fn new(total_questions: usize) -> Self {
        Self {
            current_index: 0,
            total_questions,
            uploaded_count: 0,
            total_elapsed_seconds: 0,
            remaining_global_seconds: None,
        }
    }

    pub fn is_last_question(&self) -> bool {
        self.total_questions > 0 && self.current_index == self.total_questions - 1
    }

    pub fn advance(&mut self) {
        if self.current_index < self.total_questions {
            self.current_index += 1;
        }
    }

    /// Adopt a newer upload count; older or out-of-range values are ignored
    pub fn record_uploads(&mut self, uploaded: usize) {
        let uploaded = uploaded.min(self.total_questions);
        if uploaded > self.uploaded_count {
            self.uploaded_count = uploaded;
        }
    }
}

/// One question as presented to the candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAttempt {
    /// Index in the interview definition (recordings are filed under this)
    pub question_index: usize,

    /// Position in the candidate's shuffled order
    pub display_index: usize,

    pub countdown_remaining: Option<u32>,

    pub recording_elapsed: u32,

    /// Finalized recording, once captured
    #[serde(skip)]
    pub blob: Option<MediaBlob>,

    pub upload_state: UploadState,
}

impl QuestionAttempt {
    pub fn new(question_index: usize, display_index: usize, countdown: u32) -> Self {
        Self {
            question_index,
            display_index,
            countdown_remaining: Some(countdown),
            recording_elapsed: 0,
            blob: None,
            upload_state: UploadState::NotStarted,
        }
    }

    /// Record the finalized blob; later calls are ignored
    pub fn set_blob(&mut self, blob: MediaBlob) -> bool {
        if self.blob.is_some() {
            return false;
        }
        self.blob = Some(blob);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_count_is_monotonic_and_bounded() {
        let mut progress = InterviewProgress::new(3);
        progress.record_uploads(2);
        progress.record_uploads(1);
        assert_eq!(progress.uploaded_count, 2);
        progress.record_uploads(10);
        assert_eq!(progress.uploaded_count, 3);
    }

    #[test]
    fn index_never_passes_total() {
        let mut progress = InterviewProgress::new(2);
        assert!(!progress.is_last_question());
        progress.advance();
        assert!(progress.is_last_question());
        progress.advance();
        progress.advance();
        assert_eq!(progress.current_index, 2);
    }

    #[test]
    fn blob_is_set_once() {
        let mut attempt = QuestionAttempt::new(4, 0, 10);
        assert!(attempt.set_blob(MediaBlob::new(vec![1; 100], "video/webm")));
        assert!(!attempt.set_blob(MediaBlob::new(vec![2; 200], "video/webm")));
        assert_eq!(attempt.blob.as_ref().map(MediaBlob::len), Some(100));
    }
}
