use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::retry::RetryPolicy;
use super::BlobUploader;
use crate::error::InterviewError;
use crate::interview::UploadState;
use crate::recorder::MediaBlob;
use crate::store::{FailureSink, RecordingRecord, RecordingStore, SessionIds, UploadFailure};

/// A failed upload waiting for another attempt
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub blob: MediaBlob,
    pub question_index: usize,
    /// Attempts made so far (the first failure counts as 1)
    pub attempts: u32,
    pub next_attempt_at: Instant,
}

/// Result of the last question's bounded upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastUploadOutcome {
    /// The last recording reached the store before completion
    pub uploaded: bool,
    /// The first attempt did not settle within the race timeout
    pub timed_out: bool,
    /// Retry queue length when the wait ended
    pub pending: usize,
    pub waited: Duration,
}

#[derive(Default)]
struct QueueState {
    queue: Vec<UploadTask>,
    states: HashMap<usize, UploadState>,
    succeeded: HashSet<usize>,
}

struct Inner {
    ids: SessionIds,
    uploader: Arc<dyn BlobUploader>,
    store: Arc<dyn RecordingStore>,
    failures: Arc<dyn FailureSink>,
    policy: RetryPolicy,
    state: Mutex<QueueState>,
    uploaded: AtomicUsize,
    draining: AtomicBool,
}

/// Background upload of finished answers with bounded retry
///
/// Cheap to clone; clones share one retry queue. At most one drain pass runs
/// at a time. A question counts as uploaded once, however many of its
/// attempts end up succeeding.
#[derive(Clone)]
pub struct UploadPipeline {
    inner: Arc<Inner>,
}

impl UploadPipeline {
    pub fn new(
        ids: SessionIds,
        uploader: Arc<dyn BlobUploader>,
        store: Arc<dyn RecordingStore>,
        failures: Arc<dyn FailureSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ids,
                uploader,
                store,
                failures,
                policy,
                state: Mutex::new(QueueState::default()),
                uploaded: AtomicUsize::new(0),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Upload once; on failure queue the recording for retry
    ///
    /// Never returns an error: the boolean reports whether this first
    /// attempt succeeded.
    pub async fn enqueue(&self, blob: MediaBlob, question_index: usize) -> bool {
        match self.attempt(&blob, question_index).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{}; queuing for retry", e);
                self.queue_retry(blob, question_index).await;
                self.spawn_drain();
                false
            }
        }
    }

    /// Fire-and-forget [`UploadPipeline::enqueue`]
    pub fn spawn_upload(&self, blob: MediaBlob, question_index: usize) -> JoinHandle<bool> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.enqueue(blob, question_index).await })
    }

    /// Upload the final answer with a bounded wait
    ///
    /// Races the upload against the configured timeout. If it fails or is
    /// still running, the recording is queued for retry (the running
    /// transfer is left to finish on its own), then completion waits for
    /// the retry queue to empty, up to the configured limit.
    pub async fn finish_last(&self, blob: MediaBlob, question_index: usize) -> LastUploadOutcome {
        let started = Instant::now();
        let pipeline = self.clone();
        let first_blob = blob.clone();
        let mut first =
            tokio::spawn(async move { pipeline.attempt(&first_blob, question_index).await });

        let mut timed_out = false;
        match tokio::time::timeout(self.inner.policy.last_upload_timeout(), &mut first).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                warn!("{}; queuing final answer for retry", e);
                self.queue_retry(blob, question_index).await;
                self.spawn_drain();
            }
            Ok(Err(e)) => {
                error!("Final upload task failed: {}", e);
                self.queue_retry(blob, question_index).await;
                self.spawn_drain();
            }
            Err(_) => {
                timed_out = true;
                warn!(
                    "Final upload for question {} still in flight after {:?}; queuing retry",
                    question_index,
                    self.inner.policy.last_upload_timeout()
                );
                self.queue_retry(blob, question_index).await;
                self.spawn_drain();
            }
        }

        let pending = self.wait_for_queue(self.inner.policy.last_question_wait()).await;
        let uploaded = self.is_uploaded(question_index).await;

        if pending > 0 {
            warn!(
                "Completing with {} upload(s) still pending; they continue in the background",
                pending
            );
        }

        LastUploadOutcome {
            uploaded,
            timed_out,
            pending,
            waited: started.elapsed(),
        }
    }

    /// Poll until the retry queue is empty or `limit` passes; returns what is left
    pub async fn wait_for_queue(&self, limit: Duration) -> usize {
        let deadline = Instant::now() + limit;
        loop {
            let pending = self.pending_count().await;
            if pending == 0 {
                return 0;
            }
            let now = Instant::now();
            if now >= deadline {
                return pending;
            }
            let step = self.inner.policy.poll_interval().min(deadline - now);
            tokio::time::sleep(step).await;
        }
    }

    /// Recordings in the retry queue
    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    /// Questions whose recording reached the store
    pub fn uploaded_count(&self) -> usize {
        self.inner.uploaded.load(Ordering::SeqCst)
    }

    pub async fn upload_state(&self, question_index: usize) -> UploadState {
        self.inner
            .state
            .lock()
            .await
            .states
            .get(&question_index)
            .copied()
            .unwrap_or(UploadState::NotStarted)
    }

    pub async fn is_uploaded(&self, question_index: usize) -> bool {
        self.inner
            .state
            .lock()
            .await
            .succeeded
            .contains(&question_index)
    }

    /// Copy of the retry queue
    pub async fn queued_tasks(&self) -> Vec<UploadTask> {
        self.inner.state.lock().await.queue.clone()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// One transfer + store write
    async fn attempt(&self, blob: &MediaBlob, question_index: usize) -> Result<(), InterviewError> {
        self.set_state(question_index, UploadState::InFlight).await;
        let ids = &self.inner.ids;

        let result = async {
            let video_url = self
                .inner
                .uploader
                .upload(ids, question_index, blob)
                .await
                .map_err(|e| e.to_string())?;

            self.inner
                .store
                .save_recording(
                    &ids.interview_id,
                    &ids.candidate_id,
                    RecordingRecord {
                        question_index,
                        video_url,
                        uploaded_at: Utc::now(),
                    },
                )
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(()) => {
                self.mark_succeeded(question_index).await;
                Ok(())
            }
            Err(reason) => {
                self.set_state(question_index, UploadState::Failed).await;
                Err(InterviewError::UploadFailed {
                    question_index,
                    reason,
                })
            }
        }
    }

    async fn mark_succeeded(&self, question_index: usize) {
        let mut state = self.inner.state.lock().await;
        // A late success also clears any retry entry for the same answer
        state.queue.retain(|t| t.question_index != question_index);
        state.states.insert(question_index, UploadState::Succeeded);
        if state.succeeded.insert(question_index) {
            let uploaded = self.inner.uploaded.fetch_add(1, Ordering::SeqCst) + 1;
            info!(
                "Uploaded question {} ({} uploaded so far)",
                question_index, uploaded
            );
        } else {
            debug!("Duplicate upload of question {} ignored", question_index);
        }
    }

    async fn set_state(&self, question_index: usize, upload_state: UploadState) {
        let mut state = self.inner.state.lock().await;
        if state.succeeded.contains(&question_index) {
            return;
        }
        state.states.insert(question_index, upload_state);
    }

    async fn queue_retry(&self, blob: MediaBlob, question_index: usize) {
        let mut state = self.inner.state.lock().await;
        if state.succeeded.contains(&question_index)
            || state.queue.iter().any(|t| t.question_index == question_index)
        {
            return;
        }

        let attempts = 1;
        state.queue.push(UploadTask {
            blob,
            question_index,
            attempts,
            next_attempt_at: Instant::now() + self.inner.policy.backoff_delay(attempts),
        });
        state.states.insert(question_index, UploadState::Failed);
        info!(
            "Question {} queued for retry ({} pending)",
            question_index,
            state.queue.len()
        );
    }

    /// Start a drain pass unless one is already running
    fn spawn_drain(&self) {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Retry drain already running");
            return;
        }

        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.drain().await });
    }

    async fn drain(self) {
        loop {
            loop {
                let snapshot = self.queued_tasks().await;
                if snapshot.is_empty() {
                    break;
                }
                for task in snapshot {
                    self.retry(task).await;
                }
            }

            self.inner.draining.store(false, Ordering::SeqCst);

            // Something may have been queued after the final snapshot
            if self.pending_count().await == 0
                || self
                    .inner
                    .draining
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
            {
                break;
            }
        }
    }

    async fn retry(&self, task: UploadTask) {
        let question_index = task.question_index;

        if self.inner.policy.exhausted(task.attempts) {
            self.abandon(&task).await;
            return;
        }

        {
            let mut state = self.inner.state.lock().await;
            if !state.queue.iter().any(|t| t.question_index == question_index) {
                // Settled by a late success of an earlier attempt
                return;
            }
            state.states.insert(question_index, UploadState::Retrying);
        }

        tokio::time::sleep_until(task.next_attempt_at).await;

        if self.is_uploaded(question_index).await {
            return;
        }

        info!(
            "Retrying upload for question {} (attempt {})",
            question_index,
            task.attempts + 1
        );

        if let Err(e) = self.attempt(&task.blob, question_index).await {
            let mut state = self.inner.state.lock().await;
            let policy = &self.inner.policy;
            if let Some(queued) = state
                .queue
                .iter_mut()
                .find(|t| t.question_index == question_index)
            {
                queued.attempts += 1;
                queued.next_attempt_at = Instant::now() + policy.backoff_delay(queued.attempts);
                warn!("{} (attempt {})", e, queued.attempts);
            }
        }
    }

    async fn abandon(&self, task: &UploadTask) {
        {
            let mut state = self.inner.state.lock().await;
            state.queue.retain(|t| t.question_index != task.question_index);
            state
                .states
                .insert(task.question_index, UploadState::Abandoned);
        }

        error!(
            "{}",
            InterviewError::UploadAbandoned {
                question_index: task.question_index,
                attempts: task.attempts,
            }
        );

        let failure = UploadFailure {
            interview_id: self.inner.ids.interview_id.clone(),
            candidate_id: self.inner.ids.candidate_id.clone(),
            question_index: task.question_index,
            attempts: task.attempts,
            timestamp: Utc::now(),
        };
        let sink = Arc::clone(&self.inner.failures);
        tokio::spawn(async move {
            if let Err(e) = sink.log_upload_failure(failure).await {
                warn!("Failed to log abandoned upload: {}", e);
            }
        });
    }
}
