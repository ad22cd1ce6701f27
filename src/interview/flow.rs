use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::config::TimingPolicy;
use super::deadline::DeadlineTimer;
use super::order::is_permutation;
use super::progress::{InterviewProgress, QuestionAttempt, UploadState};
use super::timer::{QuestionPhase, QuestionTimer, StopReason, TimerSignal};
use crate::capture::{CaptureBackend, CaptureSession};
use crate::error::{InterviewError, RecorderError};
use crate::recorder::{negotiate_mime, MediaBlob, Recorder};
use crate::store::{RecordingStore, SessionIds};
use crate::upload::UploadPipeline;

/// Longest wait for a stopped recorder to hand over its blob on timeout
const FINALIZE_GRACE: Duration = Duration::from_secs(2);

/// Candidate input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowCommand {
    SkipCountdown,
    /// Refused until the minimum answer length; does not wait for `FinishAvailable`
    FinishAnswer,
    /// Leave the interview; ignored unless `confirmed`
    Exit { confirmed: bool },
}

/// Why the interview reached its terminal page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Completed,
    Timeout,
}

/// Terminal summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewOutcome {
    pub reason: CompletionReason,
    pub progress: InterviewProgress,
    /// Uploads still retrying in the background when the interview ended
    pub pending_uploads: usize,
    /// Whether the final answer (if any) reached the store before completion
    pub last_answer_uploaded: bool,
}

/// How [`InterviewFlow::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Finished(InterviewOutcome),
    /// Candidate left early; route back to the landing page
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Loading,
    Ready,
    InProgress,
    Finalizing,
    Complete(CompletionReason),
    Exited,
    Failed,
}

/// Notifications for whatever renders the interview
#[derive(Debug, Clone)]
pub enum FlowEvent {
    SessionLoaded {
        job_title: String,
        total_questions: usize,
        remaining_global_seconds: u64,
    },
    QuestionStarted {
        display_index: usize,
        question_index: usize,
        question: String,
        countdown: u32,
    },
    RecordingStarted {
        display_index: usize,
        skipped_countdown: bool,
    },
    FinishAvailable,
    FinishRejected {
        elapsed: u32,
        minimum: u32,
    },
    RecordingStopped(StopReason),
    AnswerCaptured {
        question_index: usize,
        bytes: usize,
    },
    Progress {
        progress: InterviewProgress,
        pending_uploads: usize,
    },
    Finalizing(CompletionReason),
    Completed(InterviewOutcome),
    Exited,
    Failed {
        message: String,
    },
}

struct SessionPlan {
    job_title: String,
    questions: Vec<String>,
    order: Vec<usize>,
}

struct ActiveQuestion {
    timer: QuestionTimer,
    recorder: Recorder,
    finalized: Option<oneshot::Receiver<MediaBlob>>,
}

/// Top-level interview orchestrator
///
/// Owns the capture session, progress, question order and global deadline.
/// One question is active at a time; earlier answers may still be uploading.
pub struct InterviewFlow {
    ids: SessionIds,
    timing: TimingPolicy,
    store: Arc<dyn RecordingStore>,
    pipeline: UploadPipeline,
    capture: CaptureSession,
    plan: Option<SessionPlan>,
    progress: InterviewProgress,
    deadline: Option<DeadlineTimer>,
    attempts: Vec<QuestionAttempt>,
    active: Option<ActiveQuestion>,
    phase: FlowPhase,
    events: Option<mpsc::UnboundedSender<FlowEvent>>,
}

impl InterviewFlow {
    pub fn new(
        ids: SessionIds,
        timing: TimingPolicy,
        store: Arc<dyn RecordingStore>,
        pipeline: UploadPipeline,
        capture: CaptureSession,
    ) -> Self {
        Self {
            ids,
            timing,
            store,
            pipeline,
            capture,
            plan: None,
            progress: InterviewProgress::new(0),
            deadline: None,
            attempts: Vec::new(),
            active: None,
            phase: FlowPhase::Loading,
            events: None,
        }
    }

    /// Receive [`FlowEvent`]s on `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<FlowEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Drive a whole interview: load, acquire capture, then react to ticks,
    /// finished recordings and candidate commands until a terminal state
    ///
    /// Closing the command channel is treated as leaving the page.
    pub async fn run(
        mut self,
        backend: Arc<dyn CaptureBackend>,
        mut commands: mpsc::Receiver<FlowCommand>,
    ) -> Result<SessionEnd, InterviewError> {
        self.load_session().await?;
        self.start(backend.as_ref()).await?;

        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(outcome) = self.tick().await? {
                        return Ok(SessionEnd::Finished(outcome));
                    }
                }
                finalized = Self::next_recording(&mut self.active) => {
                    let Some(blob) = finalized else {
                        let error = InterviewError::Recorder(RecorderError::Encoder(
                            "recording ended without a result".to_string(),
                        ));
                        self.fail(&error);
                        return Err(error);
                    };
                    if let Some(outcome) = self.advance(blob).await? {
                        return Ok(SessionEnd::Finished(outcome));
                    }
                }
                command = commands.recv() => match command {
                    Some(FlowCommand::SkipCountdown) => self.skip_countdown().await?,
                    Some(FlowCommand::FinishAnswer) => match self.request_finish().await {
                        Ok(()) => {}
                        Err(e) if !e.is_fatal() => warn!("Finish refused: {}", e),
                        Err(e) => return Err(e),
                    },
                    Some(FlowCommand::Exit { confirmed }) => {
                        if self.exit(confirmed) {
                            return Ok(SessionEnd::Exited);
                        }
                    }
                    None => {
                        info!("Command channel closed; tearing down interview");
                        self.exit(true);
                        return Ok(SessionEnd::Exited);
                    }
                },
            }
        }
    }

    /// Fetch the interview definition and the candidate's question order
    ///
    /// Either fetch failing, or an order that is not a permutation of the
    /// questions, fails the whole session.
    pub async fn load_session(&mut self) -> Result<(), InterviewError> {
        info!(
            "Loading interview {} for candidate {}",
            self.ids.interview_id, self.ids.candidate_id
        );

        let plan = match self.fetch_plan().await {
            Ok(plan) => plan,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let total = plan.questions.len();
        let deadline = DeadlineTimer::for_questions(total, self.timing.seconds_per_question);

        self.progress = InterviewProgress::new(total);
        self.progress.remaining_global_seconds = Some(deadline.remaining_secs());
        self.emit(FlowEvent::SessionLoaded {
            job_title: plan.job_title.clone(),
            total_questions: total,
            remaining_global_seconds: deadline.remaining_secs(),
        });

        info!(
            "Loaded \"{}\": {} questions, {}s budget",
            plan.job_title,
            total,
            deadline.remaining_secs()
        );

        self.deadline = Some(deadline);
        self.plan = Some(plan);
        self.phase = FlowPhase::Ready;
        Ok(())
    }

    async fn fetch_plan(&self) -> Result<SessionPlan, InterviewError> {
        let interview = self
            .store
            .get_interview(&self.ids.interview_id)
            .await
            .map_err(|e| InterviewError::SessionLoadFailed(e.to_string()))?;

        let candidate = self
            .store
            .get_candidate(&self.ids.interview_id, &self.ids.candidate_id)
            .await
            .map_err(|e| InterviewError::SessionLoadFailed(e.to_string()))?;

        let total = interview.questions.len();
        if total == 0 {
            return Err(InterviewError::SessionLoadFailed(
                "interview has no questions".to_string(),
            ));
        }
        if !is_permutation(&candidate.question_order, total) {
            return Err(InterviewError::SessionLoadFailed(format!(
                "question order {:?} is not a permutation of {} questions",
                candidate.question_order, total
            )));
        }

        Ok(SessionPlan {
            job_title: interview.job_title,
            questions: interview.questions,
            order: candidate.question_order,
        })
    }

    /// Acquire camera + microphone and present the first question
    pub async fn start(&mut self, backend: &dyn CaptureBackend) -> Result<(), InterviewError> {
        if self.phase != FlowPhase::Ready {
            return Err(InterviewError::NotInProgress);
        }

        let stream = match self.capture.acquire(backend).await {
            Ok(stream) => stream,
            Err(e) => {
                let error = InterviewError::from(e);
                self.fail(&error);
                return Err(error);
            }
        };

        if let Err(e) = negotiate_mime(stream.as_ref()) {
            let error = InterviewError::from(e);
            self.fail(&error);
            return Err(error);
        }

        self.phase = FlowPhase::InProgress;
        self.enter_question().await
    }

    /// One-second tick: global deadline first, then the active question
    pub async fn tick(&mut self) -> Result<Option<InterviewOutcome>, InterviewError> {
        if self.phase != FlowPhase::InProgress {
            return Ok(None);
        }

        self.progress.total_elapsed_seconds += 1;

        if let Some(deadline) = &mut self.deadline {
            let expired = deadline.tick();
            self.progress.remaining_global_seconds = Some(deadline.remaining_secs());
            if expired {
                return self.on_global_timeout().await.map(Some);
            }
        }

        let signal = match &mut self.active {
            Some(active) => {
                let signal = active.timer.tick();
                if let Some(attempt) = self.attempts.last_mut() {
                    attempt.countdown_remaining = active.timer.countdown_remaining();
                    attempt.recording_elapsed = active.timer.recording_elapsed();
                }
                signal
            }
            None => None,
        };

        if let Some(signal) = signal {
            self.handle_signal(signal).await?;
        }

        self.refresh_uploads().await;
        Ok(None)
    }

    /// Candidate skipped the countdown
    pub async fn skip_countdown(&mut self) -> Result<(), InterviewError> {
        let signal = self.active.as_mut().and_then(|a| a.timer.skip_countdown());
        if let Some(signal) = signal {
            info!("Countdown skipped");
            self.handle_signal(signal).await?;
        }
        Ok(())
    }

    /// Candidate pressed finish
    pub async fn request_finish(&mut self) -> Result<(), InterviewError> {
        let active = self.active.as_mut().ok_or(InterviewError::NotInProgress)?;
        match active.timer.request_finish() {
            Ok(signal) => self.handle_signal(signal).await,
            Err(InterviewError::MinDurationNotMet { elapsed, minimum }) => {
                self.emit(FlowEvent::FinishRejected { elapsed, minimum });
                Err(InterviewError::MinDurationNotMet { elapsed, minimum })
            }
            Err(e) => Err(e),
        }
    }

    /// Take the finished recording of the current question and move on
    ///
    /// The last question goes through the bounded upload path and ends the
    /// interview; any other question uploads in the background while the
    /// next one is presented.
    pub async fn advance(
        &mut self,
        blob: MediaBlob,
    ) -> Result<Option<InterviewOutcome>, InterviewError> {
        if self.phase != FlowPhase::InProgress {
            return Err(InterviewError::NotInProgress);
        }

        let question_index = self.current_question_index()?;
        self.capture_answer(&blob, question_index);
        self.active = None;

        if self.progress.is_last_question() {
            return self
                .finalize(CompletionReason::Completed, Some((blob, question_index)))
                .await
                .map(Some);
        }

        self.pipeline.spawn_upload(blob, question_index);
        if let Some(attempt) = self.attempts.last_mut() {
            attempt.upload_state = UploadState::InFlight;
        }

        tokio::time::sleep(self.timing.advance_delay()).await;

        self.progress.advance();
        self.enter_question().await?;
        Ok(None)
    }

    /// Leave the interview early
    ///
    /// Destructive: the current answer is discarded. Without confirmation
    /// nothing happens and `false` is returned.
    pub fn exit(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            info!("Exit not confirmed; continuing interview");
            return false;
        }

        if self.active.is_some() {
            warn!(
                "Candidate left during question {}; current answer discarded",
                self.progress.current_index + 1
            );
        }

        self.teardown();
        self.phase = FlowPhase::Exited;
        self.emit(FlowEvent::Exited);
        true
    }

    /// Global budget exhausted: end now, uploading whatever was recorded
    pub async fn on_global_timeout(&mut self) -> Result<InterviewOutcome, InterviewError> {
        warn!(
            "Interview time is up during question {} of {}",
            self.progress.current_index + 1,
            self.progress.total_questions
        );

        let mut upload = None;
        if let Some(mut active) = self.active.take() {
            active.timer.force_done();
            active.recorder.stop().await;

            if let Some(finalized) = active.finalized.take() {
                match tokio::time::timeout(FINALIZE_GRACE, finalized).await {
                    Ok(Ok(blob)) => {
                        let question_index = self.current_question_index()?;
                        self.capture_answer(&blob, question_index);
                        upload = Some((blob, question_index));
                    }
                    _ => warn!("No recording could be finalized before timeout"),
                }
            }
        }

        self.finalize(CompletionReason::Timeout, upload).await
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn progress(&self) -> &InterviewProgress {
        &self.progress
    }

    pub fn attempts(&self) -> &[QuestionAttempt] {
        &self.attempts
    }

    /// Phase of the active question, if any
    pub fn question_phase(&self) -> Option<QuestionPhase> {
        self.active.as_ref().map(|a| a.timer.phase())
    }

    pub fn capture(&self) -> &CaptureSession {
        &self.capture
    }

    pub fn pipeline(&self) -> &UploadPipeline {
        &self.pipeline
    }

    async fn enter_question(&mut self) -> Result<(), InterviewError> {
        let display_index = self.progress.current_index;
        let plan = self.plan.as_ref().ok_or(InterviewError::NotInProgress)?;
        let question_index = plan.order[display_index];
        let question = plan.questions[question_index].clone();

        let mut timer = QuestionTimer::for_question(&question, &self.timing);
        let countdown = timer.countdown_remaining().unwrap_or(0);

        info!(
            "Question {}/{} (#{}), {}s to prepare",
            display_index + 1,
            self.progress.total_questions,
            question_index,
            countdown
        );

        self.attempts
            .push(QuestionAttempt::new(question_index, display_index, countdown));
        self.emit(FlowEvent::QuestionStarted {
            display_index,
            question_index,
            question,
            countdown,
        });

        let begin = timer.begin();
        self.active = Some(ActiveQuestion {
            timer,
            recorder: Recorder::new(),
            finalized: None,
        });

        if let Some(signal) = begin {
            self.handle_signal(signal).await?;
        }
        Ok(())
    }

    async fn handle_signal(&mut self, signal: TimerSignal) -> Result<(), InterviewError> {
        match signal {
            TimerSignal::BeginRecording { skipped } => {
                let stream = self.capture.stream().ok_or(InterviewError::NotInProgress)?;
                let active = self.active.as_mut().ok_or(InterviewError::NotInProgress)?;

                match active.recorder.start(stream).await {
                    Ok(finalized) => active.finalized = Some(finalized),
                    Err(e) => {
                        let error = InterviewError::from(e);
                        self.fail(&error);
                        return Err(error);
                    }
                }

                if let Some(attempt) = self.attempts.last_mut() {
                    attempt.countdown_remaining = None;
                }
                self.emit(FlowEvent::RecordingStarted {
                    display_index: self.progress.current_index,
                    skipped_countdown: skipped,
                });
            }
            TimerSignal::FinishAvailable => self.emit(FlowEvent::FinishAvailable),
            TimerSignal::StopRecording(reason) => {
                if let Some(active) = self.active.as_mut() {
                    if reason == StopReason::TimeLimit {
                        info!("Answer time limit reached; stopping recording");
                    }
                    active.recorder.stop().await;
                }
                self.emit(FlowEvent::RecordingStopped(reason));
            }
        }
        Ok(())
    }

    async fn finalize(
        &mut self,
        reason: CompletionReason,
        upload: Option<(MediaBlob, usize)>,
    ) -> Result<InterviewOutcome, InterviewError> {
        self.phase = FlowPhase::Finalizing;
        self.emit(FlowEvent::Finalizing(reason));
        info!("Finalizing interview ({:?})", reason);

        let last_answer_uploaded = match upload {
            Some((blob, question_index)) => {
                if let Some(attempt) = self.attempts.last_mut() {
                    attempt.upload_state = UploadState::InFlight;
                }
                self.pipeline.finish_last(blob, question_index).await.uploaded
            }
            None => {
                let limit = self.pipeline.policy().last_question_wait();
                self.pipeline.wait_for_queue(limit).await;
                false
            }
        };

        if reason == CompletionReason::Completed {
            self.progress.advance();
        }
        self.refresh_uploads().await;
        self.teardown();

        let outcome = InterviewOutcome {
            reason,
            progress: self.progress.clone(),
            pending_uploads: self.pipeline.pending_count().await,
            last_answer_uploaded,
        };

        info!(
            "Interview {:?}: {}/{} uploaded, {} pending",
            reason,
            outcome.progress.uploaded_count,
            outcome.progress.total_questions,
            outcome.pending_uploads
        );

        self.phase = FlowPhase::Complete(reason);
        self.emit(FlowEvent::Completed(outcome.clone()));
        Ok(outcome)
    }

    async fn refresh_uploads(&mut self) {
        self.progress.record_uploads(self.pipeline.uploaded_count());
        for attempt in &mut self.attempts {
            if attempt.blob.is_some() {
                attempt.upload_state = self.pipeline.upload_state(attempt.question_index).await;
            }
        }
        let pending_uploads = self.pipeline.pending_count().await;
        self.emit(FlowEvent::Progress {
            progress: self.progress.clone(),
            pending_uploads,
        });
    }

    fn capture_answer(&mut self, blob: &MediaBlob, question_index: usize) {
        if let Some(attempt) = self.attempts.last_mut() {
            attempt.set_blob(blob.clone());
        }
        self.emit(FlowEvent::AnswerCaptured {
            question_index,
            bytes: blob.len(),
        });
    }

    fn current_question_index(&self) -> Result<usize, InterviewError> {
        self.plan
            .as_ref()
            .and_then(|p| p.order.get(self.progress.current_index).copied())
            .ok_or(InterviewError::NotInProgress)
    }

    /// Drop the active recorder and release the camera
    fn teardown(&mut self) {
        self.active = None;
        self.capture.release();
    }

    fn fail(&mut self, error: &InterviewError) {
        error!("Interview failed: {}", error);
        let message = match error {
            InterviewError::Capture(e) => e.user_message(),
            other => other.to_string(),
        };
        self.teardown();
        self.phase = FlowPhase::Failed;
        self.emit(FlowEvent::Failed { message });
    }

    fn emit(&self, event: FlowEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    async fn next_recording(active: &mut Option<ActiveQuestion>) -> Option<MediaBlob> {
        let Some(question) = active.as_mut() else {
            return std::future::pending().await;
        };
        let Some(finalized) = question.finalized.as_mut() else {
            return std::future::pending().await;
        };
        let blob = finalized.await.ok();
        question.finalized = None;
        blob
    }
}
