// Integration tests for the interview flow controller
//
// Whole interviews are driven against the in-memory Recording Store and the
// synthetic capture backend under a paused clock, so a five-question
// interview runs instantly and every timer fires deterministically.

use anyhow::{bail, Result};
use chrono::Utc;
use interview_recorder::capture::{
    CaptureBackend, CaptureConstraints, CaptureSession, SyntheticBackend, SyntheticConfig,
};
use interview_recorder::error::{CaptureError, InterviewError, RecorderError};
use interview_recorder::interview::{
    CompletionReason, CountdownPolicy, FlowCommand, FlowEvent, FlowPhase, InterviewFlow,
    QuestionPhase, SessionEnd, StopReason, TimingPolicy,
};
use interview_recorder::store::{Candidate, Interview, MemoryStore, RecordingStore, SessionIds};
use interview_recorder::upload::{BlobUploader, RetryPolicy, UploadPipeline};
use interview_recorder::MediaBlob;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Uploader that fails its first `failures` calls, then succeeds
struct FlakyUploader {
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyUploader {
    fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl BlobUploader for FlakyUploader {
    async fn upload(
        &self,
        ids: &SessionIds,
        question_index: usize,
        blob: &MediaBlob,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            bail!("upload endpoint returned 503");
        }
        assert!(!blob.is_empty());
        Ok(format!(
            "memory://{}/{}/{}",
            ids.interview_id, ids.candidate_id, question_index
        ))
    }
}

async fn seeded_store(question_order: Vec<usize>, questions: usize) -> (MemoryStore, SessionIds) {
    let store = MemoryStore::new();
    store
        .insert_interview(Interview {
            id: "interview-1".to_string(),
            job_title: "Site Reliability Engineer".to_string(),
            questions: (0..questions)
                .map(|i| format!("Tell us about incident number {i}"))
                .collect(),
            created_at: Utc::now(),
        })
        .await;
    store
        .insert_candidate(Candidate {
            id: "candidate-1".to_string(),
            interview_id: "interview-1".to_string(),
            name: "Jordan".to_string(),
            email: "jordan@example.com".to_string(),
            question_order,
            registered_at: Utc::now(),
        })
        .await;
    (store, SessionIds::new("interview-1", "candidate-1"))
}

fn quick_timing() -> TimingPolicy {
    TimingPolicy {
        seconds_per_question: 300,
        max_answer_secs: 3,
        min_answer_secs: 1,
        finish_visible_after_secs: 2,
        advance_delay_ms: 800,
        countdown: CountdownPolicy::Fixed { seconds: 1 },
    }
}

fn backend() -> Arc<dyn CaptureBackend> {
    Arc::new(SyntheticBackend::new(SyntheticConfig {
        fragment_interval: Duration::from_millis(250),
        fragment_size: 32,
        ..SyntheticConfig::default()
    }))
}

fn build_flow(
    store: &MemoryStore,
    ids: &SessionIds,
    timing: TimingPolicy,
    uploader: Arc<dyn BlobUploader>,
) -> (InterviewFlow, mpsc::UnboundedReceiver<FlowEvent>) {
    let pipeline = UploadPipeline::new(
        ids.clone(),
        uploader,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        RetryPolicy::default(),
    );
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let flow = InterviewFlow::new(
        ids.clone(),
        timing,
        Arc::new(store.clone()),
        pipeline,
        CaptureSession::new(CaptureConstraints::default()),
    )
    .with_events(event_tx);
    (flow, event_rx)
}

fn drain(events: &mut mpsc::UnboundedReceiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

#[tokio::test(start_paused = true)]
async fn test_full_interview_completes_with_all_uploads() -> Result<()> {
    let (store, ids) = seeded_store(vec![2, 0, 1], 3).await;
    let (flow, mut events) = build_flow(&store, &ids, quick_timing(), FlakyUploader::new(0));
    let (_command_tx, command_rx) = mpsc::channel(8);

    let end = flow.run(backend(), command_rx).await?;

    let SessionEnd::Finished(outcome) = end else {
        bail!("expected the interview to finish, got {:?}", end);
    };
    assert_eq!(outcome.reason, CompletionReason::Completed);
    assert_eq!(outcome.progress.total_questions, 3);
    assert_eq!(outcome.progress.current_index, 3);
    assert_eq!(outcome.progress.uploaded_count, 3);
    assert_eq!(outcome.pending_uploads, 0);
    assert!(outcome.last_answer_uploaded);

    let recordings = store.get_recordings(&ids.interview_id, &ids.candidate_id).await?;
    let indices: Vec<usize> = recordings.iter().map(|r| r.question_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    // Questions are presented in the candidate's order
    let presented: Vec<usize> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            FlowEvent::QuestionStarted { question_index, .. } => Some(question_index),
            _ => None,
        })
        .collect();
    assert_eq!(presented, vec![2, 0, 1]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_global_timeout_mid_recording() -> Result<()> {
    let (store, ids) = seeded_store(vec![4, 2, 0, 1, 3], 5).await;
    let timing = TimingPolicy {
        seconds_per_question: 10,
        max_answer_secs: 20,
        min_answer_secs: 5,
        finish_visible_after_secs: 10,
        advance_delay_ms: 800,
        countdown: CountdownPolicy::Fixed { seconds: 2 },
    };
    let (flow, mut events) = build_flow(&store, &ids, timing, FlakyUploader::new(0));
    let (_command_tx, command_rx) = mpsc::channel(8);

    let end = flow.run(backend(), command_rx).await?;

    let SessionEnd::Finished(outcome) = end else {
        bail!("expected a timeout outcome, got {:?}", end);
    };
    assert_eq!(outcome.reason, CompletionReason::Timeout);
    // 50s budget runs out while the third question is being answered
    assert_eq!(outcome.progress.current_index, 2);
    assert_eq!(outcome.progress.remaining_global_seconds, Some(0));
    assert!(outcome.last_answer_uploaded);
    assert_eq!(outcome.progress.uploaded_count, 3);

    let recordings = store.get_recordings(&ids.interview_id, &ids.candidate_id).await?;
    let indices: Vec<usize> = recordings.iter().map(|r| r.question_index).collect();
    assert_eq!(indices, vec![0, 2, 4]);

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, FlowEvent::Finalizing(CompletionReason::Timeout))));
    assert!(!events
        .iter()
        .any(|e| matches!(e, FlowEvent::QuestionStarted { display_index: 3, .. })));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_last_answer_waits_for_retries_before_completing() -> Result<()> {
    let (store, ids) = seeded_store(vec![0], 1).await;
    let uploader = FlakyUploader::new(2);
    let (flow, _events) = build_flow(&store, &ids, quick_timing(), uploader.clone());
    let (_command_tx, command_rx) = mpsc::channel(8);

    let started = tokio::time::Instant::now();
    let end = flow.run(backend(), command_rx).await?;
    let took = started.elapsed();

    let SessionEnd::Finished(outcome) = end else {
        bail!("expected the interview to finish, got {:?}", end);
    };
    assert_eq!(outcome.reason, CompletionReason::Completed);
    assert!(outcome.last_answer_uploaded);
    assert_eq!(outcome.pending_uploads, 0);
    assert_eq!(outcome.progress.uploaded_count, 1);
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 3);

    // 1s countdown + 3s answer, then 1s + 2s of backoff; well short of the 10s cap
    assert!(took >= Duration::from_secs(7));
    assert!(took < Duration::from_secs(14));
    assert!(store.failures().await.is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_skip_countdown_and_early_finish_through_commands() -> Result<()> {
    let (store, ids) = seeded_store(vec![1, 0], 2).await;
    let timing = TimingPolicy {
        countdown: CountdownPolicy::Fixed { seconds: 60 },
        ..TimingPolicy::default()
    };
    let (flow, mut events) = build_flow(&store, &ids, timing, FlakyUploader::new(0));
    let (command_tx, command_rx) = mpsc::channel(8);

    let runner = tokio::spawn(flow.run(backend(), command_rx));

    let mut rejected = 0;
    let mut skipped = 0;
    while let Some(event) = events.recv().await {
        match event {
            FlowEvent::QuestionStarted { countdown, .. } => {
                assert_eq!(countdown, 60);
                command_tx.send(FlowCommand::SkipCountdown).await?;
            }
            FlowEvent::RecordingStarted {
                skipped_countdown, ..
            } => {
                assert!(skipped_countdown);
                skipped += 1;
                // Too early: refused, recording continues
                command_tx.send(FlowCommand::FinishAnswer).await?;
                let commands = command_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(6)).await;
                    let _ = commands.send(FlowCommand::FinishAnswer).await;
                });
            }
            FlowEvent::FinishRejected { elapsed, minimum } => {
                assert_eq!(minimum, 5);
                assert!(elapsed < minimum);
                rejected += 1;
            }
            _ => {}
        }
    }

    let end = runner.await??;
    let SessionEnd::Finished(outcome) = end else {
        bail!("expected the interview to finish, got {:?}", end);
    };
    assert_eq!(outcome.reason, CompletionReason::Completed);
    assert_eq!(outcome.progress.uploaded_count, 2);
    assert_eq!(skipped, 2);
    assert_eq!(rejected, 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_exit_requires_confirmation_and_releases_capture() -> Result<()> {
    let (store, ids) = seeded_store(vec![0, 1], 2).await;
    let timing = TimingPolicy {
        countdown: CountdownPolicy::Fixed { seconds: 0 },
        ..TimingPolicy::default()
    };
    let (mut flow, _events) = build_flow(&store, &ids, timing, FlakyUploader::new(0));
    let backend = backend();

    flow.load_session().await?;
    assert_eq!(flow.phase(), FlowPhase::Ready);
    assert_eq!(flow.progress().remaining_global_seconds, Some(600));

    flow.start(backend.as_ref()).await?;
    assert_eq!(flow.phase(), FlowPhase::InProgress);
    // Zero countdown goes straight to recording
    assert_eq!(
        flow.question_phase(),
        Some(QuestionPhase::Recording { elapsed: 0 })
    );

    let result = flow.request_finish().await;
    assert!(matches!(
        result,
        Err(InterviewError::MinDurationNotMet {
            elapsed: 0,
            minimum: 5
        })
    ));

    let stream = match flow.capture().stream() {
        Some(stream) => stream,
        None => bail!("capture stream missing while in progress"),
    };

    assert!(!flow.exit(false));
    assert_eq!(flow.phase(), FlowPhase::InProgress);
    assert!(stream.is_active());

    assert!(flow.exit(true));
    assert_eq!(flow.phase(), FlowPhase::Exited);
    assert!(!stream.is_active());
    assert!(flow.capture().stream().is_none());

    // Nothing was uploaded for the discarded answer
    let recordings = store.get_recordings(&ids.interview_id, &ids.candidate_id).await?;
    assert!(recordings.is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_capped_answer_keeps_final_elapsed() -> Result<()> {
    let (store, ids) = seeded_store(vec![0, 1], 2).await;
    let timing = TimingPolicy {
        max_answer_secs: 4,
        min_answer_secs: 1,
        finish_visible_after_secs: 2,
        countdown: CountdownPolicy::Fixed { seconds: 0 },
        ..TimingPolicy::default()
    };
    let (mut flow, mut events) = build_flow(&store, &ids, timing, FlakyUploader::new(0));
    let backend = backend();

    flow.load_session().await?;
    flow.start(backend.as_ref()).await?;
    for _ in 0..4 {
        flow.tick().await?;
    }

    assert_eq!(flow.question_phase(), Some(QuestionPhase::Done { elapsed: 4 }));
    assert_eq!(flow.attempts()[0].recording_elapsed, 4);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, FlowEvent::RecordingStopped(StopReason::TimeLimit))));

    // Ticks while the blob is pending do not reset it
    flow.tick().await?;
    assert_eq!(flow.attempts()[0].recording_elapsed, 4);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_closing_command_channel_exits() -> Result<()> {
    let (store, ids) = seeded_store(vec![0, 1], 2).await;
    let (flow, mut events) = build_flow(&store, &ids, TimingPolicy::default(), FlakyUploader::new(0));
    let (command_tx, command_rx) = mpsc::channel(8);
    drop(command_tx);

    let end = flow.run(backend(), command_rx).await?;
    assert_eq!(end, SessionEnd::Exited);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, FlowEvent::Exited)));

    Ok(())
}

#[tokio::test]
async fn test_permission_denied_fails_session() -> Result<()> {
    let (store, ids) = seeded_store(vec![0, 1], 2).await;
    let (flow, mut events) = build_flow(&store, &ids, quick_timing(), FlakyUploader::new(0));
    let (_command_tx, command_rx) = mpsc::channel(8);

    let backend: Arc<dyn CaptureBackend> =
        Arc::new(SyntheticBackend::failing("NotAllowedError", "Permission denied"));
    let result = flow.run(backend, command_rx).await;

    assert!(matches!(
        result,
        Err(InterviewError::Capture(CaptureError::PermissionDenied))
    ));

    let message = drain(&mut events).into_iter().find_map(|e| match e {
        FlowEvent::Failed { message } => Some(message),
        _ => None,
    });
    assert_eq!(message, Some(CaptureError::PermissionDenied.user_message()));

    Ok(())
}

#[tokio::test]
async fn test_missing_candidate_fails_load() -> Result<()> {
    let (store, _) = seeded_store(vec![0, 1], 2).await;
    let ids = SessionIds::new("interview-1", "nobody");
    let (mut flow, _events) = build_flow(&store, &ids, quick_timing(), FlakyUploader::new(0));

    let result = flow.load_session().await;
    assert!(matches!(result, Err(InterviewError::SessionLoadFailed(_))));
    assert_eq!(flow.phase(), FlowPhase::Failed);

    // Nothing to start after a failed load
    let backend = backend();
    assert!(matches!(
        flow.start(backend.as_ref()).await,
        Err(InterviewError::NotInProgress)
    ));

    Ok(())
}

#[tokio::test]
async fn test_invalid_question_order_fails_load() -> Result<()> {
    for order in [vec![0, 0, 1], vec![0, 1], vec![0, 1, 3]] {
        let (store, ids) = seeded_store(order, 3).await;
        let (mut flow, _events) = build_flow(&store, &ids, quick_timing(), FlakyUploader::new(0));

        let result = flow.load_session().await;
        assert!(matches!(result, Err(InterviewError::SessionLoadFailed(_))));
    }

    Ok(())
}

#[tokio::test]
async fn test_unsupported_codec_fails_start() -> Result<()> {
    let (store, ids) = seeded_store(vec![0], 1).await;
    let (mut flow, _events) = build_flow(&store, &ids, quick_timing(), FlakyUploader::new(0));
    let backend = SyntheticBackend::new(SyntheticConfig {
        supported_types: vec!["video/ogg".to_string()],
        ..SyntheticConfig::default()
    });

    flow.load_session().await?;
    let result = flow.start(&backend).await;

    assert!(matches!(
        result,
        Err(InterviewError::Recorder(RecorderError::UnsupportedCodec { .. }))
    ));
    assert_eq!(flow.phase(), FlowPhase::Failed);
    assert!(flow.capture().stream().is_none());

    Ok(())
}
