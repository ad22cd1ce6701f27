use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use interview_recorder::capture::{CaptureBackend, CaptureConstraints, SyntheticBackend};
use interview_recorder::interview::{FlowCommand, FlowEvent, SessionEnd};
use interview_recorder::store::{Candidate, Interview};
use interview_recorder::{
    create_router, AppState, BlobStorage, CaptureSession, Config, HttpRecordingStore,
    HttpUploader, InterviewFlow, MemoryStore, RetryPolicy, SessionIds, TimingPolicy,
    UploadPipeline,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interview-recorder", version, about = "Asynchronous video interview recording")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Recording Store and blob upload server
    Serve {
        #[arg(long, default_value = "config/interview-recorder")]
        config: String,
    },
    /// Create an interview and register one candidate for it
    Seed {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        #[arg(long)]
        title: String,
        /// Repeat for each question
        #[arg(long = "question", required = true)]
        questions: Vec<String>,
        #[arg(long, default_value = "Test Candidate")]
        name: String,
        #[arg(long, default_value = "candidate@example.com")]
        email: String,
    },
    /// Run a full interview against a server using synthetic capture
    Simulate {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        #[arg(long)]
        interview: String,
        #[arg(long)]
        candidate: String,
        /// Seconds to record before pressing finish
        #[arg(long, default_value_t = 8)]
        answer_secs: u32,
        /// Take timing and retry policy from this config file
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve { config } => serve(&config).await,
        Command::Seed {
            server,
            title,
            questions,
            name,
            email,
        } => seed(&server, title, questions, name, email).await,
        Command::Simulate {
            server,
            interview,
            candidate,
            answer_secs,
            config,
        } => simulate(&server, interview, candidate, answer_secs, config.as_deref()).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let cfg = Config::load(config_path)?;

    info!("Loaded config: {}", cfg.service.name);
    info!("Recordings directory: {}", cfg.storage.recordings_path);

    tokio::fs::create_dir_all(&cfg.storage.recordings_path)
        .await
        .context("Failed to create recordings directory")?;

    let state = AppState::new(
        MemoryStore::new(),
        BlobStorage::new(&cfg.storage.recordings_path, &cfg.storage.public_base_url),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

async fn seed(
    server: &str,
    title: String,
    questions: Vec<String>,
    name: String,
    email: String,
) -> Result<()> {
    let client = reqwest::Client::new();
    let base = server.trim_end_matches('/');

    let interview: Interview = client
        .post(format!("{}/interviews", base))
        .json(&serde_json::json!({ "job_title": title, "questions": questions }))
        .send()
        .await
        .context("Failed to reach server")?
        .error_for_status()
        .context("Server rejected interview")?
        .json()
        .await?;

    let candidate: Candidate = client
        .post(format!("{}/interviews/{}/candidates", base, interview.id))
        .json(&serde_json::json!({ "name": name, "email": email }))
        .send()
        .await
        .context("Failed to reach server")?
        .error_for_status()
        .context("Server rejected candidate")?
        .json()
        .await?;

    println!("interview: {}", interview.id);
    println!("candidate: {}", candidate.id);
    println!("question order: {:?}", candidate.question_order);

    Ok(())
}

fn check_answer_secs(answer_secs: u32, timing: &TimingPolicy) -> Result<()> {
    if answer_secs < timing.min_answer_secs {
        bail!(
            "--answer-secs must be at least the minimum answer length ({}s)",
            timing.min_answer_secs
        );
    }
    Ok(())
}

async fn simulate(
    server: &str,
    interview_id: String,
    candidate_id: String,
    answer_secs: u32,
    config_path: Option<&str>,
) -> Result<()> {
    let (timing, retry) = match config_path {
        Some(path) => {
            let cfg = Config::load(path)?;
            (cfg.interview, cfg.upload)
        }
        None => (TimingPolicy::default(), RetryPolicy::default()),
    };

    check_answer_secs(answer_secs, &timing)?;

    let ids = SessionIds::new(interview_id, candidate_id);
    let store = Arc::new(HttpRecordingStore::new(server));
    let pipeline = UploadPipeline::new(
        ids.clone(),
        Arc::new(HttpUploader::new(server)),
        store.clone(),
        store.clone(),
        retry,
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(16);

    let flow = InterviewFlow::new(
        ids,
        timing,
        store,
        pipeline,
        CaptureSession::new(CaptureConstraints::default()),
    )
    .with_events(event_tx);

    let backend: Arc<dyn CaptureBackend> = Arc::new(SyntheticBackend::default());
    let runner = tokio::spawn(flow.run(backend, command_rx));

    while let Some(event) = event_rx.recv().await {
        match event {
            FlowEvent::SessionLoaded {
                job_title,
                total_questions,
                remaining_global_seconds,
            } => info!(
                "{}: {} questions, {}s available",
                job_title, total_questions, remaining_global_seconds
            ),
            FlowEvent::QuestionStarted {
                display_index,
                question,
                ..
            } => {
                info!("Q{}: {}", display_index + 1, question);
                if command_tx.send(FlowCommand::SkipCountdown).await.is_err() {
                    break;
                }
            }
            FlowEvent::RecordingStarted { .. } => {
                let commands = command_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(u64::from(answer_secs))).await;
                    let _ = commands.send(FlowCommand::FinishAnswer).await;
                });
            }
            FlowEvent::FinishRejected { elapsed, minimum } => {
                warn!("Finish refused at {}s (minimum {}s)", elapsed, minimum)
            }
            FlowEvent::Progress {
                progress,
                pending_uploads,
            } if pending_uploads > 0 => info!(
                "{}/{} uploaded, {} retrying",
                progress.uploaded_count, progress.total_questions, pending_uploads
            ),
            FlowEvent::Failed { message } => error!("{}", message),
            _ => {}
        }
    }

    match runner.await.context("Interview task panicked")?? {
        SessionEnd::Finished(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        SessionEnd::Exited => println!("interview exited"),
    }

    Ok(())
}
