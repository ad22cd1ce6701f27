use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::codec::negotiate_mime;
use crate::capture::{EncoderSession, MediaStream};
use crate::error::RecorderError;

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    Recording,
    Finalizing,
    Complete,
}

/// A finalized recording: every non-empty fragment, concatenated in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    data: Arc<Vec<u8>>,
    mime_type: String,
}

impl MediaBlob {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data: Arc::new(data),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.as_ref().clone()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct Inner {
    state: RecorderState,
    chunks: Vec<Vec<u8>>,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    finalize_count: usize,
}

/// One recording attempt on top of a borrowed capture stream
///
/// The recorder never stops the stream's tracks. `stop()` is always honoured
/// once recording; minimum answer length is the question timer's concern.
pub struct Recorder {
    inner: Arc<Mutex<Inner>>,
    stop_tx: Option<oneshot::Sender<()>>,
    mime_type: Option<&'static str>,
    collector: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RecorderState::Idle,
                chunks: Vec::new(),
                started_at: None,
                stopped_at: None,
                finalize_count: 0,
            })),
            stop_tx: None,
            mime_type: None,
            collector: None,
        }
    }

    /// Start recording
    ///
    /// Returns the receiver on which the finalized blob is delivered, exactly
    /// once, after `stop()` (or after the stream ends on its own).
    pub async fn start(
        &mut self,
        stream: Arc<dyn MediaStream>,
    ) -> Result<oneshot::Receiver<MediaBlob>, RecorderError> {
        {
            let inner = self.inner.lock().await;
            if matches!(
                inner.state,
                RecorderState::Recording | RecorderState::Finalizing
            ) {
                return Err(RecorderError::AlreadyRecording);
            }
        }

        if !stream.is_active() {
            return Err(RecorderError::StreamInactive);
        }

        let mime_type = negotiate_mime(stream.as_ref())?;
        let EncoderSession {
            mut fragments,
            stop,
        } = stream
            .start_encoder(mime_type)
            .map_err(|e| RecorderError::Encoder(e.to_string()))?;

        {
            let mut inner = self.inner.lock().await;
            inner.chunks.clear();
            inner.state = RecorderState::Recording;
            inner.started_at = Some(Instant::now());
            inner.stopped_at = None;
        }

        info!("Recording started on {} as {}", stream.id(), mime_type);

        let (done_tx, done_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        let collector = tokio::spawn(async move {
            while let Some(fragment) = fragments.recv().await {
                if fragment.is_empty() {
                    continue;
                }
                inner.lock().await.chunks.push(fragment);
            }

            let blob = {
                let mut inner = inner.lock().await;
                inner.state = RecorderState::Finalizing;
                if inner.stopped_at.is_none() {
                    inner.stopped_at = Some(Instant::now());
                }
                let blob = MediaBlob::new(inner.chunks.concat(), mime_type);
                inner.state = RecorderState::Complete;
                inner.finalize_count += 1;
                info!(
                    "Recording finalized: {} fragments, {} bytes",
                    inner.chunks.len(),
                    blob.len()
                );
                blob
            };

            if done_tx.send(blob).is_err() {
                warn!("Recording finalized but the blob was discarded");
            }
        });

        self.stop_tx = Some(stop);
        self.mime_type = Some(mime_type);
        self.collector = Some(collector);

        Ok(done_rx)
    }

    /// Request finalization; a no-op unless currently recording
    pub async fn stop(&mut self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != RecorderState::Recording {
                debug!("Stop ignored in state {:?}", inner.state);
                return;
            }
            inner.state = RecorderState::Finalizing;
            inner.stopped_at = Some(Instant::now());
        }

        info!("Stopping recording");
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
    }

    pub async fn state(&self) -> RecorderState {
        self.inner.lock().await.state
    }

    /// Whole seconds recorded so far (frozen once stopped)
    pub async fn elapsed_seconds(&self) -> u32 {
        let inner = self.inner.lock().await;
        match (inner.started_at, inner.stopped_at) {
            (Some(start), Some(stop)) => stop.duration_since(start).as_secs() as u32,
            (Some(start), None) => start.elapsed().as_secs() as u32,
            _ => 0,
        }
    }

    /// Number of fragments accumulated in the current recording
    pub async fn chunk_count(&self) -> usize {
        self.inner.lock().await.chunks.len()
    }

    /// Times a blob has been produced by this recorder
    pub async fn finalize_count(&self) -> usize {
        self.inner.lock().await.finalize_count
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.mime_type
    }

    /// Wait for the collector of the current recording to finish
    pub async fn join(&mut self) {
        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                warn!("Recorder collector task failed: {}", e);
            }
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
