// Synthetic capture backend
//
// Generates deterministic media fragments on a timer instead of talking to
// real hardware. Used by the `simulate` command and throughout the tests.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::backend::{CaptureBackend, CaptureConstraints, DeviceError, EncoderSession, MediaStream};

/// Configuration for synthetic capture
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Time between generated fragments
    pub fragment_interval: Duration,
    /// Bytes per fragment
    pub fragment_size: usize,
    /// Emit an empty fragment every N fragments (exercises filtering)
    pub empty_every: Option<u64>,
    /// Container/codec identifiers the fake encoder accepts
    pub supported_types: Vec<String>,
    /// Fail `open` with this platform error instead of granting access
    pub open_error: Option<DeviceError>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            fragment_interval: Duration::from_millis(1000),
            fragment_size: 1024,
            empty_every: None,
            supported_types: vec![
                "video/webm;codecs=vp9,opus".to_string(),
                "video/webm".to_string(),
                "video/mp4".to_string(),
            ],
            open_error: None,
        }
    }
}

/// Synthetic capture backend
pub struct SyntheticBackend {
    config: SyntheticConfig,
    opened: AtomicUsize,
}

impl SyntheticBackend {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            opened: AtomicUsize::new(0),
        }
    }

    /// Backend whose permission prompt always fails with `name`
    pub fn failing(name: &str, message: &str) -> Self {
        Self::new(SyntheticConfig {
            open_error: Some(DeviceError::new(name, message)),
            ..SyntheticConfig::default()
        })
    }

    /// Number of streams handed out so far
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SyntheticBackend {
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn MediaStream>, DeviceError> {
        if let Some(error) = &self.config.open_error {
            return Err(error.clone());
        }

        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        info!(
            "Synthetic capture opened ({}x{}, audio={})",
            constraints.ideal_width, constraints.ideal_height, constraints.audio
        );

        Ok(Arc::new(SyntheticStream::new(
            format!("synthetic-{n}"),
            self.config.clone(),
        )))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Stream produced by [`SyntheticBackend`]
pub struct SyntheticStream {
    id: String,
    config: SyntheticConfig,
    active: Arc<AtomicBool>,
}

impl SyntheticStream {
    pub fn new(id: String, config: SyntheticConfig) -> Self {
        Self {
            id,
            config,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    fn fragment(seq: u64, size: usize, empty_every: Option<u64>) -> Vec<u8> {
        match empty_every {
            Some(n) if n > 0 && seq % n == n - 1 => Vec::new(),
            _ => vec![(seq % 251) as u8; size],
        }
    }
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.config.supported_types.iter().any(|t| t == mime_type)
    }

    fn start_encoder(&self, mime_type: &str) -> Result<EncoderSession> {
        if !self.is_active() {
            bail!("Stream {} has been stopped", self.id);
        }
        if !self.is_type_supported(mime_type) {
            bail!("Encoder does not support {}", mime_type);
        }

        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let active = Arc::clone(&self.active);
        let interval = self.config.fragment_interval;
        let size = self.config.fragment_size;
        let empty_every = self.config.empty_every;
        let id = self.id.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            let mut seq: u64 = 0;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if !active.load(Ordering::SeqCst) {
                            break;
                        }
                        let fragment = Self::fragment(seq, size, empty_every);
                        seq += 1;
                        if tx.send(fragment).await.is_err() {
                            return;
                        }
                    }
                }
            }

            // Flush the trailing fragment, then close the channel
            let _ = tx.send(Self::fragment(seq, size, None)).await;
            debug!("Synthetic encoder on {} flushed after {} fragments", id, seq + 1);
        });

        Ok(EncoderSession {
            fragments: rx,
            stop: stop_tx,
        })
    }

    fn stop_tracks(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Synthetic stream {} tracks stopped", self.id);
        }
    }
}
