use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Which way the camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front-facing ("user") camera
    User,
    /// Rear-facing ("environment") camera
    Environment,
}

/// Constraints for a combined camera + microphone request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConstraints {
    /// Ideal video width in pixels
    pub ideal_width: u32,
    /// Ideal video height in pixels
    pub ideal_height: u32,
    /// Preferred camera
    pub facing_mode: FacingMode,
    /// Request the microphone in the same prompt
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing_mode: FacingMode::User,
            audio: true,
        }
    }
}

/// Raw platform failure, as reported by the device layer
///
/// `name` is the loosely-typed error identifier (e.g. `NotAllowedError`);
/// turn it into a [`crate::error::CaptureError`] with [`super::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    pub name: String,
    pub message: String,
}

impl DeviceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for DeviceError {}

/// A running encoder attached to a stream
///
/// Fragments arrive in order on `fragments`. Sending on `stop` asks the
/// encoder to flush its final fragment; the channel closes afterwards.
pub struct EncoderSession {
    pub fragments: mpsc::Receiver<Vec<u8>>,
    pub stop: oneshot::Sender<()>,
}

/// Live camera + microphone stream
///
/// Shared read-only between the preview and the recorder. Only the owning
/// [`super::CaptureSession`] calls [`MediaStream::stop_tracks`].
pub trait MediaStream: Send + Sync {
    /// Stream identifier for logging
    fn id(&self) -> &str;

    /// Whether the underlying tracks are still live
    fn is_active(&self) -> bool;

    /// Whether the platform encoder accepts this container/codec identifier
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Start encoding the stream with the given format
    fn start_encoder(&self, mime_type: &str) -> Result<EncoderSession>;

    /// Stop every underlying track
    fn stop_tracks(&self);
}

/// Something that displays the live stream (the candidate's self-view)
pub trait PreviewSink: Send + Sync {
    fn attach(&self, stream: Arc<dyn MediaStream>);
    fn detach(&self);
}

/// Camera/microphone access
///
/// Implementations:
/// - Synthetic: generated fragments (simulation and tests)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request camera and microphone as a single permission prompt
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn MediaStream>, DeviceError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
