use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::{CaptureBackend, CaptureConstraints, MediaStream, PreviewSink};
use super::classify::classify;
use crate::error::CaptureError;

/// Permission state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Pending,
    Granted,
    Denied,
    DeviceMissing,
    DeviceBusy,
    Unknown,
}

impl From<&CaptureError> for PermissionState {
    fn from(error: &CaptureError) -> Self {
        match error {
            CaptureError::PermissionDenied => PermissionState::Denied,
            CaptureError::DeviceNotFound => PermissionState::DeviceMissing,
            CaptureError::DeviceBusy => PermissionState::DeviceBusy,
            CaptureError::Unknown(_) => PermissionState::Unknown,
        }
    }
}

/// Owner of the interview's single camera + microphone stream
///
/// Tracks are stopped on every exit path: explicit [`CaptureSession::release`]
/// or drop.
pub struct CaptureSession {
    constraints: CaptureConstraints,
    stream: Option<Arc<dyn MediaStream>>,
    permission: PermissionState,
    error_message: Option<String>,
    preview: Option<Arc<dyn PreviewSink>>,
}

impl CaptureSession {
    pub fn new(constraints: CaptureConstraints) -> Self {
        Self {
            constraints,
            stream: None,
            permission: PermissionState::Pending,
            error_message: None,
            preview: None,
        }
    }

    /// Bind a live preview; attached immediately if a stream is already open
    pub fn with_preview(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        if let Some(stream) = &self.stream {
            preview.attach(Arc::clone(stream));
        }
        self.preview = Some(preview);
        self
    }

    /// Acquire camera and microphone together
    ///
    /// Re-acquiring while a stream is held returns the existing stream.
    pub async fn acquire(
        &mut self,
        backend: &dyn CaptureBackend,
    ) -> Result<Arc<dyn MediaStream>, CaptureError> {
        if let Some(stream) = &self.stream {
            return Ok(Arc::clone(stream));
        }

        info!(
            "Requesting camera and microphone via {} ({}x{})",
            backend.name(),
            self.constraints.ideal_width,
            self.constraints.ideal_height
        );

        match backend.open(&self.constraints).await {
            Ok(stream) => {
                info!("Capture stream {} acquired", stream.id());
                self.permission = PermissionState::Granted;
                self.error_message = None;
                if let Some(preview) = &self.preview {
                    preview.attach(Arc::clone(&stream));
                }
                self.stream = Some(Arc::clone(&stream));
                Ok(stream)
            }
            Err(device_error) => {
                let error = classify(&device_error);
                warn!("Capture failed ({}): {}", device_error, error);
                self.permission = PermissionState::from(&error);
                self.error_message = Some(error.user_message());
                Err(error)
            }
        }
    }

    /// Stop all tracks and detach the preview
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            info!("Releasing capture stream {}", stream.id());
            if let Some(preview) = &self.preview {
                preview.detach();
            }
            stream.stop_tracks();
        }
    }

    pub fn stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.stream.clone()
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}
