use thiserror::Error;

/// Classified camera/microphone acquisition failure
///
/// Produced by [`crate::capture::classify`] from the loosely-typed platform
/// error name. Every variant is terminal for the session: browsers require a
/// user gesture to prompt again, so nothing here is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera or microphone permission denied")]
    PermissionDenied,

    #[error("no camera or microphone found")]
    DeviceNotFound,

    #[error("camera or microphone is busy")]
    DeviceBusy,

    #[error("unable to access camera or microphone: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Message shown to the candidate on the full-page error screen
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::PermissionDenied => {
                "Camera and microphone access was denied. Allow access in your browser \
                 settings and reload the page to continue."
                    .to_string()
            }
            CaptureError::DeviceNotFound => {
                "No camera or microphone was found. Connect a device and reload the page."
                    .to_string()
            }
            CaptureError::DeviceBusy => {
                "Your camera or microphone is being used by another application or is \
                 blocked by system privacy settings. Close other apps and reload the page."
                    .to_string()
            }
            CaptureError::Unknown(detail) => {
                format!("Unable to access camera or microphone ({detail}). Reload the page to try again.")
            }
        }
    }
}

/// Recorder failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("no supported recording format (tried: {tried})")]
    UnsupportedCodec { tried: String },

    #[error("recorder is already recording")]
    AlreadyRecording,

    #[error("capture stream is no longer active")]
    StreamInactive,

    #[error("encoder failed to start: {0}")]
    Encoder(String),
}

/// Interview-level error taxonomy
///
/// Running out of interview time is not listed here; it ends the session
/// with [`crate::interview::CompletionReason::Timeout`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterviewError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("answer is too short ({elapsed}s recorded, minimum {minimum}s)")]
    MinDurationNotMet { elapsed: u32, minimum: u32 },

    #[error("upload failed for question {question_index}: {reason}")]
    UploadFailed { question_index: usize, reason: String },

    #[error("upload abandoned for question {question_index} after {attempts} attempts")]
    UploadAbandoned { question_index: usize, attempts: u32 },

    #[error("failed to load interview session: {0}")]
    SessionLoadFailed(String),

    #[error("interview is not in progress")]
    NotInProgress,
}

impl InterviewError {
    /// Whether the error ends the whole session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InterviewError::Capture(_)
                | InterviewError::Recorder(RecorderError::UnsupportedCodec { .. })
                | InterviewError::SessionLoadFailed(_)
        )
    }
}
