//! Camera and microphone capture
//!
//! - `backend`: device/stream traits and capture constraints
//! - `classify`: platform error name → [`crate::error::CaptureError`]
//! - `session`: the single scoped owner of the interview's stream
//! - `synthetic`: generated media for simulation and tests

pub mod backend;
pub mod classify;
pub mod session;
pub mod synthetic;

pub use backend::{
    CaptureBackend, CaptureConstraints, DeviceError, EncoderSession, FacingMode, MediaStream,
    PreviewSink,
};
pub use classify::classify;
pub use session::{CaptureSession, PermissionState};
pub use synthetic::{SyntheticBackend, SyntheticConfig, SyntheticStream};
