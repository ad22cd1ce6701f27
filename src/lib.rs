pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod interview;
pub mod recorder;
pub mod scoring;
pub mod store;
pub mod upload;

pub use capture::{
    CaptureBackend, CaptureConstraints, CaptureSession, DeviceError, MediaStream,
    PermissionState, SyntheticBackend, SyntheticConfig,
};
pub use config::Config;
pub use error::{CaptureError, InterviewError, RecorderError};
pub use http::{create_router, AppState, BlobStorage};
pub use interview::{
    CompletionReason, FlowCommand, FlowEvent, InterviewFlow, InterviewOutcome, InterviewProgress,
    QuestionTimer, SessionEnd, TimingPolicy,
};
pub use recorder::{MediaBlob, Recorder, RecorderState};
pub use store::{HttpRecordingStore, MemoryStore, RecordingStore, SessionIds};
pub use upload::{BlobUploader, HttpUploader, RetryPolicy, UploadPipeline};
