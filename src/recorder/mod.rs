pub mod codec;
pub mod recorder;

pub use codec::{container_of, negotiate_mime, MIME_PREFERENCES};
pub use recorder::{MediaBlob, Recorder, RecorderState};
