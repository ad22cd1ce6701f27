use crate::capture::MediaStream;
use crate::error::RecorderError;

/// Container/codec identifiers in order of preference
///
/// WebM first (Chromium, Firefox), then MP4 for Safari/iOS.
pub const MIME_PREFERENCES: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4;codecs=avc1,mp4a",
    "video/mp4",
];

/// Pick the first preferred format the stream's encoder supports
pub fn negotiate_mime(stream: &dyn MediaStream) -> Result<&'static str, RecorderError> {
    MIME_PREFERENCES
        .iter()
        .copied()
        .find(|mime| stream.is_type_supported(mime))
        .ok_or_else(|| RecorderError::UnsupportedCodec {
            tried: MIME_PREFERENCES.join(", "),
        })
}

/// Container part of a MIME type, without codec parameters
pub fn container_of(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}
