use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::recorder::container_of;

/// Container formats accepted by the blob transfer endpoint, with file extensions
///
/// Covers what Chromium/Firefox (WebM, Matroska) and Safari/iOS (MP4,
/// QuickTime) produce.
pub const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
];

/// File extension for an allowed content type; codec parameters are ignored
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let container = container_of(content_type).to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(mime, _)| *mime == container)
        .map(|(_, ext)| *ext)
}

/// Recordings on local disk, served back under a public base URL
#[derive(Debug, Clone)]
pub struct BlobStorage {
    root: PathBuf,
    public_base_url: String,
}

impl BlobStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one answer, replacing any earlier upload of the same question
    ///
    /// Returns the public URL of the stored file.
    pub async fn store(
        &self,
        interview_id: &str,
        candidate_id: &str,
        question_index: usize,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let relative = format!(
            "{}/{}/question-{}.{}",
            interview_id, candidate_id, question_index, extension
        );
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write recording {:?}", path))?;

        info!("Stored {} bytes at {:?}", bytes.len(), path);

        Ok(format!("{}/{}", self.public_base_url, relative))
    }
}

/// Path segments must be plain identifiers
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_ignores_codec_parameters() {
        assert_eq!(extension_for("video/webm;codecs=vp9,opus"), Some("webm"));
        assert_eq!(extension_for("video/mp4"), Some("mp4"));
        assert_eq!(extension_for("VIDEO/QuickTime"), Some("mov"));
        assert_eq!(extension_for("audio/ogg"), None);
        assert_eq!(extension_for("text/plain"), None);
    }

    #[test]
    fn rejects_traversal_segments() {
        assert!(is_safe_segment("abc-123_x"));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment(""));
    }

    #[tokio::test]
    async fn stores_under_interview_and_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BlobStorage::new(dir.path(), "http://localhost/blobs/");

        let url = storage
            .store("int-1", "cand-1", 3, "webm", b"data")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost/blobs/int-1/cand-1/question-3.webm");
        let written = std::fs::read(dir.path().join("int-1/cand-1/question-3.webm")).unwrap();
        assert_eq!(written, b"data");
    }
}
