//! Artifact assembly and download
//!
//! Buffered chunks are concatenated once, on stop, into a single artifact.
//! Nothing here is partial: a failed session never reaches this step.

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::encode::file_extension;
use crate::error::{LecternError, Result};
use crate::types::CaptureMode;

/// Finished recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Bytes,
    content_type: String,
    mode: CaptureMode,
    created_at: DateTime<Utc>,
}

/// Serializable description of an artifact (no payload)
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub mode: CaptureMode,
    pub content_type: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Recorded bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Declared content type
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// When the artifact was assembled
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            mode: self.mode,
            content_type: self.content_type.clone(),
            size_bytes: self.data.len(),
            created_at: self.created_at,
        }
    }

    /// Hand off the payload and its content type
    pub fn into_parts(self) -> (Bytes, String) {
        (self.data, self.content_type)
    }

    /// Download name for this artifact
    pub fn suggested_filename(&self, title: &str) -> String {
        suggested_filename(title, self.mode, self.created_at)
    }

    /// Write the artifact into `dir` as `filename`, creating `dir` if needed
    pub fn write_to_dir(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| {
                LecternError::Io(e).with_context(format!("creating {}", dir.display()))
            })?;
        }

        let path = dir.join(filename);
        std::fs::write(&path, &self.data)
            .map_err(|e| LecternError::Io(e).with_context(format!("writing {}", path.display())))?;

        info!(
            "Saved {} bytes of {} to {}",
            self.data.len(),
            self.content_type,
            path.display()
        );
        Ok(path)
    }
}

/// Concatenate chunks, in order, into one artifact
pub fn finalize(chunks: &[Bytes], content_type: &str, mode: CaptureMode) -> Artifact {
    let total: usize = chunks.iter().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(total);
    for chunk in chunks {
        buf.extend_from_slice(chunk);
    }

    Artifact {
        data: buf.freeze(),
        content_type: content_type.to_string(),
        mode,
        created_at: Utc::now(),
    }
}

/// `{title}_{mode}_{timestamp}.{ext}`
pub fn suggested_filename(title: &str, mode: CaptureMode, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.{}",
        sanitize_title(title),
        mode,
        at.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
        file_extension(mode)
    )
}

/// Reduce a free-form title to a filesystem-safe token
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_was_sep = false;
    for c in title.trim().chars() {
        if c.is_alphanumeric() || c == '-' {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "recording".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_finalize_concatenates_in_order() {
        let chunks = vec![
            Bytes::from_static(b"ab"),
            Bytes::from_static(b""),
            Bytes::from_static(b"cde"),
        ];
        let artifact = finalize(&chunks, "video/webm", CaptureMode::Camera);
        assert_eq!(artifact.data().as_ref(), b"abcde");
        assert_eq!(artifact.len(), 5);
        assert_eq!(artifact.content_type(), "video/webm");
    }

    #[test]
    fn test_finalize_zero_chunks() {
        let artifact = finalize(&[], "audio/webm", CaptureMode::Audio);
        assert!(artifact.is_empty());
        assert_eq!(artifact.mode(), CaptureMode::Audio);
    }

    #[test]
    fn test_suggested_filename() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let name = suggested_filename("Week 1: Intro to Sets", CaptureMode::Screen, at);
        assert_eq!(name, "Week_1_Intro_to_Sets_screen_2024-03-05T14-07-09-000Z.webm");

        let name = suggested_filename("Lecture", CaptureMode::Audio, at);
        assert!(name.starts_with("Lecture_audio_"));
        assert!(name.ends_with(".weba"));
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("  a/b\\c  "), "a_b_c");
        assert_eq!(sanitize_title("???"), "recording");
        assert_eq!(sanitize_title(""), "recording");
        assert_eq!(sanitize_title("unit-3"), "unit-3");
    }
}
