//! Script text and media artifacts produced or consumed by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when constructing artifacts from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("script text is empty")]
    BlankScript,

    #[error("{0} payload is empty")]
    EmptyPayload(&'static str),

    #[error("unsupported media type for {kind}: {media_type}")]
    UnsupportedMediaType {
        kind: &'static str,
        media_type: String,
    },
}

/// Narration script. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScriptText(String);

impl ScriptText {
    /// Wrap script text, rejecting empty or whitespace-only input.
    pub fn new(text: impl Into<String>) -> Result<Self, ArtifactError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ArtifactError::BlankScript);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ScriptText {
    type Error = ArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScriptText> for String {
    fn from(value: ScriptText) -> Self {
        value.0
    }
}

impl fmt::Display for ScriptText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source image uploaded by the user, used to condition video generation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImageArtifact {
    /// Create an image artifact, validating payload and media type.
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Result<Self, ArtifactError> {
        let media_type = media_type.into();
        if bytes.is_empty() {
            return Err(ArtifactError::EmptyPayload("image"));
        }
        if !media_type.starts_with("image/") {
            return Err(ArtifactError::UnsupportedMediaType {
                kind: "image",
                media_type,
            });
        }
        Ok(Self { bytes, media_type })
    }

    /// Media type for a file extension accepted by the video model.
    pub fn media_type_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }
}

/// Narration audio produced by the voice stage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl AudioArtifact {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// File extension matching the media type.
    pub fn extension(&self) -> &'static str {
        if self.media_type.contains("wav") {
            "wav"
        } else if self.media_type.contains("mpeg") || self.media_type.contains("mp3") {
            "mp3"
        } else {
            // Raw PCM from the speech endpoint
            "pcm"
        }
    }
}

/// Generated video.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoArtifact {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl VideoArtifact {
    pub fn mp4(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: "video/mp4".to_string(),
        }
    }
}

// Payloads can be megabytes; Debug prints sizes only.
macro_rules! impl_payload_debug {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($ty))
                        .field("media_type", &self.media_type)
                        .field("len", &self.bytes.len())
                        .finish()
                }
            }
        )*
    };
}

impl_payload_debug!(ImageArtifact, AudioArtifact, VideoArtifact);
