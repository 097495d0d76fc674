//! # Media Model Module
//!
//! Tipi di input della pipeline: file da comprimere, classificazione e qualità.
//!
//! ## Responsabilità:
//! - `InputFile`: payload binario immutabile + nome + media type dichiarato
//! - `MediaKind`: classificazione Image/Video da tabella fissa di media type
//! - `Quality`: valore di qualità validato nel range 50-100
//!
//! ## Tabella di classificazione:
//! | Media type        | Kind  |
//! |-------------------|-------|
//! | image/jpeg        | Image |
//! | image/png         | Image |
//! | image/webp        | Image |
//! | video/mp4         | Video |
//! | video/quicktime   | Video |
//!
//! Qualsiasi altro tipo è un errore di classificazione, mai scartato in silenzio.

use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const MIN_QUALITY: u8 = 50;
pub const MAX_QUALITY: u8 = 100;
pub const DEFAULT_QUALITY: u8 = 80;

/// A file submitted for compression. The pipeline only reads it.
#[derive(Clone)]
pub struct InputFile {
    pub name: String,
    pub media_type: String,
    pub data: Arc<[u8]>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Byte size of the payload
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn kind(&self) -> Result<MediaKind, CompressError> {
        MediaKind::from_media_type(&self.media_type)
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Which codec adapter handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a declared media type. Parameters after `;` are ignored.
    pub fn from_media_type(media_type: &str) -> Result<Self, CompressError> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/png" | "image/webp" => Ok(Self::Image),
            "video/mp4" | "video/quicktime" => Ok(Self::Video),
            _ => Err(CompressError::UnsupportedType(media_type.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression quality, validated to `[MIN_QUALITY, MAX_QUALITY]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Result<Self, CompressError> {
        if (MIN_QUALITY..=MAX_QUALITY).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CompressError::InvalidQuality(value))
        }
    }

    /// For callers that prefer clamping over rejection
    pub fn clamped(value: u8) -> Self {
        Self(value.clamp(MIN_QUALITY, MAX_QUALITY))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(MediaKind::from_media_type("image/jpeg").unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::from_media_type("image/png").unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::from_media_type("image/webp").unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::from_media_type("video/mp4").unwrap(), MediaKind::Video);
        assert_eq!(MediaKind::from_media_type("video/quicktime").unwrap(), MediaKind::Video);
    }

    #[test]
    fn test_classification_is_case_insensitive_and_ignores_params() {
        assert_eq!(MediaKind::from_media_type("IMAGE/JPEG").unwrap(), MediaKind::Image);
        assert_eq!(
            MediaKind::from_media_type("video/mp4; codecs=\"avc1\"").unwrap(),
            MediaKind::Video
        );
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let err = MediaKind::from_media_type("image/gif").unwrap_err();
        assert!(matches!(err, CompressError::UnsupportedType(ref t) if t == "image/gif"));
        assert!(MediaKind::from_media_type("").is_err());
    }

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(50).is_ok());
        assert!(Quality::new(100).is_ok());
        assert!(matches!(Quality::new(49), Err(CompressError::InvalidQuality(49))));
        assert!(matches!(Quality::new(101), Err(CompressError::InvalidQuality(101))));
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(Quality::clamped(10).value(), 50);
        assert_eq!(Quality::clamped(200).value(), 100);
        assert_eq!(Quality::clamped(75).value(), 75);
    }

    #[test]
    fn test_input_file_size() {
        let file = InputFile::new("a.jpg", "image/jpeg", vec![0u8; 1234]);
        assert_eq!(file.size(), 1234);
        assert_eq!(file.kind().unwrap(), MediaKind::Image);
    }
}
