//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore della pipeline di compressione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` per la tassonomia degli errori per-file e di batch
//! - Definisce `RuntimeError` per i fallimenti di inizializzazione del transcoder
//! - Integra con `thiserror` per messaggi descrittivi e conversioni automatiche
//!
//! ## Categorie di errori:
//! - `InvalidQuality`: qualità fuori range (unico errore fatale per il batch)
//! - `UnsupportedType`: media type non riconosciuto (per-file)
//! - `Decode`: immagine corrotta o non decodificabile (per-file)
//! - `Transcode`: fallimento di ffmpeg (per-file, può invalidare il runtime)
//! - `RuntimeUnavailable`: runtime video non inizializzabile (per ogni video del batch)
//! - `Io`: errori di I/O sui file temporanei
//!
//! ## Esempio:
//! ```rust
//! use madacly::CompressError;
//!
//! let err = CompressError::UnsupportedType("application/pdf".to_string());
//! assert_eq!(err.to_string(), "unsupported type: application/pdf");
//! ```

use crate::outcome::FailureKind;

/// Errors produced while compressing a batch or a single file
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("invalid quality {0}: must be between 50 and 100")]
    InvalidQuality(u8),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("transcode error: {reason}")]
    Transcode {
        reason: String,
        /// The shared runtime can no longer be trusted after this failure
        runtime_lost: bool,
    },

    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressError {
    pub fn transcode(reason: impl Into<String>) -> Self {
        Self::Transcode {
            reason: reason.into(),
            runtime_lost: false,
        }
    }

    pub fn runtime_lost(reason: impl Into<String>) -> Self {
        Self::Transcode {
            reason: reason.into(),
            runtime_lost: true,
        }
    }

    /// Whether the shared transcoder runtime must be marked failed
    pub fn poisons_runtime(&self) -> bool {
        matches!(self, Self::Transcode { runtime_lost: true, .. })
    }

    /// Failure category recorded on a `CompressionFailure`.
    ///
    /// I/O errors only happen inside codec adapters (temporary files), so
    /// they are attributed to the adapter that raised them by the caller;
    /// standalone they count as transcode failures.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedType(_) => FailureKind::UnsupportedType,
            Self::Decode(_) => FailureKind::Decode,
            Self::RuntimeUnavailable(_) => FailureKind::RuntimeUnavailable,
            Self::InvalidQuality(_) | Self::Transcode { .. } | Self::Io(_) => FailureKind::Transcode,
        }
    }
}

impl From<image::ImageError> for CompressError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors raised while loading the transcoder runtime.
///
/// Cloneable because every caller awaiting the same pending load receives it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("runtime asset not found: {0}")]
    AssetNotFound(String),

    #[error("integrity mismatch for {asset}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error("runtime probe failed: {0}")]
    Probe(String),

    #[error("runtime I/O error: {0}")]
    Io(String),

    #[error("runtime lost: {0}")]
    Lost(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
