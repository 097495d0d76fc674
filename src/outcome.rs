//! # Compression Outcome Module
//!
//! Record per-file prodotti dalla pipeline: successo o fallimento, mai scartati.
//!
//! ## Strutture dati:
//! - `CompressedResult`: dimensioni originale/compressa + payload compresso
//! - `CompressionFailure`: categoria e descrizione dell'errore
//! - `CompressionOutcome`: unione taggata dei due casi
//!
//! Ogni outcome ha un `OutcomeId` univoco (UUID v4) usato come chiave stabile
//! per liste di risultati e per la rimozione selettiva.
//!
//! ## Esempio JSON (payload escluso):
//! ```json
//! {
//!   "status": "compressed",
//!   "id": "5f0c7a1e-...",
//!   "file_name": "holiday.jpg",
//!   "kind": "image",
//!   "media_type": "image/jpeg",
//!   "original_size": 2000000,
//!   "compressed_size": 812345,
//!   "elapsed_ms": 140
//! }
//! ```

use crate::error::CompressError;
use crate::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Stable key of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeId(Uuid);

impl OutcomeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OutcomeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Successful compression of one file
#[derive(Debug, Clone, Serialize)]
pub struct CompressedResult {
    pub id: OutcomeId,
    pub file_name: String,
    pub kind: MediaKind,
    pub media_type: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl CompressedResult {
    pub fn new(
        file_name: impl Into<String>,
        kind: MediaKind,
        media_type: impl Into<String>,
        original_size: u64,
        data: Vec<u8>,
        elapsed: Duration,
    ) -> Self {
        Self {
            id: OutcomeId::new(),
            file_name: file_name.into(),
            kind,
            media_type: media_type.into(),
            original_size,
            compressed_size: data.len() as u64,
            elapsed_ms: elapsed.as_millis() as u64,
            data,
        }
    }

    /// Percentage saved; negative when the output grew
    pub fn reduction_percent(&self) -> f64 {
        crate::stats::calculate_reduction(self.original_size, self.compressed_size)
    }
}

/// Category of a per-file failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedType,
    Decode,
    Transcode,
    RuntimeUnavailable,
}

/// Failed compression of one file
#[derive(Debug, Clone, Serialize)]
pub struct CompressionFailure {
    pub id: OutcomeId,
    pub file_name: String,
    pub kind: Option<MediaKind>,
    pub failure: FailureKind,
    pub error: String,
    pub elapsed_ms: u64,
}

impl CompressionFailure {
    pub fn new(file_name: impl Into<String>, kind: Option<MediaKind>, error: &CompressError, elapsed: Duration) -> Self {
        Self::with_kind(file_name, kind, error.failure_kind(), error, elapsed)
    }

    pub fn with_kind(
        file_name: impl Into<String>,
        kind: Option<MediaKind>,
        failure: FailureKind,
        error: &CompressError,
        elapsed: Duration,
    ) -> Self {
        Self {
            id: OutcomeId::new(),
            file_name: file_name.into(),
            kind,
            failure,
            error: error.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Per-file result of a batch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompressionOutcome {
    Compressed(CompressedResult),
    Failed(CompressionFailure),
}

impl CompressionOutcome {
    pub fn id(&self) -> OutcomeId {
        match self {
            Self::Compressed(r) => r.id,
            Self::Failed(f) => f.id,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Compressed(r) => &r.file_name,
            Self::Failed(f) => &f.file_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Compressed(_))
    }

    pub fn as_result(&self) -> Option<&CompressedResult> {
        match self {
            Self::Compressed(r) => Some(r),
            Self::Failed(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&CompressionFailure> {
        match self {
            Self::Compressed(_) => None,
            Self::Failed(f) => Some(f),
        }
    }
}
