//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con
//! un'interfaccia esterna (una riga JSON per evento su stdout).
//!
//! ## Responsabilità:
//! - Emette messaggi JSON strutturati per eventi di progresso
//! - Riusa i tipi di outcome e statistiche della pipeline
//! - `JsonProgress`: osservatore che traduce gli eventi del batch in messaggi
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch
//! - `runtime`: Cambio di stato del runtime video
//! - `file_start`: Inizio elaborazione di un file
//! - `progress`: Percentuale del file corrente
//! - `file_complete`: Outcome di un file (successo o fallimento)
//! - `complete`: Fine del batch con statistiche finali
//! - `error`: Errore generale

use crate::outcome::CompressionOutcome;
use crate::progress::{BatchProgress, ProgressObserver};
use crate::runtime::RuntimeState;
use crate::stats::BatchStats;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio del batch
    Start {
        total_files: usize,
        quality: u8,
        output_dir: Option<PathBuf>,
    },

    /// Stato del runtime video
    Runtime { state: RuntimeState },

    /// Inizio elaborazione di un file specifico
    FileStart {
        file_name: String,
        index: usize,
        total: usize,
    },

    /// Progresso del file corrente
    Progress {
        file_name: String,
        index: usize,
        total: usize,
        percent: u8,
    },

    /// Fine elaborazione di un file specifico
    FileComplete {
        index: usize,
        outcome: CompressionOutcome,
    },

    /// Batch completato
    Complete {
        #[serde(flatten)]
        stats: BatchStats,
        cancelled: bool,
        duration_seconds: f64,
    },

    /// Errore generale
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_json_line() {
            println!("{}", json);
        }
    }

    pub fn to_json_line(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    pub fn start(total_files: usize, quality: u8, output_dir: Option<PathBuf>) -> Self {
        Self::Start {
            total_files,
            quality,
            output_dir,
        }
    }

    pub fn progress(progress: &BatchProgress) -> Self {
        Self::Progress {
            file_name: progress.file_name.clone(),
            index: progress.index,
            total: progress.total,
            percent: progress.percent,
        }
    }

    pub fn complete(outcomes: &[CompressionOutcome], cancelled: bool, duration_seconds: f64) -> Self {
        Self::Complete {
            stats: BatchStats::from_outcomes(outcomes),
            cancelled,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

/// Observer that prints batch events as JSON lines
pub struct JsonProgress {
    started: Instant,
    current_index: Mutex<Option<usize>>,
}

impl JsonProgress {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            current_index: Mutex::new(None),
        }
    }

    /// Messages for one progress update; a `file_start` precedes the first
    /// update of each file.
    fn messages_for(&self, progress: &BatchProgress) -> Vec<JsonMessage> {
        let mut current = self
            .current_index
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut messages = Vec::with_capacity(2);
        if *current != Some(progress.index) {
            *current = Some(progress.index);
            messages.push(JsonMessage::FileStart {
                file_name: progress.file_name.clone(),
                index: progress.index,
                total: progress.total,
            });
        }
        messages.push(JsonMessage::progress(progress));
        messages
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for JsonProgress {
    fn on_progress(&self, progress: &BatchProgress) {
        for message in self.messages_for(progress) {
            message.emit();
        }
    }

    fn on_runtime_state(&self, state: RuntimeState) {
        JsonMessage::Runtime { state }.emit();
    }

    fn on_outcome(&self, index: usize, outcome: &CompressionOutcome) {
        JsonMessage::FileComplete {
            index,
            outcome: outcome.clone(),
        }
        .emit();
    }

    fn on_complete(&self, outcomes: &[CompressionOutcome], cancelled: bool) {
        JsonMessage::complete(outcomes, cancelled, self.started.elapsed().as_secs_f64()).emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressError;
    use crate::media::MediaKind;
    use crate::outcome::CompressionFailure;
    use std::time::Duration;

    fn progress(index: usize, percent: u8) -> BatchProgress {
        BatchProgress {
            index,
            total: 2,
            file_name: format!("file{}.jpg", index),
            percent,
        }
    }

    #[test]
    fn test_message_tags() {
        let json = JsonMessage::Runtime {
            state: RuntimeState::Loading,
        }
        .to_json_line()
        .unwrap();
        assert_eq!(json, r#"{"type":"runtime","state":"loading"}"#);

        let json: serde_json::Value =
            serde_json::from_str(&JsonMessage::progress(&progress(1, 40)).to_json_line().unwrap()).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["index"], 1);
        assert_eq!(json["percent"], 40);
    }

    #[test]
    fn test_file_start_emitted_once_per_file() {
        let observer = JsonProgress::new();
        assert_eq!(observer.messages_for(&progress(0, 0)).len(), 2);
        assert_eq!(observer.messages_for(&progress(0, 100)).len(), 1);
        let messages = observer.messages_for(&progress(1, 0));
        assert!(matches!(messages[0], JsonMessage::FileStart { index: 1, .. }));
    }

    #[test]
    fn test_complete_flattens_stats() {
        let err = CompressError::RuntimeUnavailable("offline".into());
        let outcomes = vec![CompressionOutcome::Failed(CompressionFailure::new(
            "clip.mp4",
            Some(MediaKind::Video),
            &err,
            Duration::ZERO,
        ))];

        let json: serde_json::Value =
            serde_json::from_str(&JsonMessage::complete(&outcomes, false, 1.5).to_json_line().unwrap()).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["errors"], 1);
        assert_eq!(json["cancelled"], false);
    }
}
