//! # Progress Reporting Module
//!
//! Questo modulo definisce il modello di progresso del batch e gli osservatori.
//!
//! ## Responsabilità:
//! - `BatchProgress`: file corrente (indice 0-based), totale, nome, percentuale
//! - `ProgressObserver`: interfaccia push per ricevere eventi durante il batch
//! - `ProgressManager`: osservatore con progress bar `indicatif` per la CLI
//!
//! ## Semantica del progresso:
//! - Immagini: percentuale binaria (0 poi 100)
//! - Video: percentuale continua guidata da ffmpeg, sempre chiusa da un 100
//! - Dentro un file la percentuale non torna mai indietro
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [=========================>--------------] 2/3 clip.mp4 (64%)
//! ```

use crate::outcome::CompressionOutcome;
use crate::runtime::RuntimeState;
use crate::stats::format_size;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Snapshot of the file currently being compressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// 0-based position of the current file
    pub index: usize,
    pub total: usize,
    pub file_name: String,
    /// Percent complete of the current file (0..=100)
    pub percent: u8,
}

impl BatchProgress {
    pub fn is_file_complete(&self) -> bool {
        self.percent >= 100
    }
}

/// Push notifications emitted by the batch compressor.
///
/// Callbacks run on the batch's task and must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &BatchProgress);

    fn on_runtime_state(&self, _state: RuntimeState) {}

    fn on_outcome(&self, _index: usize, _outcome: &CompressionOutcome) {}

    fn on_complete(&self, _outcomes: &[CompressionOutcome], _cancelled: bool) {}
}

/// Terminal progress bar for batch compression
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressObserver for ProgressManager {
    fn on_progress(&self, progress: &BatchProgress) {
        self.bar
            .set_message(format!("{} ({}%)", progress.file_name, progress.percent));
    }

    fn on_runtime_state(&self, state: RuntimeState) {
        if state == RuntimeState::Loading {
            self.bar.set_message("⏳ Initializing video runtime...".to_string());
        }
    }

    fn on_outcome(&self, _index: usize, outcome: &CompressionOutcome) {
        self.bar.inc(1);
        match outcome {
            CompressionOutcome::Compressed(result) => self.bar.println(format!(
                "✅ {}: {} -> {} ({:.1}% saved)",
                result.file_name,
                format_size(result.original_size),
                format_size(result.compressed_size),
                result.reduction_percent()
            )),
            CompressionOutcome::Failed(failure) => {
                self.bar.println(format!("❌ {}: {}", failure.file_name, failure.error))
            }
        }
    }

    fn on_complete(&self, outcomes: &[CompressionOutcome], cancelled: bool) {
        self.finish(&completion_message(outcomes, cancelled));
    }
}

/// Short closing line for the bar; the savings summary is logged once by the caller
fn completion_message(outcomes: &[CompressionOutcome], cancelled: bool) -> String {
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    let status = if cancelled { "Cancelled" } else { "Done" };
    if failed > 0 {
        format!("{}: {} files, {} failed", status, outcomes.len(), failed)
    } else {
        format!("{}: {} files", status, outcomes.len())
    }
}
