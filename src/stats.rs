//! # Statistics Module
//!
//! Statistiche di riduzione calcolate sulla lista dei risultati.
//!
//! ## Componenti principali:
//! - `BatchStats`: aggregati di un insieme di outcome (successi, errori, byte risparmiati)
//! - `ResultStore`: lista dei risultati accumulati tra più batch, con rimozione e reset
//! - `format_size()` / `calculate_reduction()`: utilità di formattazione e percentuali
//!
//! I byte risparmiati sono con segno: un file ricodificato può crescere e la
//! dimensione reale viene sempre riportata.

use crate::outcome::{CompressionOutcome, OutcomeId};
use serde::Serialize;

/// Aggregate statistics over a set of outcomes
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_compressed: usize,
    pub errors: usize,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
    pub bytes_saved: i64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcomes(outcomes: &[CompressionOutcome]) -> Self {
        let mut stats = Self::new();
        for outcome in outcomes {
            stats.add(outcome);
        }
        stats
    }

    pub fn add(&mut self, outcome: &CompressionOutcome) {
        self.files_processed += 1;
        match outcome {
            CompressionOutcome::Compressed(result) => {
                self.files_compressed += 1;
                self.total_original_size += result.original_size;
                self.total_compressed_size += result.compressed_size;
                self.bytes_saved += result.original_size as i64 - result.compressed_size as i64;
            }
            CompressionOutcome::Failed(_) => self.errors += 1,
        }
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        calculate_reduction(self.total_original_size, self.total_compressed_size)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Compressed: {} | Errors: {} | {} -> {} | Saved: {} ({:.2}%)",
            self.files_processed,
            self.files_compressed,
            self.errors,
            format_size(self.total_original_size),
            format_size(self.total_compressed_size),
            format_signed_size(self.bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

/// Outcomes accumulated across batches until explicitly cleared
#[derive(Debug, Default)]
pub struct ResultStore {
    outcomes: Vec<CompressionOutcome>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = CompressionOutcome>) {
        self.outcomes.extend(outcomes);
    }

    pub fn get(&self, id: OutcomeId) -> Option<&CompressionOutcome> {
        self.outcomes.iter().find(|o| o.id() == id)
    }

    pub fn remove(&mut self, id: OutcomeId) -> Option<CompressionOutcome> {
        let pos = self.outcomes.iter().position(|o| o.id() == id)?;
        Some(self.outcomes.remove(pos))
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    pub fn outcomes(&self) -> &[CompressionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats::from_outcomes(&self.outcomes)
    }
}

/// Get human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

fn format_signed_size(size: i64) -> String {
    if size < 0 {
        format!("-{}", format_size(size.unsigned_abs()))
    } else {
        format_size(size as u64)
    }
}

/// Calculate percentage reduction
pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        0.0
    } else {
        ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
    }
}
