//! # Progress Tracking Module
//!
//! Pubblica il `BatchProgress` del batch in corso in due modi:
//! - polling, tramite un canale `tokio::sync::watch` (`None` fuori da un batch)
//! - push, tramite gli `ProgressObserver` registrati
//!
//! Normalizza il progresso degli adapter: dentro un file la percentuale non
//! scende mai e l'ultimo evento di ogni file è sempre 100.

use crate::outcome::CompressionOutcome;
use crate::progress::{BatchProgress, ProgressObserver};
use crate::runtime::RuntimeState;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Fan-out point for batch progress
pub struct ProgressTracker {
    sender: watch::Sender<Option<BatchProgress>>,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BatchProgress>> {
        self.sender.subscribe()
    }

    /// Latest published snapshot
    pub fn current(&self) -> Option<BatchProgress> {
        self.sender.borrow().clone()
    }

    /// Marks `file_name` as the current file and publishes 0%
    pub fn start_file(&self, index: usize, total: usize, file_name: &str) -> FileProgress<'_> {
        let file = FileProgress {
            tracker: self,
            index,
            total,
            file_name: file_name.to_string(),
            percent: AtomicU8::new(0),
        };
        file.publish(0);
        file
    }

    pub fn runtime_state(&self, state: RuntimeState) {
        for observer in &self.observers {
            observer.on_runtime_state(state);
        }
    }

    pub fn outcome(&self, index: usize, outcome: &CompressionOutcome) {
        for observer in &self.observers {
            observer.on_outcome(index, outcome);
        }
    }

    /// Clears the current snapshot and notifies completion
    pub fn complete(&self, outcomes: &[CompressionOutcome], cancelled: bool) {
        self.sender.send_replace(None);
        for observer in &self.observers {
            observer.on_complete(outcomes, cancelled);
        }
    }

    fn publish(&self, progress: BatchProgress) {
        self.sender.send_replace(Some(progress.clone()));
        for observer in &self.observers {
            observer.on_progress(&progress);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress of the file currently being compressed
pub struct FileProgress<'a> {
    tracker: &'a ProgressTracker,
    index: usize,
    total: usize,
    file_name: String,
    percent: AtomicU8,
}

impl FileProgress<'_> {
    /// Reports an adapter percentage. Values above 100 are capped and
    /// regressions are dropped.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.percent.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            self.publish(percent);
        }
    }

    /// Forces the final 100% for this file
    pub fn finish(&self) {
        self.report(100);
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    fn publish(&self, percent: u8) {
        self.tracker.publish(BatchProgress {
            index: self.index,
            total: self.total,
            file_name: self.file_name.clone(),
            percent,
        });
    }
}
