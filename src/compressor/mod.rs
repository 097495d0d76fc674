//! # Compressor Module
//!
//! Pipeline di compressione separata in sottomoduli:
//! - `batch`: Orchestratore del batch (validazione, runtime, ordine, cancellazione)
//! - `task`: Worker per singoli file (classificazione e dispatch agli adapter)
//! - `progress_tracker`: Pubblicazione e normalizzazione del progresso

pub mod batch;
pub mod progress_tracker;
pub mod task;

pub use batch::{BatchCompressor, BatchRun};
pub use progress_tracker::{FileProgress, ProgressTracker};
pub use task::{TaskCompressor, VideoRuntime};
