//! # Madacly Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di compressione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `media`: Tipi di input (file, classificazione, qualità)
//! - `outcome`: Risultati per-file (successo o fallimento)
//! - `error`: Tipi di errore della pipeline e del runtime
//! - `image_processor`: Ricodifica immagini (JPEG/PNG/WebP)
//! - `video_processor`: Ricodifica video (MP4/MOV) tramite ffmpeg
//! - `runtime`: Ciclo di vita del runtime video condiviso
//! - `tool_resolver`: Ricerca del binario del runtime
//! - `compressor`: Orchestratore del batch
//! - `progress` / `json_output`: Progresso del batch e osservatori
//! - `stats`: Statistiche di riduzione e lista dei risultati
//! - `config` / `file_manager`: Configurazione e I/O per la CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use madacly::{BatchCompressor, Config, ImageProcessor, InputFile, RuntimeManager};
//! use std::sync::Arc;
//!
//! # async fn run(bytes: Vec<u8>) -> Result<(), madacly::CompressError> {
//! let runtime = Arc::new(RuntimeManager::from_config(&Config::default()));
//! let compressor = BatchCompressor::new(Arc::new(ImageProcessor::new()), runtime);
//!
//! let files = vec![InputFile::new("holiday.jpg", "image/jpeg", bytes)];
//! let outcomes = compressor.compress(&files, 80).await?;
//! # Ok(())
//! # }
//! ```

pub mod compressor;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod media;
pub mod outcome;
pub mod progress;
pub mod runtime;
pub mod stats;
pub mod tool_resolver;
pub mod utils;
pub mod video_processor;

#[cfg(all(test, unix))]
mod test_support;

pub use compressor::{BatchCompressor, BatchRun};
pub use config::Config;
pub use error::{CompressError, RuntimeError};
pub use image_processor::{ImageCodec, ImageProcessor};
pub use media::{InputFile, MediaKind, Quality};
pub use outcome::{CompressedResult, CompressionFailure, CompressionOutcome, FailureKind, OutcomeId};
pub use progress::{BatchProgress, ProgressObserver};
pub use runtime::{FfmpegLoader, RuntimeLoader, RuntimeManager, RuntimeState};
pub use stats::{BatchStats, ResultStore};
pub use video_processor::{FfmpegTranscoder, VideoCodec};
