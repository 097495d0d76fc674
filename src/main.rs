//! # Madacly - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e override dai flag
//! - Avvio del batch con cancellazione (Ctrl-C) e timeout opzionale
//! - Salvataggio dei file compressi e riepilogo finale
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, quality, output, runtime, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica i file in ingresso (file singoli o directory)
//! 4. Comprime il batch riportando il progresso (barra o JSON)
//! 5. Scrive i risultati nella directory di output
//!
//! ## Esempio di utilizzo:
//! ```bash
//! madacly ~/Pictures/trip clip.mov --quality 70 --output ./small --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use madacly::file_manager::{FileManager, OutputLayout};
use madacly::json_output::{JsonMessage, JsonProgress};
use madacly::progress::ProgressManager;
use madacly::stats::format_size;
use madacly::{BatchCompressor, CompressionOutcome, Config, ImageProcessor, ProgressObserver, ResultStore, RuntimeManager};

/// Default directory for compressed files
const DEFAULT_OUTPUT_DIR: &str = "compressed";

#[derive(Parser)]
#[command(name = "madacly")]
#[command(about = "Compress images and videos on this machine and report the savings")]
struct Args {
    /// Files or directories to compress
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Compression quality (50-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(50..=100))]
    quality: Option<u8>,

    /// Output directory for compressed files [default: ./compressed]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing the ffmpeg runtime
    #[arg(long)]
    runtime_dir: Option<PathBuf>,

    /// Output progress and status as JSON lines
    #[arg(long)]
    json: bool,

    /// Abort the batch after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; JSON mode keeps stdout for events
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let writer = if args.json {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let json = args.json;
    let result = run(args).await;
    if let Err(ref e) = result {
        if json {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|cause| cause.to_string())).emit();
        }
    }
    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if args.output.is_some() {
        config.output_path = args.output.clone();
    }
    if args.runtime_dir.is_some() {
        config.runtime_dir = args.runtime_dir.clone();
    }
    config.json_output |= args.json;
    config.validate()?;

    let output_dir = config
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let sources = FileManager::collect_inputs(&args.inputs)?;
    let mut files = Vec::with_capacity(sources.len());
    for source in &sources {
        files.push(FileManager::load_input_file(&source.path).await?);
    }

    if config.json_output {
        JsonMessage::start(files.len(), config.quality, Some(output_dir.clone())).emit();
    } else {
        info!("Compressing {} files into {}", files.len(), output_dir.display());
    }

    if files.is_empty() {
        if config.json_output {
            JsonMessage::complete(&[], false, 0.0).emit();
        } else {
            info!("No media files found to process");
        }
        return Ok(());
    }

    let observer: Arc<dyn ProgressObserver> = if config.json_output {
        Arc::new(JsonProgress::new())
    } else {
        Arc::new(ProgressManager::new(files.len() as u64))
    };

    let runtime = Arc::new(RuntimeManager::from_config(&config));
    let compressor = BatchCompressor::new(Arc::new(ImageProcessor::new()), runtime).with_observer(observer);

    // Ctrl-C stops the batch before the next file
    let (stop_tx, stop_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current file");
            let _ = stop_tx.send(());
        }
    });

    let batch = compressor.compress_with_cancellation(&files, config.quality, stop_rx);
    let batch_run = match args.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), batch)
            .await
            .map_err(|_| anyhow::anyhow!("Batch timed out after {}s", secs))??,
        None => batch.await?,
    };

    // Outcomes follow input order, so they line up with `sources`
    let mut layout = OutputLayout::new(&output_dir, &sources);
    let mut store = ResultStore::new();
    store.extend(batch_run.outcomes);
    let processed = store.len();

    let mut unsaved = Vec::new();
    for (outcome, source) in store.outcomes().iter().zip(&sources) {
        if let CompressionOutcome::Compressed(result) = outcome {
            let path = layout.claim(&source.relative);
            match FileManager::save_result(result, &path).await {
                Ok(()) => info!(
                    "Saved {} ({} -> {})",
                    path.display(),
                    format_size(result.original_size),
                    format_size(result.compressed_size)
                ),
                Err(e) => {
                    error!("Failed to save {}: {:#}", result.file_name, e);
                    if config.json_output {
                        JsonMessage::error(format!("Failed to save {}", result.file_name), Some(format!("{:#}", e)))
                            .emit();
                    }
                    unsaved.push(outcome.id());
                }
            }
        }
    }

    // Savings only count files that actually reached the output directory
    for id in &unsaved {
        store.remove(*id);
    }

    if !config.json_output {
        info!("📊 {}", store.stats().format_summary());
        if !unsaved.is_empty() {
            warn!("{} compressed files could not be saved", unsaved.len());
        }
        if batch_run.cancelled {
            warn!("Batch cancelled: {} of {} files processed", processed, files.len());
        }
    }

    Ok(())
}
