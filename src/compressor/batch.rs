//! # Batch Compressor
//!
//! Orchestratore del batch: valida la qualità, prepara il runtime video una
//! sola volta e processa i file in ordine, uno alla volta.
//!
//! Più batch sullo stesso compressore vengono eseguiti uno dopo l'altro:
//! il canale di progresso descrive sempre un solo file corrente.

use crate::compressor::progress_tracker::ProgressTracker;
use crate::compressor::task::{TaskCompressor, VideoRuntime};
use crate::error::CompressError;
use crate::image_processor::ImageCodec;
use crate::media::{InputFile, MediaKind, Quality};
use crate::outcome::CompressionOutcome;
use crate::progress::{BatchProgress, ProgressObserver};
use crate::runtime::{RuntimeManager, RuntimeState};
use crate::stats::BatchStats;
use crate::video_processor::VideoCodec;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::{watch, Mutex};
use tracing::{error, info};

/// Result of a batch that may have been cancelled
#[derive(Debug, Clone)]
pub struct BatchRun {
    /// Outcomes in submission order; files never started are absent
    pub outcomes: Vec<CompressionOutcome>,
    pub cancelled: bool,
}

/// Sequential batch compressor
pub struct BatchCompressor<R: VideoCodec> {
    image_codec: Arc<dyn ImageCodec>,
    runtime: Arc<RuntimeManager<R>>,
    tracker: ProgressTracker,
    /// Held for a whole run so batches never share the progress stream
    run_lock: Mutex<()>,
}

impl<R: VideoCodec> BatchCompressor<R> {
    pub fn new(image_codec: Arc<dyn ImageCodec>, runtime: Arc<RuntimeManager<R>>) -> Self {
        Self {
            image_codec,
            runtime,
            tracker: ProgressTracker::new(),
            run_lock: Mutex::new(()),
        }
    }

    /// Registers a push observer for progress and outcomes
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.tracker.add_observer(observer);
        self
    }

    /// Polling view of the current file; `None` outside a batch
    pub fn progress(&self) -> watch::Receiver<Option<BatchProgress>> {
        self.tracker.subscribe()
    }

    pub fn runtime(&self) -> &Arc<RuntimeManager<R>> {
        &self.runtime
    }

    /// Compresses `files` in order. Only an out-of-range quality fails the
    /// whole call; every per-file problem becomes a `CompressionFailure`.
    pub async fn compress(&self, files: &[InputFile], quality: u8) -> Result<Vec<CompressionOutcome>, CompressError> {
        let run = self.run(files, quality, None).await?;
        Ok(run.outcomes)
    }

    /// Like `compress`, but stops before the next file once `stop` fires.
    /// The file in flight finishes and its outcome is kept.
    pub async fn compress_with_cancellation(
        &self,
        files: &[InputFile],
        quality: u8,
        mut stop: broadcast::Receiver<()>,
    ) -> Result<BatchRun, CompressError> {
        self.run(files, quality, Some(&mut stop)).await
    }

    async fn run(
        &self,
        files: &[InputFile],
        quality: u8,
        mut stop: Option<&mut broadcast::Receiver<()>>,
    ) -> Result<BatchRun, CompressError> {
        let quality = Quality::new(quality)?;
        let _running = self.run_lock.lock().await;

        if files.is_empty() {
            self.tracker.complete(&[], false);
            return Ok(BatchRun {
                outcomes: Vec::new(),
                cancelled: false,
            });
        }

        let start_time = Instant::now();
        info!("🚀 Compressing {} files (quality: {})", files.len(), quality);

        let needs_video = files
            .iter()
            .any(|file| matches!(file.kind(), Ok(MediaKind::Video)));
        let video = if needs_video {
            self.prepare_video_runtime().await
        } else {
            VideoRuntime::Unavailable("video runtime not requested".to_string())
        };

        let mut task = TaskCompressor::new(self.image_codec.as_ref(), self.runtime.as_ref(), video, quality);
        let mut outcomes = Vec::with_capacity(files.len());
        let mut cancelled = false;

        for (index, file) in files.iter().enumerate() {
            if should_stop(&mut stop) {
                info!("Cancellation requested, {} files left unprocessed", files.len() - index);
                cancelled = true;
                break;
            }

            let progress = self.tracker.start_file(index, files.len(), &file.name);
            let outcome = task.compress_file(file, &progress).await;
            drop(progress);

            self.tracker.outcome(index, &outcome);
            outcomes.push(outcome);
        }

        self.tracker.complete(&outcomes, cancelled);

        info!(
            "Batch finished in {:.1}s: {}",
            start_time.elapsed().as_secs_f64(),
            BatchStats::from_outcomes(&outcomes).format_summary()
        );

        Ok(BatchRun { outcomes, cancelled })
    }

    async fn prepare_video_runtime(&self) -> VideoRuntime<R> {
        if !self.runtime.is_ready() {
            self.tracker.runtime_state(RuntimeState::Loading);
        }

        match self.runtime.ensure_ready().await {
            Ok(transcoder) => {
                self.tracker.runtime_state(RuntimeState::Ready);
                VideoRuntime::Ready(transcoder)
            }
            Err(err) => {
                error!("Video runtime unavailable, videos in this batch will fail: {}", err);
                self.tracker.runtime_state(RuntimeState::Failed);
                VideoRuntime::Unavailable(err.to_string())
            }
        }
    }
}

/// Checks the stop channel without waiting
fn should_stop(stop: &mut Option<&mut broadcast::Receiver<()>>) -> bool {
    match stop {
        Some(receiver) => matches!(receiver.try_recv(), Ok(()) | Err(TryRecvError::Lagged(_))),
        None => false,
    }
}
