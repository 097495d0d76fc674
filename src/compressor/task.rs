//! # Task Compressor Module
//!
//! Worker per la compressione di un singolo file del batch.
//! Classifica il file, lo invia all'adapter corretto e converte ogni errore
//! in un `CompressionFailure`: nessun errore per-file esce da qui.

use crate::compressor::progress_tracker::FileProgress;
use crate::error::CompressError;
use crate::image_processor::ImageCodec;
use crate::media::{InputFile, MediaKind, Quality};
use crate::outcome::{CompressedResult, CompressionFailure, CompressionOutcome, FailureKind};
use crate::runtime::RuntimeManager;
use crate::video_processor::VideoCodec;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Video runtime as seen by one batch
pub enum VideoRuntime<R> {
    Ready(Arc<R>),
    Unavailable(String),
}

/// Per-file dispatcher for one batch run
pub struct TaskCompressor<'a, R: VideoCodec> {
    image_codec: &'a dyn ImageCodec,
    runtime: &'a RuntimeManager<R>,
    video: VideoRuntime<R>,
    quality: Quality,
}

impl<'a, R: VideoCodec> TaskCompressor<'a, R> {
    pub fn new(
        image_codec: &'a dyn ImageCodec,
        runtime: &'a RuntimeManager<R>,
        video: VideoRuntime<R>,
        quality: Quality,
    ) -> Self {
        Self {
            image_codec,
            runtime,
            video,
            quality,
        }
    }

    /// Compresses one file. Always produces an outcome; the file's progress
    /// is closed at 100% whatever the result.
    pub async fn compress_file(&mut self, file: &InputFile, progress: &FileProgress<'_>) -> CompressionOutcome {
        let start_time = Instant::now();

        let kind = match file.kind() {
            Ok(kind) => kind,
            Err(err) => {
                warn!("Skipping {}: {}", file.name, err);
                progress.finish();
                return CompressionOutcome::Failed(CompressionFailure::new(
                    file.name.clone(),
                    None,
                    &err,
                    start_time.elapsed(),
                ));
            }
        };

        debug!("Compressing {} as {} ({} bytes)", file.name, kind, file.size());

        let result = match kind {
            MediaKind::Image => self.image_codec.compress(file, self.quality).await,
            MediaKind::Video => self.compress_video(file, progress).await,
        };
        progress.finish();

        let elapsed = start_time.elapsed();
        match result {
            Ok(data) => CompressionOutcome::Compressed(CompressedResult::new(
                file.name.clone(),
                kind,
                file.media_type.clone(),
                file.size(),
                data,
                elapsed,
            )),
            Err(err) => {
                warn!("Failed to compress {}: {}", file.name, err);
                CompressionOutcome::Failed(CompressionFailure::with_kind(
                    file.name.clone(),
                    Some(kind),
                    failure_kind_for(&err, kind),
                    &err,
                    elapsed,
                ))
            }
        }
    }

    async fn compress_video(&mut self, file: &InputFile, progress: &FileProgress<'_>) -> Result<Vec<u8>, CompressError> {
        let transcoder = match &self.video {
            VideoRuntime::Ready(transcoder) => Arc::clone(transcoder),
            VideoRuntime::Unavailable(reason) => return Err(CompressError::RuntimeUnavailable(reason.clone())),
        };

        let on_progress = |percent: u8| progress.report(percent);
        let result = transcoder.compress(file, self.quality, &on_progress).await;

        if let Err(err) = &result {
            if err.poisons_runtime() {
                self.runtime.mark_failed(err.to_string());
                self.video = VideoRuntime::Unavailable(format!("runtime lost while processing {}", file.name));
            }
        }

        result
    }
}

/// I/O errors come from the adapter's own scratch files
fn failure_kind_for(err: &CompressError, kind: MediaKind) -> FailureKind {
    match (err, kind) {
        (CompressError::Io(_), MediaKind::Image) => FailureKind::Decode,
        (CompressError::Io(_), MediaKind::Video) => FailureKind::Transcode,
        _ => err.failure_kind(),
    }
}
