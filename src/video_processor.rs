//! # Video Processing Module
//!
//! Questo modulo gestisce la ricompressione dei video supportati tramite il
//! runtime ffmpeg condiviso.
//!
//! ## Responsabilità:
//! - Definisce il contratto `VideoCodec` (compressione con callback di progresso)
//! - Implementa `FfmpegTranscoder`, l'handle del runtime caricato una sola volta
//! - Mappa la qualità (50-100) su un CRF x264 con funzione fissa e monotona
//! - Interpreta l'output `-progress` di ffmpeg per il progresso continuo
//!
//! ## Formati supportati:
//! - **Input**: MP4 (`video/mp4`), MOV (`video/quicktime`)
//! - **Output**: stesso container dell'input (H.264 + AAC)
//!
//! ## Pipeline di compressione:
//! 1. Scrive il payload in una directory temporanea
//! 2. Esegue ffmpeg con:
//!    - Codec video: libx264, preset configurabile (default `medium`)
//!    - CRF: derivato dalla qualità
//!    - Codec audio: AAC, bitrate configurabile (default 128k)
//!    - `-movflags +faststart` per riproduzione progressiva
//! 3. Legge il risultato e ripulisce la directory temporanea
//!
//! ## Mapping qualità → CRF:
//! - 100 → 18 (visualmente lossless)
//! - 80 → 25 (default, bilanciato)
//! - 50 → 35 (file piccoli)
//!
//! ## Progresso:
//! - Durata totale letta dalla riga `Duration:` dell'input
//! - Posizione letta da `out_time_us=` / `out_time_ms=` (microsecondi)
//! - Callback solo quando la percentuale intera cambia; nessuna garanzia
//!   sul numero di callback né sul 100% finale
//!
//! ## Errori:
//! - Exit code non zero o output vuoto: `Transcode` (il runtime resta valido)
//! - Binario sparito o processo terminato da segnale: `Transcode` con
//!   `runtime_lost`, il runtime va marcato come fallito

use crate::error::CompressError;
use crate::media::{InputFile, Quality};
use crate::utils::{to_string_vec, LineTail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Lines of transcoder stderr kept for error reports
const STDERR_TAIL_LINES: usize = 12;

/// Video re-encoder contract
#[async_trait]
pub trait VideoCodec: Send + Sync + 'static {
    /// Re-encodes `file` at `quality`, reporting best-effort progress (0..=100).
    async fn compress(
        &self,
        file: &InputFile,
        quality: Quality,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<Vec<u8>, CompressError>;
}

/// Encoder settings that do not depend on the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeSettings {
    pub preset: String,
    pub audio_bitrate: String,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

/// Loaded ffmpeg runtime; one instance is shared by every video compression
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    version: String,
    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: PathBuf, version: String, settings: TranscodeSettings) -> Self {
        Self {
            ffmpeg,
            version,
            settings,
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fixed monotonic quality → CRF mapping: 50 → 35, 80 → 25, 100 → 18
    pub fn crf_for_quality(quality: Quality) -> u8 {
        let steps = u32::from(quality.value() - crate::media::MIN_QUALITY);
        (35 - (steps * 17 + 25) / 50) as u8
    }

    /// Container extension preserved from the input media type
    pub fn container_extension(media_type: &str) -> &'static str {
        if media_type.to_lowercase().starts_with("video/quicktime") {
            "mov"
        } else {
            "mp4"
        }
    }

    pub fn build_args(&self, input: &Path, output: &Path, quality: Quality) -> Vec<String> {
        let crf = Self::crf_for_quality(quality).to_string();
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();

        to_string_vec([
            "-hide_banner",
            "-nostdin",
            "-y",
            "-i", &input,
            "-c:v", "libx264",
            "-preset", &self.settings.preset,
            "-crf", &crf,
            "-pix_fmt", "yuv420p",
            "-c:a", "aac",
            "-b:a", &self.settings.audio_bitrate,
            "-movflags", "+faststart",
            "-progress", "pipe:2",
            "-nostats",
            &output,
        ])
    }
}

#[async_trait]
impl VideoCodec for FfmpegTranscoder {
    async fn compress(
        &self,
        file: &InputFile,
        quality: Quality,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<Vec<u8>, CompressError> {
        let ext = Self::container_extension(&file.media_type);
        let workdir = tempfile::Builder::new().prefix("madacly-").tempdir()?;
        let input_path = workdir.path().join(format!("input.{}", ext));
        let output_path = workdir.path().join(format!("output.{}", ext));

        tokio::fs::write(&input_path, &file.data[..]).await?;

        let args = self.build_args(&input_path, &output_path, quality);
        debug!("Running {} {}", self.ffmpeg.display(), args.join(" "));

        let start_time = Instant::now();
        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CompressError::runtime_lost(format!("ffmpeg missing at {}", self.ffmpeg.display()))
                } else {
                    CompressError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CompressError::transcode("ffmpeg stderr was not captured"))?;
        let mut reader = BufReader::new(stderr);
        let mut parser = ProgressParser::default();
        let mut tail = LineTail::new(STDERR_TAIL_LINES);
        let mut buf = Vec::new();

        // Metadata in stderr is not guaranteed to be UTF-8
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if let Some(percent) = parser.feed(&line) {
                on_progress(percent);
            } else if !is_progress_line(&line) {
                tail.push(&line);
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(match status.code() {
                Some(code) => CompressError::transcode(format!(
                    "ffmpeg exited with code {} for {}: {}",
                    code,
                    file.name,
                    tail.joined()
                )),
                None => CompressError::runtime_lost(format!(
                    "ffmpeg terminated by signal while processing {}",
                    file.name
                )),
            });
        }

        let data = tokio::fs::read(&output_path).await?;
        if data.is_empty() {
            return Err(CompressError::transcode(format!("ffmpeg produced no output for {}", file.name)));
        }

        info!(
            "Video {} transcoded in {:.1}s ({} -> {} bytes)",
            file.name,
            start_time.elapsed().as_secs_f64(),
            file.size(),
            data.len()
        );

        Ok(data)
    }
}

/// Incremental parser of ffmpeg stderr with `-progress pipe:2`
#[derive(Debug, Default)]
pub struct ProgressParser {
    duration_us: Option<u64>,
    last_percent: Option<u8>,
}

impl ProgressParser {
    /// Feeds one stderr line; returns a percentage when it changed.
    pub fn feed(&mut self, line: &str) -> Option<u8> {
        let line = line.trim();

        if self.duration_us.is_none() {
            if let Some(duration) = parse_duration_line(line) {
                self.duration_us = Some(duration);
                return None;
            }
        }

        let percent = if line == "progress=end" {
            100
        } else {
            let position = line
                .strip_prefix("out_time_us=")
                .or_else(|| line.strip_prefix("out_time_ms="))?
                .parse::<u64>()
                .ok()?;
            let duration = self.duration_us.filter(|d| *d > 0)?;
            (position.saturating_mul(100) / duration).min(100) as u8
        };

        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent)
    }

    pub fn duration_us(&self) -> Option<u64> {
        self.duration_us
    }
}

/// Parses `Duration: HH:MM:SS.cc, ...` into microseconds
fn parse_duration_line(line: &str) -> Option<u64> {
    let rest = line.strip_prefix("Duration:")?.trim_start();
    let timestamp = rest.split(',').next()?.trim();

    let mut parts = timestamp.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let total_seconds = (hours * 3600 + minutes * 60) as f64 + seconds;
    Some((total_seconds * 1_000_000.0).round() as u64)
}

/// `key=value` lines emitted by `-progress`
fn is_progress_line(line: &str) -> bool {
    line.split_once('=')
        .map(|(key, _)| !key.is_empty() && !key.contains(char::is_whitespace))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcoder() -> FfmpegTranscoder {
        FfmpegTranscoder::new(PathBuf::from("ffmpeg"), "test".into(), TranscodeSettings::default())
    }

    #[test]
    fn test_crf_mapping_endpoints() {
        assert_eq!(FfmpegTranscoder::crf_for_quality(Quality::new(50).unwrap()), 35);
        assert_eq!(FfmpegTranscoder::crf_for_quality(Quality::new(80).unwrap()), 25);
        assert_eq!(FfmpegTranscoder::crf_for_quality(Quality::new(100).unwrap()), 18);
    }

    #[test]
    fn test_crf_mapping_is_monotonic() {
        let mut previous = u8::MAX;
        for q in 50..=100 {
            let crf = FfmpegTranscoder::crf_for_quality(Quality::new(q).unwrap());
            assert!(crf <= previous, "crf must not increase with quality (q={})", q);
            previous = crf;
        }
    }

    #[test]
    fn test_container_extension() {
        assert_eq!(FfmpegTranscoder::container_extension("video/quicktime"), "mov");
        assert_eq!(FfmpegTranscoder::container_extension("video/mp4"), "mp4");
    }

    #[test]
    fn test_build_args() {
        let args = transcoder().build_args(Path::new("/tmp/in.mp4"), Path::new("/tmp/out.mp4"), Quality::new(80).unwrap());

        let crf_pos = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf_pos + 1], "25");
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input_pos + 1], "/tmp/in.mp4");
        assert!(args.windows(2).any(|w| w[0] == "-preset" && w[1] == "medium"));
        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "128k"));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    #[test]
    fn test_parse_duration_line() {
        assert_eq!(
            parse_duration_line("Duration: 00:01:02.50, start: 0.000000, bitrate: 1205 kb/s"),
            Some(62_500_000)
        );
        assert_eq!(parse_duration_line("Duration: N/A, bitrate: N/A"), None);
        assert_eq!(parse_duration_line("Stream #0:0: Video: h264"), None);
    }

    #[test]
    fn test_progress_parser_sequence() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.feed("  Duration: 00:00:10.00, start: 0.000000, bitrate: 900 kb/s"), None);
        assert_eq!(parser.duration_us(), Some(10_000_000));
        assert_eq!(parser.feed("frame=10"), None);
        assert_eq!(parser.feed("out_time_us=2500000"), Some(25));
        assert_eq!(parser.feed("out_time_ms=2500000"), None);
        assert_eq!(parser.feed("out_time_us=N/A"), None);
        assert_eq!(parser.feed("out_time_us=20000000"), Some(100));
        assert_eq!(parser.feed("progress=end"), None);
    }

    #[test]
    fn test_progress_parser_without_duration() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.feed("out_time_us=5000000"), None);
        assert_eq!(parser.feed("progress=end"), Some(100));
    }

    #[test]
    fn test_is_progress_line() {
        assert!(is_progress_line("bitrate=N/A"));
        assert!(is_progress_line("progress=continue"));
        assert!(!is_progress_line("Invalid data found when processing input"));
        assert!(!is_progress_line("Press [q] to stop, [?] for help"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compress_with_fake_ffmpeg() {
        use std::sync::Mutex;

        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = crate::test_support::write_fake_ffmpeg(dir.path());
        let transcoder = FfmpegTranscoder::new(ffmpeg, "fake".into(), TranscodeSettings::default());

        let file = InputFile::new("clip.mp4", "video/mp4", vec![7u8; 1000]);
        let seen = Mutex::new(Vec::new());
        let on_progress = |p: u8| seen.lock().unwrap().push(p);

        let output = transcoder
            .compress(&file, Quality::new(80).unwrap(), &on_progress)
            .await
            .unwrap();

        assert_eq!(output.len(), 64);
        assert_eq!(*seen.lock().unwrap(), vec![25, 50, 100]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_same_input_transcodes_to_same_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = crate::test_support::write_fake_ffmpeg(dir.path());
        let transcoder = FfmpegTranscoder::new(ffmpeg, "fake".into(), TranscodeSettings::default());

        let payload: Vec<u8> = (0..512u32).map(|i| (i * 31 % 251) as u8).collect();
        let file = InputFile::new("clip.mov", "video/quicktime", payload);
        let quality = Quality::new(65).unwrap();

        let first = transcoder.compress(&file, quality, &|_| {}).await.unwrap();
        let second = transcoder.compress(&file, quality, &|_| {}).await.unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_corrupt_video_is_transcode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = crate::test_support::write_fake_ffmpeg(dir.path());
        let transcoder = FfmpegTranscoder::new(ffmpeg, "fake".into(), TranscodeSettings::default());

        let file = InputFile::new("bad.mov", "video/quicktime", b"CORRUPT container".to_vec());
        let err = transcoder
            .compress(&file, Quality::new(80).unwrap(), &|_| {})
            .await
            .unwrap_err();

        assert!(!err.poisons_runtime());
        assert!(err.to_string().contains("Invalid data found"));
    }

    #[tokio::test]
    async fn test_missing_binary_loses_runtime() {
        let transcoder = FfmpegTranscoder::new(
            PathBuf::from("/nonexistent/madacly/ffmpeg"),
            "gone".into(),
            TranscodeSettings::default(),
        );
        let file = InputFile::new("clip.mp4", "video/mp4", vec![0u8; 10]);
        let err = transcoder
            .compress(&file, Quality::new(80).unwrap(), &|_| {})
            .await
            .unwrap_err();
        assert!(err.poisons_runtime());
    }
}
