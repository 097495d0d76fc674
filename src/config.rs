//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di compressione e del runtime
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `quality`: Qualità di compressione (50-100, default: 80)
//! - `audio_bitrate`: Bitrate audio dei video (default: "128k")
//! - `video_preset`: Preset x264 (default: "medium")
//! - `runtime_dir`: Directory con il binario ffmpeg (default: None = ricerca automatica)
//! - `ffmpeg_sha256`: Digest atteso del binario ffmpeg (default: None = nessun controllo)
//! - `output_path`: Directory di output dei file compressi (default: None = `./compressed`)
//! - `json_output`: Output JSON per uso programmatico (default: false)
//!
//! ## Validazione:
//! - Controlla che quality sia 50-100
//! - Controlla che audio_bitrate sia nella forma `<cifre>k`
//! - Controlla che video_preset sia un preset x264 valido
//! - Controlla che ffmpeg_sha256 sia di 64 caratteri esadecimali
//!
//! ## Esempio:
//! ```rust
//! use madacly::Config;
//!
//! let config = Config {
//!     quality: 70,
//!     video_preset: "slow".to_string(),
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//! ```

use crate::media::{DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY};
use crate::video_processor::TranscodeSettings;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Presets accepted by libx264
const X264_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

/// Configuration for batch compression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compression quality (50-100)
    pub quality: u8,
    /// Video audio bitrate
    pub audio_bitrate: String,
    /// x264 preset
    pub video_preset: String,
    /// Directory holding the ffmpeg runtime
    pub runtime_dir: Option<PathBuf>,
    /// Expected SHA-256 of the ffmpeg binary (hex)
    pub ffmpeg_sha256: Option<String>,
    /// Output directory for compressed files
    pub output_path: Option<PathBuf>,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            audio_bitrate: "128k".to_string(),
            video_preset: "medium".to_string(),
            runtime_dir: None,
            ffmpeg_sha256: None,
            output_path: None,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(anyhow::anyhow!(
                "Quality must be between {} and {}",
                MIN_QUALITY,
                MAX_QUALITY
            ));
        }

        let bitrate_digits = self.audio_bitrate.strip_suffix('k').unwrap_or_default();
        if bitrate_digits.is_empty() || !bitrate_digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow::anyhow!(
                "Audio bitrate must look like 128k, got {}",
                self.audio_bitrate
            ));
        }

        if !X264_PRESETS.contains(&self.video_preset.as_str()) {
            return Err(anyhow::anyhow!("Unknown video preset: {}", self.video_preset));
        }

        if let Some(ref digest) = self.ffmpeg_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(anyhow::anyhow!("ffmpeg_sha256 must be 64 hex characters"));
            }
        }

        if let Some(ref runtime_dir) = self.runtime_dir {
            if !runtime_dir.is_dir() {
                return Err(anyhow::anyhow!(
                    "Runtime directory does not exist: {}",
                    runtime_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Encoder settings for the video runtime
    pub fn transcode_settings(&self) -> TranscodeSettings {
        TranscodeSettings {
            preset: self.video_preset.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
        }
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
