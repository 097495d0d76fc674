//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file per la CLI: la pipeline di
//! compressione lavora solo in memoria.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file media in directory
//! - Deduzione del media type dall'estensione
//! - Caricamento di un file come `InputFile`
//! - Calcolo dei path di output (`OutputLayout`) e salvataggio dei risultati
//!
//! ## Path di output:
//! ```text
//! Input:  ~/trip (directory)  ->  ~/trip/day1/IMG_001.jpg
//! Output: ./compressed/day1/IMG_001.jpg
//! ```
//! Due input con lo stesso path relativo ricevono un suffisso ` (1)`, ` (2)`...
//! e un file sorgente non viene mai sovrascritto.
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG, WebP
//! - **Video**: MP4, MOV
//!
//! ## Esempio:
//! ```rust,no_run
//! use madacly::file_manager::FileManager;
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let sources = FileManager::collect_inputs(&[Path::new("/path/to/media").to_path_buf()])?;
//! for source in sources {
//!     let input = FileManager::load_input_file(&source.path).await?;
//!     println!("{} -> {} ({})", input.name, source.relative.display(), input.media_type);
//! }
//! # Ok(())
//! # }
//! ```

use crate::media::InputFile;
use crate::outcome::CompressedResult;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// A file found on disk and where its result goes, relative to the output
/// directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub path: PathBuf,
    pub relative: PathBuf,
}

impl MediaSource {
    /// Source saved under its bare file name
    pub fn file(path: PathBuf) -> Self {
        let relative = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.clone());
        Self { path, relative }
    }

    /// Source found while walking `base`; keeps its sub-directories
    pub fn within(path: PathBuf, base: &Path) -> Self {
        match path.strip_prefix(base) {
            Ok(rel) if !rel.as_os_str().is_empty() => {
                let relative = rel.to_path_buf();
                Self { path, relative }
            }
            _ => Self::file(path),
        }
    }
}

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Media type declared for a path, from its extension
    pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            "mp4" => Some("video/mp4"),
            "mov" => Some("video/quicktime"),
            _ => None,
        }
    }

    /// Check if a file format is supported
    pub fn is_supported_format(path: &Path) -> bool {
        Self::media_type_for_path(path).is_some()
    }

    /// Find all supported media files in a directory, in a stable order
    pub fn find_media_files(media_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(media_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if Self::is_supported_format(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Expand CLI inputs: files are kept as given (even unsupported ones, so
    /// they surface as failures), directories are walked.
    pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<MediaSource>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                files.extend(
                    Self::find_media_files(input)?
                        .into_iter()
                        .map(|path| MediaSource::within(path, input)),
                );
            } else if input.is_file() {
                files.push(MediaSource::file(input.clone()));
            } else {
                return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
            }
        }
        Ok(files)
    }

    /// Read a file into an `InputFile`; unknown extensions get
    /// `application/octet-stream`
    pub async fn load_input_file(path: &Path) -> Result<InputFile> {
        let data = fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = Self::media_type_for_path(path).unwrap_or("application/octet-stream");

        debug!("Loaded {} ({} bytes, {})", name, data.len(), media_type);
        Ok(InputFile::new(name, media_type, data))
    }

    /// Write a compressed result to `output_path`, creating parent directories
    pub async fn save_result(result: &CompressedResult, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(output_path, &result.data)
            .await
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        debug!("Saved {} -> {}", result.file_name, output_path.display());
        Ok(())
    }
}

/// Hands out output paths for one run: no two results share a path and no
/// source file is ever a destination.
#[derive(Debug)]
pub struct OutputLayout {
    output_dir: PathBuf,
    sources: HashSet<PathBuf>,
    claimed: HashSet<PathBuf>,
}

impl OutputLayout {
    pub fn new(output_dir: impl Into<PathBuf>, sources: &[MediaSource]) -> Self {
        let sources = sources
            .iter()
            .filter_map(|source| source.path.canonicalize().ok())
            .collect();
        Self {
            output_dir: output_dir.into(),
            sources,
            claimed: HashSet::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output path for `relative`; clashes get a ` (n)` suffix before the extension
    pub fn claim(&mut self, relative: &Path) -> PathBuf {
        let base = self.output_dir.join(relative);
        let mut candidate = base.clone();
        let mut attempt = 0;

        while self.is_taken(&candidate) {
            attempt += 1;
            candidate = with_suffix(&base, attempt);
        }

        if attempt > 0 {
            debug!("{} already taken, using {}", base.display(), candidate.display());
        }
        self.claimed.insert(candidate.clone());
        candidate
    }

    fn is_taken(&self, candidate: &Path) -> bool {
        if self.claimed.contains(candidate) {
            return true;
        }
        candidate
            .canonicalize()
            .map(|path| self.sources.contains(&path))
            .unwrap_or(false)
    }
}

fn with_suffix(path: &Path, attempt: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, attempt, ext.to_string_lossy()),
        None => format!("{} ({})", stem, attempt),
    };
    path.with_file_name(name)
}
