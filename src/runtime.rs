//! # Runtime Lifecycle Module
//!
//! Questo modulo gestisce il ciclo di vita del runtime di transcodifica video,
//! costoso da inizializzare e condiviso da tutte le compressioni del processo.
//!
//! ## Responsabilità:
//! - Carica il runtime una sola volta e lo conserva fino alla fine del processo
//! - Fonde le chiamate concorrenti in un'unica inizializzazione in corso
//! - Espone lo stato (`NotLoaded`, `Loading`, `Ready`, `Failed`) per la UI/log
//! - Permette un nuovo tentativo dopo un fallimento
//! - Invalida il runtime se una transcodifica lo ha compromesso
//!
//! ## Coalescing:
//! Il caricamento in corso è una `Shared` future salvata nello slot interno.
//! Ogni chiamante di `ensure_ready()` ne attende un clone; il mutex non viene
//! mai tenuto attraverso un `.await`. Una generazione numerica impedisce a un
//! caricamento obsoleto di sovrascrivere lo stato dopo un `mark_failed()`.
//!
//! ## Loader di produzione:
//! `FfmpegLoader` risolve il binario ffmpeg, ne verifica opzionalmente lo
//! SHA-256 e controlla che supporti gli encoder `libx264` e `aac`.

use crate::error::RuntimeError;
use crate::tool_resolver::ToolPathResolver;
use crate::video_processor::{FfmpegTranscoder, TranscodeSettings};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Encoders the transcoder must provide
const REQUIRED_ENCODERS: &[&str] = &["libx264", "aac"];

/// Observable lifecycle state of the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeState {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotLoaded => "not loaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Produces a runtime handle. Called at most once per successful lifecycle.
#[async_trait]
pub trait RuntimeLoader: Send + Sync + 'static {
    type Runtime: Send + Sync + 'static;

    async fn load(&self) -> Result<Self::Runtime, RuntimeError>;
}

type PendingLoad<R> = Shared<BoxFuture<'static, Result<Arc<R>, RuntimeError>>>;

enum Slot<R> {
    NotLoaded,
    Loading { generation: u64, pending: PendingLoad<R> },
    Ready(Arc<R>),
    Failed(RuntimeError),
}

struct Inner<R> {
    slot: Slot<R>,
    generation: u64,
}

/// Lazily loads and caches the shared transcoder runtime
pub struct RuntimeManager<R: Send + Sync + 'static> {
    loader: Arc<dyn RuntimeLoader<Runtime = R>>,
    inner: Mutex<Inner<R>>,
    load_attempts: AtomicUsize,
}

impl<R: Send + Sync + 'static> RuntimeManager<R> {
    pub fn new(loader: Arc<dyn RuntimeLoader<Runtime = R>>) -> Self {
        Self {
            loader,
            inner: Mutex::new(Inner {
                slot: Slot::NotLoaded,
                generation: 0,
            }),
            load_attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the ready runtime, loading it if needed.
    ///
    /// Concurrent callers share one in-flight load. After a failure the next
    /// call starts a fresh attempt.
    pub async fn ensure_ready(&self) -> Result<Arc<R>, RuntimeError> {
        let (generation, pending) = {
            let mut inner = self.lock();
            let existing = match &inner.slot {
                Slot::Ready(runtime) => return Ok(Arc::clone(runtime)),
                Slot::Loading { generation, pending } => Some((*generation, pending.clone())),
                Slot::NotLoaded | Slot::Failed(_) => None,
            };
            match existing {
                Some(load) => load,
                None => self.start_load(&mut inner),
            }
        };

        let result = pending.await;
        self.settle(generation, &result);
        result
    }

    pub fn state(&self) -> RuntimeState {
        match self.lock().slot {
            Slot::NotLoaded => RuntimeState::NotLoaded,
            Slot::Loading { .. } => RuntimeState::Loading,
            Slot::Ready(_) => RuntimeState::Ready,
            Slot::Failed(_) => RuntimeState::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == RuntimeState::Ready
    }

    /// Number of loads actually started
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<RuntimeError> {
        match &self.lock().slot {
            Slot::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Drops a runtime that can no longer be trusted; the next
    /// `ensure_ready()` loads a new one.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut inner = self.lock();
        if matches!(inner.slot, Slot::Ready(_)) {
            error!("Video runtime marked as failed: {}", reason);
            inner.generation += 1;
            inner.slot = Slot::Failed(RuntimeError::Lost(reason));
        }
    }

    fn start_load(&self, inner: &mut Inner<R>) -> (u64, PendingLoad<R>) {
        inner.generation += 1;
        let generation = inner.generation;
        let attempt = self.load_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!("⏳ Initializing video runtime (attempt {})", attempt);

        let loader = Arc::clone(&self.loader);
        let pending = async move { loader.load().await.map(Arc::new) }.boxed().shared();

        inner.slot = Slot::Loading {
            generation,
            pending: pending.clone(),
        };
        (generation, pending)
    }

    fn settle(&self, generation: u64, result: &Result<Arc<R>, RuntimeError>) {
        let mut inner = self.lock();
        let current = matches!(inner.slot, Slot::Loading { generation: g, .. } if g == generation);
        if !current {
            return;
        }

        inner.slot = match result {
            Ok(runtime) => {
                info!("✅ Video runtime ready");
                Slot::Ready(Arc::clone(runtime))
            }
            Err(err) => {
                warn!("Video runtime failed to initialize: {}", err);
                Slot::Failed(err.clone())
            }
        };
    }

    fn lock(&self) -> MutexGuard<'_, Inner<R>> {
        // The slot is always left consistent, so a poisoned lock is still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RuntimeManager<FfmpegTranscoder> {
    /// Manager backed by the ffmpeg loader described by `config`
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(Arc::new(FfmpegLoader::from_config(config)))
    }
}

impl<R: Send + Sync + 'static> fmt::Debug for RuntimeManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeManager")
            .field("state", &self.state())
            .field("load_attempts", &self.load_attempts())
            .finish()
    }
}

/// Loads the ffmpeg-backed transcoder
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    resolver: ToolPathResolver,
    expected_sha256: Option<String>,
    settings: TranscodeSettings,
}

impl FfmpegLoader {
    pub fn new(resolver: ToolPathResolver, expected_sha256: Option<String>, settings: TranscodeSettings) -> Self {
        Self {
            resolver,
            expected_sha256: expected_sha256.map(|digest| digest.to_lowercase()),
            settings,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            ToolPathResolver::new(config.runtime_dir.as_deref()),
            config.ffmpeg_sha256.clone(),
            config.transcode_settings(),
        )
    }

    async fn verify_integrity(&self, binary: &Path) -> Result<(), RuntimeError> {
        let Some(expected) = &self.expected_sha256 else {
            return Ok(());
        };

        let bytes = tokio::fs::read(binary).await?;
        let actual = hex::encode(Sha256::digest(&bytes));
        if &actual != expected {
            return Err(RuntimeError::IntegrityMismatch {
                asset: binary.display().to_string(),
                expected: expected.clone(),
                actual,
            });
        }

        debug!("Integrity check passed for {}", binary.display());
        Ok(())
    }

    async fn probe(binary: &Path) -> Result<String, RuntimeError> {
        let version = run_probe(binary, &["-version"]).await?;
        let version = version
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| RuntimeError::Probe(format!("{} printed no version", binary.display())))?;

        let encoders = run_probe(binary, &["-hide_banner", "-encoders"]).await?;
        for encoder in REQUIRED_ENCODERS {
            let present = encoders
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(*encoder));
            if !present {
                return Err(RuntimeError::Probe(format!(
                    "{} lacks the {} encoder",
                    binary.display(),
                    encoder
                )));
            }
        }

        Ok(version)
    }
}

#[async_trait]
impl RuntimeLoader for FfmpegLoader {
    type Runtime = FfmpegTranscoder;

    async fn load(&self) -> Result<FfmpegTranscoder, RuntimeError> {
        let binary: PathBuf = self.resolver.resolve_tool("ffmpeg").ok_or_else(|| {
            RuntimeError::AssetNotFound(format!(
                "ffmpeg (searched {:?}); install with: {}",
                self.resolver.search_dirs(),
                ToolPathResolver::install_instructions("ffmpeg")
            ))
        })?;

        self.verify_integrity(&binary).await?;
        let version = Self::probe(&binary).await?;
        info!("Using {} ({})", version, binary.display());

        Ok(FfmpegTranscoder::new(binary, version, self.settings.clone()))
    }
}

async fn run_probe(binary: &Path, args: &[&str]) -> Result<String, RuntimeError> {
    let output = Command::new(binary)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RuntimeError::Probe(format!("cannot run {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(RuntimeError::Probe(format!(
            "{} {} exited with {}",
            binary.display(),
            args.join(" "),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
