use super::backend::{builtin, PlaybackBackend, DEFAULT_BACKEND_ORDER};
use super::target::{
    default_desktop_dir, is_cross_environment_path, to_windows_path, DeliveryTargetResolver,
    HostResolver, TargetLocation,
};
use crate::utils::now_ms;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to write audio file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown playback backend: {0}")]
    UnknownBackend(String),
}

/// Outcome of one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Final location of the audio file (the copy, if one was made)
    pub path: PathBuf,
    pub played: bool,
    pub backend: Option<String>,
    pub location: TargetLocation,
    pub copied: bool,
}

impl DeliveryReport {
    /// One status line for the tool result
    pub fn status_message(&self) -> String {
        let path = self.path.display();
        let mut message = match &self.backend {
            Some(backend) if self.played => {
                format!("Audio file saved and played with {}: {}", backend, path)
            }
            _ if self.copied => format!(
                "Audio file saved but playback failed; copied to desktop: {}",
                path
            ),
            _ => format!("Audio file saved but playback failed: {}", path),
        };
        if !self.played {
            if let Some(windows) = to_windows_path(&self.path) {
                message.push_str(&format!(" (open from Windows: {})", windows));
            }
        }
        message
    }
}

/// Delivery settings, overlaid from config and env
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Native output directory, default: system temp dir
    pub output_dir: Option<PathBuf>,
    /// Cross-environment desktop, default: `/mnt/c/Users/<user>/Desktop`
    pub desktop_dir: Option<PathBuf>,
    pub backends: Vec<String>,
    pub playback: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            desktop_dir: std::env::var("PARROT_DESKTOP_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            backends: DEFAULT_BACKEND_ORDER.iter().map(|s| s.to_string()).collect(),
            playback: std::env::var("PARROT_PLAYBACK")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"))
                .unwrap_or(true),
        }
    }
}

/// Writes the audio, tries the players, copies to the desktop as a last resort.
///
/// Only the initial write can fail; playback and copy problems are logged and
/// reported through [`DeliveryReport`].
pub struct DeliveryPipeline {
    resolver: Arc<dyn DeliveryTargetResolver>,
    backends: Vec<Arc<dyn PlaybackBackend>>,
}

impl DeliveryPipeline {
    pub fn new(
        resolver: Arc<dyn DeliveryTargetResolver>,
        backends: Vec<Arc<dyn PlaybackBackend>>,
    ) -> Self {
        Self { resolver, backends }
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        let resolver = HostResolver::new(
            config.output_dir.clone().unwrap_or_else(std::env::temp_dir),
            config.desktop_dir.clone().or_else(default_desktop_dir),
        );

        let backends = if config.playback {
            config
                .backends
                .iter()
                .map(|name| builtin(name).ok_or_else(|| DeliveryError::UnknownBackend(name.clone())))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            info!(target: "delivery", "Playback disabled; audio will only be written to disk");
            Vec::new()
        };

        Ok(Self::new(Arc::new(resolver), backends))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub async fn deliver(&self, audio: &[u8]) -> Result<DeliveryReport, DeliveryError> {
        let target = self.resolver.resolve();
        let path = write_new_file(&target.dir, now_ms(), audio).await?;
        info!(target: "delivery", path = %path.display(), bytes = audio.len(), "Audio file saved");

        if let Some(backend) = self.play_first(&path).await {
            return Ok(DeliveryReport {
                path,
                played: true,
                backend: Some(backend),
                location: target.location,
                copied: false,
            });
        }

        let mut report = DeliveryReport {
            path,
            played: false,
            backend: None,
            location: target.location,
            copied: false,
        };

        if target.location == TargetLocation::NativeTemp && !is_cross_environment_path(&report.path) {
            if let Some(copy) = self.copy_to_desktop(&report.path).await {
                report.path = copy;
                report.location = TargetLocation::CrossEnvironmentDesktop;
                report.copied = true;
            }
        }

        warn!(target: "delivery", path = %report.path.display(), "Could not auto-play audio");
        Ok(report)
    }

    /// Name of the first backend that played the file
    async fn play_first(&self, path: &Path) -> Option<String> {
        for backend in &self.backends {
            match backend.play(path).await {
                Ok(()) => {
                    info!(target: "delivery", backend = backend.name(), "Audio played");
                    return Some(backend.name().to_string());
                }
                Err(e) => {
                    debug!(target: "delivery", backend = backend.name(), error = %e, "Playback backend failed");
                }
            }
        }
        None
    }

    async fn copy_to_desktop(&self, source: &Path) -> Option<PathBuf> {
        let dir = self.resolver.cross_environment_dir()?;
        let dest = dir.join(source.file_name()?);
        match fs::copy(source, &dest).await {
            Ok(_) => {
                info!(target: "delivery", path = %dest.display(), "Audio copied to desktop");
                Some(dest)
            }
            Err(e) => {
                warn!(target: "delivery", path = %dest.display(), error = %e, "Desktop copy failed");
                None
            }
        }
    }
}

/// Create `parrot-tts-<millis>.wav` in `dir` without clobbering an existing
/// file; a clash gets a `-<n>` suffix.
async fn write_new_file(dir: &Path, millis: i64, audio: &[u8]) -> Result<PathBuf, DeliveryError> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("parrot-tts-{}.wav", millis)
        } else {
            format!("parrot-tts-{}-{}.wav", millis, attempt)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return write_whole(path, file, audio).await,
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < 1000 => attempt += 1,
            Err(source) => return Err(DeliveryError::Write { path, source }),
        }
    }
}

/// Write and flush `audio` to the freshly created `path`. A short write
/// removes the file so no truncated WAV is left behind.
async fn write_whole<W>(path: PathBuf, mut out: W, audio: &[u8]) -> Result<PathBuf, DeliveryError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        out.write_all(audio).await?;
        out.flush().await
    }
    .await;
    drop(out);

    match written {
        Ok(()) => Ok(path),
        Err(source) => {
            if let Err(e) = fs::remove_file(&path).await {
                warn!(target: "delivery", path = %path.display(), error = %e, "Failed to remove partial audio file");
            }
            Err(DeliveryError::Write { path, source })
        }
    }
}
