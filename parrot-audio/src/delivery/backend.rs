//! Audio players, tried in order until one succeeds.

use super::target::to_windows_path;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

/// Default player order: ALSA, PulseAudio, PipeWire, FFmpeg, then the Windows host
pub const DEFAULT_BACKEND_ORDER: &[&str] = &["aplay", "paplay", "pw-play", "ffplay", "powershell.exe"];

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("{backend} could not be started: {source}")]
    Spawn {
        backend: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend} exited with {status}")]
    Failed { backend: String, status: String },
}

#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Play the file to completion
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// A player invoked as an external process
pub struct CommandBackend {
    name: String,
    program: String,
    args: fn(&Path) -> Vec<OsString>,
}

impl CommandBackend {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: fn(&Path) -> Vec<OsString>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl PlaybackBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let status = Command::new(&self.program)
            .args((self.args)(path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| PlaybackError::Spawn {
                backend: self.name.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Failed {
                backend: self.name.clone(),
                status: status.to_string(),
            })
        }
    }
}

fn path_only(path: &Path) -> Vec<OsString> {
    vec![path.as_os_str().to_owned()]
}

fn ffplay_args(path: &Path) -> Vec<OsString> {
    vec!["-nodisp".into(), "-autoexit".into(), path.as_os_str().to_owned()]
}

fn powershell_args(path: &Path) -> Vec<OsString> {
    let windows = to_windows_path(path).unwrap_or_else(|| path.to_string_lossy().replace('/', "\\"));
    let script = format!(
        "(New-Object Media.SoundPlayer '{}').PlaySync()",
        windows.replace('\'', "''")
    );
    vec!["-NoProfile".into(), "-Command".into(), script.into()]
}

/// Look up a built-in backend by name
pub fn builtin(name: &str) -> Option<Arc<dyn PlaybackBackend>> {
    let backend = match name {
        "aplay" | "paplay" | "pw-play" => CommandBackend::new(name, name, path_only),
        "ffplay" => CommandBackend::new(name, name, ffplay_args),
        "powershell" | "powershell.exe" => CommandBackend::new("powershell.exe", "powershell.exe", powershell_args),
        _ => return None,
    };
    Some(Arc::new(backend))
}

pub fn default_backends() -> Vec<Arc<dyn PlaybackBackend>> {
    DEFAULT_BACKEND_ORDER.iter().filter_map(|name| builtin(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_complete() {
        let names: Vec<String> = default_backends().iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, DEFAULT_BACKEND_ORDER);
        assert!(builtin("vlc").is_none());
    }

    #[test]
    fn powershell_gets_windows_path() {
        let args = powershell_args(Path::new("/mnt/c/Users/o'neil/Desktop/a.wav"));
        assert_eq!(args[0], "-NoProfile");
        assert_eq!(
            args[2].to_string_lossy(),
            "(New-Object Media.SoundPlayer 'C:\\Users\\o''neil\\Desktop\\a.wav').PlaySync()"
        );
    }

    #[test]
    fn ffplay_runs_headless() {
        let args = ffplay_args(Path::new("/tmp/a.wav"));
        assert_eq!(args, vec![OsString::from("-nodisp"), "-autoexit".into(), "/tmp/a.wav".into()]);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let backend = CommandBackend::new("nope", "parrot-no-such-player-12345", path_only);
        let err = backend.play(Path::new("/tmp/a.wav")).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Spawn { .. }));
    }
}
