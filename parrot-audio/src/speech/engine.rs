//! Speech model backed by a locally installed CLI engine.
//!
//! Engines are probed at load time in order of quality:
//! - kokoro-tts (native Kokoro voice ids such as `af_heart`)
//! - piper (requires a voice model, see `PIPER_VOICE`)
//! - espeak-ng / espeak (widely available; Kokoro ids are mapped to an accent)
//!
//! Env overrides:
//! - KOKORO_BIN, KOKORO_MODEL, KOKORO_VOICES
//! - PIPER_BIN, PIPER_VOICE
//! - ESPEAK_BIN
//! - PARROT_TEMP_DIR (scratch files, default: system temp dir)

use super::model::{ModelLoader, SpeechError, SpeechModel};
use crate::utils::gen_id;
use crate::wav::RawAudio;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub temp_dir: PathBuf,
    pub kokoro_bin: Option<PathBuf>,
    pub kokoro_model: Option<PathBuf>,
    pub kokoro_voices: Option<PathBuf>,
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let path_var = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        };

        Self {
            temp_dir: path_var("PARROT_TEMP_DIR").unwrap_or_else(std::env::temp_dir),
            kokoro_bin: path_var("KOKORO_BIN"),
            kokoro_model: path_var("KOKORO_MODEL"),
            kokoro_voices: path_var("KOKORO_VOICES"),
            piper_bin: path_var("PIPER_BIN"),
            piper_voice: path_var("PIPER_VOICE"),
            espeak_bin: path_var("ESPEAK_BIN"),
        }
    }
}

/// A detected engine and everything needed to invoke it
#[derive(Clone, Debug, PartialEq)]
pub enum Engine {
    Kokoro {
        bin: PathBuf,
        model: Option<PathBuf>,
        voices: Option<PathBuf>,
    },
    Piper {
        bin: PathBuf,
        voice: PathBuf,
    },
    Espeak {
        bin: PathBuf,
    },
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Kokoro { .. } => "kokoro-tts",
            Engine::Piper { .. } => "piper",
            Engine::Espeak { .. } => "espeak-ng",
        }
    }

    /// Probe for the best available engine
    pub fn detect(cfg: &EngineConfig) -> Option<Engine> {
        if let Some(bin) = resolve_bin(cfg.kokoro_bin.as_deref(), &["kokoro-tts"]) {
            return Some(Engine::Kokoro {
                bin,
                model: cfg.kokoro_model.clone(),
                voices: cfg.kokoro_voices.clone(),
            });
        }

        if let Some(bin) = resolve_bin(cfg.piper_bin.as_deref(), &["piper"]) {
            match cfg.piper_voice.as_ref().filter(|v| v.exists()) {
                Some(voice) => {
                    return Some(Engine::Piper {
                        bin,
                        voice: voice.clone(),
                    })
                }
                None => {
                    warn!(target: "speech", bin = ?bin, "Piper found but no voice model; set PIPER_VOICE")
                }
            }
        }

        resolve_bin(cfg.espeak_bin.as_deref(), &["espeak-ng", "espeak"])
            .map(|bin| Engine::Espeak { bin })
    }
}

/// Explicit path if it exists, else the first candidate found on PATH
fn resolve_bin(explicit: Option<&Path>, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        if let Some(found) = p.to_str().and_then(get_from_path) {
            return Some(found);
        }
        warn!(target: "speech", path = ?p, "Configured engine binary not found");
    }
    candidates.iter().find_map(|bin| get_from_path(bin))
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    if let Ok(paths) = std::env::var("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(bin);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Map a Kokoro-style voice id onto an espeak voice; other ids pass through
pub fn espeak_voice(voice: &str) -> String {
    let mapped = match voice.get(..3) {
        Some("af_") => "en-us+f3",
        Some("am_") => "en-us",
        Some("bf_") => "en-gb+f3",
        Some("bm_") => "en-gb",
        _ if voice.is_empty() => "en-us+f3",
        _ => voice,
    };
    mapped.to_string()
}

/// Loads a [`CliSpeechModel`] by probing for an installed engine
pub struct EngineLoader {
    cfg: EngineConfig,
}

impl EngineLoader {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl ModelLoader for EngineLoader {
    async fn load(&self) -> Result<Arc<dyn SpeechModel>, SpeechError> {
        let cfg = self.cfg.clone();
        let engine = tokio::task::spawn_blocking(move || Engine::detect(&cfg))
            .await
            .map_err(|e| SpeechError::Initialization(e.to_string()))?
            .ok_or_else(|| {
                SpeechError::Initialization(
                    "no speech engine found; install kokoro-tts, piper or espeak-ng \
                     (or set KOKORO_BIN / PIPER_BIN / ESPEAK_BIN)"
                        .to_string(),
                )
            })?;

        fs::create_dir_all(&self.cfg.temp_dir).await.map_err(|e| {
            SpeechError::Initialization(format!(
                "cannot use scratch directory {}: {}",
                self.cfg.temp_dir.display(),
                e
            ))
        })?;

        info!(target: "speech", engine = engine.name(), "Detected speech engine");
        Ok(Arc::new(CliSpeechModel {
            engine,
            temp_dir: self.cfg.temp_dir.clone(),
        }))
    }
}

/// Runs the engine into a scratch WAV, decodes it and removes the scratch files
pub struct CliSpeechModel {
    engine: Engine,
    temp_dir: PathBuf,
}

impl CliSpeechModel {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn command(&self, text_file: &Path, wav: &Path, voice: &str, speed: f32) -> Command {
        match &self.engine {
            Engine::Kokoro { bin, model, voices } => {
                let mut cmd = Command::new(bin);
                cmd.arg(text_file).arg(wav);
                cmd.arg("--voice").arg(voice);
                cmd.arg("--speed").arg(format!("{:.2}", speed));
                if let Some(m) = model {
                    cmd.arg("--model").arg(m);
                }
                if let Some(v) = voices {
                    cmd.arg("--voices").arg(v);
                }
                cmd.stdin(Stdio::null());
                cmd
            }
            Engine::Piper { bin, voice: model } => {
                let mut cmd = Command::new(bin);
                cmd.arg("-m").arg(model);
                cmd.arg("-f").arg(wav);
                let length_scale = (1.0f32 / speed).clamp(0.25, 4.0);
                cmd.arg("--length_scale").arg(format!("{:.2}", length_scale));
                cmd.stdin(Stdio::piped());
                cmd
            }
            Engine::Espeak { bin } => {
                let mut cmd = Command::new(bin);
                let wpm = (175.0 * speed).round().clamp(80.0, 450.0) as i32;
                cmd.arg("-v").arg(espeak_voice(voice));
                cmd.arg("-s").arg(wpm.to_string());
                cmd.arg("-w").arg(wav);
                cmd.arg("--stdin");
                cmd.stdin(Stdio::piped());
                cmd
            }
        }
    }

    async fn synthesize_into(
        &self,
        text_file: &Path,
        wav: &Path,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<RawAudio, SpeechError> {
        let io_err = |what: &str, e: std::io::Error| {
            SpeechError::Generation(format!("{} {}: {}", self.engine.name(), what, e))
        };

        if matches!(self.engine, Engine::Kokoro { .. }) {
            fs::write(text_file, text)
                .await
                .map_err(|e| io_err("input write failed", e))?;
        }

        let mut cmd = self.command(text_file, wav, voice, speed);
        cmd.stdout(Stdio::null()).stderr(Stdio::piped()).kill_on_drop(true);

        debug!(target: "speech", command = ?cmd, "Running speech engine");
        let mut child = cmd.spawn().map_err(|e| io_err("spawn failed", e))?;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()).await {
                // The scratch files are removed next; the engine must not outlive them
                if let Err(kill_err) = child.kill().await {
                    debug!(target: "speech", error = %kill_err, "Failed to stop speech engine");
                }
                return Err(io_err("stdin write failed", e));
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| io_err("wait failed", e))?;
        if !output.status.success() {
            return Err(SpeechError::Generation(format!(
                "{} exited with {}: {}",
                self.engine.name(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let bytes = fs::read(wav)
            .await
            .map_err(|e| io_err("produced no audio", e))?;
        RawAudio::from_wav(&bytes)
            .map_err(|e| SpeechError::Generation(format!("invalid WAV from {}: {}", self.engine.name(), e)))
    }
}

#[async_trait]
impl SpeechModel for CliSpeechModel {
    async fn generate(&self, text: &str, voice: &str, speed: f32) -> Result<RawAudio, SpeechError> {
        let id = gen_id();
        let text_file = self.temp_dir.join(format!("parrot-{}.txt", id));
        let wav = self.temp_dir.join(format!("parrot-{}.wav", id));

        let result = self.synthesize_into(&text_file, &wav, text, voice, speed).await;

        // Scratch files go away as soon as the audio is in memory, success or not
        for path in [&text_file, &wav] {
            if let Err(e) = fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(target: "speech", path = ?path, error = %e, "Failed to remove scratch file");
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kokoro_voices_for_espeak() {
        assert_eq!(espeak_voice("af_heart"), "en-us+f3");
        assert_eq!(espeak_voice("am_adam"), "en-us");
        assert_eq!(espeak_voice("bf_emma"), "en-gb+f3");
        assert_eq!(espeak_voice("bm_george"), "en-gb");
        assert_eq!(espeak_voice("de"), "de");
        assert_eq!(espeak_voice(""), "en-us+f3");
    }

    #[test]
    fn missing_explicit_binary_is_not_resolved() {
        let resolved = resolve_bin(
            Some(Path::new("/definitely/not/here/kokoro-tts")),
            &["parrot-no-such-binary-12345"],
        );
        assert!(resolved.is_none());
    }

    #[test]
    fn piper_without_voice_is_skipped() {
        let dir = std::env::temp_dir();
        let fake_piper = dir.join(format!("parrot-fake-piper-{}", gen_id()));
        std::fs::write(&fake_piper, b"").unwrap();

        let cfg = EngineConfig {
            temp_dir: dir.clone(),
            kokoro_bin: Some(dir.join("parrot-missing-kokoro")),
            kokoro_model: None,
            kokoro_voices: None,
            piper_bin: Some(fake_piper.clone()),
            piper_voice: None,
            espeak_bin: Some(dir.join("parrot-missing-espeak")),
        };

        let engine = Engine::detect(&cfg);
        assert!(!matches!(engine, Some(Engine::Piper { .. })));

        std::fs::remove_file(fake_piper).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_is_stopped_when_it_stops_reading() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        // Closes stdin, then writes the `-w` target late
        let script = bin_dir.path().join("espeak-ng");
        std::fs::write(&script, "#!/bin/sh\nexec 0<&-\nsleep 1\necho late > \"$6\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let model = CliSpeechModel {
            engine: Engine::Espeak { bin: script },
            temp_dir: scratch.path().to_path_buf(),
        };

        let text = "words ".repeat(64 * 1024);
        let err = model.generate(&text, "af_heart", 1.0).await.unwrap_err();
        assert!(matches!(err, SpeechError::Generation(ref m) if m.contains("stdin write failed")));

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
