use std::fs;
use std::path::{Path, PathBuf};

use parrot_audio::speech::{DEFAULT_SPEED, DEFAULT_VOICE};
use parrot_audio::{DeliveryConfig, EngineConfig};
use parrot_core::{HttpServerConfig, ParrotError};

/// Server configuration: defaults, then env, then the TOML overlay.
/// CLI flags are applied on top by `main`.
#[derive(Clone, Debug)]
pub struct ParrotConfig {
    pub http: HttpServerConfig,
    pub speech: SpeechConfig,
    pub delivery: DeliveryConfig,
}

/// Tool defaults plus the engine probe settings
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub default_voice: String,
    pub default_speed: f32,
    pub engine: EngineConfig,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            default_voice: DEFAULT_VOICE.to_string(),
            default_speed: DEFAULT_SPEED,
            engine: EngineConfig::default(),
        }
    }
}

impl Default for ParrotConfig {
    fn default() -> Self {
        Self {
            http: HttpServerConfig::from_env(),
            speech: SpeechConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl ParrotConfig {
    /// Load from `explicit`, else `PARROT_CONFIG`, else `./parrot.toml`.
    ///
    /// A missing default file means defaults/env only. A missing explicit
    /// file or a malformed one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ParrotError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var("PARROT_CONFIG").ok().filter(|s| !s.is_empty()) {
                Some(p) => (PathBuf::from(p), true),
                None => (PathBuf::from("parrot.toml"), false),
            },
        };

        if !path.exists() {
            if required {
                return Err(ParrotError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::info!(target: "config", path = %path.display(), "No TOML config found; using defaults/env");
            return Self::default().validated();
        }

        let text = fs::read_to_string(&path).map_err(|e| {
            ParrotError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text, Self::default()).map_err(|e| {
            ParrotError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!(target: "config", path = %path.display(), "Loaded TOML config");
        config.validated()
    }

    /// Overlay a TOML document onto `base`
    pub fn from_toml_str(text: &str, base: Self) -> Result<Self, toml::de::Error> {
        let overlay: ParrotToml = toml::from_str(text)?;
        Ok(overlay.overlay(base))
    }

    fn validated(self) -> Result<Self, ParrotError> {
        let speed = self.speech.default_speed;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ParrotError::ConfigError(format!(
                "speech.default_speed must be a positive number, got {}",
                speed
            )));
        }
        if self.delivery.playback && self.delivery.backends.is_empty() {
            tracing::warn!(target: "config", "No playback backends configured; audio will only be saved");
        }
        Ok(self)
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ParrotToml {
    pub http: Option<HttpToml>,
    pub speech: Option<SpeechToml>,
    pub delivery: Option<DeliveryToml>,
}

impl ParrotToml {
    fn overlay(self, mut base: ParrotConfig) -> ParrotConfig {
        if let Some(h) = self.http {
            h.apply(&mut base.http);
        }
        if let Some(s) = self.speech {
            s.apply(&mut base.speech);
        }
        if let Some(d) = self.delivery {
            d.apply(&mut base.delivery);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpToml {
    pub host: Option<String>,
    pub port: Option<u16>,
}
impl HttpToml {
    fn apply(self, h: &mut HttpServerConfig) {
        if let Some(x) = self.host.filter(|s| !s.is_empty()) {
            h.host = x;
        }
        if let Some(x) = self.port {
            h.port = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SpeechToml {
    pub default_voice: Option<String>,
    pub default_speed: Option<f32>,
    pub temp_dir: Option<PathBuf>,
    pub kokoro_bin: Option<PathBuf>,
    pub kokoro_model: Option<PathBuf>,
    pub kokoro_voices: Option<PathBuf>,
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
}
impl SpeechToml {
    fn apply(self, s: &mut SpeechConfig) {
        if let Some(x) = self.default_voice.filter(|v| !v.is_empty()) {
            s.default_voice = x;
        }
        if let Some(x) = self.default_speed {
            s.default_speed = x;
        }
        let e = &mut s.engine;
        if let Some(x) = self.temp_dir {
            e.temp_dir = x;
        }
        if let Some(x) = self.kokoro_bin {
            e.kokoro_bin = Some(x);
        }
        if let Some(x) = self.kokoro_model {
            e.kokoro_model = Some(x);
        }
        if let Some(x) = self.kokoro_voices {
            e.kokoro_voices = Some(x);
        }
        if let Some(x) = self.piper_bin {
            e.piper_bin = Some(x);
        }
        if let Some(x) = self.piper_voice {
            e.piper_voice = Some(x);
        }
        if let Some(x) = self.espeak_bin {
            e.espeak_bin = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DeliveryToml {
    pub output_dir: Option<PathBuf>,
    pub desktop_dir: Option<PathBuf>,
    pub backends: Option<Vec<String>>, // e.g. ["paplay", "ffplay"]
    pub playback: Option<bool>,
}
impl DeliveryToml {
    fn apply(self, d: &mut DeliveryConfig) {
        if let Some(x) = self.output_dir {
            d.output_dir = Some(x);
        }
        if let Some(x) = self.desktop_dir {
            d.desktop_dir = Some(x);
        }
        if let Some(mut x) = self.backends {
            d.backends = x.drain(..).filter(|b| !b.is_empty()).collect();
        }
        if let Some(x) = self.playback {
            d.playback = x;
        }
    }
}
