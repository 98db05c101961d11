use crate::wav::RawAudio;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use thiserror::Error;

/// Default female voice id (Kokoro naming)
pub const DEFAULT_VOICE: &str = "af_heart";
pub const DEFAULT_SPEED: f32 = 1.0;

#[derive(Error, Debug, Clone)]
pub enum SpeechError {
    #[error("Failed to initialize speech model: {0}")]
    Initialization(String),

    #[error("Failed to generate speech: {0}")]
    Generation(String),
}

/// One validated synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: DEFAULT_VOICE.to_string(),
            speed: DEFAULT_SPEED,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

/// Encoded WAV bytes produced for a single call. Never shared across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
}

impl AudioBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:audio/wav;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:audio/wav;base64,{}", self.to_base64())
    }
}

/// A loaded speech model
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Synthesize `text`; no retries, no partial output
    async fn generate(&self, text: &str, voice: &str, speed: f32) -> Result<RawAudio, SpeechError>;
}

/// Loads a speech model. This is the expensive step that must run once.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SpeechModel>, SpeechError>;
}

/// What the `text_to_speech` tool needs: text in, WAV bytes out
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioBuffer, SpeechError>;
}
