use super::model::{AudioBuffer, ModelLoader, SpeechError, SpeechModel, SpeechRequest, Synthesizer};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Owns the lazily loaded speech model.
///
/// Loading is single-flight: concurrent callers wait on the same
/// initialization and reuse its result. A failed load leaves the cell empty,
/// so the next call tries again.
pub struct SpeechGenerator {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn SpeechModel>>,
}

impl SpeechGenerator {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.model.initialized()
    }

    /// Load the model if it is not loaded yet
    pub async fn initialize(&self) -> Result<(), SpeechError> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<&Arc<dyn SpeechModel>, SpeechError> {
        self.model
            .get_or_try_init(|| async {
                info!(target: "speech", "Initializing speech model");
                let started = Instant::now();
                match self.loader.load().await {
                    Ok(model) => {
                        info!(
                            target: "speech",
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Speech model initialized"
                        );
                        Ok(model)
                    }
                    Err(e) => {
                        error!(target: "speech", error = %e, "Speech model initialization failed");
                        Err(e)
                    }
                }
            })
            .await
    }

    /// Generate WAV bytes, loading the model first if needed
    pub async fn generate(&self, request: &SpeechRequest) -> Result<AudioBuffer, SpeechError> {
        let model = self.model().await?;

        debug!(
            target: "speech",
            voice = %request.voice,
            speed = request.speed,
            chars = request.text.chars().count(),
            "Generating speech"
        );

        let audio = model
            .generate(&request.text, &request.voice, request.speed)
            .await
            .map_err(|e| {
                error!(target: "speech", error = %e, "Speech generation failed");
                e
            })?;

        let wav = audio
            .to_wav()
            .map_err(|e| SpeechError::Generation(format!("WAV encoding failed: {}", e)))?;

        debug!(
            target: "speech",
            bytes = wav.len(),
            duration_secs = audio.duration_secs(),
            "Speech generated"
        );

        Ok(AudioBuffer::new(wav))
    }
}

#[async_trait]
impl Synthesizer for SpeechGenerator {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioBuffer, SpeechError> {
        self.generate(request).await
    }
}
