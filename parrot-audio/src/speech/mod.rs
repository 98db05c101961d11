//! Speech generation: model traits, the single-flight generator and the CLI engine model.

pub mod engine;
pub mod generator;
pub mod model;

pub use engine::{espeak_voice, CliSpeechModel, Engine, EngineConfig, EngineLoader};
pub use generator::SpeechGenerator;
pub use model::{
    AudioBuffer, ModelLoader, SpeechError, SpeechModel, SpeechRequest, Synthesizer, DEFAULT_SPEED,
    DEFAULT_VOICE,
};
