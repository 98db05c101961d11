// Parrot Audio
// Speech synthesis, audio delivery and the text_to_speech tool

pub mod delivery;
pub mod speech;
pub mod tool;
pub mod wav;

mod utils;

pub use delivery::{DeliveryConfig, DeliveryError, DeliveryPipeline, DeliveryReport};
pub use speech::{
    AudioBuffer, EngineConfig, EngineLoader, ModelLoader, SpeechError, SpeechGenerator,
    SpeechModel, SpeechRequest, Synthesizer,
};
pub use tool::{TextToSpeechTool, TOOL_NAME};
pub use wav::RawAudio;
