//! The `text_to_speech` MCP tool.

use crate::delivery::DeliveryPipeline;
use crate::speech::{SpeechRequest, Synthesizer, DEFAULT_SPEED, DEFAULT_VOICE};
use async_trait::async_trait;
use parrot_core::mcp::CallToolResult;
use parrot_core::{Tool, ToolError, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "text_to_speech";

const PLAYBACK_FAILED_NOTE: &str = "Note: Audio playback failed, but audio data is available below.";

#[derive(Debug, Deserialize)]
struct TextToSpeechArgs {
    text: Option<String>,
    #[serde(default)]
    voice: Option<String>,
    #[serde(default)]
    speed: Option<f64>,
}

/// Synthesizes speech, delivers it locally and returns it as a WAV data URI
pub struct TextToSpeechTool {
    synthesizer: Arc<dyn Synthesizer>,
    pipeline: Arc<DeliveryPipeline>,
    default_voice: String,
    default_speed: f32,
}

impl TextToSpeechTool {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, pipeline: Arc<DeliveryPipeline>) -> Self {
        Self {
            synthesizer,
            pipeline,
            default_voice: DEFAULT_VOICE.to_string(),
            default_speed: DEFAULT_SPEED,
        }
    }

    pub fn with_defaults(mut self, voice: impl Into<String>, speed: f32) -> Self {
        self.default_voice = voice.into();
        self.default_speed = speed;
        self
    }

    fn parse_request(&self, arguments: Value) -> ToolResult<SpeechRequest> {
        let args: TextToSpeechArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let text = args
            .text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Text parameter is required".to_string()))?;

        let voice = args
            .voice
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.default_voice.clone());

        // 0 means "unset", like an absent speed
        let speed = match args.speed {
            None => self.default_speed,
            Some(s) if s == 0.0 => self.default_speed,
            Some(s) if s.is_finite() && s > 0.0 => s as f32,
            Some(s) => {
                return Err(ToolError::InvalidArguments(format!(
                    "speed must be a positive number, got {}",
                    s
                )))
            }
        };

        Ok(SpeechRequest::new(text).with_voice(voice).with_speed(speed))
    }
}

#[async_trait]
impl Tool for TextToSpeechTool {
    fn name(&self) -> String {
        TOOL_NAME.to_string()
    }

    fn description(&self) -> String {
        "Convert text to speech, play it on this machine when possible, and return the audio as a WAV data URI".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to convert to speech"
                },
                "voice": {
                    "type": "string",
                    "description": "Voice id",
                    "default": self.default_voice
                },
                "speed": {
                    "type": "number",
                    "description": "Speech speed multiplier",
                    "default": self.default_speed
                }
            },
            "required": ["text"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<CallToolResult> {
        let request = self.parse_request(arguments)?;
        debug!(
            target: "dispatcher",
            voice = %request.voice,
            speed = request.speed,
            "text_to_speech requested"
        );

        let audio = match self.synthesizer.synthesize(&request).await {
            Ok(audio) => audio,
            Err(e) => return Ok(CallToolResult::error(format!("Error generating speech: {}", e))),
        };

        let status = match self.pipeline.deliver(audio.as_bytes()).await {
            Ok(report) => report.status_message(),
            Err(e) => {
                warn!(target: "delivery", error = %e, "Audio delivery failed");
                PLAYBACK_FAILED_NOTE.to_string()
            }
        };

        Ok(CallToolResult::text(format!(
            "Successfully generated speech audio ({} bytes).\n{}\n\nAudio data URI: {}",
            audio.len(),
            status,
            audio.data_uri()
        )))
    }
}
