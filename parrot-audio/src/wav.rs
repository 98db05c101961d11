//! WAV encoding and decoding for synthesized audio.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Decoded mono audio as produced by a speech model
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl RawAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Encode as a 16-bit PCM mono WAV file in memory
    pub fn to_wav(&self) -> Result<Vec<u8>, hound::Error> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(scaled)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Decode a WAV file, downmixing to mono
    pub fn from_wav(bytes: &[u8]) -> Result<Self, hound::Error> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }
}
