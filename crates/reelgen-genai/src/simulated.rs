//! Offline stand-in for the speech provider.
//!
//! Waits a fixed delay, then fails with a configured probability or
//! returns a silent WAV clip. Useful for demos without a credential.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reelgen_models::{AudioArtifact, VoicePreference};
use tracing::debug;

use crate::error::{GenAiError, GenAiResult};
use crate::provider::VoiceGenerator;

const SAMPLE_RATE: u32 = 24_000;

/// Simulated voice provider.
#[derive(Debug, Clone)]
pub struct SimulatedVoiceGenerator {
    delay: Duration,
    failure_rate: f64,
}

impl Default for SimulatedVoiceGenerator {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
            failure_rate: 0.5,
        }
    }
}

impl SimulatedVoiceGenerator {
    pub fn new(delay: Duration, failure_rate: f64) -> Self {
        Self {
            delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl VoiceGenerator for SimulatedVoiceGenerator {
    async fn generate(&self, text: &str, voice: VoicePreference) -> GenAiResult<AudioArtifact> {
        tokio::time::sleep(self.delay).await;

        let failed = rand::rng().random_bool(self.failure_rate);
        if failed {
            return Err(GenAiError::Simulated(
                "simulated voice service is temporarily unavailable".to_string(),
            ));
        }

        // Roughly 15 characters per spoken second
        let seconds = (text.chars().count() as u32 / 15).clamp(1, 60);
        debug!(voice = %voice, seconds, "Produced simulated narration");
        Ok(AudioArtifact::new(silent_wav(seconds), "audio/wav"))
    }
}

/// 16-bit mono PCM WAV of silence.
fn silent_wav(seconds: u32) -> Vec<u8> {
    let data_len = SAMPLE_RATE * 2 * seconds;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}
