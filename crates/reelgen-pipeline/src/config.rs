//! Pipeline configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::poller::PollPolicy;
use crate::retry::RetryPolicy;

/// Which backend produces narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioProvider {
    /// Gemini text-to-speech.
    #[default]
    Gemini,
    /// Offline stand-in with a random failure rate.
    Simulated,
}

impl AudioProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioProvider::Gemini => "gemini",
            AudioProvider::Simulated => "simulated",
        }
    }
}

impl fmt::Display for AudioProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(AudioProvider::Gemini),
            "simulated" | "sim" => Ok(AudioProvider::Simulated),
            other => Err(format!("unknown audio provider: {}", other)),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Backoff for rate-limited provider calls
    pub retry: RetryPolicy,
    /// Video status polling
    pub poll: PollPolicy,
    /// Narration backend
    pub audio_provider: AudioProvider,
    /// Delay before the simulated provider answers
    pub simulated_audio_delay: Duration,
    /// Chance that a simulated narration request fails
    pub simulated_audio_failure_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
            audio_provider: AudioProvider::Gemini,
            simulated_audio_delay: Duration::from_millis(1500),
            simulated_audio_failure_rate: 0.5,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let defaults = Self::default();

        let retry = RetryPolicy::new(
            parsed("REELGEN_RETRY_MAX_ATTEMPTS")
                .map(|n| n as u32)
                .unwrap_or(defaults.retry.max_attempts),
            parsed("REELGEN_RETRY_INITIAL_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.initial_delay),
        );

        let interval = parsed("REELGEN_POLL_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll.interval);
        // 0 turns the budget off and polls until the operation is done
        let max_wait = match parsed("REELGEN_POLL_MAX_WAIT_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.poll.max_wait,
        };

        Self {
            retry,
            poll: PollPolicy { interval, max_wait },
            audio_provider: lookup("REELGEN_AUDIO_PROVIDER")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.audio_provider),
            simulated_audio_delay: parsed("REELGEN_SIMULATED_AUDIO_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.simulated_audio_delay),
            simulated_audio_failure_rate: lookup("REELGEN_SIMULATED_AUDIO_FAILURE_RATE")
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|rate| (0.0..=1.0).contains(rate))
                .unwrap_or(defaults.simulated_audio_failure_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> PipelineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]), PipelineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("REELGEN_RETRY_MAX_ATTEMPTS", "5"),
            ("REELGEN_RETRY_INITIAL_DELAY_MS", "100"),
            ("REELGEN_POLL_INTERVAL_SECS", "10"),
            ("REELGEN_POLL_MAX_WAIT_SECS", "60"),
            ("REELGEN_AUDIO_PROVIDER", "Simulated"),
            ("REELGEN_SIMULATED_AUDIO_FAILURE_RATE", "0"),
        ]);

        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(100)));
        assert_eq!(config.poll.interval, Duration::from_secs(10));
        assert_eq!(config.poll.max_wait, Some(Duration::from_secs(60)));
        assert_eq!(config.audio_provider, AudioProvider::Simulated);
        assert_eq!(config.simulated_audio_failure_rate, 0.0);
    }

    #[test]
    fn test_zero_max_wait_disables_budget() {
        let config = config_from(&[("REELGEN_POLL_MAX_WAIT_SECS", "0")]);
        assert_eq!(config.poll.max_wait, None);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("REELGEN_RETRY_MAX_ATTEMPTS", "many"),
            ("REELGEN_AUDIO_PROVIDER", "robot"),
            ("REELGEN_SIMULATED_AUDIO_FAILURE_RATE", "1.5"),
        ]);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.audio_provider, AudioProvider::Gemini);
        assert_eq!(config.simulated_audio_failure_rate, 0.5);
    }
}
