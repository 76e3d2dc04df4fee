//! Narration voice preference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Voice used when narration audio is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoicePreference {
    #[default]
    Female,
    Male,
}

impl VoicePreference {
    /// Get string representation of the preference.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoicePreference::Female => "female",
            VoicePreference::Male => "male",
        }
    }
}

impl fmt::Display for VoicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VoicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "female" | "f" => Ok(VoicePreference::Female),
            "male" | "m" => Ok(VoicePreference::Male),
            other => Err(format!("unknown voice preference: {other}")),
        }
    }
}
