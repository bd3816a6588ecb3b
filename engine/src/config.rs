use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AI_DELAY_MS: u64 = 400;
pub const DEFAULT_MOVEMENT_RANGE: u32 = 6;
const DEFAULT_MAX_ROUNDS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// "Thinking time" before an automated combatant acts.
    pub ai_delay_ms: u64,
    /// Movement allowance in cells for sheets that don't set one.
    pub default_movement_range: u32,
    /// Safety cap for unattended runs (batch simulation).
    pub max_rounds: u32,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_delay_ms: DEFAULT_AI_DELAY_MS,
            default_movement_range: DEFAULT_MOVEMENT_RANGE,
            max_rounds: DEFAULT_MAX_ROUNDS,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn ai_delay(&self) -> Duration {
        Duration::from_millis(self.ai_delay_ms)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("failed to parse engine config YAML")
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse engine config JSON")
    }
}
