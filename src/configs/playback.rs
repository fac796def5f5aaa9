use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaybackConfig {
    /// Lower bound applied to every incoming play-state rate.
    #[serde(default = "default_min_rate")]
    pub min_rate: f64,
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f64,
}

impl PlaybackConfig {
    /// Clamps a requested rate into the configured range, keeping it positive.
    pub fn clamp_rate(&self, rate: f64) -> f64 {
        let min = self.min_rate.max(f64::MIN_POSITIVE);
        let max = self.max_rate.max(min);
        if rate.is_nan() { 1.0_f64.clamp(min, max) } else { rate.clamp(min, max) }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            initial_volume: default_initial_volume(),
        }
    }
}

fn default_min_rate() -> f64 {
    0.1
}

fn default_max_rate() -> f64 {
    10.0
}

fn default_initial_volume() -> f64 {
    1.0
}
