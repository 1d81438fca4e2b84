use isofitts_core::{CaptureRule, Error, Gain, LabelMap, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub target_count: usize,
    pub max_trials: usize,
    /// Pixels per tick at unit gain.
    pub velocity: f64,
    pub viewport: Viewport,
    pub dwell_threshold_secs: f64,
    pub target_radius: f64,
    /// Radius of the ring the targets sit on.
    pub layout_radius: f64,
    pub cursor_radius: f64,
    pub capture_rule: CaptureRule,
    pub gain: Gain,
    pub labels: LabelMap,
    pub logging_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_count: 8,
            max_trials: 15,
            velocity: 5.0,
            viewport: Viewport {
                width: 1250,
                height: 750,
            },
            dwell_threshold_secs: 3.0,
            target_radius: 40.0,
            layout_radius: 275.0,
            cursor_radius: 7.0,
            capture_rule: CaptureRule::default(),
            gain: Gain::default(),
            labels: LabelMap::default(),
            logging_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Rejects the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.target_count < 2 {
            return Err(invalid(format!(
                "target_count must be at least 2, got {}",
                self.target_count
            )));
        }
        if self.max_trials < 1 {
            return Err(invalid("max_trials must be at least 1".to_string()));
        }
        for (name, value) in [
            ("velocity", self.velocity),
            ("dwell_threshold_secs", self.dwell_threshold_secs),
            ("target_radius", self.target_radius),
            ("layout_radius", self.layout_radius),
            ("cursor_radius", self.cursor_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(invalid(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        let half_extent = self.viewport.width.min(self.viewport.height) as f64 / 2.0;
        if self.layout_radius + self.target_radius > half_extent {
            return Err(invalid(format!(
                "target ring (radius {} + target {}) does not fit a {}x{} viewport",
                self.layout_radius, self.target_radius, self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }

    pub fn dwell_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.dwell_threshold_secs)
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidConfiguration(msg)
}
