//! Engine tunables.
//!
//! None of these change document semantics; they bound numerical edge cases
//! (easing handles, auto-orient sampling, trim windows that cover the whole
//! path) and can be overridden from JSON.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clamp range for the x component of easing control points.
    pub easing_x_bounds: [f32; 2],
    /// Clamp range for the y component of easing control points.
    pub easing_y_bounds: [f32; 2],
    /// Progress delta sampled ahead of the current position for auto-orient.
    pub auto_orient_epsilon: f32,
    /// Trim windows within this fraction of the full length draw the full path.
    pub trim_epsilon: f32,
    /// Accuracy passed to kurbo arc length queries.
    pub arclen_accuracy: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            easing_x_bounds: [0.0, 1.0],
            easing_y_bounds: [-100.0, 100.0],
            auto_orient_epsilon: 1e-4,
            trim_epsilon: 0.01,
            arclen_accuracy: 0.1,
        }
    }
}

impl EngineConfig {
    /// Parse overrides; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
