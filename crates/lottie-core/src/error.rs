pub type Result<T> = std::result::Result<T, LottieError>;

/// Construction-time failures. Per-frame evaluation never fails; every
/// malformed input is rejected while an asset is being built.
#[derive(thiserror::Error, Debug)]
pub enum LottieError {
    #[error("animated property has no keyframes")]
    EmptyKeyframes,

    #[error("keyframe {index} starts at frame {frame} before the previous keyframe at {previous}")]
    NonMonotonicKeyframes { index: usize, frame: f32, previous: f32 },

    #[error("keyframe {index} ends at frame {end} but the next keyframe starts at {next_start}")]
    DiscontiguousKeyframes {
        index: usize,
        end: f32,
        next_start: f32,
    },

    #[error("keyframe {index} has no start value")]
    MissingStartValue { index: usize },

    #[error("shape morph between {from} and {to} curves")]
    ShapeCardinality { from: usize, to: usize },

    #[error("gradient stop count changes from {from} to {to}")]
    GradientStops { from: usize, to: usize },

    #[error("invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("model error: {0}")]
    Model(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LottieError {
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::InvalidTimeline(msg.into())
    }
}
