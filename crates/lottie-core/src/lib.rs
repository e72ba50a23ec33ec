//! Keyframe evaluation and transform composition for Lottie documents.
//!
//! Animated properties are split in two: a [`KeyframeTrack`] holds the
//! validated, immutable keyframes and is shared behind an `Arc`; a
//! [`KeyframeAnimation`] is a cheap per-instance evaluator over it. Every
//! property of a composition is driven by one normalized progress in [0,1].

pub mod animatable;
pub mod animation;
pub mod callback;
pub mod color;
pub mod config;
pub mod convert;
pub mod easing;
pub mod error;
pub mod keyframe;
pub mod motion_path;
pub mod path_morph;
pub mod scene;
pub mod split;
pub mod timeline;
pub mod transform;
pub mod trim;

pub use animatable::{Interpolatable, ScaleXY};
pub use animation::{
    ColorAnimation, FloatAnimation, GradientAnimation, IntegerAnimation, KeyframeAnimation,
    PointAnimation, ScaleAnimation, ShapeAnimation,
};
pub use callback::{
    ConstantValue, FrameInfo, InterpolatedValue, RelativeFloat, RelativePoint, ValueCallback,
};
pub use color::{Color, GradientColor};
pub use config::EngineConfig;
pub use convert::TrackBuilder;
pub use easing::EasingCurve;
pub use error::{LottieError, Result};
pub use keyframe::{Keyframe, KeyframeTrack, TrackEntry};
pub use motion_path::{MotionPath, SpatialTangents};
pub use path_morph::{CubicCurveData, PathVertexData};
pub use scene::{
    LayerNode, LottieAsset, LottiePlayer, Paint, ResolvedFrame, ResolvedLayer, ResolvedShape,
    ShapeNode,
};
pub use split::{PositionAnimation, SplitDimensionAnimation};
pub use timeline::{LayerSpan, LayerTime, Timeline};
pub use transform::TransformAnimation;
pub use trim::{trim_path, trim_paths, MeasuredPath, TrimMode, TrimRanges, TrimWindow};
