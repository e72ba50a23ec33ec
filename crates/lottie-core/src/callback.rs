//! Value override hooks.
//!
//! A hook sees everything the evaluator computed for the current frame and
//! may return a replacement. Returning `None` keeps the computed value.

use glam::Vec2;

use crate::animatable::Interpolatable;
use crate::easing::EasingCurve;

/// Evaluation context handed to a [`ValueCallback`].
#[derive(Debug)]
pub struct FrameInfo<'a, T> {
    pub start_frame: f32,
    pub end_frame: f32,
    pub start_value: &'a T,
    pub end_value: &'a T,
    /// Progress into the active keyframe before easing.
    pub linear_progress: f32,
    /// Progress into the active keyframe after easing.
    pub eased_progress: f32,
    /// Progress on the composition timeline.
    pub overall_progress: f32,
    /// What the evaluator would return without the hook.
    pub computed: &'a T,
}

pub trait ValueCallback<T>: Send + Sync {
    fn value(&self, info: &FrameInfo<'_, T>) -> Option<T>;
}

impl<T, F> ValueCallback<T> for F
where
    F: Fn(&FrameInfo<'_, T>) -> Option<T> + Send + Sync,
{
    fn value(&self, info: &FrameInfo<'_, T>) -> Option<T> {
        self(info)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantValue<T>(pub T);

impl<T: Clone + Send + Sync> ValueCallback<T> for ConstantValue<T> {
    fn value(&self, _info: &FrameInfo<'_, T>) -> Option<T> {
        Some(self.0.clone())
    }
}

/// Adds a fixed offset to the computed scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeFloat {
    pub offset: f32,
}

impl ValueCallback<f32> for RelativeFloat {
    fn value(&self, info: &FrameInfo<'_, f32>) -> Option<f32> {
        Some(*info.computed + self.offset)
    }
}

/// Adds a fixed offset to the computed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativePoint {
    pub offset: Vec2,
}

impl ValueCallback<Vec2> for RelativePoint {
    fn value(&self, info: &FrameInfo<'_, Vec2>) -> Option<Vec2> {
        Some(*info.computed + self.offset)
    }
}

/// Animates between its own two values over the whole timeline, ignoring
/// the document's keyframes.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedValue<T> {
    pub start: T,
    pub end: T,
    pub easing: EasingCurve,
}

impl<T> InterpolatedValue<T> {
    pub fn new(start: T, end: T) -> Self {
        Self {
            start,
            end,
            easing: EasingCurve::LINEAR,
        }
    }

    pub fn with_easing(mut self, easing: EasingCurve) -> Self {
        self.easing = easing;
        self
    }
}

impl<T: Interpolatable> ValueCallback<T> for InterpolatedValue<T> {
    fn value(&self, info: &FrameInfo<'_, T>) -> Option<T> {
        let t = self.easing.apply(info.overall_progress.clamp(0.0, 1.0));
        Some(self.start.lerp(&self.end, t))
    }
}
