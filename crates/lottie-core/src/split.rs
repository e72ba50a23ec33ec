//! Points whose axes animate on their own keyframes.

use std::sync::Arc;

use glam::Vec2;

use crate::animation::{FloatAnimation, PointAnimation};
use crate::callback::{FrameInfo, ValueCallback};

/// Two scalar evaluators combined into a point. Each axis keeps its own
/// keyframe timing and easing.
#[derive(Clone)]
pub struct SplitDimensionAnimation {
    x: FloatAnimation,
    y: FloatAnimation,
    value: Vec2,
    changed: bool,
    callback: Option<Arc<dyn ValueCallback<Vec2>>>,
}

impl std::fmt::Debug for SplitDimensionAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitDimensionAnimation")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("value", &self.value)
            .finish()
    }
}

impl SplitDimensionAnimation {
    pub fn new(x: FloatAnimation, y: FloatAnimation) -> Self {
        let value = Vec2::new(*x.value(), *y.value());
        Self {
            x,
            y,
            value,
            changed: false,
            callback: None,
        }
    }

    pub fn x(&self) -> &FloatAnimation {
        &self.x
    }

    pub fn y(&self) -> &FloatAnimation {
        &self.y
    }

    /// Per-axis access, e.g. to hook a single axis.
    pub fn x_mut(&mut self) -> &mut FloatAnimation {
        &mut self.x
    }

    pub fn y_mut(&mut self) -> &mut FloatAnimation {
        &mut self.y
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.x.set_progress(progress);
        self.y.set_progress(progress);
        let axes_changed = self.x.did_change() | self.y.did_change();
        if axes_changed || self.callback.is_some() {
            let value = self.compose(*self.x.value(), *self.y.value(), progress);
            self.store(value);
        }
    }

    pub fn value(&self) -> Vec2 {
        self.value
    }

    pub fn value_at(&self, progress: f32) -> Vec2 {
        self.compose(self.x.value_at(progress), self.y.value_at(progress), progress)
    }

    pub fn did_change(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn set_value_callback(&mut self, callback: Option<Arc<dyn ValueCallback<Vec2>>>) {
        self.callback = callback;
        let value = self.compose(*self.x.value(), *self.y.value(), self.x.progress());
        self.store(value);
    }

    fn store(&mut self, value: Vec2) {
        if value != self.value {
            self.value = value;
            self.changed = true;
        }
    }

    /// The hook sees the x axis' keyframe timing and both axes' values.
    fn compose(&self, x: f32, y: f32, progress: f32) -> Vec2 {
        let computed = Vec2::new(x, y);
        let Some(callback) = &self.callback else {
            return computed;
        };
        let x_key = self.x.active_keyframe();
        let y_key = self.y.active_keyframe();
        let start = Vec2::new(*x_key.start_value(), *y_key.start_value());
        let end = Vec2::new(*x_key.end_value(), *y_key.end_value());
        let info = FrameInfo {
            start_frame: x_key.start_frame(),
            end_frame: x_key.end_frame().unwrap_or(x_key.start_frame()),
            start_value: &start,
            end_value: &end,
            linear_progress: self.x.linear_progress(),
            eased_progress: self.x.eased_progress(),
            overall_progress: progress,
            computed: &computed,
        };
        let replaced = callback.value(&info);
        replaced.unwrap_or(computed)
    }
}

/// A position property in either of its two document forms.
#[derive(Debug, Clone)]
pub enum PositionAnimation {
    Unified(PointAnimation),
    Split(SplitDimensionAnimation),
}

impl PositionAnimation {
    pub fn set_progress(&mut self, progress: f32) {
        match self {
            PositionAnimation::Unified(anim) => anim.set_progress(progress),
            PositionAnimation::Split(anim) => anim.set_progress(progress),
        }
    }

    pub fn value(&self) -> Vec2 {
        match self {
            PositionAnimation::Unified(anim) => *anim.value(),
            PositionAnimation::Split(anim) => anim.value(),
        }
    }

    pub fn value_at(&self, progress: f32) -> Vec2 {
        match self {
            PositionAnimation::Unified(anim) => anim.value_at(progress),
            PositionAnimation::Split(anim) => anim.value_at(progress),
        }
    }

    pub fn did_change(&mut self) -> bool {
        match self {
            PositionAnimation::Unified(anim) => anim.did_change(),
            PositionAnimation::Split(anim) => anim.did_change(),
        }
    }

    pub fn set_value_callback(&mut self, callback: Option<Arc<dyn ValueCallback<Vec2>>>) {
        match self {
            PositionAnimation::Unified(anim) => anim.set_value_callback(callback),
            PositionAnimation::Split(anim) => anim.set_value_callback(callback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::RelativePoint;
    use crate::easing::EasingCurve;
    use crate::keyframe::{Keyframe, KeyframeTrack};
    use crate::timeline::Timeline;

    fn axis(keyframes: Vec<Keyframe<f32>>) -> FloatAnimation {
        let timeline = Timeline::new(0.0, 100.0, 30.0).unwrap();
        FloatAnimation::new(Arc::new(KeyframeTrack::new(keyframes, &timeline).unwrap()))
    }

    fn split() -> SplitDimensionAnimation {
        SplitDimensionAnimation::new(
            axis(vec![Keyframe::linear(0.0, 0.0, 100.0).with_end_frame(100.0)]),
            axis(vec![
                Keyframe::hold(0.0, 5.0),
                Keyframe::new(
                    50.0,
                    5.0,
                    50.0,
                    EasingCurve::new(Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0)),
                )
                .with_end_frame(100.0),
            ]),
        )
    }

    #[test]
    fn test_axes_keep_their_own_timing() {
        let mut anim = split();
        anim.set_progress(0.25);
        assert_eq!(anim.value(), Vec2::new(25.0, 5.0));
        anim.set_progress(1.0);
        assert_eq!(anim.value(), Vec2::new(100.0, 50.0));
        assert!(anim.did_change());
        assert!(!anim.did_change());
    }

    #[test]
    fn test_value_at_matches_set_progress() {
        let mut anim = split();
        let expected = anim.value_at(0.8);
        anim.set_progress(0.8);
        assert_eq!(anim.value(), expected);
    }

    #[test]
    fn test_point_callback_on_split_axes() {
        let mut anim = split();
        anim.set_progress(0.5);
        anim.set_value_callback(Some(Arc::new(RelativePoint {
            offset: Vec2::new(1.0, 1.0),
        })));
        assert_eq!(anim.value(), Vec2::new(51.0, 6.0));
    }

    #[test]
    fn test_position_forms_share_one_surface() {
        let mut unified = PositionAnimation::Unified(PointAnimation::constant(Vec2::new(3.0, 4.0)));
        unified.set_progress(0.7);
        assert_eq!(unified.value(), Vec2::new(3.0, 4.0));
        assert!(!unified.did_change());

        let mut split = PositionAnimation::Split(split());
        split.set_progress(0.5);
        assert_eq!(split.value(), Vec2::new(50.0, 5.0));
    }
}
