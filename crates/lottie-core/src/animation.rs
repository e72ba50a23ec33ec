//! The generic keyframe evaluator.
//!
//! A [`KeyframeAnimation`] is the per-instance half of an animated property:
//! it points at a shared [`KeyframeTrack`] and owns the mutable bits (current
//! progress, the last active keyframe, the resolved value and a dirty flag).
//! Many evaluators can run over one track at once.

use std::fmt;
use std::sync::Arc;

use glam::Vec2;

use crate::animatable::{Interpolatable, ScaleXY};
use crate::callback::{FrameInfo, ValueCallback};
use crate::color::{Color, GradientColor};
use crate::keyframe::{KeyframeTrack, TrackEntry};
use crate::path_morph::PathVertexData;

pub type FloatAnimation = KeyframeAnimation<f32>;
pub type IntegerAnimation = KeyframeAnimation<i32>;
pub type ColorAnimation = KeyframeAnimation<Color>;
pub type GradientAnimation = KeyframeAnimation<GradientColor>;
pub type PointAnimation = KeyframeAnimation<Vec2>;
pub type ScaleAnimation = KeyframeAnimation<ScaleXY>;
pub type ShapeAnimation = KeyframeAnimation<PathVertexData>;

#[derive(Clone)]
pub struct KeyframeAnimation<T: Interpolatable> {
    track: Arc<KeyframeTrack<T>>,
    progress: f32,
    cursor: usize,
    value: T,
    changed: bool,
    callback: Option<Arc<dyn ValueCallback<T>>>,
}

impl<T: Interpolatable + fmt::Debug> fmt::Debug for KeyframeAnimation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyframeAnimation")
            .field("keyframes", &self.track.len())
            .field("progress", &self.progress)
            .field("cursor", &self.cursor)
            .field("value", &self.value)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl<T: Interpolatable> KeyframeAnimation<T> {
    /// New evaluator positioned at the track's first keyframe.
    pub fn new(track: Arc<KeyframeTrack<T>>) -> Self {
        let progress = track.start_progress();
        let value = track.entry(0).start_value().clone();
        let mut animation = Self {
            track,
            progress,
            cursor: 0,
            value,
            changed: false,
            callback: None,
        };
        animation.value = animation.evaluate(0, progress);
        animation
    }

    /// Evaluator over a single held value.
    pub fn constant(value: T) -> Self {
        Self::new(Arc::new(KeyframeTrack::constant(value)))
    }

    pub fn track(&self) -> &Arc<KeyframeTrack<T>> {
        &self.track
    }

    /// The clamped progress last pushed in.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_constant(&self) -> bool {
        self.track.is_constant() && self.callback.is_none()
    }

    pub fn set_progress(&mut self, progress: f32) {
        let progress = self.track.clamp_progress(progress);
        if progress == self.progress {
            return;
        }
        let index = self.track.locate(progress, self.cursor);
        let stays_held =
            index == self.cursor && self.track.entry(index).is_static() && self.callback.is_none();
        self.progress = progress;
        self.cursor = index;
        if stays_held {
            return;
        }
        let value = self.evaluate(index, progress);
        self.store(value);
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Value at another progress without touching this evaluator's state.
    pub fn value_at(&self, progress: f32) -> T {
        let progress = self.track.clamp_progress(progress);
        let index = self.track.locate(progress, self.cursor);
        self.evaluate(index, progress)
    }

    /// Returns and clears the dirty flag.
    pub fn did_change(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn is_dirty(&self) -> bool {
        self.changed
    }

    pub fn active_keyframe(&self) -> &TrackEntry<T> {
        self.track.entry(self.cursor)
    }

    pub fn linear_progress(&self) -> f32 {
        self.active_keyframe().linear_progress(self.progress)
    }

    pub fn eased_progress(&self) -> f32 {
        let entry = self.active_keyframe();
        entry.eased_progress(entry.linear_progress(self.progress))
    }

    /// Attach, replace or (with `None`) remove the override hook. The cached
    /// value is recomputed immediately.
    pub fn set_value_callback(&mut self, callback: Option<Arc<dyn ValueCallback<T>>>) {
        self.callback = callback;
        let value = self.evaluate(self.cursor, self.progress);
        self.store(value);
    }

    pub fn set_callback(&mut self, callback: impl ValueCallback<T> + 'static) {
        self.set_value_callback(Some(Arc::new(callback)));
    }

    pub fn clear_value_callback(&mut self) {
        self.set_value_callback(None);
    }

    pub fn has_value_callback(&self) -> bool {
        self.callback.is_some()
    }

    fn store(&mut self, value: T) {
        if value != self.value {
            self.value = value;
            self.changed = true;
        }
    }

    fn evaluate(&self, index: usize, progress: f32) -> T {
        let entry = self.track.entry(index);
        let linear = entry.linear_progress(progress);
        let eased = entry.eased_progress(linear);
        let computed = entry.interpolate(eased);
        let Some(callback) = &self.callback else {
            return computed;
        };
        let info = FrameInfo {
            start_frame: entry.start_frame(),
            end_frame: entry.end_frame().unwrap_or(entry.start_frame()),
            start_value: entry.start_value(),
            end_value: entry.end_value(),
            linear_progress: linear,
            eased_progress: eased,
            overall_progress: progress,
            computed: &computed,
        };
        let replaced = callback.value(&info);
        replaced.unwrap_or(computed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::callback::{ConstantValue, RelativeFloat};
    use crate::easing::EasingCurve;
    use crate::keyframe::Keyframe;
    use crate::timeline::Timeline;

    fn timeline() -> Timeline {
        Timeline::new(0.0, 100.0, 30.0).unwrap()
    }

    fn track(keyframes: Vec<Keyframe<f32>>) -> Arc<KeyframeTrack<f32>> {
        Arc::new(KeyframeTrack::new(keyframes, &timeline()).unwrap())
    }

    #[test]
    fn test_single_static_keyframe_everywhere() {
        let mut anim = FloatAnimation::new(track(vec![Keyframe::hold(0.0, 42.0)]));
        for i in 0..=10 {
            anim.set_progress(i as f32 / 10.0);
            assert_eq!(*anim.value(), 42.0);
        }
        assert!(!anim.did_change());
    }

    #[test]
    fn test_clamps_outside_keyframe_span() {
        let mut anim = FloatAnimation::new(track(vec![
            Keyframe::linear(20.0, 10.0, 30.0).with_end_frame(60.0),
        ]));
        anim.set_progress(0.0);
        assert_eq!(*anim.value(), 10.0);
        anim.set_progress(1.0);
        assert_eq!(*anim.value(), 30.0);
        anim.set_progress(0.4);
        assert!((*anim.value() - 20.0).abs() < 1e-4);
        assert!((anim.linear_progress() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_easing_is_applied_to_local_progress() {
        let ease = EasingCurve::new(Vec2::new(0.42, 0.0), Vec2::new(1.0, 1.0));
        let mut anim = FloatAnimation::new(track(vec![
            Keyframe::new(0.0, 0.0, 100.0, ease).with_end_frame(100.0),
        ]));
        anim.set_progress(0.25);
        assert!(*anim.value() < 25.0);
        assert_eq!(anim.eased_progress(), ease.apply(0.25));
    }

    #[test]
    fn test_did_change_only_when_value_moves() {
        let mut anim = FloatAnimation::new(track(vec![
            Keyframe::linear(0.0, 0.0, 10.0),
            Keyframe::hold(50.0, 10.0),
        ]));
        anim.set_progress(0.25);
        assert!(anim.did_change());
        assert!(!anim.did_change());

        anim.set_progress(0.5);
        assert!(anim.did_change());
        anim.set_progress(0.75);
        assert!(!anim.did_change());
        anim.set_progress(0.9);
        assert!(!anim.did_change());
    }

    #[test]
    fn test_backwards_seek_matches_fresh_evaluator() {
        let shared = track(vec![
            Keyframe::linear(0.0, 0.0, 10.0),
            Keyframe::linear(30.0, 10.0, 50.0),
            Keyframe::linear(60.0, 50.0, 0.0).with_end_frame(100.0),
        ]);
        let mut scrubbed = FloatAnimation::new(shared.clone());
        scrubbed.set_progress(0.95);
        scrubbed.set_progress(0.1);
        let fresh = FloatAnimation::new(shared);
        assert_eq!(*scrubbed.value(), fresh.value_at(0.1));
        assert_eq!(scrubbed.active_keyframe().start_frame(), 0.0);
    }

    #[test]
    fn test_value_at_is_pure() {
        let mut anim = FloatAnimation::new(track(vec![
            Keyframe::linear(0.0, 0.0, 100.0).with_end_frame(100.0),
        ]));
        anim.set_progress(0.5);
        anim.did_change();
        assert_eq!(anim.value_at(0.75), 75.0);
        assert_eq!(*anim.value(), 50.0);
        assert!(!anim.did_change());
    }

    #[test]
    fn test_callback_overrides_and_swaps_invalidate() {
        let mut anim = FloatAnimation::new(track(vec![
            Keyframe::linear(0.0, 0.0, 100.0).with_end_frame(100.0),
        ]));
        anim.set_progress(0.5);
        anim.did_change();

        anim.set_callback(RelativeFloat { offset: 5.0 });
        assert_eq!(*anim.value(), 55.0);
        assert!(anim.did_change());

        anim.set_callback(ConstantValue(-1.0f32));
        assert_eq!(*anim.value(), -1.0);

        anim.clear_value_callback();
        assert_eq!(*anim.value(), 50.0);
    }

    #[test]
    fn test_declining_callback_keeps_computed_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut anim = FloatAnimation::new(track(vec![
            Keyframe::linear(0.0, 0.0, 100.0).with_end_frame(100.0),
        ]));
        anim.set_callback(move |info: &FrameInfo<'_, f32>| -> Option<f32> {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(*info.start_value, 0.0);
            assert_eq!(*info.end_value, 100.0);
            assert_eq!(info.end_frame, 100.0);
            None
        });
        anim.set_progress(0.3);
        assert!((*anim.value() - 30.0).abs() < 1e-4);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_callback_runs_inside_held_keyframes() {
        let mut anim = FloatAnimation::new(track(vec![Keyframe::hold(0.0, 1.0)]));
        anim.set_callback(|info: &FrameInfo<'_, f32>| -> Option<f32> {
            Some(info.overall_progress)
        });
        anim.set_progress(0.5);
        assert_eq!(*anim.value(), 0.5);
    }

    #[test]
    fn test_shared_track_independent_state() {
        let shared = track(vec![Keyframe::linear(0.0, 0.0, 100.0).with_end_frame(100.0)]);
        let mut a = FloatAnimation::new(shared.clone());
        let mut b = FloatAnimation::new(shared.clone());
        a.set_progress(0.2);
        b.set_progress(0.8);
        assert_eq!(*a.value(), 20.0);
        assert_eq!(*b.value(), 80.0);
        assert_eq!(Arc::strong_count(&shared), 3);
    }
}
