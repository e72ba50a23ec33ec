//! Keyframes and validated keyframe tracks.

use tracing::trace;

use crate::animatable::Interpolatable;
use crate::config::EngineConfig;
use crate::easing::EasingCurve;
use crate::error::{LottieError, Result};
use crate::motion_path::{MotionPath, SpatialTangents};
use crate::timeline::Timeline;

const FRAME_TOLERANCE: f32 = 1e-3;

/// One unit of an animated property's timeline.
///
/// A keyframe without `interpolation` is held: it keeps `start_value` for its
/// whole span. `end_value` falls back to `start_value` when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe<T> {
    pub start_value: Option<T>,
    pub end_value: Option<T>,
    pub interpolation: Option<EasingCurve>,
    pub start_frame: f32,
    pub end_frame: Option<f32>,
    pub spatial_tangents: Option<SpatialTangents>,
}

impl<T> Keyframe<T> {
    pub fn new(start_frame: f32, start_value: T, end_value: T, interpolation: EasingCurve) -> Self {
        Self {
            start_value: Some(start_value),
            end_value: Some(end_value),
            interpolation: Some(interpolation),
            start_frame,
            end_frame: None,
            spatial_tangents: None,
        }
    }

    pub fn linear(start_frame: f32, start_value: T, end_value: T) -> Self {
        Self::new(start_frame, start_value, end_value, EasingCurve::LINEAR)
    }

    pub fn hold(start_frame: f32, value: T) -> Self {
        Self {
            start_value: Some(value),
            end_value: None,
            interpolation: None,
            start_frame,
            end_frame: None,
            spatial_tangents: None,
        }
    }

    pub fn with_end_frame(mut self, end_frame: f32) -> Self {
        self.end_frame = Some(end_frame);
        self
    }

    pub fn with_spatial_tangents(mut self, tangents: SpatialTangents) -> Self {
        self.spatial_tangents = Some(tangents);
        self
    }

    pub fn is_static(&self) -> bool {
        self.interpolation.is_none()
    }
}

/// A keyframe with its span resolved onto the composition progress axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry<T> {
    start_value: T,
    end_value: Option<T>,
    interpolation: Option<EasingCurve>,
    start_frame: f32,
    end_frame: Option<f32>,
    start_progress: f32,
    end_progress: f32,
    motion_path: Option<MotionPath>,
}

impl<T: Interpolatable> TrackEntry<T> {
    pub fn start_frame(&self) -> f32 {
        self.start_frame
    }

    pub fn end_frame(&self) -> Option<f32> {
        self.end_frame
    }

    pub fn start_progress(&self) -> f32 {
        self.start_progress
    }

    pub fn end_progress(&self) -> f32 {
        self.end_progress
    }

    pub fn interpolation(&self) -> Option<&EasingCurve> {
        self.interpolation.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.interpolation.is_none()
    }

    pub fn motion_path(&self) -> Option<&MotionPath> {
        self.motion_path.as_ref()
    }

    pub fn start_value(&self) -> &T {
        &self.start_value
    }

    pub fn end_value(&self) -> &T {
        self.end_value.as_ref().unwrap_or(&self.start_value)
    }

    /// Progress into this keyframe before easing; 0 for held keyframes.
    pub fn linear_progress(&self, progress: f32) -> f32 {
        if self.is_static() {
            return 0.0;
        }
        let span = self.end_progress - self.start_progress;
        if span <= 0.0 {
            return 1.0;
        }
        ((progress - self.start_progress) / span).clamp(0.0, 1.0)
    }

    pub fn eased_progress(&self, linear: f32) -> f32 {
        match &self.interpolation {
            Some(curve) => curve.apply(linear),
            None => 0.0,
        }
    }

    /// The kind-specific value function.
    pub fn interpolate(&self, eased: f32) -> T {
        if self.is_static() {
            return self.start_value.clone();
        }
        self.start_value
            .lerp_spatial(self.end_value(), eased, self.motion_path.as_ref())
    }
}

/// The immutable, validated keyframe list of one property.
///
/// Shared between evaluator instances behind an `Arc`; evaluators keep their
/// own cursor and resolved value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T> {
    entries: Vec<TrackEntry<T>>,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Validate `keyframes` and resolve their spans against `timeline`.
    pub fn new(keyframes: Vec<Keyframe<T>>, timeline: &Timeline) -> Result<Self> {
        Self::with_config(keyframes, timeline, &EngineConfig::default())
    }

    pub fn with_config(
        mut keyframes: Vec<Keyframe<T>>,
        timeline: &Timeline,
        config: &EngineConfig,
    ) -> Result<Self> {
        if keyframes.is_empty() {
            return Err(LottieError::EmptyKeyframes);
        }

        for index in 1..keyframes.len() {
            let previous = keyframes[index - 1].start_frame;
            let frame = keyframes[index].start_frame;
            if frame < previous {
                return Err(LottieError::NonMonotonicKeyframes {
                    index,
                    frame,
                    previous,
                });
            }
        }

        let len = keyframes.len();
        for index in 0..len {
            let next_start = keyframes.get(index + 1).map(|next| next.start_frame);
            let kf = &mut keyframes[index];
            match (kf.end_frame, next_start) {
                (None, Some(next_start)) => kf.end_frame = Some(next_start),
                (Some(end), Some(next_start)) if (end - next_start).abs() > FRAME_TOLERANCE => {
                    return Err(LottieError::DiscontiguousKeyframes {
                        index,
                        end,
                        next_start,
                    });
                }
                _ => {}
            }
            if let Some(end) = kf.end_frame {
                if end < kf.start_frame {
                    return Err(LottieError::NonMonotonicKeyframes {
                        index,
                        frame: end,
                        previous: kf.start_frame,
                    });
                }
            }
            if let (Some(start), Some(end)) = (&kf.start_value, &kf.end_value) {
                start.check_pair(end)?;
            }
        }

        let entries = keyframes
            .into_iter()
            .enumerate()
            .map(|(index, keyframe)| {
                let Keyframe {
                    start_value,
                    end_value,
                    interpolation,
                    start_frame,
                    end_frame,
                    spatial_tangents,
                } = keyframe;
                let start_value = start_value.ok_or(LottieError::MissingStartValue { index })?;
                let start_progress = timeline.progress_at_frame(start_frame);
                let end_progress = match end_frame {
                    Some(end) => timeline.progress_at_frame(end),
                    None => start_progress.max(1.0),
                };
                let motion_path = match (&end_value, &spatial_tangents, &interpolation) {
                    (Some(end), Some(tangents), Some(_)) => {
                        T::motion_path(&start_value, end, tangents, config.arclen_accuracy)
                    }
                    _ => None,
                };
                Ok(TrackEntry {
                    start_value,
                    end_value,
                    interpolation,
                    start_frame,
                    end_frame,
                    start_progress,
                    end_progress,
                    motion_path,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// A single held value covering the whole timeline.
    pub fn constant(value: T) -> Self {
        Self {
            entries: vec![TrackEntry {
                start_value: value,
                end_value: None,
                interpolation: None,
                start_frame: 0.0,
                end_frame: None,
                start_progress: 0.0,
                end_progress: 1.0,
                motion_path: None,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TrackEntry<T>] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &TrackEntry<T> {
        &self.entries[index]
    }

    /// True when every keyframe is held at one value.
    pub fn is_constant(&self) -> bool {
        self.entries.len() == 1 && self.entries[0].is_static()
    }

    pub fn start_progress(&self) -> f32 {
        self.entries[0].start_progress
    }

    pub fn end_progress(&self) -> f32 {
        self.entries[self.entries.len() - 1].end_progress
    }

    /// Clamp into the span covered by the keyframes.
    pub fn clamp_progress(&self, progress: f32) -> f32 {
        let (start, end) = (self.start_progress(), self.end_progress());
        if progress.is_nan() || progress < start {
            start
        } else if progress > end {
            end
        } else {
            progress
        }
    }

    /// Whether keyframe `index` is active at `progress`. Spans are half-open
    /// except the last one, which includes its end.
    pub fn contains(&self, index: usize, progress: f32) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        if index + 1 == self.entries.len() {
            return progress >= entry.start_progress;
        }
        progress >= entry.start_progress && progress < entry.end_progress
    }

    /// Index of the active keyframe for an already clamped progress.
    ///
    /// `hint` is the previously active keyframe; it and its successor are
    /// checked first since playback mostly moves forward.
    pub fn locate(&self, progress: f32, hint: usize) -> usize {
        if self.contains(hint, progress) {
            return hint;
        }
        if self.contains(hint + 1, progress) {
            return hint + 1;
        }
        trace!(progress, hint, "keyframe cache miss");
        self.entries
            .iter()
            .rposition(|entry| entry.start_progress <= progress)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> Timeline {
        Timeline::new(0.0, 100.0, 30.0).unwrap()
    }

    fn ramp() -> KeyframeTrack<f32> {
        KeyframeTrack::new(
            vec![
                Keyframe::linear(0.0, 0.0, 10.0),
                Keyframe::linear(25.0, 10.0, 20.0),
                Keyframe::hold(50.0, 20.0),
                Keyframe::linear(75.0, 20.0, 40.0).with_end_frame(100.0),
            ],
            &timeline(),
        )
        .unwrap()
    }

    #[test]
    fn test_spans_are_contiguous_progress_intervals() {
        let track = ramp();
        let spans: Vec<(f32, f32)> = track
            .entries()
            .iter()
            .map(|e| (e.start_progress(), e.end_progress()))
            .collect();
        assert_eq!(
            spans,
            vec![(0.0, 0.25), (0.25, 0.5), (0.5, 0.75), (0.75, 1.0)]
        );
    }

    #[test]
    fn test_locate_matches_binary_search() {
        let track = ramp();
        for hint in 0..track.len() {
            for i in 0..=200 {
                let p = i as f32 / 200.0;
                let expected = track
                    .entries()
                    .partition_point(|e| e.start_progress() <= p)
                    .saturating_sub(1);
                assert_eq!(track.locate(p, hint), expected, "p={p} hint={hint}");
            }
        }
    }

    #[test]
    fn test_open_last_keyframe_extends_to_end() {
        let track = KeyframeTrack::new(vec![Keyframe::hold(40.0, 1.0f32)], &timeline()).unwrap();
        assert_eq!(track.start_progress(), 0.4);
        assert_eq!(track.end_progress(), 1.0);
        assert_eq!(track.clamp_progress(0.1), 0.4);
    }

    #[test]
    fn test_rejects_empty_and_unordered() {
        let empty: Vec<Keyframe<f32>> = Vec::new();
        assert!(matches!(
            KeyframeTrack::new(empty, &timeline()),
            Err(LottieError::EmptyKeyframes)
        ));

        let unordered = vec![
            Keyframe::linear(10.0, 0.0f32, 1.0),
            Keyframe::linear(5.0, 1.0, 2.0),
        ];
        assert!(matches!(
            KeyframeTrack::new(unordered, &timeline()),
            Err(LottieError::NonMonotonicKeyframes { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_gaps_between_keyframes() {
        let gap = vec![
            Keyframe::linear(0.0, 0.0f32, 1.0).with_end_frame(10.0),
            Keyframe::linear(20.0, 1.0, 2.0),
        ];
        assert!(matches!(
            KeyframeTrack::new(gap, &timeline()),
            Err(LottieError::DiscontiguousKeyframes { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_missing_start_value() {
        let mut kf = Keyframe::linear(0.0, 0.0f32, 1.0);
        kf.start_value = None;
        assert!(matches!(
            KeyframeTrack::new(vec![kf], &timeline()),
            Err(LottieError::MissingStartValue { index: 0 })
        ));
    }

    #[test]
    fn test_held_keyframe_has_zero_local_progress() {
        let track = ramp();
        let held = track.entry(2);
        assert_eq!(held.linear_progress(0.6), 0.0);
        assert_eq!(held.interpolate(0.9), 20.0);
    }

    #[test]
    fn test_end_value_falls_back_to_start() {
        let mut kf = Keyframe::linear(0.0, 5.0f32, 5.0);
        kf.end_value = None;
        let track = KeyframeTrack::new(vec![kf], &timeline()).unwrap();
        assert_eq!(track.entry(0).interpolate(0.5), 5.0);
    }
}
