//! Layer and shape transforms.
//!
//! Composition order is fixed:
//! `translate(position) · rotate · skew · scale · translate(-anchor)`.
//! Rotation about X/Y is flattened onto the plane by scaling the opposite
//! axis with the cosine of the angle; Z stays an exact 2D rotation.

use glam::{Mat3, Vec2, Vec3};

use crate::animatable::ScaleXY;
use crate::animation::{FloatAnimation, KeyframeAnimation, PointAnimation, ScaleAnimation};
use crate::split::PositionAnimation;

/// Every sub-property is optional; a missing one leaves its step out.
#[derive(Debug, Clone, Default)]
pub struct TransformAnimation {
    pub anchor: Option<PointAnimation>,
    pub position: Option<PositionAnimation>,
    pub scale: Option<ScaleAnimation>,
    /// Degrees, clockwise on screen.
    pub rotation: Option<FloatAnimation>,
    pub rotation_x: Option<FloatAnimation>,
    pub rotation_y: Option<FloatAnimation>,
    /// Static X/Y/Z orientation in degrees, added to the axis rotations.
    pub orientation: Option<KeyframeAnimation<Vec3>>,
    /// Skew magnitude in degrees.
    pub skew: Option<FloatAnimation>,
    /// Skew axis in degrees.
    pub skew_angle: Option<FloatAnimation>,
    /// Percent.
    pub opacity: Option<FloatAnimation>,
    /// Repeater-only: opacity of the first copy, percent.
    pub start_opacity: Option<FloatAnimation>,
    /// Repeater-only: opacity of the last copy, percent.
    pub end_opacity: Option<FloatAnimation>,
    pub auto_orient: bool,
    pub auto_orient_epsilon: f32,
    /// Last progress pushed through `set_progress`, unclamped by any track.
    progress: f32,
}

macro_rules! each_property {
    ($self:ident, $anim:ident => $body:expr) => {{
        if let Some($anim) = $self.anchor.as_mut() { $body; }
        if let Some($anim) = $self.position.as_mut() { $body; }
        if let Some($anim) = $self.scale.as_mut() { $body; }
        if let Some($anim) = $self.rotation.as_mut() { $body; }
        if let Some($anim) = $self.rotation_x.as_mut() { $body; }
        if let Some($anim) = $self.rotation_y.as_mut() { $body; }
        if let Some($anim) = $self.orientation.as_mut() { $body; }
        if let Some($anim) = $self.skew.as_mut() { $body; }
        if let Some($anim) = $self.skew_angle.as_mut() { $body; }
        if let Some($anim) = $self.opacity.as_mut() { $body; }
        if let Some($anim) = $self.start_opacity.as_mut() { $body; }
        if let Some($anim) = $self.end_opacity.as_mut() { $body; }
    }};
}

impl TransformAnimation {
    pub fn new() -> Self {
        Self {
            auto_orient_epsilon: 1e-4,
            ..Self::default()
        }
    }

    pub fn with_auto_orient(mut self, epsilon: f32) -> Self {
        self.auto_orient = true;
        self.auto_orient_epsilon = epsilon;
        self
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress;
        each_property!(self, anim => anim.set_progress(progress));
    }

    /// True if any sub-property changed since the last call. Clears every flag.
    pub fn did_change(&mut self) -> bool {
        let mut changed = false;
        each_property!(self, anim => changed |= anim.did_change());
        changed
    }

    /// Push `progress` through and return the matrix and opacity.
    pub fn matrix_for(&mut self, progress: f32) -> (Mat3, f32) {
        self.set_progress(progress);
        (self.matrix(), self.opacity())
    }

    /// Opacity in [0,1].
    pub fn opacity(&self) -> f32 {
        percent(self.opacity.as_ref(), 100.0)
    }

    /// Matrix from the values at the current progress.
    pub fn matrix(&self) -> Mat3 {
        let mut matrix = Mat3::IDENTITY;

        let position = self.position();
        if position != Vec2::ZERO {
            matrix *= Mat3::from_translation(position);
        }

        matrix *= self.rotation_matrix();

        if let Some(skew) = self.skew_matrix() {
            matrix *= skew;
        }

        let scale = self.scale();
        if !scale.is_identity() {
            matrix *= Mat3::from_scale(scale.to_vec2());
        }

        let anchor = self.anchor();
        if anchor != Vec2::ZERO {
            matrix *= Mat3::from_translation(-anchor);
        }
        matrix
    }

    /// Matrix for repeater copy `amount` (copy index plus offset). Position and
    /// rotation scale linearly with `amount`, scale geometrically. Rotation
    /// and scale pivot on the anchor.
    pub fn matrix_for_repeater(&self, amount: f32) -> Mat3 {
        let position = self.position();
        let scale = self.scale();
        let rotation = self.value_of(self.rotation.as_ref(), 0.0);
        let anchor = self.anchor();

        let mut matrix = Mat3::from_translation(position * amount);
        matrix *= Mat3::from_translation(anchor);
        if rotation != 0.0 {
            matrix *= Mat3::from_angle((rotation * amount).to_radians());
        }
        matrix *= Mat3::from_scale(Vec2::new(
            scale.x.powf(amount),
            scale.y.powf(amount),
        ));
        matrix *= Mat3::from_translation(-anchor);
        matrix
    }

    /// Opacity of repeater copy `index` out of `copies`, blending start and
    /// end opacity.
    pub fn opacity_for_copy(&self, index: usize, copies: usize) -> f32 {
        let start = percent(self.start_opacity.as_ref(), 100.0);
        let end = percent(self.end_opacity.as_ref(), 100.0);
        if copies == 0 {
            return start;
        }
        start + (end - start) * (index as f32 / copies as f32)
    }

    pub fn position(&self) -> Vec2 {
        self.position.as_ref().map_or(Vec2::ZERO, |p| p.value())
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor.as_ref().map_or(Vec2::ZERO, |a| *a.value())
    }

    pub fn scale(&self) -> ScaleXY {
        self.scale.as_ref().map_or(ScaleXY::ONE, |s| *s.value())
    }

    /// Effective Z rotation in degrees, auto-orient included.
    pub fn rotation_degrees(&self) -> f32 {
        if self.auto_orient {
            if let Some(angle) = self.auto_orient_angle() {
                return angle;
            }
        }
        self.value_of(self.rotation.as_ref(), 0.0) + self.orientation_value().z
    }

    /// Heading of the position's motion, sampled a small step ahead.
    fn auto_orient_angle(&self) -> Option<f32> {
        let position = self.position.as_ref()?;
        let progress = self.progress;
        let here = position.value();
        let ahead = position.value_at(progress + self.auto_orient_epsilon);
        let delta = ahead - here;
        if delta == Vec2::ZERO {
            // Stalled, or clamped at the end of the path: look back instead.
            let behind = position.value_at(progress - self.auto_orient_epsilon);
            let delta = here - behind;
            if delta == Vec2::ZERO {
                return Some(0.0);
            }
            return Some(delta.y.atan2(delta.x).to_degrees());
        }
        Some(delta.y.atan2(delta.x).to_degrees())
    }

    fn rotation_matrix(&self) -> Mat3 {
        let orientation = self.orientation_value();
        let rx = self.value_of(self.rotation_x.as_ref(), 0.0) + orientation.x;
        let ry = self.value_of(self.rotation_y.as_ref(), 0.0) + orientation.y;
        let rz = self.rotation_degrees();

        let mut matrix = Mat3::IDENTITY;
        if rx != 0.0 || ry != 0.0 {
            matrix *= Mat3::from_scale(Vec2::new(
                ry.to_radians().cos(),
                rx.to_radians().cos(),
            ));
        }
        if rz != 0.0 {
            matrix *= Mat3::from_angle(rz.to_radians());
        }
        matrix
    }

    /// `rotate(-axis) · shear(tan(skew)) · rotate(axis)`, built as three
    /// matrices and concatenated.
    fn skew_matrix(&self) -> Option<Mat3> {
        let skew = self.skew.as_ref()?;
        let amount = *skew.value();
        let axis = self.value_of(self.skew_angle.as_ref(), 0.0);
        let theta = (90.0 - axis).to_radians();
        let (sin, cos) = theta.sin_cos();
        let tan = amount.to_radians().tan();

        let first = Mat3::from_cols(
            Vec3::new(cos, -sin, 0.0),
            Vec3::new(sin, cos, 0.0),
            Vec3::Z,
        );
        let shear = Mat3::from_cols(Vec3::new(1.0, tan, 0.0), Vec3::Y, Vec3::Z);
        let last = Mat3::from_cols(
            Vec3::new(cos, sin, 0.0),
            Vec3::new(-sin, cos, 0.0),
            Vec3::Z,
        );
        Some(last * shear * first)
    }

    fn orientation_value(&self) -> Vec3 {
        self.orientation.as_ref().map_or(Vec3::ZERO, |o| *o.value())
    }

    fn value_of(&self, anim: Option<&FloatAnimation>, default: f32) -> f32 {
        anim.map_or(default, |a| *a.value())
    }
}

fn percent(anim: Option<&FloatAnimation>, default: f32) -> f32 {
    (anim.map_or(default, |a| *a.value()) / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::keyframe::{Keyframe, KeyframeTrack};
    use crate::split::SplitDimensionAnimation;
    use crate::timeline::Timeline;

    fn timeline() -> Timeline {
        Timeline::new(0.0, 100.0, 30.0).unwrap()
    }

    fn moving(from: Vec2, to: Vec2) -> PositionAnimation {
        let track = KeyframeTrack::new(
            vec![Keyframe::linear(0.0, from, to).with_end_frame(100.0)],
            &timeline(),
        )
        .unwrap();
        PositionAnimation::Unified(PointAnimation::new(Arc::new(track)))
    }

    fn approx(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn test_position_only_translates() {
        let mut t = TransformAnimation::new();
        t.anchor = Some(PointAnimation::constant(Vec2::ZERO));
        t.position = Some(PositionAnimation::Unified(PointAnimation::constant(Vec2::new(
            10.0, 20.0,
        ))));
        t.scale = Some(ScaleAnimation::constant(ScaleXY::ONE));
        t.rotation = Some(FloatAnimation::constant(0.0));
        let (m, opacity) = t.matrix_for(0.5);
        assert_eq!(m.transform_point2(Vec2::ZERO), Vec2::new(10.0, 20.0));
        assert_eq!(opacity, 1.0);
    }

    #[test]
    fn test_composition_order() {
        let mut t = TransformAnimation::new();
        t.anchor = Some(PointAnimation::constant(Vec2::new(5.0, 0.0)));
        t.position = Some(PositionAnimation::Unified(PointAnimation::constant(Vec2::new(
            100.0, 100.0,
        ))));
        t.scale = Some(ScaleAnimation::constant(ScaleXY::new(2.0, 2.0)));
        t.rotation = Some(FloatAnimation::constant(90.0));
        let m = t.matrix();
        // The anchor lands on the position.
        assert!(approx(m.transform_point2(Vec2::new(5.0, 0.0)), Vec2::new(100.0, 100.0)));
        // +x is scaled by 2 then rotated clockwise on screen onto +y.
        assert!(approx(m.transform_point2(Vec2::new(6.0, 0.0)), Vec2::new(100.0, 102.0)));
    }

    #[test]
    fn test_opacity_is_percent() {
        let mut t = TransformAnimation::new();
        t.opacity = Some(FloatAnimation::constant(40.0));
        assert!((t.opacity() - 0.4).abs() < 1e-6);
        t.opacity = Some(FloatAnimation::constant(150.0));
        assert_eq!(t.opacity(), 1.0);
    }

    #[test]
    fn test_pseudo_3d_flattens_opposite_axis() {
        let mut t = TransformAnimation::new();
        t.rotation_x = Some(FloatAnimation::constant(60.0));
        let m = t.matrix();
        assert!(approx(m.transform_point2(Vec2::new(10.0, 10.0)), Vec2::new(10.0, 5.0)));

        t.rotation_x = None;
        t.rotation_y = Some(FloatAnimation::constant(60.0));
        let m = t.matrix();
        assert!(approx(m.transform_point2(Vec2::new(10.0, 10.0)), Vec2::new(5.0, 10.0)));
    }

    #[test]
    fn test_orientation_adds_to_rotation() {
        let mut t = TransformAnimation::new();
        t.orientation = Some(KeyframeAnimation::constant(Vec3::new(0.0, 0.0, 90.0)));
        assert_eq!(t.rotation_degrees(), 90.0);
        assert!(approx(t.matrix().transform_point2(Vec2::X), Vec2::Y));
    }

    #[test]
    fn test_skew_along_x_axis() {
        let mut t = TransformAnimation::new();
        t.skew = Some(FloatAnimation::constant(45.0));
        t.skew_angle = Some(FloatAnimation::constant(0.0));
        let m = t.matrix();
        // Points off the x axis shift along x; the x axis stays fixed.
        assert!(approx(m.transform_point2(Vec2::new(10.0, 0.0)), Vec2::new(10.0, 0.0)));
        let p = m.transform_point2(Vec2::new(0.0, 10.0));
        assert!((p.x.abs() - 10.0).abs() < 1e-3);
        assert!((p.y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_skew_is_identity() {
        let mut t = TransformAnimation::new();
        t.skew = Some(FloatAnimation::constant(0.0));
        t.skew_angle = Some(FloatAnimation::constant(30.0));
        let p = t.matrix().transform_point2(Vec2::new(3.0, 7.0));
        assert!(approx(p, Vec2::new(3.0, 7.0)));
    }

    #[test]
    fn test_auto_orient_along_x_axis() {
        let mut t = TransformAnimation::new().with_auto_orient(1e-4);
        t.position = Some(moving(Vec2::ZERO, Vec2::new(10.0, 0.0)));
        t.rotation = Some(FloatAnimation::constant(45.0));
        for i in 0..=10 {
            t.set_progress(i as f32 / 10.0);
            assert_eq!(t.rotation_degrees(), 0.0, "progress {}", i);
        }
    }

    #[test]
    fn test_auto_orient_follows_diagonal() {
        let mut t = TransformAnimation::new().with_auto_orient(1e-4);
        t.position = Some(moving(Vec2::ZERO, Vec2::new(10.0, 10.0)));
        t.set_progress(0.5);
        assert!((t.rotation_degrees() - 45.0).abs() < 0.5);
    }

    #[test]
    fn test_auto_orient_with_split_position() {
        let axis = |to: f32| {
            let track = KeyframeTrack::new(
                vec![Keyframe::linear(0.0, 0.0f32, to).with_end_frame(100.0)],
                &timeline(),
            )
            .unwrap();
            FloatAnimation::new(Arc::new(track))
        };
        let mut t = TransformAnimation::new().with_auto_orient(1e-4);
        t.position = Some(PositionAnimation::Split(SplitDimensionAnimation::new(
            axis(0.0),
            axis(50.0),
        )));
        t.set_progress(0.3);
        assert!((t.rotation_degrees() - 90.0).abs() < 0.5);
    }

    #[test]
    fn test_auto_orient_after_one_split_axis_settles() {
        let axis = |to: f32, end: f32| {
            let track = KeyframeTrack::new(
                vec![Keyframe::linear(0.0, 0.0f32, to).with_end_frame(end)],
                &timeline(),
            )
            .unwrap();
            FloatAnimation::new(Arc::new(track))
        };
        let mut t = TransformAnimation::new().with_auto_orient(1e-4);
        // X stops at frame 50, Y keeps moving down until frame 100.
        t.position = Some(PositionAnimation::Split(SplitDimensionAnimation::new(
            axis(10.0, 50.0),
            axis(10.0, 100.0),
        )));
        t.set_progress(0.75);
        assert!(approx(t.position(), Vec2::new(10.0, 7.5)));
        assert!((t.rotation_degrees() - 90.0).abs() < 0.5);
    }

    #[test]
    fn test_repeater_matrix_scales_with_amount() {
        let mut t = TransformAnimation::new();
        t.position = Some(PositionAnimation::Unified(PointAnimation::constant(Vec2::new(
            10.0, 0.0,
        ))));
        t.scale = Some(ScaleAnimation::constant(ScaleXY::new(0.5, 0.5)));
        let m0 = t.matrix_for_repeater(0.0);
        assert!(approx(m0.transform_point2(Vec2::new(4.0, 4.0)), Vec2::new(4.0, 4.0)));
        let m2 = t.matrix_for_repeater(2.0);
        assert!(approx(m2.transform_point2(Vec2::new(4.0, 4.0)), Vec2::new(21.0, 1.0)));
    }

    #[test]
    fn test_repeater_rotation_pivots_on_anchor() {
        let mut t = TransformAnimation::new();
        t.anchor = Some(PointAnimation::constant(Vec2::new(10.0, 10.0)));
        t.rotation = Some(FloatAnimation::constant(90.0));
        let m = t.matrix_for_repeater(1.0);
        assert!(approx(m.transform_point2(Vec2::new(10.0, 10.0)), Vec2::new(10.0, 10.0)));
        assert!(approx(m.transform_point2(Vec2::new(11.0, 10.0)), Vec2::new(10.0, 11.0)));
    }

    #[test]
    fn test_repeater_copy_opacity() {
        let mut t = TransformAnimation::new();
        t.start_opacity = Some(FloatAnimation::constant(100.0));
        t.end_opacity = Some(FloatAnimation::constant(0.0));
        assert_eq!(t.opacity_for_copy(0, 4), 1.0);
        assert_eq!(t.opacity_for_copy(2, 4), 0.5);
    }

    #[test]
    fn test_did_change_aggregates() {
        let mut t = TransformAnimation::new();
        t.position = Some(moving(Vec2::ZERO, Vec2::new(10.0, 0.0)));
        t.opacity = Some(FloatAnimation::constant(100.0));
        t.set_progress(0.5);
        assert!(t.did_change());
        assert!(!t.did_change());
        t.set_progress(0.5);
        assert!(!t.did_change());
    }
}
