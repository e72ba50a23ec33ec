//! Binding from the interchange model to validated keyframe tracks.
//!
//! Document keyframes store only a start frame; a keyframe ends where the next
//! one starts and, unless it says otherwise, interpolates towards the next
//! keyframe's start value. A trailing keyframe with no value only marks the
//! end of the one before it.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use lottie_data::model::{self as data, Property, Value};

use crate::animatable::{Interpolatable, ScaleXY};
use crate::animation::{FloatAnimation, KeyframeAnimation, PointAnimation, ScaleAnimation};
use crate::color::{Color, GradientColor};
use crate::config::EngineConfig;
use crate::easing::EasingCurve;
use crate::error::{LottieError, Result};
use crate::keyframe::{Keyframe, KeyframeTrack};
use crate::motion_path::SpatialTangents;
use crate::path_morph::PathVertexData;
use crate::split::{PositionAnimation, SplitDimensionAnimation};
use crate::timeline::Timeline;
use crate::transform::TransformAnimation;

/// Builds tracks and evaluators against one composition timeline.
#[derive(Debug, Clone, Copy)]
pub struct TrackBuilder<'a> {
    timeline: &'a Timeline,
    config: &'a EngineConfig,
}

impl<'a> TrackBuilder<'a> {
    pub fn new(timeline: &'a Timeline, config: &'a EngineConfig) -> Self {
        Self { timeline, config }
    }

    pub fn timeline(&self) -> &Timeline {
        self.timeline
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Track for `property`; an absent value becomes a constant `default`.
    pub fn track<S, T, F>(
        &self,
        property: &Property<S>,
        default: T,
        map: F,
    ) -> Result<Arc<KeyframeTrack<T>>>
    where
        T: Interpolatable,
        F: Fn(&S) -> Result<T>,
    {
        let track = match &property.k {
            Value::Default => KeyframeTrack::constant(default),
            Value::Static(value) => KeyframeTrack::constant(map(value)?),
            Value::Animated(keyframes) => KeyframeTrack::with_config(
                self.keyframes(keyframes, &map)?,
                self.timeline,
                self.config,
            )?,
        };
        Ok(Arc::new(track))
    }

    pub fn animation<S, T, F>(
        &self,
        property: &Property<S>,
        default: T,
        map: F,
    ) -> Result<KeyframeAnimation<T>>
    where
        T: Interpolatable,
        F: Fn(&S) -> Result<T>,
    {
        Ok(KeyframeAnimation::new(self.track(property, default, map)?))
    }

    /// Like [`animation`](Self::animation) but `None` when the document
    /// leaves the property out.
    pub fn optional<S, T, F>(
        &self,
        property: &Property<S>,
        map: F,
    ) -> Result<Option<KeyframeAnimation<T>>>
    where
        T: Interpolatable,
        F: Fn(&S) -> Result<T>,
    {
        let track = match &property.k {
            Value::Static(value) => KeyframeTrack::constant(map(value)?),
            Value::Animated(keyframes) => KeyframeTrack::with_config(
                self.keyframes(keyframes, &map)?,
                self.timeline,
                self.config,
            )?,
            Value::Default => return Ok(None),
        };
        Ok(Some(KeyframeAnimation::new(Arc::new(track))))
    }

    pub fn scalar(&self, property: &Property<f32>, default: f32) -> Result<FloatAnimation> {
        self.animation(property, default, |v| Ok(*v))
    }

    /// Convert document keyframes. Frame spans are left for
    /// [`KeyframeTrack`] to validate.
    pub fn keyframes<S, T, F>(
        &self,
        keyframes: &[data::Keyframe<S>],
        map: &F,
    ) -> Result<Vec<Keyframe<T>>>
    where
        F: Fn(&S) -> Result<T>,
    {
        let count = keyframes.len();
        let mut out = Vec::with_capacity(count);
        for (index, kf) in keyframes.iter().enumerate() {
            let next = keyframes.get(index + 1);
            if kf.s.is_none() && next.is_none() && index > 0 {
                break;
            }
            let interpolation = if kf.is_hold() || next.is_none() {
                None
            } else {
                Some(self.easing(kf.o.as_ref(), kf.i.as_ref()))
            };
            let end = kf.e.as_ref().or(next.and_then(|n| n.s.as_ref()));
            let end_value = match (&interpolation, end) {
                (Some(_), Some(end)) => Some(map(end)?),
                _ => None,
            };
            out.push(Keyframe {
                start_value: kf.s.as_ref().map(map).transpose()?,
                end_value,
                interpolation,
                start_frame: kf.t,
                end_frame: next.map(|n| n.t),
                spatial_tangents: spatial_tangents(kf.to.as_deref(), kf.ti.as_deref()),
            });
        }
        Ok(out)
    }

    fn easing(
        &self,
        out: Option<&data::BezierTangent>,
        inn: Option<&data::BezierTangent>,
    ) -> EasingCurve {
        match (out.and_then(tangent_point), inn.and_then(tangent_point)) {
            (Some(o), Some(i)) => EasingCurve::with_config(o, i, self.config),
            _ => EasingCurve::LINEAR,
        }
    }

    pub fn position(&self, property: &data::PositionProperty) -> Result<PositionAnimation> {
        match property {
            data::PositionProperty::Unified(p) => Ok(PositionAnimation::Unified(
                self.animation(p, Vec2::ZERO, |v| Ok(point(v)))?,
            )),
            data::PositionProperty::Split { x, y, .. } => Ok(PositionAnimation::Split(
                SplitDimensionAnimation::new(self.scalar(x, 0.0)?, self.scalar(y, 0.0)?),
            )),
        }
    }

    /// Transform of a layer or group. Axis rotations and orientation only
    /// apply to 3D layers.
    pub fn transform(
        &self,
        t: &data::Transform,
        is_3d: bool,
        auto_orient: bool,
    ) -> Result<TransformAnimation> {
        let mut transform = TransformAnimation::new();
        transform.anchor = Some(self.animation(&t.a, Vec2::ZERO, |v| Ok(point(v)))?);
        transform.position = Some(self.position(&t.p)?);
        transform.scale = Some(self.scale(&t.s)?);
        transform.rotation = Some(self.scalar(&t.rz, 0.0)?);
        transform.opacity = Some(self.scalar(&t.o, 100.0)?);
        transform.skew = self.optional(&t.sk, |v| Ok(*v))?;
        transform.skew_angle = self.optional(&t.sa, |v| Ok(*v))?;
        if is_3d {
            transform.rotation_x = self.optional_ref(t.rx.as_ref())?;
            transform.rotation_y = self.optional_ref(t.ry.as_ref())?;
            transform.orientation = match &t.or {
                Some(or) => self.optional(or, |v| Ok(Vec3::from(v.0)))?,
                None => None,
            };
        }
        if auto_orient {
            transform = transform.with_auto_orient(self.config.auto_orient_epsilon);
        } else {
            transform.auto_orient_epsilon = self.config.auto_orient_epsilon;
        }
        Ok(transform)
    }

    /// Repeater transforms add start/end opacity to the usual properties.
    pub fn repeater_transform(&self, t: &data::RepeaterTransform) -> Result<TransformAnimation> {
        let mut transform = self.transform(&t.t, false, false)?;
        transform.start_opacity = Some(self.scalar(&t.so, 100.0)?);
        transform.end_opacity = Some(self.scalar(&t.eo, 100.0)?);
        Ok(transform)
    }

    pub fn scale(&self, property: &Property<data::Vec3Scale>) -> Result<ScaleAnimation> {
        self.animation(property, ScaleXY::ONE, |v| Ok(ScaleXY::from_percent(v.0[0], v.0[1])))
    }

    pub fn point(&self, property: &Property<data::Vec2>) -> Result<PointAnimation> {
        self.animation(property, Vec2::ZERO, |v| Ok(Vec2::from(*v)))
    }

    pub fn color(&self, property: &Property<data::Vec4>) -> Result<KeyframeAnimation<Color>> {
        self.animation(property, Color::BLACK, |v| Ok(color(v)))
    }

    pub fn shape(
        &self,
        property: &Property<data::BezierPath>,
    ) -> Result<KeyframeAnimation<PathVertexData>> {
        self.animation(property, PathVertexData::default(), PathVertexData::from_bezier_path)
    }

    pub fn gradient(
        &self,
        colors: &data::GradientColors,
    ) -> Result<KeyframeAnimation<GradientColor>> {
        let stops = colors.p as usize;
        self.animation(&colors.k, GradientColor::default(), |raw| gradient(raw, stops))
    }

    fn optional_ref(&self, property: Option<&Property<f32>>) -> Result<Option<FloatAnimation>> {
        match property {
            Some(p) => self.optional(p, |v| Ok(*v)),
            None => Ok(None),
        }
    }
}

fn tangent_point(t: &data::BezierTangent) -> Option<Vec2> {
    Some(Vec2::new(*t.x.first()?, *t.y.first()?))
}

fn spatial_tangents(to: Option<&[f32]>, ti: Option<&[f32]>) -> Option<SpatialTangents> {
    let to = slice_point(to?);
    let ti = slice_point(ti?);
    Some(SpatialTangents::new(to, ti))
}

fn slice_point(v: &[f32]) -> Vec2 {
    Vec2::new(
        v.first().copied().unwrap_or_default(),
        v.get(1).copied().unwrap_or_default(),
    )
}

pub fn point(v: &data::Vec3DefaultZero) -> Vec2 {
    Vec2::new(v.0[0], v.0[1])
}

/// Document colors are usually unit floats; some exporters write 0-255.
pub fn color(v: &data::Vec4) -> Color {
    let scale = if v.iter().any(|c| *c > 1.0) { 255.0 } else { 1.0 };
    Color::from_rgba_f32(v[0] / scale, v[1] / scale, v[2] / scale, v[3] / scale)
}

/// Decode `[pos, r, g, b] * stops` optionally followed by `[pos, alpha] * n`.
/// Alpha stops are sampled at each color stop so the stop count stays fixed.
pub fn gradient(raw: &[f32], stops: usize) -> Result<GradientColor> {
    let color_len = stops * 4;
    if raw.len() < color_len {
        return Err(LottieError::model(format!(
            "gradient declares {stops} stops but carries {} values",
            raw.len()
        )));
    }
    let alpha: Vec<(f32, f32)> = raw[color_len..]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    let mut positions = Vec::with_capacity(stops);
    let mut colors = Vec::with_capacity(stops);
    for chunk in raw[..color_len].chunks_exact(4) {
        let position = chunk[0];
        let a = if alpha.is_empty() { 1.0 } else { alpha_at(&alpha, position) };
        positions.push(position);
        colors.push(Color::from_rgba_f32(chunk[1], chunk[2], chunk[3], a));
    }
    GradientColor::new(positions, colors)
}

fn alpha_at(stops: &[(f32, f32)], position: f32) -> f32 {
    let after = stops.partition_point(|(p, _)| *p <= position);
    if after == 0 {
        return stops[0].1;
    }
    if after == stops.len() {
        return stops[after - 1].1;
    }
    let (p0, a0) = stops[after - 1];
    let (p1, a1) = stops[after];
    if p1 <= p0 {
        return a0;
    }
    Interpolatable::lerp(&a0, &a1, (position - p0) / (p1 - p0))
}
