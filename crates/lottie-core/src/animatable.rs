use glam::{Vec2, Vec3};

use crate::error::Result;
use crate::motion_path::{MotionPath, SpatialTangents};

/// A value kind that keyframes can interpolate.
///
/// `lerp` is the per-kind value function: it receives the keyframe's start
/// and end values and the eased progress, which may leave [0,1] for
/// overshooting easing curves.
pub trait Interpolatable: Clone + PartialEq + Send + Sync + 'static {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Interpolation along a pre-compiled motion path. Only points have one.
    fn lerp_spatial(&self, other: &Self, t: f32, _path: Option<&MotionPath>) -> Self {
        self.lerp(other, t)
    }

    /// Compile spatial tangents into a motion path for this keyframe.
    fn motion_path(
        _start: &Self,
        _end: &Self,
        _tangents: &SpatialTangents,
        _accuracy: f64,
    ) -> Option<MotionPath> {
        None
    }

    /// Reject start/end pairs that cannot be interpolated.
    fn check_pair(&self, _other: &Self) -> Result<()> {
        Ok(())
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for i32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        (*self as f32 + (*other - *self) as f32 * t).round() as i32
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }

    fn lerp_spatial(&self, other: &Self, t: f32, path: Option<&MotionPath>) -> Self {
        match path {
            Some(path) => path.point_at(t),
            None => self.lerp(other, t),
        }
    }

    fn motion_path(
        start: &Self,
        end: &Self,
        tangents: &SpatialTangents,
        accuracy: f64,
    ) -> Option<MotionPath> {
        MotionPath::new(*start, *end, tangents, accuracy)
    }
}

impl Interpolatable for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }
}

/// Non-uniform scale as ratios; 1.0 leaves an axis untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleXY {
    pub x: f32,
    pub y: f32,
}

impl ScaleXY {
    pub const ONE: ScaleXY = ScaleXY { x: 1.0, y: 1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Interchange documents store scale in percent.
    pub fn from_percent(x: f32, y: f32) -> Self {
        Self::new(x / 100.0, y / 100.0)
    }

    pub fn is_identity(&self) -> bool {
        self.x == 1.0 && self.y == 1.0
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Default for ScaleXY {
    fn default() -> Self {
        Self::ONE
    }
}

impl Interpolatable for ScaleXY {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        ScaleXY {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}
