//! Point keyframes that travel along a curve.
//!
//! When a position keyframe carries spatial tangents (`to`/`ti`), the value
//! moves along the cubic segment `start → start+to → end+ti → end` instead of
//! the straight line between the two points. The eased progress is treated as
//! a fraction of that segment's arc length, so motion speed follows the
//! easing curve rather than the curve parameterization.

use glam::Vec2;
use kurbo::{CubicBez, ParamCurve, ParamCurveArclen, ParamCurveDeriv, Point};

/// Spatial tangents of a point keyframe, relative to its start/end values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialTangents {
    pub out_tangent: Vec2,
    pub in_tangent: Vec2,
}

impl SpatialTangents {
    pub fn new(out_tangent: Vec2, in_tangent: Vec2) -> Self {
        Self {
            out_tangent,
            in_tangent,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.out_tangent == Vec2::ZERO && self.in_tangent == Vec2::ZERO
    }
}

/// One pre-measured cubic segment of a point property's motion path.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPath {
    curve: CubicBez,
    length: f64,
    accuracy: f64,
}

impl MotionPath {
    /// Returns `None` when the keyframe moves in a straight line (no handles)
    /// or doesn't move at all; plain interpolation covers those.
    pub fn new(start: Vec2, end: Vec2, tangents: &SpatialTangents, accuracy: f64) -> Option<Self> {
        if start == end || tangents.is_zero() {
            return None;
        }
        let curve = CubicBez::new(
            to_point(start),
            to_point(start + tangents.out_tangent),
            to_point(end + tangents.in_tangent),
            to_point(end),
        );
        let length = curve.arclen(accuracy);
        if !(length > 0.0) {
            return None;
        }
        Some(Self {
            curve,
            length,
            accuracy,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Point at `fraction` of the arc length. Fractions outside [0,1] (from
    /// overshooting easing) continue along the end tangents.
    pub fn point_at(&self, fraction: f32) -> Vec2 {
        let distance = fraction as f64 * self.length;
        if fraction < 0.0 {
            let dir = self.unit_tangent(0.0);
            return from_point(self.curve.p0 + dir * distance);
        }
        if fraction > 1.0 {
            let dir = self.unit_tangent(1.0);
            return from_point(self.curve.p3 + dir * (distance - self.length));
        }
        let t = self.curve.inv_arclen(distance, self.accuracy);
        from_point(self.curve.eval(t))
    }

    fn unit_tangent(&self, t: f64) -> kurbo::Vec2 {
        let mut d = self.curve.deriv().eval(t).to_vec2();
        if d.hypot() < 1e-9 {
            // Handle collapsed onto its vertex; fall back to the chord.
            d = self.curve.p3 - self.curve.p0;
        }
        let len = d.hypot();
        if len < 1e-9 {
            kurbo::Vec2::ZERO
        } else {
            d / len
        }
    }
}

pub(crate) fn to_point(v: Vec2) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

pub(crate) fn from_point(p: Point) -> Vec2 {
    Vec2::new(p.x as f32, p.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc() -> MotionPath {
        // Quarter-ish arc from (0,0) to (100,100) bulging towards (100,0).
        MotionPath::new(
            Vec2::ZERO,
            Vec2::new(100.0, 100.0),
            &SpatialTangents::new(Vec2::new(55.0, 0.0), Vec2::new(0.0, -55.0)),
            0.01,
        )
        .unwrap()
    }

    #[test]
    fn test_straight_or_static_segments_have_no_path() {
        let flat = SpatialTangents::new(Vec2::ZERO, Vec2::ZERO);
        assert!(MotionPath::new(Vec2::ZERO, Vec2::ONE, &flat, 0.1).is_none());
        let handles = SpatialTangents::new(Vec2::ONE, Vec2::ONE);
        assert!(MotionPath::new(Vec2::ONE, Vec2::ONE, &handles, 0.1).is_none());
    }

    #[test]
    fn test_endpoints() {
        let path = arc();
        assert!(path.point_at(0.0).distance(Vec2::ZERO) < 1e-3);
        assert!(path.point_at(1.0).distance(Vec2::new(100.0, 100.0)) < 1e-2);
        assert!(path.length() > 141.0);
    }

    #[test]
    fn test_midpoint_follows_curve() {
        let mid = arc().point_at(0.5);
        // The curve bows away from the diagonal towards (100, 0).
        assert!(mid.x > mid.y + 10.0);
    }

    #[test]
    fn test_overshoot_extrapolates_along_tangent() {
        let path = arc();
        let past_end = path.point_at(1.1);
        // End tangent points straight down (+y) into (100,100).
        assert!((past_end.x - 100.0).abs() < 1e-2);
        assert!(past_end.y > 100.0);

        let before_start = path.point_at(-0.1);
        assert!(before_start.x < 0.0);
        assert!(before_start.y.abs() < 1e-2);
    }
}
