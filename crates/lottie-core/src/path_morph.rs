//! Bezier path data and shape morphing.
//!
//! Shapes morph by lerping every control point with its counterpart in the
//! other shape. There is no arc-length matching, so both ends of a morphing
//! keyframe must carry the same number of curves.

use glam::Vec2;
use kurbo::BezPath;
use lottie_data::model::BezierPath;

use crate::animatable::Interpolatable;
use crate::error::{LottieError, Result};
use crate::motion_path::to_point;

/// One cubic segment; it starts at the previous segment's vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CubicCurveData {
    pub control_point_1: Vec2,
    pub control_point_2: Vec2,
    pub vertex: Vec2,
}

impl CubicCurveData {
    pub fn new(control_point_1: Vec2, control_point_2: Vec2, vertex: Vec2) -> Self {
        Self {
            control_point_1,
            control_point_2,
            vertex,
        }
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            control_point_1: self.control_point_1.lerp(other.control_point_1, t),
            control_point_2: self.control_point_2.lerp(other.control_point_2, t),
            vertex: self.vertex.lerp(other.vertex, t),
        }
    }
}

/// A single contour: an initial point followed by cubic segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathVertexData {
    pub initial_point: Vec2,
    pub curves: Vec<CubicCurveData>,
    pub closed: bool,
}

impl PathVertexData {
    pub fn new(initial_point: Vec2, curves: Vec<CubicCurveData>, closed: bool) -> Self {
        Self {
            initial_point,
            curves,
            closed,
        }
    }

    /// Convert the interchange form (vertices with relative in/out handles).
    /// A closed path gains a final segment back to its first vertex.
    pub fn from_bezier_path(path: &BezierPath) -> Result<Self> {
        let n = path.v.len();
        if path.i.len() != n || path.o.len() != n {
            return Err(LottieError::model(format!(
                "path has {} vertices, {} in tangents, {} out tangents",
                n,
                path.i.len(),
                path.o.len()
            )));
        }
        let Some(first) = path.v.first() else {
            return Ok(Self {
                closed: path.c,
                ..Self::default()
            });
        };
        let vertex = |i: usize| Vec2::from(path.v[i]);
        let in_handle = |i: usize| vertex(i) + Vec2::from(path.i[i]);
        let out_handle = |i: usize| vertex(i) + Vec2::from(path.o[i]);

        let mut curves = Vec::with_capacity(n);
        for i in 1..n {
            curves.push(CubicCurveData::new(out_handle(i - 1), in_handle(i), vertex(i)));
        }
        if path.c && n > 1 {
            curves.push(CubicCurveData::new(out_handle(n - 1), in_handle(0), vertex(0)));
        }
        Ok(Self::new(Vec2::from(*first), curves, path.c))
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        self.append_to(&mut path);
        path
    }

    pub fn append_to(&self, path: &mut BezPath) {
        path.move_to(to_point(self.initial_point));
        for curve in &self.curves {
            path.curve_to(
                to_point(curve.control_point_1),
                to_point(curve.control_point_2),
                to_point(curve.vertex),
            );
        }
        if self.closed {
            path.close_path();
        }
    }
}

impl Interpolatable for PathVertexData {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // An empty side holds the other shape.
        if other.curves.is_empty() {
            return self.clone();
        }
        if self.curves.is_empty() || t == 1.0 {
            return other.clone();
        }
        if t == 0.0 {
            return self.clone();
        }
        PathVertexData {
            initial_point: self.initial_point.lerp(other.initial_point, t),
            curves: self
                .curves
                .iter()
                .zip(&other.curves)
                .map(|(a, b)| a.lerp(b, t))
                .collect(),
            closed: self.closed || other.closed,
        }
    }

    fn check_pair(&self, other: &Self) -> Result<()> {
        let (from, to) = (self.curves.len(), other.curves.len());
        if from != 0 && to != 0 && from != to {
            return Err(LottieError::ShapeCardinality { from, to });
        }
        Ok(())
    }
}
