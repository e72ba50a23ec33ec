use glam::Vec2;

use crate::config::EngineConfig;

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_MIN_SLOPE: f32 = 1e-6;
const NEWTON_PRECISION: f32 = 1e-5;
const SUBDIVISION_PRECISION: f32 = 1e-7;
const SUBDIVISION_MAX_ITERATIONS: usize = 24;

/// Cubic Bezier easing from linear keyframe progress to eased progress.
///
/// The curve runs from (0,0) to (1,1) with the two handles in between. The
/// x components are clamped into a monotonic range at construction, so every
/// linear progress has exactly one eased value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EasingCurve {
    out_tangent: Vec2,
    in_tangent: Vec2,
    linear: bool,
}

impl EasingCurve {
    pub const LINEAR: EasingCurve = EasingCurve {
        out_tangent: Vec2::ZERO,
        in_tangent: Vec2::ONE,
        linear: true,
    };

    /// Build a curve with the default control point bounds.
    pub fn new(out_tangent: Vec2, in_tangent: Vec2) -> Self {
        Self::with_config(out_tangent, in_tangent, &EngineConfig::default())
    }

    pub fn with_config(out_tangent: Vec2, in_tangent: Vec2, config: &EngineConfig) -> Self {
        let clamp = |p: Vec2| {
            Vec2::new(
                clamp_component(p.x, config.easing_x_bounds),
                clamp_component(p.y, config.easing_y_bounds),
            )
        };
        let out_tangent = clamp(out_tangent);
        let in_tangent = clamp(in_tangent);
        let linear = out_tangent.x == out_tangent.y && in_tangent.x == in_tangent.y;
        Self {
            out_tangent,
            in_tangent,
            linear,
        }
    }

    pub fn out_tangent(&self) -> Vec2 {
        self.out_tangent
    }

    pub fn in_tangent(&self) -> Vec2 {
        self.in_tangent
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// Map linear progress in [0,1] to eased progress. The result may leave
    /// [0,1] when the handles overshoot.
    pub fn apply(&self, x: f32) -> f32 {
        if self.linear {
            return x;
        }
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let t = self.solve_t_for_x(x);
        bezier_component(t, self.out_tangent.y, self.in_tangent.y)
    }

    fn solve_t_for_x(&self, x: f32) -> f32 {
        let (a1, a2) = (self.out_tangent.x, self.in_tangent.x);

        // Newton-Raphson
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = bezier_component(t, a1, a2) - x;
            if err.abs() < NEWTON_PRECISION {
                return t;
            }
            let slope = bezier_slope(t, a1, a2);
            if slope.abs() < NEWTON_MIN_SLOPE {
                break;
            }
            t -= err / slope;
            if !(0.0..=1.0).contains(&t) {
                break;
            }
        }

        // Flat regions defeat Newton; bisect instead.
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        let mut t = x;
        for _ in 0..SUBDIVISION_MAX_ITERATIONS {
            t = lo + (hi - lo) * 0.5;
            let err = bezier_component(t, a1, a2) - x;
            if err.abs() <= SUBDIVISION_PRECISION {
                break;
            }
            if err > 0.0 {
                hi = t;
            } else {
                lo = t;
            }
        }
        t
    }
}

impl Default for EasingCurve {
    fn default() -> Self {
        Self::LINEAR
    }
}

fn clamp_component(v: f32, bounds: [f32; 2]) -> f32 {
    if v.is_nan() {
        return bounds[0].max(0.0).min(bounds[1]);
    }
    v.clamp(bounds[0], bounds[1])
}

// B(t) for one axis of a curve from 0 to 1 with handles a1, a2.
fn bezier_component(t: f32, a1: f32, a2: f32) -> f32 {
    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * a1 + 3.0 * one_minus_t * t * t * a2 + t * t * t
}

fn bezier_slope(t: f32, a1: f32, a2: f32) -> f32 {
    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * a1
        + 6.0 * one_minus_t * t * (a2 - a1)
        + 3.0 * t * t * (1.0 - a2)
}
