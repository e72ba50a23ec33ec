//! Colors and gradients.
//!
//! Color keyframes blend in linear light: both ends are decoded with the sRGB
//! transfer function, mixed channel by channel, then re-encoded. Alpha is
//! mixed as-is.

use crate::animatable::Interpolatable;
use crate::error::{LottieError, Result};

/// Packed `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0);
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// From unit-range floats, clamping out-of-range channels.
    pub fn from_rgba_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::from_argb(to_byte(a), to_byte(r), to_byte(g), to_byte(b))
    }

    pub fn argb(self) -> u32 {
        self.0
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    pub fn with_alpha(self, alpha: u8) -> Self {
        Color((self.0 & 0x00FF_FFFF) | (alpha as u32) << 24)
    }

    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            self.red() as f32 / 255.0,
            self.green() as f32 / 255.0,
            self.blue() as f32 / 255.0,
            self.alpha() as f32 / 255.0,
        ]
    }

    /// Gamma-correct blend.
    pub fn blend(self, other: Color, t: f32) -> Color {
        if self == other || t == 0.0 {
            return self;
        }
        if t == 1.0 {
            return other;
        }
        let a = mix(unit(self.alpha()), unit(other.alpha()), t);
        let r = mix(decode(unit(self.red())), decode(unit(other.red())), t);
        let g = mix(decode(unit(self.green())), decode(unit(other.green())), t);
        let b = mix(decode(unit(self.blue())), decode(unit(other.blue())), t);
        Self::from_argb(to_byte(a), to_byte(encode(r)), to_byte(encode(g)), to_byte(encode(b)))
    }
}

impl Interpolatable for Color {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self.blend(*other, t)
    }
}

fn unit(channel: u8) -> f32 {
    channel as f32 / 255.0
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// sRGB electro-optical transfer: encoded → linear.
fn decode(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB opto-electronic transfer: linear → encoded.
fn encode(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Gradient stops: a position in [0,1] and a color per stop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradientColor {
    positions: Vec<f32>,
    colors: Vec<Color>,
}

impl GradientColor {
    pub fn new(positions: Vec<f32>, colors: Vec<Color>) -> Result<Self> {
        if positions.len() != colors.len() {
            return Err(LottieError::model(format!(
                "gradient has {} positions but {} colors",
                positions.len(),
                colors.len()
            )));
        }
        Ok(Self { positions, colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Color at `position`, blending between the surrounding stops.
    pub fn sample(&self, position: f32) -> Color {
        let Some(first) = self.colors.first() else {
            return Color::TRANSPARENT;
        };
        let after = self.positions.partition_point(|p| *p <= position);
        if after == 0 {
            return *first;
        }
        if after == self.positions.len() {
            return self.colors[after - 1];
        }
        let (p0, p1) = (self.positions[after - 1], self.positions[after]);
        let span = p1 - p0;
        let t = if span > 0.0 { (position - p0) / span } else { 0.0 };
        self.colors[after - 1].blend(self.colors[after], t)
    }
}

impl Interpolatable for GradientColor {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let positions = self
            .positions
            .iter()
            .zip(&other.positions)
            .map(|(a, b)| mix(*a, *b, t))
            .collect();
        let colors = self
            .colors
            .iter()
            .zip(&other.colors)
            .map(|(a, b)| a.blend(*b, t))
            .collect();
        GradientColor { positions, colors }
    }

    fn check_pair(&self, other: &Self) -> Result<()> {
        if self.len() != other.len() {
            return Err(LottieError::GradientStops {
                from: self.len(),
                to: other.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_black_midpoint() {
        let mid = Color(0xFF00_0000).lerp(&Color(0xFF02_0202), 0.5);
        assert_eq!(mid, Color(0xFF01_0101));
    }

    #[test]
    fn test_endpoints_are_exact() {
        let a = Color(0xFF12_3456);
        let b = Color(0x80FE_DCBA);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_blend_is_brighter_than_srgb_average() {
        let mid = Color::BLACK.lerp(&Color::WHITE, 0.5);
        // Linear-light midpoint of black and white encodes to ~188, not 128.
        assert!(mid.red() > 180 && mid.red() < 195, "{}", mid.red());
        assert_eq!(mid.alpha(), 255);
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let c = Color::BLACK.lerp(&Color::WHITE, 1.5);
        assert_eq!(c, Color::WHITE);
    }

    #[test]
    fn test_float_round_trip() {
        let c = Color::from_rgba_f32(1.0, 0.5, 0.0, 1.0);
        assert_eq!(c, Color(0xFFFF_8000));
        assert_eq!(c.with_alpha(0).alpha(), 0);
        assert_eq!(c.to_rgba_f32()[0], 1.0);
    }

    #[test]
    fn test_gradient_lerp_and_stop_mismatch() {
        let a = GradientColor::new(vec![0.0, 1.0], vec![Color::BLACK, Color::BLACK]).unwrap();
        let b = GradientColor::new(vec![0.0, 0.5], vec![Color::WHITE, Color::WHITE]).unwrap();
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.positions(), &[0.0, 0.75]);
        assert_eq!(mid.colors()[0], Color::BLACK.lerp(&Color::WHITE, 0.5));

        let three = GradientColor::new(vec![0.0, 0.5, 1.0], vec![Color::WHITE; 3]).unwrap();
        assert!(matches!(
            a.check_pair(&three),
            Err(LottieError::GradientStops { from: 2, to: 3 })
        ));
    }

    #[test]
    fn test_gradient_sample() {
        let g = GradientColor::new(vec![0.2, 0.8], vec![Color::BLACK, Color::WHITE]).unwrap();
        assert_eq!(g.sample(0.0), Color::BLACK);
        assert_eq!(g.sample(1.0), Color::WHITE);
        let mid = g.sample(0.5);
        assert!(mid.red() > 180 && mid.red() < 195);
    }
}
