//! Color values
//!
//! Shading works in floating point [`Color`]; storage uses packed [`Rgba8`].

use std::ops::{Add, AddAssign, Mul};

/// Floating point RGBA color, nominally in `[0, 1]` per channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Linear interpolation, `t = 0` yields `self`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        self * (1.0 - t) + other * t
    }

    /// Quantize to 8 bits per channel, clamping out-of-range values.
    pub fn to_rgba8(self) -> Rgba8 {
        fn quantize(v: f32) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Rgba8::new(quantize(self.r), quantize(self.g), quantize(self.b), quantize(self.a))
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

/// 8-bit-per-channel RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Pack into a `u32` with `r` in the lowest byte.
    pub fn to_bits(self) -> u32 {
        u32::from_le_bytes(self.to_array())
    }

    pub fn from_bits(bits: u32) -> Self {
        let [r, g, b, a] = bits.to_le_bytes();
        Self::new(r, g, b, a)
    }
}

impl From<Color> for Rgba8 {
    fn from(color: Color) -> Self {
        color.to_rgba8()
    }
}
