//! Normalized sampling coordinates
//!
//! Every pixel of a domain maps to a sub-interval of the normalized space
//! `[-0.5, 0.5]²`, whose origin is the domain center. A [`SampleTransform`]
//! converts a pixel-center-relative offset into that space so shading can be
//! supersampled independently of resolution.

use crate::range::{Coord, Range};
use std::ops::{Add, Div, Mul, Sub};

/// Linearly remap `value` from `[in_lo, in_hi]` to `[out_lo, out_hi]`.
#[inline]
pub fn map(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    (value - in_lo) * (out_hi - out_lo) / (in_hi - in_lo) + out_lo
}

/// A 2D coordinate or offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Elementwise remap from `[in_lo, in_hi]` to `[out_lo, out_hi]`.
    pub fn map(self, in_lo: Self, in_hi: Self, out_lo: Self, out_hi: Self) -> Self {
        Self::new(
            map(self.x, in_lo.x, in_hi.x, out_lo.x, out_hi.x),
            map(self.y, in_lo.y, in_hi.y, out_lo.y, out_hi.y),
        )
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x / rhs.x, self.y / rhs.y)
    }
}

/// Maps intra-pixel sample offsets into domain-normalized coordinates.
///
/// Built once per pixel from that pixel's normalized corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleTransform {
    min: Vec2,
    max: Vec2,
}

impl SampleTransform {
    /// Transform for pixel `(x, y)` of `domain`.
    pub fn for_pixel<T: Coord>(x: T, y: T, domain: &Range<T>) -> Self {
        let dmin_x = domain.min_x.to_f32();
        let dmax_x = domain.max_x.to_f32();
        let dmin_y = domain.min_y.to_f32();
        let dmax_y = domain.max_y.to_f32();
        let px = x.to_f32();
        let py = y.to_f32();

        Self {
            min: Vec2::new(
                map(px, dmin_x, dmax_x, 0.0, 1.0) - 0.5,
                map(py, dmin_y, dmax_y, 0.0, 1.0) - 0.5,
            ),
            max: Vec2::new(
                map(px + 1.0, dmin_x, dmax_x, 0.0, 1.0) - 0.5,
                map(py + 1.0, dmin_y, dmax_y, 0.0, 1.0) - 0.5,
            ),
        }
    }

    /// Map an offset `(u, v)` in `[-0.5, 0.5]²` to the normalized domain space.
    #[inline]
    pub fn apply(&self, u: f32, v: f32) -> Vec2 {
        Vec2::new(
            map(u, -0.5, 0.5, self.min.x, self.max.x),
            map(v, -0.5, 0.5, self.min.y, self.max.y),
        )
    }

    /// Normalized coordinate of the pixel center.
    pub fn center(&self) -> Vec2 {
        self.apply(0.0, 0.0)
    }

    /// Normalized corner of the pixel with the smallest coordinates.
    pub fn min(&self) -> Vec2 {
        self.min
    }

    /// Normalized corner of the pixel with the largest coordinates.
    pub fn max(&self) -> Vec2 {
        self.max
    }
}
