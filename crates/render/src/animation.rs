//! Keyframe interpolation

use crate::color::Color;
use raster_scheduler::Vec2;

/// Values that can be linearly interpolated.
pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: f32, t: f32) -> f32 {
        self + (other - self) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }
}

impl Lerp for Color {
    fn lerp(self, other: Color, t: f32) -> Color {
        Color::lerp(self, other, t)
    }
}

/// A value animated between two keyframes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animated<T> {
    pub start: T,
    pub end: T,
}

impl<T: Lerp> Animated<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    /// Value at `t`, where `0` is `start` and `1` is `end`. Not clamped.
    pub fn at(&self, t: f32) -> T {
        self.start.lerp(self.end, t)
    }

    /// `frames` evenly spaced values from `start` to `end` inclusive.
    ///
    /// A single frame yields `start`.
    pub fn frames(&self, frames: usize) -> impl Iterator<Item = T> + '_ {
        let last = frames.saturating_sub(1).max(1) as f32;
        (0..frames).map(move |i| self.at(i as f32 / last))
    }
}
