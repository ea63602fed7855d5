//! Axis-aligned integer pixel rectangles
//!
//! A [`Range`] is half-open on both axes: it covers the pixels
//! `min_x <= x < max_x` and `min_y <= y < max_y`.

use crate::error::{Axis, ScheduleError, ScheduleResult};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::ops::{Add, Div, Sub};

/// Integer type usable as a pixel coordinate.
pub trait Coord:
    Copy
    + Ord
    + Hash
    + Debug
    + Display
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Div<Output = Self>
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const TWO: Self;
    const MAX: Self;

    /// Converts a configuration value, returning `None` if it does not fit.
    fn from_u32(value: u32) -> Option<Self>;

    /// Converts to `f32` for normalized coordinate math.
    fn to_f32(self) -> f32;

    /// Converts to `i64` for index math.
    fn to_i64(self) -> i64;

    /// Lossless widening used for extent, midpoint and area math.
    fn to_i128(self) -> i128;

    /// Narrows back from `i128`, returning `None` if the value does not fit.
    fn from_i128(value: i128) -> Option<Self>;
}

macro_rules! impl_coord {
    ($($t:ty),*) => {
        $(
            impl Coord for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const TWO: Self = 2;
                const MAX: Self = <$t>::MAX;

                fn from_u32(value: u32) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }

                fn to_f32(self) -> f32 {
                    self as f32
                }

                fn to_i64(self) -> i64 {
                    self as i64
                }

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_coord!(i32, i64, u16, u32, usize);

/// Integer midpoint of `lo` and `hi`, rounded towards `lo`.
///
/// Never overflows, even when `hi - lo` does not fit in `T`.
pub fn midpoint<T: Coord>(lo: T, hi: T) -> T {
    let (lo_wide, hi_wide) = (lo.to_i128(), hi.to_i128());
    // Lies between `lo` and `hi`, so it always narrows back.
    T::from_i128(lo_wide + (hi_wide - lo_wide) / 2).unwrap_or(lo)
}

/// Length of `[lo, hi)`, clamped to `[0, T::MAX]`.
fn extent<T: Coord>(lo: T, hi: T) -> T {
    let len = (hi.to_i128() - lo.to_i128()).max(0);
    T::from_i128(len).unwrap_or(T::MAX)
}

/// An axis-aligned rectangle of pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range<T> {
    pub min_x: T,
    pub max_x: T,
    pub min_y: T,
    pub max_y: T,
}

impl<T: Coord> Range<T> {
    /// Create a range without checking its bounds.
    ///
    /// Use [`Range::try_new`] or [`Range::validate`] when the bounds come
    /// from untrusted input.
    pub fn new(min_x: T, max_x: T, min_y: T, max_y: T) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Create a range, failing if a minimum bound exceeds its maximum or an
    /// extent does not fit in `T`.
    pub fn try_new(min_x: T, max_x: T, min_y: T, max_y: T) -> ScheduleResult<Self> {
        let range = Self::new(min_x, max_x, min_y, max_y);
        range.validate()?;
        Ok(range)
    }

    /// Range covering `[0, width) × [0, height)`.
    pub fn from_size(width: T, height: T) -> Self {
        Self::new(T::ZERO, width, T::ZERO, height)
    }

    /// Check the `min <= max` invariant on both axes, and that each extent
    /// is representable in `T`.
    pub fn validate(&self) -> ScheduleResult<()> {
        check_axis(Axis::X, self.min_x, self.max_x)?;
        check_axis(Axis::Y, self.min_y, self.max_y)
    }

    /// Width in pixels. Inverted bounds read as 0, extents beyond `T::MAX`
    /// as `T::MAX`; neither occurs on a validated range.
    pub fn width(&self) -> T {
        extent(self.min_x, self.max_x)
    }

    /// Height in pixels, clamped like [`Range::width`].
    pub fn height(&self) -> T {
        extent(self.min_y, self.max_y)
    }

    /// Number of pixels covered, saturating at `u64::MAX`.
    pub fn area(&self) -> u64 {
        let area = self.width().to_i128() * self.height().to_i128();
        u64::try_from(area).unwrap_or(u64::MAX)
    }

    /// True if the range covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == T::ZERO || self.height() == T::ZERO
    }

    pub fn longer_edge(&self) -> T {
        self.width().max(self.height())
    }

    pub fn shorter_edge(&self) -> T {
        self.width().min(self.height())
    }

    /// Axis a split cuts across: x when strictly wider than tall, y otherwise.
    pub fn split_axis(&self) -> Axis {
        if self.width() > self.height() {
            Axis::X
        } else {
            Axis::Y
        }
    }

    /// True if [`Range::split`] yields two non-empty halves.
    pub fn can_split(&self) -> bool {
        !self.is_empty() && self.longer_edge() > T::ONE
    }

    /// Split at the midpoint of the longer axis.
    ///
    /// The two halves exactly partition `self`. Square ranges split along y.
    pub fn split(&self) -> (Self, Self) {
        match self.split_axis() {
            Axis::X => {
                let mid = midpoint(self.min_x, self.max_x);
                (
                    Self::new(self.min_x, mid, self.min_y, self.max_y),
                    Self::new(mid, self.max_x, self.min_y, self.max_y),
                )
            }
            Axis::Y => {
                let mid = midpoint(self.min_y, self.max_y);
                (
                    Self::new(self.min_x, self.max_x, self.min_y, mid),
                    Self::new(self.min_x, self.max_x, mid, self.max_y),
                )
            }
        }
    }

    pub fn contains(&self, x: T, y: T) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// True if the two ranges share at least one pixel.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Iterate pixel coordinates in row-major order.
    pub fn pixels(&self) -> Pixels<T> {
        Pixels {
            range: *self,
            x: self.min_x,
            y: self.min_y,
        }
    }
}

fn check_axis<T: Coord>(axis: Axis, min: T, max: T) -> ScheduleResult<()> {
    if min > max {
        return Err(ScheduleError::MalformedRange {
            axis,
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    if T::from_i128(max.to_i128() - min.to_i128()).is_none() {
        return Err(ScheduleError::ExtentOverflow {
            axis,
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

/// Row-major iterator over the pixels of a [`Range`].
#[derive(Debug, Clone)]
pub struct Pixels<T> {
    range: Range<T>,
    x: T,
    y: T,
}

impl<T: Coord> Iterator for Pixels<T> {
    type Item = (T, T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.range.is_empty() || self.y >= self.range.max_y {
            return None;
        }
        let item = (self.x, self.y);
        self.x = self.x + T::ONE;
        if self.x >= self.range.max_x {
            self.x = self.range.min_x;
            self.y = self.y + T::ONE;
        }
        Some(item)
    }
}
