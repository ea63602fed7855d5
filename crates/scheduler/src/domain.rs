//! Domain decomposition
//!
//! Splits a rectangle into tiles no larger than a threshold on either axis by
//! repeatedly halving along the longer axis.

use crate::error::{ScheduleError, ScheduleResult};
use crate::range::{Coord, Range};

/// Default maximum tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// A full pixel extent together with its tile decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain<T> {
    /// The full extent being scheduled.
    pub range: Range<T>,
    /// Tiles covering `range`, in traversal order.
    pub tiles: Vec<Range<T>>,
}

impl<T: Coord> Domain<T> {
    /// Decompose `range` into tiles with both edges at most `max_size`.
    ///
    /// Tiles are emitted depth first, the lower half of every split before
    /// the upper half. Callers must not rely on this order.
    ///
    /// # Errors
    ///
    /// Fails if `max_size` is not positive or `range` has inverted bounds.
    pub fn decompose(range: Range<T>, max_size: T) -> ScheduleResult<Self> {
        if max_size <= T::ZERO {
            return Err(ScheduleError::InvalidTileSize);
        }
        range.validate()?;

        let mut tiles = Vec::new();
        if range.is_empty() {
            return Ok(Self { range, tiles });
        }

        // Explicit stack in place of recursion; pushing the upper half first
        // keeps the recursive emission order.
        let mut stack = vec![range];
        while let Some(current) = stack.pop() {
            if current.longer_edge() > max_size {
                let (lower, upper) = current.split();
                stack.push(upper);
                stack.push(lower);
            } else {
                tiles.push(current);
            }
        }

        Ok(Self { range, tiles })
    }

    /// Decompose `[0, width) × [0, height)`.
    pub fn from_size(width: T, height: T, max_size: T) -> ScheduleResult<Self> {
        Self::decompose(Range::from_size(width, height), max_size)
    }

    /// Number of tiles produced by the decomposition.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Total pixel count of the full extent.
    pub fn area(&self) -> u64 {
        self.range.area()
    }
}
