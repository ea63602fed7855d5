//! Per-tile work capabilities and pixel iteration
//!
//! The caller supplies work in two steps: a [`TileFunction`] is asked once
//! per tile for a [`PixelFunction`], which is then invoked for every pixel of
//! that tile. Colors it produces go to a shared [`PixelStore`].

use crate::range::{Coord, Range};
use crate::sample::SampleTransform;

/// A tile handed to a worker, together with the domain it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkBlock<T> {
    pub tile: Range<T>,
    pub domain: Range<T>,
}

impl<T: Coord> WorkBlock<T> {
    pub fn new(tile: Range<T>, domain: Range<T>) -> Self {
        Self { tile, domain }
    }
}

/// Produces a per-pixel function for each tile.
///
/// Shared by reference across all workers.
pub trait TileFunction<T>: Sync {
    type Pixel: PixelFunction<T>;

    fn begin_tile(&self, block: &WorkBlock<T>) -> Self::Pixel;
}

impl<T, F, P> TileFunction<T> for F
where
    F: Fn(&WorkBlock<T>) -> P + Sync,
    P: PixelFunction<T>,
{
    type Pixel = P;

    fn begin_tile(&self, block: &WorkBlock<T>) -> P {
        self(block)
    }
}

/// Computes the color of one pixel.
///
/// Owned by a single worker for the duration of one tile.
pub trait PixelFunction<T> {
    type Color;

    fn shade(&mut self, x: T, y: T, sample: &SampleTransform) -> Self::Color;
}

impl<T, F, C> PixelFunction<T> for F
where
    F: FnMut(T, T, &SampleTransform) -> C,
{
    type Color = C;

    fn shade(&mut self, x: T, y: T, sample: &SampleTransform) -> C {
        self(x, y, sample)
    }
}

/// Destination for computed pixels.
///
/// Workers only ever write coordinates inside their own tile, and tiles never
/// overlap, so implementations need to support concurrent writes to disjoint
/// pixels.
pub trait PixelStore<T, C>: Sync {
    fn store(&self, x: T, y: T, color: C);
}

impl<T, C, F> PixelStore<T, C> for F
where
    F: Fn(T, T, C) + Sync,
{
    fn store(&self, x: T, y: T, color: C) {
        self(x, y, color)
    }
}

/// Run `pixel` over every pixel of `block.tile` in row-major order.
pub fn iterate_tile<T, P, S>(block: &WorkBlock<T>, pixel: &mut P, store: &S)
where
    T: Coord,
    P: PixelFunction<T>,
    S: PixelStore<T, P::Color> + ?Sized,
{
    let tile = &block.tile;
    let mut y = tile.min_y;
    while y < tile.max_y {
        let mut x = tile.min_x;
        while x < tile.max_x {
            let transform = SampleTransform::for_pixel(x, y, &block.domain);
            let color = pixel.shade(x, y, &transform);
            store.store(x, y, color);
            x = x + T::ONE;
        }
        y = y + T::ONE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Vec2;
    use std::sync::Mutex;

    #[test]
    fn test_iterate_tile_row_major() {
        let block = WorkBlock::new(Range::new(2, 4, 1, 3), Range::new(0, 8, 0, 8));
        let visited = Mutex::new(Vec::new());
        let store = |x: i32, y: i32, _color: ()| visited.lock().unwrap().push((x, y));
        let mut pixel = |_x: i32, _y: i32, _sample: &SampleTransform| ();

        iterate_tile(&block, &mut pixel, &store);

        assert_eq!(
            *visited.lock().unwrap(),
            vec![(2, 1), (3, 1), (2, 2), (3, 2)]
        );
    }

    #[test]
    fn test_iterate_tile_passes_pixel_transform() {
        let domain = Range::new(0u32, 4, 0, 4);
        let block = WorkBlock::new(Range::new(0, 4, 0, 4), domain);
        let centers = Mutex::new(Vec::new());
        let store = |x: u32, y: u32, center: Vec2| centers.lock().unwrap().push((x, y, center));
        let mut pixel = |_x: u32, _y: u32, sample: &SampleTransform| sample.center();

        iterate_tile(&block, &mut pixel, &store);

        let centers = centers.into_inner().unwrap();
        assert_eq!(centers.len(), 16);
        for (x, y, center) in centers {
            assert_eq!(center, SampleTransform::for_pixel(x, y, &domain).center());
        }
    }

    #[test]
    fn test_empty_tile_never_calls_pixel() {
        let block = WorkBlock::new(Range::new(5, 5, 0, 10), Range::new(0, 10, 0, 10));
        let mut calls = 0;
        let mut pixel = |_x: i32, _y: i32, _sample: &SampleTransform| calls += 1;
        let store = |_x: i32, _y: i32, _color: ()| {};

        iterate_tile(&block, &mut pixel, &store);

        assert_eq!(calls, 0);
    }

    struct Counter {
        shaded: usize,
    }

    impl PixelFunction<i32> for Counter {
        type Color = usize;

        fn shade(&mut self, _x: i32, _y: i32, _sample: &SampleTransform) -> usize {
            self.shaded += 1;
            self.shaded
        }
    }

    #[test]
    fn test_stateful_pixel_function() {
        let block = WorkBlock::new(Range::new(0, 3, 0, 2), Range::new(0, 3, 0, 2));
        let last = Mutex::new(0);
        let store = |_x: i32, _y: i32, n: usize| *last.lock().unwrap() = n;
        let mut counter = Counter { shaded: 0 };

        iterate_tile(&block, &mut counter, &store);

        assert_eq!(counter.shaded, 6);
        assert_eq!(*last.lock().unwrap(), 6);
    }
}
