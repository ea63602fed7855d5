//! Framebuffer pixel storage
//!
//! Pixels are kept as packed [`Rgba8`] values in atomics, so worker threads
//! can write their disjoint tiles through a shared reference.

use crate::color::{Color, Rgba8};
use crate::RenderError;
use image::{Rgba, RgbaImage};
use raster_scheduler::{Coord, PixelStore, Range};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// A `width × height` grid of pixels, indexed `x + y * width`.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<AtomicU32>,
}

impl Framebuffer {
    /// Create a framebuffer cleared to transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: (0..len).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The full pixel extent, ready for decomposition.
    pub fn range(&self) -> Range<u32> {
        Range::from_size(self.width, self.height)
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(x as usize + y as usize * self.width as usize)
    }

    /// Read a pixel, or `None` outside the framebuffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        self.index(i64::from(x), i64::from(y))
            .map(|i| Rgba8::from_bits(self.pixels[i].load(Ordering::Relaxed)))
    }

    /// Write a pixel. Returns `false` if the coordinate is out of bounds.
    pub fn set_pixel(&self, x: u32, y: u32, pixel: Rgba8) -> bool {
        self.write(i64::from(x), i64::from(y), pixel)
    }

    fn write(&self, x: i64, y: i64, pixel: Rgba8) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i].store(pixel.to_bits(), Ordering::Relaxed);
                true
            }
            None => {
                log::warn!(
                    "dropping write at ({}, {}) outside {}x{} framebuffer",
                    x,
                    y,
                    self.width,
                    self.height
                );
                false
            }
        }
    }

    /// Set every pixel to `pixel`.
    pub fn fill(&mut self, pixel: Rgba8) {
        let bits = pixel.to_bits();
        for slot in &mut self.pixels {
            *slot.get_mut() = bits;
        }
    }

    /// Copy the contents into an `image` buffer.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba(self.pixel(x, y).unwrap_or_default().to_array())
        })
    }

    /// Encode the contents to an image file; the format follows the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        self.to_image().save(path.as_ref())?;
        Ok(())
    }
}

impl<T: Coord> PixelStore<T, Rgba8> for Framebuffer {
    fn store(&self, x: T, y: T, color: Rgba8) {
        self.write(x.to_i64(), y.to_i64(), color);
    }
}

impl<T: Coord> PixelStore<T, Color> for Framebuffer {
    fn store(&self, x: T, y: T, color: Color) {
        self.write(x.to_i64(), y.to_i64(), color.to_rgba8());
    }
}
