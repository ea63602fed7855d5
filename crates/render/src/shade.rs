//! Supersampled shading over the tile scheduler
//!
//! A [`Shader`] maps a point of the normalized `[-0.5, 0.5]²` domain space to
//! a color. [`render`] evaluates it at a stratified grid of sub-pixel
//! positions per pixel and stores the average in a [`Framebuffer`].

use crate::color::Color;
use crate::framebuffer::Framebuffer;
use crate::RenderError;
use raster_scheduler::{
    CancellationToken, PixelFunction, RunStats, SampleTransform, SchedulerConfig, TileFunction,
    Vec2, WorkBlock, WorkerPool,
};

/// Computes a color for a point in normalized domain space.
pub trait Shader: Sync {
    fn shade(&self, point: Vec2) -> Color;
}

impl<F> Shader for F
where
    F: Fn(Vec2) -> Color + Sync,
{
    fn shade(&self, point: Vec2) -> Color {
        self(point)
    }
}

/// Stratified sub-pixel sample offsets in `[-0.5, 0.5]²`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    offsets: Vec<Vec2>,
}

impl SampleGrid {
    /// An `n × n` grid of cell centers. `n = 0` is treated as 1.
    pub fn new(per_axis: u32) -> Self {
        let n = per_axis.max(1);
        let step = 1.0 / n as f32;
        let offsets = (0..n)
            .flat_map(|j| {
                (0..n).map(move |i| {
                    Vec2::new((i as f32 + 0.5) * step - 0.5, (j as f32 + 0.5) * step - 0.5)
                })
            })
            .collect();
        Self { offsets }
    }

    pub fn offsets(&self) -> &[Vec2] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Tile function evaluating a shader with supersampling.
pub struct ShaderTiles<'a, S> {
    shader: &'a S,
    grid: &'a SampleGrid,
}

impl<'a, S: Shader> ShaderTiles<'a, S> {
    pub fn new(shader: &'a S, grid: &'a SampleGrid) -> Self {
        Self { shader, grid }
    }
}

impl<'a, T, S: Shader> TileFunction<T> for ShaderTiles<'a, S> {
    type Pixel = SupersampledPixel<'a, S>;

    fn begin_tile(&self, _block: &WorkBlock<T>) -> Self::Pixel {
        SupersampledPixel {
            shader: self.shader,
            grid: self.grid,
        }
    }
}

/// Per-tile pixel function produced by [`ShaderTiles`].
pub struct SupersampledPixel<'a, S> {
    shader: &'a S,
    grid: &'a SampleGrid,
}

impl<T, S: Shader> PixelFunction<T> for SupersampledPixel<'_, S> {
    type Color = Color;

    fn shade(&mut self, _x: T, _y: T, sample: &SampleTransform) -> Color {
        let mut sum = Color::TRANSPARENT;
        for offset in self.grid.offsets() {
            sum += self.shader.shade(sample.apply(offset.x, offset.y));
        }
        sum * (1.0 / self.grid.len() as f32)
    }
}

/// Options for [`render`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Samples per pixel along each axis.
    /// Default: 2 (four samples per pixel).
    pub samples_per_axis: u32,

    /// Worker pool and tiling configuration.
    pub scheduler: SchedulerConfig,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            samples_per_axis: 2,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl RenderOptions {
    pub fn new(scheduler: SchedulerConfig) -> Self {
        Self {
            scheduler,
            ..Self::default()
        }
    }

    pub fn with_samples(mut self, samples_per_axis: u32) -> Self {
        self.samples_per_axis = samples_per_axis;
        self
    }
}

/// Shade every pixel of `target` in parallel.
///
/// A cancelled render leaves the untouched tiles as they were and reports
/// `cancelled` in the returned stats.
pub fn render<S: Shader>(
    shader: &S,
    target: &Framebuffer,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> Result<RunStats, RenderError> {
    let pool = WorkerPool::new(options.scheduler.clone());
    let domain = pool.decompose(target.range())?;
    let grid = SampleGrid::new(options.samples_per_axis);
    let tiles = ShaderTiles::new(shader, &grid);

    log::debug!(
        "rendering {}x{} with {} samples per pixel",
        target.width(),
        target.height(),
        grid.len()
    );

    Ok(pool.run(&domain, &tiles, target, cancel)?)
}
