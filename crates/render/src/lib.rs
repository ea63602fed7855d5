//! Raster Render Library
//!
//! Pixel storage, colors, keyframe interpolation and supersampled shading on
//! top of the tile scheduler.

pub mod animation;
pub mod color;
pub mod framebuffer;
pub mod scene;
pub mod shade;

pub use animation::{Animated, Lerp};
pub use color::{Color, Rgba8};
pub use framebuffer::Framebuffer;
pub use scene::{Scene, SceneKind};
pub use shade::{render, RenderOptions, SampleGrid, Shader, ShaderTiles, SupersampledPixel};

use raster_scheduler::ScheduleError;

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("unknown scene `{0}` (expected gradient, checker or rings)")]
    UnknownScene(String),
}
