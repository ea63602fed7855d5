//! Raster Scheduler Library
//!
//! Parallel tile scheduler for 2D raster work.
//!
//! A rectangular pixel domain is decomposed into tiles no larger than a
//! configured edge length. A pool of worker threads drains the tiles from one
//! shared queue, which halves tiles on demand when it runs low so that no
//! worker is left holding a disproportionate share near the end of a run.
//! For every pixel the caller receives a [`SampleTransform`] mapping
//! intra-pixel offsets into the domain's normalized `[-0.5, 0.5]²` space,
//! which makes supersampled shading resolution independent.
//!
//! # Example
//!
//! ```
//! use raster_scheduler::{
//!     parallel_for, CancellationToken, Domain, SampleTransform, WorkBlock,
//! };
//! use std::sync::Mutex;
//!
//! let domain = Domain::from_size(64u32, 48, 16).unwrap();
//! let image = Mutex::new(vec![0.0f32; 64 * 48]);
//!
//! // One pixel function per tile; here it just returns the pixel center's x.
//! let tile_fn = |_block: &WorkBlock<u32>| {
//!     |_x: u32, _y: u32, sample: &SampleTransform| sample.apply(0.0, 0.0).x
//! };
//! let store = |x: u32, y: u32, value: f32| {
//!     image.lock().unwrap()[(x + y * 64) as usize] = value;
//! };
//!
//! let stats = parallel_for(&domain, &tile_fn, &store, &CancellationToken::new()).unwrap();
//! assert_eq!(stats.pixels, 64 * 48);
//! ```

mod cancel;
mod config;
mod domain;
mod error;
mod queue;
mod range;
mod sample;
mod tile;
mod worker;

// Re-export public API
pub use cancel::{CancellationToken, Watchdog};
pub use config::{num_cpus, ConfigError, SchedulerConfig};
pub use domain::{Domain, DEFAULT_TILE_SIZE};
pub use error::{Axis, ScheduleError, ScheduleResult};
pub use queue::{QueueStats, WorkQueue, DEFAULT_MIN_SPLIT_SIZE};
pub use range::{midpoint, Coord, Pixels, Range};
pub use sample::{map, SampleTransform, Vec2};
pub use tile::{iterate_tile, PixelFunction, PixelStore, TileFunction, WorkBlock};
pub use worker::{parallel_for, parallel_for_tiles, RunStats, WorkerPool};
