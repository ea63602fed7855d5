use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use raster_render::{render, Animated, Framebuffer, RenderOptions, Scene, SceneKind};
use raster_scheduler::{CancellationToken, Domain, RunStats, SchedulerConfig, DEFAULT_TILE_SIZE};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "raster")]
#[command(about = "Parallel tile renderer")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a scene to a PNG file.
    Render {
        #[arg(long, default_value = "rings")]
        scene: SceneKind,
        #[arg(long, default_value_t = 512)]
        width: u32,
        #[arg(long, default_value_t = 512)]
        height: u32,
        /// Sub-pixel samples per axis.
        #[arg(long, default_value_t = 2)]
        samples: u32,
        /// Animation time, 0 to 1.
        #[arg(long, default_value_t = 0.0)]
        time: f32,
        /// Cancel the render after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print run statistics as JSON instead of the output path.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        scheduler: SchedulerArgs,
    },
    /// Print the tile decomposition of a domain as JSON.
    Tiles {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
        tile_size: u32,
    },
    /// Render an animation loop as numbered PNG frames.
    Animate {
        #[arg(long, default_value = "rings")]
        scene: SceneKind,
        #[arg(long, default_value_t = 256)]
        width: u32,
        #[arg(long, default_value_t = 256)]
        height: u32,
        #[arg(long, default_value_t = 2)]
        samples: u32,
        #[arg(long, default_value_t = 8)]
        frames: usize,
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
        #[command(flatten)]
        scheduler: SchedulerArgs,
    },
    /// Print CLI version.
    Version,
}

/// Scheduler overrides applied on top of the config file or environment.
#[derive(Debug, Args)]
struct SchedulerArgs {
    /// Worker threads (default: logical CPU count).
    #[arg(long)]
    workers: Option<usize>,
    /// Maximum tile edge in pixels.
    #[arg(long)]
    tile_size: Option<u32>,
    /// Tiles with a shorter edge at or below this are never split.
    #[arg(long)]
    min_split: Option<u32>,
    /// Scheduler configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl SchedulerArgs {
    fn resolve(&self) -> Result<SchedulerConfig> {
        let mut config = match &self.config {
            Some(path) => SchedulerConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => SchedulerConfig::from_env().context("invalid scheduler environment")?,
        };

        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(tile_size) = self.tile_size {
            config = config.with_tile_size(tile_size);
        }
        if let Some(min_split) = self.min_split {
            config = config.with_min_split_size(min_split);
        }

        config.validate().context("invalid scheduler options")?;
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct RenderReport {
    output: String,
    scene: String,
    width: u32,
    height: u32,
    samples_per_pixel: u32,
    #[serde(flatten)]
    stats: RunStats,
}

#[derive(Debug, Serialize)]
struct TilesOutput {
    width: u32,
    height: u32,
    tile_size: u32,
    count: usize,
    tiles: Vec<TileOutput>,
}

#[derive(Debug, Serialize)]
struct TileOutput {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Render { scene, width, height, samples, time, timeout_ms, output, json, scheduler } => {
            let options = RenderOptions::new(scheduler.resolve()?).with_samples(samples);
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{scene}.png")));
            run_render(scene, width, height, time, timeout_ms, &options, &output, json)
        }
        Commands::Tiles { width, height, tile_size } => run_tiles(width, height, tile_size),
        Commands::Animate { scene, width, height, samples, frames, output_dir, scheduler } => {
            let options = RenderOptions::new(scheduler.resolve()?).with_samples(samples);
            run_animate(scene, width, height, frames, &options, &output_dir)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_render(
    kind: SceneKind,
    width: u32,
    height: u32,
    time: f32,
    timeout_ms: Option<u64>,
    options: &RenderOptions,
    output: &Path,
    json: bool,
) -> Result<()> {
    ensure_size(width, height)?;

    let cancel = CancellationToken::new();
    let watchdog = timeout_ms
        .map(|ms| cancel.cancel_after(Duration::from_millis(ms)))
        .transpose()
        .context("failed to start render deadline")?;

    let stats = render_frame(kind, width, height, time, options, &cancel, output)?;
    drop(watchdog);

    if json {
        let report = RenderReport {
            output: output.display().to_string(),
            scene: kind.to_string(),
            width,
            height,
            samples_per_pixel: options.samples_per_axis.max(1).pow(2),
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output.display());
    }

    Ok(())
}

fn run_tiles(width: u32, height: u32, tile_size: u32) -> Result<()> {
    let domain = Domain::from_size(width, height, tile_size).context("failed to decompose domain")?;

    let payload = TilesOutput {
        width,
        height,
        tile_size,
        count: domain.tile_count(),
        tiles: domain
            .tiles
            .iter()
            .map(|tile| TileOutput {
                min_x: tile.min_x,
                max_x: tile.max_x,
                min_y: tile.min_y,
                max_y: tile.max_y,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_animate(
    kind: SceneKind,
    width: u32,
    height: u32,
    frames: usize,
    options: &RenderOptions,
    output_dir: &Path,
) -> Result<()> {
    ensure_size(width, height)?;
    if frames == 0 {
        anyhow::bail!("--frames must be >= 1");
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    // A loop: the last frame stops one step short of wrapping to the first.
    let end = (frames - 1) as f32 / frames as f32;
    let clock = Animated::new(0.0f32, end);
    let cancel = CancellationToken::new();

    for (index, time) in clock.frames(frames).enumerate() {
        let output = output_dir.join(format!("frame-{index:04}.png"));
        render_frame(kind, width, height, time, options, &cancel, &output)?;
        println!("{}", output.display());
    }

    Ok(())
}

fn render_frame(
    kind: SceneKind,
    width: u32,
    height: u32,
    time: f32,
    options: &RenderOptions,
    cancel: &CancellationToken,
    output: &Path,
) -> Result<RunStats> {
    let scene = Scene::new(kind, width, height).with_time(time);
    let framebuffer = Framebuffer::new(width, height);

    let stats = render(&scene, &framebuffer, options, cancel).context("render failed")?;
    if stats.cancelled {
        log::warn!(
            "render cancelled after {} of {} tiles; image is incomplete",
            stats.tiles_completed,
            stats.tiles_planned
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    framebuffer
        .save(output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    Ok(stats)
}

fn ensure_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("width and height must be positive (got {width}x{height})");
    }
    Ok(())
}
