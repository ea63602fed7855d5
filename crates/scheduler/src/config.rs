//! Scheduler configuration
//!
//! Worker count, maximum tile size and the adaptive-split threshold. A
//! configuration can be built programmatically, read from environment
//! variables, or loaded from a flat `key = value` file.

use crate::domain::DEFAULT_TILE_SIZE;
use crate::queue::DEFAULT_MIN_SPLIT_SIZE;
use std::fs;
use std::io;
use std::path::Path;
use std::thread;

/// Environment variable overriding the worker count.
pub const ENV_WORKERS: &str = "RASTER_WORKERS";
/// Environment variable overriding the maximum tile size.
pub const ENV_TILE_SIZE: &str = "RASTER_TILE_SIZE";
/// Environment variable overriding the split threshold.
pub const ENV_MIN_SPLIT: &str = "RASTER_MIN_SPLIT";

/// Configuration for a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of worker threads per run.
    /// Default: number of logical CPU cores.
    pub num_workers: usize,

    /// Maximum tile edge length used by decomposition.
    /// Default: 64.
    pub tile_size: u32,

    /// Tiles whose shorter edge is at or below this are never split.
    /// Default: 4.
    pub min_split_size: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus(),
            tile_size: DEFAULT_TILE_SIZE,
            min_split_size: DEFAULT_MIN_SPLIT_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with `num_workers` threads and default sizes.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Self::default()
        }
    }

    /// Set the number of worker threads.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the maximum tile edge length.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set the adaptive split threshold.
    pub fn with_min_split_size(mut self, min_split_size: u32) -> Self {
        self.min_split_size = min_split_size;
        self
    }

    /// Check that every knob is usable.
    ///
    /// # Errors
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::InvalidValue("num_workers".to_string()));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::InvalidValue("tile_size".to_string()));
        }
        if self.min_split_size == 0 {
            return Err(ConfigError::InvalidValue("min_split_size".to_string()));
        }
        Ok(())
    }

    /// Loads configuration from environment variables, starting from defaults.
    ///
    /// Environment variables:
    /// - `RASTER_WORKERS`: worker thread count
    /// - `RASTER_TILE_SIZE`: maximum tile edge in pixels (default: 64)
    /// - `RASTER_MIN_SPLIT`: split threshold in pixels (default: 4)
    ///
    /// # Errors
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(ENV_WORKERS) {
            config.num_workers = parse_value(ENV_WORKERS, &val)?;
        }

        if let Ok(val) = std::env::var(ENV_TILE_SIZE) {
            config.tile_size = parse_value(ENV_TILE_SIZE, &val)?;
        }

        if let Ok(val) = std::env::var(ENV_MIN_SPLIT) {
            config.min_split_size = parse_value(ENV_MIN_SPLIT, &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format:
    /// ```toml
    /// workers = 8
    /// tile_size = 64
    /// min_split_size = 4
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string. Missing keys keep defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax(line.to_string()));
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');

            match key {
                "workers" => config.num_workers = parse_value(key, value)?,
                "tile_size" => config.tile_size = parse_value(key, value)?,
                "min_split_size" => config.min_split_size = parse_value(key, value)?,
                other => log::warn!("ignoring unknown configuration key `{other}`"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml())?;
        Ok(())
    }

    /// Converts configuration to TOML format.
    pub fn to_toml(&self) -> String {
        format!(
            "# Raster scheduler configuration\n\
             workers = {}\n\
             tile_size = {}\n\
             min_split_size = {}\n",
            self.num_workers, self.tile_size, self.min_split_size
        )
    }
}

fn parse_value<V: std::str::FromStr>(key: &str, value: &str) -> Result<V, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    /// A line that is not a `key = value` pair
    #[error("malformed configuration line: {0}")]
    Syntax(String),

    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Get the number of logical CPU cores.
///
/// This is used as the default number of worker threads.
pub fn num_cpus() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
