//! Worker pool driving a tile-parallel run.
//!
//! A run spawns a fixed number of scoped worker threads. Each worker loops:
//! check the cancellation token, take a tile from the shared
//! [`WorkQueue`], run the caller's tile function on it. The call returns once
//! every worker has stopped.

use crate::cancel::CancellationToken;
use crate::config::SchedulerConfig;
use crate::domain::Domain;
use crate::error::{ScheduleError, ScheduleResult};
use crate::queue::WorkQueue;
use crate::range::{Coord, Range};
use crate::tile::{iterate_tile, PixelFunction, PixelStore, TileFunction, WorkBlock};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

/// Summary of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Worker threads used
    pub workers: usize,

    /// Tiles produced by decomposition
    pub tiles_planned: usize,

    /// Tiles whose work function returned, including split halves
    pub tiles_completed: u64,

    /// Adaptive splits performed by the queue
    pub splits: u64,

    /// Pixels in the scheduled domain
    pub pixels: u64,

    /// Work was left undone because the token was cancelled
    pub cancelled: bool,

    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
}

/// Tile-parallel executor.
///
/// The pool holds only configuration; threads are spawned per run and
/// joined before the run returns.
///
/// # Example
///
/// ```
/// use raster_scheduler::{CancellationToken, Domain, SchedulerConfig, WorkBlock, WorkerPool};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let domain = Domain::from_size(128u32, 96, 32).unwrap();
/// let pool = WorkerPool::new(SchedulerConfig::new(4));
/// let pixels = AtomicU64::new(0);
///
/// let stats = pool
///     .run_tiles(&domain, |block: &WorkBlock<u32>| {
///         pixels.fetch_add(block.tile.area(), Ordering::Relaxed);
///     }, &CancellationToken::new())
///     .unwrap();
///
/// assert_eq!(pixels.load(Ordering::Relaxed), 128 * 96);
/// assert!(!stats.cancelled);
/// ```
#[derive(Debug, Clone)]
pub struct WorkerPool {
    config: SchedulerConfig,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl WorkerPool {
    /// Create a pool from a configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Get the number of worker threads spawned per run.
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Decompose `range` using the configured tile size.
    pub fn decompose<T: Coord>(&self, range: Range<T>) -> ScheduleResult<Domain<T>> {
        let max_size = T::from_u32(self.config.tile_size).unwrap_or(T::MAX);
        Domain::decompose(range, max_size)
    }

    /// Run `per_tile` once for every tile of `domain`.
    ///
    /// Blocks until all tiles are done, the token is cancelled, or a tile
    /// function panics. Cancellation is not an error: the returned stats
    /// report it.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidWorkerCount`] for an empty pool,
    /// [`ScheduleError::Spawn`] if a thread cannot be created and
    /// [`ScheduleError::WorkerPanicked`] if a tile function panicked.
    pub fn run_tiles<T, F>(
        &self,
        domain: &Domain<T>,
        per_tile: F,
        cancel: &CancellationToken,
    ) -> ScheduleResult<RunStats>
    where
        T: Coord,
        F: Fn(&WorkBlock<T>) + Sync,
    {
        let workers = self.config.num_workers;
        if workers == 0 {
            return Err(ScheduleError::InvalidWorkerCount);
        }

        let start = Instant::now();
        let min_split_size = T::from_u32(self.config.min_split_size).unwrap_or(T::MAX);
        let queue = WorkQueue::new(domain.tiles.iter().copied(), workers, min_split_size);
        let completed = AtomicU64::new(0);
        let abort = AtomicBool::new(false);

        log::debug!(
            "scheduling {} tiles over {:?} on {} workers",
            domain.tile_count(),
            domain.range,
            workers
        );

        let failure = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            let mut failure = None;

            for id in 0..workers {
                let worker = Worker {
                    id,
                    domain: domain.range,
                    queue: &queue,
                    per_tile: &per_tile,
                    cancel,
                    abort: &abort,
                    completed: &completed,
                };
                let spawned = thread::Builder::new()
                    .name(format!("raster-worker-{}", id))
                    .spawn_scoped(scope, move || worker.run());

                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(err) => {
                        // Already-running workers drain nothing further.
                        abort.store(true, Ordering::Release);
                        failure = Some(ScheduleError::Spawn(err));
                        break;
                    }
                }
            }

            for (id, handle) in handles {
                let outcome = match handle.join() {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(panic_message(payload.as_ref())),
                };
                if let Err(message) = outcome {
                    log::warn!("worker {} panicked: {}", id, message);
                    if failure.is_none() {
                        failure = Some(ScheduleError::WorkerPanicked { worker: id, message });
                    }
                }
            }

            failure
        });

        if let Some(err) = failure {
            return Err(err);
        }

        let queue_stats = queue.stats();
        let stats = RunStats {
            workers,
            tiles_planned: domain.tile_count(),
            tiles_completed: completed.load(Ordering::Acquire),
            splits: queue_stats.splits,
            pixels: domain.area(),
            cancelled: cancel.is_cancelled() && !queue.is_empty(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        log::debug!(
            "run finished: {} tiles, {} splits, cancelled={} in {}ms",
            stats.tiles_completed,
            stats.splits,
            stats.cancelled,
            stats.elapsed_ms
        );

        Ok(stats)
    }

    /// Run a two-stage tile function over every pixel of `domain`.
    ///
    /// For each tile, `tile_fn` produces a pixel function which is invoked
    /// per pixel in row-major order; its colors are handed to `store`.
    pub fn run<T, F, S>(
        &self,
        domain: &Domain<T>,
        tile_fn: &F,
        store: &S,
        cancel: &CancellationToken,
    ) -> ScheduleResult<RunStats>
    where
        T: Coord,
        F: TileFunction<T>,
        S: PixelStore<T, <F::Pixel as PixelFunction<T>>::Color> + ?Sized,
    {
        self.run_tiles(
            domain,
            |block: &WorkBlock<T>| {
                let mut pixel = tile_fn.begin_tile(block);
                iterate_tile(block, &mut pixel, store);
            },
            cancel,
        )
    }
}

/// Run `per_tile` for every tile of `domain` with the default configuration.
pub fn parallel_for_tiles<T, F>(
    domain: &Domain<T>,
    per_tile: F,
    cancel: &CancellationToken,
) -> ScheduleResult<RunStats>
where
    T: Coord,
    F: Fn(&WorkBlock<T>) + Sync,
{
    WorkerPool::default().run_tiles(domain, per_tile, cancel)
}

/// Shade every pixel of `domain` with the default configuration.
pub fn parallel_for<T, F, S>(
    domain: &Domain<T>,
    tile_fn: &F,
    store: &S,
    cancel: &CancellationToken,
) -> ScheduleResult<RunStats>
where
    T: Coord,
    F: TileFunction<T>,
    S: PixelStore<T, <F::Pixel as PixelFunction<T>>::Color> + ?Sized,
{
    WorkerPool::default().run(domain, tile_fn, store, cancel)
}

/// State borrowed by one worker thread for the duration of a run.
struct Worker<'a, T, F> {
    id: usize,
    domain: Range<T>,
    queue: &'a WorkQueue<T>,
    per_tile: &'a F,
    cancel: &'a CancellationToken,
    abort: &'a AtomicBool,
    completed: &'a AtomicU64,
}

impl<T, F> Worker<'_, T, F>
where
    T: Coord,
    F: Fn(&WorkBlock<T>) + Sync,
{
    /// Main worker loop.
    ///
    /// Returns the panic message if the tile function panicked.
    fn run(self) -> Result<(), String> {
        let mut processed = 0u64;

        loop {
            if self.cancel.is_cancelled() || self.abort.load(Ordering::Acquire) {
                break;
            }

            let Some(tile) = self.queue.take() else {
                break;
            };

            let block = WorkBlock::new(tile, self.domain);
            let result = panic::catch_unwind(AssertUnwindSafe(|| (self.per_tile)(&block)));
            if let Err(payload) = result {
                // Stop the other workers from picking up more tiles.
                self.abort.store(true, Ordering::Release);
                return Err(panic_message(payload.as_ref()));
            }

            self.completed.fetch_add(1, Ordering::AcqRel);
            processed += 1;
        }

        log::trace!("worker {} stopped after {} tiles", self.id, processed);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleTransform;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn test_worker_pool_creation() {
        let pool = WorkerPool::new(SchedulerConfig::new(3));
        assert_eq!(pool.num_workers(), 3);
        assert!(WorkerPool::default().num_workers() > 0);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let domain = Domain::from_size(10, 10, 4).unwrap();
        let pool = WorkerPool::new(SchedulerConfig::new(0));
        let result = pool.run_tiles(&domain, |_: &WorkBlock<i32>| {}, &CancellationToken::new());
        assert!(matches!(result, Err(ScheduleError::InvalidWorkerCount)));
    }

    #[test]
    fn test_decompose_uses_configured_tile_size() {
        let pool = WorkerPool::new(SchedulerConfig::new(1).with_tile_size(32));
        let domain = pool.decompose(Range::from_size(64u16, 64)).unwrap();
        assert_eq!(domain.tile_count(), 4);
    }

    #[test]
    fn test_zero_split_threshold_terminates() {
        let domain = Domain::from_size(8u32, 8, 8).unwrap();
        let pool = WorkerPool::new(SchedulerConfig::new(2).with_min_split_size(0));
        let seen = Mutex::new(HashSet::new());

        let stats = pool
            .run_tiles(
                &domain,
                |block: &WorkBlock<u32>| {
                    assert!(!block.tile.is_empty(), "empty tile {:?}", block.tile);
                    let mut seen = seen.lock().unwrap();
                    for pixel in block.tile.pixels() {
                        assert!(seen.insert(pixel), "pixel {:?} visited twice", pixel);
                    }
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(seen.lock().unwrap().len(), 64);
        assert_eq!(stats.tiles_completed, 1 + stats.splits);
    }

    #[test]
    fn test_run_tiles_covers_domain() {
        let domain = Domain::from_size(300u32, 200, 64).unwrap();
        let pool = WorkerPool::new(SchedulerConfig::new(4));
        let covered = AtomicU64::new(0);

        let stats = pool
            .run_tiles(
                &domain,
                |block: &WorkBlock<u32>| {
                    assert_eq!(block.domain, domain.range);
                    covered.fetch_add(block.tile.area(), Ordering::Relaxed);
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(covered.load(Ordering::Relaxed), 300 * 200);
        assert_eq!(stats.workers, 4);
        assert_eq!(stats.pixels, 300 * 200);
        assert_eq!(stats.tiles_planned, domain.tile_count());
        assert_eq!(stats.tiles_completed, domain.tile_count() as u64 + stats.splits);
        assert!(!stats.cancelled);
    }

    #[test]
    fn test_run_visits_every_pixel_once() {
        let domain = Domain::from_size(70, 45, 16).unwrap();
        let pool = WorkerPool::new(SchedulerConfig::new(6));
        let visited = Mutex::new(HashSet::new());
        let store = |x: i32, y: i32, _color: ()| {
            assert!(visited.lock().unwrap().insert((x, y)));
        };
        let tile_fn = |_block: &WorkBlock<i32>| |_x: i32, _y: i32, _sample: &SampleTransform| ();

        pool.run(&domain, &tile_fn, &store, &CancellationToken::new())
            .unwrap();

        assert_eq!(visited.into_inner().unwrap().len(), 70 * 45);
    }

    #[test]
    fn test_empty_domain_runs_nothing() {
        let domain = Domain::from_size(0, 50, 16).unwrap();
        let calls = AtomicUsize::new(0);
        let stats = WorkerPool::new(SchedulerConfig::new(4))
            .run_tiles(
                &domain,
                |_: &WorkBlock<i32>| {
                    calls.fetch_add(1, Ordering::Relaxed);
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(stats.tiles_completed, 0);
    }

    #[test]
    fn test_pre_cancelled_token_dispatches_nothing() {
        let domain = Domain::from_size(128, 128, 32).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let calls = AtomicUsize::new(0);
        let stats = WorkerPool::new(SchedulerConfig::new(4))
            .run_tiles(
                &domain,
                |_: &WorkBlock<i32>| {
                    calls.fetch_add(1, Ordering::Relaxed);
                },
                &cancel,
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert!(stats.cancelled);
    }

    #[test]
    fn test_single_worker_cancellation_is_exact() {
        let domain = Domain::from_size(256, 256, 32).unwrap();
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);

        let stats = WorkerPool::new(SchedulerConfig::new(1))
            .run_tiles(
                &domain,
                |_: &WorkBlock<i32>| {
                    if calls.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                        cancel.cancel();
                    }
                },
                &cancel,
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.tiles_completed, 3);
        assert!(stats.cancelled);
    }

    #[test]
    fn test_panic_aborts_run() {
        let domain = Domain::from_size(256, 256, 16).unwrap();
        let calls = AtomicUsize::new(0);

        let result = WorkerPool::new(SchedulerConfig::new(4)).run_tiles(
            &domain,
            |block: &WorkBlock<i32>| {
                calls.fetch_add(1, Ordering::SeqCst);
                if block.tile.min_x == 0 && block.tile.min_y == 0 {
                    panic!("shader exploded");
                }
            },
            &CancellationToken::new(),
        );

        match result {
            Err(ScheduleError::WorkerPanicked { message, .. }) => {
                assert_eq!(message, "shader exploded");
            }
            other => panic!("expected a worker panic, got {:?}", other),
        }
        // The origin tile is first in queue order, so the abort lands early.
        assert!(calls.load(Ordering::SeqCst) < domain.tile_count());
    }

    #[test]
    fn test_panic_message_formats() {
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_run_stats_serialize() {
        let stats = RunStats {
            workers: 2,
            tiles_planned: 4,
            tiles_completed: 5,
            splits: 1,
            pixels: 100,
            cancelled: false,
            elapsed_ms: 3,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["tiles_completed"], 5);
        assert_eq!(json["cancelled"], false);
    }
}
