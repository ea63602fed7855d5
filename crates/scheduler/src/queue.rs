//! Shared tile queue with adaptive splitting
//!
//! All workers of a run pull from one FIFO. When the queue holds fewer tiles
//! than there are workers, a dequeued tile is halved: one half goes back to
//! the tail and the other is handed out, so large leftovers near the end of a
//! run get spread across idle workers instead of stranding them.

use crate::range::{Coord, Range};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Default shorter-edge threshold below which tiles are never split.
pub const DEFAULT_MIN_SPLIT_SIZE: u32 = 4;

/// Counters collected while the queue is drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tiles handed out to workers
    pub dispatched: u64,

    /// Adaptive splits performed
    pub splits: u64,
}

struct QueueState<T> {
    pending: VecDeque<Range<T>>,
    stats: QueueStats,
}

/// Work queue shared by every worker of one scheduling run.
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    workers: usize,
    min_split_size: T,
}

impl<T: Coord> WorkQueue<T> {
    /// Create a queue seeded with `tiles` in order.
    ///
    /// `workers` is the pool size the split policy compares the queue length
    /// against.
    pub fn new<I>(tiles: I, workers: usize, min_split_size: T) -> Self
    where
        I: IntoIterator<Item = Range<T>>,
    {
        Self {
            state: Mutex::new(QueueState {
                pending: tiles.into_iter().collect(),
                stats: QueueStats::default(),
            }),
            workers,
            min_split_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // The lock never guards user code, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the next tile, splitting it if the queue is running low.
    ///
    /// Returns `None` once the queue is empty. Pop, split and push happen in
    /// one critical section.
    pub fn take(&self) -> Option<Range<T>> {
        let mut state = self.lock();
        let tile = state.pending.pop_front()?;
        state.stats.dispatched += 1;

        if state.pending.len() < self.workers
            && tile.shorter_edge() > self.min_split_size
            && tile.can_split()
        {
            let (first, second) = tile.split();
            state.pending.push_back(second);
            state.stats.splits += 1;
            log::trace!("split {:?} into {:?} and {:?}", tile, first, second);
            return Some(first);
        }

        Some(tile)
    }

    /// Number of tiles currently waiting.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }

    /// Pool size the split policy was configured with.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Domain;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn drain<T: Coord>(queue: &WorkQueue<T>) -> Vec<Range<T>> {
        std::iter::from_fn(|| queue.take()).collect()
    }

    #[test]
    fn test_empty_queue_returns_none() {
        let queue: WorkQueue<i32> = WorkQueue::new(Vec::new(), 4, 4);
        assert!(queue.is_empty());
        assert_eq!(queue.take(), None);
        assert_eq!(queue.stats(), QueueStats::default());
    }

    #[test]
    fn test_well_stocked_queue_does_not_split() {
        let domain = Domain::from_size(256, 256, 64).unwrap();
        let queue = WorkQueue::new(domain.tiles.clone(), 2, 4);

        // 16 tiles, 2 workers: the first pops leave plenty queued.
        for expected in domain.tiles.iter().take(10) {
            assert_eq!(queue.take(), Some(*expected));
        }
        assert_eq!(queue.stats().splits, 0);
    }

    #[test]
    fn test_low_queue_splits_and_requeues() {
        let queue = WorkQueue::new(vec![Range::new(0, 64, 0, 32)], 4, 4);

        let first = queue.take().unwrap();
        assert_eq!(first, Range::new(0, 32, 0, 32));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().splits, 1);

        // The pushed-back half is split again on the next request.
        let second = queue.take().unwrap();
        assert_eq!(second, Range::new(32, 64, 0, 16));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_small_tiles_are_never_split() {
        let queue = WorkQueue::new(vec![Range::new(0, 100, 0, 4)], 8, 4);
        assert_eq!(queue.take(), Some(Range::new(0, 100, 0, 4)));
        assert_eq!(queue.take(), None);
        assert_eq!(queue.stats().splits, 0);
    }

    #[test]
    fn test_zero_threshold_stops_at_single_pixels() {
        let queue = WorkQueue::new(vec![Range::new(0i32, 1, 0, 1)], 2, 0);
        assert_eq!(queue.take(), Some(Range::new(0, 1, 0, 1)));
        assert_eq!(queue.take(), None);
        assert_eq!(queue.stats().splits, 0);

        let domain = Domain::from_size(5, 3, 4).unwrap();
        let queue = WorkQueue::new(domain.tiles.clone(), 4, 0);
        let tiles = drain(&queue);
        assert!(tiles.iter().all(|tile| !tile.is_empty()), "degenerate tile in {:?}", tiles);
        let area: u64 = tiles.iter().map(Range::area).sum();
        assert_eq!(area, 15);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_split_drain_conserves_area() {
        let domain = Domain::from_size(100u32, 37, 32).unwrap();
        let queue = WorkQueue::new(domain.tiles.clone(), 16, 4);
        let tiles = drain(&queue);

        let mut seen = HashSet::new();
        for tile in &tiles {
            assert!(tile.width() > 0 && tile.height() > 0, "degenerate {:?}", tile);
            for pixel in tile.pixels() {
                assert!(seen.insert(pixel));
            }
        }
        assert_eq!(seen.len() as u64, domain.area());
        assert!(queue.stats().splits > 0);
        assert_eq!(queue.stats().dispatched, tiles.len() as u64);
    }

    #[test]
    fn test_concurrent_take_hands_out_each_pixel_once() {
        let domain = Domain::from_size(200, 150, 32).unwrap();
        let queue = Arc::new(WorkQueue::new(domain.tiles.clone(), 8, 4));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || drain(&queue))
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for tile in handle.join().unwrap() {
                for pixel in tile.pixels() {
                    assert!(seen.insert(pixel), "pixel {:?} dispatched twice", pixel);
                }
            }
        }
        assert_eq!(seen.len() as u64, domain.area());
    }
}
