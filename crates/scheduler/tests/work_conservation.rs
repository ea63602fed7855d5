use raster_scheduler::{
    CancellationToken, Domain, Range, SampleTransform, SchedulerConfig, WorkBlock, WorkerPool,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

fn visit_counts(width: usize, height: usize, max_size: usize, workers: usize) -> Vec<u32> {
    let domain = Domain::from_size(width, height, max_size).unwrap();
    let counts: Vec<AtomicU32> = (0..width * height).map(|_| AtomicU32::new(0)).collect();
    let store = |x: usize, y: usize, _color: ()| {
        counts[x + y * width].fetch_add(1, Ordering::Relaxed);
    };
    let tile_fn = |_block: &WorkBlock<usize>| |_x: usize, _y: usize, _sample: &SampleTransform| ();

    WorkerPool::new(SchedulerConfig::new(workers))
        .run(&domain, &tile_fn, &store, &CancellationToken::new())
        .unwrap();

    counts.into_iter().map(AtomicU32::into_inner).collect()
}

#[test]
fn every_pixel_visited_once_regardless_of_worker_count() {
    for workers in [1, 4, 16, 64] {
        let counts = visit_counts(100, 100, 32, workers);
        assert_eq!(counts.len(), 10_000);
        assert!(
            counts.iter().all(|&n| n == 1),
            "{workers} workers visited some pixel other than exactly once"
        );
    }
}

#[test]
fn non_square_domain_with_many_workers() {
    let counts = visit_counts(100, 37, 32, 16);
    assert!(counts.iter().all(|&n| n == 1));
}

#[test]
fn dispatched_tiles_are_disjoint_and_positive() {
    let domain = Domain::decompose(Range::new(-40i32, 90, 10, 77), 32).unwrap();
    let tiles = Mutex::new(Vec::new());

    WorkerPool::new(SchedulerConfig::new(8))
        .run_tiles(
            &domain,
            |block: &WorkBlock<i32>| tiles.lock().unwrap().push(block.tile),
            &CancellationToken::new(),
        )
        .unwrap();

    let tiles = tiles.into_inner().unwrap();
    for (i, a) in tiles.iter().enumerate() {
        assert!(a.width() > 0 && a.height() > 0, "degenerate tile {:?}", a);
        for b in &tiles[i + 1..] {
            assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
        }
    }
    let area: u64 = tiles.iter().map(Range::area).sum();
    assert_eq!(area, domain.area());
}

#[test]
fn cancellation_bounds_extra_tiles_by_worker_count() {
    let workers = 4;
    let domain = Domain::from_size(512, 512, 16).unwrap();
    let cancel = CancellationToken::new();
    let started = AtomicUsize::new(0);

    let stats = WorkerPool::new(SchedulerConfig::new(workers))
        .run_tiles(
            &domain,
            |_: &WorkBlock<i32>| {
                if started.fetch_add(1, Ordering::SeqCst) == 0 {
                    cancel.cancel();
                }
            },
            &cancel,
        )
        .unwrap();

    // The cancelling tile plus at most one in-flight tile per other worker.
    assert!(started.load(Ordering::SeqCst) <= workers + 1);
    assert!(stats.cancelled);
    assert!((stats.tiles_completed as usize) < domain.tile_count());
}

#[test]
fn external_deadline_cancels_run() {
    let domain = Domain::from_size(64, 64, 1).unwrap();
    let cancel = CancellationToken::new();
    let _watchdog = cancel
        .cancel_after(std::time::Duration::from_millis(20))
        .unwrap();

    let stats = WorkerPool::new(SchedulerConfig::new(2))
        .run_tiles(
            &domain,
            |_: &WorkBlock<i32>| std::thread::sleep(std::time::Duration::from_millis(1)),
            &cancel,
        )
        .unwrap();

    // 4096 tiles at 1ms each on two workers cannot finish inside 20ms.
    assert!(stats.cancelled);
    assert!((stats.tiles_completed as usize) < domain.tile_count());
}
