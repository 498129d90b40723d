use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;

use vigil_core::{
    CoordinatedTask, CycleOutcome, DistributedLock, LockStoreHandle, MemoryLockStore, MetricsBackend,
    StopFlag, WorkFn, WorkRef,
};
use vigil_model::{LockSpec, TaskSchedule};

const LOCK: &str = "update_progress";

fn lock_on(store: &Arc<MemoryLockStore>, timeout_ms: u64) -> DistributedLock {
    let handle: LockStoreHandle = store.clone();
    DistributedLock::new(LockSpec::new(LOCK, timeout_ms), handle).unwrap()
}

/// Work unit that tracks how many copies run at the same time.
struct Overlap {
    active: AtomicUsize,
    peak: AtomicUsize,
    runs: AtomicU32,
}

impl Overlap {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            runs: AtomicU32::new(0),
        })
    }

    fn work(self: &Arc<Self>) -> WorkRef {
        let this = Arc::clone(self);
        WorkFn::arc("overlap", move || {
            let this = Arc::clone(&this);
            async move {
                let now = this.active.fetch_add(1, Ordering::SeqCst) + 1;
                this.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                this.runs.fetch_add(1, Ordering::SeqCst);
                this.active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }
}

#[derive(Default)]
struct Recorder {
    cycles: Mutex<Vec<CycleOutcome>>,
    contention: AtomicU32,
}

impl MetricsBackend for Recorder {
    fn record_cycle(&self, lock: &str, outcome: CycleOutcome, _: u64) {
        assert_eq!(lock, LOCK);
        self.cycles.lock().unwrap().push(outcome);
    }

    fn record_contention(&self, _: &str) {
        self.contention.fetch_add(1, Ordering::SeqCst);
    }

    fn record_store_error(&self, _: &str) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn at_most_one_process_works_at_a_time() {
    let store = Arc::new(MemoryLockStore::new());
    let stop = StopFlag::new();
    let overlap = Overlap::new();

    let schedule = TaskSchedule {
        contention_backoff_ms: 1,
        ..TaskSchedule::every(3)
    };

    let handles: Vec<_> = (0..6)
        .map(|_| {
            CoordinatedTask::new(lock_on(&store, 60_000), overlap.work(), schedule.clone(), stop.clone())
                .unwrap()
                .spawn()
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop.set();

    let mut cycles = 0;
    for h in handles {
        cycles += h.await.unwrap().cycles;
    }

    assert_eq!(overlap.peak.load(Ordering::SeqCst), 1);
    assert!(cycles > 0);
    assert_eq!(u64::from(overlap.runs.load(Ordering::SeqCst)), cycles);
    assert!(!store.is_locked(LOCK));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn busy_poll_default_still_excludes_competitors() {
    let store = Arc::new(MemoryLockStore::new());
    let stop = StopFlag::new();
    let overlap = Overlap::new();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            CoordinatedTask::new(
                lock_on(&store, 60_000),
                overlap.work(),
                TaskSchedule::every(5),
                stop.clone(),
            )
            .unwrap()
            .spawn()
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.set();

    let mut contended = 0;
    for h in handles {
        contended += h.await.unwrap().contended;
    }
    assert_eq!(overlap.peak.load(Ordering::SeqCst), 1);
    assert!(contended > 0);
}

#[tokio::test(start_paused = true)]
async fn crashed_holder_blocks_competitor_until_expiry() {
    let store = Arc::new(MemoryLockStore::new());
    let stop = StopFlag::new();

    // Process A takes the lock and dies without releasing it.
    let mut crashed = lock_on(&store, 60_000);
    assert!(crashed.acquire().await.unwrap());
    drop(crashed);

    let first_run = Arc::new(Mutex::new(None::<Instant>));
    let work = {
        let first_run = Arc::clone(&first_run);
        WorkFn::arc("progress", move || {
            let first_run = Arc::clone(&first_run);
            async move {
                first_run.lock().unwrap().get_or_insert_with(Instant::now);
                Ok(())
            }
        })
    };

    let recorder = Arc::new(Recorder::default());
    let schedule = TaskSchedule {
        contention_backoff_ms: 6_000,
        ..TaskSchedule::every(6_000)
    };
    let started = Instant::now();
    let handle = CoordinatedTask::new(lock_on(&store, 60_000), work, schedule, stop.clone())
        .unwrap()
        .with_metrics(recorder.clone())
        .spawn();

    tokio::time::sleep(Duration::from_secs(61)).await;
    stop.set();
    let report = handle.await.unwrap();

    let ran_at = (*first_run.lock().unwrap()).expect("competitor must eventually run");
    let waited = ran_at - started;
    assert!(waited >= Duration::from_secs(60), "ran after {waited:?}");
    assert!(waited < Duration::from_secs(61), "ran after {waited:?}");

    assert_eq!(report.cycles, 1);
    assert_eq!(report.contended, 10);
    assert_eq!(recorder.contention.load(Ordering::SeqCst), 10);
    assert_eq!(*recorder.cycles.lock().unwrap(), vec![CycleOutcome::Success]);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_work_finishes_cycle_and_starts_no_other() {
    let store = Arc::new(MemoryLockStore::new());
    let stop = StopFlag::new();
    let completed = Arc::new(AtomicU32::new(0));

    let work = {
        let completed = Arc::clone(&completed);
        let stop = stop.clone();
        WorkFn::arc("slow", move || {
            let completed = Arc::clone(&completed);
            let stop = stop.clone();
            async move {
                // The stop request lands while this unit is running.
                stop.set();
                tokio::time::sleep(Duration::from_millis(300)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    };

    let report = CoordinatedTask::new(lock_on(&store, 60_000), work, TaskSchedule::default(), stop)
        .unwrap()
        .run()
        .await;

    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(report.cycles, 1);
    assert!(!store.is_locked(LOCK));
}
