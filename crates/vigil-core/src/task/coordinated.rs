use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tracing::{debug, error, info, warn};

use vigil_model::TaskSchedule;

use crate::{
    error::CoreError,
    lock::DistributedLock,
    metrics::{CycleOutcome, MetricsHandle, noop_metrics},
    shutdown::StopFlag,
    task::{TaskReport, TaskState, WorkRef},
};

/// Periodic unit of work, run by at most one process of the fleet at a time.
///
/// Each cycle: take the lock, run the work, release, wait out the interval.
/// A lost lock attempt is retried right away (or after the configured
/// contention backoff). The stop flag is checked before every cycle and cuts
/// the wait short; a unit of work already running is never interrupted.
pub struct CoordinatedTask {
    lock: DistributedLock,
    work: WorkRef,
    schedule: TaskSchedule,
    stop: StopFlag,
    metrics: MetricsHandle,
    state: watch::Sender<TaskState>,
}

impl CoordinatedTask {
    pub fn new(
        lock: DistributedLock,
        work: WorkRef,
        schedule: TaskSchedule,
        stop: StopFlag,
    ) -> Result<Self, CoreError> {
        schedule.validate()?;
        let (state, _) = watch::channel(TaskState::Idle);

        Ok(Self {
            lock,
            work,
            schedule,
            stop,
            metrics: noop_metrics(),
            state,
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Watch state transitions. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }

    /// Run the loop on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<TaskReport> {
        tokio::spawn(self.run())
    }

    /// Run the loop until the stop flag is set.
    pub async fn run(mut self) -> TaskReport {
        let lock = self.lock.name().to_string();
        let mut report = TaskReport::default();

        info!(
            lock = %lock,
            work = self.work.name(),
            interval_ms = self.schedule.interval_ms,
            hold_through_wait = self.schedule.hold_through_wait,
            "coordinated task started"
        );

        while !self.stop.is_set() {
            self.set_state(TaskState::AttemptingLock);

            match self.lock.acquire().await {
                Ok(true) => {}
                Ok(false) => {
                    report.contended += 1;
                    self.metrics.record_contention(&lock);
                    self.lock.release().await;
                    self.back_off().await;
                    continue;
                }
                Err(e) => {
                    report.store_errors += 1;
                    self.metrics.record_store_error(&lock);
                    warn!(lock = %lock, error = %e, "lock acquire failed");
                    self.lock.release().await;
                    self.set_state(TaskState::Waiting);
                    self.pause(self.schedule.interval()).await;
                    continue;
                }
            }

            self.set_state(TaskState::Working);
            report.cycles += 1;
            if self.run_once(&lock, report.cycles).await != CycleOutcome::Success {
                report.failures += 1;
            }

            if !self.schedule.hold_through_wait {
                self.lock.release().await;
            }
            self.set_state(TaskState::Waiting);
            self.pause(self.schedule.interval()).await;
            self.lock.release().await;
        }

        self.lock.release().await;
        self.set_state(TaskState::Stopped);
        info!(
            lock = %lock,
            cycles = report.cycles,
            failures = report.failures,
            "coordinated task stopped"
        );
        report
    }

    /// Run the work unit in its own tokio task so a panic stays contained.
    async fn run_once(&self, lock: &str, cycle: u64) -> CycleOutcome {
        let started = Instant::now();
        let work = Arc::clone(&self.work);
        let joined = tokio::spawn(async move { work.run().await }).await;

        let outcome = match joined {
            Ok(Ok(())) => {
                debug!(lock, cycle, work = self.work.name(), "work unit completed");
                CycleOutcome::Success
            }
            Ok(Err(e)) => {
                error!(lock, cycle, work = self.work.name(), error = %e, "work unit failed");
                CycleOutcome::Failure
            }
            Err(e) if e.is_panic() => {
                error!(lock, cycle, work = self.work.name(), error = %e, "work unit panicked");
                CycleOutcome::Panicked
            }
            Err(e) => {
                warn!(lock, cycle, work = self.work.name(), error = %e, "work unit cancelled");
                CycleOutcome::Failure
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.record_cycle(lock, outcome, elapsed_ms);
        outcome
    }

    async fn back_off(&self) {
        match self.schedule.contention_backoff() {
            Some(delay) => self.pause(delay).await,
            None => tokio::task::yield_now().await,
        }
    }

    /// Sleep for `delay`, returning early once the stop flag is set.
    async fn pause(&self, delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.stop.wait() => {}
        }
    }

    fn set_state(&self, next: TaskState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use vigil_model::LockSpec;

    use super::*;
    use crate::{
        lock::{LockStoreHandle, MemoryLockStore},
        task::{WorkError, WorkFn},
    };

    fn task_with(
        store: &Arc<MemoryLockStore>,
        work: WorkRef,
        schedule: TaskSchedule,
        stop: &StopFlag,
    ) -> CoordinatedTask {
        let handle: LockStoreHandle = store.clone();
        let lock = DistributedLock::new(LockSpec::new("update_progress", 60_000), handle).unwrap();
        CoordinatedTask::new(lock, work, schedule, stop.clone()).unwrap()
    }

    fn noop_work() -> WorkRef {
        WorkFn::arc("noop", || async { Ok(()) })
    }

    #[test]
    fn new_rejects_zero_interval() {
        let store: LockStoreHandle = Arc::new(MemoryLockStore::new());
        let lock = DistributedLock::new(LockSpec::new("update_progress", 60_000), store).unwrap();
        let res = CoordinatedTask::new(lock, noop_work(), TaskSchedule::every(0), StopFlag::new());
        assert!(matches!(res, Err(CoreError::Model(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_work_does_not_stop_loop() {
        let store = Arc::new(MemoryLockStore::new());
        let stop = StopFlag::new();
        let calls = Arc::new(AtomicU32::new(0));

        let work = {
            let calls = Arc::clone(&calls);
            WorkFn::arc("flaky", move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(WorkError::failed("injected"))
                    } else {
                        Ok(())
                    }
                }
            })
        };

        let handle = task_with(&store, work, TaskSchedule::every(10), &stop).spawn();
        tokio::time::sleep(Duration::from_millis(35)).await;
        stop.set();

        let report = handle.await.unwrap();
        assert!(report.cycles >= 3, "cycles: {}", report.cycles);
        assert_eq!(report.failures, 1);
        assert!(!store.is_locked("update_progress"));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_work_does_not_stop_loop() {
        let store = Arc::new(MemoryLockStore::new());
        let stop = StopFlag::new();
        let calls = Arc::new(AtomicU32::new(0));

        let work = {
            let calls = Arc::clone(&calls);
            WorkFn::arc("panicky", move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        panic!("injected panic");
                    }
                    Ok(())
                }
            })
        };

        let handle = task_with(&store, work, TaskSchedule::every(10), &stop).spawn();
        tokio::time::sleep(Duration::from_millis(25)).await;
        stop.set();

        let report = handle.await.unwrap();
        assert!(report.cycles >= 2);
        assert_eq!(report.failures, 1);
        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert!(!store.is_locked("update_progress"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_wait_exits_before_interval() {
        let store = Arc::new(MemoryLockStore::new());
        let stop = StopFlag::new();
        let task = task_with(&store, noop_work(), TaskSchedule::every(60_000), &stop);
        let mut states = task.subscribe();

        let started = Instant::now();
        let handle = task.spawn();
        states
            .wait_for(|s| *s == TaskState::Waiting)
            .await
            .unwrap();
        stop.set();

        let report = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop must exit before the interval elapses")
            .unwrap();
        assert_eq!(report.cycles, 1);
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(*states.borrow(), TaskState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn lock_is_free_while_waiting_by_default() {
        let store = Arc::new(MemoryLockStore::new());
        let stop = StopFlag::new();
        let task = task_with(&store, noop_work(), TaskSchedule::every(1_000), &stop);
        let mut states = task.subscribe();
        let handle = task.spawn();

        states
            .wait_for(|s| *s == TaskState::Waiting)
            .await
            .unwrap();
        assert!(!store.is_locked("update_progress"));

        stop.set();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn hold_through_wait_keeps_lock_until_interval_ends() {
        let store = Arc::new(MemoryLockStore::new());
        let stop = StopFlag::new();
        let schedule = TaskSchedule {
            hold_through_wait: true,
            ..TaskSchedule::every(1_000)
        };
        let task = task_with(&store, noop_work(), schedule, &stop);
        let mut states = task.subscribe();
        let handle = task.spawn();

        states
            .wait_for(|s| *s == TaskState::Waiting)
            .await
            .unwrap();
        assert!(store.is_locked("update_progress"));

        stop.set();
        handle.await.unwrap();
        assert!(!store.is_locked("update_progress"));
    }

    #[tokio::test]
    async fn stop_before_start_runs_no_cycle() {
        let store = Arc::new(MemoryLockStore::new());
        let stop = StopFlag::new();
        stop.set();

        let report = task_with(&store, noop_work(), TaskSchedule::default(), &stop)
            .run()
            .await;
        assert_eq!(report, TaskReport::default());
    }
}
