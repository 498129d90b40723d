//! Delivers a real SIGTERM to the test process, so it lives in its own test
//! binary.
#![cfg(unix)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use vigil_core::{
    CoordinatedTask, DistributedLock, LockStoreHandle, MemoryLockStore, ShutdownCoordinator,
    ShutdownReason, TaskState, WorkFn,
};
use vigil_model::{LockSpec, TaskSchedule};

#[tokio::test]
async fn sigterm_mid_work_completes_cycle_then_stops() {
    let coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_secs(1)));
    let _listener = coordinator.install().unwrap();

    let store = Arc::new(MemoryLockStore::new());
    let handle: LockStoreHandle = store.clone();
    let lock = DistributedLock::new(LockSpec::new("update_progress", 60_000), handle).unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let work = {
        let finished = Arc::clone(&finished);
        WorkFn::arc("slow", move || {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        })
    };

    let task = CoordinatedTask::new(lock, work, TaskSchedule::default(), coordinator.stop_flag()).unwrap();
    let mut states = task.subscribe();
    let running = task.spawn();

    states.wait_for(|s| *s == TaskState::Working).await.unwrap();

    let sent_at = Instant::now();
    let rc = unsafe { libc::kill(libc::getpid(), libc::SIGTERM) };
    assert_eq!(rc, 0);

    coordinator.wait().await;
    assert_eq!(coordinator.reason(), Some(ShutdownReason::Terminate));

    let report = coordinator
        .drain(running)
        .await
        .expect("task must stop within the grace period")
        .unwrap();

    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(report.cycles, 1);
    assert!(!store.is_locked("update_progress"));
    assert!(sent_at.elapsed() < Duration::from_millis(1_500));

    // A second signal while stopping only logs.
    let rc = unsafe { libc::kill(libc::getpid(), libc::SIGTERM) };
    assert_eq!(rc, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.reason(), Some(ShutdownReason::Terminate));
}
