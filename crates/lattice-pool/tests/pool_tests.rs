// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use lattice_pool::{FatiguePool, FixedFatigue, PoolConfig, PoolError, Task, TaskOutcome};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn config(num_workers: usize) -> PoolConfig {
    PoolConfig {
        num_workers,
        thread_name_prefix: "pool-it".to_string(),
        fatigue_seed: Some(1),
    }
}

/// Spins until every worker is back in the idle heap.
fn wait_until_idle(pool: &FatiguePool) {
    while pool.idle_workers() < pool.num_workers() {
        thread::yield_now();
    }
}

fn sleeper(ms: u64) -> impl FnOnce() -> TaskOutcome + Send + 'static {
    move || {
        thread::sleep(Duration::from_millis(ms));
        Ok(())
    }
}

#[test]
fn test_submit_blocks_while_all_workers_busy() {
    // --- 1. ARRANGE ---
    let pool = Arc::new(FatiguePool::with_config(config(1)).unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(move || {
        let _ = release_rx.recv();
        Ok(())
    })
    .unwrap();

    // --- 2. ACT ---
    let (submitted_tx, submitted_rx) = mpsc::channel();
    let submitter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let result = pool.submit(|| Ok(()));
            submitted_tx.send(result.is_ok()).unwrap();
        })
    };

    // --- 3. ASSERT ---
    assert!(
        submitted_rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "submit must wait for a worker to become idle"
    );

    release_tx.send(()).unwrap();
    assert_eq!(submitted_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    submitter.join().unwrap();
}

#[test]
fn test_failing_tasks_do_not_break_the_batch() {
    // --- 1. ARRANGE ---
    let pool = FatiguePool::with_config(config(2)).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));

    let mut tasks: Vec<Task> = vec![
        Box::new(|| -> TaskOutcome { Err("singular input".into()) }),
        Box::new(|| -> TaskOutcome { panic!("row task exploded") }),
    ];
    for _ in 0..3 {
        let ran = Arc::clone(&ran);
        tasks.push(Box::new(move || {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    // --- 2. ACT ---
    let result = pool.submit_all(tasks);

    // --- 3. ASSERT ---
    assert!(result.is_ok(), "task failures are not reported to the submitter");
    assert_eq!(ran.load(Ordering::SeqCst), 3);

    pool.shutdown();
    let report = pool.report();
    assert_eq!(report.total_completed(), 3);
    assert_eq!(report.total_failed(), 2);
}

#[test]
fn test_pool_keeps_working_after_panics() {
    let pool = FatiguePool::with_config(config(1)).unwrap();
    pool.submit_all([|| -> TaskOutcome { panic!("first") }]).unwrap();

    let flag = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&flag);
    pool.submit_all([move || -> TaskOutcome {
        seen.store(true, Ordering::SeqCst);
        Ok(())
    }])
    .unwrap();

    assert!(flag.load(Ordering::SeqCst));
}

#[test]
fn test_shutdown_waits_for_in_flight_tasks() {
    // --- 1. ARRANGE ---
    let pool = FatiguePool::with_config(config(2)).unwrap();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    pool.submit(move || {
        thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    // --- 2. ACT ---
    pool.shutdown();

    // --- 3. ASSERT ---
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(pool.running_workers(), 0);
    assert!(!pool.is_accepting());
    assert_eq!(pool.idle_workers(), 0);
    assert!(matches!(pool.submit(|| Ok(())), Err(PoolError::ShutDown)));
    assert!(matches!(
        pool.submit_all([|| -> TaskOutcome { Ok(()) }]),
        Err(PoolError::ShutDown)
    ));

    // Idempotent.
    pool.shutdown();
}

#[test]
fn test_blocked_submit_fails_when_pool_shuts_down() {
    // --- 1. ARRANGE ---
    let pool = Arc::new(FatiguePool::with_config(config(1)).unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(move || {
        let _ = release_rx.recv();
        Ok(())
    })
    .unwrap();

    let (result_tx, result_rx) = mpsc::channel();
    let submitter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let result = pool.submit(|| Ok(()));
            result_tx
                .send(matches!(result, Err(PoolError::ShutDown)))
                .unwrap();
        })
    };
    thread::sleep(Duration::from_millis(50));

    // --- 2. ACT ---
    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.shutdown())
    };

    // --- 3. ASSERT ---
    assert_eq!(result_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    release_tx.send(()).unwrap();
    stopper.join().unwrap();
    submitter.join().unwrap();
    assert_eq!(pool.running_workers(), 0);
}

#[test]
fn test_worker_snapshot_tracks_reservation() {
    let pool = FatiguePool::with_config(config(1)).unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(move || {
        let _ = release_rx.recv();
        Ok(())
    })
    .unwrap();

    let running = pool.worker(0).unwrap();
    assert!(running.busy);
    assert_eq!(pool.idle_workers(), 0);
    assert!(pool.worker(1).is_none());

    release_tx.send(()).unwrap();
    wait_until_idle(&pool);
    let idle = pool.worker(0).unwrap();
    assert!(!idle.busy);
    assert_eq!(idle.tasks_completed, 1);
}

#[test]
fn test_sequential_tasks_spread_over_fresh_workers() {
    // --- 1. ARRANGE ---
    let source = FixedFatigue::new(vec![1.0, 1.0, 1.0]);
    let pool = FatiguePool::with_fatigue_source(config(3), source).unwrap();

    // --- 2. ACT ---
    for _ in 0..3 {
        pool.submit_all([sleeper(2)]).unwrap();
        wait_until_idle(&pool);
    }
    pool.shutdown();

    // --- 3. ASSERT ---
    let completed: Vec<u64> = pool
        .report()
        .workers
        .iter()
        .map(|w| w.tasks_completed)
        .collect();
    assert_eq!(completed, vec![1, 1, 1]);
}

#[test]
fn test_high_multiplier_worker_is_avoided() {
    // --- 1. ARRANGE ---
    let source = FixedFatigue::new(vec![10.0, 1.0]);
    let pool = FatiguePool::with_fatigue_source(config(2), source).unwrap();

    // --- 2. ACT ---
    for _ in 0..4 {
        pool.submit_all([sleeper(2)]).unwrap();
        wait_until_idle(&pool);
    }
    pool.shutdown();

    // --- 3. ASSERT ---
    let report = pool.report();
    assert_eq!(report.workers[0].tasks_completed, 1);
    assert_eq!(report.workers[1].tasks_completed, 3);
    assert!(report.workers[0].fatigue > report.workers[1].fatigue);
}

#[test]
fn test_concurrent_batches_from_many_submitters() {
    let pool = Arc::new(FatiguePool::with_config(config(3)).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));

    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                pool.submit_all((0..25).map(|_| {
                    let counter = Arc::clone(&counter);
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
            })
        })
        .collect();

    for submitter in submitters {
        assert!(submitter.join().unwrap().is_ok());
    }
    assert_eq!(counter.load(Ordering::SeqCst), 100);
}

#[test]
fn test_report_serializes_and_displays() {
    let pool = FatiguePool::with_config(config(2)).unwrap();
    pool.submit_all([sleeper(1), sleeper(1)]).unwrap();
    wait_until_idle(&pool);

    let report = pool.report();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["accepting"], serde_json::Value::Bool(true));
    assert_eq!(json["workers"].as_array().map(Vec::len), Some(2));

    let text = report.to_string();
    assert!(text.starts_with("Pool: in_flight=0, accepting=true"));
    assert!(text.contains("Worker 0 (FF="));
    assert!(text.contains("Worker 1 (FF="));
}
