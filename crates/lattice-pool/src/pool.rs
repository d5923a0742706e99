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

//! The fatigue-aware pool: worker selection, batch submission and shutdown.

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::fatigue::{FatigueSource, RandomFatigue};
use crate::report::{PoolReport, WorkerSnapshot};
use crate::worker::{Job, PoolWorker};
use crate::{Task, TaskOutcome};
use parking_lot::{Condvar, Mutex};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread;

/// An idle worker keyed by the fatigue it had when it became idle.
#[derive(Debug, Clone, Copy)]
struct IdleEntry {
    fatigue: f64,
    id: usize,
}

impl Ord for IdleEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fatigue
            .total_cmp(&other.fatigue)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleEntry {}

/// Everything guarded by the coordination lock.
#[derive(Debug)]
struct Coordination {
    /// Min-heap of workers that are neither reserved nor running.
    idle: BinaryHeap<Reverse<IdleEntry>>,
    in_flight: usize,
    accepting: bool,
}

#[derive(Debug)]
struct PoolShared {
    coordination: Mutex<Coordination>,
    /// Signalled whenever a worker re-enters the idle heap or the pool stops.
    worker_available: Condvar,
    /// Signalled whenever `in_flight` decreases.
    drained: Condvar,
}

impl PoolShared {
    /// Ends a reservation. `requeue` puts the worker back in the idle heap
    /// unless the pool has stopped accepting.
    fn release(&self, id: usize, fatigue: f64, requeue: bool) {
        let mut coord = self.coordination.lock();
        coord.in_flight = coord.in_flight.saturating_sub(1);
        if requeue && coord.accepting {
            coord.idle.push(Reverse(IdleEntry { fatigue, id }));
        }
        self.worker_available.notify_all();
        self.drained.notify_all();
    }
}

/// Counts the tasks of one batch down to zero.
#[derive(Debug)]
struct BatchLatch {
    remaining: Mutex<usize>,
    done: Condvar,
}

impl BatchLatch {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            done: Condvar::new(),
        }
    }

    fn count_down(&self, n: usize) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(n);
        if *remaining == 0 {
            self.done.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.done.wait(&mut remaining);
        }
    }
}

/// Counts its batch down when dropped, including during a panic unwind and
/// when a rejected task is discarded.
struct Arrival(Arc<BatchLatch>);

impl Drop for Arrival {
    fn drop(&mut self) {
        self.0.count_down(1);
    }
}

/// A fixed set of workers fed by a least-fatigued-first scheduler.
///
/// `submit` blocks while every worker is busy. Task failures never surface to
/// the submitter; see [`PoolReport`] for the counters.
///
/// Dropping the pool shuts it down. `shutdown` must not be called from inside
/// a task, since it waits for that task to finish.
#[derive(Debug)]
pub struct FatiguePool {
    workers: Vec<PoolWorker>,
    shared: Arc<PoolShared>,
}

impl FatiguePool {
    /// Creates a pool of `num_workers` workers with random multipliers.
    pub fn new(num_workers: usize) -> PoolResult<Self> {
        Self::with_config(PoolConfig {
            num_workers,
            ..PoolConfig::default()
        })
    }

    /// Creates a pool from `config`, seeding the multipliers when
    /// `fatigue_seed` is set.
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        match config.fatigue_seed {
            Some(seed) => Self::with_fatigue_source(config, RandomFatigue::seeded(seed)),
            None => Self::with_fatigue_source(config, RandomFatigue::new()),
        }
    }

    /// Creates a pool whose multipliers come from `source`, one per worker in
    /// id order.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidArgument`] if `num_workers` is zero, or
    /// [`PoolError::Spawn`] if a thread could not be started.
    pub fn with_fatigue_source<S: FatigueSource>(
        config: PoolConfig,
        mut source: S,
    ) -> PoolResult<Self> {
        if config.num_workers == 0 {
            return Err(PoolError::InvalidArgument(
                "a pool needs at least one worker".to_string(),
            ));
        }

        let mut workers = Vec::with_capacity(config.num_workers);
        let mut idle = BinaryHeap::with_capacity(config.num_workers);
        for id in 0..config.num_workers {
            let name = format!("{}-{id}", config.thread_name_prefix);
            workers.push(PoolWorker::spawn(id, source.next_multiplier(), name)?);
            idle.push(Reverse(IdleEntry { fatigue: 0.0, id }));
        }

        log::info!("FatiguePool: started {} workers", workers.len());

        Ok(Self {
            workers,
            shared: Arc::new(PoolShared {
                coordination: Mutex::new(Coordination {
                    idle,
                    in_flight: 0,
                    accepting: true,
                }),
                worker_available: Condvar::new(),
                drained: Condvar::new(),
            }),
        })
    }

    /// Hands `task` to the least-fatigued idle worker, blocking until one is
    /// available.
    ///
    /// Returns once the task is handed off, not when it finishes.
    ///
    /// # Errors
    ///
    /// [`PoolError::ShutDown`] if the pool stopped accepting, either before the
    /// call or while it was waiting.
    pub fn submit<F>(&self, task: F) -> PoolResult<()>
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        self.submit_boxed(Box::new(task))
    }

    fn submit_boxed(&self, mut task: Task) -> PoolResult<()> {
        loop {
            let id = self.reserve()?;
            let worker = &self.workers[id];

            let shared = Arc::clone(&self.shared);
            let job = Job::new(
                task,
                Box::new(move |fatigue| shared.release(id, fatigue, true)),
            );

            match worker.dispatch(job) {
                Ok(()) => {
                    log::trace!("FatiguePool: task handed to worker {id}");
                    return Ok(());
                }
                Err(rejected) => {
                    log::debug!("FatiguePool: {}, retrying", rejected.error);
                    // The heap entry was ours alone, so no completion hook will
                    // put a busy worker back. Do it here unless it has stopped.
                    let requeue = !matches!(rejected.error, PoolError::WorkerStopped(_));
                    self.shared.release(id, worker.fatigue(), requeue);
                    task = rejected.job.into_task();
                    thread::yield_now();
                }
            }
        }
    }

    /// Pops the least-fatigued idle worker and counts it as in flight.
    fn reserve(&self) -> PoolResult<usize> {
        let mut coord = self.shared.coordination.lock();
        loop {
            if !coord.accepting {
                return Err(PoolError::ShutDown);
            }
            if let Some(Reverse(entry)) = coord.idle.pop() {
                coord.in_flight += 1;
                return Ok(entry.id);
            }
            self.shared.worker_available.wait(&mut coord);
        }
    }

    /// Submits every task and blocks until all of them have finished,
    /// successfully or not.
    ///
    /// An empty batch returns immediately.
    ///
    /// # Errors
    ///
    /// If a submission fails, the remaining tasks are not submitted. The call
    /// still waits for the already-submitted ones before returning the error.
    pub fn submit_all<I, F>(&self, tasks: I) -> PoolResult<()>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        if tasks.is_empty() {
            return Ok(());
        }

        let latch = Arc::new(BatchLatch::new(tasks.len()));
        let mut outcome = Ok(());
        let mut pending = tasks.into_iter();

        for task in pending.by_ref() {
            let arrival = Arrival(Arc::clone(&latch));
            let submitted = self.submit(move || {
                let _arrival = arrival;
                task()
            });
            // A rejected task was dropped inside `submit`, so it has arrived.
            if let Err(e) = submitted {
                outcome = Err(e);
                break;
            }
        }

        let abandoned = pending.count();
        if abandoned > 0 {
            latch.count_down(abandoned);
        }
        latch.wait();
        outcome
    }

    /// Stops accepting work, waits for in-flight tasks, then stops and joins
    /// every worker. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut coord = self.shared.coordination.lock();
            if coord.accepting {
                log::info!(
                    "FatiguePool: shutting down with {} task(s) in flight",
                    coord.in_flight
                );
            }
            coord.accepting = false;
            self.shared.worker_available.notify_all();
            while coord.in_flight > 0 {
                self.shared.drained.wait(&mut coord);
            }
            coord.idle.clear();
        }

        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &self.workers {
            worker.join();
        }
        log::debug!("FatiguePool: all workers joined");
    }

    /// Returns the number of workers the pool was built with.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Returns the counters of the worker with the given id.
    ///
    /// Workers are only reachable through the pool's scheduler; a caller
    /// cannot hand them tasks directly.
    pub fn worker(&self, id: usize) -> Option<WorkerSnapshot> {
        self.workers.get(id).map(PoolWorker::snapshot)
    }

    /// Returns how many worker threads have not yet terminated.
    pub fn running_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.is_running()).count()
    }

    /// Returns the number of workers waiting in the idle heap.
    pub fn idle_workers(&self) -> usize {
        self.shared.coordination.lock().idle.len()
    }

    /// Returns true until [`shutdown`](Self::shutdown) begins.
    pub fn is_accepting(&self) -> bool {
        self.shared.coordination.lock().accepting
    }

    /// Captures every worker's counters under the coordination lock.
    pub fn report(&self) -> PoolReport {
        let coord = self.shared.coordination.lock();
        PoolReport {
            in_flight: coord.in_flight,
            accepting: coord.accepting,
            workers: self.workers.iter().map(PoolWorker::snapshot).collect(),
        }
    }
}

impl Drop for FatiguePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatigue::FixedFatigue;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn config(num_workers: usize) -> PoolConfig {
        PoolConfig {
            num_workers,
            thread_name_prefix: "pool-test".to_string(),
            fatigue_seed: Some(7),
        }
    }

    #[test]
    fn test_idle_heap_prefers_lowest_fatigue_then_lowest_id() {
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(IdleEntry { fatigue: 5.0, id: 0 }));
        heap.push(Reverse(IdleEntry { fatigue: 2.0, id: 2 }));
        heap.push(Reverse(IdleEntry { fatigue: 2.0, id: 1 }));

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|Reverse(e)| e.id)).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            FatiguePool::with_config(config(0)),
            Err(PoolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_new_pool_is_all_idle() {
        let pool = FatiguePool::with_config(config(3)).unwrap();
        assert_eq!(pool.num_workers(), 3);
        assert_eq!(pool.idle_workers(), 3);
        assert!(pool.is_accepting());
        assert_eq!(pool.report().in_flight, 0);
    }

    #[test]
    fn test_submit_retries_past_a_worker_held_outside_the_pool() {
        // --- 1. ARRANGE ---
        let pool = FatiguePool::with_config(config(1)).unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        // Reserve the only worker behind the scheduler's back: no completion
        // hook will ever return it to the idle heap.
        pool.workers[0]
            .assign(move || {
                let _ = release_rx.recv();
                Ok(())
            })
            .unwrap();
        assert_eq!(pool.idle_workers(), 1);

        // --- 2. ACT ---
        let (ran_tx, ran_rx) = mpsc::channel();
        let pool = Arc::new(pool);
        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                pool.submit(move || {
                    ran_tx.send(()).unwrap();
                    Ok(())
                })
            })
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        // --- 3. ASSERT ---
        assert!(submitter.join().unwrap().is_ok());
        assert!(ran_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        pool.shutdown();
        assert_eq!(pool.report().in_flight, 0);
        assert_eq!(pool.report().total_completed(), 2);
    }

    #[test]
    fn test_stopped_worker_is_skipped() {
        let pool = FatiguePool::with_config(config(2)).unwrap();
        pool.workers[0].shutdown();

        let (tx, rx) = mpsc::channel();
        pool.submit(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
            Ok(())
        })
        .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("pool-test-1"));
        while pool.report().in_flight > 0 {
            thread::yield_now();
        }
        assert_eq!(pool.idle_workers(), 1, "a stopped worker must not be requeued");
    }

    #[test]
    fn test_empty_batch_returns_immediately() {
        let pool = FatiguePool::with_config(config(1)).unwrap();
        let tasks: Vec<fn() -> TaskOutcome> = Vec::new();
        assert!(pool.submit_all(tasks).is_ok());
    }

    #[test]
    fn test_fixed_source_assigns_multipliers_in_id_order() {
        let source = FixedFatigue::new(vec![0.5, 1.0, 1.49]);
        let pool = FatiguePool::with_fatigue_source(config(3), source).unwrap();
        let multipliers: Vec<f64> = pool
            .report()
            .workers
            .iter()
            .map(|w| w.fatigue_multiplier)
            .collect();
        assert_eq!(multipliers, vec![0.5, 1.0, 1.49]);
    }

    #[test]
    fn test_submit_all_runs_every_task() {
        let pool = FatiguePool::with_config(config(4)).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit_all((0..64).map(|_| {
            let counter = Arc::clone(&counter);
            move || {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(())
            }
        }))
        .unwrap();

        assert_eq!(counter.load(AtomicOrdering::SeqCst), 64);
        pool.shutdown();
        assert_eq!(pool.report().total_completed(), 64);
    }
}
