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

//! A long-lived execution unit with a single-slot task handoff.
//!
//! ## State machine
//!
//! ```text
//!            assign              task finished
//!   +------+ ------> +------+ ----------------> +------+
//!   | Idle |         | Busy |                   | Idle | ...
//!   +------+ <------ +------+                   +------+
//!      |    rollback                               |
//!      | close                                     | close
//!      v                                           v
//!   +----------+                             +----------+
//!   | Shutdown |                             | Shutdown |
//!   +----------+                             +----------+
//! ```
//!
//! A worker is reserved with a compare-and-set on its busy flag, then receives
//! the task through a bounded channel of capacity one. Shutdown closes that
//! channel; the worker loop still drains a task already sitting in the slot
//! before it sees the disconnect and exits.

use crate::error::{PoolError, PoolResult};
use crate::report::WorkerSnapshot;
use crate::{Task, TaskOutcome};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Called by the worker thread once a task finished and the worker is idle
/// again. Receives the worker's fatigue as of that moment.
pub(crate) type Completion = Box<dyn FnOnce(f64) + Send + 'static>;

/// A task plus the hook the pool uses to learn it finished.
pub(crate) struct Job {
    task: Task,
    on_complete: Option<Completion>,
}

impl Job {
    pub(crate) fn new(task: Task, on_complete: Completion) -> Self {
        Self {
            task,
            on_complete: Some(on_complete),
        }
    }

    /// Gives the task back so it can be offered to another worker.
    pub(crate) fn into_task(self) -> Task {
        self.task
    }
}

/// A hand-off the worker refused, with the job returned to the caller.
pub(crate) struct Rejected {
    pub(crate) error: PoolError,
    pub(crate) job: Job,
}

/// State shared between the [`PoolWorker`] handle and its thread.
#[derive(Debug)]
struct WorkerState {
    id: usize,
    fatigue_multiplier: f64,
    alive: AtomicBool,
    busy: AtomicBool,
    time_used_ns: AtomicU64,
    time_idle_ns: AtomicU64,
    /// Start of the current idle interval; `None` while busy.
    idle_since: Mutex<Option<Instant>>,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
}

impl WorkerState {
    fn new(id: usize, fatigue_multiplier: f64) -> Self {
        Self {
            id,
            fatigue_multiplier,
            alive: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            time_used_ns: AtomicU64::new(0),
            time_idle_ns: AtomicU64::new(0),
            idle_since: Mutex::new(Some(Instant::now())),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        }
    }

    fn fatigue(&self) -> f64 {
        self.fatigue_multiplier * self.time_used_ns.load(Ordering::Acquire) as f64
    }

    /// Ends the open idle interval, if any, and adds it to the idle total.
    fn close_idle_interval(&self, now: Instant) {
        if let Some(since) = self.idle_since.lock().take() {
            let idle = now.saturating_duration_since(since);
            self.time_idle_ns
                .fetch_add(duration_ns(idle), Ordering::AcqRel);
        }
    }

    fn execute(&self, job: Job) {
        let Job { task, on_complete } = job;

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        let end = Instant::now();
        self.time_used_ns
            .fetch_add(duration_ns(end - start), Ordering::AcqRel);

        self.record_outcome(outcome);

        *self.idle_since.lock() = Some(end);
        self.busy.store(false, Ordering::Release);

        if let Some(on_complete) = on_complete {
            on_complete(self.fatigue());
        }
    }

    // Failures stop here. The submitter has no channel to observe them.
    fn record_outcome(&self, outcome: Result<TaskOutcome, Box<dyn Any + Send>>) {
        match outcome {
            Ok(Ok(())) => {
                self.tasks_completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                self.tasks_failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Worker {}: task failed: {e}", self.id);
            }
            Err(payload) => {
                self.tasks_failed.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Worker {}: task panicked: {}",
                    self.id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

/// One worker thread of a [`FatiguePool`](crate::FatiguePool).
///
/// Owns the sending half of the handoff channel and the join handle of the
/// thread running the execution loop.
pub struct PoolWorker {
    state: Arc<WorkerState>,
    /// `None` once the worker has been shut down.
    handoff: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PoolWorker {
    /// Starts a worker thread named `thread_name`. The worker begins idle.
    pub fn spawn(id: usize, fatigue_multiplier: f64, thread_name: String) -> PoolResult<Self> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let state = Arc::new(WorkerState::new(id, fatigue_multiplier));

        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || run_loop(thread_state, rx))
            .map_err(PoolError::Spawn)?;

        log::debug!("Worker {id} spawned (fatigue multiplier {fatigue_multiplier:.2})");

        Ok(Self {
            state,
            handoff: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Returns the worker's index in its pool.
    pub fn id(&self) -> usize {
        self.state.id
    }

    /// Returns the multiplier applied to execution time to obtain fatigue.
    pub fn fatigue_multiplier(&self) -> f64 {
        self.state.fatigue_multiplier
    }

    /// Returns `fatigue_multiplier × time_used`, in nanoseconds.
    ///
    /// This is a placement cost, not a measure of wall-clock weariness.
    pub fn fatigue(&self) -> f64 {
        self.state.fatigue()
    }

    /// Returns true while the worker is reserved or executing a task.
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    /// Returns false once [`shutdown`](Self::shutdown) has been called.
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::Acquire)
    }

    /// Returns true while the worker thread has not terminated.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cumulative time spent executing tasks.
    pub fn time_used(&self) -> Duration {
        Duration::from_nanos(self.state.time_used_ns.load(Ordering::Acquire))
    }

    /// Cumulative time spent in closed idle intervals.
    pub fn time_idle(&self) -> Duration {
        Duration::from_nanos(self.state.time_idle_ns.load(Ordering::Acquire))
    }

    /// Hands `task` to this worker without blocking.
    ///
    /// # Errors
    ///
    /// - [`PoolError::WorkerBusy`] if the worker is already reserved or its
    ///   handoff slot is occupied.
    /// - [`PoolError::WorkerStopped`] if the worker has been shut down.
    pub fn assign<F>(&self, task: F) -> PoolResult<()>
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        let job = Job {
            task: Box::new(task),
            on_complete: None,
        };
        self.dispatch(job).map_err(|rejected| rejected.error)
    }

    /// Reserves the worker and places `job` in the handoff slot. On failure the
    /// reservation is rolled back and the job is returned.
    pub(crate) fn dispatch(&self, job: Job) -> Result<(), Rejected> {
        let id = self.state.id;

        if self
            .state
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Rejected {
                error: PoolError::WorkerBusy(id),
                job,
            });
        }

        if !self.is_alive() {
            self.state.busy.store(false, Ordering::Release);
            return Err(Rejected {
                error: PoolError::WorkerStopped(id),
                job,
            });
        }

        let now = Instant::now();
        self.state.close_idle_interval(now);

        let handoff = self.handoff.lock();
        let sent = match handoff.as_ref() {
            Some(sender) => sender.try_send(job),
            None => Err(TrySendError::Disconnected(job)),
        };
        drop(handoff);

        sent.map_err(|err| {
            // Roll back so the caller can try someone else.
            self.state.busy.store(false, Ordering::Release);
            let mut idle_since = self.state.idle_since.lock();
            if idle_since.is_none() {
                *idle_since = Some(now);
            }
            drop(idle_since);

            match err {
                TrySendError::Full(job) => Rejected {
                    error: PoolError::WorkerBusy(id),
                    job,
                },
                TrySendError::Disconnected(job) => Rejected {
                    error: PoolError::WorkerStopped(id),
                    job,
                },
            }
        })
    }

    /// Asks the worker to stop after any task already handed to it.
    ///
    /// Idempotent and non-blocking. Closing the handoff is the stop signal.
    pub fn shutdown(&self) {
        if !self.state.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        let sender = self.handoff.lock().take();
        drop(sender);
    }

    /// Waits for the worker thread to terminate. Returns immediately if it was
    /// already joined.
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Worker {}: thread panicked", self.state.id);
            }
        }
    }

    /// Captures the worker's counters for a report.
    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id(),
            fatigue_multiplier: self.fatigue_multiplier(),
            busy: self.is_busy(),
            alive: self.is_alive(),
            time_used: self.time_used(),
            time_idle: self.time_idle(),
            fatigue: self.fatigue(),
            tasks_completed: self.state.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.state.tasks_failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PoolWorker {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

impl std::fmt::Debug for PoolWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolWorker")
            .field("id", &self.state.id)
            .field("busy", &self.is_busy())
            .field("alive", &self.is_alive())
            .field("fatigue", &self.fatigue())
            .finish()
    }
}

fn run_loop(state: Arc<WorkerState>, handoff: Receiver<Job>) {
    log::debug!("Worker {} started", state.id);

    // Ends once the sender is dropped and the slot is empty.
    while let Ok(job) = handoff.recv() {
        state.execute(job);
    }

    state.close_idle_interval(Instant::now());
    state.busy.store(false, Ordering::Release);
    log::debug!("Worker {} stopped", state.id);
}

fn duration_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
