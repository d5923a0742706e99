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

//! Point-in-time view of the pool's workers.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Counters of a single worker, captured by [`PoolWorker::snapshot`](crate::PoolWorker::snapshot).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSnapshot {
    /// Index of the worker in its pool.
    pub id: usize,
    /// Multiplier applied to execution time.
    pub fatigue_multiplier: f64,
    /// Whether the worker was reserved or executing.
    pub busy: bool,
    /// Whether the worker still accepted tasks.
    pub alive: bool,
    /// Cumulative execution time.
    pub time_used: Duration,
    /// Cumulative time in closed idle intervals.
    pub time_idle: Duration,
    /// `fatigue_multiplier × time_used`, in nanoseconds.
    pub fatigue: f64,
    /// Tasks that returned `Ok`.
    pub tasks_completed: u64,
    /// Tasks that returned `Err` or panicked.
    pub tasks_failed: u64,
}

impl fmt::Display for WorkerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Worker {} (FF={:.2}): busy={}, used={}ms, idle={}ms, fatigue={:.3}ms, completed={}, failed={}",
            self.id,
            self.fatigue_multiplier,
            self.busy,
            self.time_used.as_millis(),
            self.time_idle.as_millis(),
            self.fatigue / 1_000_000.0,
            self.tasks_completed,
            self.tasks_failed,
        )
    }
}

/// Snapshot of the whole pool, captured by [`FatiguePool::report`](crate::FatiguePool::report).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolReport {
    /// Tasks reserved or running at capture time.
    pub in_flight: usize,
    /// Whether the pool still accepted submissions.
    pub accepting: bool,
    /// One entry per worker, ordered by id.
    pub workers: Vec<WorkerSnapshot>,
}

impl PoolReport {
    /// Sum of completed tasks over all workers.
    pub fn total_completed(&self) -> u64 {
        self.workers.iter().map(|w| w.tasks_completed).sum()
    }

    /// Sum of failed tasks over all workers.
    pub fn total_failed(&self) -> u64 {
        self.workers.iter().map(|w| w.tasks_failed).sum()
    }
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Pool: in_flight={}, accepting={}",
            self.in_flight, self.accepting
        )?;
        for worker in &self.workers {
            writeln!(f, "{worker}")?;
        }
        Ok(())
    }
}
