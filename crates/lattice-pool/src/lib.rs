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

//! # Lattice Pool
//!
//! A fixed-size pool of long-lived workers. Each submitted task goes to the idle
//! worker with the lowest *fatigue* (cumulative execution time weighted by a
//! per-worker multiplier), ties broken by worker id.
//!
//! ```rust,ignore
//! use lattice_pool::{FatiguePool, PoolConfig};
//!
//! let pool = FatiguePool::with_config(PoolConfig { num_workers: 4, ..Default::default() })?;
//! pool.submit_all((0..16).map(|i| move || {
//!     log::info!("row task {i}");
//!     Ok(())
//! }))?;
//! println!("{}", pool.report());
//! pool.shutdown();
//! ```
//!
//! Task bodies that return an error or panic are logged and counted, then
//! discarded: the worker, the pool and the surrounding batch keep going, and
//! the submitter is not told.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fatigue;
pub mod pool;
pub mod report;
pub mod worker;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use fatigue::{FatigueSource, FixedFatigue, RandomFatigue};
pub use pool::FatiguePool;
pub use report::{PoolReport, WorkerSnapshot};
pub use worker::PoolWorker;

/// What a task body reports back to its worker.
///
/// An `Err` is treated like a panic: logged, counted as a failure and dropped.
pub type TaskOutcome = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A boxed unit of work accepted by the pool.
pub type Task = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;
