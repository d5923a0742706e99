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

//! Error type for worker and pool operations.

use std::fmt;

/// A specialized `Result` type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// An error that can occur while configuring or using the pool.
#[derive(Debug)]
pub enum PoolError {
    /// A construction argument was rejected (e.g. zero workers).
    InvalidArgument(String),
    /// The worker is already reserved or its handoff slot is occupied.
    WorkerBusy(usize),
    /// The worker has been shut down and no longer accepts tasks.
    WorkerStopped(usize),
    /// The pool no longer accepts submissions.
    ShutDown,
    /// The OS refused to start a worker thread.
    Spawn(std::io::Error),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            PoolError::WorkerBusy(id) => write!(f, "Worker {id} is not ready to accept a task"),
            PoolError::WorkerStopped(id) => write!(f, "Worker {id} is shutting down"),
            PoolError::ShutDown => write!(f, "Pool is shut down"),
            PoolError::Spawn(e) => write!(f, "Failed to spawn worker thread: {e}"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}
