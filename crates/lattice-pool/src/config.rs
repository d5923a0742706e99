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

//! Configuration for the fatigue pool.

use serde::{Deserialize, Serialize};
use std::thread;

/// Configuration for a [`FatiguePool`](crate::FatiguePool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. Fixed for the lifetime of the pool.
    pub num_workers: usize,
    /// Prefix of the worker thread names; the worker id is appended.
    pub thread_name_prefix: String,
    /// Seed for the fatigue multipliers. `None` draws a fresh seed from the OS.
    pub fatigue_seed: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
            thread_name_prefix: "lattice-worker".to_string(),
            fatigue_seed: None,
        }
    }
}
