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

//! Sources of per-worker fatigue multipliers.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Lower bound (inclusive) of a drawn fatigue multiplier.
pub const MIN_MULTIPLIER: f64 = 0.5;
/// Upper bound (exclusive) of a drawn fatigue multiplier.
pub const MAX_MULTIPLIER: f64 = 1.5;

/// Supplies one fatigue multiplier per worker at pool construction.
pub trait FatigueSource: Send {
    /// Returns the multiplier for the next worker.
    fn next_multiplier(&mut self) -> f64;
}

/// Draws multipliers uniformly from `[0.5, 1.5)`.
#[derive(Debug, Clone)]
pub struct RandomFatigue {
    rng: ChaCha8Rng,
}

impl RandomFatigue {
    /// Creates a source seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Creates a reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomFatigue {
    fn default() -> Self {
        Self::new()
    }
}

impl FatigueSource for RandomFatigue {
    fn next_multiplier(&mut self) -> f64 {
        self.rng.gen_range(MIN_MULTIPLIER..MAX_MULTIPLIER)
    }
}

/// Hands out a fixed list of multipliers, cycling when it runs out.
///
/// Meant for tests that need a known selection order.
#[derive(Debug, Clone)]
pub struct FixedFatigue {
    multipliers: Vec<f64>,
    next: usize,
}

impl FixedFatigue {
    /// Creates a source returning `multipliers` in order. An empty list yields `1.0`.
    pub fn new(multipliers: Vec<f64>) -> Self {
        Self {
            multipliers,
            next: 0,
        }
    }
}

impl FatigueSource for FixedFatigue {
    fn next_multiplier(&mut self) -> f64 {
        if self.multipliers.is_empty() {
            return 1.0;
        }
        let value = self.multipliers[self.next % self.multipliers.len()];
        self.next += 1;
        value
    }
}
