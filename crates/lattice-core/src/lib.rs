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

//! # Lattice Core
//!
//! Lock-guarded numeric containers shared between concurrently running row
//! tasks: [`SharedVector`] (one row or column behind a reader/writer lock) and
//! [`SharedMatrix`] (an atomically published sequence of vectors).

#![warn(missing_docs)]

pub mod error;
pub mod matrix;
pub mod vector;

pub use error::{MatrixError, MatrixResult};
pub use matrix::SharedMatrix;
pub use vector::{Orientation, SharedVector, VectorReadGuard, VectorWriteGuard};

/// A dense two-dimensional grid of values in row-major order.
pub type Grid = Vec<Vec<f64>>;
