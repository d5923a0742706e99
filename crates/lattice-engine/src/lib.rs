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

//! # Lattice Engine
//!
//! Evaluates matrix expressions by splitting every operation into one task per
//! row and running the batch on a [`FatiguePool`](lattice_pool::FatiguePool).
//!
//! The engine only needs a small contract from the expression layer, captured
//! by [`ExpressionNode`]. [`ComputationNode`] is a serde-friendly tree that
//! implements it.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod operation;

pub use config::EngineConfig;
pub use engine::LinearAlgebraEngine;
pub use error::{EngineError, EngineResult};
pub use graph::{ComputationNode, ExpressionNode};
pub use lattice_core::Grid;
pub use operation::{NodeKind, OperationKind};
