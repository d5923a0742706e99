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

//! The matrix operation orchestrator.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::ExpressionNode;
use crate::operation::{NodeKind, OperationKind};
use lattice_core::{Grid, SharedMatrix};
use lattice_pool::{FatiguePool, PoolReport, Task, TaskOutcome};
use std::sync::Arc;

/// Evaluates matrix operations one row task at a time on a worker pool.
///
/// The engine owns two working slots. The left operand is loaded row-major and
/// mutated in place by the row tasks, so it holds the result once the batch
/// drains. The right operand is loaded row-major for ADD and column-major for
/// MULTIPLY, and is only read.
#[derive(Debug)]
pub struct LinearAlgebraEngine {
    left: SharedMatrix,
    right: Arc<SharedMatrix>,
    pool: FatiguePool,
}

impl LinearAlgebraEngine {
    /// Creates an engine and starts its pool.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let pool = FatiguePool::with_config(config.pool)?;
        Ok(Self::with_pool(pool))
    }

    /// Creates an engine around an existing pool.
    pub fn with_pool(pool: FatiguePool) -> Self {
        Self {
            left: SharedMatrix::new(),
            right: Arc::new(SharedMatrix::new()),
            pool,
        }
    }

    /// Resolves operation nodes of `root` until it is a single matrix.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoResolvableNode`] if the tree still has operations but
    /// none is ready, or any error from [`load_and_compute`](Self::load_and_compute).
    /// The tree keeps the nodes resolved before the failure.
    pub fn run<N: ExpressionNode>(&mut self, root: &mut N) -> EngineResult<()> {
        let mut steps = 0usize;
        while !root.is_leaf() {
            let node = root
                .find_resolvable()
                .ok_or(EngineError::NoResolvableNode)?;
            let result = self.load_and_compute(node)?;
            node.resolve(result);
            steps += 1;
        }
        log::debug!("Engine: expression resolved in {steps} step(s)");
        Ok(())
    }

    /// Runs `root` to completion and returns the resulting matrix.
    pub fn evaluate<N: ExpressionNode>(&mut self, mut root: N) -> EngineResult<Grid> {
        self.run(&mut root)?;
        root.matrix()
            .cloned()
            .ok_or(EngineError::NoResolvableNode)
    }

    /// Computes a single operation node whose operands are all matrices.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnsupportedOperation`] for a matrix node,
    /// [`EngineError::InvalidArgument`] if an operand is not yet a matrix.
    pub fn load_and_compute<N: ExpressionNode>(&mut self, node: &N) -> EngineResult<Grid> {
        let kind = match node.kind() {
            NodeKind::Operation(kind) => kind,
            NodeKind::Matrix => {
                return Err(EngineError::UnsupportedOperation(
                    "a matrix node has nothing to compute".to_string(),
                ))
            }
        };

        let operands = node
            .children()
            .iter()
            .map(|child| {
                child.matrix().ok_or_else(|| {
                    EngineError::InvalidArgument(format!("{kind} operand is not a matrix yet"))
                })
            })
            .collect::<EngineResult<Vec<&Grid>>>()?;

        self.execute(kind, &operands)
    }

    /// Runs `kind` over `operands` and returns the result row-major.
    ///
    /// Blocks until every row task has finished. A failing row task is logged by
    /// its worker and otherwise ignored; if it left the result inconsistent the
    /// final read reports it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidArgument`] on an arity or shape mismatch.
    /// - [`EngineError::Matrix`] if an operand is not rectangular or the result
    ///   cannot be read back.
    /// - [`EngineError::Pool`] if the pool has been shut down.
    pub fn execute(&mut self, kind: OperationKind, operands: &[&Grid]) -> EngineResult<Grid> {
        if operands.len() != kind.arity() {
            return Err(EngineError::InvalidArgument(format!(
                "{kind} takes {} operand(s), got {}",
                kind.arity(),
                operands.len()
            )));
        }
        validate_shapes(kind, operands)?;

        let tasks = self.prepare(kind, operands)?;
        log::debug!("Engine: {kind} split into {} row task(s)", tasks.len());

        self.pool.submit_all(tasks)?;
        Ok(self.left.read_row_major()?)
    }

    /// Loads the operands into the working slots and builds one task per left row.
    fn prepare(&self, kind: OperationKind, operands: &[&Grid]) -> EngineResult<Vec<Task>> {
        self.left.load_row_major(operands[0])?;
        let rows = self.left.snapshot();

        let tasks = match kind {
            OperationKind::Add => {
                self.right.load_row_major(operands[1])?;
                let others = self.right.snapshot();
                rows.iter()
                    .zip(others.iter())
                    .map(|(row, other)| {
                        let row = Arc::clone(row);
                        let other = Arc::clone(other);
                        Box::new(move || -> TaskOutcome {
                            row.add(&other)?;
                            Ok(())
                        }) as Task
                    })
                    .collect()
            }
            OperationKind::Multiply => {
                self.right.load_column_major(operands[1])?;
                rows.iter()
                    .map(|row| {
                        let row = Arc::clone(row);
                        let right = Arc::clone(&self.right);
                        Box::new(move || -> TaskOutcome {
                            row.vec_mat_mul(&right)?;
                            Ok(())
                        }) as Task
                    })
                    .collect()
            }
            OperationKind::Negate => rows
                .iter()
                .map(|row| {
                    let row = Arc::clone(row);
                    Box::new(move || -> TaskOutcome {
                        row.negate();
                        Ok(())
                    }) as Task
                })
                .collect(),
            OperationKind::Transpose => rows
                .iter()
                .map(|row| {
                    let row = Arc::clone(row);
                    Box::new(move || -> TaskOutcome {
                        row.transpose();
                        Ok(())
                    }) as Task
                })
                .collect(),
        };
        Ok(tasks)
    }

    /// Returns the engine's pool.
    pub fn pool(&self) -> &FatiguePool {
        &self.pool
    }

    /// Captures the pool's worker counters.
    pub fn worker_report(&self) -> PoolReport {
        self.pool.report()
    }

    /// Shuts the pool down. Later operations fail with a pool error.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

/// Returns `(rows, columns)`, taking the column count from the first row.
fn shape(grid: &Grid) -> (usize, usize) {
    (grid.len(), grid.first().map_or(0, Vec::len))
}

fn validate_shapes(kind: OperationKind, operands: &[&Grid]) -> EngineResult<()> {
    match kind {
        OperationKind::Add => {
            let (left, right) = (shape(operands[0]), shape(operands[1]));
            if left != right {
                return Err(EngineError::InvalidArgument(format!(
                    "ADD needs equal shapes, got {}x{} and {}x{}",
                    left.0, left.1, right.0, right.1
                )));
            }
        }
        OperationKind::Multiply => {
            let (left, right) = (shape(operands[0]), shape(operands[1]));
            if left.1 != right.0 {
                return Err(EngineError::InvalidArgument(format!(
                    "MULTIPLY needs left columns = right rows, got {}x{} and {}x{}",
                    left.0, left.1, right.0, right.1
                )));
            }
            if left.1 == 0 || right.1 == 0 {
                return Err(EngineError::InvalidArgument(format!(
                    "MULTIPLY needs non-empty operands, got {}x{} and {}x{}",
                    left.0, left.1, right.0, right.1
                )));
            }
        }
        OperationKind::Negate | OperationKind::Transpose => {}
    }
    Ok(())
}
