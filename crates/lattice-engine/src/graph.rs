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

//! The expression-tree contract and a reference tree.

use crate::operation::{NodeKind, OperationKind};
use lattice_core::Grid;
use serde::{Deserialize, Serialize};

/// What the engine needs from an expression tree.
///
/// The engine repeatedly asks the root for a resolvable node, computes it and
/// writes the result back with [`resolve`](Self::resolve), until the root is a
/// matrix. Which node is returned first is up to the implementation.
pub trait ExpressionNode: Sized {
    /// Returns whether this node is a matrix or an operation.
    fn kind(&self) -> NodeKind;

    /// Returns the operands of an operation, in order. Empty for a matrix.
    fn children(&self) -> &[Self];

    /// Returns the payload of a matrix node.
    fn matrix(&self) -> Option<&Grid>;

    /// Replaces this node by the matrix it evaluates to.
    fn resolve(&mut self, result: Grid);

    /// Returns some operation node whose operands are all matrices, or `None`
    /// if there is none.
    fn find_resolvable(&mut self) -> Option<&mut Self>;

    /// Returns true for a matrix node.
    fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Matrix
    }
}

/// A matrix expression as read from JSON.
///
/// A matrix is a bare 2-D array; an operation is an object:
///
/// ```json
/// { "operator": "*", "operands": [[[1, 2]], { "operator": "T", "operands": [[[3, 4]]] }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComputationNode {
    /// A resolved matrix in row-major form.
    Matrix(Grid),
    /// An operation over child expressions.
    Operation {
        /// The operation to apply.
        operator: OperationKind,
        /// The operands, in order.
        operands: Vec<ComputationNode>,
    },
}

impl ComputationNode {
    /// Creates a matrix node.
    pub fn leaf(grid: Grid) -> Self {
        ComputationNode::Matrix(grid)
    }

    /// Creates an operation node.
    pub fn operation(operator: OperationKind, operands: Vec<ComputationNode>) -> Self {
        ComputationNode::Operation { operator, operands }
    }

    /// An operation is resolvable once every operand is a matrix. Arity is
    /// checked by the engine, not here.
    fn is_resolvable(&self) -> bool {
        match self {
            ComputationNode::Matrix(_) => false,
            ComputationNode::Operation { operands, .. } => {
                operands.iter().all(|child| child.is_leaf())
            }
        }
    }

    /// Rewrites every `+` or `*` with more than two operands into a chain of
    /// binary nodes nested to the left: `+(a, b, c)` becomes `+(+(a, b), c)`.
    pub fn nest_associative(self) -> Self {
        match self {
            ComputationNode::Matrix(grid) => ComputationNode::Matrix(grid),
            ComputationNode::Operation { operator, operands } => {
                let operands: Vec<ComputationNode> = operands
                    .into_iter()
                    .map(ComputationNode::nest_associative)
                    .collect();

                if !operator.is_associative() || operands.len() <= 2 {
                    return ComputationNode::Operation { operator, operands };
                }

                let mut operands = operands.into_iter();
                let Some(first) = operands.next() else {
                    return ComputationNode::operation(operator, Vec::new());
                };
                operands.fold(first, |acc, next| {
                    ComputationNode::operation(operator, vec![acc, next])
                })
            }
        }
    }

    /// Number of operation nodes left to evaluate.
    pub fn pending_operations(&self) -> usize {
        match self {
            ComputationNode::Matrix(_) => 0,
            ComputationNode::Operation { operands, .. } => {
                1 + operands.iter().map(Self::pending_operations).sum::<usize>()
            }
        }
    }
}

impl ExpressionNode for ComputationNode {
    fn kind(&self) -> NodeKind {
        match self {
            ComputationNode::Matrix(_) => NodeKind::Matrix,
            ComputationNode::Operation { operator, .. } => NodeKind::Operation(*operator),
        }
    }

    fn children(&self) -> &[Self] {
        match self {
            ComputationNode::Matrix(_) => &[],
            ComputationNode::Operation { operands, .. } => operands.as_slice(),
        }
    }

    fn matrix(&self) -> Option<&Grid> {
        match self {
            ComputationNode::Matrix(grid) => Some(grid),
            ComputationNode::Operation { .. } => None,
        }
    }

    fn resolve(&mut self, result: Grid) {
        *self = ComputationNode::Matrix(result);
    }

    /// Depth-first, operands in order.
    fn find_resolvable(&mut self) -> Option<&mut Self> {
        if self.is_resolvable() {
            return Some(self);
        }
        match self {
            ComputationNode::Matrix(_) => None,
            ComputationNode::Operation { operands, .. } => {
                operands.iter_mut().find_map(|child| child.find_resolvable())
            }
        }
    }
}
