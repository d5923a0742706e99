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

//! Error type for engine operations.

use lattice_core::MatrixError;
use lattice_pool::PoolError;
use std::fmt;

/// A specialized `Result` type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// An error raised while evaluating an operation or an expression tree.
#[derive(Debug)]
pub enum EngineError {
    /// Wrong operand count or incompatible operand shapes.
    InvalidArgument(String),
    /// The node does not describe an operation the engine can run.
    UnsupportedOperation(String),
    /// The expression is not a single matrix, yet no node can be resolved.
    NoResolvableNode,
    /// A matrix container rejected an operand or was found inconsistent.
    Matrix(MatrixError),
    /// The worker pool refused the batch.
    Pool(PoolError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            EngineError::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {msg}"),
            EngineError::NoResolvableNode => {
                write!(f, "Expression has no resolvable node but is not a matrix")
            }
            EngineError::Matrix(e) => write!(f, "Matrix error: {e}"),
            EngineError::Pool(e) => write!(f, "Pool error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Matrix(e) => Some(e),
            EngineError::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MatrixError> for EngineError {
    fn from(e: MatrixError) -> Self {
        EngineError::Matrix(e)
    }
}

impl From<PoolError> for EngineError {
    fn from(e: PoolError) -> Self {
        EngineError::Pool(e)
    }
}
