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

//! Error type shared by vector and matrix operations.

use std::fmt;

/// A specialized `Result` type for vector and matrix operations.
pub type MatrixResult<T> = Result<T, MatrixError>;

/// An error raised by a [`SharedVector`](crate::SharedVector) or
/// [`SharedMatrix`](crate::SharedMatrix) operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    /// An argument violated the operation's contract (length or orientation
    /// mismatch, ragged grid, aliased operands).
    InvalidArgument(String),
    /// An index was outside `[0, len)`.
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The length of the indexed container.
        len: usize,
    },
    /// The vectors of a matrix disagree on length or orientation.
    ///
    /// This signals corrupted state rather than a user error and is never retried.
    Inconsistent {
        /// Position of the offending vector in the matrix.
        position: usize,
        /// What the first vector of the matrix established.
        expected: String,
        /// What the offending vector actually holds.
        found: String,
    },
}

impl MatrixError {
    /// Convenience constructor for [`MatrixError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        MatrixError::InvalidArgument(msg.into())
    }
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            MatrixError::OutOfRange { index, len } => {
                write!(f, "Index {index} is out of range for length {len}")
            }
            MatrixError::Inconsistent {
                position,
                expected,
                found,
            } => write!(
                f,
                "Inconsistent matrix: vector {position} has {found}, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for MatrixError {}
