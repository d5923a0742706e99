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

//! An ordered, atomically published collection of [`SharedVector`]s.

use crate::error::{MatrixError, MatrixResult};
use crate::vector::{Orientation, SharedVector, VectorReadGuard};
use crate::Grid;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// The published vector sequence of a [`SharedMatrix`].
pub type VectorSnapshot = Arc<Vec<Arc<SharedVector>>>;

/// A matrix stored as one [`SharedVector`] per row (row-major) or per column
/// (column-major).
///
/// Loading builds a brand new vector sequence and publishes it with a single
/// atomic swap. Readers that took a snapshot before the swap keep seeing the old
/// vectors; they never observe a half-loaded matrix. Only the contents of
/// individual vectors change after publication.
#[derive(Debug)]
pub struct SharedMatrix {
    vectors: ArcSwap<Vec<Arc<SharedVector>>>,
}

impl SharedMatrix {
    /// Creates an empty matrix.
    pub fn new() -> Self {
        Self {
            vectors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Creates a matrix holding `grid` in row-major form.
    pub fn from_row_major(grid: &[Vec<f64>]) -> MatrixResult<Self> {
        let matrix = Self::new();
        matrix.load_row_major(grid)?;
        Ok(matrix)
    }

    /// Replaces the contents with one `Row` vector per row of `grid`.
    pub fn load_row_major(&self, grid: &[Vec<f64>]) -> MatrixResult<()> {
        validate_rectangular(grid)?;
        let vectors = grid
            .iter()
            .map(|row| Arc::new(SharedVector::new(row.clone(), Orientation::Row)))
            .collect();
        self.vectors.store(Arc::new(vectors));
        log::trace!("Published row-major matrix ({} rows)", grid.len());
        Ok(())
    }

    /// Replaces the contents with one `Column` vector per column of `grid`.
    pub fn load_column_major(&self, grid: &[Vec<f64>]) -> MatrixResult<()> {
        let cols = validate_rectangular(grid)?;
        let vectors = (0..cols)
            .map(|j| {
                let column = grid.iter().map(|row| row[j]).collect();
                Arc::new(SharedVector::new(column, Orientation::Column))
            })
            .collect();
        self.vectors.store(Arc::new(vectors));
        log::trace!("Published column-major matrix ({cols} columns)");
        Ok(())
    }

    /// Reads the whole matrix back in row-major order.
    ///
    /// Every vector of the current snapshot is read-locked for the duration of
    /// the copy, so the result is consistent across rows even while row tasks
    /// are running. A column-major snapshot is transposed on the fly.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Inconsistent`] if the vectors disagree on length
    /// or orientation.
    pub fn read_row_major(&self) -> MatrixResult<Grid> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let mut guards: Vec<VectorReadGuard<'_>> = Vec::with_capacity(snapshot.len());
        for vector in snapshot.iter() {
            guards.push(vector.read());
        }

        let result = materialize(&guards);
        while let Some(guard) = guards.pop() {
            drop(guard);
        }
        result
    }

    /// Returns the vector at `index`.
    pub fn get(&self, index: usize) -> MatrixResult<Arc<SharedVector>> {
        let snapshot = self.snapshot();
        snapshot
            .get(index)
            .cloned()
            .ok_or(MatrixError::OutOfRange {
                index,
                len: snapshot.len(),
            })
    }

    /// Returns the number of vectors (rows or columns) currently published.
    pub fn len(&self) -> usize {
        self.vectors.load().len()
    }

    /// Returns true if no vectors are published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the orientation of the published vectors, or `None` if empty.
    ///
    /// This is read from the first vector, so it follows in-place transposes.
    pub fn orientation(&self) -> Option<Orientation> {
        self.vectors.load().first().map(|vector| vector.orientation())
    }

    /// Takes a lock-free snapshot of the published vector sequence.
    pub fn snapshot(&self) -> VectorSnapshot {
        self.vectors.load_full()
    }
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that every row has the length of the first one and returns it.
fn validate_rectangular(grid: &[Vec<f64>]) -> MatrixResult<usize> {
    let cols = grid.first().map_or(0, Vec::len);
    for (i, row) in grid.iter().enumerate() {
        if row.len() != cols {
            return Err(MatrixError::invalid(format!(
                "Matrix is not rectangular: row {i} has length {}, row 0 has length {cols}",
                row.len()
            )));
        }
    }
    Ok(cols)
}

/// Builds the row-major copy from already read-locked vectors.
fn materialize(guards: &[VectorReadGuard<'_>]) -> MatrixResult<Grid> {
    let Some(first) = guards.first() else {
        return Ok(Vec::new());
    };
    let len = first.len();
    let orientation = first.orientation();

    for (position, guard) in guards.iter().enumerate() {
        if guard.len() != len || guard.orientation() != orientation {
            log::error!("Matrix read found a corrupted vector at position {position}");
            return Err(MatrixError::Inconsistent {
                position,
                expected: format!("length {len} ({orientation})"),
                found: format!("length {} ({})", guard.len(), guard.orientation()),
            });
        }
    }

    let grid = match orientation {
        Orientation::Row => guards.iter().map(|guard| guard.to_vec()).collect(),
        Orientation::Column => (0..len)
            .map(|row| guards.iter().map(|column| column[row]).collect())
            .collect(),
    };
    Ok(grid)
}
