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

//! A one-dimensional numeric buffer guarded by a reader/writer lock.
//!
//! A [`SharedVector`] is one row (or one column) of a matrix. The owning
//! [`SharedMatrix`] hands out `Arc` references to row tasks; the per-vector lock,
//! not the borrow checker, enforces exclusivity while tasks run.
//!
//! ## Lock order
//!
//! Operations touching two vectors always take the exclusive lock on `self`
//! first and the shared lock(s) on the other operand(s) second. Matrix columns
//! are locked in index order and released in reverse order. No operation holds
//! two exclusive locks at once.

use crate::error::{MatrixError, MatrixResult};
use crate::matrix::SharedMatrix;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Whether a vector holds one row or one column of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// One row of a row-major matrix.
    Row,
    /// One column of a column-major matrix.
    Column,
}

impl Orientation {
    /// Returns the opposite orientation.
    #[inline]
    pub const fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Row => write!(f, "ROW"),
            Orientation::Column => write!(f, "COLUMN"),
        }
    }
}

#[derive(Debug)]
struct VectorState {
    data: Vec<f64>,
    orientation: Orientation,
}

/// A numeric vector tagged with an [`Orientation`] and guarded by a
/// reader/writer lock.
///
/// Reads among themselves are concurrent; any write is exclusive.
#[derive(Debug)]
pub struct SharedVector {
    state: RwLock<VectorState>,
    // Mirrors `state.data.len()`; only written while the exclusive lock is held.
    len: AtomicUsize,
}

impl SharedVector {
    /// Creates a new vector owning `data`.
    pub fn new(data: Vec<f64>, orientation: Orientation) -> Self {
        let len = data.len();
        Self {
            state: RwLock::new(VectorState { data, orientation }),
            len: AtomicUsize::new(len),
        }
    }

    /// Returns the element at `index` under a shared lock.
    pub fn get(&self, index: usize) -> MatrixResult<f64> {
        let state = self.state.read();
        state
            .data
            .get(index)
            .copied()
            .ok_or(MatrixError::OutOfRange {
                index,
                len: state.data.len(),
            })
    }

    /// Returns the number of elements without taking the lock.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true if the vector holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current orientation. Takes a shared lock, since
    /// [`transpose`](Self::transpose) can change it.
    pub fn orientation(&self) -> Orientation {
        self.state.read().orientation
    }

    /// Acquires the shared lock and returns a guard over the buffer.
    pub fn read(&self) -> VectorReadGuard<'_> {
        VectorReadGuard {
            inner: self.state.read(),
        }
    }

    /// Acquires the exclusive lock and returns a mutable guard over the buffer.
    pub fn write(&self) -> VectorWriteGuard<'_> {
        VectorWriteGuard {
            inner: self.state.write(),
        }
    }

    /// Copies the current contents out under a shared lock.
    pub fn to_vec(&self) -> Vec<f64> {
        self.state.read().data.clone()
    }

    /// Flips the orientation in O(1). The elements are not moved.
    pub fn transpose(&self) {
        let mut state = self.state.write();
        state.orientation = state.orientation.flipped();
    }

    /// Replaces every element with its additive inverse.
    pub fn negate(&self) {
        let mut state = self.state.write();
        for value in state.data.iter_mut() {
            *value = -*value;
        }
    }

    /// Adds `other` into `self`, element by element.
    ///
    /// Both vectors must have the same length and orientation. Adding a vector
    /// to itself doubles it under a single exclusive lock.
    pub fn add(&self, other: &SharedVector) -> MatrixResult<()> {
        if std::ptr::eq(self, other) {
            let mut state = self.state.write();
            for value in state.data.iter_mut() {
                *value += *value;
            }
            return Ok(());
        }

        // Lock ordering: write(self) -> read(other)
        let mut this = self.state.write();
        let that = other.state.read();

        if this.data.len() != that.data.len() {
            return Err(MatrixError::invalid(format!(
                "Vector length mismatch: {} vs {}",
                this.data.len(),
                that.data.len()
            )));
        }
        if this.orientation != that.orientation {
            return Err(MatrixError::invalid(format!(
                "Vector orientation mismatch: {} vs {}",
                this.orientation, that.orientation
            )));
        }

        for (a, b) in this.data.iter_mut().zip(that.data.iter()) {
            *a += *b;
        }
        Ok(())
    }

    /// Computes the dot product of this row vector with a column vector.
    ///
    /// Fails unless `self` is a `Row` and `other` a `Column` of the same length.
    pub fn dot(&self, other: &SharedVector) -> MatrixResult<f64> {
        if std::ptr::eq(self, other) {
            return Err(MatrixError::invalid(
                "Dot product requires ROW · COLUMN, got the same vector on both sides",
            ));
        }

        let this = self.state.read();
        let that = other.state.read();

        if this.orientation != Orientation::Row || that.orientation != Orientation::Column {
            return Err(MatrixError::invalid(format!(
                "Dot product requires ROW · COLUMN, got {} · {}",
                this.orientation, that.orientation
            )));
        }
        if this.data.len() != that.data.len() {
            return Err(MatrixError::invalid(format!(
                "Dot product length mismatch: {} vs {}",
                this.data.len(),
                that.data.len()
            )));
        }

        Ok(dot_slices(&this.data, &that.data))
    }

    /// Replaces this row vector with `self × matrix`, where `matrix` is stored
    /// column-major.
    ///
    /// The new buffer has one element per column of `matrix`, so the length
    /// changes unless the matrix is square. The orientation stays `Row`.
    pub fn vec_mat_mul(&self, matrix: &SharedMatrix) -> MatrixResult<()> {
        let columns = matrix.snapshot();
        if columns.iter().any(|column| std::ptr::eq(column.as_ref(), self)) {
            return Err(MatrixError::invalid(
                "vecMatMul operand aliases a column of the matrix",
            ));
        }

        let mut this = self.state.write();
        if this.orientation != Orientation::Row {
            return Err(MatrixError::invalid(
                "vecMatMul requires this vector to be ROW",
            ));
        }

        let mut guards: Vec<VectorReadGuard<'_>> = Vec::with_capacity(columns.len());
        for column in columns.iter() {
            guards.push(column.read());
        }

        let outcome = multiply_into(&this.data, &guards);
        while let Some(guard) = guards.pop() {
            drop(guard);
        }

        let product = outcome?;
        self.len.store(product.len(), Ordering::Release);
        this.data = product;
        Ok(())
    }
}

/// Computes `row × columns` with every column already read-locked.
fn multiply_into(row: &[f64], columns: &[VectorReadGuard<'_>]) -> MatrixResult<Vec<f64>> {
    let Some(first) = columns.first() else {
        return Err(MatrixError::invalid(
            "vecMatMul requires a non-empty COLUMN matrix",
        ));
    };
    if first.orientation() != Orientation::Column {
        return Err(MatrixError::invalid(
            "vecMatMul requires the matrix to be COLUMN",
        ));
    }
    if first.len() != row.len() {
        return Err(MatrixError::invalid(format!(
            "vecMatMul dimension mismatch: row length {}, matrix column length {}",
            row.len(),
            first.len()
        )));
    }

    let mut product = Vec::with_capacity(columns.len());
    for (position, column) in columns.iter().enumerate() {
        if column.len() != row.len() || column.orientation() != Orientation::Column {
            return Err(MatrixError::Inconsistent {
                position,
                expected: format!("length {} ({})", row.len(), Orientation::Column),
                found: format!("length {} ({})", column.len(), column.orientation()),
            });
        }
        product.push(dot_slices(row, column));
    }
    Ok(product)
}

#[inline]
fn dot_slices(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Shared access to a [`SharedVector`]'s buffer. The lock is released on drop.
pub struct VectorReadGuard<'a> {
    inner: RwLockReadGuard<'a, VectorState>,
}

impl VectorReadGuard<'_> {
    /// Returns the orientation observed under this lock.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.inner.orientation
    }
}

impl Deref for VectorReadGuard<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.inner.data
    }
}

/// Exclusive access to a [`SharedVector`]'s buffer. The lock is released on drop.
///
/// The buffer can be modified in place but not resized.
pub struct VectorWriteGuard<'a> {
    inner: RwLockWriteGuard<'a, VectorState>,
}

impl VectorWriteGuard<'_> {
    /// Returns the orientation observed under this lock.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.inner.orientation
    }
}

impl Deref for VectorWriteGuard<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.inner.data
    }
}

impl DerefMut for VectorWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.inner.data
    }
}
