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

use lattice_core::{Orientation, SharedMatrix, SharedVector};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_exclusive_lock_blocks_concurrent_get() {
    // --- 1. ARRANGE ---
    let vector = Arc::new(SharedVector::new(vec![1.0, 2.0, 3.0], Orientation::Row));
    let guard = vector.write();

    let (tx, rx) = mpsc::channel();
    let reader = {
        let vector = Arc::clone(&vector);
        thread::spawn(move || {
            let value = vector.get(1);
            tx.send(value).unwrap();
        })
    };

    // --- 2. ASSERT (blocked) ---
    assert!(
        rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "get() must wait while the exclusive lock is held"
    );

    // --- 3. ACT ---
    drop(guard);

    // --- 4. ASSERT (released) ---
    let value = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("get() should complete once the lock is released");
    assert_eq!(value, Ok(2.0));
    reader.join().unwrap();
}

#[test]
fn test_shared_locks_do_not_block_each_other() {
    let vector = Arc::new(SharedVector::new(vec![4.0, 5.0], Orientation::Column));
    let _held = vector.read();

    let handle = {
        let vector = Arc::clone(&vector);
        thread::spawn(move || vector.get(0))
    };
    assert_eq!(handle.join().unwrap(), Ok(4.0));
}

#[test]
fn test_concurrent_row_adds_on_disjoint_rows() {
    let left = SharedMatrix::from_row_major(&vec![vec![1.0; 64]; 16]).unwrap();
    let right = SharedMatrix::from_row_major(&vec![vec![0.5; 64]; 16]).unwrap();

    let handles: Vec<_> = (0..left.len())
        .map(|i| {
            let l = left.get(i).unwrap();
            let r = right.get(i).unwrap();
            thread::spawn(move || {
                for _ in 0..10 {
                    l.add(&r).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(left.read_row_major().unwrap(), vec![vec![6.0; 64]; 16]);
}

#[test]
fn test_concurrent_vec_mat_mul_shares_columns() {
    // Identity on the right: every row must come back unchanged.
    let identity: Vec<Vec<f64>> = (0..8)
        .map(|i| (0..8).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    let right = Arc::new(SharedMatrix::new());
    right.load_column_major(&identity).unwrap();

    let rows: Vec<Vec<f64>> = (0..32)
        .map(|i| (0..8).map(|j| (i * 8 + j) as f64).collect())
        .collect();
    let left = SharedMatrix::from_row_major(&rows).unwrap();

    let handles: Vec<_> = left
        .snapshot()
        .iter()
        .cloned()
        .map(|row| {
            let right = Arc::clone(&right);
            thread::spawn(move || row.vec_mat_mul(&right))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(left.read_row_major().unwrap(), rows);
}

#[test]
fn test_read_during_reload_sees_a_whole_snapshot() {
    let matrix = Arc::new(SharedMatrix::from_row_major(&vec![vec![0.0; 32]; 32]).unwrap());

    let writer = {
        let matrix = Arc::clone(&matrix);
        thread::spawn(move || {
            for k in 1..200 {
                let value = k as f64;
                matrix.load_row_major(&vec![vec![value; 32]; 32]).unwrap();
            }
        })
    };

    for _ in 0..200 {
        let grid = matrix.read_row_major().unwrap();
        let first = grid[0][0];
        assert!(grid.iter().flatten().all(|v| *v == first), "torn read");
    }
    writer.join().unwrap();
}
