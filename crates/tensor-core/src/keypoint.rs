// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Key points and the bounded, shared array that collects them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A detected feature point.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyPoint {
    pub x: i32,
    pub y: i32,
    pub strength: f32,
    /// `true` while the point is valid.
    pub tracking_status: bool,
}

#[derive(Debug)]
struct Inner {
    max_num_values: usize,
    values: Vec<KeyPoint>,
    overflowed: bool,
}

/// A bounded array of key points with shared ownership.
///
/// Clones refer to the same array, so a function can write results into an
/// array the caller holds. Pushing past `max_num_values` is dropped and
/// flags the array as overflowed.
#[derive(Debug, Clone)]
pub struct KeyPointArray {
    inner: Arc<Mutex<Inner>>,
}

impl KeyPointArray {
    pub fn new(max_num_values: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                max_num_values,
                values: Vec::new(),
                overflowed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn max_num_values(&self) -> usize {
        self.lock().max_num_values
    }

    /// Appends `point`; returns `false` if the array is full.
    pub fn push(&self, point: KeyPoint) -> bool {
        let mut inner = self.lock();
        if inner.values.len() >= inner.max_num_values {
            inner.overflowed = true;
            return false;
        }
        inner.values.push(point);
        true
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.values.clear();
        inner.overflowed = false;
    }

    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values.is_empty()
    }

    pub fn has_overflowed(&self) -> bool {
        self.lock().overflowed
    }

    /// A snapshot of the stored points.
    pub fn to_vec(&self) -> Vec<KeyPoint> {
        self.lock().values.clone()
    }

    /// Returns `true` if both handles refer to the same array.
    pub fn same_array(&self, other: &KeyPointArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: i32) -> KeyPoint {
        KeyPoint {
            x,
            y: 0,
            strength: 1.0,
            tracking_status: true,
        }
    }

    #[test]
    fn test_push_until_full() {
        let arr = KeyPointArray::new(2);
        assert!(arr.push(kp(0)));
        assert!(arr.push(kp(1)));
        assert!(!arr.push(kp(2)));
        assert!(arr.has_overflowed());
        assert_eq!(arr.len(), 2);

        arr.clear();
        assert!(arr.is_empty());
        assert!(!arr.has_overflowed());
    }

    #[test]
    fn test_clones_share_values() {
        let arr = KeyPointArray::new(4);
        let alias = arr.clone();
        alias.push(kp(3));
        assert_eq!(arr.to_vec(), vec![kp(3)]);
        assert!(arr.same_array(&alias));
    }
}
