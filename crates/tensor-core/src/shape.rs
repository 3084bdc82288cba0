// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Logical tensor extents.

use std::fmt;

/// Logical extent of a [`crate::Tensor`], outermost dimension first.
///
/// Images are `[height, width]` and matrices `[rows, cols]`; anything in
/// front of the last two dimensions is a stack of such planes. Padding is
/// not part of the shape, see [`crate::TensorInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!((s.outer(), s.rows(), s.cols()), (2, 3, 4));
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self { dims: vec![rows, cols] }
    }

    /// A `[height, width]` image plane.
    pub fn image(width: usize, height: usize) -> Self {
        Self::matrix(height, width)
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Element count; 1 for rank 0.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Second-to-last dimension, or 1 below rank 2.
    pub fn rows(&self) -> usize {
        match self.dims.as_slice() {
            [.., rows, _] => *rows,
            _ => 1,
        }
    }

    /// Last dimension, or 1 for rank 0.
    pub fn cols(&self) -> usize {
        self.dims.last().copied().unwrap_or(1)
    }

    /// Number of planes: the product of every dimension before the last two.
    pub fn outer(&self) -> usize {
        let planes = self.dims.len().saturating_sub(2);
        self.dims[..planes].iter().product()
    }

    /// `true` if `self` is `[M, K]` and `other` is `[K, N]`.
    pub fn is_matmul_compatible(&self, other: &Shape) -> bool {
        matches!((self.dims.as_slice(), other.dims.as_slice()), ([_, k], [k2, _]) if k == k2)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.dims).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planes_rows_cols() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!((s.outer(), s.rows(), s.cols()), (2, 3, 4));
        assert_eq!(s.num_elements(), 24);

        let v = Shape::vector(7);
        assert_eq!((v.outer(), v.rows(), v.cols()), (1, 1, 7));

        let scalar = Shape::new(vec![]);
        assert_eq!((scalar.num_elements(), scalar.rows(), scalar.cols()), (1, 1, 1));
    }

    #[test]
    fn test_image_is_height_major() {
        let s = Shape::image(640, 480);
        assert_eq!(s.dims(), [480, 640]);
        assert_eq!((s.rows(), s.cols()), (480, 640));
    }

    #[test]
    fn test_matmul_compatible() {
        let a = Shape::matrix(3, 4);
        assert!(a.is_matmul_compatible(&Shape::matrix(4, 5)));
        assert!(!a.is_matmul_compatible(&Shape::matrix(5, 5)));
        assert!(!Shape::vector(4).is_matmul_compatible(&Shape::matrix(4, 1)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::new(vec![2, 3, 4]).to_string(), "[2, 3, 4]");
        assert_eq!(Shape::matrix(1, 9).to_string(), "[1, 9]");
    }
}
