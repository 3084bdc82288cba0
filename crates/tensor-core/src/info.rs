// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor metadata: shape, element type, padding and storage layout.

use crate::{BorderSize, DType, Shape, TensorError};

/// Default storage alignment in bytes (one cache line).
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Everything needed to size and address a tensor's storage.
///
/// Padding applies to the two innermost dimensions. A padded plane is laid
/// out row-major with `padded_cols()` elements per row; element `(row, col)`
/// of the valid region lives at `offset_of(row, col)`, and negative or
/// past-the-end coordinates address the padding.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TensorInfo {
    shape: Shape,
    dtype: DType,
    padding: BorderSize,
    alignment: usize,
}

impl TensorInfo {
    pub fn new(shape: Shape, dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            padding: BorderSize::default(),
            alignment: DEFAULT_ALIGNMENT,
        }
    }

    /// Adds (side-wise max) `padding` around the innermost plane.
    pub fn with_padding(mut self, padding: BorderSize) -> Self {
        self.padding = self.padding.max(padding);
        self
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn padding(&self) -> BorderSize {
        self.padding
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Width of one stored row, padding included, in elements.
    pub fn padded_cols(&self) -> usize {
        self.shape.cols() + self.padding.left + self.padding.right
    }

    /// Rows of one stored plane, padding included.
    pub fn padded_rows(&self) -> usize {
        self.shape.rows() + self.padding.top + self.padding.bottom
    }

    /// Elements of storage, padding included.
    pub fn total_elements(&self) -> usize {
        self.shape.outer() * self.padded_rows() * self.padded_cols()
    }

    /// Bytes of storage, padding included.
    pub fn total_size(&self) -> usize {
        self.total_elements() * self.dtype.size_bytes()
    }

    /// Element index of `(row, col)` in the first plane.
    ///
    /// Coordinates may reach into the padding; anything beyond it is an
    /// error.
    pub fn offset_of(&self, row: isize, col: isize) -> Result<usize, TensorError> {
        let r = row + self.padding.top as isize;
        let c = col + self.padding.left as isize;
        if r < 0 || c < 0 || r as usize >= self.padded_rows() || c as usize >= self.padded_cols() {
            return Err(TensorError::OutOfBounds {
                row,
                col,
                padding: self.padding,
            });
        }
        Ok(r as usize * self.padded_cols() + c as usize)
    }

    /// Returns `true` if both describe the same logical data (shape and type).
    pub fn matches(&self, other: &TensorInfo) -> bool {
        self.shape == other.shape && self.dtype == other.dtype
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpadded_layout() {
        let info = TensorInfo::new(Shape::matrix(4, 6), DType::F32);
        assert_eq!(info.total_size(), 96);
        assert_eq!(info.offset_of(1, 2).unwrap(), 8);
        assert!(info.offset_of(-1, 0).is_err());
        assert!(info.offset_of(0, 6).is_err());
    }

    #[test]
    fn test_padded_layout() {
        let info = TensorInfo::new(Shape::matrix(4, 6), DType::I32).with_padding(BorderSize::uniform(2));
        assert_eq!(info.padded_cols(), 10);
        assert_eq!(info.padded_rows(), 8);
        assert_eq!(info.total_size(), 8 * 10 * 4);
        assert_eq!(info.offset_of(0, 0).unwrap(), 2 * 10 + 2);
        assert_eq!(info.offset_of(-2, -2).unwrap(), 0);
        assert_eq!(info.offset_of(5, 7).unwrap(), 8 * 10 - 1);
        assert!(info.offset_of(-3, 0).is_err());
    }

    #[test]
    fn test_padding_only_grows() {
        let info = TensorInfo::new(Shape::matrix(2, 2), DType::U8)
            .with_padding(BorderSize::uniform(3))
            .with_padding(BorderSize::uniform(1));
        assert_eq!(info.padding(), BorderSize::uniform(3));
    }
}
