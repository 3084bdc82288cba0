// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensors.

use crate::{BorderSize, DType, Shape};
use memory_manager::MemoryError;

/// Errors that can occur when describing or accessing tensors.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided data does not match the expected element count.
    #[error("size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// Typed access used an element type other than the tensor's.
    #[error("dtype mismatch: tensor holds {actual}, accessed as {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// A coordinate lies outside the tensor and its padding.
    #[error("element ({row}, {col}) is outside the tensor (padding {padding})")]
    OutOfBounds {
        row: isize,
        col: isize,
        padding: BorderSize,
    },

    /// The tensor's storage could not be provided or accessed.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}
