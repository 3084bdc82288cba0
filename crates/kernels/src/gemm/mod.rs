// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! GEMM building blocks.
//!
//! The blocked path reshapes both operands so the multiply walks memory
//! linearly: A `[M, K]` is interleaved in 4x4 blocks into
//! `[ceil(M/4), 4K]`, and B `[K, N]` is transposed in 1xW strips (W = 4)
//! into `[ceil(N/4), 4K]`. Out-of-range elements of a partial block are 0.

mod addition;
mod interleave;
mod multiply;
mod transpose;

pub use addition::GemmMatrixAdditionKernel;
pub use interleave::GemmInterleave4x4Kernel;
pub use multiply::GemmMatrixMultiplyKernel;
pub use transpose::GemmTranspose1xWKernel;

use tensor_core::Shape;

/// Rows interleaved together by [`GemmInterleave4x4Kernel`].
pub const INTERLEAVE_HEIGHT: usize = 4;

/// Columns per strip of [`GemmTranspose1xWKernel`].
pub const TRANSPOSE_WIDTH: usize = 4;

/// Shape of A `[m, k]` after interleaving.
pub fn interleaved_shape(m: usize, k: usize) -> Shape {
    Shape::matrix(m.div_ceil(INTERLEAVE_HEIGHT), k * INTERLEAVE_HEIGHT)
}

/// Shape of B `[k, n]` after the 1xW transpose.
pub fn transposed_shape(k: usize, n: usize) -> Shape {
    Shape::matrix(n.div_ceil(TRANSPOSE_WIDTH), k * TRANSPOSE_WIDTH)
}
