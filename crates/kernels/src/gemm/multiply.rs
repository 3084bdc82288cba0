// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{interleaved_shape, transposed_shape, INTERLEAVE_HEIGHT, TRANSPOSE_WIDTH};
use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderSize, DType, Tensor};

/// `output = alpha * a * b`.
///
/// With `reshaped` the operands are the interleaved A and transposed B;
/// otherwise they are plain row-major `[M, K]` and `[K, N]` (the
/// vector-matrix path uses this with `M == 1`). Both paths accumulate in
/// ascending `k` order and produce identical results.
#[derive(Debug, Clone)]
pub struct GemmMatrixMultiplyKernel {
    a: Tensor,
    b: Tensor,
    output: Tensor,
    alpha: f32,
    reshaped: bool,
    k: usize,
}

impl GemmMatrixMultiplyKernel {
    pub const NAME: &'static str = "gemm_matrix_multiply";

    pub fn configure(a: &Tensor, b: &Tensor, output: &Tensor, alpha: f32, reshaped: bool) -> Result<Self, KernelError> {
        for t in [a, b, output] {
            if t.dtype() != DType::F32 || t.shape().rank() != 2 {
                return Err(KernelError::invalid(Self::NAME, "operands must be rank-2 f32 matrices"));
            }
        }
        let (m, n) = (output.shape().rows(), output.shape().cols());
        let k = if reshaped {
            a.shape().cols() / INTERLEAVE_HEIGHT
        } else {
            a.shape().cols()
        };
        let (expected_a, expected_b) = if reshaped {
            (interleaved_shape(m, k), transposed_shape(k, n))
        } else {
            (tensor_core::Shape::matrix(m, k), tensor_core::Shape::matrix(k, n))
        };
        if a.shape() != &expected_a || b.shape() != &expected_b {
            return Err(KernelError::invalid(
                Self::NAME,
                format!(
                    "for output {} expected a {expected_a} and b {expected_b}, got {} and {}",
                    output.shape(),
                    a.shape(),
                    b.shape()
                ),
            ));
        }
        Ok(Self {
            a: a.clone(),
            b: b.clone(),
            output: output.clone(),
            alpha,
            reshaped,
            k,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    /// Whether this multiply consumes reshaped operands.
    pub fn is_reshaped(&self) -> bool {
        self.reshaped
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let n = self.output.shape().cols();
        let k = self.k;
        let a = self.a.to_vec::<f32>()?;
        let b = self.b.to_vec::<f32>()?;
        let reshaped = self.reshaped;
        let alpha = self.alpha;

        let a_at = |r: usize, kk: usize| {
            if reshaped {
                a[(r / INTERLEAVE_HEIGHT) * k * INTERLEAVE_HEIGHT + kk * INTERLEAVE_HEIGHT + r % INTERLEAVE_HEIGHT]
            } else {
                a[r * k + kk]
            }
        };
        let b_at = |kk: usize, j: usize| {
            if reshaped {
                b[(j / TRANSPOSE_WIDTH) * k * TRANSPOSE_WIDTH + kk * TRANSPOSE_WIDTH + j % TRANSPOSE_WIDTH]
            } else {
                b[kk * n + j]
            }
        };

        let mut out = vec![0f32; self.output.shape().num_elements()];
        ctx.for_each_row(&mut out, n, |r, row| {
            for (j, value) in row.iter_mut().enumerate() {
                let mut acc = 0f32;
                for kk in 0..k {
                    acc += a_at(r, kk) * b_at(kk, j);
                }
                *value = alpha * acc;
            }
        });
        self.output.copy_from_slice(&out)?;
        Ok(())
    }
}
