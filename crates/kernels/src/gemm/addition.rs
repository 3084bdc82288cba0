// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderSize, DType, Tensor};

/// `output += beta * c`.
#[derive(Debug, Clone)]
pub struct GemmMatrixAdditionKernel {
    c: Tensor,
    output: Tensor,
    beta: f32,
}

impl GemmMatrixAdditionKernel {
    pub const NAME: &'static str = "gemm_matrix_addition";

    pub fn configure(c: &Tensor, output: &Tensor, beta: f32) -> Result<Self, KernelError> {
        if c.dtype() != DType::F32 || output.dtype() != DType::F32 || c.shape() != output.shape() {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("c must match the output: {} {} vs {} {}", c.dtype(), c.shape(), output.dtype(), output.shape()),
            ));
        }
        Ok(Self {
            c: c.clone(),
            output: output.clone(),
            beta,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let n = self.output.shape().cols();
        let c = self.c.to_vec::<f32>()?;
        let mut out = self.output.to_vec::<f32>()?;
        let beta = self.beta;
        ctx.for_each_row(&mut out, n, |r, row| {
            for (j, value) in row.iter_mut().enumerate() {
                *value += beta * c[r * n + j];
            }
        });
        self.output.copy_from_slice(&out)?;
        Ok(())
    }
}
