// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{transposed_shape, TRANSPOSE_WIDTH};
use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderSize, DType, Tensor};

/// Transposes B in strips of four columns: output row `j` holds
/// `b[0][4j..4j+4], b[1][4j..4j+4], ...`.
#[derive(Debug, Clone)]
pub struct GemmTranspose1xWKernel {
    input: Tensor,
    output: Tensor,
}

impl GemmTranspose1xWKernel {
    pub const NAME: &'static str = "gemm_transpose_1xw";

    pub fn configure(input: &Tensor, output: &Tensor) -> Result<Self, KernelError> {
        if input.dtype() != DType::F32 || input.shape().rank() != 2 {
            return Err(KernelError::invalid(Self::NAME, "input must be a rank-2 f32 matrix"));
        }
        let expected = transposed_shape(input.shape().rows(), input.shape().cols());
        if output.dtype() != DType::F32 || output.shape() != &expected {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("output must be f32 {expected}, got {} {}", output.dtype(), output.shape()),
            ));
        }
        Ok(Self {
            input: input.clone(),
            output: output.clone(),
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let (k, n) = (self.input.shape().rows(), self.input.shape().cols());
        let b = self.input.to_vec::<f32>()?;

        let mut out = vec![0f32; self.output.shape().num_elements()];
        ctx.for_each_row(&mut out, k * TRANSPOSE_WIDTH, |strip, row| {
            for kk in 0..k {
                for t in 0..TRANSPOSE_WIDTH {
                    let col = strip * TRANSPOSE_WIDTH + t;
                    if col < n {
                        row[kk * TRANSPOSE_WIDTH + t] = b[kk * n + col];
                    }
                }
            }
        });
        self.output.copy_from_slice(&out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_transpose_partial_strip() {
        // 2x5: one full strip and one strip with a single column.
        let b: Vec<f32> = (0..10).map(|x| x as f32).collect();
        let input = Tensor::from_slice(Shape::matrix(2, 5), &b).unwrap();
        let output = Tensor::zeros(transposed_shape(2, 5), DType::F32).unwrap();
        GemmTranspose1xWKernel::configure(&input, &output)
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        assert_eq!(
            output.to_vec::<f32>().unwrap(),
            vec![
                0.0, 1.0, 2.0, 3.0, 5.0, 6.0, 7.0, 8.0, //
                4.0, 0.0, 0.0, 0.0, 9.0, 0.0, 0.0, 0.0,
            ]
        );
    }
}
