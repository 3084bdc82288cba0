// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{interleaved_shape, INTERLEAVE_HEIGHT};
use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderSize, DType, Tensor};

/// Interleaves blocks of four rows of A: output row `b` holds
/// `a[4b][0], a[4b+1][0], a[4b+2][0], a[4b+3][0], a[4b][1], ...`.
#[derive(Debug, Clone)]
pub struct GemmInterleave4x4Kernel {
    input: Tensor,
    output: Tensor,
}

impl GemmInterleave4x4Kernel {
    pub const NAME: &'static str = "gemm_interleave_4x4";

    pub fn configure(input: &Tensor, output: &Tensor) -> Result<Self, KernelError> {
        if input.dtype() != DType::F32 || input.shape().rank() != 2 {
            return Err(KernelError::invalid(Self::NAME, "input must be a rank-2 f32 matrix"));
        }
        let expected = interleaved_shape(input.shape().rows(), input.shape().cols());
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
        let (m, k) = (self.input.shape().rows(), self.input.shape().cols());
        let a = self.input.to_vec::<f32>()?;
        let row_len = k * INTERLEAVE_HEIGHT;

        let mut out = vec![0f32; self.output.shape().num_elements()];
        ctx.for_each_row(&mut out, row_len, |block, row| {
            for kk in 0..k {
                for i in 0..INTERLEAVE_HEIGHT {
                    let r = block * INTERLEAVE_HEIGHT + i;
                    if r < m {
                        row[kk * INTERLEAVE_HEIGHT + i] = a[r * k + kk];
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
    fn test_interleave_partial_block() {
        // 5x2: one full block and one block with a single row.
        let a: Vec<f32> = (0..10).map(|x| x as f32).collect();
        let input = Tensor::from_slice(Shape::matrix(5, 2), &a).unwrap();
        let output = Tensor::zeros(interleaved_shape(5, 2), DType::F32).unwrap();
        GemmInterleave4x4Kernel::configure(&input, &output)
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        assert_eq!(
            output.to_vec::<f32>().unwrap(),
            vec![
                0.0, 2.0, 4.0, 6.0, 1.0, 3.0, 5.0, 7.0, //
                8.0, 0.0, 0.0, 0.0, 9.0, 0.0, 0.0, 0.0,
            ]
        );
    }
}
