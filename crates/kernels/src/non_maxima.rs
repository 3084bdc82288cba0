// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 3x3 non-maxima suppression.

use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderSize, DType, Tensor};

/// Keeps a value only where it is a local maximum of its 3x3 neighbourhood.
///
/// The comparison is asymmetric so that a plateau keeps exactly one value:
/// the centre must be `>=` the row above and its left neighbour, and `>`
/// its right neighbour and the row below. Pixels on the image edge are 0.
#[derive(Debug, Clone)]
pub struct NonMaximaSuppression3x3Kernel {
    input: Tensor,
    output: Tensor,
}

impl NonMaximaSuppression3x3Kernel {
    pub const NAME: &'static str = "non_maxima_suppression_3x3";

    pub fn configure(input: &Tensor, output: &Tensor) -> Result<Self, KernelError> {
        if input.dtype() != DType::F32 || output.dtype() != DType::F32 || input.shape().rank() != 2 {
            return Err(KernelError::invalid(Self::NAME, "input and output must be rank-2 f32"));
        }
        if input.shape() != output.shape() {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("shape mismatch: {} vs {}", input.shape(), output.shape()),
            ));
        }
        Ok(Self {
            input: input.clone(),
            output: output.clone(),
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::uniform(1)
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let (height, width) = (self.input.shape().rows(), self.input.shape().cols());
        let v = self.input.to_vec::<f32>()?;
        let at = |r: usize, c: usize| v[r * width + c];

        let mut out = vec![0f32; width * height];
        ctx.for_each_row(&mut out, width, |r, row| {
            if r == 0 || r + 1 >= height {
                return;
            }
            for c in 1..width.saturating_sub(1) {
                let centre = at(r, c);
                let keep = centre >= at(r - 1, c - 1)
                    && centre >= at(r - 1, c)
                    && centre >= at(r - 1, c + 1)
                    && centre >= at(r, c - 1)
                    && centre > at(r, c + 1)
                    && centre > at(r + 1, c - 1)
                    && centre > at(r + 1, c)
                    && centre > at(r + 1, c + 1);
                row[c] = if keep { centre } else { 0.0 };
            }
        });

        self.output.copy_from_slice(&out)?;
        Ok(())
    }
}
