// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Harris corner response.
//!
//! For each pixel the normalized gradients over a `block_size` window give
//! the structure tensor `[[Σgx², Σgxgy], [Σgxgy, Σgy²]]`. The response is
//! `det - sensitivity * trace²`, kept only where it exceeds the threshold.

use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderSize, DType, Tensor};

/// Parameters of the Harris response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarrisScoreParams {
    pub norm_factor: f32,
    pub sensitivity: f32,
    pub threshold: f32,
    pub block_size: usize,
    /// Zero every pixel whose window leaves the image.
    pub border_undefined: bool,
}

#[derive(Debug, Clone)]
pub struct HarrisScoreKernel {
    gx: Tensor,
    gy: Tensor,
    output: Tensor,
    params: HarrisScoreParams,
}

impl HarrisScoreKernel {
    pub const NAME: &'static str = "harris_score";

    pub fn configure(gx: &Tensor, gy: &Tensor, output: &Tensor, params: HarrisScoreParams) -> Result<Self, KernelError> {
        if !matches!(params.block_size, 3 | 5 | 7) {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("block size must be 3, 5 or 7, got {}", params.block_size),
            ));
        }
        let reach = BorderSize::uniform(params.block_size / 2);
        for g in [gx, gy] {
            if g.dtype() != DType::I32 || g.shape().rank() != 2 {
                return Err(KernelError::invalid(Self::NAME, "gradients must be rank-2 i32"));
            }
            if !g.info().padding().covers(&reach) {
                return Err(KernelError::invalid(
                    Self::NAME,
                    format!("gradient padding {} is smaller than the window reach {reach}", g.info().padding()),
                ));
            }
        }
        if gx.info().padding() != gy.info().padding() {
            return Err(KernelError::invalid(Self::NAME, "gx and gy must share one padding"));
        }
        if gx.shape() != gy.shape() || output.shape() != gx.shape() || output.dtype() != DType::F32 {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("output must be f32 {}, got {} {}", gx.shape(), output.dtype(), output.shape()),
            ));
        }
        Ok(Self {
            gx: gx.clone(),
            gy: gy.clone(),
            output: output.clone(),
            params,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::uniform(self.params.block_size / 2)
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let info = self.gx.info();
        let (height, width) = (info.shape().rows(), info.shape().cols());
        let pcol = info.padded_cols();
        let pad = info.padding();
        let gx = self.gx.read_all::<i32>()?;
        let gy = self.gy.read_all::<i32>()?;
        let p = self.params;
        let half = p.block_size / 2;

        let mut scores = vec![0f32; width * height];
        ctx.for_each_row(&mut scores, width, |r, row| {
            for (c, score) in row.iter_mut().enumerate() {
                let outside = r < half || c < half || r + half >= height || c + half >= width;
                if p.border_undefined && outside {
                    *score = 0.0;
                    continue;
                }
                let (mut gx2, mut gy2, mut gxgy) = (0f32, 0f32, 0f32);
                for wr in (pad.top + r - half)..=(pad.top + r + half) {
                    for wc in (pad.left + c - half)..=(pad.left + c + half) {
                        let x = gx[wr * pcol + wc] as f32 * p.norm_factor;
                        let y = gy[wr * pcol + wc] as f32 * p.norm_factor;
                        gx2 += x * x;
                        gy2 += y * y;
                        gxgy += x * y;
                    }
                }
                let trace = gx2 + gy2;
                let det = gx2 * gy2 - gxgy * gxgy;
                let mc = det - p.sensitivity * trace * trace;
                *score = if mc > p.threshold { mc } else { 0.0 };
            }
        });

        self.output.copy_from_slice(&scores)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, TensorInfo};

    fn padded_grad(shape: &Shape, values: &[i32], pad: usize) -> Tensor {
        let t = Tensor::new(TensorInfo::new(shape.clone(), DType::I32).with_padding(BorderSize::uniform(pad)));
        t.allocate_owned().unwrap();
        t.copy_from_slice(values).unwrap();
        t
    }

    fn params(threshold: f32, border_undefined: bool) -> HarrisScoreParams {
        HarrisScoreParams {
            norm_factor: 1.0 / 255.0,
            sensitivity: 0.04,
            threshold,
            block_size: 3,
            border_undefined,
        }
    }

    #[test]
    fn test_isotropic_gradient_scores_positive() {
        let shape = Shape::matrix(3, 3);
        let mut gx = vec![0; 9];
        let mut gy = vec![0; 9];
        // Orthogonal gradients at two pixels give a full-rank structure tensor.
        gx[3] = 255;
        gy[1] = 255;
        let gx = padded_grad(&shape, &gx, 1);
        let gy = padded_grad(&shape, &gy, 1);
        let out = Tensor::zeros(shape, DType::F32).unwrap();

        HarrisScoreKernel::configure(&gx, &gy, &out, params(0.0, false))
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        let scores = out.to_vec::<f32>().unwrap();
        // Centre window sees gx2 = gy2 = 1, gxgy = 0: det 1 - 0.04 * 4.
        assert!((scores[4] - 0.84).abs() < 1e-6);
    }

    #[test]
    fn test_edge_only_is_suppressed() {
        let shape = Shape::matrix(3, 3);
        let gx = padded_grad(&shape, &[100; 9], 1);
        let gy = padded_grad(&shape, &[0; 9], 1);
        let out = Tensor::zeros(shape, DType::F32).unwrap();
        HarrisScoreKernel::configure(&gx, &gy, &out, params(0.0, false))
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        // Rank-1 structure tensor: det 0, response negative.
        assert_eq!(out.to_vec::<f32>().unwrap()[4], 0.0);
    }

    #[test]
    fn test_undefined_border_zeroes_rim() {
        let shape = Shape::matrix(4, 4);
        let mut gxv = vec![0; 16];
        let mut gyv = vec![0; 16];
        gxv[0] = 255;
        gyv[1] = 255;
        let gx = padded_grad(&shape, &gxv, 1);
        let gy = padded_grad(&shape, &gyv, 1);
        let out = Tensor::zeros(shape, DType::F32).unwrap();
        HarrisScoreKernel::configure(&gx, &gy, &out, params(0.0, true))
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        let scores = out.to_vec::<f32>().unwrap();
        assert_eq!(scores[0], 0.0);
        assert!(scores[5] > 0.0);
    }

    #[test]
    fn test_requires_padding() {
        let shape = Shape::matrix(3, 3);
        let gx = Tensor::zeros(shape.clone(), DType::I32).unwrap();
        let out = Tensor::zeros(shape, DType::F32).unwrap();
        assert!(HarrisScoreKernel::configure(&gx, &gx, &out, params(0.0, false)).is_err());
    }
}
