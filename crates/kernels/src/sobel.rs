// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sobel gradients (3x3, 5x5, 7x7).
//!
//! The NxN operators are separable: `gx` is the derivative row applied
//! horizontally times the smoothing row applied vertically, `gy` the other
//! way round. Pixels outside the image are answered by the border mode;
//! under [`BorderMode::Undefined`] any output whose window leaves the image
//! is 0.

use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderMode, BorderSize, DType, Tensor};

const SMOOTH_3: [i32; 3] = [1, 2, 1];
const DERIV_3: [i32; 3] = [-1, 0, 1];
const SMOOTH_5: [i32; 5] = [1, 4, 6, 4, 1];
const DERIV_5: [i32; 5] = [-1, -2, 0, 2, 1];
const SMOOTH_7: [i32; 7] = [1, 6, 15, 20, 15, 6, 1];
const DERIV_7: [i32; 7] = [-1, -4, -5, 0, 5, 4, 1];

/// Returns the (smoothing, derivative) rows for a supported size.
pub(crate) fn coefficients(gradient_size: usize) -> Option<(&'static [i32], &'static [i32])> {
    match gradient_size {
        3 => Some((&SMOOTH_3, &DERIV_3)),
        5 => Some((&SMOOTH_5, &DERIV_5)),
        7 => Some((&SMOOTH_7, &DERIV_7)),
        _ => None,
    }
}

/// Reads pixel `(r, c)` of a `height x width` image, consulting `mode`
/// outside of it. `None` means the value is undefined.
pub(crate) fn sample(image: &[u8], width: usize, height: usize, r: isize, c: isize, mode: BorderMode) -> Option<i32> {
    let inside = r >= 0 && c >= 0 && (r as usize) < height && (c as usize) < width;
    if inside {
        return Some(i32::from(image[r as usize * width + c as usize]));
    }
    match mode {
        BorderMode::Undefined => None,
        BorderMode::Constant(v) => Some(i32::from(v)),
        BorderMode::Replicate => {
            let rr = r.clamp(0, height as isize - 1) as usize;
            let cc = c.clamp(0, width as isize - 1) as usize;
            Some(i32::from(image[rr * width + cc]))
        }
    }
}

#[derive(Debug, Clone)]
pub struct SobelKernel {
    input: Tensor,
    gx: Tensor,
    gy: Tensor,
    gradient_size: usize,
    border_mode: BorderMode,
}

impl SobelKernel {
    pub const NAME: &'static str = "sobel";

    /// `input` is a U8 `[height, width]` image; `gx` and `gy` are I32
    /// tensors of the same shape (they may be padded).
    pub fn configure(
        input: &Tensor,
        gx: &Tensor,
        gy: &Tensor,
        gradient_size: usize,
        border_mode: BorderMode,
    ) -> Result<Self, KernelError> {
        if coefficients(gradient_size).is_none() {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("gradient size must be 3, 5 or 7, got {gradient_size}"),
            ));
        }
        if input.dtype() != DType::U8 || input.shape().rank() != 2 {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("input must be a rank-2 u8 image, got {} {}", input.dtype(), input.shape()),
            ));
        }
        for out in [gx, gy] {
            if out.dtype() != DType::I32 || out.shape() != input.shape() {
                return Err(KernelError::invalid(
                    Self::NAME,
                    format!("gradients must be i32 {}, got {} {}", input.shape(), out.dtype(), out.shape()),
                ));
            }
        }
        Ok(Self {
            input: input.clone(),
            gx: gx.clone(),
            gy: gy.clone(),
            gradient_size,
            border_mode,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::uniform(self.gradient_size / 2)
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let (height, width) = (self.input.shape().rows(), self.input.shape().cols());
        let image = self.input.to_vec::<u8>()?;
        let (smooth, deriv) = coefficients(self.gradient_size)
            .ok_or_else(|| KernelError::invalid(Self::NAME, "unsupported gradient size"))?;
        let half = (self.gradient_size / 2) as isize;
        let mode = self.border_mode;

        let mut out = vec![[0i32; 2]; width * height];
        ctx.for_each_row(&mut out, width, |r, row| {
            'pixel: for (c, px) in row.iter_mut().enumerate() {
                let (mut sx, mut sy) = (0i32, 0i32);
                for (i, (&si, &di)) in smooth.iter().zip(deriv).enumerate() {
                    let rr = r as isize + i as isize - half;
                    for (j, (&sj, &dj)) in smooth.iter().zip(deriv).enumerate() {
                        let cc = c as isize + j as isize - half;
                        let Some(v) = sample(&image, width, height, rr, cc, mode) else {
                            *px = [0, 0];
                            continue 'pixel;
                        };
                        sx += si * dj * v;
                        sy += di * sj * v;
                    }
                }
                *px = [sx, sy];
            }
        });

        let gx: Vec<i32> = out.iter().map(|p| p[0]).collect();
        let gy: Vec<i32> = out.iter().map(|p| p[1]).collect();
        self.gx.copy_from_slice(&gx)?;
        self.gy.copy_from_slice(&gy)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, TensorInfo};

    fn grads(shape: &Shape) -> (Tensor, Tensor) {
        let gx = Tensor::zeros(shape.clone(), DType::I32).unwrap();
        let gy = Tensor::zeros(shape.clone(), DType::I32).unwrap();
        (gx, gy)
    }

    #[test]
    fn test_vertical_edge_3x3() {
        // Left half 0, right half 100.
        let shape = Shape::matrix(5, 6);
        let pixels: Vec<u8> = (0..30).map(|i| if i % 6 >= 3 { 100 } else { 0 }).collect();
        let input = Tensor::from_slice(shape.clone(), &pixels).unwrap();
        let (gx, gy) = grads(&shape);

        let k = SobelKernel::configure(&input, &gx, &gy, 3, BorderMode::Replicate).unwrap();
        k.run(&ExecutionContext::single_threaded()).unwrap();

        let gx = gx.to_vec::<i32>().unwrap();
        let gy = gy.to_vec::<i32>().unwrap();
        // Columns 2 and 3 straddle the edge: (1 + 2 + 1) * 100.
        assert_eq!(gx[2 * 6 + 2], 400);
        assert_eq!(gx[2 * 6 + 3], 400);
        assert_eq!(gx[2 * 6 + 0], 0);
        assert!(gy.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_undefined_border_zeroes_edges() {
        let shape = Shape::matrix(6, 6);
        let input = Tensor::from_slice(shape.clone(), &[9u8; 36]).unwrap();
        let (gx, gy) = grads(&shape);
        gx.fill(7i32).unwrap();

        let k = SobelKernel::configure(&input, &gx, &gy, 5, BorderMode::Undefined).unwrap();
        k.run(&ExecutionContext::single_threaded()).unwrap();
        // Flat image: every defined gradient is 0 as well.
        assert!(gx.to_vec::<i32>().unwrap().iter().all(|&v| v == 0));
        assert_eq!(k.border_size(), BorderSize::uniform(2));
    }

    #[test]
    fn test_constant_border_creates_edge_response() {
        let shape = Shape::matrix(3, 3);
        let input = Tensor::from_slice(shape.clone(), &[10u8; 9]).unwrap();
        let (gx, gy) = grads(&shape);
        SobelKernel::configure(&input, &gx, &gy, 3, BorderMode::Constant(0))
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        let gx = gx.to_vec::<i32>().unwrap();
        // Centre pixel is surrounded by the image only.
        assert_eq!(gx[4], 0);
        // Left column sees the zero border on its left.
        assert_eq!(gx[3], 40);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let shape = Shape::matrix(4, 4);
        let input = Tensor::new(TensorInfo::new(shape.clone(), DType::U8));
        let (gx, gy) = grads(&shape);
        assert!(SobelKernel::configure(&input, &gx, &gy, 4, BorderMode::Undefined).is_err());
        let wrong = Tensor::new(TensorInfo::new(shape, DType::F32));
        assert!(SobelKernel::configure(&input, &wrong, &gy, 3, BorderMode::Undefined).is_err());
    }
}
