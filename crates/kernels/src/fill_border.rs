// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fills the padding around a tensor's valid region.

use crate::{ExecutionContext, KernelError};
use tensor_core::{BorderMode, BorderSize, DType, Element, Tensor};

/// Writes `border` elements of padding on each side according to a
/// [`BorderMode`]. Under `Undefined` the padding is left as it is.
#[derive(Debug, Clone)]
pub struct FillBorderKernel {
    tensor: Tensor,
    border: BorderSize,
    mode: BorderMode,
}

impl FillBorderKernel {
    pub const NAME: &'static str = "fill_border";

    pub fn configure(tensor: &Tensor, border: BorderSize, mode: BorderMode) -> Result<Self, KernelError> {
        let padding = tensor.info().padding();
        if !padding.covers(&border) {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("border {border} exceeds the tensor padding {padding}"),
            ));
        }
        Ok(Self {
            tensor: tensor.clone(),
            border,
            mode,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        if matches!(self.mode, BorderMode::Undefined) || self.border.is_empty() {
            return Ok(());
        }
        match self.tensor.dtype() {
            DType::U8 => self.fill::<u8>(ctx),
            DType::I32 => self.fill::<i32>(ctx),
            DType::F32 => self.fill::<f32>(ctx),
        }
    }

    fn fill<T: Element>(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let info = self.tensor.info();
        let (rows, cols) = (info.shape().rows(), info.shape().cols());
        let (prow, pcol) = (info.padded_rows(), info.padded_cols());
        let pad = info.padding();
        let border = self.border;
        let mode = self.mode;

        let mut all = self.tensor.read_all::<T>()?;
        let src = all.clone();

        // Stored coordinates of the valid region and of the area to fill.
        let (top, left) = (pad.top, pad.left);
        let row_lo = top - border.top;
        let row_hi = top + rows + border.bottom;
        let col_lo = left - border.left;
        let col_hi = left + cols + border.right;

        ctx.for_each_row(&mut all, pcol, |global_row, row| {
            let plane = global_row / prow;
            let r = global_row % prow;
            if r < row_lo || r >= row_hi {
                return;
            }
            let src_row = r.clamp(top, top + rows - 1);
            let base = plane * prow * pcol + src_row * pcol;
            let row_inside = r >= top && r < top + rows;
            for (c, value) in row.iter_mut().enumerate().take(col_hi).skip(col_lo) {
                if row_inside && c >= left && c < left + cols {
                    continue;
                }
                *value = match mode {
                    BorderMode::Constant(v) => T::from_u8(v),
                    _ => src[base + c.clamp(left, left + cols - 1)],
                };
            }
        });

        self.tensor.write_all(&all)?;
        Ok(())
    }
}
