// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! General matrix multiply: `d = alpha * a * b + beta * c`.
//!
//! For more than one row of `a`, both operands are reshaped first so the
//! multiply walks contiguous memory: `a` interleaved 4x4 into a pooled
//! intermediate, `b` transposed in 1x4 blocks. When `b` is constant across
//! runs it can be reshaped once in [`Function::prepare`] into storage
//! owned by the function instead of the pool.

use crate::function::run_scoped;
use crate::{Function, RunMetrics, RuntimeError};
use kernels::gemm::{interleaved_shape, transposed_shape};
use kernels::{
    ExecutionContext, GemmInterleave4x4Kernel, GemmMatrixAdditionKernel, GemmMatrixMultiplyKernel,
    GemmTranspose1xWKernel, Kernel,
};
use memory_manager::MemoryGroup;
use tensor_core::{DType, Tensor, TensorInfo};
use tracing::{debug, info};

/// Reshaping options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GemmInfo {
    /// `b` does not change between runs: reshape it once in `prepare()`.
    pub reshape_b_only_on_first_run: bool,
}

/// Configured GEMM.
#[derive(Debug)]
pub struct Gemm {
    ctx: ExecutionContext,
    group: MemoryGroup,
    /// Reshape of `b` that runs once, before the first run.
    prepare_kernel: Option<Kernel>,
    kernels: Vec<Kernel>,
    tmp_a: Option<Tensor>,
    tmp_b: Option<Tensor>,
    prepared: bool,
    last_run: Option<RunMetrics>,
}

impl Gemm {
    pub const NAME: &'static str = "gemm";

    /// Checks the arguments without creating anything.
    pub fn validate(
        a: &Tensor,
        b: &Tensor,
        c: Option<&Tensor>,
        d: &Tensor,
        alpha: f32,
        beta: f32,
    ) -> Result<(), RuntimeError> {
        for (name, t) in [("a", a), ("b", b), ("d", d)].into_iter().chain(c.map(|c| ("c", c))) {
            if t.dtype() != DType::F32 || t.shape().rank() != 2 || t.shape().num_elements() == 0 {
                return Err(RuntimeError::invalid(
                    Self::NAME,
                    format!("{name} must be a non-empty rank-2 f32 matrix, got {} {}", t.dtype(), t.shape()),
                ));
            }
        }
        if !a.shape().is_matmul_compatible(b.shape()) {
            return Err(RuntimeError::invalid(
                Self::NAME,
                format!("a {} and b {} are not multipliable", a.shape(), b.shape()),
            ));
        }
        let (m, n) = (a.shape().rows(), b.shape().cols());
        if d.shape().dims() != [m, n] {
            return Err(RuntimeError::invalid(
                Self::NAME,
                format!("d must be [{m}, {n}], got {}", d.shape()),
            ));
        }
        if let Some(c) = c {
            if c.shape() != d.shape() {
                return Err(RuntimeError::invalid(
                    Self::NAME,
                    format!("c {} must match d {}", c.shape(), d.shape()),
                ));
            }
        }
        if !alpha.is_finite() || !beta.is_finite() {
            return Err(RuntimeError::invalid(Self::NAME, "alpha and beta must be finite"));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn configure(
        ctx: &ExecutionContext,
        mut group: MemoryGroup,
        a: &Tensor,
        b: &Tensor,
        c: Option<&Tensor>,
        d: &Tensor,
        alpha: f32,
        beta: f32,
        info: GemmInfo,
    ) -> Result<Self, RuntimeError> {
        Self::validate(a, b, c, d, alpha, beta)?;
        let (m, k, n) = (a.shape().rows(), a.shape().cols(), b.shape().cols());

        let mut kernels: Vec<Kernel> = Vec::with_capacity(4);
        let mut prepare_kernel = None;
        let (tmp_a, tmp_b) = if m == 1 {
            // A single row gains nothing from reshaping.
            kernels.push(GemmMatrixMultiplyKernel::configure(a, b, d, alpha, false)?.into());
            (None, None)
        } else {
            let tmp_a = Tensor::new(TensorInfo::new(interleaved_shape(m, k), DType::F32));
            let tmp_b = Tensor::new(TensorInfo::new(transposed_shape(k, n), DType::F32));

            group.manage(&tmp_a)?;
            if !info.reshape_b_only_on_first_run {
                group.manage(&tmp_b)?;
            }
            let interleave = GemmInterleave4x4Kernel::configure(a, &tmp_a)?;
            let transpose = GemmTranspose1xWKernel::configure(b, &tmp_b)?;
            let multiply = GemmMatrixMultiplyKernel::configure(&tmp_a, &tmp_b, d, alpha, true)?;

            kernels.push(interleave.into());
            if info.reshape_b_only_on_first_run {
                prepare_kernel = Some(transpose.into());
            } else {
                kernels.push(transpose.into());
            }
            kernels.push(multiply.into());

            // An unmanaged tmp_b gets storage owned by the function.
            group.allocate(&tmp_a)?;
            group.allocate(&tmp_b)?;
            (Some(tmp_a), Some(tmp_b))
        };

        if let Some(c) = c.filter(|_| beta != 0.0) {
            kernels.push(GemmMatrixAdditionKernel::configure(c, d, beta)?.into());
        }

        info!(m, k, n, reshaped = m > 1, reshape_b_once = info.reshape_b_only_on_first_run, "configured gemm");
        Ok(Self {
            ctx: ctx.clone(),
            group,
            prepare_kernel,
            kernels,
            tmp_a,
            tmp_b,
            prepared: false,
            last_run: None,
        })
    }

    /// Whether the reshaped (interleave/transpose) path was selected.
    pub fn is_reshaped(&self) -> bool {
        self.tmp_a.is_some()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Reshaped `b`, if the reshaped path was selected.
    pub fn reshaped_b(&self) -> Option<&Tensor> {
        self.tmp_b.as_ref()
    }

    /// Kernel names of the last run, in execution order.
    pub fn stages(&self) -> Vec<&'static str> {
        self.last_run.as_ref().map(RunMetrics::stage_names).unwrap_or_default()
    }

    pub fn memory_group(&self) -> &MemoryGroup {
        &self.group
    }
}

impl Function for Gemm {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn prepare(&mut self) -> Result<(), RuntimeError> {
        if self.prepared {
            return Ok(());
        }
        if let Some(kernel) = &self.prepare_kernel {
            kernel.run(&self.ctx)?;
            debug!(kernel = kernel.name(), "reshaped b once");
        }
        self.prepared = true;
        Ok(())
    }

    fn run(&mut self) -> Result<RunMetrics, RuntimeError> {
        self.prepare()?;
        let metrics = run_scoped(Self::NAME, &mut self.group, &self.kernels, &self.ctx)?;
        self.last_run = Some(metrics.clone());
        Ok(metrics)
    }
}
