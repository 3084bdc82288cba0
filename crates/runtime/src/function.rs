// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The composite-function interface and its closed set of implementors.

use crate::{Gemm, HarrisCorners, RunMetrics, RuntimeError};
use kernels::{ExecutionContext, Kernel};
use memory_manager::MemoryGroup;
use std::time::Instant;
use tracing::debug;

/// A configured composite function.
///
/// Construction is the configure step; a value of an implementing type is
/// always fully wired.
pub trait Function {
    fn name(&self) -> &'static str;

    /// One-time work that must precede the first run. Idempotent.
    fn prepare(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Prepares if needed, then runs every kernel in order with the
    /// function's intermediates bound.
    fn run(&mut self) -> Result<RunMetrics, RuntimeError>;
}

/// Dispatch over every composite function.
#[derive(Debug)]
pub enum Operator {
    HarrisCorners(HarrisCorners),
    Gemm(Gemm),
}

impl Function for Operator {
    fn name(&self) -> &'static str {
        match self {
            Operator::HarrisCorners(f) => f.name(),
            Operator::Gemm(f) => f.name(),
        }
    }

    fn prepare(&mut self) -> Result<(), RuntimeError> {
        match self {
            Operator::HarrisCorners(f) => f.prepare(),
            Operator::Gemm(f) => f.prepare(),
        }
    }

    fn run(&mut self) -> Result<RunMetrics, RuntimeError> {
        match self {
            Operator::HarrisCorners(f) => f.run(),
            Operator::Gemm(f) => f.run(),
        }
    }
}

impl From<HarrisCorners> for Operator {
    fn from(f: HarrisCorners) -> Self {
        Operator::HarrisCorners(f)
    }
}

impl From<Gemm> for Operator {
    fn from(f: Gemm) -> Self {
        Operator::Gemm(f)
    }
}

/// Runs `kernels` back to back inside an acquire/release scope of `group`.
///
/// The scope is released explicitly so a release failure surfaces as an
/// error instead of a log line.
pub(crate) fn run_scoped(
    function: &'static str,
    group: &mut MemoryGroup,
    kernels: &[Kernel],
    ctx: &ExecutionContext,
) -> Result<RunMetrics, RuntimeError> {
    let start = Instant::now();
    let mut metrics = RunMetrics::new(function, ctx.num_threads());

    let scope = group.scope()?;
    for kernel in kernels {
        let stage_start = Instant::now();
        kernel.run(ctx)?;
        metrics.record_stage(kernel.name(), stage_start.elapsed());
    }
    scope.release()?;

    metrics.finalise(start.elapsed());
    debug!("{}", metrics.summary());
    Ok(metrics)
}
