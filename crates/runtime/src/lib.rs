// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Composite compute functions built from kernels, with their intermediates
//! drawn from shared memory pools.
//!
//! A composite function is configured once and run many times:
//! - `configure` validates its arguments, creates and manages its
//!   intermediate tensors, and wires its kernels. It is the constructor, so
//!   a half-configured function cannot exist.
//! - `prepare` does one-time work (e.g. reshaping a constant operand).
//! - `run` acquires pool memory for the intermediates, runs the kernels in
//!   a fixed order, and releases the memory again.
//!
//! Functions that share one [`memory_manager::MemoryManager`] time-share
//! the same pools, so the footprint is sized by the largest function rather
//! than the sum of all of them.
//!
//! # Functions
//! - [`HarrisCorners`] — Sobel, Harris score, non-maxima suppression and
//!   distance-based corner selection.
//! - [`Gemm`] — `alpha * a * b + beta * c` with operand reshaping.

mod config;
mod error;
mod function;
mod gemm;
mod harris;
mod metrics;
mod plan;
mod runtime;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use function::{Function, Operator};
pub use gemm::{Gemm, GemmInfo};
pub use harris::{HarrisCorners, HarrisParams};
pub use kernels::ExecutionContext;
pub use metrics::{RunMetrics, StageMetrics};
pub use plan::{MemoryPlan, PlanEntry};
pub use runtime::Runtime;
