// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # kernels
//!
//! Portable reference kernels and the scheduler they run on.
//!
//! Every kernel follows the same two-phase shape: `configure` checks its
//! tensors and captures shared handles to them, `run` reads its inputs,
//! computes, and writes its outputs. Nothing is allocated at configure
//! time, so kernels can be wired before their tensors have storage.
//!
//! Kernels are grouped in the [`Kernel`] enum for dispatch by composite
//! functions. Row parallelism goes through an explicit
//! [`ExecutionContext`].

mod context;
mod corner_candidates;
mod error;
mod fill_border;
pub mod gemm;
mod harris_score;
mod kernel;
mod non_maxima;
mod sobel;
mod sort_euclidean;

pub use context::ExecutionContext;
pub use corner_candidates::CornerCandidatesKernel;
pub use error::KernelError;
pub use fill_border::FillBorderKernel;
pub use gemm::{GemmInterleave4x4Kernel, GemmMatrixAdditionKernel, GemmMatrixMultiplyKernel, GemmTranspose1xWKernel};
pub use harris_score::{HarrisScoreKernel, HarrisScoreParams};
pub use kernel::Kernel;
pub use non_maxima::NonMaximaSuppression3x3Kernel;
pub use sobel::SobelKernel;
pub use sort_euclidean::SortEuclideanDistanceKernel;
