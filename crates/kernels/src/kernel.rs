// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The closed set of kernels, dispatched by enum.

use crate::corner_candidates::CornerCandidatesKernel;
use crate::fill_border::FillBorderKernel;
use crate::gemm::{
    GemmInterleave4x4Kernel, GemmMatrixAdditionKernel, GemmMatrixMultiplyKernel, GemmTranspose1xWKernel,
};
use crate::harris_score::HarrisScoreKernel;
use crate::non_maxima::NonMaximaSuppression3x3Kernel;
use crate::sobel::SobelKernel;
use crate::sort_euclidean::SortEuclideanDistanceKernel;
use crate::{ExecutionContext, KernelError};
use tensor_core::BorderSize;
use tracing::trace;

/// A configured kernel.
#[derive(Debug, Clone)]
pub enum Kernel {
    Sobel(SobelKernel),
    FillBorder(FillBorderKernel),
    HarrisScore(HarrisScoreKernel),
    NonMaxima(NonMaximaSuppression3x3Kernel),
    CornerCandidates(CornerCandidatesKernel),
    SortEuclidean(SortEuclideanDistanceKernel),
    GemmInterleave4x4(GemmInterleave4x4Kernel),
    GemmTranspose1xW(GemmTranspose1xWKernel),
    GemmMatrixMultiply(GemmMatrixMultiplyKernel),
    GemmMatrixAddition(GemmMatrixAdditionKernel),
}

macro_rules! dispatch {
    ($self:expr, $k:ident => $body:expr) => {
        match $self {
            Kernel::Sobel($k) => $body,
            Kernel::FillBorder($k) => $body,
            Kernel::HarrisScore($k) => $body,
            Kernel::NonMaxima($k) => $body,
            Kernel::CornerCandidates($k) => $body,
            Kernel::SortEuclidean($k) => $body,
            Kernel::GemmInterleave4x4($k) => $body,
            Kernel::GemmTranspose1xW($k) => $body,
            Kernel::GemmMatrixMultiply($k) => $body,
            Kernel::GemmMatrixAddition($k) => $body,
        }
    };
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Sobel(_) => SobelKernel::NAME,
            Kernel::FillBorder(_) => FillBorderKernel::NAME,
            Kernel::HarrisScore(_) => HarrisScoreKernel::NAME,
            Kernel::NonMaxima(_) => NonMaximaSuppression3x3Kernel::NAME,
            Kernel::CornerCandidates(_) => CornerCandidatesKernel::NAME,
            Kernel::SortEuclidean(_) => SortEuclideanDistanceKernel::NAME,
            Kernel::GemmInterleave4x4(_) => GemmInterleave4x4Kernel::NAME,
            Kernel::GemmTranspose1xW(_) => GemmTranspose1xWKernel::NAME,
            Kernel::GemmMatrixMultiply(_) => GemmMatrixMultiplyKernel::NAME,
            Kernel::GemmMatrixAddition(_) => GemmMatrixAdditionKernel::NAME,
        }
    }

    /// How far outside an output element the kernel reads.
    pub fn border_size(&self) -> BorderSize {
        dispatch!(self, k => k.border_size())
    }

    /// Runs the kernel to completion on `ctx`.
    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        trace!(kernel = self.name(), threads = ctx.num_threads(), "running kernel");
        dispatch!(self, k => k.run(ctx))
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Kernel {
            fn from(k: $ty) -> Self {
                Kernel::$variant(k)
            }
        })*
    };
}

impl_from!(
    Sobel(SobelKernel),
    FillBorder(FillBorderKernel),
    HarrisScore(HarrisScoreKernel),
    NonMaxima(NonMaximaSuppression3x3Kernel),
    CornerCandidates(CornerCandidatesKernel),
    SortEuclidean(SortEuclideanDistanceKernel),
    GemmInterleave4x4(GemmInterleave4x4Kernel),
    GemmTranspose1xW(GemmTranspose1xWKernel),
    GemmMatrixMultiply(GemmMatrixMultiplyKernel),
    GemmMatrixAddition(GemmMatrixAdditionKernel),
);
