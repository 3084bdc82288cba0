// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Harris corner detection as a composite function.
//!
//! ```text
//! input ─► sobel ─► gx, gy ─► fill border ─► harris score ─► score
//!                                                              │
//!   corners ◄─ sort by distance ◄─ candidates ◄─ 3x3 NMS ◄─────┘
//! ```
//!
//! Every intermediate is managed by the function's memory group, so
//! `gx`/`gy` can share bytes with `suppressed`/`candidates` once their
//! lifetimes end.

use crate::function::run_scoped;
use crate::{Function, MemoryPlan, RunMetrics, RuntimeError};
use kernels::{
    CornerCandidatesKernel, ExecutionContext, FillBorderKernel, HarrisScoreKernel, HarrisScoreParams, Kernel,
    NonMaximaSuppression3x3Kernel, SobelKernel, SortEuclideanDistanceKernel,
};
use memory_manager::MemoryGroup;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tensor_core::{BorderMode, BorderSize, DType, KeyPointArray, Shape, Tensor, TensorInfo};
use tracing::{debug, info};

/// User-facing Harris parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarrisParams {
    /// Minimum response a pixel needs to be a candidate.
    pub threshold: f32,
    /// Radius inside which only the strongest corner survives.
    pub min_dist: f32,
    /// The `k` of `det - k * trace²`, in `(0, 0.25)`.
    pub sensitivity: f32,
    /// Sobel size: 3, 5 or 7.
    pub gradient_size: usize,
    /// Structure-tensor window: 3, 5 or 7.
    pub block_size: usize,
    pub border_mode: BorderMode,
}

impl Default for HarrisParams {
    fn default() -> Self {
        Self {
            threshold: 1e-5,
            min_dist: 5.0,
            sensitivity: 0.04,
            gradient_size: 3,
            block_size: 3,
            border_mode: BorderMode::Undefined,
        }
    }
}

impl HarrisParams {
    /// `1 / (255 * 4^(gradient_size / 2) * block_size)`.
    pub fn norm_factor(&self) -> f32 {
        let scale = 4f32.powi((self.gradient_size / 2) as i32);
        1.0 / (255.0 * scale * self.block_size as f32)
    }
}

/// Configured Harris corner detector.
#[derive(Debug)]
pub struct HarrisCorners {
    ctx: ExecutionContext,
    group: MemoryGroup,
    gx: Tensor,
    gy: Tensor,
    score: Tensor,
    suppressed: Tensor,
    candidates: Tensor,
    num_candidates: Arc<AtomicUsize>,
    corners: KeyPointArray,
    kernels: Vec<Kernel>,
    last_run: Option<RunMetrics>,
}

impl HarrisCorners {
    pub const NAME: &'static str = "harris_corners";

    /// Checks the arguments without creating anything.
    pub fn validate(input: &Tensor, params: &HarrisParams) -> Result<(), RuntimeError> {
        let fail = |detail: String| Err::<(), _>(RuntimeError::invalid(Self::NAME, detail));
        if input.dtype() != DType::U8 || input.shape().rank() != 2 || input.shape().num_elements() == 0 {
            return fail(format!("input must be a non-empty rank-2 u8 image, got {} {}", input.dtype(), input.shape()));
        }
        if !matches!(params.gradient_size, 3 | 5 | 7) {
            return fail(format!("gradient_size must be 3, 5 or 7, got {}", params.gradient_size));
        }
        if !matches!(params.block_size, 3 | 5 | 7) {
            return fail(format!("block_size must be 3, 5 or 7, got {}", params.block_size));
        }
        if !(params.sensitivity > 0.0 && params.sensitivity < 0.25) {
            return fail(format!("sensitivity must be in (0, 0.25), got {}", params.sensitivity));
        }
        if !params.threshold.is_finite() || params.threshold < 0.0 {
            return fail(format!("threshold must be finite and >= 0, got {}", params.threshold));
        }
        if !params.min_dist.is_finite() || params.min_dist < 0.0 {
            return fail(format!("min_dist must be finite and >= 0, got {}", params.min_dist));
        }
        Ok(())
    }

    /// Validates, creates and manages the intermediates, and wires the
    /// kernels. Detected corners are written to `corners` on every run.
    pub fn configure(
        ctx: &ExecutionContext,
        mut group: MemoryGroup,
        input: &Tensor,
        params: HarrisParams,
        corners: &KeyPointArray,
    ) -> Result<Self, RuntimeError> {
        Self::validate(input, &params)?;
        let shape = input.shape().clone();
        let (height, width) = (shape.rows(), shape.cols());
        let reach = BorderSize::uniform(params.block_size / 2);

        let gradient = TensorInfo::new(shape.clone(), DType::I32).with_padding(reach);
        let gx = Tensor::new(gradient.clone());
        let gy = Tensor::new(gradient);
        let score = Tensor::new(TensorInfo::new(shape.clone(), DType::F32));
        let suppressed = Tensor::new(TensorInfo::new(shape.clone(), DType::F32));
        let candidates = Tensor::new(TensorInfo::new(Shape::matrix(height * width, 3), DType::F32));
        let num_candidates = Arc::new(AtomicUsize::new(0));

        group.manage(&gx)?;
        group.manage(&gy)?;
        let sobel = SobelKernel::configure(input, &gx, &gy, params.gradient_size, params.border_mode)?;

        group.manage(&score)?;
        let score_params = HarrisScoreParams {
            norm_factor: params.norm_factor(),
            sensitivity: params.sensitivity,
            threshold: params.threshold,
            block_size: params.block_size,
            border_undefined: !params.border_mode.is_defined(),
        };
        let harris = HarrisScoreKernel::configure(&gx, &gy, &score, score_params)?;
        let border_gx = FillBorderKernel::configure(&gx, harris.border_size(), params.border_mode)?;
        let border_gy = FillBorderKernel::configure(&gy, harris.border_size(), params.border_mode)?;
        group.allocate(&gx)?;
        group.allocate(&gy)?;

        group.manage(&suppressed)?;
        let non_maxima = NonMaximaSuppression3x3Kernel::configure(&score, &suppressed)?;
        group.allocate(&score)?;

        group.manage(&candidates)?;
        let corner_candidates = CornerCandidatesKernel::configure(&suppressed, &candidates, Arc::clone(&num_candidates))?;
        group.allocate(&suppressed)?;

        let sort = SortEuclideanDistanceKernel::configure(&candidates, corners, Arc::clone(&num_candidates), params.min_dist)?;
        group.allocate(&candidates)?;

        let kernels = vec![
            sobel.into(),
            border_gx.into(),
            border_gy.into(),
            harris.into(),
            non_maxima.into(),
            corner_candidates.into(),
            sort.into(),
        ];

        info!(
            width,
            height,
            gradient_size = params.gradient_size,
            block_size = params.block_size,
            border = %params.border_mode,
            group = %group.id(),
            "configured harris corners"
        );
        Ok(Self {
            ctx: ctx.clone(),
            group,
            gx,
            gy,
            score,
            suppressed,
            candidates,
            num_candidates,
            corners: corners.clone(),
            kernels,
            last_run: None,
        })
    }

    /// The output array this function writes to.
    pub fn corners(&self) -> &KeyPointArray {
        &self.corners
    }

    /// Candidates found by the last run, before distance suppression.
    pub fn num_candidates(&self) -> usize {
        self.num_candidates.load(Ordering::Acquire)
    }

    /// Kernel names of the last run, in execution order.
    pub fn stages(&self) -> Vec<&'static str> {
        self.last_run.as_ref().map(RunMetrics::stage_names).unwrap_or_default()
    }

    pub fn last_run(&self) -> Option<&RunMetrics> {
        self.last_run.as_ref()
    }

    pub fn memory_group(&self) -> &MemoryGroup {
        &self.group
    }

    /// Where each intermediate lives in the pool.
    pub fn memory_plan(&self) -> Result<MemoryPlan, RuntimeError> {
        MemoryPlan::for_group(
            &self.group,
            &[
                ("gx", &self.gx),
                ("gy", &self.gy),
                ("score", &self.score),
                ("suppressed", &self.suppressed),
                ("candidates", &self.candidates),
            ],
        )
    }
}

impl Function for HarrisCorners {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self) -> Result<RunMetrics, RuntimeError> {
        self.num_candidates.store(0, Ordering::Release);
        let metrics = run_scoped(Self::NAME, &mut self.group, &self.kernels, &self.ctx)?;
        debug!(
            candidates = self.num_candidates(),
            corners = self.corners.len(),
            overflowed = self.corners.has_overflowed(),
            "harris corners done"
        );
        self.last_run = Some(metrics.clone());
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_manager::{LifetimeStrategy, MemoryManager};

    fn square_image(size: usize) -> Tensor {
        let mut pixels = vec![0u8; size * size];
        for r in size / 4..3 * size / 4 {
            for c in size / 4..3 * size / 4 {
                pixels[r * size + c] = 255;
            }
        }
        Tensor::from_slice(Shape::matrix(size, size), &pixels).unwrap()
    }

    #[test]
    fn test_norm_factor() {
        let p = HarrisParams {
            gradient_size: 5,
            block_size: 7,
            ..Default::default()
        };
        assert!((p.norm_factor() - 1.0 / (255.0 * 16.0 * 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let image = square_image(16);
        let ok = HarrisParams::default();
        HarrisCorners::validate(&image, &ok).unwrap();

        let cases = [
            HarrisParams { gradient_size: 4, ..ok },
            HarrisParams { block_size: 9, ..ok },
            HarrisParams { sensitivity: 0.25, ..ok },
            HarrisParams { sensitivity: 0.0, ..ok },
            HarrisParams { threshold: -1.0, ..ok },
            HarrisParams { min_dist: f32::NAN, ..ok },
        ];
        for params in cases {
            assert!(matches!(
                HarrisCorners::validate(&image, &params),
                Err(RuntimeError::InvalidConfiguration { function: "harris_corners", .. })
            ));
        }

        let wrong_type = Tensor::zeros(Shape::matrix(16, 16), DType::F32).unwrap();
        assert!(HarrisCorners::validate(&wrong_type, &ok).is_err());
    }

    #[test]
    fn test_failed_configure_leaves_manager_clean() {
        let manager = Arc::new(MemoryManager::new(LifetimeStrategy::Offset));
        let image = square_image(16);
        let params = HarrisParams {
            block_size: 4,
            ..Default::default()
        };
        let result = HarrisCorners::configure(
            &ExecutionContext::single_threaded(),
            MemoryGroup::new(Some(Arc::clone(&manager))),
            &image,
            params,
            &KeyPointArray::new(16),
        );
        assert!(result.is_err());
        assert!(manager.lifetime_manager().are_all_finalized());
    }

    #[test]
    fn test_detects_square_corners() {
        let manager = Arc::new(MemoryManager::new(LifetimeStrategy::Offset));
        let image = square_image(32);
        let corners = KeyPointArray::new(64);
        let mut harris = HarrisCorners::configure(
            &ExecutionContext::single_threaded(),
            MemoryGroup::new(Some(Arc::clone(&manager))),
            &image,
            HarrisParams::default(),
            &corners,
        )
        .unwrap();
        harris.run().unwrap();

        let found = corners.to_vec();
        assert!(!found.is_empty());
        for (x, y) in [(8, 8), (23, 8), (8, 23), (23, 23)] {
            assert!(
                found.iter().any(|k| (k.x - x).abs() <= 2 && (k.y - y).abs() <= 2),
                "no corner near ({x}, {y}) in {found:?}"
            );
        }
        assert!(harris.num_candidates() >= found.len());
        // The pool was auto-populated for the run and cleared afterwards.
        assert_eq!(manager.pool_manager().num_pools(), 0);
    }

    #[test]
    fn test_stage_order() {
        let image = square_image(16);
        let mut harris = HarrisCorners::configure(
            &ExecutionContext::single_threaded(),
            MemoryGroup::new(None),
            &image,
            HarrisParams::default(),
            &KeyPointArray::new(16),
        )
        .unwrap();
        assert!(harris.stages().is_empty());
        harris.run().unwrap();
        assert_eq!(
            harris.stages(),
            vec![
                "sobel",
                "fill_border",
                "fill_border",
                "harris_score",
                "non_maxima_suppression_3x3",
                "corner_candidates",
                "sort_euclidean_distance",
            ]
        );
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let image = Tensor::from_slice(Shape::matrix(12, 12), &[90u8; 144]).unwrap();
        let corners = KeyPointArray::new(8);
        let mut harris = HarrisCorners::configure(
            &ExecutionContext::single_threaded(),
            MemoryGroup::new(None),
            &image,
            HarrisParams {
                border_mode: BorderMode::Replicate,
                ..Default::default()
            },
            &corners,
        )
        .unwrap();
        harris.run().unwrap();
        assert!(corners.is_empty());
        assert_eq!(harris.num_candidates(), 0);
    }
}
