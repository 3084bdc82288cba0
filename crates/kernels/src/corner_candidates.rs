// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collects non-zero responses into a candidate list.

use crate::{ExecutionContext, KernelError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tensor_core::{BorderSize, DType, Tensor};

/// Scans a response image in row-major order and writes one
/// `(x, y, strength)` row per non-zero value into `candidates`.
///
/// The number of candidates is published through a counter shared with
/// the kernel that consumes them.
#[derive(Debug, Clone)]
pub struct CornerCandidatesKernel {
    input: Tensor,
    candidates: Tensor,
    num_corners: Arc<AtomicUsize>,
}

impl CornerCandidatesKernel {
    pub const NAME: &'static str = "corner_candidates";

    /// `candidates` must be F32 `[height * width, 3]`.
    pub fn configure(input: &Tensor, candidates: &Tensor, num_corners: Arc<AtomicUsize>) -> Result<Self, KernelError> {
        if input.dtype() != DType::F32 || input.shape().rank() != 2 {
            return Err(KernelError::invalid(Self::NAME, "input must be a rank-2 f32 response"));
        }
        let capacity = input.shape().num_elements();
        if candidates.dtype() != DType::F32 || candidates.shape().dims() != [capacity, 3] {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("candidates must be f32 [{capacity}, 3], got {} {}", candidates.dtype(), candidates.shape()),
            ));
        }
        Ok(Self {
            input: input.clone(),
            candidates: candidates.clone(),
            num_corners,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    pub fn run(&self, ctx: &ExecutionContext) -> Result<(), KernelError> {
        let (height, width) = (self.input.shape().rows(), self.input.shape().cols());
        let v = self.input.to_vec::<f32>()?;

        let per_row = ctx.map_rows(height, |r| {
            v[r * width..(r + 1) * width]
                .iter()
                .enumerate()
                .filter(|&(_, &s)| s != 0.0)
                .map(|(c, &s)| [c as f32, r as f32, s])
                .collect::<Vec<_>>()
        });

        let mut out = vec![0f32; width * height * 3];
        let mut count = 0;
        for entry in per_row.into_iter().flatten() {
            out[count * 3..count * 3 + 3].copy_from_slice(&entry);
            count += 1;
        }
        self.candidates.copy_from_slice(&out)?;
        self.num_corners.store(count, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_row_major_order() {
        let mut v = vec![0.0f32; 12];
        v[7] = 2.0; // (x=3, y=1)
        v[1] = 1.0; // (x=1, y=0)
        v[8] = 3.0; // (x=0, y=2)
        let input = Tensor::from_slice(Shape::matrix(3, 4), &v).unwrap();
        let candidates = Tensor::zeros(Shape::matrix(12, 3), DType::F32).unwrap();
        let count = Arc::new(AtomicUsize::new(99));

        CornerCandidatesKernel::configure(&input, &candidates, Arc::clone(&count))
            .unwrap()
            .run(&ExecutionContext::new(2).unwrap())
            .unwrap();

        assert_eq!(count.load(Ordering::Acquire), 3);
        let c = candidates.to_vec::<f32>().unwrap();
        assert_eq!(&c[..9], &[1.0, 0.0, 1.0, 3.0, 1.0, 2.0, 0.0, 2.0, 3.0]);
    }

    #[test]
    fn test_wrong_capacity_rejected() {
        let input = Tensor::zeros(Shape::matrix(3, 4), DType::F32).unwrap();
        let candidates = Tensor::zeros(Shape::matrix(11, 3), DType::F32).unwrap();
        assert!(CornerCandidatesKernel::configure(&input, &candidates, Arc::default()).is_err());
    }
}
