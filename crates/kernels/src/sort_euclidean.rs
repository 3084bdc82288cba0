// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strength ordering and minimum-distance suppression of corners.

use crate::{ExecutionContext, KernelError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tensor_core::{BorderSize, DType, KeyPoint, KeyPointArray, Tensor};

/// Sorts candidates by descending strength and keeps a corner only if no
/// stronger kept corner lies closer than `min_dist`.
///
/// Equal strengths keep their candidate order. Neighbour lookups use a grid
/// of `min_dist`-sized cells, so only the 3x3 surrounding cells are checked.
#[derive(Debug, Clone)]
pub struct SortEuclideanDistanceKernel {
    candidates: Tensor,
    output: KeyPointArray,
    num_corners: Arc<AtomicUsize>,
    min_dist: f32,
}

impl SortEuclideanDistanceKernel {
    pub const NAME: &'static str = "sort_euclidean_distance";

    pub fn configure(
        candidates: &Tensor,
        output: &KeyPointArray,
        num_corners: Arc<AtomicUsize>,
        min_dist: f32,
    ) -> Result<Self, KernelError> {
        if candidates.dtype() != DType::F32 || candidates.shape().rank() != 2 || candidates.shape().cols() != 3 {
            return Err(KernelError::invalid(Self::NAME, "candidates must be f32 [n, 3]"));
        }
        if !min_dist.is_finite() || min_dist < 0.0 {
            return Err(KernelError::invalid(
                Self::NAME,
                format!("min_dist must be finite and >= 0, got {min_dist}"),
            ));
        }
        Ok(Self {
            candidates: candidates.clone(),
            output: output.clone(),
            num_corners,
            min_dist,
        })
    }

    pub fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    pub fn run(&self, _ctx: &ExecutionContext) -> Result<(), KernelError> {
        let capacity = self.candidates.shape().rows();
        let count = self.num_corners.load(Ordering::Acquire).min(capacity);
        let raw = self.candidates.to_vec::<f32>()?;

        let mut corners: Vec<KeyPoint> = raw
            .chunks_exact(3)
            .take(count)
            .map(|c| KeyPoint {
                x: c[0] as i32,
                y: c[1] as i32,
                strength: c[2],
                tracking_status: true,
            })
            .collect();
        corners.sort_by(|a, b| b.strength.total_cmp(&a.strength));

        self.output.clear();
        let min_sq = self.min_dist * self.min_dist;
        let cell = self.min_dist.ceil().max(1.0) as i32;
        let mut grid: HashMap<(i32, i32), Vec<(i32, i32)>> = HashMap::new();

        for corner in corners {
            let key = (corner.x.div_euclid(cell), corner.y.div_euclid(cell));
            let crowded = (-1..=1).any(|dy| {
                (-1..=1).any(|dx| {
                    grid.get(&(key.0 + dx, key.1 + dy)).is_some_and(|kept| {
                        kept.iter().any(|&(x, y)| {
                            let (ddx, ddy) = ((x - corner.x) as f32, (y - corner.y) as f32);
                            ddx * ddx + ddy * ddy < min_sq
                        })
                    })
                })
            });
            if crowded {
                continue;
            }
            if !self.output.push(corner) {
                break;
            }
            grid.entry(key).or_default().push((corner.x, corner.y));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn run(rows: &[[f32; 3]], min_dist: f32, max: usize) -> Vec<KeyPoint> {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let candidates = Tensor::from_slice(Shape::matrix(rows.len(), 3), &flat).unwrap();
        let output = KeyPointArray::new(max);
        let count = Arc::new(AtomicUsize::new(rows.len()));
        SortEuclideanDistanceKernel::configure(&candidates, &output, count, min_dist)
            .unwrap()
            .run(&ExecutionContext::single_threaded())
            .unwrap();
        output.to_vec()
    }

    #[test]
    fn test_sorted_by_strength_and_ties_stable() {
        let out = run(&[[0.0, 0.0, 1.0], [10.0, 0.0, 5.0], [20.0, 0.0, 1.0]], 0.0, 10);
        let xs: Vec<i32> = out.iter().map(|k| k.x).collect();
        assert_eq!(xs, vec![10, 0, 20]);
    }

    #[test]
    fn test_min_distance_suppression() {
        let out = run(
            &[[0.0, 0.0, 1.0], [3.0, 4.0, 2.0], [10.0, 10.0, 0.5], [5.0, 0.0, 0.7]],
            5.0,
            10,
        );
        // (0,0) is exactly 5 away from (3,4): kept, since suppression is `<`.
        // (5,0) is ~4.47 from (3,4): suppressed.
        let xy: Vec<(i32, i32)> = out.iter().map(|k| (k.x, k.y)).collect();
        assert_eq!(xy, vec![(3, 4), (0, 0), (10, 10)]);
    }

    #[test]
    fn test_grid_matches_brute_force() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let rows: Vec<[f32; 3]> = (0..60)
                .map(|_| [rng.gen_range(0..40) as f32, rng.gen_range(0..40) as f32, rng.gen_range(0..5) as f32])
                .collect();
            let min_dist = rng.gen_range(0.0..8.0f32);
            let out = run(&rows, min_dist, 1000);

            let mut sorted: Vec<[f32; 3]> = rows.clone();
            sorted.sort_by(|a, b| b[2].total_cmp(&a[2]));
            let mut expected: Vec<(i32, i32)> = Vec::new();
            for [x, y, _] in sorted {
                let (x, y) = (x as i32, y as i32);
                let near = expected.iter().any(|&(ex, ey)| {
                    let (dx, dy) = ((ex - x) as f32, (ey - y) as f32);
                    dx * dx + dy * dy < min_dist * min_dist
                });
                if !near {
                    expected.push((x, y));
                }
            }
            let got: Vec<(i32, i32)> = out.iter().map(|k| (k.x, k.y)).collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_output_capacity() {
        let output = run(&[[0.0, 0.0, 3.0], [10.0, 0.0, 2.0], [20.0, 0.0, 1.0]], 1.0, 2);
        assert_eq!(output.len(), 2);
    }
}
