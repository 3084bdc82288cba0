// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `compute-rt gemm` command: random matrices checked against a naive product.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime::{Function, GemmInfo, Runtime, RuntimeConfig};
use tensor_core::{DType, Shape, Tensor};

pub struct GemmArgs {
    pub m: usize,
    pub k: usize,
    pub n: usize,
    pub alpha: f32,
    pub beta: f32,
    pub bias: bool,
    pub reshape_b_once: bool,
    pub runs: usize,
    pub seed: u64,
}

fn random(rows: usize, cols: usize, rng: &mut StdRng) -> Vec<f32> {
    (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

pub fn execute(config: RuntimeConfig, args: GemmArgs) -> anyhow::Result<()> {
    let GemmArgs { m, k, n, alpha, beta, .. } = args;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let (av, bv) = (random(m, k, &mut rng), random(k, n, &mut rng));
    let cv = args.bias.then(|| random(m, n, &mut rng));

    let a = Tensor::from_slice(Shape::matrix(m, k), &av)?;
    let b = Tensor::from_slice(Shape::matrix(k, n), &bv)?;
    let c = cv.as_deref().map(|cv| Tensor::from_slice(Shape::matrix(m, n), cv)).transpose()?;
    let d = Tensor::zeros(Shape::matrix(m, n), DType::F32)?;

    let rt = Runtime::new(config)?;
    let info = GemmInfo {
        reshape_b_only_on_first_run: args.reshape_b_once,
    };
    let mut gemm = rt.gemm(&a, &b, c.as_ref(), &d, alpha, beta, info)?;
    rt.populate()?;

    let mut last_run = None;
    for _ in 0..args.runs {
        last_run = Some(gemm.run()?);
    }
    let reshaped = gemm.is_reshaped();
    drop(gemm);
    rt.clear()?;

    let got = d.to_vec::<f32>()?;
    let mut max_err = 0f32;
    for i in 0..m {
        for j in 0..n {
            let mut expected: f32 = alpha * (0..k).map(|kk| av[i * k + kk] * bv[kk * n + j]).sum::<f32>();
            if let Some(cv) = &cv {
                expected += beta * cv[i * n + j];
            }
            max_err = max_err.max((got[i * n + j] - expected).abs());
        }
    }

    println!("  GEMM · [{m}, {k}] x [{k}, {n}], alpha {alpha}, beta {beta}");
    println!("   Path:       {}", if reshaped { "interleave 4x4 + transpose 1xW" } else { "vector-matrix" });
    if let Some(metrics) = &last_run {
        println!("   {}", metrics.summary());
    }
    println!("   Max error:  {max_err:.3e}");
    super::print_allocator_stats(&rt.allocator_stats());

    let tolerance = 1e-4 * k as f32;
    anyhow::ensure!(max_err <= tolerance, "result differs from the naive product by {max_err} (tolerance {tolerance})");
    Ok(())
}
