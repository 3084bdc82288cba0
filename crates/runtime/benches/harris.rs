// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the composite functions.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime::{Function, GemmInfo, HarrisParams, Runtime, RuntimeConfig};
use tensor_core::{DType, KeyPointArray, Shape, Tensor};

fn runtime(threads: usize) -> Runtime {
    Runtime::new(RuntimeConfig {
        num_threads: Some(threads),
        ..Default::default()
    })
    .unwrap()
}

fn image(size: usize) -> Tensor {
    let mut rng = StdRng::seed_from_u64(size as u64);
    let pixels: Vec<u8> = (0..size * size).map(|_| rng.gen()).collect();
    Tensor::from_slice(Shape::matrix(size, size), &pixels).unwrap()
}

fn bench_harris(c: &mut Criterion) {
    let mut group = c.benchmark_group("harris_corners");
    group.sample_size(20);
    let input = image(256);
    for threads in [1, 4] {
        let rt = runtime(threads);
        let corners = KeyPointArray::new(4096);
        let mut harris = rt.harris_corners(&input, HarrisParams::default(), &corners).unwrap();
        rt.populate().unwrap();
        group.bench_function(BenchmarkId::new("256x256", threads), |b| b.iter(|| harris.run().unwrap()));
        rt.clear().unwrap();
    }
    group.finish();
}

fn bench_gemm(c: &mut Criterion) {
    let mut group = c.benchmark_group("gemm");
    let mut rng = StdRng::seed_from_u64(0);
    for n in [32, 128] {
        let values: Vec<f32> = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let a = Tensor::from_slice(Shape::matrix(n, n), &values).unwrap();
        let d = Tensor::zeros(Shape::matrix(n, n), DType::F32).unwrap();
        let rt = runtime(4);
        let info = GemmInfo {
            reshape_b_only_on_first_run: true,
        };
        let mut gemm = rt.gemm(&a, &a, None, &d, 1.0, 0.0, info).unwrap();
        rt.populate().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| b.iter(|| gemm.run().unwrap()));
        rt.clear().unwrap();
    }
    group.finish();
}

criterion_group!(benches, bench_harris, bench_gemm);
criterion_main!(benches);
