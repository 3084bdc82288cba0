// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the helpers they share.

pub mod gemm;
pub mod harris;
pub mod plan;

use anyhow::Context;
use memory_manager::{AllocatorStats, LifetimeStrategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime::RuntimeConfig;
use std::path::Path;
use tensor_core::{BorderMode, Shape, Tensor};
use tracing_subscriber::EnvFilter;

/// Initialises `tracing` from `-v` repetitions, falling back to `RUST_LOG`.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StrategyArg {
    Offset,
    Blob,
}

impl From<StrategyArg> for LifetimeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Offset => LifetimeStrategy::Offset,
            StrategyArg::Blob => LifetimeStrategy::Blob,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum BorderArg {
    Undefined,
    Constant,
    Replicate,
}

impl BorderArg {
    pub fn into_mode(self, value: u8) -> BorderMode {
        match self {
            BorderArg::Undefined => BorderMode::Undefined,
            BorderArg::Constant => BorderMode::Constant(value),
            BorderArg::Replicate => BorderMode::Replicate,
        }
    }
}

/// Loads the configuration file (or defaults) and applies CLI overrides.
pub fn load_config(
    path: Option<&Path>,
    threads: Option<usize>,
    strategy: Option<StrategyArg>,
) -> anyhow::Result<RuntimeConfig> {
    let mut config = match path {
        Some(path) => RuntimeConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if threads.is_some() {
        config.num_threads = threads;
    }
    if let Some(strategy) = strategy {
        config.lifetime_strategy = strategy.into();
    }
    config.validate()?;
    Ok(config)
}

/// A dim, noisy background with bright rectangles scattered over it.
pub fn synthetic_image(width: usize, height: usize, seed: u64) -> anyhow::Result<Tensor> {
    anyhow::ensure!(width >= 32 && height >= 32, "image must be at least 32x32, got {width}x{height}");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pixels: Vec<u8> = (0..width * height).map(|_| rng.gen_range(0..32)).collect();
    let rects = (width * height / 2048).max(4);
    for _ in 0..rects {
        let (w, h) = (rng.gen_range(4..width / 4), rng.gen_range(4..height / 4));
        let (x0, y0) = (rng.gen_range(0..width - w), rng.gen_range(0..height - h));
        let level = rng.gen_range(96..=255u8);
        for row in pixels.chunks_mut(width).skip(y0).take(h) {
            row[x0..x0 + w].fill(level);
        }
    }
    Ok(Tensor::from_slice(Shape::matrix(height, width), &pixels)?)
}

pub fn print_allocator_stats(stats: &AllocatorStats) {
    println!("  Allocator");
    println!("   {}", stats.summary());
}
