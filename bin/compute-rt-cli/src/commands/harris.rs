// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `compute-rt harris` command: corner detection on a synthetic image.

use memory_manager::AllocatorStats;
use runtime::{Function, HarrisParams, RunMetrics, Runtime, RuntimeConfig};
use tensor_core::{KeyPoint, KeyPointArray};

pub struct HarrisArgs {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    pub params: HarrisParams,
    pub max_corners: usize,
    pub runs: usize,
    pub json: bool,
}

#[derive(serde::Serialize)]
struct Report {
    width: usize,
    height: usize,
    candidates: usize,
    overflowed: bool,
    corners: Vec<KeyPoint>,
    pool_footprint: usize,
    last_run: Option<RunMetrics>,
    allocator: AllocatorStats,
}

pub fn execute(config: RuntimeConfig, args: HarrisArgs) -> anyhow::Result<()> {
    let image = super::synthetic_image(args.width, args.height, args.seed)?;
    let rt = Runtime::new(config)?;
    let corners = KeyPointArray::new(args.max_corners);

    let mut harris = rt.harris_corners(&image, args.params, &corners)?;
    rt.populate()?;
    let pool_footprint = rt.memory_manager().pool_manager().total_footprint();

    let mut last_run = None;
    for _ in 0..args.runs {
        last_run = Some(harris.run()?);
    }
    let candidates = harris.num_candidates();
    drop(harris);
    rt.clear()?;

    let report = Report {
        width: args.width,
        height: args.height,
        candidates,
        overflowed: corners.has_overflowed(),
        corners: corners.to_vec(),
        pool_footprint,
        last_run,
        allocator: rt.allocator_stats(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("  Harris corners · {}x{} synthetic image (seed {})", args.width, args.height, args.seed);
    println!();
    if let Some(metrics) = &report.last_run {
        println!("  {}", metrics.summary());
        for stage in &metrics.stages {
            println!("   {:<28} {:>9.3} ms", stage.name, stage.duration.as_secs_f64() * 1000.0);
        }
        println!();
    }
    println!(
        "  {} candidates, {} corners kept{}",
        report.candidates,
        report.corners.len(),
        if report.overflowed { " (output array full)" } else { "" }
    );
    for k in report.corners.iter().take(10) {
        println!("   ({:>4}, {:>4})  strength {:.6}", k.x, k.y, k.strength);
    }
    if report.corners.len() > 10 {
        println!("   ... {} more", report.corners.len() - 10);
    }
    println!();
    println!("  Pool footprint: {} bytes", report.pool_footprint);
    super::print_allocator_stats(&report.allocator);
    Ok(())
}
