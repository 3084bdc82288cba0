// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `compute-rt plan` command: where Harris intermediates land in the pool.

use runtime::{HarrisParams, Runtime, RuntimeConfig};
use tensor_core::{DType, KeyPointArray, Shape, Tensor};

pub fn execute(
    config: RuntimeConfig,
    width: usize,
    height: usize,
    gradient_size: usize,
    block_size: usize,
    json: bool,
) -> anyhow::Result<()> {
    let rt = Runtime::new(config)?;
    // Planning never reads the pixels.
    let image = Tensor::zeros(Shape::matrix(height, width), DType::U8)?;
    let params = HarrisParams {
        gradient_size,
        block_size,
        ..Default::default()
    };
    let harris = rt.harris_corners(&image, params, &KeyPointArray::new(1))?;
    let plan = harris.memory_plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("  Harris memory plan · {width}x{height}, gradient {gradient_size}, block {block_size}");
        print!("  {}", plan.summary());
    }
    Ok(())
}
