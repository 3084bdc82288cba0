// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # compute-rt
//!
//! Command-line interface for the compute-rt composite functions.
//!
//! ## Usage
//! ```bash
//! # Detect corners on a synthetic image
//! compute-rt harris --width 640 --height 480 --border replicate
//!
//! # Multiply random matrices and check against a naive product
//! compute-rt gemm -m 64 -k 128 -n 32 --reshape-b-once
//!
//! # Show where Harris intermediates land in the pool
//! compute-rt plan --width 640 --height 480 --strategy blob
//! ```

mod commands;

use clap::{Parser, Subcommand};
use commands::{BorderArg, StrategyArg};

#[derive(Parser)]
#[command(
    name = "compute-rt",
    about = "Composite compute functions over lifetime-pooled memory",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Worker threads (overrides the configuration).
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    /// Lifetime strategy (overrides the configuration).
    #[arg(short = 's', long, global = true, value_enum)]
    strategy: Option<StrategyArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Harris corner detection on a synthetic image.
    Harris {
        #[arg(long, default_value_t = 320)]
        width: usize,

        #[arg(long, default_value_t = 240)]
        height: usize,

        /// Seed of the synthetic image.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 1e-5)]
        threshold: f32,

        #[arg(long, default_value_t = 5.0)]
        min_dist: f32,

        #[arg(long, default_value_t = 0.04)]
        sensitivity: f32,

        /// Sobel size: 3, 5 or 7.
        #[arg(long, default_value_t = 3)]
        gradient_size: usize,

        /// Structure-tensor window: 3, 5 or 7.
        #[arg(long, default_value_t = 3)]
        block_size: usize,

        #[arg(long, value_enum, default_value = "undefined")]
        border: BorderArg,

        /// Value used by `--border constant`.
        #[arg(long, default_value_t = 0)]
        border_value: u8,

        /// Capacity of the output corner array.
        #[arg(long, default_value_t = 2048)]
        max_corners: usize,

        /// Times to run the configured function.
        #[arg(long, default_value_t = 1)]
        runs: usize,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Multiply random matrices and verify the result.
    Gemm {
        #[arg(short, default_value_t = 64)]
        m: usize,

        #[arg(short, default_value_t = 64)]
        k: usize,

        #[arg(short, default_value_t = 64)]
        n: usize,

        #[arg(long, default_value_t = 1.0)]
        alpha: f32,

        #[arg(long, default_value_t = 0.0)]
        beta: f32,

        /// Add `beta * c` with a random `c`.
        #[arg(long)]
        bias: bool,

        /// Reshape b once in prepare() instead of on every run.
        #[arg(long)]
        reshape_b_once: bool,

        #[arg(long, default_value_t = 1)]
        runs: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Print the pooled memory plan of a Harris configuration.
    Plan {
        #[arg(long, default_value_t = 320)]
        width: usize,

        #[arg(long, default_value_t = 240)]
        height: usize,

        #[arg(long, default_value_t = 3)]
        gradient_size: usize,

        #[arg(long, default_value_t = 3)]
        block_size: usize,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref(), cli.threads, cli.strategy)?;

    match cli.command {
        Commands::Harris {
            width,
            height,
            seed,
            threshold,
            min_dist,
            sensitivity,
            gradient_size,
            block_size,
            border,
            border_value,
            max_corners,
            runs,
            json,
        } => {
            let params = runtime::HarrisParams {
                threshold,
                min_dist,
                sensitivity,
                gradient_size,
                block_size,
                border_mode: border.into_mode(border_value),
            };
            commands::harris::execute(
                config,
                commands::harris::HarrisArgs {
                    width,
                    height,
                    seed,
                    params,
                    max_corners,
                    runs,
                    json,
                },
            )
        }
        Commands::Gemm {
            m,
            k,
            n,
            alpha,
            beta,
            bias,
            reshape_b_once,
            runs,
            seed,
        } => commands::gemm::execute(
            config,
            commands::gemm::GemmArgs {
                m,
                k,
                n,
                alpha,
                beta,
                bias,
                reshape_b_once,
                runs,
                seed,
            },
        ),
        Commands::Plan {
            width,
            height,
            gradient_size,
            block_size,
            json,
        } => commands::plan::execute(config, width, height, gradient_size, block_size, json),
    }
}
