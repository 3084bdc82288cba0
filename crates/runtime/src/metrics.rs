// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-run profiling of composite functions.
//!
//! [`RunMetrics`] records every kernel a `run()` executed, in order, with
//! its wall-clock time. The stage list doubles as the observable execution
//! order of a function.

use std::time::Duration;

/// One executed kernel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageMetrics {
    /// Kernel name.
    pub name: &'static str,
    pub duration: Duration,
}

/// Aggregate metrics for a single `run()`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunMetrics {
    /// Composite function name.
    pub function: &'static str,
    /// Wall-clock time of the whole run, acquire and release included.
    pub total_duration: Duration,
    /// Time spent inside kernels.
    pub compute_duration: Duration,
    /// Threads the kernels were allowed to use.
    pub num_threads: usize,
    pub stages: Vec<StageMetrics>,
}

impl RunMetrics {
    /// Creates an empty metrics container.
    pub fn new(function: &'static str, num_threads: usize) -> Self {
        Self {
            function,
            total_duration: Duration::ZERO,
            compute_duration: Duration::ZERO,
            num_threads,
            stages: Vec::new(),
        }
    }

    pub fn record_stage(&mut self, name: &'static str, duration: Duration) {
        self.compute_duration += duration;
        self.stages.push(StageMetrics { name, duration });
    }

    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Kernel names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "{}: {:.3}ms total, {} kernels, {:.3}ms compute on {} thread(s)",
            self.function,
            self.total_duration.as_secs_f64() * 1000.0,
            self.stages.len(),
            self.compute_duration.as_secs_f64() * 1000.0,
            self.num_threads,
        )
    }
}
