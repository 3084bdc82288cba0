// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocator statistics.
//!
//! [`AllocatorStats`] is what tells you whether pooling is paying off: with
//! lifetime packing, the peak stays at `num_pools × footprint` no matter how
//! many functions share the manager.

/// Cumulative statistics for one allocator.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocatorStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Backings returned through `free`.
    pub frees: u64,
    /// Allocation requests rejected by the budget or the system allocator.
    pub failed_allocations: u64,
    /// Bytes currently live.
    pub live_bytes: usize,
    /// High-water mark of `live_bytes`.
    pub peak_bytes: usize,
    /// Total bytes ever handed out.
    pub cumulative_bytes: u64,
}

impl AllocatorStats {
    pub(crate) fn record_allocation(&mut self, size: usize) {
        self.allocations += 1;
        self.cumulative_bytes += size as u64;
        self.live_bytes += size;
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);
    }

    pub(crate) fn record_free(&mut self, size: usize) {
        self.frees += 1;
        self.live_bytes = self.live_bytes.saturating_sub(size);
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_allocations += 1;
    }

    /// Number of backings allocated but not yet freed.
    pub fn outstanding(&self) -> u64 {
        self.allocations.saturating_sub(self.frees)
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} allocations ({} freed, {} failed), live {} B, peak {} B",
            self.allocations, self.frees, self.failed_allocations, self.live_bytes, self.peak_bytes,
        )
    }
}
