// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reporting of where a function's intermediates live in the pool.

use crate::RuntimeError;
use memory_manager::{LifetimeStrategy, MemoryGroup, Memoryable, Slot};
use tensor_core::Tensor;

/// One intermediate and its pool slot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlanEntry {
    pub name: String,
    pub size: usize,
    pub slot: Slot,
}

/// Pooled footprint of a memory manager against giving every
/// intermediate its own allocation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryPlan {
    pub strategy: LifetimeStrategy,
    /// Bytes one pool allocates.
    pub pool_footprint: usize,
    /// Sum of every intermediate's size.
    pub naive_bytes: usize,
    pub entries: Vec<PlanEntry>,
}

impl MemoryPlan {
    /// Builds the plan for `tensors`, all managed by `group`.
    pub fn for_group(group: &MemoryGroup, tensors: &[(&str, &Tensor)]) -> Result<Self, RuntimeError> {
        let manager = group
            .manager()
            .ok_or_else(|| RuntimeError::Config("a memory plan needs a memory manager".into()))?;
        let lifetime = manager.lifetime_manager();
        let mappings = lifetime.mappings(group.id())?;

        let entries = tensors
            .iter()
            .map(|&(name, tensor)| {
                let mapping = mappings.get(tensor.memoryable_id()).ok_or_else(|| {
                    RuntimeError::Config(format!("intermediate '{name}' is not managed by group {}", group.id()))
                })?;
                Ok(PlanEntry {
                    name: name.to_string(),
                    size: mapping.size,
                    slot: mapping.slot,
                })
            })
            .collect::<Result<Vec<_>, RuntimeError>>()?;

        Ok(Self {
            strategy: lifetime.strategy(),
            pool_footprint: manager.footprint_bytes()?,
            naive_bytes: entries.iter().map(|e| e.size).sum(),
            entries,
        })
    }

    /// Fraction of the naive footprint saved by pooling.
    pub fn savings(&self) -> f64 {
        if self.naive_bytes == 0 {
            return 0.0;
        }
        1.0 - self.pool_footprint as f64 / self.naive_bytes as f64
    }

    /// Returns a human-readable table suitable for CLI output.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "strategy {}: pool {} bytes vs naive {} bytes ({:.1}% saved)\n",
            self.strategy,
            self.pool_footprint,
            self.naive_bytes,
            self.savings() * 100.0
        );
        for e in &self.entries {
            let slot = match e.slot {
                Slot::Offset(offset) => format!("offset {offset}"),
                Slot::Blob(index) => format!("blob {index}"),
            };
            out.push_str(&format!("  {:<12} {:>10} bytes  {slot}\n", e.name, e.size));
        }
        out
    }
}
