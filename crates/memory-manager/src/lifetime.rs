// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lifetime tracking and pool sizing.
//!
//! The [`LifetimeManager`] keeps one record per registered memory group.
//! Every `start_lifetime` / `end_lifetime` call ticks a manager-wide event
//! clock, so each managed memoryable ends up with a half-open interval
//! `[start, end)`. Once a group has no open lifetimes it is finalized: its
//! intervals are packed (see [`packing`](crate::packing)) and its
//! [`MemoryMappings`] are fixed.
//!
//! Pools are sized from all finalized groups at once. Groups never run on
//! the same pool simultaneously, so the pool only has to fit the largest
//! group plan, not their sum.

use crate::mappings::{Mapping, MemoryMappings, Slot};
use crate::packing::{self, BlobInfo, Interval};
use crate::pool::MemoryPool;
use crate::{Allocator, GroupId, MemoryError, MemoryHandle, MemoryableId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// How finalized lifetimes are turned into pool layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifetimeStrategy {
    /// One allocation per pool, memoryables placed at packed offsets.
    #[default]
    Offset,
    /// One allocation per blob, blobs reused by non-overlapping lifetimes.
    Blob,
}

impl std::fmt::Display for LifetimeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifetimeStrategy::Offset => write!(f, "offset"),
            LifetimeStrategy::Blob => write!(f, "blob"),
        }
    }
}

/// The aggregated layout every pool must provide.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum PoolLayout {
    Offset { size: usize, alignment: usize },
    Blob(Vec<BlobInfo>),
}

impl PoolLayout {
    /// Bytes one pool with this layout costs.
    pub fn footprint(&self) -> usize {
        match self {
            PoolLayout::Offset { size, .. } => *size,
            PoolLayout::Blob(blobs) => blobs.iter().map(|b| b.size).sum(),
        }
    }
}

#[derive(Debug)]
struct Lifetime {
    start: u64,
    end: Option<u64>,
    memory: Option<MemoryHandle>,
    size: usize,
    alignment: usize,
}

#[derive(Debug, Default)]
struct GroupRecord {
    lifetimes: BTreeMap<MemoryableId, Lifetime>,
    open: usize,
    plan: Option<GroupPlan>,
}

#[derive(Debug)]
struct GroupPlan {
    mappings: MemoryMappings,
    layout: PoolLayout,
}

impl GroupRecord {
    fn finalize(&mut self, strategy: LifetimeStrategy) {
        let intervals: Vec<Interval> = self
            .lifetimes
            .iter()
            .filter_map(|(id, lt)| {
                lt.end.map(|end| Interval {
                    id: *id,
                    start: lt.start,
                    end,
                    size: lt.size,
                    alignment: lt.alignment,
                })
            })
            .collect();

        let (slots, layout): (BTreeMap<MemoryableId, Slot>, PoolLayout) = match strategy {
            LifetimeStrategy::Offset => {
                let plan = packing::pack_offsets(&intervals);
                (
                    plan.offsets.iter().map(|(id, off)| (*id, Slot::Offset(*off))).collect(),
                    PoolLayout::Offset {
                        size: plan.footprint,
                        alignment: plan.alignment,
                    },
                )
            }
            LifetimeStrategy::Blob => {
                let plan = packing::pack_blobs(&intervals);
                (
                    plan.blob_of.iter().map(|(id, b)| (*id, Slot::Blob(*b))).collect(),
                    PoolLayout::Blob(plan.blobs),
                )
            }
        };

        let mut mappings = MemoryMappings::new();
        for (id, lt) in &self.lifetimes {
            if let (Some(memory), Some(slot)) = (&lt.memory, slots.get(id)) {
                mappings.insert(
                    *id,
                    Mapping {
                        memory: memory.clone(),
                        size: lt.size,
                        alignment: lt.alignment,
                        slot: *slot,
                    },
                );
            }
        }

        self.plan = Some(GroupPlan { mappings, layout });
    }
}

#[derive(Debug, Default)]
struct LifetimeState {
    clock: u64,
    groups: HashMap<GroupId, GroupRecord>,
}

impl LifetimeState {
    fn tick(&mut self) -> u64 {
        let now = self.clock;
        self.clock += 1;
        now
    }

    fn group_mut(&mut self, group: GroupId) -> Result<&mut GroupRecord, MemoryError> {
        self.groups
            .get_mut(&group)
            .ok_or(MemoryError::GroupNotRegistered(group))
    }

    fn open_groups(&self) -> usize {
        self.groups.values().filter(|g| g.open > 0).count()
    }
}

/// Tracks memoryable lifetimes per group and sizes pools from them.
#[derive(Debug, Default)]
pub struct LifetimeManager {
    strategy: LifetimeStrategy,
    state: Mutex<LifetimeState>,
}

impl LifetimeManager {
    pub fn new(strategy: LifetimeStrategy) -> Self {
        Self {
            strategy,
            state: Mutex::default(),
        }
    }

    pub fn strategy(&self) -> LifetimeStrategy {
        self.strategy
    }

    fn lock(&self) -> MutexGuard<'_, LifetimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the record for `group`. Registering twice is a no-op.
    pub fn register_group(&self, group: GroupId) {
        let mut state = self.lock();
        if !state.groups.contains_key(&group) {
            debug!(%group, "registering memory group");
            state.groups.insert(group, GroupRecord::default());
        }
    }

    /// Forgets `group`, so it no longer contributes to pool sizing.
    pub fn unregister_group(&self, group: GroupId) -> bool {
        let removed = self.lock().groups.remove(&group).is_some();
        if removed {
            debug!(%group, "unregistered memory group");
        }
        removed
    }

    pub fn is_registered(&self, group: GroupId) -> bool {
        self.lock().groups.contains_key(&group)
    }

    /// Opens the lifetime of `memoryable` inside `group`.
    pub fn start_lifetime(&self, group: GroupId, memoryable: MemoryableId) -> Result<(), MemoryError> {
        let mut state = self.lock();
        let now = state.tick();
        let record = state.group_mut(group)?;

        if let Some(existing) = record.lifetimes.get(&memoryable) {
            if existing.end.is_none() {
                return Err(MemoryError::LifetimeAlreadyStarted { group, memoryable });
            }
        }

        record.lifetimes.insert(
            memoryable,
            Lifetime {
                start: now,
                end: None,
                memory: None,
                size: 0,
                alignment: 1,
            },
        );
        record.open += 1;
        record.plan = None;
        Ok(())
    }

    /// Closes the lifetime of `memoryable`, recording where its storage has
    /// to be bound and how much of it is needed.
    ///
    /// Closing the last open lifetime of a group finalizes the group.
    pub fn end_lifetime(
        &self,
        group: GroupId,
        memoryable: MemoryableId,
        memory: &MemoryHandle,
        size: usize,
        alignment: usize,
    ) -> Result<(), MemoryError> {
        let strategy = self.strategy;
        let mut state = self.lock();
        let now = state.tick();
        let record = state.group_mut(group)?;

        let lifetime = record
            .lifetimes
            .get_mut(&memoryable)
            .filter(|lt| lt.end.is_none())
            .ok_or(MemoryError::LifetimeNotStarted { group, memoryable })?;

        lifetime.end = Some(now);
        lifetime.memory = Some(memory.clone());
        lifetime.size = size;
        lifetime.alignment = alignment.max(1);
        record.open -= 1;

        if record.open == 0 {
            record.finalize(strategy);
            debug!(
                %group,
                memoryables = record.lifetimes.len(),
                footprint = record.plan.as_ref().map(|p| p.layout.footprint()).unwrap_or(0),
                "memory group finalized"
            );
        }
        Ok(())
    }

    /// Whether `group` has a plan (no open lifetimes).
    pub fn is_finalized(&self, group: GroupId) -> bool {
        self.lock().groups.get(&group).is_some_and(|g| g.open == 0)
    }

    /// Whether every registered group is finalized.
    pub fn are_all_finalized(&self) -> bool {
        self.lock().open_groups() == 0
    }

    /// The mappings of a finalized group.
    pub fn mappings(&self, group: GroupId) -> Result<MemoryMappings, MemoryError> {
        let state = self.lock();
        let record = state
            .groups
            .get(&group)
            .ok_or(MemoryError::GroupNotRegistered(group))?;
        if record.open > 0 {
            return Err(MemoryError::GroupNotFinalized {
                group,
                open: record.open,
            });
        }
        Ok(record
            .plan
            .as_ref()
            .map(|p| p.mappings.clone())
            .unwrap_or_default())
    }

    /// The layout a pool needs so any single finalized group fits in it.
    pub fn pool_requirements(&self) -> Result<PoolLayout, MemoryError> {
        let state = self.lock();
        let open_groups = state.open_groups();
        if open_groups > 0 {
            return Err(MemoryError::LifetimesNotFinalized { open_groups });
        }

        let plans = state.groups.values().filter_map(|g| g.plan.as_ref());
        Ok(match self.strategy {
            LifetimeStrategy::Offset => {
                let (size, alignment) = plans.fold((0, 1), |(size, align), plan| match plan.layout {
                    PoolLayout::Offset { size: s, alignment: a } => (size.max(s), align.max(a)),
                    PoolLayout::Blob(_) => (size, align),
                });
                PoolLayout::Offset { size, alignment }
            }
            LifetimeStrategy::Blob => PoolLayout::Blob(plans.fold(Vec::new(), |acc, plan| {
                match &plan.layout {
                    PoolLayout::Blob(blobs) => packing::merge_blobs(&acc, blobs),
                    PoolLayout::Offset { .. } => acc,
                }
            })),
        })
    }

    /// Allocates one pool satisfying [`pool_requirements`](Self::pool_requirements).
    pub fn create_pool(&self, allocator: Arc<dyn Allocator>) -> Result<MemoryPool, MemoryError> {
        let layout = self.pool_requirements()?;
        MemoryPool::new(&layout, allocator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ended(lm: &LifetimeManager, group: GroupId, size: usize) -> (MemoryableId, MemoryHandle) {
        let id = MemoryableId::next();
        let handle = MemoryHandle::new();
        lm.start_lifetime(group, id).unwrap();
        lm.end_lifetime(group, id, &handle, size, 8).unwrap();
        (id, handle)
    }

    #[test]
    fn test_register_is_idempotent() {
        let lm = LifetimeManager::default();
        let g = GroupId::next();
        lm.register_group(g);
        let id = MemoryableId::next();
        lm.start_lifetime(g, id).unwrap();
        lm.register_group(g);
        assert!(!lm.is_finalized(g));
    }

    #[test]
    fn test_sequencing_errors() {
        let lm = LifetimeManager::default();
        let g = GroupId::next();
        let id = MemoryableId::next();
        let handle = MemoryHandle::new();

        assert!(matches!(
            lm.start_lifetime(g, id),
            Err(MemoryError::GroupNotRegistered(_))
        ));

        lm.register_group(g);
        assert!(matches!(
            lm.end_lifetime(g, id, &handle, 8, 8),
            Err(MemoryError::LifetimeNotStarted { .. })
        ));

        lm.start_lifetime(g, id).unwrap();
        assert!(matches!(
            lm.start_lifetime(g, id),
            Err(MemoryError::LifetimeAlreadyStarted { .. })
        ));
        assert!(matches!(
            lm.mappings(g),
            Err(MemoryError::GroupNotFinalized { open: 1, .. })
        ));
        assert!(matches!(
            lm.pool_requirements(),
            Err(MemoryError::LifetimesNotFinalized { open_groups: 1 })
        ));

        lm.end_lifetime(g, id, &handle, 8, 8).unwrap();
        assert!(lm.is_finalized(g));
        assert!(lm.are_all_finalized());
    }

    #[test]
    fn test_sequential_lifetimes_share_offset() {
        let lm = LifetimeManager::default();
        let g = GroupId::next();
        lm.register_group(g);
        let (a, _) = ended(&lm, g, 1024);
        let (b, _) = ended(&lm, g, 512);

        let mappings = lm.mappings(g).unwrap();
        assert_eq!(mappings.get(a).unwrap().slot, Slot::Offset(0));
        assert_eq!(mappings.get(b).unwrap().slot, Slot::Offset(0));
        assert_eq!(lm.pool_requirements().unwrap().footprint(), 1024);
    }

    #[test]
    fn test_nested_lifetimes_do_not_alias() {
        let lm = LifetimeManager::default();
        let g = GroupId::next();
        lm.register_group(g);
        let (a, b) = (MemoryableId::next(), MemoryableId::next());
        let h = MemoryHandle::new();
        lm.start_lifetime(g, a).unwrap();
        lm.start_lifetime(g, b).unwrap();
        lm.end_lifetime(g, a, &h, 100, 4).unwrap();
        assert!(!lm.is_finalized(g));
        lm.end_lifetime(g, b, &h, 100, 4).unwrap();

        let mappings = lm.mappings(g).unwrap();
        let (sa, sb) = (mappings.get(a).unwrap().slot, mappings.get(b).unwrap().slot);
        assert_ne!(sa, sb);
        assert_eq!(lm.pool_requirements().unwrap().footprint(), 200);
    }

    #[test]
    fn test_pool_fits_largest_group() {
        let lm = LifetimeManager::default();
        let (g1, g2) = (GroupId::next(), GroupId::next());
        lm.register_group(g1);
        lm.register_group(g2);
        ended(&lm, g1, 1024);
        ended(&lm, g2, 4096);
        assert_eq!(
            lm.pool_requirements().unwrap(),
            PoolLayout::Offset { size: 4096, alignment: 8 }
        );

        lm.unregister_group(g2);
        assert_eq!(lm.pool_requirements().unwrap().footprint(), 1024);
    }

    #[test]
    fn test_blob_strategy_merges_groups() {
        let lm = LifetimeManager::new(LifetimeStrategy::Blob);
        let (g1, g2) = (GroupId::next(), GroupId::next());
        lm.register_group(g1);
        lm.register_group(g2);

        // g1: two overlapping memoryables (two blobs).
        let (a, b) = (MemoryableId::next(), MemoryableId::next());
        let h = MemoryHandle::new();
        lm.start_lifetime(g1, a).unwrap();
        lm.start_lifetime(g1, b).unwrap();
        lm.end_lifetime(g1, a, &h, 300, 8).unwrap();
        lm.end_lifetime(g1, b, &h, 100, 8).unwrap();

        // g2: one large memoryable.
        ended(&lm, g2, 500);

        let PoolLayout::Blob(blobs) = lm.pool_requirements().unwrap() else {
            panic!("expected a blob layout");
        };
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].size, 500);
        assert_eq!(blobs[1].size, 100);
    }

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(serde_json::to_string(&LifetimeStrategy::Blob).unwrap(), "\"blob\"");
        let parsed: LifetimeStrategy = serde_json::from_str("\"offset\"").unwrap();
        assert_eq!(parsed, LifetimeStrategy::Offset);
        assert_eq!(LifetimeStrategy::default().to_string(), "offset");
    }

    #[test]
    fn test_restart_after_end_reopens_group() {
        let lm = LifetimeManager::default();
        let g = GroupId::next();
        lm.register_group(g);
        let (a, _) = ended(&lm, g, 64);
        lm.start_lifetime(g, a).unwrap();
        assert!(!lm.is_finalized(g));
    }
}
