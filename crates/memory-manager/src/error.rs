// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for memory management.
//!
//! Two families live here. Allocation failures come from the allocator
//! (budget exhaustion, bad layouts). Sequencing violations mean the caller
//! drove the lifetime/pool protocol in an order it does not allow, e.g.
//! acquiring twice or clearing pools that are still locked.

use crate::{GroupId, MemoryableId};

/// Errors that can occur during memory allocation and management.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The requested allocation would exceed the memory budget.
    #[error("out of memory: requested {requested_bytes} bytes, but only {available_bytes} available (budget: {budget_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// The system allocator returned null.
    #[error("system allocation of {size} bytes (alignment {alignment}) failed")]
    AllocationFailed { size: usize, alignment: usize },

    /// Attempted to allocate a zero-sized buffer.
    #[error("cannot allocate zero-sized buffer")]
    ZeroSizedAllocation,

    /// The requested alignment is not a power of two or the layout overflows.
    #[error("invalid layout: {size} bytes aligned to {alignment}")]
    InvalidAlignment { size: usize, alignment: usize },

    /// A human-readable budget string could not be parsed.
    #[error("invalid budget string '{0}': expected a number followed by an optional suffix (K, M, G)")]
    InvalidBudget(String),

    // ── Lifetime sequencing ────────────────────────────────────

    /// `start_lifetime` was called twice without an intervening `end_lifetime`.
    #[error("lifetime of {memoryable} already started in {group}")]
    LifetimeAlreadyStarted {
        group: GroupId,
        memoryable: MemoryableId,
    },

    /// `end_lifetime` was called for a memoryable with no open lifetime.
    #[error("lifetime of {memoryable} was never started in {group}")]
    LifetimeNotStarted {
        group: GroupId,
        memoryable: MemoryableId,
    },

    /// The group has never been registered with the lifetime manager.
    #[error("{0} is not registered with the lifetime manager")]
    GroupNotRegistered(GroupId),

    /// The group still has open lifetimes, so it has no packing plan yet.
    #[error("{group} has {open} lifetime(s) still open")]
    GroupNotFinalized { group: GroupId, open: usize },

    /// Pools cannot be sized while any registered group has open lifetimes.
    #[error("cannot size pools: {open_groups} group(s) still have open lifetimes")]
    LifetimesNotFinalized { open_groups: usize },

    // ── Pool sequencing ────────────────────────────────────────

    /// Every provisioned pool is already locked.
    #[error("all {num_pools} pool(s) are locked; more in-flight groups than provisioned pools")]
    PoolCapacityExceeded { num_pools: usize },

    /// A pool was returned that this manager did not lend out.
    #[error("pool {0} is not locked by this pool manager")]
    PoolNotLocked(usize),

    /// Pools cannot be cleared while some are lent out.
    #[error("cannot clear pools: {locked} pool(s) still locked")]
    PoolsLocked { locked: usize },

    /// `populate` requires an empty pool manager.
    #[error("pool manager already holds {num_pools} pool(s)")]
    PoolsAlreadyPopulated { num_pools: usize },

    /// `populate` was asked for zero pools.
    #[error("populate requires at least one pool")]
    InvalidPoolCount,

    /// The group already holds a pool.
    #[error("{0} already holds a pool; release it before acquiring again")]
    AlreadyAcquired(GroupId),

    // ── Binding ────────────────────────────────────────────────

    /// The memory handle has no region bound to it.
    #[error("memory is not bound to any backing region")]
    NotBound,

    /// A mapping does not fit inside the pool it is being bound to.
    #[error("pool too small for {memoryable}: needs {required} bytes at slot {slot}, pool has {available}")]
    PoolTooSmall {
        memoryable: MemoryableId,
        slot: usize,
        required: usize,
        available: usize,
    },

    /// A mapping carries a slot kind the pool does not understand.
    #[error("{memoryable} has a slot incompatible with a {pool_kind} pool")]
    SlotMismatch {
        memoryable: MemoryableId,
        pool_kind: &'static str,
    },

    /// Two accesses to overlapping bytes conflict (at least one writes).
    #[error("aliasing violation: bytes {offset}..{end} are already borrowed")]
    AliasingViolation { offset: usize, end: usize },
}
