// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Lifetime-tracked pooling of transient buffers for compute functions.
//!
//! Functions declare the intermediates they need at configure time. The
//! lifetime manager records when each one starts and stops being needed and
//! packs them into a pool layout where buffers that are never live at the
//! same time share bytes. Several functions can share one
//! [`MemoryManager`]; they time-share the same physical pools.
//!
//! # Key Components
//!
//! - [`Memoryable`] / [`MemoryHandle`] — anything whose storage can be
//!   managed, and the rebindable slot its storage lives in.
//! - [`Allocator`] / [`DefaultAllocator`] — raw aligned allocations, with an
//!   optional [`MemoryBudget`] and [`AllocatorStats`].
//! - [`LifetimeManager`] — per-group lifetime intervals and pool sizing
//!   ([`LifetimeStrategy::Offset`] or [`LifetimeStrategy::Blob`]).
//! - [`PoolManager`] — lends pools to groups, one group per pool.
//! - [`MemoryManager`] — the two above plus `populate` / `clear`.
//! - [`MemoryGroup`] — one function's view: `manage`, `allocate`,
//!   `acquire`, `release`.
//!
//! # Ownership Model
//!
//! ```text
//! MemoryGroup::acquire()
//!       │
//!       ▼
//!   PoolManager::lock_pool() ──► MemoryPool ──► Region slices
//!       │                                          │
//!       │                                          ▼
//!       │                              MemoryHandle::bind (per mapping)
//!       │  release()
//!       ▼
//!   unbind all ──► PoolManager::unlock_pool()
//! ```
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use memory_manager::{MemoryGroup, MemoryHandle, MemoryManager, Memoryable, MemoryableId};
//!
//! struct Scratch {
//!     id: MemoryableId,
//!     memory: MemoryHandle,
//! }
//!
//! impl Memoryable for Scratch {
//!     fn memoryable_id(&self) -> MemoryableId { self.id }
//!     fn memory(&self) -> &MemoryHandle { &self.memory }
//!     fn required_size(&self) -> usize { 1024 }
//!     fn alignment(&self) -> usize { 64 }
//! }
//!
//! let manager = Arc::new(MemoryManager::default());
//! let mut group = MemoryGroup::new(Some(Arc::clone(&manager)));
//! let scratch = Scratch { id: MemoryableId::next(), memory: MemoryHandle::new() };
//!
//! group.manage(&scratch).unwrap();
//! group.allocate(&scratch).unwrap();
//!
//! {
//!     let _scope = group.scope().unwrap();
//!     scratch.memory().write().unwrap().fill(1);
//! }
//! assert!(!scratch.memory().is_bound());
//! ```

mod allocator;
mod budget;
mod error;
mod group;
mod id;
pub mod lifetime;
mod manager;
pub mod mappings;
mod memory;
pub mod packing;
pub mod pool;
pub mod pool_manager;
mod stats;

pub use allocator::{Allocator, Backing, DefaultAllocator};
pub use budget::MemoryBudget;
pub use error::MemoryError;
pub use group::{MemoryGroup, MemoryGroupScope};
pub use id::{GroupId, MemoryableId};
pub use lifetime::{LifetimeManager, LifetimeStrategy, PoolLayout};
pub use manager::MemoryManager;
pub use mappings::{Mapping, MemoryMappings, Slot};
pub use memory::{MemoryHandle, MemoryMut, MemoryRef, Memoryable, Region};
pub use pool::MemoryPool;
pub use pool_manager::{LockedPool, PoolManager};
pub use stats::AllocatorStats;
