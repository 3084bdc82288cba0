// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory groups: the per-function view of a shared memory manager.
//!
//! A function owns one [`MemoryGroup`]. At configure time it calls
//! [`manage`](MemoryGroup::manage) on each intermediate before the kernel
//! that first writes it is configured, and [`allocate`](MemoryGroup::allocate)
//! (or [`finalize_memory`](MemoryGroup::finalize_memory)) after the kernel
//! that last reads it. At run time the group is acquired for the duration of
//! the kernels, usually through [`MemoryGroup::scope`].
//!
//! ```text
//!   Idle ── acquire() ──► Acquired ── release() ──► Idle
//! ```

use crate::manager::MemoryManager;
use crate::mappings::MemoryMappings;
use crate::pool_manager::LockedPool;
use crate::{Allocator, DefaultAllocator, GroupId, MemoryError, Memoryable, MemoryableId, Region};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, error};

struct Acquired {
    lease: LockedPool,
    mappings: MemoryMappings,
}

/// Groups the transient memoryables of one function.
///
/// Without a manager every operation except [`allocate`](Self::allocate)
/// is a no-op and memoryables get private allocations.
pub struct MemoryGroup {
    id: GroupId,
    manager: Option<Arc<MemoryManager>>,
    allocator: Arc<dyn Allocator>,
    registered: bool,
    managed: BTreeSet<MemoryableId>,
    acquired: Option<Acquired>,
    auto_clear: bool,
}

impl MemoryGroup {
    /// A group using the system allocator for auto-population and private
    /// allocations.
    pub fn new(manager: Option<Arc<MemoryManager>>) -> Self {
        Self::with_allocator(manager, Arc::new(DefaultAllocator::new()))
    }

    pub fn with_allocator(manager: Option<Arc<MemoryManager>>, allocator: Arc<dyn Allocator>) -> Self {
        Self {
            id: GroupId::next(),
            manager,
            allocator,
            registered: false,
            managed: BTreeSet::new(),
            acquired: None,
            auto_clear: false,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn manager(&self) -> Option<&Arc<MemoryManager>> {
        self.manager.as_ref()
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Whether this group currently holds a pool.
    pub fn is_acquired(&self) -> bool {
        self.acquired.is_some()
    }

    pub fn is_managed<M: Memoryable + ?Sized>(&self, memoryable: &M) -> bool {
        self.managed.contains(&memoryable.memoryable_id())
    }

    pub fn num_managed(&self) -> usize {
        self.managed.len()
    }

    /// Starts the lifetime of `memoryable` in this group.
    pub fn manage<M: Memoryable + ?Sized>(&mut self, memoryable: &M) -> Result<(), MemoryError> {
        let Some(manager) = &self.manager else {
            return Ok(());
        };
        let lifetimes = manager.lifetime_manager();
        if !self.registered {
            lifetimes.register_group(self.id);
            self.registered = true;
        }
        let id = memoryable.memoryable_id();
        lifetimes.start_lifetime(self.id, id)?;
        self.managed.insert(id);
        Ok(())
    }

    /// Ends the lifetime of a managed `memoryable`.
    pub fn finalize_memory<M: Memoryable + ?Sized>(
        &mut self,
        memoryable: &M,
        size: usize,
        alignment: usize,
    ) -> Result<(), MemoryError> {
        let Some(manager) = &self.manager else {
            return Ok(());
        };
        manager.lifetime_manager().end_lifetime(
            self.id,
            memoryable.memoryable_id(),
            memoryable.memory(),
            size,
            alignment,
        )
    }

    /// Provides storage for `memoryable`.
    ///
    /// Managed memoryables are finalized and receive pool memory on acquire;
    /// anything else gets a private allocation bound right away.
    pub fn allocate<M: Memoryable + ?Sized>(&mut self, memoryable: &M) -> Result<(), MemoryError> {
        if self.manager.is_some() && self.is_managed(memoryable) {
            return self.finalize_memory(memoryable, memoryable.required_size(), memoryable.alignment());
        }
        let backing = self
            .allocator
            .allocate(memoryable.required_size(), memoryable.alignment())?;
        memoryable.memory().bind(Region::owned(backing));
        Ok(())
    }

    /// Locks a pool and binds every managed memoryable into it.
    pub fn acquire(&mut self) -> Result<(), MemoryError> {
        let Some(manager) = self.manager.clone() else {
            return Ok(());
        };
        if self.managed.is_empty() {
            return Ok(());
        }
        if self.acquired.is_some() {
            return Err(MemoryError::AlreadyAcquired(self.id));
        }

        let mappings = manager.lifetime_manager().mappings(self.id)?;

        let pools = manager.pool_manager();
        if pools.num_pools() == 0 {
            match manager.populate(Arc::clone(&self.allocator), 1) {
                Ok(()) => {
                    debug!(group = %self.id, "auto-populated one pool");
                    self.auto_clear = true;
                }
                // Another group populated first; share its pools.
                Err(MemoryError::PoolsAlreadyPopulated { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let lease = pools.lock_pool()?;
        if let Err(e) = lease.pool().acquire(&mappings) {
            let id = lease.id();
            drop(lease);
            pools.unlock_pool(id)?;
            self.clear_if_auto(&manager);
            return Err(e);
        }
        debug!(group = %self.id, pool = lease.id(), mappings = mappings.len(), "acquired pool");
        self.acquired = Some(Acquired { lease, mappings });
        Ok(())
    }

    /// Unbinds everything and gives the pool back.
    pub fn release(&mut self) -> Result<(), MemoryError> {
        let Some(Acquired { lease, mappings }) = self.acquired.take() else {
            return Ok(());
        };
        let Some(manager) = self.manager.clone() else {
            return Ok(());
        };
        lease.pool().release(&mappings);
        let id = lease.id();
        drop(lease);
        manager.pool_manager().unlock_pool(id)?;
        debug!(group = %self.id, pool = id, "released pool");
        self.clear_if_auto(&manager);
        Ok(())
    }

    fn clear_if_auto(&mut self, manager: &MemoryManager) {
        if !self.auto_clear {
            return;
        }
        match manager.clear() {
            Ok(()) => {
                debug!(group = %self.id, "auto-cleared pools");
                self.auto_clear = false;
            }
            // Someone else locked the pool in the meantime; the next
            // release retries.
            Err(e) => debug!(group = %self.id, error = %e, "auto-clear deferred"),
        }
    }

    /// Acquires now and releases when the returned guard drops.
    pub fn scope(&mut self) -> Result<MemoryGroupScope<'_>, MemoryError> {
        self.acquire()?;
        Ok(MemoryGroupScope { group: self })
    }
}

impl Drop for MemoryGroup {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(group = %self.id, error = %e, "failed to release pool on drop");
        }
        if self.registered {
            if let Some(manager) = &self.manager {
                manager.lifetime_manager().unregister_group(self.id);
            }
        }
    }
}

impl fmt::Debug for MemoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGroup")
            .field("id", &self.id)
            .field("shared", &self.manager.is_some())
            .field("managed", &self.managed.len())
            .field("acquired", &self.acquired.is_some())
            .finish()
    }
}

/// Holds a memory group acquired; releases it on drop.
pub struct MemoryGroupScope<'a> {
    group: &'a mut MemoryGroup,
}

impl MemoryGroupScope<'_> {
    /// Releases explicitly, surfacing any error instead of logging it.
    pub fn release(self) -> Result<(), MemoryError> {
        let mut this = std::mem::ManuallyDrop::new(self);
        this.group.release()
    }
}

impl Deref for MemoryGroupScope<'_> {
    type Target = MemoryGroup;

    fn deref(&self) -> &MemoryGroup {
        &*self.group
    }
}

impl DerefMut for MemoryGroupScope<'_> {
    fn deref_mut(&mut self) -> &mut MemoryGroup {
        &mut *self.group
    }
}

impl Drop for MemoryGroupScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.group.release() {
            error!(group = %self.group.id(), error = %e, "failed to release memory group scope");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LifetimeStrategy, MemoryHandle};

    struct Buffer {
        id: MemoryableId,
        memory: MemoryHandle,
        size: usize,
    }

    impl Buffer {
        fn new(size: usize) -> Self {
            Self {
                id: MemoryableId::next(),
                memory: MemoryHandle::new(),
                size,
            }
        }
    }

    impl Memoryable for Buffer {
        fn memoryable_id(&self) -> MemoryableId {
            self.id
        }
        fn memory(&self) -> &MemoryHandle {
            &self.memory
        }
        fn required_size(&self) -> usize {
            self.size
        }
        fn alignment(&self) -> usize {
            64
        }
    }

    fn configured(manager: &Arc<MemoryManager>, size: usize) -> (MemoryGroup, Buffer) {
        let mut group = MemoryGroup::new(Some(Arc::clone(manager)));
        let buf = Buffer::new(size);
        group.manage(&buf).unwrap();
        group.allocate(&buf).unwrap();
        (group, buf)
    }

    #[test]
    fn test_unmanaged_group_allocates_privately() {
        let mut group = MemoryGroup::new(None);
        let buf = Buffer::new(32);
        group.manage(&buf).unwrap();
        group.allocate(&buf).unwrap();
        assert!(buf.memory.region().unwrap().is_owned());
        group.acquire().unwrap();
        assert!(!group.is_acquired());
    }

    #[test]
    fn test_acquire_binds_and_release_unbinds() {
        let manager = Arc::new(MemoryManager::default());
        let (mut group, buf) = configured(&manager, 1024);
        assert!(!buf.memory.is_bound());

        group.acquire().unwrap();
        assert!(buf.memory.is_bound());
        assert!(!buf.memory.region().unwrap().is_owned());
        assert!(matches!(group.acquire(), Err(MemoryError::AlreadyAcquired(_))));

        group.release().unwrap();
        assert!(!buf.memory.is_bound());
        // Auto-populated pools are cleared again on release.
        assert_eq!(manager.pool_manager().num_pools(), 0);

        group.release().unwrap();
        group.acquire().unwrap();
        assert!(buf.memory.is_bound());
    }

    #[test]
    fn test_acquire_before_finalize_fails() {
        let manager = Arc::new(MemoryManager::default());
        let mut group = MemoryGroup::new(Some(Arc::clone(&manager)));
        let buf = Buffer::new(64);
        group.manage(&buf).unwrap();
        assert!(matches!(
            group.acquire(),
            Err(MemoryError::GroupNotFinalized { open: 1, .. })
        ));
    }

    #[test]
    fn test_groups_time_share_one_pool() {
        let manager = Arc::new(MemoryManager::new(LifetimeStrategy::Offset));
        let (mut g1, b1) = configured(&manager, 1024);
        let (mut g2, b2) = configured(&manager, 1024);
        manager
            .populate(Arc::new(DefaultAllocator::new()), 1)
            .unwrap();
        assert_eq!(manager.pool_manager().total_footprint(), 1024);

        g1.acquire().unwrap();
        let first = b1.memory.region().unwrap().address();
        assert!(matches!(
            g2.acquire(),
            Err(MemoryError::PoolCapacityExceeded { num_pools: 1 })
        ));
        g1.release().unwrap();

        g2.acquire().unwrap();
        assert_eq!(b2.memory.region().unwrap().address(), first);
        assert!(matches!(manager.clear(), Err(MemoryError::PoolsLocked { locked: 1 })));
        g2.release().unwrap();
        manager.clear().unwrap();
    }

    #[test]
    fn test_scope_releases_on_drop() {
        let manager = Arc::new(MemoryManager::default());
        let (mut group, buf) = configured(&manager, 256);
        {
            let scope = group.scope().unwrap();
            assert!(scope.is_acquired());
            buf.memory.write().unwrap().fill(0xAB);
        }
        assert!(!group.is_acquired());
        assert!(!buf.memory.is_bound());

        let scope = group.scope().unwrap();
        scope.release().unwrap();
        assert!(!group.is_acquired());
    }

    #[test]
    fn test_drop_unregisters_group() {
        let manager = Arc::new(MemoryManager::default());
        let (g1, _b1) = configured(&manager, 4096);
        let (_g2, _b2) = configured(&manager, 128);
        assert_eq!(manager.footprint_bytes().unwrap(), 4096);
        drop(g1);
        assert_eq!(manager.footprint_bytes().unwrap(), 128);
    }

    #[test]
    fn test_drop_while_acquired_returns_pool() {
        let manager = Arc::new(MemoryManager::default());
        let (mut group, _buf) = configured(&manager, 64);
        manager.populate(Arc::new(DefaultAllocator::new()), 1).unwrap();
        group.acquire().unwrap();
        drop(group);
        assert_eq!(manager.pool_manager().num_locked(), 0);
        manager.clear().unwrap();
    }
}
