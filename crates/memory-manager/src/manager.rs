// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The memory manager shared by cooperating memory groups.

use crate::lifetime::{LifetimeManager, LifetimeStrategy};
use crate::pool_manager::PoolManager;
use crate::{Allocator, MemoryError};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A lifetime manager paired with the pools sized from it.
///
/// Share it as `Arc<MemoryManager>` between every function whose
/// intermediates may time-share memory.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use memory_manager::{DefaultAllocator, LifetimeStrategy, MemoryManager};
///
/// let manager = MemoryManager::new(LifetimeStrategy::Offset);
/// manager.populate(Arc::new(DefaultAllocator::new()), 2).unwrap();
/// assert_eq!(manager.pool_manager().num_pools(), 2);
/// manager.clear().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemoryManager {
    lifetime: LifetimeManager,
    pools: PoolManager,
    /// Serializes populate/clear so concurrent auto-population cannot
    /// create pools twice.
    populate_lock: Mutex<()>,
}

impl MemoryManager {
    pub fn new(strategy: LifetimeStrategy) -> Self {
        Self {
            lifetime: LifetimeManager::new(strategy),
            pools: PoolManager::new(),
            populate_lock: Mutex::new(()),
        }
    }

    pub fn lifetime_manager(&self) -> &LifetimeManager {
        &self.lifetime
    }

    pub fn pool_manager(&self) -> &PoolManager {
        &self.pools
    }

    /// Creates `num_pools` pools from the current lifetime plan.
    pub fn populate(&self, allocator: Arc<dyn Allocator>, num_pools: usize) -> Result<(), MemoryError> {
        if num_pools == 0 {
            return Err(MemoryError::InvalidPoolCount);
        }
        let _guard = self.populate_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = self.pools.num_pools();
        if existing > 0 {
            return Err(MemoryError::PoolsAlreadyPopulated { num_pools: existing });
        }

        // Build every pool first so a failure leaves the manager empty.
        let pools = (0..num_pools)
            .map(|_| self.lifetime.create_pool(Arc::clone(&allocator)))
            .collect::<Result<Vec<_>, _>>()?;
        for pool in pools {
            self.pools.register_pool(pool);
        }
        debug!(
            num_pools,
            footprint = self.pools.total_footprint(),
            strategy = %self.lifetime.strategy(),
            "populated memory manager"
        );
        Ok(())
    }

    /// Frees every pool. Fails while any pool is locked.
    pub fn clear(&self) -> Result<(), MemoryError> {
        let _guard = self.populate_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.pools.clear_pools()
    }

    /// Bytes one pool built from the current plan would allocate.
    pub fn footprint_bytes(&self) -> Result<usize, MemoryError> {
        Ok(self.lifetime.pool_requirements()?.footprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultAllocator, GroupId, MemoryBudget, MemoryHandle, MemoryableId};

    #[test]
    fn test_populate_preconditions() {
        let mm = MemoryManager::default();
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        assert!(matches!(
            mm.populate(Arc::clone(&alloc), 0),
            Err(MemoryError::InvalidPoolCount)
        ));

        let g = GroupId::next();
        mm.lifetime_manager().register_group(g);
        mm.lifetime_manager().start_lifetime(g, MemoryableId::next()).unwrap();
        assert!(matches!(
            mm.populate(Arc::clone(&alloc), 1),
            Err(MemoryError::LifetimesNotFinalized { .. })
        ));
        mm.lifetime_manager().unregister_group(g);

        mm.populate(Arc::clone(&alloc), 1).unwrap();
        assert!(matches!(
            mm.populate(alloc, 1),
            Err(MemoryError::PoolsAlreadyPopulated { num_pools: 1 })
        ));
    }

    #[test]
    fn test_failed_populate_leaves_no_pools() {
        let mm = MemoryManager::default();
        let g = GroupId::next();
        let id = MemoryableId::next();
        mm.lifetime_manager().register_group(g);
        mm.lifetime_manager().start_lifetime(g, id).unwrap();
        mm.lifetime_manager()
            .end_lifetime(g, id, &MemoryHandle::new(), 1024, 64)
            .unwrap();

        let alloc = Arc::new(DefaultAllocator::with_budget(MemoryBudget::from_bytes(1536)));
        assert!(matches!(
            mm.populate(alloc.clone(), 2),
            Err(MemoryError::OutOfMemory { .. })
        ));
        assert_eq!(mm.pool_manager().num_pools(), 0);
        assert_eq!(alloc.stats().live_bytes, 0);
        assert_eq!(mm.footprint_bytes().unwrap(), 1024);
    }
}
