// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lending pools to memory groups.
//!
//! Locking is precondition based: when every pool is lent out,
//! [`PoolManager::lock_pool`] fails with
//! [`MemoryError::PoolCapacityExceeded`] instead of waiting.

use crate::pool::MemoryPool;
use crate::MemoryError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A pool lent to one group, identified by the id it must be returned with.
#[derive(Debug, Clone)]
pub struct LockedPool {
    id: usize,
    pool: Arc<MemoryPool>,
}

impl LockedPool {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }
}

#[derive(Debug, Default)]
struct PoolState {
    next_id: usize,
    pools: BTreeMap<usize, Arc<MemoryPool>>,
    /// Ids of unlocked pools; the most recently unlocked is lent next.
    free: Vec<usize>,
}

impl PoolState {
    fn num_locked(&self) -> usize {
        self.pools.len() - self.free.len()
    }
}

#[derive(Debug, Default)]
pub struct PoolManager {
    state: Mutex<PoolState>,
}

impl PoolManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an unlocked pool and returns its id.
    pub fn register_pool(&self, pool: MemoryPool) -> usize {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        debug!(pool = id, footprint = pool.footprint(), "registered pool");
        state.pools.insert(id, Arc::new(pool));
        state.free.push(id);
        id
    }

    /// Lends out a free pool.
    pub fn lock_pool(&self) -> Result<LockedPool, MemoryError> {
        let mut state = self.lock();
        let id = state.free.pop().ok_or(MemoryError::PoolCapacityExceeded {
            num_pools: state.pools.len(),
        })?;
        let pool = state
            .pools
            .get(&id)
            .cloned()
            .ok_or(MemoryError::PoolNotLocked(id))?;
        Ok(LockedPool { id, pool })
    }

    /// Returns the pool `id` to the free list.
    pub fn unlock_pool(&self, id: usize) -> Result<(), MemoryError> {
        let mut state = self.lock();
        if !state.pools.contains_key(&id) || state.free.contains(&id) {
            return Err(MemoryError::PoolNotLocked(id));
        }
        state.free.push(id);
        Ok(())
    }

    pub fn num_pools(&self) -> usize {
        self.lock().pools.len()
    }

    pub fn num_locked(&self) -> usize {
        self.lock().num_locked()
    }

    /// Bytes allocated across all pools.
    pub fn total_footprint(&self) -> usize {
        self.lock().pools.values().map(|p| p.footprint()).sum()
    }

    /// Destroys every pool. Fails while any pool is lent out.
    pub fn clear_pools(&self) -> Result<(), MemoryError> {
        let mut state = self.lock();
        let locked = state.num_locked();
        if locked > 0 {
            return Err(MemoryError::PoolsLocked { locked });
        }
        let cleared = state.pools.len();
        state.pools.clear();
        state.free.clear();
        debug!(cleared, "cleared pools");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::PoolLayout;
    use crate::{Allocator, DefaultAllocator};

    fn pool(alloc: &Arc<dyn Allocator>) -> MemoryPool {
        MemoryPool::new(&PoolLayout::Offset { size: 64, alignment: 8 }, Arc::clone(alloc)).unwrap()
    }

    #[test]
    fn test_lock_fails_when_exhausted() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let pm = PoolManager::new();
        assert!(matches!(
            pm.lock_pool(),
            Err(MemoryError::PoolCapacityExceeded { num_pools: 0 })
        ));

        pm.register_pool(pool(&alloc));
        pm.register_pool(pool(&alloc));
        let a = pm.lock_pool().unwrap();
        let b = pm.lock_pool().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pm.num_locked(), 2);
        assert!(matches!(
            pm.lock_pool(),
            Err(MemoryError::PoolCapacityExceeded { num_pools: 2 })
        ));

        pm.unlock_pool(a.id()).unwrap();
        let c = pm.lock_pool().unwrap();
        assert_eq!(c.id(), a.id());
    }

    #[test]
    fn test_unlock_unknown_or_free_pool() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let pm = PoolManager::new();
        let id = pm.register_pool(pool(&alloc));
        assert!(matches!(pm.unlock_pool(id), Err(MemoryError::PoolNotLocked(_))));
        assert!(matches!(pm.unlock_pool(99), Err(MemoryError::PoolNotLocked(99))));
    }

    #[test]
    fn test_clear_rejected_while_locked() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let pm = PoolManager::new();
        pm.register_pool(pool(&alloc));
        let lease = pm.lock_pool().unwrap();

        assert!(matches!(pm.clear_pools(), Err(MemoryError::PoolsLocked { locked: 1 })));
        pm.unlock_pool(lease.id()).unwrap();
        drop(lease);

        pm.clear_pools().unwrap();
        assert_eq!(pm.num_pools(), 0);
        assert_eq!(alloc.stats().live_bytes, 0);
    }
}
