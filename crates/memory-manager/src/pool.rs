// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concrete pools built from a [`PoolLayout`].
//!
//! A pool owns its backing allocations for its whole life. Acquiring a pool
//! for a group binds a slice of those backings to every mapped memory
//! handle; releasing unbinds them again. The bytes themselves are never
//! copied or cleared between groups.

use crate::lifetime::PoolLayout;
use crate::mappings::{MemoryMappings, Slot};
use crate::{Allocator, Backing, MemoryError, Region};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

enum Storage {
    /// A single allocation; `None` when the layout needs zero bytes.
    Offset(Option<Arc<Backing>>),
    Blob(Vec<Arc<Backing>>),
}

/// One physical set of backing allocations.
pub struct MemoryPool {
    storage: Storage,
    allocator: Arc<dyn Allocator>,
}

impl MemoryPool {
    /// Allocates the backings `layout` describes from `allocator`.
    pub fn new(layout: &PoolLayout, allocator: Arc<dyn Allocator>) -> Result<Self, MemoryError> {
        let storage = match layout {
            PoolLayout::Offset { size: 0, .. } => Storage::Offset(None),
            PoolLayout::Offset { size, alignment } => {
                Storage::Offset(Some(Arc::new(allocator.allocate(*size, *alignment)?)))
            }
            PoolLayout::Blob(blobs) => {
                let mut backings = Vec::with_capacity(blobs.len());
                for blob in blobs {
                    // Backings allocated so far are returned on the error path
                    // when `backings` drops.
                    backings.push(Arc::new(allocator.allocate(blob.size, blob.alignment)?));
                }
                Storage::Blob(backings)
            }
        };
        Ok(Self { storage, allocator })
    }

    /// `"offset"` or `"blob"`.
    pub fn kind(&self) -> &'static str {
        match self.storage {
            Storage::Offset(_) => "offset",
            Storage::Blob(_) => "blob",
        }
    }

    /// Total bytes allocated by this pool.
    pub fn footprint(&self) -> usize {
        match &self.storage {
            Storage::Offset(backing) => backing.as_ref().map_or(0, |b| b.size()),
            Storage::Blob(blobs) => blobs.iter().map(|b| b.size()).sum(),
        }
    }

    /// Number of backing allocations.
    pub fn num_allocations(&self) -> usize {
        match &self.storage {
            Storage::Offset(backing) => usize::from(backing.is_some()),
            Storage::Blob(blobs) => blobs.len(),
        }
    }

    fn region_for(&self, id: crate::MemoryableId, slot: Slot, size: usize) -> Result<Region, MemoryError> {
        let (backing, offset) = match (&self.storage, slot) {
            (Storage::Offset(backing), Slot::Offset(offset)) => (backing.as_ref(), offset),
            (Storage::Blob(blobs), Slot::Blob(index)) => (blobs.get(index), 0),
            _ => {
                return Err(MemoryError::SlotMismatch {
                    memoryable: id,
                    pool_kind: self.kind(),
                })
            }
        };
        let too_small = |available| MemoryError::PoolTooSmall {
            memoryable: id,
            slot: slot.index(),
            required: size,
            available,
        };
        let backing = backing.ok_or_else(|| too_small(0))?;
        Region::slice(backing, offset, size).ok_or_else(|| too_small(backing.size()))
    }

    /// Binds every mapping to its slot of this pool.
    ///
    /// All regions are resolved before anything is bound, so a mapping that
    /// does not fit leaves every handle untouched.
    pub fn acquire(&self, mappings: &MemoryMappings) -> Result<(), MemoryError> {
        let regions = mappings
            .iter()
            .map(|(id, m)| self.region_for(id, m.slot, m.size).map(|r| (m, r)))
            .collect::<Result<Vec<_>, _>>()?;
        for (mapping, region) in regions {
            mapping.memory.bind(region);
        }
        Ok(())
    }

    /// Unbinds every mapping.
    pub fn release(&self, mappings: &MemoryMappings) {
        mappings.unbind_all();
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        let backings = match std::mem::replace(&mut self.storage, Storage::Blob(Vec::new())) {
            Storage::Offset(backing) => backing.into_iter().collect(),
            Storage::Blob(blobs) => blobs,
        };
        for backing in backings {
            match Arc::try_unwrap(backing) {
                Ok(backing) => self.allocator.free(backing),
                Err(shared) => warn!(
                    size = shared.size(),
                    "pool backing still referenced on drop; it is freed by the last reference"
                ),
            }
        }
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("kind", &self.kind())
            .field("footprint", &self.footprint())
            .field("allocations", &self.num_allocations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::Mapping;
    use crate::packing::BlobInfo;
    use crate::{DefaultAllocator, MemoryHandle, MemoryableId};

    fn mapping(size: usize, slot: Slot) -> (MemoryableId, Mapping) {
        (
            MemoryableId::next(),
            Mapping {
                memory: MemoryHandle::new(),
                size,
                alignment: 8,
                slot,
            },
        )
    }

    #[test]
    fn test_offset_pool_binds_slices() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let pool = MemoryPool::new(&PoolLayout::Offset { size: 128, alignment: 64 }, Arc::clone(&alloc)).unwrap();
        assert_eq!(pool.footprint(), 128);
        assert_eq!(alloc.stats().live_bytes, 128);

        let mut mappings = MemoryMappings::new();
        let (a_id, a) = mapping(64, Slot::Offset(0));
        let (b_id, b) = mapping(64, Slot::Offset(64));
        let (ha, hb) = (a.memory.clone(), b.memory.clone());
        mappings.insert(a_id, a);
        mappings.insert(b_id, b);

        pool.acquire(&mappings).unwrap();
        let (ra, rb) = (ha.region().unwrap(), hb.region().unwrap());
        assert!(ra.shares_backing_with(&rb));
        assert_eq!(rb.address() - ra.address(), 64);
        drop((ra, rb));

        pool.release(&mappings);
        assert!(!ha.is_bound() && !hb.is_bound());

        drop(pool);
        assert_eq!(alloc.stats().live_bytes, 0);
    }

    #[test]
    fn test_acquire_is_all_or_nothing() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let pool = MemoryPool::new(&PoolLayout::Offset { size: 64, alignment: 8 }, alloc).unwrap();

        let mut mappings = MemoryMappings::new();
        let (a_id, a) = mapping(64, Slot::Offset(0));
        let (b_id, b) = mapping(64, Slot::Offset(32));
        let ha = a.memory.clone();
        mappings.insert(a_id, a);
        mappings.insert(b_id, b);

        assert!(matches!(
            pool.acquire(&mappings),
            Err(MemoryError::PoolTooSmall { slot: 32, .. })
        ));
        assert!(!ha.is_bound());
    }

    #[test]
    fn test_blob_pool() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let layout = PoolLayout::Blob(vec![
            BlobInfo { size: 256, alignment: 8 },
            BlobInfo { size: 32, alignment: 8 },
        ]);
        let pool = MemoryPool::new(&layout, alloc).unwrap();
        assert_eq!(pool.num_allocations(), 2);
        assert_eq!(pool.kind(), "blob");

        let mut mappings = MemoryMappings::new();
        let (id, m) = mapping(100, Slot::Blob(1));
        mappings.insert(id, m);
        assert!(matches!(pool.acquire(&mappings), Err(MemoryError::PoolTooSmall { .. })));

        let mut mappings = MemoryMappings::new();
        let (id, m) = mapping(100, Slot::Offset(0));
        mappings.insert(id, m);
        assert!(matches!(pool.acquire(&mappings), Err(MemoryError::SlotMismatch { .. })));
    }

    #[test]
    fn test_empty_layout() {
        let alloc: Arc<dyn Allocator> = Arc::new(DefaultAllocator::new());
        let pool = MemoryPool::new(&PoolLayout::Offset { size: 0, alignment: 1 }, alloc).unwrap();
        assert_eq!(pool.num_allocations(), 0);
        pool.acquire(&MemoryMappings::new()).unwrap();
    }
}
