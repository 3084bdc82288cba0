// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory handles, regions and the [`Memoryable`] contract.
//!
//! A [`MemoryHandle`] is the placeholder a tensor carries from configure
//! time onwards. It is empty until something binds a [`Region`] to it:
//! either a private allocation (the region owns its backing) or a slice of a
//! pool that a memory group acquired (the region aliases pool bytes).
//!
//! Data access goes through [`MemoryRef`] / [`MemoryMut`] guards. Each guard
//! registers its byte range on the backing; a shared and an exclusive
//! borrow of overlapping bytes cannot coexist.

use crate::{Backing, MemoryError, MemoryableId};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Anything whose storage can be managed by a memory group.
///
/// Size and alignment are only meaningful once the owner has been
/// configured (shapes are known at configure time, not construction time).
pub trait Memoryable {
    /// Stable identity used as the key in lifetime records and mappings.
    fn memoryable_id(&self) -> MemoryableId;

    /// The handle a region gets bound to.
    fn memory(&self) -> &MemoryHandle;

    /// Bytes of storage required.
    fn required_size(&self) -> usize;

    /// Required alignment of the storage in bytes.
    fn alignment(&self) -> usize;
}

// ── Region ─────────────────────────────────────────────────────

/// A byte range of a [`Backing`].
#[derive(Clone)]
pub struct Region {
    backing: Arc<Backing>,
    offset: usize,
    size: usize,
    owned: bool,
}

impl Region {
    /// A region spanning a whole backing that it owns.
    pub fn owned(backing: Backing) -> Self {
        let size = backing.size();
        Self {
            backing: Arc::new(backing),
            offset: 0,
            size,
            owned: true,
        }
    }

    /// A non-owning slice `[offset, offset + size)` of a shared backing.
    ///
    /// Returns `None` when the range does not fit.
    pub fn slice(backing: &Arc<Backing>, offset: usize, size: usize) -> Option<Self> {
        let end = offset.checked_add(size)?;
        if end > backing.size() {
            return None;
        }
        Some(Self {
            backing: Arc::clone(backing),
            offset,
            size,
            owned: false,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// `true` if this region owns its backing rather than aliasing a pool.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Returns `true` if both regions live on the same backing.
    pub fn shares_backing_with(&self, other: &Region) -> bool {
        Arc::ptr_eq(&self.backing, &other.backing)
    }

    /// Address of the first byte, for diagnostics and overlap checks.
    pub fn address(&self) -> usize {
        self.backing.as_ptr() as usize + self.offset
    }

    /// Borrows the bytes for reading.
    pub fn read(&self) -> Result<MemoryRef, MemoryError> {
        self.backing
            .borrow_range(self.offset, self.offset + self.size, false)?;
        Ok(MemoryRef {
            backing: Arc::clone(&self.backing),
            offset: self.offset,
            size: self.size,
        })
    }

    /// Borrows the bytes for writing.
    pub fn write(&self) -> Result<MemoryMut, MemoryError> {
        self.backing
            .borrow_range(self.offset, self.offset + self.size, true)?;
        Ok(MemoryMut {
            backing: Arc::clone(&self.backing),
            offset: self.offset,
            size: self.size,
        })
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("owned", &self.owned)
            .finish()
    }
}

// ── Access guards ──────────────────────────────────────────────

/// Shared access to a region's bytes. Released on drop.
pub struct MemoryRef {
    backing: Arc<Backing>,
    offset: usize,
    size: usize,
}

impl Deref for MemoryRef {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the range lies inside the backing (checked when the
        // region was built) and is registered as a shared borrow, so no
        // exclusive guard can exist for overlapping bytes.
        unsafe { std::slice::from_raw_parts(self.backing.as_ptr().add(self.offset), self.size) }
    }
}

impl Drop for MemoryRef {
    fn drop(&mut self) {
        self.backing
            .release_range(self.offset, self.offset + self.size, false);
    }
}

/// Exclusive access to a region's bytes. Released on drop.
pub struct MemoryMut {
    backing: Arc<Backing>,
    offset: usize,
    size: usize,
}

impl Deref for MemoryMut {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: see `MemoryRef::deref`; this guard is the only borrow of
        // these bytes.
        unsafe { std::slice::from_raw_parts(self.backing.as_ptr().add(self.offset), self.size) }
    }
}

impl DerefMut for MemoryMut {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: registered as the only (exclusive) borrow of this range.
        unsafe {
            std::slice::from_raw_parts_mut(self.backing.as_ptr().add(self.offset), self.size)
        }
    }
}

impl Drop for MemoryMut {
    fn drop(&mut self) {
        self.backing
            .release_range(self.offset, self.offset + self.size, true);
    }
}

// ── MemoryHandle ───────────────────────────────────────────────

/// The rebindable memory slot of a memoryable.
///
/// Clones share the same slot, so binding through a mapping is visible to
/// the tensor that owns the handle.
#[derive(Clone, Default)]
pub struct MemoryHandle {
    slot: Arc<Mutex<Option<Region>>>,
}

impl MemoryHandle {
    /// An unbound handle.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Region>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `region`, returning whatever was bound before.
    pub fn bind(&self, region: Region) -> Option<Region> {
        self.lock().replace(region)
    }

    /// Removes the bound region.
    pub fn unbind(&self) -> Option<Region> {
        self.lock().take()
    }

    pub fn is_bound(&self) -> bool {
        self.lock().is_some()
    }

    /// A clone of the bound region, if any.
    pub fn region(&self) -> Option<Region> {
        self.lock().clone()
    }

    /// Returns `true` if both handles refer to the same slot.
    pub fn same_slot(&self, other: &MemoryHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Borrows the bound bytes for reading.
    pub fn read(&self) -> Result<MemoryRef, MemoryError> {
        self.region().ok_or(MemoryError::NotBound)?.read()
    }

    /// Borrows the bound bytes for writing.
    pub fn write(&self) -> Result<MemoryMut, MemoryError> {
        self.region().ok_or(MemoryError::NotBound)?.write()
    }
}

impl fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHandle")
            .field("region", &*self.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_region_roundtrip() {
        let region = Region::owned(Backing::zeroed(16, 8).unwrap());
        assert!(region.is_owned());
        {
            let mut w = region.write().unwrap();
            w[3] = 7;
        }
        assert_eq!(region.read().unwrap()[3], 7);
    }

    #[test]
    fn test_slice_bounds() {
        let backing = Arc::new(Backing::zeroed(64, 8).unwrap());
        assert!(Region::slice(&backing, 32, 32).is_some());
        assert!(Region::slice(&backing, 33, 32).is_none());
        assert!(Region::slice(&backing, usize::MAX, 2).is_none());
    }

    #[test]
    fn test_disjoint_slices_can_be_written_together() {
        let backing = Arc::new(Backing::zeroed(64, 8).unwrap());
        let a = Region::slice(&backing, 0, 32).unwrap();
        let b = Region::slice(&backing, 32, 32).unwrap();
        let mut wa = a.write().unwrap();
        let mut wb = b.write().unwrap();
        wa.fill(1);
        wb.fill(2);
        drop((wa, wb));
        assert!(a.read().unwrap().iter().all(|&x| x == 1));
        assert!(b.read().unwrap().iter().all(|&x| x == 2));
    }

    #[test]
    fn test_aliased_write_is_rejected() {
        let backing = Arc::new(Backing::zeroed(64, 8).unwrap());
        let a = Region::slice(&backing, 0, 32).unwrap();
        let b = Region::slice(&backing, 16, 32).unwrap();

        let reader = a.read().unwrap();
        assert!(matches!(b.write(), Err(MemoryError::AliasingViolation { .. })));
        let _second_reader = b.read().unwrap();
        drop(reader);
    }

    #[test]
    fn test_handle_binding() {
        let handle = MemoryHandle::new();
        assert!(matches!(handle.read(), Err(MemoryError::NotBound)));

        let alias = handle.clone();
        alias.bind(Region::owned(Backing::zeroed(8, 8).unwrap()));
        assert!(handle.is_bound());
        assert!(handle.same_slot(&alias));

        handle.write().unwrap()[0] = 9;
        assert_eq!(alias.read().unwrap()[0], 9);

        assert!(handle.unbind().is_some());
        assert!(!alias.is_bound());
    }
}
