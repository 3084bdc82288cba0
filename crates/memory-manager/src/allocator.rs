// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Raw backing allocations and the allocators that produce them.
//!
//! A [`Backing`] is one contiguous, zero-initialised, aligned block. It is
//! the only type in the crate that touches `std::alloc`. Byte ranges of a
//! backing are lent out through borrow-tracked guards (see
//! [`Region`](crate::Region)), so two memoryables that the lifetime planner
//! placed on the same bytes can never be accessed in conflicting ways at
//! the same time without the conflict being reported.
//!
//! # Ownership Model
//!
//! ```text
//! Allocator::allocate(size, align)
//!       │
//!       ▼
//!    Backing  ◄─── owns the raw block, holds Arc<Mutex<AllocatorStats>>
//!       │
//!       │  drop() / Allocator::free()
//!       ▼
//!   std::alloc::dealloc + ledger.record_free()
//! ```

use crate::{AllocatorStats, MemoryBudget, MemoryError};
use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, PoisonError};

/// One active borrow of a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Borrow {
    start: usize,
    end: usize,
    exclusive: bool,
}

impl Borrow {
    fn conflicts_with(&self, other: &Borrow) -> bool {
        self.start < other.end && other.start < self.end && (self.exclusive || other.exclusive)
    }
}

/// A contiguous, aligned, zero-initialised allocation.
pub struct Backing {
    ptr: NonNull<u8>,
    layout: Layout,
    borrows: Mutex<Vec<Borrow>>,
    ledger: Option<Arc<Mutex<AllocatorStats>>>,
}

impl Backing {
    /// Allocates `size` zeroed bytes aligned to `alignment` straight from
    /// the system allocator, without any accounting.
    pub fn zeroed(size: usize, alignment: usize) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }
        let layout = Layout::from_size_align(size, alignment.max(1))
            .map_err(|_| MemoryError::InvalidAlignment { size, alignment })?;

        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(MemoryError::AllocationFailed { size, alignment })?;

        Ok(Self {
            ptr,
            layout,
            borrows: Mutex::new(Vec::new()),
            ledger: None,
        })
    }

    fn with_ledger(mut self, ledger: Arc<Mutex<AllocatorStats>>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Size of the allocation in bytes.
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the allocation in bytes.
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Number of byte ranges currently lent out.
    pub fn active_borrows(&self) -> usize {
        self.borrows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn borrow_range(&self, start: usize, end: usize, exclusive: bool) -> Result<(), MemoryError> {
        let wanted = Borrow { start, end, exclusive };
        let mut borrows = self.borrows.lock().unwrap_or_else(PoisonError::into_inner);
        if borrows.iter().any(|b| b.conflicts_with(&wanted)) {
            return Err(MemoryError::AliasingViolation { offset: start, end });
        }
        borrows.push(wanted);
        Ok(())
    }

    pub(crate) fn release_range(&self, start: usize, end: usize, exclusive: bool) {
        let done = Borrow { start, end, exclusive };
        let mut borrows = self.borrows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = borrows.iter().position(|b| *b == done) {
            borrows.swap_remove(pos);
        }
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with exactly `layout`.
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        if let Some(ledger) = &self.ledger {
            if let Ok(mut stats) = ledger.lock() {
                stats.record_free(self.layout.size());
            }
        }
    }
}

// SAFETY: the raw block is only reachable through borrow-tracked guards,
// and the borrow table itself is behind a Mutex.
unsafe impl Send for Backing {}
unsafe impl Sync for Backing {}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backing")
            .field("size", &self.size())
            .field("alignment", &self.alignment())
            .field("active_borrows", &self.active_borrows())
            .finish()
    }
}

/// Source of raw backing memory for pools and privately owned tensors.
///
/// Implementations must be shareable across threads: one allocator is
/// usually handed to [`MemoryManager::populate`](crate::MemoryManager::populate)
/// and then outlives every pool it created.
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Allocates `size` bytes aligned to `alignment`.
    fn allocate(&self, size: usize, alignment: usize) -> Result<Backing, MemoryError>;

    /// Returns a backing to the allocator. Dropping a backing is equivalent.
    fn free(&self, backing: Backing) {
        drop(backing);
    }

    /// Statistics for everything this allocator handed out.
    fn stats(&self) -> AllocatorStats {
        AllocatorStats::default()
    }
}

/// System allocator with optional budget enforcement and statistics.
///
/// # Example
/// ```
/// use memory_manager::{Allocator, DefaultAllocator, MemoryBudget};
///
/// let allocator = DefaultAllocator::with_budget(MemoryBudget::from_kb(4));
/// let backing = allocator.allocate(1024, 64).unwrap();
/// assert_eq!(allocator.stats().live_bytes, 1024);
/// assert!(allocator.allocate(4096, 64).is_err());
///
/// allocator.free(backing);
/// assert_eq!(allocator.stats().live_bytes, 0);
/// ```
#[derive(Debug, Default)]
pub struct DefaultAllocator {
    budget: Option<MemoryBudget>,
    ledger: Arc<Mutex<AllocatorStats>>,
}

impl DefaultAllocator {
    /// An unbounded allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator that refuses to exceed `budget` live bytes.
    pub fn with_budget(budget: MemoryBudget) -> Self {
        Self {
            budget: Some(budget),
            ledger: Arc::default(),
        }
    }

    pub fn budget(&self) -> Option<MemoryBudget> {
        self.budget
    }
}

impl Allocator for DefaultAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Result<Backing, MemoryError> {
        let mut stats = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(budget) = self.budget {
            if !budget.allows(stats.live_bytes, size) {
                stats.record_failure();
                return Err(MemoryError::OutOfMemory {
                    requested_bytes: size,
                    available_bytes: budget.as_bytes().saturating_sub(stats.live_bytes),
                    budget_bytes: budget.as_bytes(),
                });
            }
        }

        match Backing::zeroed(size, alignment) {
            Ok(backing) => {
                stats.record_allocation(size);
                Ok(backing.with_ledger(Arc::clone(&self.ledger)))
            }
            Err(e) => {
                stats.record_failure();
                Err(e)
            }
        }
    }

    fn stats(&self) -> AllocatorStats {
        self.ledger
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}
