// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-group mapping table from memoryables to pool slots.

use crate::{MemoryHandle, MemoryableId};
use std::collections::BTreeMap;

/// Where a memoryable lives inside a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Slot {
    /// Byte offset inside a single-allocation pool.
    Offset(usize),
    /// Index of a blob inside a multi-allocation pool.
    Blob(usize),
}

impl Slot {
    /// The raw offset or blob index.
    pub fn index(self) -> usize {
        match self {
            Slot::Offset(v) | Slot::Blob(v) => v,
        }
    }
}

/// One entry of [`MemoryMappings`].
#[derive(Debug, Clone)]
pub struct Mapping {
    /// Handle that receives the pool region on acquire.
    pub memory: MemoryHandle,
    pub size: usize,
    pub alignment: usize,
    pub slot: Slot,
}

/// Memoryable → (memory, size, alignment, slot), ordered by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryMappings {
    entries: BTreeMap<MemoryableId, Mapping>,
}

impl MemoryMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MemoryableId, mapping: Mapping) -> Option<Mapping> {
        self.entries.insert(id, mapping)
    }

    pub fn get(&self, id: MemoryableId) -> Option<&Mapping> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: MemoryableId) -> Option<Mapping> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MemoryableId, &Mapping)> {
        self.entries.iter().map(|(id, m)| (*id, m))
    }

    /// Sum of mapped sizes (the cost without any aliasing).
    pub fn total_size(&self) -> usize {
        self.entries.values().map(|m| m.size).sum()
    }

    /// Unbinds every mapped handle.
    pub fn unbind_all(&self) {
        for mapping in self.entries.values() {
            mapping.memory.unbind();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
