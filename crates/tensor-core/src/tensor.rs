// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tensor type: metadata plus a rebindable memory handle.

use crate::{DType, Element, Shape, TensorError, TensorInfo};
use memory_manager::{Allocator, Backing, MemoryHandle, Memoryable, MemoryableId, Region};

/// A tensor whose storage is provided from outside.
///
/// `Tensor` is a descriptor. Its bytes live in whatever [`Region`] is bound
/// to its [`MemoryHandle`]: a private allocation, or a slice of a pool while
/// the owning memory group is acquired. Clones share identity and storage,
/// so a function can keep a clone of its input and see the caller's data.
///
/// # Memory Layout
/// Row-major with the padding described by [`TensorInfo`]. Typed access
/// copies through [`Element`] and checks the element type on every call.
///
/// # Examples
/// ```
/// use tensor_core::{Shape, Tensor};
/// let t = Tensor::from_slice(Shape::matrix(2, 2), &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
/// assert_eq!(t.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Tensor {
    id: MemoryableId,
    info: TensorInfo,
    memory: MemoryHandle,
}

impl Tensor {
    /// An unallocated tensor.
    pub fn new(info: TensorInfo) -> Self {
        Self {
            id: MemoryableId::next(),
            info,
            memory: MemoryHandle::new(),
        }
    }

    /// A zero-filled tensor with its own storage.
    pub fn zeros(shape: Shape, dtype: DType) -> Result<Self, TensorError> {
        let tensor = Self::new(TensorInfo::new(shape, dtype));
        tensor.allocate_owned()?;
        Ok(tensor)
    }

    /// A tensor with its own storage, initialised from `values`.
    pub fn from_slice<T: Element>(shape: Shape, values: &[T]) -> Result<Self, TensorError> {
        let tensor = Self::zeros(shape, T::DTYPE)?;
        tensor.copy_from_slice(values)?;
        Ok(tensor)
    }

    pub fn id(&self) -> MemoryableId {
        self.id
    }

    pub fn info(&self) -> &TensorInfo {
        &self.info
    }

    pub fn shape(&self) -> &Shape {
        self.info.shape()
    }

    pub fn dtype(&self) -> DType {
        self.info.dtype()
    }

    /// Whether storage is currently bound.
    pub fn is_allocated(&self) -> bool {
        self.memory.is_bound()
    }

    /// Binds a private, zeroed allocation straight from the system.
    pub fn allocate_owned(&self) -> Result<(), TensorError> {
        let backing = Backing::zeroed(self.info.total_size(), self.info.alignment())?;
        self.memory.bind(Region::owned(backing));
        Ok(())
    }

    /// Binds a private allocation obtained from `allocator`.
    pub fn allocate_with(&self, allocator: &dyn Allocator) -> Result<(), TensorError> {
        let backing = allocator.allocate(self.info.total_size(), self.info.alignment())?;
        self.memory.bind(Region::owned(backing));
        Ok(())
    }

    fn check<T: Element>(&self) -> Result<(), TensorError> {
        if T::DTYPE != self.dtype() {
            return Err(TensorError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype(),
            });
        }
        Ok(())
    }

    /// Copies out the whole storage, padding included.
    pub fn read_all<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        self.check::<T>()?;
        let bytes = self.memory.read()?;
        Ok(bytes
            .chunks_exact(std::mem::size_of::<T>())
            .take(self.info.total_elements())
            .map(T::from_ne_slice)
            .collect())
    }

    /// Overwrites the whole storage, padding included.
    pub fn write_all<T: Element>(&self, values: &[T]) -> Result<(), TensorError> {
        self.check::<T>()?;
        let expected = self.info.total_elements();
        if values.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        let mut bytes = self.memory.write()?;
        for (chunk, value) in bytes.chunks_exact_mut(std::mem::size_of::<T>()).zip(values) {
            value.write_ne_slice(chunk);
        }
        Ok(())
    }

    /// Copies out the valid region in row-major order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        let all = self.read_all::<T>()?;
        let (rows, cols) = (self.shape().rows(), self.shape().cols());
        let (prow, pcol) = (self.info.padded_rows(), self.info.padded_cols());
        let pad = self.info.padding();

        let mut out = Vec::with_capacity(self.shape().num_elements());
        for plane in all.chunks_exact(prow * pcol) {
            for r in 0..rows {
                let start = (r + pad.top) * pcol + pad.left;
                out.extend_from_slice(&plane[start..start + cols]);
            }
        }
        Ok(out)
    }

    /// Overwrites the valid region from row-major `values`; padding is kept.
    pub fn copy_from_slice<T: Element>(&self, values: &[T]) -> Result<(), TensorError> {
        self.check::<T>()?;
        let expected = self.shape().num_elements();
        if values.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        if self.info.padding().is_empty() {
            return self.write_all(values);
        }

        let mut all = self.read_all::<T>()?;
        let (rows, cols) = (self.shape().rows(), self.shape().cols());
        let (prow, pcol) = (self.info.padded_rows(), self.info.padded_cols());
        let pad = self.info.padding();
        for (plane, src) in all
            .chunks_exact_mut(prow * pcol)
            .zip(values.chunks_exact(rows * cols))
        {
            for (r, row) in src.chunks_exact(cols).enumerate() {
                let start = (r + pad.top) * pcol + pad.left;
                plane[start..start + cols].copy_from_slice(row);
            }
        }
        self.write_all(&all)
    }

    /// Sets every stored element, padding included, to `value`.
    pub fn fill<T: Element>(&self, value: T) -> Result<(), TensorError> {
        self.write_all(&vec![value; self.info.total_elements()])
    }
}

impl Memoryable for Tensor {
    fn memoryable_id(&self) -> MemoryableId {
        self.id
    }

    fn memory(&self) -> &MemoryHandle {
        &self.memory
    }

    fn required_size(&self) -> usize {
        self.info.total_size()
    }

    fn alignment(&self) -> usize {
        self.info.alignment()
    }
}
