// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The runtime facade: one execution context, one allocator and the memory
//! manager(s) every function configured through it draws from.
//!
//! ```text
//! RuntimeConfig ─► Runtime::new()
//!                     │  harris_corners() / gemm()   (configure)
//!                     ▼
//!                  populate()                        (size pools)
//!                     │  Function::run()             (acquire ─ kernels ─ release)
//!                     ▼
//!                  clear()
//! ```

use crate::{Gemm, GemmInfo, HarrisCorners, HarrisParams, RuntimeConfig, RuntimeError};
use kernels::ExecutionContext;
use memory_manager::{Allocator, AllocatorStats, DefaultAllocator, MemoryGroup, MemoryManager};
use std::sync::Arc;
use tensor_core::{KeyPointArray, Tensor};
use tracing::info;

/// Shared state for configuring and running composite functions.
///
/// # Example
/// ```
/// use runtime::{Function, HarrisParams, Runtime, RuntimeConfig};
/// use tensor_core::{KeyPointArray, Shape, Tensor};
///
/// let rt = Runtime::new(RuntimeConfig { num_threads: Some(1), ..Default::default() }).unwrap();
/// let image = Tensor::from_slice(Shape::matrix(8, 8), &[0u8; 64]).unwrap();
/// let corners = KeyPointArray::new(16);
/// let mut harris = rt.harris_corners(&image, HarrisParams::default(), &corners).unwrap();
///
/// rt.populate().unwrap();
/// harris.run().unwrap();
/// rt.clear().unwrap();
/// assert!(corners.is_empty());
/// ```
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    ctx: ExecutionContext,
    allocator: Arc<dyn Allocator>,
    manager: Arc<MemoryManager>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let allocator: Arc<dyn Allocator> = match config.parse_budget()? {
            Some(budget) => {
                info!("memory budget: {budget}");
                Arc::new(DefaultAllocator::with_budget(budget))
            }
            None => Arc::new(DefaultAllocator::new()),
        };
        let ctx = ExecutionContext::new(config.resolve_threads())?;
        let manager = Arc::new(MemoryManager::new(config.lifetime_strategy));
        info!(
            threads = ctx.num_threads(),
            strategy = %config.lifetime_strategy,
            num_pools = config.num_pools,
            shared = config.share_memory_manager,
            "runtime created"
        );
        Ok(Self {
            config,
            ctx,
            allocator,
            manager,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// The shared memory manager.
    pub fn memory_manager(&self) -> &Arc<MemoryManager> {
        &self.manager
    }

    /// A fresh group for one function. With `share_memory_manager` off it
    /// gets a private manager that populates itself on first acquire.
    pub fn memory_group(&self) -> MemoryGroup {
        let manager = if self.config.share_memory_manager {
            Arc::clone(&self.manager)
        } else {
            Arc::new(MemoryManager::new(self.config.lifetime_strategy))
        };
        MemoryGroup::with_allocator(Some(manager), Arc::clone(&self.allocator))
    }

    pub fn harris_corners(
        &self,
        input: &Tensor,
        params: HarrisParams,
        corners: &KeyPointArray,
    ) -> Result<HarrisCorners, RuntimeError> {
        HarrisCorners::configure(&self.ctx, self.memory_group(), input, params, corners)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn gemm(
        &self,
        a: &Tensor,
        b: &Tensor,
        c: Option<&Tensor>,
        d: &Tensor,
        alpha: f32,
        beta: f32,
        info: GemmInfo,
    ) -> Result<Gemm, RuntimeError> {
        Gemm::configure(&self.ctx, self.memory_group(), a, b, c, d, alpha, beta, info)
    }

    /// Creates the configured number of pools in the shared manager.
    ///
    /// Call after every function is configured. With `num_pools = 0` this
    /// does nothing and the first acquiring group populates one pool.
    pub fn populate(&self) -> Result<(), RuntimeError> {
        if self.config.num_pools == 0 {
            return Ok(());
        }
        self.manager
            .populate(Arc::clone(&self.allocator), self.config.num_pools)?;
        info!(
            num_pools = self.config.num_pools,
            footprint = self.manager.pool_manager().total_footprint(),
            "pools populated"
        );
        Ok(())
    }

    /// Frees the shared manager's pools.
    pub fn clear(&self) -> Result<(), RuntimeError> {
        self.manager.clear()?;
        Ok(())
    }

    pub fn allocator_stats(&self) -> AllocatorStats {
        self.allocator.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_manager::MemoryError;
    use tensor_core::{DType, Shape};

    fn config(num_pools: usize) -> RuntimeConfig {
        RuntimeConfig {
            num_pools,
            num_threads: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let bad = RuntimeConfig {
            memory_budget: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(Runtime::new(bad), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_groups_share_manager() {
        let rt = Runtime::new(config(1)).unwrap();
        let g = rt.memory_group();
        assert!(Arc::ptr_eq(g.manager().unwrap(), rt.memory_manager()));

        let private = Runtime::new(RuntimeConfig {
            share_memory_manager: false,
            ..config(1)
        })
        .unwrap();
        let g = private.memory_group();
        assert!(!Arc::ptr_eq(g.manager().unwrap(), private.memory_manager()));
    }

    #[test]
    fn test_populate_and_clear() {
        let rt = Runtime::new(config(2)).unwrap();
        let t = Tensor::new(tensor_core::TensorInfo::new(Shape::matrix(4, 64), DType::U8));
        let mut group = rt.memory_group();
        group.manage(&t).unwrap();
        group.allocate(&t).unwrap();

        rt.populate().unwrap();
        assert_eq!(rt.memory_manager().pool_manager().num_pools(), 2);
        assert_eq!(rt.allocator_stats().live_bytes, 512);
        assert!(matches!(
            rt.populate(),
            Err(RuntimeError::Memory(MemoryError::PoolsAlreadyPopulated { .. }))
        ));

        rt.clear().unwrap();
        assert_eq!(rt.allocator_stats().live_bytes, 0);
    }

    #[test]
    fn test_lazy_populate_is_noop() {
        let rt = Runtime::new(config(0)).unwrap();
        rt.populate().unwrap();
        assert_eq!(rt.memory_manager().pool_manager().num_pools(), 0);
    }
}
