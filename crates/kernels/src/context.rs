// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The explicit scheduler kernels split their work over.
//!
//! An [`ExecutionContext`] is created once and handed to every function at
//! configure time. Kernels only parallelise across rows of their output;
//! every row is computed independently, so results do not depend on the
//! number of threads.

use crate::KernelError;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Runs row-parallel kernel bodies inline or on a dedicated rayon pool.
#[derive(Clone)]
pub struct ExecutionContext {
    pool: Option<Arc<rayon::ThreadPool>>,
    num_threads: usize,
}

impl ExecutionContext {
    /// A context with `num_threads` workers; 0 and 1 both run inline.
    pub fn new(num_threads: usize) -> Result<Self, KernelError> {
        if num_threads <= 1 {
            return Ok(Self::single_threaded());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("compute-rt-worker-{i}"))
            .build()
            .map_err(|e| KernelError::ThreadPool {
                threads: num_threads,
                detail: e.to_string(),
            })?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
            num_threads,
        })
    }

    /// Runs everything on the calling thread.
    pub fn single_threaded() -> Self {
        Self {
            pool: None,
            num_threads: 1,
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Calls `f(row_index, row)` for every `row_len`-sized row of `out`.
    pub fn for_each_row<T, F>(&self, out: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        if row_len == 0 {
            return;
        }
        match &self.pool {
            Some(pool) => pool.install(|| {
                out.par_chunks_mut(row_len)
                    .enumerate()
                    .for_each(|(r, row)| f(r, row))
            }),
            None => out
                .chunks_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row)),
        }
    }

    /// Evaluates `f` for rows `0..rows`, keeping row order in the result.
    pub fn map_rows<R, F>(&self, rows: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| (0..rows).into_par_iter().map(&f).collect()),
            None => (0..rows).map(f).collect(),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::single_threaded()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("num_threads", &self.num_threads)
            .finish()
    }
}
