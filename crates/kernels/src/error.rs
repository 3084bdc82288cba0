// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for kernels.

use memory_manager::MemoryError;
use tensor_core::TensorError;

/// Errors raised while configuring or running a kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A kernel was configured with arguments it cannot work with.
    #[error("{kernel}: {detail}")]
    InvalidArgument { kernel: &'static str, detail: String },

    /// The worker pool of an execution context could not be created.
    #[error("failed to build a {threads}-thread execution context: {detail}")]
    ThreadPool { threads: usize, detail: String },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl KernelError {
    pub(crate) fn invalid(kernel: &'static str, detail: impl Into<String>) -> Self {
        KernelError::InvalidArgument {
            kernel,
            detail: detail.into(),
        }
    }
}
