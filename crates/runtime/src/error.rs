// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for composite functions and the runtime facade.

/// Errors raised while configuring or running a composite function.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The function rejected its arguments; retry with different ones.
    #[error("invalid configuration for '{function}': {detail}")]
    InvalidConfiguration { function: &'static str, detail: String },

    /// Configuration file or value problem.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("memory error: {0}")]
    Memory(#[from] memory_manager::MemoryError),

    #[error("tensor error: {0}")]
    Tensor(#[from] tensor_core::TensorError),

    #[error("kernel error: {0}")]
    Kernel(#[from] kernels::KernelError),
}

impl RuntimeError {
    pub(crate) fn invalid(function: &'static str, detail: impl Into<String>) -> Self {
        RuntimeError::InvalidConfiguration {
            function,
            detail: detail.into(),
        }
    }
}
