// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptors whose storage is managed by memory groups.
//!
//! This crate provides:
//! - [`Shape`], [`DType`] and [`TensorInfo`] — what a tensor looks like,
//!   including padding and storage alignment.
//! - [`Tensor`] — a [`Memoryable`](memory_manager::Memoryable) descriptor
//!   with typed, checked access to whatever storage is bound to it.
//! - [`BorderSize`] / [`BorderMode`] — kernel reach and edge handling.
//! - [`KeyPoint`] / [`KeyPointArray`] — feature detector output.
//!
//! # Design Goals
//! - Shapes are fixed at configure time; storage arrives later.
//! - No `unsafe`: typed access copies through [`Element`].
//! - Clean error types via `thiserror`.

mod border;
mod dtype;
mod error;
mod info;
mod keypoint;
mod shape;
mod tensor;

pub use border::{BorderMode, BorderSize};
pub use dtype::{DType, Element};
pub use error::TensorError;
pub use info::{TensorInfo, DEFAULT_ALIGNMENT};
pub use keypoint::{KeyPoint, KeyPointArray};
pub use shape::Shape;
pub use tensor::Tensor;
