// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Host-side tensor types and the reference compute kernels used by the
//! host accelerator device.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major `f32` tensor used for layer resources
//!   (weights) and for host copies of network inputs/outputs.
//! - [`Shape`]: dimension descriptors with stride and element-count helpers.
//! - [`DType`]: element types a blob may be allocated with.
//! - Slice kernels: [`relu`], [`sigmoid`], [`gelu`], [`hard_swish`],
//!   [`softmax`], [`layer_norm`], [`inner_product`], [`add`].
//!
//! # Design Goals
//! - Kernels operate on plain `&[f32]` / `&mut [f32]` so that an engine can
//!   run them directly over device-resident buffers.
//! - No heap allocation inside kernels.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use ops::{add, gelu, hard_swish, inner_product, layer_norm, relu, sigmoid, softmax};
pub use shape::Shape;
pub use tensor::Tensor;
