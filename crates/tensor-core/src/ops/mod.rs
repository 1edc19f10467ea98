// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference compute kernels.
//!
//! Every kernel writes into a caller-provided output slice and validates
//! lengths up front, so an engine can run them over pre-bound device memory.

mod activation_op;
mod eltwise_op;
mod inner_product_op;
mod layer_norm_op;
mod softmax_op;

pub use activation_op::{gelu, hard_swish, relu, sigmoid};
pub use eltwise_op::add;
pub use inner_product_op::inner_product;
pub use layer_norm_op::layer_norm;
pub use softmax_op::softmax;

use crate::TensorError;

/// Checks that `actual` equals `expected`, naming the kernel on failure.
pub(crate) fn check_len(op: &'static str, expected: usize, actual: usize) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::LengthMismatch {
            op,
            expected,
            actual,
        });
    }
    Ok(())
}
