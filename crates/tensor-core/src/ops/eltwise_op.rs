// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary element-wise operations.

use super::check_len;
use crate::TensorError;

/// `output = lhs + rhs` for equally sized buffers.
pub fn add(lhs: &[f32], rhs: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    check_len("add", lhs.len(), rhs.len())?;
    check_len("add", lhs.len(), output.len())?;
    for ((d, a), b) in output.iter_mut().zip(lhs).zip(rhs) {
        *d = a + b;
    }
    Ok(())
}
