// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax along an arbitrary axis.

use super::check_len;
use crate::{Shape, TensorError};

/// Computes softmax along `axis` of a tensor laid out as `shape`.
///
/// Uses the numerically stable variant that subtracts the maximum value
/// before exponentiation. The tensor is viewed as `[outer, axis, inner]`.
///
/// # Errors
/// [`TensorError::InvalidAxis`] if `axis >= shape.rank()`,
/// [`TensorError::LengthMismatch`] if a buffer does not match `shape`.
pub fn softmax(
    input: &[f32],
    shape: &Shape,
    axis: usize,
    output: &mut [f32],
) -> Result<(), TensorError> {
    let dims = shape.dims();
    if axis >= dims.len() {
        return Err(TensorError::InvalidAxis {
            op: "softmax",
            axis,
            rank: dims.len(),
        });
    }
    check_len("softmax", shape.num_elements(), input.len())?;
    check_len("softmax", shape.num_elements(), output.len())?;

    let axis_len = dims[axis];
    let inner: usize = dims[axis + 1..].iter().product();
    let outer: usize = dims[..axis].iter().product();
    if axis_len == 0 {
        return Ok(());
    }

    for o in 0..outer {
        for i in 0..inner {
            let base = o * axis_len * inner + i;
            let at = |k: usize| base + k * inner;

            let max_val = (0..axis_len)
                .map(|k| input[at(k)])
                .fold(f32::NEG_INFINITY, f32::max);

            let mut sum = 0.0f32;
            for k in 0..axis_len {
                let e = (input[at(k)] - max_val).exp();
                output[at(k)] = e;
                sum += e;
            }

            if sum > 0.0 {
                let inv_sum = 1.0 / sum;
                for k in 0..axis_len {
                    output[at(k)] *= inv_sum;
                }
            }
        }
    }

    Ok(())
}
