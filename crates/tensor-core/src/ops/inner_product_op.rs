// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inner product (fully connected) over a flattened sample.

use super::check_len;
use crate::TensorError;

/// Computes `output[o] = sum_k weight[o, k] * input[k] + bias[o]`.
///
/// `weight` is row-major `[num_output, input.len()]`; `bias`, when present,
/// holds `num_output` values.
pub fn inner_product(
    input: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
    output: &mut [f32],
) -> Result<(), TensorError> {
    let k = input.len();
    let num_output = output.len();
    check_len("inner_product (weight)", num_output * k, weight.len())?;
    if let Some(b) = bias {
        check_len("inner_product (bias)", num_output, b.len())?;
    }

    for (o, dst) in output.iter_mut().enumerate() {
        let row = &weight[o * k..(o + 1) * k];
        let acc: f32 = row.iter().zip(input.iter()).map(|(w, x)| w * x).sum();
        *dst = acc + bias.map_or(0.0, |b| b[o]);
    }

    Ok(())
}
