// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pointwise activations: ReLU, sigmoid, GELU and hard-swish.

use super::check_len;
use crate::TensorError;

/// Coefficient `sqrt(2/π)`.
const SQRT_2_OVER_PI: f32 = 0.7978845608;

/// Cubic coefficient in the tanh approximation.
const GELU_COEFF: f32 = 0.044715;

fn map_unary(
    op: &'static str,
    input: &[f32],
    output: &mut [f32],
    f: impl Fn(f32) -> f32,
) -> Result<(), TensorError> {
    check_len(op, input.len(), output.len())?;
    for (d, &x) in output.iter_mut().zip(input.iter()) {
        *d = f(x);
    }
    Ok(())
}

/// `max(x, 0)` element-wise.
pub fn relu(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("relu", input, output, |x| if x > 0.0 { x } else { 0.0 })
}

/// `1 / (1 + exp(-x))` element-wise.
pub fn sigmoid(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("sigmoid", input, output, |x| 1.0 / (1.0 + (-x).exp()))
}

/// GELU with the tanh approximation:
///
/// `GELU(x) ≈ 0.5 * x * (1 + tanh(sqrt(2/π) * (x + 0.044715 * x³)))`
pub fn gelu(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("gelu", input, output, gelu_scalar)
}

/// `x * relu6(x + 3) / 6` element-wise.
pub fn hard_swish(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("hard_swish", input, output, |x| x * (x + 3.0).clamp(0.0, 6.0) / 6.0)
}

#[inline(always)]
fn gelu_scalar(x: f32) -> f32 {
    let inner = SQRT_2_OVER_PI * (x + GELU_COEFF * x * x * x);
    0.5 * x * (1.0 + inner.tanh())
}
