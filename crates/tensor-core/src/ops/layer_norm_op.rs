// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer normalization over the innermost dimension.

use super::check_len;
use crate::TensorError;

/// Applies layer normalization over rows of length `norm_len`:
///
/// `output = gamma * (x - mean) / sqrt(var + eps) + beta`
///
/// `gamma` and `beta` must both hold `norm_len` values; `input.len()` must be
/// a multiple of `norm_len`.
pub fn layer_norm(
    input: &[f32],
    norm_len: usize,
    gamma: &[f32],
    beta: &[f32],
    eps: f32,
    output: &mut [f32],
) -> Result<(), TensorError> {
    check_len("layer_norm (output)", input.len(), output.len())?;
    check_len("layer_norm (gamma)", norm_len, gamma.len())?;
    check_len("layer_norm (beta)", norm_len, beta.len())?;
    if norm_len == 0 || input.len() % norm_len != 0 {
        return Err(TensorError::LengthMismatch {
            op: "layer_norm (rows)",
            expected: norm_len,
            actual: input.len(),
        });
    }

    for (row_src, row_dst) in input.chunks(norm_len).zip(output.chunks_mut(norm_len)) {
        let mean: f32 = row_src.iter().sum::<f32>() / norm_len as f32;
        let var: f32 = row_src.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / norm_len as f32;
        let inv_std = 1.0 / (var + eps).sqrt();

        for (j, (d, &x)) in row_dst.iter_mut().zip(row_src.iter()).enumerate() {
            *d = gamma[j] * (x - mean) * inv_std + beta[j];
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_rows() {
        let input = [1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 10.0, 10.0];
        let mut out = [0.0; 8];
        layer_norm(&input, 4, &[1.0; 4], &[0.0; 4], 1e-5, &mut out).unwrap();

        let mean: f32 = out[..4].iter().sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5);
        // Constant row normalizes to beta.
        assert!(out[4..].iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_scale_and_shift() {
        let mut out = [0.0; 2];
        layer_norm(&[-1.0, 1.0], 2, &[2.0, 2.0], &[0.5, 0.5], 0.0, &mut out).unwrap();
        assert!((out[0] - (-1.5)).abs() < 1e-5);
        assert!((out[1] - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_gamma_length_checked() {
        let mut out = [0.0; 4];
        assert!(layer_norm(&[0.0; 4], 4, &[1.0; 3], &[0.0; 4], 1e-5, &mut out).is_err());
    }
}
