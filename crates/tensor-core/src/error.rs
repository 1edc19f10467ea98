// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction and kernels.

use crate::Shape;

/// Errors that can occur in tensor construction or kernel execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TensorError {
    /// The number of values does not match the element count of the shape.
    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// A kernel received buffers of inconsistent lengths.
    #[error("length mismatch in {op}: expected {expected}, got {actual}")]
    LengthMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Two shapes are incompatible for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested axis does not exist for the given rank.
    #[error("axis {axis} out of range for {op} on rank-{rank} input")]
    InvalidAxis {
        op: &'static str,
        axis: usize,
        rank: usize,
    },
}
