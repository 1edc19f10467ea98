// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model description parsing and structure validation.

/// Errors that can occur when working with network descriptions.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model description file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The model description JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// A layer definition is invalid (bad arity, duplicate name, ...).
    #[error("invalid layer '{layer}': {detail}")]
    InvalidLayer { layer: String, detail: String },

    /// A layer's type tag names no known layer type.
    #[error("layer '{layer}' has unrecognised type '{layer_type}'")]
    UnknownLayerType { layer: String, layer_type: String },

    /// The network structure is malformed (dangling blob, duplicate producer, ...).
    #[error("invalid network structure: {0}")]
    InvalidGraph(String),
}
