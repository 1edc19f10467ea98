// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model description parsing.
//!
//! # Format
//! ```json
//! {
//!   "name": "tiny-mlp",
//!   "precision": "f32",
//!   "inputs": { "x": [1, 8] },
//!   "outputs": ["prob"],
//!   "layers": [
//!     { "name": "fc1", "type": "inner_product", "inputs": ["x"], "outputs": ["h"],
//!       "param": { "kind": "inner_product", "num_output": 4 } },
//!     { "name": "act", "type": "relu", "inputs": ["h"], "outputs": ["a"] },
//!     { "name": "sm", "type": "softmax", "inputs": ["a"], "outputs": ["prob"],
//!       "param": { "kind": "softmax", "axis": 1 } }
//!   ],
//!   "resources": {
//!     "fc1": {
//!       "weight": { "shape": [4, 8], "data": [ ... ] },
//!       "bias":   { "shape": [4],    "data": [ ... ] }
//!     }
//!   }
//! }
//! ```

use crate::{LayerParam, LayerType, ModelError};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tensor_core::{DType, Tensor};

/// Top-level model description, deserialized from JSON.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Human-readable network name.
    pub name: String,
    /// Precision the model was exported with (e.g., `"f32"`, `"f16"`).
    #[serde(default = "default_precision")]
    pub precision: String,
    /// Network inputs and their default `[N, ...]` shapes.
    pub inputs: BTreeMap<String, Vec<usize>>,
    /// Blob names exposed as network outputs.
    pub outputs: Vec<String>,
    /// Layers in execution order.
    pub layers: Vec<ManifestLayer>,
    /// Layer weights, keyed by layer name and then by weight role.
    #[serde(default)]
    pub resources: BTreeMap<String, BTreeMap<String, Tensor>>,
}

fn default_precision() -> String {
    "f32".to_string()
}

/// A single layer entry in the description.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestLayer {
    pub name: String,
    /// Layer type string; aliases accepted (see [`LayerType::from_str_loose`]).
    #[serde(rename = "type")]
    pub layer_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub param: LayerParam,
}

impl ModelManifest {
    /// Loads a description from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Parses a description from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Serializes the description to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates that the description is internally consistent.
    ///
    /// Checks:
    /// - At least one layer is defined.
    /// - The precision string is valid.
    /// - All layer type strings are recognised.
    /// - No duplicate layer names.
    /// - Every resource entry belongs to a declared layer.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::InvalidGraph("manifest contains no layers".into()));
        }

        self.dtype()?;

        let mut seen_names = HashSet::new();
        for layer in &self.layers {
            if !seen_names.insert(layer.name.as_str()) {
                return Err(ModelError::InvalidLayer {
                    layer: layer.name.clone(),
                    detail: "duplicate layer name".into(),
                });
            }

            if LayerType::from_str_loose(&layer.layer_type).is_none() {
                return Err(ModelError::UnknownLayerType {
                    layer: layer.name.clone(),
                    layer_type: layer.layer_type.clone(),
                });
            }
        }

        for layer in self.resources.keys() {
            if !seen_names.contains(layer.as_str()) {
                tracing::warn!("manifest carries resources for unknown layer '{layer}'");
            }
        }

        Ok(())
    }

    /// Returns the parsed precision.
    pub fn dtype(&self) -> Result<DType, ModelError> {
        DType::parse(&self.precision).ok_or_else(|| ModelError::InvalidLayer {
            layer: self.name.clone(),
            detail: format!("unsupported precision '{}'", self.precision),
        })
    }

    /// Returns the total number of weight tensors across all layers.
    pub fn total_weight_count(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }
}
