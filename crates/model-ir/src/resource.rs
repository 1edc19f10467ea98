// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer resources (weights) and the network-wide resource map.

use std::collections::BTreeMap;
use std::sync::Arc;
use tensor_core::{DType, Tensor};

/// The weights of one layer, keyed by role (`"weight"`, `"bias"`, `"scale"`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerResource {
    pub weights: BTreeMap<String, Tensor>,
}

impl LayerResource {
    /// Creates an empty resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named weight, builder style.
    pub fn with_weight(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.weights.insert(name.into(), tensor);
        self
    }

    /// Returns the weight with the given role, if present.
    pub fn weight(&self, name: &str) -> Option<&Tensor> {
        self.weights.get(name)
    }

    /// Total bytes held by all weights.
    pub fn size_bytes(&self) -> usize {
        self.weights.values().map(Tensor::size_bytes).sum()
    }
}

/// Resources for every layer, keyed by layer name, plus the model precision.
#[derive(Debug, Clone)]
pub struct NetResource {
    pub resource_map: BTreeMap<String, Arc<LayerResource>>,
    /// Precision declared by the model.
    pub precision: DType,
}

impl Default for NetResource {
    fn default() -> Self {
        Self {
            resource_map: BTreeMap::new(),
            precision: DType::F32,
        }
    }
}

impl NetResource {
    /// Returns the resource of the named layer.
    pub fn resource(&self, layer: &str) -> Option<Arc<LayerResource>> {
        self.resource_map.get(layer).cloned()
    }

    /// The dtype blobs are allocated with: `F16` for half-precision models,
    /// `F32` otherwise.
    pub fn data_type(&self) -> DType {
        match self.precision {
            DType::F16 => DType::F16,
            _ => DType::F32,
        }
    }

    /// Total bytes held by all layer weights.
    pub fn total_weight_bytes(&self) -> usize {
        self.resource_map.values().map(|r| r.size_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_data_type() {
        let mut res = NetResource::default();
        assert_eq!(res.data_type(), DType::F32);
        res.precision = DType::F16;
        assert_eq!(res.data_type(), DType::F16);
        res.precision = DType::I8;
        assert_eq!(res.data_type(), DType::F32);
    }

    #[test]
    fn test_weight_bytes() {
        let lr = LayerResource::new()
            .with_weight("weight", Tensor::zeros(Shape::matrix(4, 8)))
            .with_weight("bias", Tensor::zeros(Shape::vector(4)));
        assert_eq!(lr.size_bytes(), (32 + 4) * 4);
        assert!(lr.weight("bias").is_some());
        assert!(lr.weight("scale").is_none());

        let mut res = NetResource::default();
        res.resource_map.insert("fc".into(), Arc::new(lr));
        assert_eq!(res.total_weight_bytes(), 144);
        assert!(res.resource("fc").is_some());
    }
}
