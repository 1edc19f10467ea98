// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Content fingerprint naming a compiled engine in the cache.
//!
//! The key is a SHA-256 over everything that can change the compiled
//! engine: layer graph and parameters, weights, input shapes, device
//! identity, build configuration and precision. Every field is written
//! length-prefixed so adjacent fields cannot alias.

use accelerator::BuildConfig;
use model_ir::graph::Validated;
use model_ir::{LayerParam, NetResource, NetStructure};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

const DOMAIN_TAG: &str = "trt-engine-cache/v1";

/// Lowercase hex SHA-256, 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub const LEN: usize = 64;

    pub fn compute(
        structure: &NetStructure<Validated>,
        resource: &NetResource,
        input_shapes: &BTreeMap<String, Vec<usize>>,
        device_identity: &str,
        config: &BuildConfig,
    ) -> Self {
        let mut h = Fingerprint::new();
        h.str(DOMAIN_TAG);

        h.str(&structure.name);
        h.len(structure.layers.len());
        for layer in structure.iter_layers() {
            h.str(&layer.name);
            h.str(layer.layer_type.as_str());
            h.strs(&layer.inputs);
            h.strs(&layer.outputs);
            h.param(&layer.param);
        }
        h.strs(structure.outputs.iter());

        // Weights, in layer order then role order.
        h.str(&resource.precision.to_string());
        for layer in structure.iter_layers() {
            let Some(res) = resource.resource(&layer.name) else {
                h.len(0);
                continue;
            };
            h.len(res.weights.len());
            for (role, tensor) in &res.weights {
                h.str(role);
                h.dims(tensor.shape().dims());
                for word in tensor.le_bytes() {
                    h.0.update(word);
                }
            }
        }

        h.len(input_shapes.len());
        for (name, dims) in input_shapes {
            h.str(name);
            h.dims(dims);
        }

        h.str(device_identity);
        h.len(config.max_batch_size);
        h.len(config.max_workspace_size);

        Self(h.finish())
    }

    /// Accepts a previously rendered key.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == Self::LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the cache file holding this engine.
    pub fn file_name(&self) -> String {
        format!("{}.engine", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Fingerprint(Sha256);

impl Fingerprint {
    fn new() -> Self {
        Self(Sha256::new())
    }

    fn len(&mut self, n: usize) {
        self.0.update((n as u64).to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.len(s.len());
        self.0.update(s.as_bytes());
    }

    fn strs<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: ExactSizeIterator,
        S: AsRef<str>,
    {
        let items = items.into_iter();
        self.len(items.len());
        for s in items {
            self.str(s.as_ref());
        }
    }

    fn dims(&mut self, dims: &[usize]) {
        self.len(dims.len());
        for &d in dims {
            self.len(d);
        }
    }

    fn param(&mut self, param: &LayerParam) {
        match *param {
            LayerParam::None => self.str("none"),
            LayerParam::Softmax { axis } => {
                self.str("softmax");
                self.len(axis);
            }
            LayerParam::LayerNorm { eps } => {
                self.str("layer_norm");
                self.0.update(eps.to_le_bytes());
            }
            LayerParam::InnerProduct { num_output, has_bias } => {
                self.str("inner_product");
                self.len(num_output);
                self.0.update([has_bias as u8]);
            }
        }
    }

    fn finish(self) -> String {
        self.0
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{DefaultModelInterpreter, ModelInterpreter};
    use std::sync::Arc;
    use tensor_core::{DType, Shape, Tensor};

    const MODEL: &str = r#"{
        "name": "tiny",
        "precision": "f32",
        "inputs": { "x": [1, 3] },
        "outputs": ["y"],
        "layers": [
            { "name": "fc", "type": "inner_product", "inputs": ["x"], "outputs": ["y"],
              "param": { "kind": "inner_product", "num_output": 2, "has_bias": false } }
        ],
        "resources": {
            "fc": { "weight": { "shape": [2, 3], "data": [1, 0, 0, 0, 1, 0] } }
        }
    }"#;

    fn key_with(
        interp: &DefaultModelInterpreter,
        resource: &NetResource,
        dims: Vec<usize>,
        identity: &str,
        max_batch: usize,
    ) -> CacheKey {
        let shapes = BTreeMap::from([("x".to_string(), dims)]);
        let config = BuildConfig {
            max_batch_size: max_batch,
            max_workspace_size: 1 << 20,
        };
        CacheKey::compute(interp.net_structure().unwrap(), resource, &shapes, identity, &config)
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let interp = DefaultModelInterpreter::from_json(MODEL).unwrap();
        let res = interp.net_resource().unwrap().clone();

        let base = key_with(&interp, &res, vec![1, 3], "dev:0", 1);
        assert_eq!(base, key_with(&interp, &res, vec![1, 3], "dev:0", 1));
        assert_eq!(base.as_str().len(), CacheKey::LEN);

        assert_ne!(base, key_with(&interp, &res, vec![2, 3], "dev:0", 2));
        assert_ne!(base, key_with(&interp, &res, vec![1, 3], "dev:1", 1));
        assert_ne!(base, key_with(&interp, &res, vec![1, 3], "dev:0", 4));

        let mut other_weights = res.clone();
        let changed = other_weights.resource("fc").unwrap().as_ref().clone().with_weight(
            "weight",
            Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.5]).unwrap(),
        );
        other_weights.resource_map.insert("fc".into(), Arc::new(changed));
        assert_ne!(base, key_with(&interp, &other_weights, vec![1, 3], "dev:0", 1));

        let mut half = res.clone();
        half.precision = DType::F16;
        assert_ne!(base, key_with(&interp, &half, vec![1, 3], "dev:0", 1));
    }

    #[test]
    fn test_parse() {
        let key = CacheKey::parse(&"ab".repeat(32)).unwrap();
        assert_eq!(key.file_name(), format!("{}.engine", "ab".repeat(32)));
        assert!(CacheKey::parse("abc").is_none());
        assert!(CacheKey::parse(&"AB".repeat(32)).is_none());
    }
}
