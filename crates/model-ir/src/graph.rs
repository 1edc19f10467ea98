// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network structure: the ordered layer list plus declared inputs/outputs.
//!
//! # Type-State Pattern
//!
//! ```text
//! NetStructure<Loaded>    : parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! NetStructure<Validated> : data flow verified, ready to compile.
//! ```
//!
//! Only a validated structure can be handed to a network compiler. In a
//! validated structure every blob a layer reads is either a declared input or
//! produced by an *earlier* layer, so declaration order is a topological order.

use crate::{LayerSpec, ModelError};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: structure has been parsed but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: structure has been validated.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for structure states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── NetStructure ───────────────────────────────────────────────────

/// The network as an ordered sequence of layers over named blobs.
///
/// Maps are ordered so that iteration (and anything hashed from it) is
/// deterministic.
#[derive(Debug, Clone)]
pub struct NetStructure<S: GraphState = Loaded> {
    /// Human-readable network name.
    pub name: String,
    /// Declared network inputs and their full `[N, ...]` shapes.
    pub inputs_shape_map: BTreeMap<String, Vec<usize>>,
    /// Names of the blobs exposed as network outputs.
    pub outputs: BTreeSet<String>,
    /// Layers in declaration (execution) order.
    pub layers: Vec<LayerSpec>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl NetStructure<Loaded> {
    /// Creates a new structure in the `Loaded` state.
    pub fn new(
        name: impl Into<String>,
        inputs_shape_map: BTreeMap<String, Vec<usize>>,
        outputs: BTreeSet<String>,
        layers: Vec<LayerSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs_shape_map,
            outputs,
            layers,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the data flow and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - At least one input and one layer.
    /// - Layer names are unique.
    /// - Each layer has the input arity its type requires and at least one output.
    /// - Every blob read is a declared input or an earlier layer's output.
    /// - Every blob is produced at most once, and never over a declared input.
    /// - Every declared output names a known blob that is not a network input.
    pub fn validate(self) -> Result<NetStructure<Validated>, ModelError> {
        if self.inputs_shape_map.is_empty() {
            return Err(ModelError::InvalidGraph("network declares no inputs".into()));
        }
        if self.layers.is_empty() {
            return Err(ModelError::InvalidGraph("network contains no layers".into()));
        }

        let mut known: HashSet<&str> = self.inputs_shape_map.keys().map(String::as_str).collect();
        let mut layer_names = HashSet::new();

        for layer in &self.layers {
            if !layer_names.insert(layer.name.as_str()) {
                return Err(invalid(layer, "duplicate layer name".into()));
            }

            let arity = layer.layer_type.num_inputs();
            if layer.inputs.len() != arity {
                return Err(invalid(
                    layer,
                    format!("expects {arity} input(s), got {}", layer.inputs.len()),
                ));
            }
            if layer.outputs.is_empty() {
                return Err(invalid(layer, "declares no outputs".into()));
            }

            for input in &layer.inputs {
                if !known.contains(input.as_str()) {
                    return Err(invalid(
                        layer,
                        format!("input blob '{input}' is not produced by any earlier layer"),
                    ));
                }
            }

            for output in &layer.outputs {
                if !known.insert(output.as_str()) {
                    return Err(invalid(
                        layer,
                        format!("output blob '{output}' is already defined"),
                    ));
                }
            }
        }

        for output in &self.outputs {
            if self.inputs_shape_map.contains_key(output) {
                return Err(ModelError::InvalidGraph(format!(
                    "output '{output}' is a network input"
                )));
            }
            if !known.contains(output.as_str()) {
                return Err(ModelError::InvalidGraph(format!(
                    "network output '{output}' is not produced by any layer"
                )));
            }
        }

        Ok(NetStructure {
            name: self.name,
            inputs_shape_map: self.inputs_shape_map,
            outputs: self.outputs,
            layers: self.layers,
            _state: std::marker::PhantomData,
        })
    }
}

fn invalid(layer: &LayerSpec, detail: String) -> ModelError {
    ModelError::InvalidLayer {
        layer: layer.name.clone(),
        detail,
    }
}

// ── Validated state ────────────────────────────────────────────────

impl NetStructure<Validated> {
    /// Returns the total number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Returns an iterator over the layers in execution order.
    pub fn iter_layers(&self) -> impl Iterator<Item = &LayerSpec> {
        self.layers.iter()
    }

    /// Returns a layer by name.
    pub fn layer(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// All blob names: declared inputs first, then layer outputs in order.
    pub fn blob_names(&self) -> Vec<&str> {
        self.inputs_shape_map
            .keys()
            .map(String::as_str)
            .chain(
                self.layers
                    .iter()
                    .flat_map(|l| l.outputs.iter().map(String::as_str)),
            )
            .collect()
    }

    /// Returns a summary string describing the network.
    pub fn summary(&self) -> String {
        format!(
            "Network '{}': {} layers, {} inputs, {} outputs",
            self.name,
            self.num_layers(),
            self.inputs_shape_map.len(),
            self.outputs.len(),
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for NetStructure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NetStructure '{}' ({} layers):", self.name, self.layers.len())?;
        for (name, dims) in &self.inputs_shape_map {
            writeln!(f, "  input {name}: {dims:?}")?;
        }
        for layer in &self.layers {
            writeln!(f, "  {}", layer.summary())?;
        }
        for output in &self.outputs {
            writeln!(f, "  output {output}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayerType;

    fn chain() -> NetStructure<Loaded> {
        NetStructure::new(
            "chain",
            BTreeMap::from([("x".to_string(), vec![1, 4])]),
            BTreeSet::from(["z".to_string()]),
            vec![
                LayerSpec::new("relu", LayerType::Relu, &["x"], &["y"]),
                LayerSpec::new("sig", LayerType::Sigmoid, &["y"], &["z"]),
            ],
        )
    }

    #[test]
    fn test_validate_ok() {
        let validated = chain().validate().unwrap();
        assert_eq!(validated.num_layers(), 2);
        assert_eq!(validated.blob_names(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_validate_no_layers() {
        let mut s = chain();
        s.layers.clear();
        assert!(matches!(s.validate(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_validate_no_inputs() {
        let mut s = chain();
        s.inputs_shape_map.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_dangling_input() {
        let mut s = chain();
        s.layers[1].inputs = vec!["missing".into()];
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_out_of_order() {
        let mut s = chain();
        s.layers.swap(0, 1);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_producer() {
        let mut s = chain();
        s.layers[1].outputs = vec!["y".into()];
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_bad_arity() {
        let mut s = chain();
        s.layers.push(LayerSpec::new("sum", LayerType::Add, &["z"], &["w"]));
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("expects 2 input(s)"));
    }

    #[test]
    fn test_validate_unknown_output() {
        let mut s = chain();
        s.outputs.insert("nope".into());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_input_as_output() {
        let mut s = chain();
        s.outputs.insert("x".into());
        let err = s.validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidGraph(_)));
        assert!(err.to_string().contains("output 'x' is a network input"));
    }

    #[test]
    fn test_layer_lookup_and_display() {
        let validated = chain().validate().unwrap();
        assert_eq!(validated.layer("sig").unwrap().layer_type, LayerType::Sigmoid);
        assert!(validated.layer("none").is_none());
        let display = format!("{validated}");
        assert!(display.contains("relu (relu): [x] -> [y]"));
        assert!(validated.summary().contains("2 layers"));
    }
}
