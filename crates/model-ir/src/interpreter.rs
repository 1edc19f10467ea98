// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model interpretation: turning a description into a validated
//! [`NetStructure`] plus its [`NetResource`].

use crate::graph::Validated;
use crate::{LayerResource, LayerSpec, LayerType, ModelError, ModelManifest, NetResource, NetStructure};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// Source of a parsed network for the compiler.
///
/// Either part may be absent (an interpreter that has not parsed anything
/// yet); consumers must treat that as a missing-parameter condition.
pub trait ModelInterpreter {
    /// The parsed, validated network structure.
    fn net_structure(&self) -> Option<&NetStructure<Validated>>;
    /// The per-layer resources.
    fn net_resource(&self) -> Option<&NetResource>;
}

/// Interpreter for the JSON model description.
///
/// # Example
/// ```no_run
/// use model_ir::{DefaultModelInterpreter, ModelInterpreter};
/// use std::path::Path;
///
/// let interp = DefaultModelInterpreter::from_file(Path::new("model.json")).unwrap();
/// println!("{}", interp.net_structure().unwrap().summary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultModelInterpreter {
    structure: Option<NetStructure<Validated>>,
    resource: Option<NetResource>,
}

impl DefaultModelInterpreter {
    /// Creates an interpreter that holds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an interpreter from already-built parts.
    pub fn from_parts(structure: Option<NetStructure<Validated>>, resource: Option<NetResource>) -> Self {
        Self {
            structure,
            resource,
        }
    }

    /// Loads and interprets a description file.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        Self::from_manifest(ModelManifest::from_file(path)?)
    }

    /// Interprets a description given as a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Self::from_manifest(ModelManifest::from_json(json)?)
    }

    /// Interprets a parsed description.
    ///
    /// Steps:
    /// 1. Validate the description.
    /// 2. Resolve layer type strings into [`LayerSpec`]s.
    /// 3. Build and validate the [`NetStructure`].
    /// 4. Collect weights into a [`NetResource`].
    pub fn from_manifest(manifest: ModelManifest) -> Result<Self, ModelError> {
        manifest.validate()?;
        let precision = manifest.dtype()?;

        let layers = manifest
            .layers
            .into_iter()
            .map(|l| {
                let layer_type =
                    LayerType::from_str_loose(&l.layer_type).ok_or_else(|| ModelError::UnknownLayerType {
                        layer: l.name.clone(),
                        layer_type: l.layer_type.clone(),
                    })?;
                Ok(LayerSpec {
                    name: l.name,
                    layer_type,
                    inputs: l.inputs,
                    outputs: l.outputs,
                    param: l.param,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let outputs: BTreeSet<String> = manifest.outputs.into_iter().collect();
        let structure = NetStructure::new(manifest.name, manifest.inputs, outputs, layers).validate()?;

        let resource_map: BTreeMap<String, Arc<LayerResource>> = manifest
            .resources
            .into_iter()
            .map(|(layer, weights)| (layer, Arc::new(LayerResource { weights })))
            .collect();

        tracing::debug!(
            "interpreted '{}': {} layers, {} layer resources",
            structure.name,
            structure.num_layers(),
            resource_map.len(),
        );

        Ok(Self {
            structure: Some(structure),
            resource: Some(NetResource {
                resource_map,
                precision,
            }),
        })
    }

    /// Removes the resource map, leaving only the structure.
    pub fn without_resource(mut self) -> Self {
        self.resource = None;
        self
    }
}

impl ModelInterpreter for DefaultModelInterpreter {
    fn net_structure(&self) -> Option<&NetStructure<Validated>> {
        self.structure.as_ref()
    }

    fn net_resource(&self) -> Option<&NetResource> {
        self.resource.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tests::sample_manifest_json;
    use tensor_core::DType;

    #[test]
    fn test_from_json() {
        let interp = DefaultModelInterpreter::from_json(sample_manifest_json()).unwrap();
        let s = interp.net_structure().unwrap();
        assert_eq!(s.num_layers(), 3);
        assert_eq!(s.layers[0].layer_type, LayerType::InnerProduct);
        assert!(s.outputs.contains("prob"));

        let r = interp.net_resource().unwrap();
        assert_eq!(r.precision, DType::F32);
        let fc = r.resource("fc1").unwrap();
        assert_eq!(fc.weight("weight").unwrap().shape().dims(), &[2, 3]);
    }

    #[test]
    fn test_empty_interpreter() {
        let interp = DefaultModelInterpreter::new();
        assert!(interp.net_structure().is_none());
        assert!(interp.net_resource().is_none());
    }

    #[test]
    fn test_without_resource() {
        let interp = DefaultModelInterpreter::from_json(sample_manifest_json())
            .unwrap()
            .without_resource();
        assert!(interp.net_structure().is_some());
        assert!(interp.net_resource().is_none());
    }

    #[test]
    fn test_structure_errors_propagate() {
        let json = r#"{
            "name": "dangling", "inputs": { "x": [1, 2] }, "outputs": ["z"],
            "layers": [{ "name": "r", "type": "relu", "inputs": ["nope"], "outputs": ["z"] }]
        }"#;
        let err = DefaultModelInterpreter::from_json(json).unwrap_err();
        assert!(matches!(err, ModelError::InvalidLayer { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let err = DefaultModelInterpreter::from_file(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::ManifestReadError(_)));
    }
}
