// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hard-swish, which has no native op and runs as a plugin.
//!
//! The plugin carries no parameters, so a serialized engine records only its
//! type name. Deserializing such an engine needs [`HardSwishCreator`] in the
//! plugin factory.

use super::{BuilderBase, LayerBuilder, LayerContext};
use crate::{BlobManager, LayerError};
use accelerator::{AccelError, NetworkDefinition, NodeId, Plugin, PluginCreator};
use model_ir::LayerType;
use std::sync::Arc;

/// Plugin type name under which [`HardSwishCreator`] registers.
pub const HARD_SWISH_PLUGIN: &str = "hard_swish";

#[derive(Debug)]
pub struct HardSwishPlugin {
    layer: String,
}

impl HardSwishPlugin {
    pub fn new(layer: impl Into<String>) -> Self {
        Self { layer: layer.into() }
    }
}

impl Plugin for HardSwishPlugin {
    fn plugin_type(&self) -> &str {
        HARD_SWISH_PLUGIN
    }

    fn output_dims(&self, input_dims: &[Vec<usize>]) -> Result<Vec<usize>, AccelError> {
        match input_dims {
            [dims] => Ok(dims.clone()),
            _ => Err(AccelError::Plugin {
                layer: self.layer.clone(),
                detail: format!("expects one input, got {}", input_dims.len()),
            }),
        }
    }

    fn serialize(&self) -> Vec<u8> {
        Vec::new()
    }

    fn enqueue(&self, inputs: &[&[f32]], output: &mut [f32]) -> Result<(), AccelError> {
        let input = inputs.first().ok_or_else(|| AccelError::Plugin {
            layer: self.layer.clone(),
            detail: "no input".into(),
        })?;
        tensor_core::hard_swish(input, output).map_err(|e| AccelError::Plugin {
            layer: self.layer.clone(),
            detail: e.to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct HardSwishCreator;

impl PluginCreator for HardSwishCreator {
    fn plugin_type(&self) -> &str {
        HARD_SWISH_PLUGIN
    }

    fn create(&self, layer_name: &str, data: &[u8]) -> Result<Arc<dyn Plugin>, AccelError> {
        if !data.is_empty() {
            return Err(AccelError::Plugin {
                layer: layer_name.to_string(),
                detail: format!("takes no parameters, got {} bytes", data.len()),
            });
        }
        Ok(Arc::new(HardSwishPlugin::new(layer_name)))
    }
}

#[derive(Debug, Default)]
pub struct HardSwishBuilder {
    base: BuilderBase,
}

impl LayerBuilder for HardSwishBuilder {
    fn layer_type(&self) -> LayerType {
        LayerType::HardSwish
    }

    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError> {
        self.base.init(&ctx, 1)?;
        Ok(vec![ctx.input_shapes[0].clone()])
    }

    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError> {
        let inputs = self.base.native_inputs(blobs)?;
        let plugin = Arc::new(HardSwishPlugin::new(self.base.name.clone()));
        let node = network.add_plugin(&self.base.name, &inputs, plugin)?;
        Ok(self.base.emitted(node))
    }

    fn node(&self) -> Option<NodeId> {
        self.base.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tests::{ctx, wired_inputs};
    use accelerator::NativeOp;
    use model_ir::LayerSpec;

    #[test]
    fn test_plugin_values() {
        let plugin = HardSwishPlugin::new("hs");
        let mut out = [0.0; 4];
        plugin.enqueue(&[&[-4.0, 0.0, 1.0, 4.0]], &mut out).unwrap();
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 4.0 / 6.0).abs() < 1e-6);
        assert_eq!(out[3], 4.0);
    }

    #[test]
    fn test_creator_rejects_parameters() {
        assert!(HardSwishCreator.create("hs", &[]).is_ok());
        assert!(matches!(
            HardSwishCreator.create("hs", &[1]),
            Err(AccelError::Plugin { .. })
        ));
    }

    #[test]
    fn test_builder_emits_plugin() {
        let mut net = NetworkDefinition::new("t");
        let blobs = wired_inputs(&mut net, &[("x", &[1, 8])]);
        let spec = LayerSpec::new("hs", LayerType::HardSwish, &["x"], &["y"]);

        let mut b = HardSwishBuilder::default();
        b.init(ctx(&spec, &[&[1, 8]], None)).unwrap();
        let node = b.add_to_network(&mut net, &blobs).unwrap();
        match &net.nodes()[node.index()].op {
            NativeOp::Plugin(p) => assert_eq!(p.plugin_type(), HARD_SWISH_PLUGIN),
            other => panic!("unexpected op {other:?}"),
        }
    }
}
