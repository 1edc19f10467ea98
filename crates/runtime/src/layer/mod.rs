// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer builders: one per model layer, emitting the native node(s) that
//! reproduce it.
//!
//! A builder lives for one engine build. [`LayerBuilder::init`] checks the
//! layer against its input shapes and resource and reports output shapes;
//! [`LayerBuilder::add_to_network`] then emits the node, reading its inputs'
//! native tensors from the blob registry.
//!
//! Builders are resolved by layer type tag through [`create_builder`].

mod activation;
mod add;
mod hard_swish;
mod inner_product;
mod layer_norm;
mod softmax;

pub use activation::ActivationBuilder;
pub use add::AddBuilder;
pub use hard_swish::{HardSwishBuilder, HardSwishCreator, HardSwishPlugin, HARD_SWISH_PLUGIN};
pub use inner_product::InnerProductBuilder;
pub use layer_norm::LayerNormBuilder;
pub use softmax::SoftmaxBuilder;

use crate::{BlobManager, LayerError};
use accelerator::{NetworkDefinition, NodeId, PluginFactory, TensorId};
use model_ir::{LayerResource, LayerSpec, LayerType};
use std::sync::Arc;
use tensor_core::Tensor;

/// What a builder sees of its layer during `init`.
#[derive(Debug, Clone)]
pub struct LayerContext<'a> {
    pub spec: &'a LayerSpec,
    /// Full `[N, ...]` shapes of the input blobs, in operand order.
    pub input_shapes: Vec<Vec<usize>>,
    pub resource: Option<Arc<LayerResource>>,
}

pub trait LayerBuilder: Send {
    fn layer_type(&self) -> LayerType;

    /// Validates the layer and returns the full shape of each output blob.
    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError>;

    /// Emits the layer into `network`. Every input blob must already carry
    /// its native tensor.
    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError>;

    /// The node emitted by [`add_to_network`](Self::add_to_network).
    fn node(&self) -> Option<NodeId>;
}

/// Returns a fresh builder for `layer_type`.
pub fn create_builder(layer_type: LayerType) -> Option<Box<dyn LayerBuilder>> {
    let builder: Box<dyn LayerBuilder> = match layer_type {
        LayerType::Relu => Box::new(ActivationBuilder::relu()),
        LayerType::Sigmoid => Box::new(ActivationBuilder::sigmoid()),
        LayerType::Gelu => Box::new(ActivationBuilder::gelu()),
        LayerType::Softmax => Box::new(SoftmaxBuilder::default()),
        LayerType::LayerNorm => Box::new(LayerNormBuilder::default()),
        LayerType::InnerProduct => Box::new(InnerProductBuilder::default()),
        LayerType::Add => Box::new(AddBuilder::default()),
        LayerType::HardSwish => Box::new(HardSwishBuilder::default()),
    };
    Some(builder)
}

/// A plugin factory holding the creators for every plugin-backed layer.
pub fn default_plugin_factory() -> PluginFactory {
    let mut factory = PluginFactory::new();
    factory.register(Arc::new(HardSwishCreator));
    factory
}

// ── Shared builder state ───────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct BuilderBase {
    name: String,
    inputs: Vec<String>,
    resource: Option<Arc<LayerResource>>,
    node: Option<NodeId>,
    initialized: bool,
}

impl BuilderBase {
    /// Records the layer and checks it has `arity` inputs and one output.
    fn init(&mut self, ctx: &LayerContext<'_>, arity: usize) -> Result<(), LayerError> {
        if ctx.spec.inputs.len() != arity || ctx.input_shapes.len() != arity {
            return Err(LayerError::Arity {
                what: "inputs",
                expected: arity,
                actual: ctx.spec.inputs.len(),
            });
        }
        if ctx.spec.outputs.len() != 1 {
            return Err(LayerError::Arity {
                what: "outputs",
                expected: 1,
                actual: ctx.spec.outputs.len(),
            });
        }
        self.name = ctx.spec.name.clone();
        self.inputs = ctx.spec.inputs.clone();
        self.resource = ctx.resource.clone();
        self.initialized = true;
        Ok(())
    }

    /// Native tensors of the inputs, in operand order.
    fn native_inputs(&self, blobs: &BlobManager) -> Result<Vec<TensorId>, LayerError> {
        if !self.initialized {
            return Err(LayerError::NotInitialized);
        }
        self.inputs
            .iter()
            .map(|name| {
                blobs
                    .get(name)
                    .and_then(|entry| entry.native_tensor())
                    .ok_or_else(|| LayerError::NoNativeTensor(name.clone()))
            })
            .collect()
    }

    fn weight(&self, role: &str) -> Result<&Tensor, LayerError> {
        self.resource
            .as_deref()
            .and_then(|r| r.weight(role))
            .ok_or_else(|| LayerError::MissingResource(role.to_string()))
    }

    fn emitted(&mut self, node: NodeId) -> NodeId {
        self.node = Some(node);
        node
    }
}
