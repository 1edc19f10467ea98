// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pointwise activations.

use super::{BuilderBase, LayerBuilder, LayerContext};
use crate::{BlobManager, LayerError};
use accelerator::{ActivationKind, NetworkDefinition, NodeId};
use model_ir::LayerType;

/// Emits a native activation node; the output has the input's shape.
#[derive(Debug)]
pub struct ActivationBuilder {
    layer_type: LayerType,
    kind: ActivationKind,
    base: BuilderBase,
}

impl ActivationBuilder {
    fn with_kind(layer_type: LayerType, kind: ActivationKind) -> Self {
        Self {
            layer_type,
            kind,
            base: BuilderBase::default(),
        }
    }

    pub fn relu() -> Self {
        Self::with_kind(LayerType::Relu, ActivationKind::Relu)
    }

    pub fn sigmoid() -> Self {
        Self::with_kind(LayerType::Sigmoid, ActivationKind::Sigmoid)
    }

    pub fn gelu() -> Self {
        Self::with_kind(LayerType::Gelu, ActivationKind::Gelu)
    }
}

impl LayerBuilder for ActivationBuilder {
    fn layer_type(&self) -> LayerType {
        self.layer_type
    }

    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError> {
        self.base.init(&ctx, 1)?;
        Ok(vec![ctx.input_shapes[0].clone()])
    }

    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError> {
        let inputs = self.base.native_inputs(blobs)?;
        let node = network.add_activation(&self.base.name, inputs[0], self.kind)?;
        Ok(self.base.emitted(node))
    }

    fn node(&self) -> Option<NodeId> {
        self.base.node
    }
}
