// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{BuilderBase, LayerBuilder, LayerContext};
use crate::{BlobManager, LayerError};
use accelerator::{NetworkDefinition, NodeId};
use model_ir::LayerType;

/// Elementwise sum of two equally shaped blobs.
#[derive(Debug, Default)]
pub struct AddBuilder {
    base: BuilderBase,
}

impl LayerBuilder for AddBuilder {
    fn layer_type(&self) -> LayerType {
        LayerType::Add
    }

    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError> {
        self.base.init(&ctx, 2)?;
        let (lhs, rhs) = (&ctx.input_shapes[0], &ctx.input_shapes[1]);
        if lhs != rhs {
            return Err(LayerError::Shape(format!("operands {lhs:?} and {rhs:?} differ")));
        }
        Ok(vec![lhs.clone()])
    }

    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError> {
        let inputs = self.base.native_inputs(blobs)?;
        let node = network.add_elementwise_sum(&self.base.name, inputs[0], inputs[1])?;
        Ok(self.base.emitted(node))
    }

    fn node(&self) -> Option<NodeId> {
        self.base.node
    }
}
