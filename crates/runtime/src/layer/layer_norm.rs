// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{BuilderBase, LayerBuilder, LayerContext};
use crate::{BlobManager, LayerError};
use accelerator::{NetworkDefinition, NodeId};
use model_ir::{LayerParam, LayerType};

/// Layer normalization over the innermost dimension, with learned
/// `scale` and `bias` resources.
#[derive(Debug, Default)]
pub struct LayerNormBuilder {
    eps: f32,
    base: BuilderBase,
}

impl LayerBuilder for LayerNormBuilder {
    fn layer_type(&self) -> LayerType {
        LayerType::LayerNorm
    }

    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError> {
        self.base.init(&ctx, 1)?;
        self.eps = match ctx.spec.param {
            LayerParam::LayerNorm { eps } => eps,
            LayerParam::None => 1e-5,
            ref other => return Err(LayerError::InvalidParam(format!("unexpected {other:?}"))),
        };
        if !(self.eps > 0.0) {
            return Err(LayerError::InvalidParam(format!("eps must be positive, got {}", self.eps)));
        }

        let shape = &ctx.input_shapes[0];
        if shape.len() < 2 {
            return Err(LayerError::Shape(format!("needs a per-sample dimension, got {shape:?}")));
        }
        let last = shape[shape.len() - 1];
        for role in ["scale", "bias"] {
            let len = self.base.weight(role)?.num_elements();
            if len != last {
                return Err(LayerError::Shape(format!(
                    "{role} holds {len} values, innermost dimension is {last}"
                )));
            }
        }
        Ok(vec![shape.clone()])
    }

    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError> {
        let inputs = self.base.native_inputs(blobs)?;
        let scale = self.base.weight("scale")?.as_f32_slice().to_vec();
        let bias = self.base.weight("bias")?.as_f32_slice().to_vec();
        let node = network.add_layer_norm(&self.base.name, inputs[0], self.eps, scale, bias)?;
        Ok(self.base.emitted(node))
    }

    fn node(&self) -> Option<NodeId> {
        self.base.node
    }
}
