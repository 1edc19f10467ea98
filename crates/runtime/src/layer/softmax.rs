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

/// Softmax along one axis of the full `[N, ...]` blob shape.
///
/// The batch axis cannot be normalized over; native tensors are per-sample,
/// so the emitted axis is one less than the layer's.
#[derive(Debug, Default)]
pub struct SoftmaxBuilder {
    axis: usize,
    base: BuilderBase,
}

impl LayerBuilder for SoftmaxBuilder {
    fn layer_type(&self) -> LayerType {
        LayerType::Softmax
    }

    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError> {
        self.base.init(&ctx, 1)?;
        let axis = match ctx.spec.param {
            LayerParam::Softmax { axis } => axis,
            LayerParam::None => 1,
            ref other => return Err(LayerError::InvalidParam(format!("unexpected {other:?}"))),
        };
        let shape = &ctx.input_shapes[0];
        if axis == 0 || axis >= shape.len() {
            return Err(LayerError::InvalidParam(format!(
                "axis {axis} must lie in 1..{} for shape {shape:?}",
                shape.len()
            )));
        }
        self.axis = axis;
        Ok(vec![shape.clone()])
    }

    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError> {
        let inputs = self.base.native_inputs(blobs)?;
        let node = network.add_softmax(&self.base.name, inputs[0], self.axis - 1)?;
        Ok(self.base.emitted(node))
    }

    fn node(&self) -> Option<NodeId> {
        self.base.node
    }
}
