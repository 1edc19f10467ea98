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

/// Fully connected layer. Each sample is flattened to `K` values and
/// multiplied by a row-major `num_output x K` weight; the output blob is
/// `[N, num_output]`.
#[derive(Debug, Default)]
pub struct InnerProductBuilder {
    num_output: usize,
    has_bias: bool,
    base: BuilderBase,
}

impl LayerBuilder for InnerProductBuilder {
    fn layer_type(&self) -> LayerType {
        LayerType::InnerProduct
    }

    fn init(&mut self, ctx: LayerContext<'_>) -> Result<Vec<Vec<usize>>, LayerError> {
        self.base.init(&ctx, 1)?;
        let LayerParam::InnerProduct { num_output, has_bias } = ctx.spec.param else {
            return Err(LayerError::InvalidParam("inner product needs num_output".into()));
        };
        if num_output == 0 {
            return Err(LayerError::InvalidParam("num_output must be non-zero".into()));
        }
        self.num_output = num_output;
        self.has_bias = has_bias;

        let shape = &ctx.input_shapes[0];
        let k: usize = shape.iter().skip(1).product();
        let weight_len = self.base.weight("weight")?.num_elements();
        if weight_len != num_output * k {
            return Err(LayerError::Shape(format!(
                "weight holds {weight_len} values, expected {num_output} x {k}"
            )));
        }
        if has_bias {
            let bias_len = self.base.weight("bias")?.num_elements();
            if bias_len != num_output {
                return Err(LayerError::Shape(format!(
                    "bias holds {bias_len} values, expected {num_output}"
                )));
            }
        }
        let batch = shape.first().copied().unwrap_or(1);
        Ok(vec![vec![batch, num_output]])
    }

    fn add_to_network(&mut self, network: &mut NetworkDefinition, blobs: &BlobManager) -> Result<NodeId, LayerError> {
        let inputs = self.base.native_inputs(blobs)?;
        let weight = self.base.weight("weight")?.as_f32_slice().to_vec();
        let bias = if self.has_bias {
            Some(self.base.weight("bias")?.as_f32_slice().to_vec())
        } else {
            None
        };
        let node = network.add_inner_product(&self.base.name, inputs[0], self.num_output, weight, bias)?;
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
    use model_ir::{LayerResource, LayerSpec};
    use tensor_core::{Shape, Tensor};

    fn spec(num_output: usize, has_bias: bool) -> LayerSpec {
        LayerSpec::new("fc", LayerType::InnerProduct, &["x"], &["y"])
            .with_param(LayerParam::InnerProduct { num_output, has_bias })
    }

    #[test]
    fn test_flattens_per_sample() {
        let mut net = NetworkDefinition::new("t");
        let blobs = wired_inputs(&mut net, &[("x", &[4, 2, 3])]);
        let res = LayerResource::new()
            .with_weight("weight", Tensor::zeros(Shape::matrix(5, 6)))
            .with_weight("bias", Tensor::zeros(Shape::vector(5)));

        let s = spec(5, true);
        let mut b = InnerProductBuilder::default();
        assert_eq!(b.init(ctx(&s, &[&[4, 2, 3]], Some(res))).unwrap(), vec![vec![4, 5]]);
        let node = b.add_to_network(&mut net, &blobs).unwrap();
        assert_eq!(net.tensor(net.node_output(node)).unwrap().dims, vec![5]);
    }

    #[test]
    fn test_bias_optional() {
        let res = LayerResource::new().with_weight("weight", Tensor::zeros(Shape::matrix(2, 3)));
        let s = spec(2, false);
        let mut b = InnerProductBuilder::default();
        assert!(b.init(ctx(&s, &[&[1, 3]], Some(res))).is_ok());
    }

    #[test]
    fn test_weight_shape_checked() {
        let res = LayerResource::new().with_weight("weight", Tensor::zeros(Shape::matrix(2, 4)));
        let s = spec(2, false);
        let mut b = InnerProductBuilder::default();
        assert!(matches!(
            b.init(ctx(&s, &[&[1, 3]], Some(res))),
            Err(LayerError::Shape(_))
        ));
    }

    #[test]
    fn test_missing_param() {
        let s = LayerSpec::new("fc", LayerType::InnerProduct, &["x"], &["y"]);
        let mut b = InnerProductBuilder::default();
        assert!(matches!(
            b.init(ctx(&s, &[&[1, 3]], None)),
            Err(LayerError::InvalidParam(_))
        ));
    }
}
