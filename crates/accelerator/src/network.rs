// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The native network definition handed to an [`EngineBuilder`](crate::EngineBuilder).
//!
//! Tensors are identified by [`TensorId`] and nodes by [`NodeId`]. Shapes are
//! per-sample: the batch dimension is implicit and bounded by the engine's
//! max batch size. Every `add_*` call infers the output shape immediately,
//! so a malformed node is rejected where it is added rather than at build
//! time. Weights are copied into the definition; the engine bakes them in.

use crate::{AccelError, Plugin};
use std::fmt;
use std::sync::Arc;
use tensor_core::DType;

/// Handle to a tensor inside one [`NetworkDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(usize);

impl TensorId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%t{}", self.0)
    }
}

/// Handle to a node inside one [`NetworkDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A native tensor: name, per-sample dims and element type.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub name: String,
    pub dims: Vec<usize>,
    pub dtype: DType,
    pub is_input: bool,
    pub is_output: bool,
}

impl TensorInfo {
    /// Elements per sample.
    pub fn volume(&self) -> usize {
        self.dims.iter().product()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Relu,
    Sigmoid,
    Gelu,
}

/// Operation performed by a native node.
#[derive(Debug, Clone)]
pub enum NativeOp {
    Activation(ActivationKind),
    /// Softmax along a per-sample axis.
    Softmax { axis: usize },
    LayerNorm {
        eps: f32,
        scale: Vec<f32>,
        bias: Vec<f32>,
    },
    /// Fully connected over the flattened sample; `weight` is `[num_output, K]`.
    InnerProduct {
        num_output: usize,
        weight: Vec<f32>,
        bias: Option<Vec<f32>>,
    },
    ElementwiseSum,
    Plugin(Arc<dyn Plugin>),
}

/// One node: an operation over input tensors producing a single output.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub op: NativeOp,
    pub inputs: Vec<TensorId>,
    pub output: TensorId,
}

/// A native network under construction.
#[derive(Debug, Default)]
pub struct NetworkDefinition {
    name: String,
    tensors: Vec<TensorInfo>,
    nodes: Vec<Node>,
    inputs: Vec<TensorId>,
    outputs: Vec<TensorId>,
}

impl NetworkDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Inputs ──────────────────────────────────────────────────

    /// Declares a network input with per-sample `dims`.
    pub fn add_input(&mut self, name: &str, dtype: DType, dims: &[usize]) -> Result<TensorId, AccelError> {
        if dims.iter().any(|&d| d == 0) {
            return Err(AccelError::InvalidNetwork(format!(
                "input '{name}' has a zero dimension: {dims:?}"
            )));
        }
        let id = self.push_tensor(name.to_string(), dims.to_vec(), dtype);
        self.tensors[id.0].is_input = true;
        self.inputs.push(id);
        Ok(id)
    }

    // ── Nodes ───────────────────────────────────────────────────

    pub fn add_activation(&mut self, name: &str, input: TensorId, kind: ActivationKind) -> Result<NodeId, AccelError> {
        let info = self.tensor_checked(input)?.clone();
        Ok(self.push_node(name, NativeOp::Activation(kind), vec![input], info.dims, info.dtype))
    }

    pub fn add_softmax(&mut self, name: &str, input: TensorId, axis: usize) -> Result<NodeId, AccelError> {
        let info = self.tensor_checked(input)?.clone();
        if axis >= info.dims.len() {
            return Err(AccelError::InvalidNetwork(format!(
                "softmax '{name}': axis {axis} out of range for per-sample dims {:?}",
                info.dims
            )));
        }
        Ok(self.push_node(name, NativeOp::Softmax { axis }, vec![input], info.dims, info.dtype))
    }

    /// Normalizes over the innermost dimension; `scale` and `bias` hold one
    /// value per element of that dimension.
    pub fn add_layer_norm(
        &mut self,
        name: &str,
        input: TensorId,
        eps: f32,
        scale: Vec<f32>,
        bias: Vec<f32>,
    ) -> Result<NodeId, AccelError> {
        let info = self.tensor_checked(input)?.clone();
        let last = info.dims.last().copied().unwrap_or(1);
        if scale.len() != last || bias.len() != last {
            return Err(AccelError::InvalidNetwork(format!(
                "layer norm '{name}': scale/bias length {}/{} != innermost dim {last}",
                scale.len(),
                bias.len()
            )));
        }
        Ok(self.push_node(
            name,
            NativeOp::LayerNorm { eps, scale, bias },
            vec![input],
            info.dims,
            info.dtype,
        ))
    }

    pub fn add_inner_product(
        &mut self,
        name: &str,
        input: TensorId,
        num_output: usize,
        weight: Vec<f32>,
        bias: Option<Vec<f32>>,
    ) -> Result<NodeId, AccelError> {
        let info = self.tensor_checked(input)?.clone();
        let k = info.volume();
        if num_output == 0 || weight.len() != num_output * k {
            return Err(AccelError::InvalidNetwork(format!(
                "inner product '{name}': weight holds {} values, expected {num_output} x {k}",
                weight.len()
            )));
        }
        if let Some(b) = &bias {
            if b.len() != num_output {
                return Err(AccelError::InvalidNetwork(format!(
                    "inner product '{name}': bias holds {} values, expected {num_output}",
                    b.len()
                )));
            }
        }
        Ok(self.push_node(
            name,
            NativeOp::InnerProduct {
                num_output,
                weight,
                bias,
            },
            vec![input],
            vec![num_output],
            info.dtype,
        ))
    }

    pub fn add_elementwise_sum(&mut self, name: &str, lhs: TensorId, rhs: TensorId) -> Result<NodeId, AccelError> {
        let a = self.tensor_checked(lhs)?.clone();
        let b = self.tensor_checked(rhs)?;
        if a.dims != b.dims {
            return Err(AccelError::InvalidNetwork(format!(
                "elementwise sum '{name}': operand dims {:?} vs {:?}",
                a.dims, b.dims
            )));
        }
        Ok(self.push_node(name, NativeOp::ElementwiseSum, vec![lhs, rhs], a.dims, a.dtype))
    }

    /// Adds a node implemented by a plugin. The plugin reports its output dims.
    pub fn add_plugin(&mut self, name: &str, inputs: &[TensorId], plugin: Arc<dyn Plugin>) -> Result<NodeId, AccelError> {
        let mut input_dims = Vec::with_capacity(inputs.len());
        for &id in inputs {
            input_dims.push(self.tensor_checked(id)?.dims.clone());
        }
        let dtype = match inputs.first() {
            Some(&id) => self.tensors[id.0].dtype,
            None => DType::F32,
        };
        let dims = plugin.output_dims(&input_dims)?;
        Ok(self.push_node(name, NativeOp::Plugin(plugin), inputs.to_vec(), dims, dtype))
    }

    // ── Tensor naming and outputs ───────────────────────────────

    /// The tensor a node produces.
    pub fn node_output(&self, node: NodeId) -> TensorId {
        self.nodes[node.0].output
    }

    pub fn set_tensor_name(&mut self, id: TensorId, name: &str) -> Result<(), AccelError> {
        self.tensor_checked(id)?;
        self.tensors[id.0].name = name.to_string();
        Ok(())
    }

    /// Marks a tensor as a network output. Marking twice is a no-op.
    pub fn mark_output(&mut self, id: TensorId) -> Result<(), AccelError> {
        self.tensor_checked(id)?;
        if !self.tensors[id.0].is_output {
            self.tensors[id.0].is_output = true;
            self.outputs.push(id);
        }
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn tensor(&self, id: TensorId) -> Option<&TensorInfo> {
        self.tensors.get(id.0)
    }

    pub fn tensors(&self) -> &[TensorInfo] {
        &self.tensors
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    // ── Private helpers ─────────────────────────────────────────

    fn tensor_checked(&self, id: TensorId) -> Result<&TensorInfo, AccelError> {
        self.tensors
            .get(id.0)
            .ok_or_else(|| AccelError::InvalidNetwork(format!("unknown tensor {id}")))
    }

    fn push_tensor(&mut self, name: String, dims: Vec<usize>, dtype: DType) -> TensorId {
        self.tensors.push(TensorInfo {
            name,
            dims,
            dtype,
            is_input: false,
            is_output: false,
        });
        TensorId(self.tensors.len() - 1)
    }

    fn push_node(&mut self, name: &str, op: NativeOp, inputs: Vec<TensorId>, dims: Vec<usize>, dtype: DType) -> NodeId {
        let output = self.push_tensor(format!("{name}_output"), dims, dtype);
        self.nodes.push(Node {
            name: name.to_string(),
            op,
            inputs,
            output,
        });
        NodeId(self.nodes.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_inference() {
        let mut net = NetworkDefinition::new("t");
        let x = net.add_input("x", DType::F32, &[3, 4]).unwrap();
        let fc = net.add_inner_product("fc", x, 5, vec![0.0; 60], None).unwrap();
        let y = net.node_output(fc);
        assert_eq!(net.tensor(y).unwrap().dims, vec![5]);
        assert_eq!(net.tensor(y).unwrap().name, "fc_output");

        let sm = net.add_softmax("sm", y, 0).unwrap();
        assert_eq!(net.tensor(net.node_output(sm)).unwrap().volume(), 5);
    }

    #[test]
    fn test_rejects_bad_operands() {
        let mut net = NetworkDefinition::new("t");
        let x = net.add_input("x", DType::F32, &[4]).unwrap();
        let z = net.add_input("z", DType::F32, &[2]).unwrap();
        assert!(net.add_inner_product("fc", x, 2, vec![0.0; 7], None).is_err());
        assert!(net.add_softmax("sm", x, 1).is_err());
        assert!(net.add_elementwise_sum("sum", x, z).is_err());
        assert!(net.add_layer_norm("ln", x, 1e-5, vec![1.0; 3], vec![0.0; 4]).is_err());
        assert!(net.add_input("bad", DType::F32, &[0, 2]).is_err());
    }

    #[test]
    fn test_mark_output_and_rename() {
        let mut net = NetworkDefinition::new("t");
        let x = net.add_input("x", DType::F32, &[2]).unwrap();
        let relu = net.add_activation("relu", x, ActivationKind::Relu).unwrap();
        let y = net.node_output(relu);
        net.set_tensor_name(y, "y").unwrap();
        net.mark_output(y).unwrap();
        net.mark_output(y).unwrap();
        assert_eq!(net.outputs(), &[y]);
        assert_eq!(net.tensor(y).unwrap().name, "y");
        assert!(net.tensor(y).unwrap().is_output);
        assert_eq!(net.inputs(), &[x]);
    }
}
