// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer descriptions.
//!
//! A [`LayerSpec`] names the blobs a layer reads and writes and carries its
//! interpreted parameters. Weights are **not** stored here: they live in the
//! [`NetResource`](crate::NetResource) keyed by layer name.

use serde::{Deserialize, Serialize};

/// The type tag of a layer. Builders are resolved strictly by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Relu,
    Sigmoid,
    Gelu,
    /// Softmax along one axis of the per-sample tensor.
    Softmax,
    /// Layer normalization over the innermost dimension.
    LayerNorm,
    /// Fully connected layer over the flattened sample.
    InnerProduct,
    /// Two-input element-wise sum.
    Add,
    /// `x * relu6(x + 3) / 6`. Not native to the engine instruction set.
    HardSwish,
}

impl LayerType {
    /// Parses a layer type from a model-description string.
    ///
    /// Accepts snake_case names and a few common aliases
    /// (`"fc"`, `"dense"`, `"ln"`, `"eltwise_add"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relu" => Some(Self::Relu),
            "sigmoid" => Some(Self::Sigmoid),
            "gelu" => Some(Self::Gelu),
            "softmax" => Some(Self::Softmax),
            "layer_norm" | "layernorm" | "ln" => Some(Self::LayerNorm),
            "inner_product" | "innerproduct" | "fc" | "dense" | "linear" => {
                Some(Self::InnerProduct)
            }
            "add" | "eltwise_add" => Some(Self::Add),
            "hard_swish" | "hardswish" => Some(Self::HardSwish),
            _ => None,
        }
    }

    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Gelu => "gelu",
            Self::Softmax => "softmax",
            Self::LayerNorm => "layer_norm",
            Self::InnerProduct => "inner_product",
            Self::Add => "add",
            Self::HardSwish => "hard_swish",
        }
    }

    /// Number of input blobs this layer type consumes.
    pub fn num_inputs(&self) -> usize {
        match self {
            Self::Add => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpreted layer parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerParam {
    /// The layer type takes no parameters.
    #[default]
    None,
    Softmax {
        /// Axis of the full `[N, ...]` blob shape; must be `>= 1`.
        axis: usize,
    },
    LayerNorm {
        #[serde(default = "default_eps")]
        eps: f32,
    },
    InnerProduct {
        num_output: usize,
        #[serde(default = "default_true")]
        has_bias: bool,
    },
}

fn default_eps() -> f32 {
    1e-5
}

fn default_true() -> bool {
    true
}

/// One layer of the network structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer name; also the key of its resource.
    pub name: String,
    /// Type tag used to resolve the layer builder.
    pub layer_type: LayerType,
    /// Names of the blobs this layer consumes, in operand order.
    pub inputs: Vec<String>,
    /// Names of the blobs this layer produces.
    pub outputs: Vec<String>,
    #[serde(default)]
    pub param: LayerParam,
}

impl LayerSpec {
    /// Creates a parameterless layer.
    pub fn new(
        name: impl Into<String>,
        layer_type: LayerType,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            layer_type,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            param: LayerParam::None,
        }
    }

    /// Replaces the parameters.
    pub fn with_param(mut self, param: LayerParam) -> Self {
        self.param = param;
        self
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): [{}] -> [{}]",
            self.name,
            self.layer_type,
            self.inputs.join(", "),
            self.outputs.join(", "),
        )
    }
}
