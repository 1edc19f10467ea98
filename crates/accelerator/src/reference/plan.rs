// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The serializable execution plan of a reference engine.
//!
//! A plan is a list of [`Step`]s in execution order. Each operand lives
//! either in a caller-bound buffer ([`Location::Binding`]) or in the
//! context's scratch region ([`Location::Scratch`]). Both are laid out
//! batch-major: sample `b` of an operand with `volume` elements starts
//! `b * volume` floats past its base address. Weights are baked into the
//! steps, plugins are kept as type name plus parameters.

use crate::AccelError;
use serde::{Deserialize, Serialize};

/// Bumped whenever the plan layout changes; part of the device identity.
pub const PLAN_FORMAT_VERSION: u32 = 1;

/// Scratch regions start on this boundary.
pub(crate) const SCRATCH_ALIGN: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnginePlan {
    pub format_version: u32,
    pub name: String,
    pub max_batch_size: usize,
    pub bindings: Vec<BindingDesc>,
    pub steps: Vec<Step>,
    /// Scratch bytes needed at `max_batch_size`.
    pub scratch_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingDesc {
    pub name: String,
    /// Per-sample dims.
    pub dims: Vec<usize>,
    pub is_input: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Binding(usize),
    /// Byte offset into the scratch region.
    Scratch(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub location: Location,
    /// Elements per sample.
    pub volume: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOp {
    Relu,
    Sigmoid,
    Gelu,
    Softmax { axis: usize, dims: Vec<usize> },
    LayerNorm { eps: f32, scale: Vec<f32>, bias: Vec<f32> },
    InnerProduct { weight: Vec<f32>, bias: Option<Vec<f32>> },
    Sum,
    Plugin { plugin_type: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub op: StepOp,
    pub inputs: Vec<Operand>,
    pub output: Operand,
}

impl EnginePlan {
    pub fn to_bytes(&self) -> Result<Vec<u8>, AccelError> {
        bincode::serialize(self).map_err(|e| AccelError::Serialize(e.to_string()))
    }

    /// Decodes and validates a plan.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AccelError> {
        let plan: EnginePlan =
            bincode::deserialize(bytes).map_err(|e| AccelError::Deserialize(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Checks that every operand stays inside its buffer and that step
    /// parameters agree with operand sizes.
    ///
    /// Execution trusts a validated plan with raw device addresses, so
    /// plans read from disk must pass this first.
    pub fn validate(&self) -> Result<(), AccelError> {
        let bad = |msg: String| Err(AccelError::Deserialize(format!("plan '{}': {msg}", self.name)));

        if self.format_version != PLAN_FORMAT_VERSION {
            return bad(format!(
                "format version {} (expected {PLAN_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.max_batch_size == 0 {
            return bad("max batch size is zero".into());
        }

        let check_operand = |op: &Operand| -> Result<(), String> {
            match op.location {
                Location::Binding(i) => {
                    let binding = self
                        .bindings
                        .get(i)
                        .ok_or_else(|| format!("binding {i} out of range"))?;
                    let volume: usize = binding.dims.iter().product();
                    if volume != op.volume {
                        return Err(format!(
                            "binding '{}' holds {volume} elements per sample, operand claims {}",
                            binding.name, op.volume
                        ));
                    }
                }
                Location::Scratch(offset) => {
                    let end = op
                        .volume
                        .checked_mul(4 * self.max_batch_size)
                        .and_then(|len| len.checked_add(offset))
                        .ok_or_else(|| "scratch operand overflows".to_string())?;
                    if end > self.scratch_bytes || offset % 4 != 0 {
                        return Err(format!(
                            "scratch operand [{offset}, {end}) outside {} bytes",
                            self.scratch_bytes
                        ));
                    }
                }
            }
            Ok(())
        };

        for step in &self.steps {
            for op in step.inputs.iter().chain(std::iter::once(&step.output)) {
                if let Err(msg) = check_operand(op) {
                    return bad(format!("step '{}': {msg}", step.name));
                }
            }
            if let Err(msg) = step.check_params() {
                return bad(format!("step '{}': {msg}", step.name));
            }
        }
        Ok(())
    }
}

impl Step {
    fn check_params(&self) -> Result<(), String> {
        let arity = match self.op {
            StepOp::Sum => 2,
            StepOp::Plugin { .. } => self.inputs.len(),
            _ => 1,
        };
        if self.inputs.len() != arity {
            return Err(format!("expects {arity} inputs, has {}", self.inputs.len()));
        }
        let in_volume = self.inputs.first().map_or(0, |op| op.volume);
        let out_volume = self.output.volume;

        match &self.op {
            StepOp::Relu | StepOp::Sigmoid | StepOp::Gelu | StepOp::Sum => {
                if self.inputs.iter().any(|op| op.volume != out_volume) {
                    return Err("operand volumes differ".into());
                }
            }
            StepOp::Softmax { axis, dims } => {
                if *axis >= dims.len() || dims.iter().product::<usize>() != out_volume || in_volume != out_volume {
                    return Err("softmax dims disagree with operands".into());
                }
            }
            StepOp::LayerNorm { scale, bias, .. } => {
                if scale.is_empty() || scale.len() != bias.len() || out_volume % scale.len() != 0 || in_volume != out_volume {
                    return Err("layer norm parameters disagree with operands".into());
                }
            }
            StepOp::InnerProduct { weight, bias } => {
                if weight.len() != in_volume * out_volume {
                    return Err("inner product weight disagrees with operands".into());
                }
                if bias.as_ref().is_some_and(|b| b.len() != out_volume) {
                    return Err("inner product bias disagrees with operands".into());
                }
            }
            StepOp::Plugin { .. } => {}
        }
        Ok(())
    }
}

/// Rounds `n` up to the scratch alignment.
pub(crate) fn align_up(n: usize) -> usize {
    n.div_ceil(SCRATCH_ALIGN) * SCRATCH_ALIGN
}
