// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compiles a [`NetworkDefinition`] into an [`EnginePlan`].

use super::engine::NaiveEngine;
use super::plan::{align_up, BindingDesc, EnginePlan, Location, Operand, Step, StepOp, PLAN_FORMAT_VERSION};
use crate::{
    AccelError, ActivationKind, BuildConfig, Engine, EngineBuilder, NativeOp, NetworkDefinition, Plugin, TensorId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tensor_core::DType;

/// Builder for the host reference device.
#[derive(Debug, Default)]
pub struct NaiveBuilder;

impl EngineBuilder for NaiveBuilder {
    fn build_engine(&self, network: &NetworkDefinition, config: &BuildConfig) -> Result<Arc<dyn Engine>, AccelError> {
        let (plan, plugins) = compile(network, config)?;
        tracing::info!(
            "Built engine '{}': {} steps, {} bindings, {} scratch bytes",
            plan.name,
            plan.steps.len(),
            plan.bindings.len(),
            plan.scratch_bytes
        );
        Ok(Arc::new(NaiveEngine::from_parts(plan, plugins)?))
    }
}

/// Lowers `network` to a plan. Plugin instances are returned alongside so the
/// freshly built engine does not have to go through a plugin factory.
pub(crate) fn compile(
    network: &NetworkDefinition,
    config: &BuildConfig,
) -> Result<(EnginePlan, Vec<Option<Arc<dyn Plugin>>>), AccelError> {
    if config.max_batch_size == 0 {
        return Err(AccelError::Build("max batch size must be at least 1".into()));
    }
    if network.outputs().is_empty() {
        return Err(AccelError::Build(format!("network '{}' marks no outputs", network.name())));
    }
    if let Some(t) = network.tensors().iter().find(|t| t.dtype != DType::F32) {
        return Err(AccelError::UnsupportedPrecision(t.dtype));
    }

    // ── Bindings: inputs first, then outputs in mark order ──────

    let mut bindings = Vec::new();
    let mut binding_of: HashMap<TensorId, usize> = HashMap::new();
    for &id in network.inputs().iter().chain(network.outputs()) {
        if binding_of.contains_key(&id) {
            continue;
        }
        let info = network
            .tensor(id)
            .ok_or_else(|| AccelError::Build(format!("unknown tensor {id}")))?;
        binding_of.insert(id, bindings.len());
        bindings.push(BindingDesc {
            name: info.name.clone(),
            dims: info.dims.clone(),
            is_input: info.is_input,
        });
    }
    let mut seen = HashSet::new();
    for b in &bindings {
        if !seen.insert(b.name.as_str()) {
            return Err(AccelError::Build(format!("duplicate binding name '{}'", b.name)));
        }
    }

    // ── Steps and scratch layout ────────────────────────────────

    let mut scratch_of: HashMap<TensorId, usize> = HashMap::new();
    let mut scratch_bytes = 0usize;
    let mut steps = Vec::with_capacity(network.nodes().len());
    let mut plugins = Vec::with_capacity(network.nodes().len());

    for node in network.nodes() {
        let inputs = node
            .inputs
            .iter()
            .map(|&id| operand(network, &binding_of, &scratch_of, &node.name, id))
            .collect::<Result<Vec<_>, _>>()?;

        let out_info = network
            .tensor(node.output)
            .ok_or_else(|| AccelError::Build(format!("node '{}' has no output tensor", node.name)))?;
        let out_volume = out_info.volume();
        if !binding_of.contains_key(&node.output) {
            scratch_of.insert(node.output, scratch_bytes);
            scratch_bytes += align_up(out_volume * 4 * config.max_batch_size);
        }
        let output = operand(network, &binding_of, &scratch_of, &node.name, node.output)?;

        let (op, plugin) = lower(&node.op, network, &node.inputs);
        steps.push(Step {
            name: node.name.clone(),
            op,
            inputs,
            output,
        });
        plugins.push(plugin);
    }

    if scratch_bytes > config.max_workspace_size {
        return Err(AccelError::Build(format!(
            "network '{}' needs {scratch_bytes} bytes of scratch, workspace limit is {}",
            network.name(),
            config.max_workspace_size
        )));
    }

    let plan = EnginePlan {
        format_version: PLAN_FORMAT_VERSION,
        name: network.name().to_string(),
        max_batch_size: config.max_batch_size,
        bindings,
        steps,
        scratch_bytes,
    };
    plan.validate().map_err(|e| AccelError::Build(e.to_string()))?;
    Ok((plan, plugins))
}

fn operand(
    network: &NetworkDefinition,
    binding_of: &HashMap<TensorId, usize>,
    scratch_of: &HashMap<TensorId, usize>,
    node: &str,
    id: TensorId,
) -> Result<Operand, AccelError> {
    let info = network
        .tensor(id)
        .ok_or_else(|| AccelError::Build(format!("node '{node}' reads unknown tensor {id}")))?;
    let location = match (binding_of.get(&id), scratch_of.get(&id)) {
        (Some(&b), _) => Location::Binding(b),
        (None, Some(&offset)) => Location::Scratch(offset),
        (None, None) => {
            return Err(AccelError::Build(format!(
                "node '{node}' reads {id} before it is produced"
            )))
        }
    };
    Ok(Operand {
        location,
        volume: info.volume(),
    })
}

fn lower(
    op: &NativeOp,
    network: &NetworkDefinition,
    inputs: &[TensorId],
) -> (StepOp, Option<Arc<dyn Plugin>>) {
    let step = match op {
        NativeOp::Activation(ActivationKind::Relu) => StepOp::Relu,
        NativeOp::Activation(ActivationKind::Sigmoid) => StepOp::Sigmoid,
        NativeOp::Activation(ActivationKind::Gelu) => StepOp::Gelu,
        NativeOp::Softmax { axis } => StepOp::Softmax {
            axis: *axis,
            dims: inputs
                .first()
                .and_then(|&id| network.tensor(id))
                .map(|t| t.dims.clone())
                .unwrap_or_default(),
        },
        NativeOp::LayerNorm { eps, scale, bias } => StepOp::LayerNorm {
            eps: *eps,
            scale: scale.clone(),
            bias: bias.clone(),
        },
        NativeOp::InnerProduct { weight, bias, .. } => StepOp::InnerProduct {
            weight: weight.clone(),
            bias: bias.clone(),
        },
        NativeOp::ElementwiseSum => StepOp::Sum,
        NativeOp::Plugin(plugin) => {
            return (
                StepOp::Plugin {
                    plugin_type: plugin.plugin_type().to_string(),
                    data: plugin.serialize(),
                },
                Some(Arc::clone(plugin)),
            )
        }
    };
    (step, None)
}
