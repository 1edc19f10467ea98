// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference engine, execution context and runtime.

use super::plan::{EnginePlan, Location, Operand, Step, StepOp};
use crate::{AccelError, Engine, EngineRuntime, ExecutionContext, Plugin, PluginFactory, Stream};
use device_memory::{DeviceMemory, DevicePtr};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tensor_core::{Shape, TensorError};

/// A validated plan with its plugins resolved.
struct LoadedPlan {
    plan: EnginePlan,
    /// One slot per step; `Some` for plugin steps.
    plugins: Vec<Option<Arc<dyn Plugin>>>,
    binding_lookup: HashMap<String, usize>,
}

impl LoadedPlan {
    /// Runs every step for samples `0..batch`.
    ///
    /// # Safety
    ///
    /// Each `bindings[i]` must point to at least `batch * volume(i)` floats,
    /// and `scratch` to at least `plan.scratch_bytes` bytes, none of which
    /// anyone else touches for the duration of the call.
    unsafe fn execute(&self, batch: usize, bindings: &[DevicePtr], scratch: DevicePtr) -> Result<(), AccelError> {
        for b in 0..batch {
            for (step, plugin) in self.plan.steps.iter().zip(&self.plugins) {
                let base = |op: &Operand| -> DevicePtr {
                    let sample = b * op.volume * 4;
                    match op.location {
                        Location::Binding(i) => bindings[i].byte_add(sample),
                        Location::Scratch(offset) => scratch.byte_add(offset + sample),
                    }
                };
                let inputs: Vec<&[f32]> = step
                    .inputs
                    .iter()
                    .map(|op| base(op).as_f32_slice(op.volume))
                    .collect();
                let output = base(&step.output).as_f32_slice_mut(step.output.volume);
                run_step(step, plugin.as_deref(), &inputs, output)?;
            }
        }
        Ok(())
    }
}

fn run_step(step: &Step, plugin: Option<&dyn Plugin>, inputs: &[&[f32]], output: &mut [f32]) -> Result<(), AccelError> {
    let kernel = |r: Result<(), TensorError>| {
        r.map_err(|source| AccelError::Kernel {
            node: step.name.clone(),
            source,
        })
    };
    match &step.op {
        StepOp::Relu => kernel(tensor_core::relu(inputs[0], output)),
        StepOp::Sigmoid => kernel(tensor_core::sigmoid(inputs[0], output)),
        StepOp::Gelu => kernel(tensor_core::gelu(inputs[0], output)),
        StepOp::Softmax { axis, dims } => kernel(tensor_core::softmax(
            inputs[0],
            &Shape::new(dims.clone()),
            *axis,
            output,
        )),
        StepOp::LayerNorm { eps, scale, bias } => kernel(tensor_core::layer_norm(
            inputs[0],
            scale.len(),
            scale,
            bias,
            *eps,
            output,
        )),
        StepOp::InnerProduct { weight, bias } => {
            kernel(tensor_core::inner_product(inputs[0], weight, bias.as_deref(), output))
        }
        StepOp::Sum => kernel(tensor_core::add(inputs[0], inputs[1], output)),
        StepOp::Plugin { plugin_type, .. } => match plugin {
            Some(p) => p.enqueue(inputs, output),
            None => Err(AccelError::PluginNotFound {
                plugin_type: plugin_type.clone(),
                layer: step.name.clone(),
            }),
        },
    }
}

// ── Engine ──────────────────────────────────────────────────────

/// A compiled engine for the host reference device.
pub struct NaiveEngine {
    inner: Arc<LoadedPlan>,
}

impl NaiveEngine {
    pub(crate) fn from_parts(plan: EnginePlan, plugins: Vec<Option<Arc<dyn Plugin>>>) -> Result<Self, AccelError> {
        if plugins.len() != plan.steps.len() {
            return Err(AccelError::Build(format!(
                "{} plugin slots for {} steps",
                plugins.len(),
                plan.steps.len()
            )));
        }
        let binding_lookup = plan
            .bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Ok(Self {
            inner: Arc::new(LoadedPlan {
                plan,
                plugins,
                binding_lookup,
            }),
        })
    }

    pub fn plan(&self) -> &EnginePlan {
        &self.inner.plan
    }
}

impl fmt::Debug for NaiveEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = &self.inner.plan;
        f.debug_struct("NaiveEngine")
            .field("name", &plan.name)
            .field("bindings", &plan.bindings.len())
            .field("steps", &plan.steps.len())
            .field("max_batch_size", &plan.max_batch_size)
            .field("scratch_bytes", &plan.scratch_bytes)
            .finish()
    }
}

impl Engine for NaiveEngine {
    fn num_bindings(&self) -> usize {
        self.inner.plan.bindings.len()
    }

    fn binding_index(&self, name: &str) -> Option<usize> {
        self.inner.binding_lookup.get(name).copied()
    }

    fn binding_name(&self, index: usize) -> Option<&str> {
        self.inner.plan.bindings.get(index).map(|b| b.name.as_str())
    }

    fn binding_is_input(&self, index: usize) -> bool {
        self.inner.plan.bindings.get(index).is_some_and(|b| b.is_input)
    }

    fn binding_dims(&self, index: usize) -> Option<&[usize]> {
        self.inner.plan.bindings.get(index).map(|b| b.dims.as_slice())
    }

    fn max_batch_size(&self) -> usize {
        self.inner.plan.max_batch_size
    }

    fn device_memory_size(&self) -> usize {
        self.inner.plan.scratch_bytes
    }

    fn serialize(&self) -> Result<Vec<u8>, AccelError> {
        self.inner.plan.to_bytes()
    }

    fn create_execution_context_without_device_memory(&self) -> Result<Box<dyn ExecutionContext>, AccelError> {
        Ok(Box::new(NaiveContext {
            inner: Arc::clone(&self.inner),
            scratch: None,
        }))
    }
}

// ── Execution context ───────────────────────────────────────────

pub struct NaiveContext {
    inner: Arc<LoadedPlan>,
    scratch: Option<DeviceMemory>,
}

impl ExecutionContext for NaiveContext {
    fn set_device_memory(&mut self, memory: DeviceMemory) -> Result<(), AccelError> {
        let needed = self.inner.plan.scratch_bytes;
        if memory.len() < needed {
            return Err(AccelError::Enqueue(format!(
                "scratch region of {} bytes is smaller than the {needed} required",
                memory.len()
            )));
        }
        self.scratch = Some(memory);
        Ok(())
    }

    fn enqueue(&self, batch_size: usize, bindings: &[DevicePtr], stream: &dyn Stream) -> Result<(), AccelError> {
        let plan = &self.inner.plan;
        if batch_size == 0 || batch_size > plan.max_batch_size {
            return Err(AccelError::Enqueue(format!(
                "batch size {batch_size} outside 1..={}",
                plan.max_batch_size
            )));
        }
        if bindings.len() != plan.bindings.len() {
            return Err(AccelError::Enqueue(format!(
                "{} bindings given, engine has {}",
                bindings.len(),
                plan.bindings.len()
            )));
        }
        if let Some(i) = bindings.iter().position(|p| p.is_null()) {
            return Err(AccelError::Enqueue(format!(
                "binding {i} ('{}') is null",
                plan.bindings[i].name
            )));
        }
        let scratch = match (&self.scratch, plan.scratch_bytes) {
            (_, 0) => DevicePtr::NULL,
            (Some(mem), _) => mem.ptr(),
            (None, needed) => {
                return Err(AccelError::Enqueue(format!(
                    "context needs {needed} bytes of scratch memory and none was set"
                )))
            }
        };

        let inner = Arc::clone(&self.inner);
        let bindings = bindings.to_vec();
        stream.submit(Box::new(move || {
            // SAFETY: the caller of `enqueue` keeps bindings and scratch
            // alive and untouched until the stream has run this work.
            unsafe { inner.execute(batch_size, &bindings, scratch) }
        }))
    }
}

// ── Runtime ─────────────────────────────────────────────────────

/// Deserializes reference engines.
#[derive(Debug, Default)]
pub struct NaiveRuntime;

impl EngineRuntime for NaiveRuntime {
    fn deserialize_engine(&self, bytes: &[u8], plugins: &PluginFactory) -> Result<Arc<dyn Engine>, AccelError> {
        let plan = EnginePlan::from_bytes(bytes)?;
        let resolved = plan
            .steps
            .iter()
            .map(|step| match &step.op {
                StepOp::Plugin { plugin_type, data } => plugins.create(plugin_type, &step.name, data).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            "Deserialized engine '{}' ({} bytes, {} steps)",
            plan.name,
            bytes.len(),
            plan.steps.len()
        );
        Ok(Arc::new(NaiveEngine::from_parts(plan, resolved)?))
    }
}
