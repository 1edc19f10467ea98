// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::{BlobManager, RuntimeError};
use accelerator::Engine;
use device_memory::DevicePtr;
use tracing::debug;

/// Device addresses indexed by engine binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    slots: Vec<DevicePtr>,
}

impl BindingTable {
    /// Resolves every network input and output blob to its engine binding
    /// by name.
    ///
    /// Fails if a blob has no binding, if its direction or per-sample shape
    /// disagrees with the binding, or if some binding is left without a
    /// blob.
    pub fn build(engine: &dyn Engine, blobs: &BlobManager) -> Result<Self, RuntimeError> {
        let mut slots = vec![DevicePtr::NULL; engine.num_bindings()];

        let named = blobs
            .input_names()
            .iter()
            .map(|n| (n, true))
            .chain(blobs.output_names().iter().map(|n| (n, false)));
        for (name, is_input) in named {
            let index = engine
                .binding_index(name)
                .ok_or_else(|| RuntimeError::Binding(format!("blob '{name}' has no engine binding")))?;
            if engine.binding_is_input(index) != is_input {
                return Err(RuntimeError::Binding(format!(
                    "blob '{name}' is an {} but binding {index} is not",
                    if is_input { "input" } else { "output" }
                )));
            }
            let desc = blobs.desc(name)?;
            let dims = engine.binding_dims(index).unwrap_or(&[]);
            if dims != desc.per_sample_dims() {
                return Err(RuntimeError::Binding(format!(
                    "blob '{name}' has per-sample dims {:?}, binding {index} has {dims:?}",
                    desc.per_sample_dims()
                )));
            }
            slots[index] = blobs.entry(name)?.blob().handle().ptr;
            debug!(blob = %name, index, "Bound blob");
        }

        if let Some(index) = slots.iter().position(|p| p.is_null()) {
            return Err(RuntimeError::Binding(format!(
                "engine binding {index} ('{}') has no blob",
                engine.binding_name(index).unwrap_or("?")
            )));
        }
        Ok(Self { slots })
    }

    pub fn as_slice(&self) -> &[DevicePtr] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
