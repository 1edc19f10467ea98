// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine builder, runtime, engine and execution-context traits.
//!
//! ```text
//! NetworkDefinition ──build_engine──► Engine ──serialize──► Vec<u8>
//!                                       ▲                      │
//!                                       └──deserialize_engine──┘
//! Engine ──create_execution_context_without_device_memory──► ExecutionContext
//!            (+ set_device_memory(scratch)) ──enqueue(batch, bindings, stream)
//! ```

use crate::{AccelError, NetworkDefinition, PluginFactory, Stream};
use device_memory::{DeviceMemory, DevicePtr};
use std::fmt;
use std::sync::Arc;

/// Parameters that influence compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BuildConfig {
    /// Largest batch the engine must accept.
    pub max_batch_size: usize,
    /// Upper bound on execution-context scratch memory in bytes.
    pub max_workspace_size: usize,
}

/// Compiles a native network into an engine.
pub trait EngineBuilder {
    fn build_engine(&self, network: &NetworkDefinition, config: &BuildConfig) -> Result<Arc<dyn Engine>, AccelError>;
}

/// Turns serialized engine bytes back into an engine.
pub trait EngineRuntime {
    /// Plugin nodes are recreated through `plugins`.
    fn deserialize_engine(&self, bytes: &[u8], plugins: &PluginFactory) -> Result<Arc<dyn Engine>, AccelError>;
}

/// A compiled, immutable engine.
///
/// Bindings are the engine's input/output slots; each is addressed by index
/// and carries the name of the tensor it was compiled from.
pub trait Engine: Send + Sync + fmt::Debug {
    fn num_bindings(&self) -> usize;

    fn binding_index(&self, name: &str) -> Option<usize>;

    fn binding_name(&self, index: usize) -> Option<&str>;

    fn binding_is_input(&self, index: usize) -> bool;

    /// Per-sample dims of a binding.
    fn binding_dims(&self, index: usize) -> Option<&[usize]>;

    fn max_batch_size(&self) -> usize;

    /// Scratch bytes an execution context needs at max batch size.
    fn device_memory_size(&self) -> usize;

    fn serialize(&self) -> Result<Vec<u8>, AccelError>;

    /// Creates a context that will borrow scratch memory from the caller.
    fn create_execution_context_without_device_memory(&self) -> Result<Box<dyn ExecutionContext>, AccelError>;
}

/// Per-engine execution state.
pub trait ExecutionContext: Send {
    /// Lends the context its scratch region. The caller keeps ownership and
    /// must keep the region alive while work enqueued by this context is in
    /// flight.
    fn set_device_memory(&mut self, memory: DeviceMemory) -> Result<(), AccelError>;

    /// Enqueues one run over `batch_size` samples on `stream`.
    ///
    /// `bindings[i]` is the device address for binding `i`. The buffers
    /// behind them must stay alive until the stream has completed this work.
    fn enqueue(&self, batch_size: usize, bindings: &[DevicePtr], stream: &dyn Stream) -> Result<(), AccelError>;
}
