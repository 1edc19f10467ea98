// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the accelerator layer.

use crate::DeviceType;
use device_memory::MemoryError;
use std::time::Duration;
use tensor_core::{DType, TensorError};

/// Errors raised by devices, engine builders, engines and streams.
#[derive(Debug, thiserror::Error)]
pub enum AccelError {
    /// No device of this type/id is registered.
    #[error("device {device_type} (id {device_id}) is not supported")]
    DeviceNotSupported {
        device_type: DeviceType,
        device_id: u32,
    },

    /// The device cannot compile tensors of this precision.
    #[error("precision {0} is not supported by this device")]
    UnsupportedPrecision(DType),

    /// A native graph operation was given inconsistent operands.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// Engine compilation failed.
    #[error("engine build failed: {0}")]
    Build(String),

    /// Engine serialization failed.
    #[error("engine serialization failed: {0}")]
    Serialize(String),

    /// Engine bytes could not be turned back into an engine.
    #[error("engine deserialization failed: {0}")]
    Deserialize(String),

    /// A serialized engine references a plugin type nobody registered.
    #[error("plugin '{plugin_type}' required by layer '{layer}' is not registered")]
    PluginNotFound { plugin_type: String, layer: String },

    /// A plugin rejected its inputs or its serialized data.
    #[error("plugin error in layer '{layer}': {detail}")]
    Plugin { layer: String, detail: String },

    /// Work could not be enqueued.
    #[error("enqueue failed: {0}")]
    Enqueue(String),

    /// A kernel failed while the stream was executing it.
    #[error("kernel '{node}' failed: {source}")]
    Kernel {
        node: String,
        #[source]
        source: TensorError,
    },

    /// Synchronization did not complete in time.
    #[error("stream synchronization timed out after {0:?}")]
    Timeout(Duration),

    /// The stream worker is gone.
    #[error("stream is closed")]
    StreamClosed,

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
