// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accelerator
//!
//! The vendor-facing half of the runtime: what a graph compiler for an
//! inference accelerator exposes, expressed as traits.
//!
//! - [`NetworkDefinition`]: native graph with per-sample shapes.
//! - [`EngineBuilder`] / [`EngineRuntime`]: compile a network, or rebuild
//!   an engine from its serialized bytes.
//! - [`Engine`] / [`ExecutionContext`]: named bindings and asynchronous
//!   enqueue onto a [`Stream`].
//! - [`Plugin`] / [`PluginFactory`]: custom layers that survive
//!   serialization.
//! - [`DeviceRegistry`]: resolves a device type and id to a [`Device`].
//!
//! The [`reference`] module implements all of it on the host so the runtime
//! can be exercised without vendor hardware.

mod device;
mod engine;
mod error;
mod network;
mod plugin;
pub mod reference;
mod stream;

pub use device::{Device, DeviceFactory, DeviceRegistry, DeviceType, NaiveDeviceFactory};
pub use engine::{BuildConfig, Engine, EngineBuilder, EngineRuntime, ExecutionContext};
pub use error::AccelError;
pub use network::{ActivationKind, NativeOp, NetworkDefinition, Node, NodeId, TensorId, TensorInfo};
pub use plugin::{Plugin, PluginCreator, PluginFactory};
pub use stream::{HostStream, Stream, StreamCallback, StreamWork};
