// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The host reference device.
//!
//! Engines compile to an [`EnginePlan`](plan::EnginePlan) that runs the
//! `tensor-core` kernels over device memory handed out by a
//! [`DeviceAllocator`]. Work executes on a [`HostStream`] worker thread, so
//! enqueue is asynchronous exactly as on a real accelerator.

mod builder;
mod engine;
pub mod plan;

pub use builder::NaiveBuilder;
pub use engine::{NaiveContext, NaiveEngine, NaiveRuntime};

use crate::{AccelError, Device, DeviceType, EngineBuilder, EngineRuntime, HostStream, Stream};
use device_memory::DeviceAllocator;
use plan::PLAN_FORMAT_VERSION;

#[derive(Debug)]
pub struct NaiveDevice {
    device_id: u32,
    allocator: DeviceAllocator,
}

impl NaiveDevice {
    pub fn new(device_id: u32, allocator: DeviceAllocator) -> Self {
        Self { device_id, allocator }
    }
}

impl Device for NaiveDevice {
    fn device_type(&self) -> DeviceType {
        DeviceType::Naive
    }

    fn device_id(&self) -> u32 {
        self.device_id
    }

    fn identity(&self) -> String {
        format!("naive-host:{}:plan-v{PLAN_FORMAT_VERSION}", self.device_id)
    }

    fn allocator(&self) -> &DeviceAllocator {
        &self.allocator
    }

    fn create_stream(&self) -> Result<Box<dyn Stream>, AccelError> {
        Ok(Box::new(HostStream::new(&format!("naive{}", self.device_id))?))
    }

    fn builder(&self) -> Box<dyn EngineBuilder> {
        Box::new(NaiveBuilder)
    }

    fn runtime(&self) -> Box<dyn EngineRuntime> {
        Box::new(NaiveRuntime)
    }
}
