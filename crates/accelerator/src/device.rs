// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Devices and the device registry.

use crate::reference::NaiveDevice;
use crate::{AccelError, EngineBuilder, EngineRuntime, Stream};
use device_memory::{DeviceAllocator, MemoryBudget};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Accelerator families a network can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Host reference device.
    Naive,
    /// Vendor GPU.
    Cuda,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Cuda => "cuda",
        }
    }

    /// Parses a device type name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "naive" | "host" | "cpu" => Some(Self::Naive),
            "cuda" | "gpu" | "tensorrt" => Some(Self::Cuda),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accelerator a network can be compiled for and run on.
pub trait Device: Send + Sync + fmt::Debug {
    fn device_type(&self) -> DeviceType;

    fn device_id(&self) -> u32;

    /// Stable identity string. Anything that changes what a compiled engine
    /// looks like (device model, builder version, plan format) is part of it.
    fn identity(&self) -> String;

    /// Allocator for device memory on this device.
    fn allocator(&self) -> &DeviceAllocator;

    fn create_stream(&self) -> Result<Box<dyn Stream>, AccelError>;

    fn builder(&self) -> Box<dyn EngineBuilder>;

    fn runtime(&self) -> Box<dyn EngineRuntime>;
}

/// Opens devices of one type by id.
pub trait DeviceFactory: Send + Sync {
    fn open(&self, device_id: u32) -> Result<Arc<dyn Device>, AccelError>;
}

/// Resolves `(DeviceType, device_id)` to a device.
///
/// The default registry holds only the host reference device; a vendor
/// backend registers its own factory.
#[derive(Clone)]
pub struct DeviceRegistry {
    factories: HashMap<DeviceType, Arc<dyn DeviceFactory>>,
}

impl DeviceRegistry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, device_type: DeviceType, factory: Arc<dyn DeviceFactory>) {
        self.factories.insert(device_type, factory);
    }

    pub fn supports(&self, device_type: DeviceType) -> bool {
        self.factories.contains_key(&device_type)
    }

    pub fn resolve(&self, device_type: DeviceType, device_id: u32) -> Result<Arc<dyn Device>, AccelError> {
        let factory = self
            .factories
            .get(&device_type)
            .ok_or(AccelError::DeviceNotSupported {
                device_type,
                device_id,
            })?;
        factory.open(device_id)
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DeviceType::Naive, Arc::new(NaiveDeviceFactory::default()));
        registry
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Opens the host reference device. Only id 0 exists; every open shares
/// one allocator, as handles to a physical device would.
pub struct NaiveDeviceFactory {
    allocator: DeviceAllocator,
}

impl NaiveDeviceFactory {
    pub fn with_budget(budget: MemoryBudget) -> Self {
        Self {
            allocator: DeviceAllocator::new(budget),
        }
    }
}

impl Default for NaiveDeviceFactory {
    fn default() -> Self {
        Self::with_budget(MemoryBudget::unlimited())
    }
}

impl DeviceFactory for NaiveDeviceFactory {
    fn open(&self, device_id: u32) -> Result<Arc<dyn Device>, AccelError> {
        if device_id != 0 {
            return Err(AccelError::DeviceNotSupported {
                device_type: DeviceType::Naive,
                device_id,
            });
        }
        Ok(Arc::new(NaiveDevice::new(device_id, self.allocator.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = DeviceRegistry::default();
        assert!(registry.supports(DeviceType::Naive));
        assert!(!registry.supports(DeviceType::Cuda));

        let device = registry.resolve(DeviceType::Naive, 0).unwrap();
        assert_eq!(device.device_type(), DeviceType::Naive);
        assert!(device.identity().starts_with("naive"));
    }

    #[test]
    fn test_unsupported() {
        let registry = DeviceRegistry::default();
        assert!(matches!(
            registry.resolve(DeviceType::Cuda, 0),
            Err(AccelError::DeviceNotSupported {
                device_type: DeviceType::Cuda,
                device_id: 0
            })
        ));
        assert!(registry.resolve(DeviceType::Naive, 3).is_err());
        assert!(DeviceRegistry::empty().resolve(DeviceType::Naive, 0).is_err());
    }

    #[test]
    fn test_device_type_parse() {
        assert_eq!(DeviceType::parse("CUDA"), Some(DeviceType::Cuda));
        assert_eq!(DeviceType::parse("host"), Some(DeviceType::Naive));
        assert_eq!(DeviceType::parse("tpu"), None);
        assert_eq!(DeviceType::Naive.to_string(), "naive");
    }
}
