// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! device_type = "naive"
//! device_id = 0
//! cache_dir = ".engine_cache"
//! enable_cache = true
//! max_workspace = "256M"
//! sync_timeout_ms = 30000
//!
//! [lock_policy]
//! mode = "timeout"
//! timeout_ms = 5000
//! ```

use crate::RuntimeError;
use accelerator::DeviceType;
use device_memory::MemoryBudget;
use model_ir::DefaultModelInterpreter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when another process holds the engine-cache lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LockPolicy {
    /// Wait until the lock is free.
    #[default]
    Block,
    /// Wait up to `timeout_ms`, then fail with a retryable contention error.
    Timeout { timeout_ms: u64 },
    /// Fail with a retryable contention error right away.
    NoWait,
}

/// Configuration for an [`AcceleratedNetwork`](crate::AcceleratedNetwork).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Target accelerator family.
    pub device_type: DeviceType,
    pub device_id: u32,
    /// Directory holding compiled engines.
    pub cache_dir: PathBuf,
    /// When false, engines are always compiled and never persisted.
    pub enable_cache: bool,
    /// Scratch-memory cap for the execution context (e.g. `"256M"`).
    pub max_workspace: String,
    /// Bound on every stream synchronization; `None` waits indefinitely.
    pub sync_timeout_ms: Option<u64>,
    /// Kept last: TOML tables must follow plain values.
    pub lock_policy: LockPolicy,
}

impl NetworkConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("cannot read config '{}': {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str).map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the workspace cap.
    pub fn parse_workspace(&self) -> Result<MemoryBudget, RuntimeError> {
        MemoryBudget::parse(&self.max_workspace)
            .map_err(|e| RuntimeError::Config(format!("invalid max_workspace: {e}")))
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_ms.map(Duration::from_millis)
    }

    /// A config for the host reference device caching into `cache_dir`.
    pub fn naive(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::Naive,
            device_id: 0,
            cache_dir: PathBuf::from(".engine_cache"),
            enable_cache: true,
            max_workspace: "256M".to_string(),
            sync_timeout_ms: None,
            lock_policy: LockPolicy::Block,
        }
    }
}

/// Where the model description lives.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    pub model_path: PathBuf,
}

impl ModelConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }

    /// Parses the model description into an interpreter.
    pub fn interpret(&self) -> Result<DefaultModelInterpreter, RuntimeError> {
        Ok(DefaultModelInterpreter::from_file(&self.model_path)?)
    }
}
