// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Custom (non-native) layer implementations.
//!
//! A [`Plugin`] runs inside a compiled engine like any native node. Engines
//! persist a plugin as its type name plus [`Plugin::serialize`] bytes; on
//! deserialization the [`PluginFactory`] looks up the [`PluginCreator`]
//! registered under that type name and rebuilds the plugin from those bytes.

use crate::AccelError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A custom single-output operation.
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Type name the creator is registered under.
    fn plugin_type(&self) -> &str;

    /// Per-sample output dims for the given per-sample input dims.
    fn output_dims(&self, input_dims: &[Vec<usize>]) -> Result<Vec<usize>, AccelError>;

    /// Parameters needed to recreate this plugin.
    fn serialize(&self) -> Vec<u8>;

    /// Computes one sample.
    fn enqueue(&self, inputs: &[&[f32]], output: &mut [f32]) -> Result<(), AccelError>;
}

/// Rebuilds plugins of one type from their serialized parameters.
pub trait PluginCreator: Send + Sync {
    fn plugin_type(&self) -> &str;

    fn create(&self, layer_name: &str, data: &[u8]) -> Result<Arc<dyn Plugin>, AccelError>;
}

/// Registry of plugin creators, keyed by plugin type.
#[derive(Clone, Default)]
pub struct PluginFactory {
    creators: BTreeMap<String, Arc<dyn PluginCreator>>,
}

impl PluginFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a creator, replacing any previous one of the same type.
    pub fn register(&mut self, creator: Arc<dyn PluginCreator>) {
        let plugin_type = creator.plugin_type().to_string();
        tracing::debug!("registered plugin creator '{plugin_type}'");
        self.creators.insert(plugin_type, creator);
    }

    pub fn contains(&self, plugin_type: &str) -> bool {
        self.creators.contains_key(plugin_type)
    }

    /// Recreates the plugin for `layer_name` from its serialized parameters.
    pub fn create(&self, plugin_type: &str, layer_name: &str, data: &[u8]) -> Result<Arc<dyn Plugin>, AccelError> {
        let creator = self
            .creators
            .get(plugin_type)
            .ok_or_else(|| AccelError::PluginNotFound {
                plugin_type: plugin_type.to_string(),
                layer: layer_name.to_string(),
            })?;
        creator.create(layer_name, data)
    }

    pub fn plugin_types(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.creators.keys()).finish()
    }
}
