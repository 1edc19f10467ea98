// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The accelerated network: compiles a model into a device engine (or loads
//! it from the engine cache) and runs inference, with a type-state pipeline.
//!
//! ```text
//! AcceleratedNetwork<Uninitialized>
//!     │  .init(interpreter, input_shapes)
//!     │      blobs allocated → layers built → engine compiled | loaded
//!     │      → context ready → bindings resolved
//!     ▼
//! AcceleratedNetwork<Ready>
//!     │  .forward() / .forward_async(cb) / .forward_await()
//!     ▼
//!   outputs in blob memory
//! ```
//!
//! `init` consumes the uninitialized network, so a failed build leaves
//! nothing behind: blob memory is freed and the cache lock released on
//! every error path.

use crate::binding::BindingTable;
use crate::blob::{ForeignBlob, NativeTensor};
use crate::blob_manager::max_batch_size;
use crate::cache::{CacheKey, CacheStore};
use crate::layer::{create_builder, default_plugin_factory, LayerBuilder, LayerContext};
use crate::{BlobError, BlobManager, CacheError, ModelConfig, NetworkConfig, NetworkMetrics, RuntimeError};
use accelerator::{
    AccelError, BuildConfig, Device, DeviceRegistry, Engine, ExecutionContext, NetworkDefinition, PluginCreator,
    PluginFactory, Stream, StreamCallback, TensorId,
};
use model_ir::graph::Validated;
use model_ir::{LayerSpec, ModelInterpreter, NetStructure};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tensor_core::{Shape, Tensor};
use tracing::{debug, info, info_span, warn};

// ── Type-state markers ─────────────────────────────────────────

/// Configured, nothing allocated yet.
#[derive(Debug)]
pub struct Uninitialized;

/// Engine, context and bindings are in place; inference may run.
#[derive(Debug)]
pub struct Ready;

pub trait NetworkState: fmt::Debug {}
impl NetworkState for Uninitialized {}
impl NetworkState for Ready {}

/// Where the engine of a ready network came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOrigin {
    Compiled,
    LoadedFromCache,
}

impl fmt::Display for BuildOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compiled => "compiled",
            Self::LoadedFromCache => "loaded from cache",
        })
    }
}

/// Fine-grained build stages, reported through `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    Uninitialized,
    BlobsAllocated,
    LayersBuilt,
    EngineCompiled,
    EngineLoadedFromCache,
    ContextReady,
}

impl NetworkStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::BlobsAllocated => "blobs_allocated",
            Self::LayersBuilt => "layers_built",
            Self::EngineCompiled => "engine_compiled",
            Self::EngineLoadedFromCache => "engine_loaded_from_cache",
            Self::ContextReady => "context_ready",
        }
    }
}

impl fmt::Display for NetworkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Network ────────────────────────────────────────────────────

/// A network compiled for one accelerator device.
///
/// # Example
/// ```no_run
/// use model_ir::DefaultModelInterpreter;
/// use std::collections::BTreeMap;
/// use std::path::Path;
/// use trt_runtime::{AcceleratedNetwork, NetworkConfig};
///
/// # fn example() -> Result<(), trt_runtime::RuntimeError> {
/// let interp = DefaultModelInterpreter::from_file(Path::new("model.json"))?;
/// let mut net = AcceleratedNetwork::new(NetworkConfig::default())
///     .init(&interp, &BTreeMap::new())?;
/// net.set_input("x", &[0.0; 3])?;
/// net.forward()?;
/// println!("{:?}", net.output("prob")?.as_f32_slice());
/// # Ok(())
/// # }
/// ```
pub struct AcceleratedNetwork<S: NetworkState = Uninitialized> {
    config: NetworkConfig,
    registry: DeviceRegistry,
    plugins: PluginFactory,
    _state: PhantomData<S>,
    // Populated by `init`:
    session: Option<Session>,
}

/// Everything a ready network owns. Fields drop in declaration order, after
/// the stream has been drained: the context goes before the blob memory it
/// points into.
struct Session {
    stream: Box<dyn Stream>,
    context: Box<dyn ExecutionContext>,
    bindings: BindingTable,
    engine: Arc<dyn Engine>,
    blobs: BlobManager,
    device: Arc<dyn Device>,
    key: CacheKey,
    origin: BuildOrigin,
    sync_timeout: Option<Duration>,
    metrics: Mutex<NetworkMetrics>,
}

// ── Uninitialized → Ready ──────────────────────────────────────

impl AcceleratedNetwork<Uninitialized> {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            registry: DeviceRegistry::default(),
            plugins: default_plugin_factory(),
            _state: PhantomData,
            session: None,
        }
    }

    /// Resolves devices through `registry` instead of the default one.
    pub fn with_registry(mut self, registry: DeviceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the plugin factory used when building and when loading
    /// engines from cache.
    pub fn with_plugin_factory(mut self, plugins: PluginFactory) -> Self {
        self.plugins = plugins;
        self
    }

    /// Adds a plugin creator to the factory.
    pub fn register_plugin(mut self, creator: Arc<dyn PluginCreator>) -> Self {
        self.plugins.register(creator);
        self
    }

    /// Builds the network from the model at `model.model_path`.
    pub fn init_from_model(
        self,
        model: &ModelConfig,
        input_shapes: &BTreeMap<String, Vec<usize>>,
    ) -> Result<AcceleratedNetwork<Ready>, RuntimeError> {
        let interpreter = model.interpret()?;
        self.init(&interpreter, input_shapes)
    }

    /// Compiles the network, or loads its engine from cache.
    ///
    /// `input_shapes` overrides the declared shape of individual inputs;
    /// inputs not named keep their declared shape.
    ///
    /// Steps:
    /// 1. Check the interpreter has parsed both structure and resources.
    /// 2. Resolve the device and the input shapes.
    /// 3. Initialize one builder per layer, inferring every blob shape.
    /// 4. Allocate blobs at the network's max batch size.
    /// 5. Take the cache lock; load the cached engine, or build the native
    ///    network, compile it and persist the result.
    /// 6. Create the execution context and lend it scratch memory.
    /// 7. Release the lock and resolve engine bindings by blob name.
    pub fn init(
        self,
        interpreter: &dyn ModelInterpreter,
        input_shapes: &BTreeMap<String, Vec<usize>>,
    ) -> Result<AcceleratedNetwork<Ready>, RuntimeError> {
        let started = Instant::now();
        let structure = interpreter
            .net_structure()
            .ok_or(RuntimeError::NullParam("network structure"))?;
        let resource = interpreter
            .net_resource()
            .ok_or(RuntimeError::NullParam("resource map"))?;

        let span = info_span!("network_init", network = %structure.name);
        let _enter = span.enter();
        debug!(stage = %NetworkStage::Uninitialized, "{}", structure.summary());

        let device = self
            .registry
            .resolve(self.config.device_type, self.config.device_id)?;
        let workspace = self.config.parse_workspace()?;
        let shapes = resolve_input_shapes(structure, input_shapes)?;
        let max_batch = max_batch_size(&shapes)?;

        // Shape inference runs ahead of allocation so every blob is sized
        // before any device memory is taken.
        let mut blob_shapes = shapes.clone();
        let mut builders: Vec<Box<dyn LayerBuilder>> = Vec::with_capacity(structure.num_layers());
        for layer in structure.iter_layers() {
            let mut builder = create_builder(layer.layer_type)
                .ok_or_else(|| layer_error(layer, "no builder for this layer type"))?;
            let layer_inputs = layer
                .inputs
                .iter()
                .map(|name| {
                    blob_shapes
                        .get(name)
                        .cloned()
                        .ok_or_else(|| layer_error(layer, format!("input blob '{name}' is not produced before use")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let outputs = builder
                .init(LayerContext {
                    spec: layer,
                    input_shapes: layer_inputs,
                    resource: resource.resource(&layer.name),
                })
                .map_err(|e| layer_error(layer, e))?;
            for (name, dims) in layer.outputs.iter().zip(outputs) {
                debug!(layer = %layer.name, blob = %name, ?dims, "Inferred blob shape");
                blob_shapes.insert(name.clone(), dims);
            }
            builders.push(builder);
        }

        let mut blobs = BlobManager::new(
            device.allocator().clone(),
            device.device_type(),
            resource.data_type(),
            max_batch,
            workspace,
        );
        for name in structure.blob_names() {
            let dims = blob_shapes
                .get(name)
                .ok_or_else(|| BlobError::NotFound(name.to_string()))?;
            blobs.create_blob(name, dims)?;
        }
        for name in structure.inputs_shape_map.keys() {
            blobs.mark_input(name)?;
        }
        for name in &structure.outputs {
            blobs.mark_output(name)?;
        }
        debug!(
            stage = %NetworkStage::BlobsAllocated,
            blobs = blobs.len(),
            bytes = blobs.allocated_bytes(),
            max_batch,
            "Allocated blobs"
        );

        let build_config = BuildConfig {
            max_batch_size: max_batch,
            max_workspace_size: workspace.as_bytes(),
        };
        let key = CacheKey::compute(structure, resource, &shapes, &device.identity(), &build_config);
        let stream = device.create_stream()?;

        let store = CacheStore::new(&self.config.cache_dir);
        let lock = if self.config.enable_cache {
            Some(store.lock(&key, self.config.lock_policy)?)
        } else {
            None
        };

        let (engine, origin, engine_bytes) = match &lock {
            Some(lock) if lock.ready() => {
                let bytes = store.load(&key)?.ok_or_else(|| CacheError::Corrupt {
                    path: store.path_for(&key),
                    detail: "removed while locked".into(),
                })?;
                let engine = device.runtime().deserialize_engine(&bytes, &self.plugins)?;
                info!(stage = %NetworkStage::EngineLoadedFromCache, key = %key, "Engine loaded from cache");
                (engine, BuildOrigin::LoadedFromCache, bytes.len())
            }
            _ => {
                let engine = build_engine(device.as_ref(), structure, &mut builders, &mut blobs, &build_config)?;
                info!(
                    stage = %NetworkStage::EngineCompiled,
                    key = %key,
                    bindings = engine.num_bindings(),
                    "Engine compiled"
                );
                let bytes = engine.serialize()?;
                if lock.is_some() {
                    store.store(&key, &bytes)?;
                }
                (engine, BuildOrigin::Compiled, bytes.len())
            }
        };
        drop(builders);

        let mut context = engine.create_execution_context_without_device_memory()?;
        let scratch = blobs.scratch_memory(engine.device_memory_size())?;
        context.set_device_memory(scratch)?;
        debug!(
            stage = %NetworkStage::ContextReady,
            scratch_bytes = scratch.len(),
            "Execution context ready"
        );

        drop(lock);
        let bindings = BindingTable::build(engine.as_ref(), &blobs)?;

        let mut metrics = NetworkMetrics::new(origin);
        metrics.finalise(started.elapsed(), engine_bytes, blobs.allocated_bytes());
        info!("{}", metrics.summary());

        let sync_timeout = self.config.sync_timeout();
        Ok(AcceleratedNetwork {
            config: self.config,
            registry: self.registry,
            plugins: self.plugins,
            _state: PhantomData,
            session: Some(Session {
                stream,
                context,
                bindings,
                engine,
                blobs,
                device,
                key,
                origin,
                sync_timeout,
                metrics: Mutex::new(metrics),
            }),
        })
    }
}

// ── Ready: inference ───────────────────────────────────────────

impl AcceleratedNetwork<Ready> {
    /// Runs one inference and waits for the device to finish.
    pub fn forward(&self) -> Result<(), RuntimeError> {
        let session = self.session();
        let started = Instant::now();
        session.enqueue()?;
        session.synchronize()?;
        session.metrics.lock().record_forward(started.elapsed());
        Ok(())
    }

    /// Enqueues one inference and returns without waiting.
    ///
    /// `callback`, if given, runs on the stream once the work has completed
    /// and receives the stream status. Outputs may be read at any time:
    /// host accessors synchronize first.
    pub fn forward_async(&self, callback: Option<StreamCallback>) -> Result<(), RuntimeError> {
        let session = self.session();
        session.enqueue()?;
        if let Some(callback) = callback {
            session.stream.add_callback(callback)?;
        }
        session.metrics.lock().record_async();
        Ok(())
    }

    /// Enqueues one inference and resolves once the device has finished.
    pub async fn forward_await(&mut self) -> Result<(), RuntimeError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.forward_async(Some(Box::new(move |status: Result<(), &AccelError>| {
            let _ = tx.send(status.is_ok());
        })))?;
        let completed = rx.await.map_err(|_| RuntimeError::from(AccelError::StreamClosed))?;
        // Collects the stream error, if any, and clears it.
        self.synchronize()?;
        if !completed {
            return Err(AccelError::Enqueue("forward pass failed on the stream".into()).into());
        }
        Ok(())
    }

    /// Waits for all enqueued work.
    pub fn synchronize(&self) -> Result<(), RuntimeError> {
        Ok(self.session().synchronize()?)
    }

    /// Copies `values` into input blob `name`. Covers the blob's full shape.
    pub fn set_input(&mut self, name: &str, values: &[f32]) -> Result<(), RuntimeError> {
        self.synchronize()?;
        let session = self.session_mut();
        if !session.blobs.input_names().iter().any(|n| n == name) {
            return Err(RuntimeError::InvalidInput(format!("'{name}' is not a network input")));
        }
        session.blobs.write_f32(name, values)?;
        Ok(())
    }

    /// Reads input or output blob `name` into a host tensor.
    pub fn output(&self, name: &str) -> Result<Tensor, RuntimeError> {
        self.synchronize()?;
        let blobs = &self.session().blobs;
        let exposed = blobs.input_names().iter().chain(blobs.output_names()).any(|n| n == name);
        if !exposed {
            return Err(RuntimeError::InvalidInput(format!(
                "'{name}' is not a network input or output"
            )));
        }
        let dims = blobs.desc(name)?.dims.clone();
        let data = blobs.read_f32(name)?;
        Tensor::from_vec(Shape::new(dims), data).map_err(|e| RuntimeError::InvalidInput(e.to_string()))
    }

    pub fn input_names(&self) -> &[String] {
        self.session().blobs.input_names()
    }

    pub fn output_names(&self) -> &[String] {
        self.session().blobs.output_names()
    }

    /// Full `[N, ...]` shape of a blob.
    pub fn blob_dims(&self, name: &str) -> Result<&[usize], RuntimeError> {
        Ok(&self.session().blobs.desc(name)?.dims)
    }

    pub fn max_batch_size(&self) -> usize {
        self.session().blobs.max_batch_size()
    }

    pub fn build_origin(&self) -> BuildOrigin {
        self.session().origin
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.session().key
    }

    pub fn num_bindings(&self) -> usize {
        self.session().engine.num_bindings()
    }

    /// Scratch memory the engine's execution context uses.
    pub fn device_memory_size(&self) -> usize {
        self.session().engine.device_memory_size()
    }

    /// Serialized form of the engine, as it is stored in the cache.
    pub fn serialized_engine(&self) -> Result<Vec<u8>, RuntimeError> {
        Ok(self.session().engine.serialize()?)
    }

    pub fn device_identity(&self) -> String {
        self.session().device.identity()
    }

    pub fn metrics(&self) -> NetworkMetrics {
        self.session().metrics.lock().clone()
    }

    // ── Private helpers ────────────────────────────────────────

    fn session(&self) -> &Session {
        self.session.as_ref().expect("session exists in Ready state")
    }

    fn session_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("session exists in Ready state")
    }
}

impl<S: NetworkState> AcceleratedNetwork<S> {
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

impl<S: NetworkState> fmt::Debug for AcceleratedNetwork<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratedNetwork")
            .field("state", &std::any::type_name::<S>())
            .field("device_type", &self.config.device_type)
            .field("device_id", &self.config.device_id)
            .field("plugins", &self.plugins)
            .field("origin", &self.session.as_ref().map(|s| s.origin))
            .field("key", &self.session.as_ref().map(|s| s.key.as_str()))
            .finish()
    }
}

impl Session {
    fn enqueue(&self) -> Result<(), AccelError> {
        self.context
            .enqueue(self.blobs.max_batch_size(), self.bindings.as_slice(), self.stream.as_ref())
    }

    fn synchronize(&self) -> Result<(), AccelError> {
        match self.sync_timeout {
            Some(timeout) => self.stream.synchronize_timeout(timeout),
            None => self.stream.synchronize(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.stream.synchronize() {
            warn!(error = %e, "Stream reported an error while releasing the network");
        }
    }
}

// ── Build helpers ──────────────────────────────────────────────

/// Declared input shapes with `overrides` applied.
fn resolve_input_shapes(
    structure: &NetStructure<Validated>,
    overrides: &BTreeMap<String, Vec<usize>>,
) -> Result<BTreeMap<String, Vec<usize>>, RuntimeError> {
    let mut shapes = structure.inputs_shape_map.clone();
    for (name, dims) in overrides {
        match shapes.get_mut(name) {
            Some(slot) => *slot = dims.clone(),
            None => {
                return Err(RuntimeError::InvalidInput(format!(
                    "shape given for unknown input '{name}'"
                )))
            }
        }
    }
    Ok(shapes)
}

fn layer_error(layer: &LayerSpec, detail: impl fmt::Display) -> RuntimeError {
    RuntimeError::LayerConstruction {
        layer: layer.name.clone(),
        layer_type: layer.layer_type.as_str().to_string(),
        detail: detail.to_string(),
    }
}

/// Wraps blob `name` with native tensor `id`.
fn attach(blobs: &mut BlobManager, name: &str, id: TensorId) -> Result<(), BlobError> {
    let mut foreign = ForeignBlob::new(Arc::clone(blobs.entry(name)?.blob()));
    foreign.set_foreign_tensor(Arc::new(NativeTensor::new(id)))?;
    blobs.replace_blob(name, foreign)
}

/// Emits every layer into a fresh native network and compiles it.
fn build_engine(
    device: &dyn Device,
    structure: &NetStructure<Validated>,
    builders: &mut [Box<dyn LayerBuilder>],
    blobs: &mut BlobManager,
    config: &BuildConfig,
) -> Result<Arc<dyn Engine>, RuntimeError> {
    let mut network = NetworkDefinition::new(structure.name.as_str());

    for name in structure.inputs_shape_map.keys() {
        let desc = blobs.desc(name)?.clone();
        let id = network.add_input(name, desc.dtype, desc.per_sample_dims())?;
        attach(blobs, name, id)?;
    }

    for (layer, builder) in structure.iter_layers().zip(builders.iter_mut()) {
        let node = builder
            .add_to_network(&mut network, blobs)
            .map_err(|e| layer_error(layer, e))?;
        let output = network.node_output(node);
        for name in &layer.outputs {
            network.set_tensor_name(output, name)?;
            attach(blobs, name, output)?;
        }
        debug!(layer = %layer.name, node = node.index(), "Added layer to network");
    }

    for name in blobs.output_names() {
        let id = blobs
            .entry(name)?
            .native_tensor()
            .ok_or_else(|| RuntimeError::Binding(format!("output blob '{name}' has no native tensor")))?;
        network.mark_output(id)?;
    }
    debug!(
        stage = %NetworkStage::LayersBuilt,
        nodes = network.nodes().len(),
        outputs = network.outputs().len(),
        "Native network assembled"
    );

    Ok(device.builder().build_engine(&network, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusCode;
    use model_ir::DefaultModelInterpreter;
    use tempfile::TempDir;

    const MLP: &str = r#"{
        "name": "tiny-mlp",
        "precision": "f32",
        "inputs": { "x": [1, 3] },
        "outputs": ["prob"],
        "layers": [
            { "name": "fc1", "type": "inner_product", "inputs": ["x"], "outputs": ["h"],
              "param": { "kind": "inner_product", "num_output": 2 } },
            { "name": "act", "type": "relu", "inputs": ["h"], "outputs": ["a"] },
            { "name": "sm", "type": "softmax", "inputs": ["a"], "outputs": ["prob"],
              "param": { "kind": "softmax", "axis": 1 } }
        ],
        "resources": {
            "fc1": {
                "weight": { "shape": [2, 3], "data": [1, 0, 0, 0, 1, 0] },
                "bias": { "shape": [2], "data": [0.5, -0.5] }
            }
        }
    }"#;

    fn mlp() -> DefaultModelInterpreter {
        DefaultModelInterpreter::from_json(MLP).unwrap()
    }

    #[test]
    fn test_mlp_forward() {
        let dir = TempDir::new().unwrap();
        let mut net = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
            .init(&mlp(), &BTreeMap::new())
            .unwrap();
        assert_eq!(net.build_origin(), BuildOrigin::Compiled);
        assert_eq!(net.input_names(), ["x".to_string()]);
        assert_eq!(net.output_names(), ["prob".to_string()]);
        assert_eq!(net.num_bindings(), 2);

        // fc1: [1.5, 1.5] → relu → softmax = [0.5, 0.5]
        net.set_input("x", &[1.0, 2.0, 3.0]).unwrap();
        net.forward().unwrap();
        let prob = net.output("prob").unwrap();
        assert_eq!(prob.shape().dims(), &[1, 2]);
        for p in prob.as_f32_slice() {
            assert!((p - 0.5).abs() < 1e-6);
        }
        assert_eq!(net.metrics().forward_count, 1);
    }

    #[test]
    fn test_second_init_loads_from_cache() {
        let dir = TempDir::new().unwrap();
        let config = NetworkConfig::naive(dir.path());
        let first = AcceleratedNetwork::new(config.clone()).init(&mlp(), &BTreeMap::new()).unwrap();
        let second = AcceleratedNetwork::new(config).init(&mlp(), &BTreeMap::new()).unwrap();
        assert_eq!(second.build_origin(), BuildOrigin::LoadedFromCache);
        assert_eq!(first.cache_key(), second.cache_key());
        assert_eq!(first.serialized_engine().unwrap(), second.serialized_engine().unwrap());
    }

    #[test]
    fn test_cache_disabled_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = NetworkConfig {
            enable_cache: false,
            ..NetworkConfig::naive(dir.path().join("cache"))
        };
        let net = AcceleratedNetwork::new(config).init(&mlp(), &BTreeMap::new()).unwrap();
        assert_eq!(net.build_origin(), BuildOrigin::Compiled);
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn test_batch_override() {
        let dir = TempDir::new().unwrap();
        let shapes = BTreeMap::from([("x".to_string(), vec![4, 3])]);
        let mut net = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
            .init(&mlp(), &shapes)
            .unwrap();
        assert_eq!(net.max_batch_size(), 4);
        assert_eq!(net.blob_dims("prob").unwrap(), &[4, 2]);

        net.set_input("x", &[0.0; 12]).unwrap();
        net.forward().unwrap();
        assert_eq!(net.output("prob").unwrap().num_elements(), 8);
    }

    #[test]
    fn test_unknown_input_override() {
        let dir = TempDir::new().unwrap();
        let shapes = BTreeMap::from([("nope".to_string(), vec![1, 3])]);
        let err = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
            .init(&mlp(), &shapes)
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidInput);
    }

    #[test]
    fn test_missing_weight_names_layer() {
        let dir = TempDir::new().unwrap();
        let json = MLP.replace("\"weight\"", "\"weights\"");
        let interp = DefaultModelInterpreter::from_json(&json).unwrap();
        let err = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
            .init(&interp, &BTreeMap::new())
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::LayerError);
        assert!(err.to_string().contains("'fc1' (inner_product)"));
    }

    #[test]
    fn test_host_access_rejects_hidden_blobs() {
        let dir = TempDir::new().unwrap();
        let mut net = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
            .init(&mlp(), &BTreeMap::new())
            .unwrap();
        assert!(matches!(net.set_input("prob", &[0.0; 2]), Err(RuntimeError::InvalidInput(_))));
        assert!(matches!(net.output("h"), Err(RuntimeError::InvalidInput(_))));
        assert!(matches!(
            net.set_input("x", &[0.0; 2]),
            Err(RuntimeError::Blob(BlobError::SizeMismatch { .. }))
        ));
    }

    #[test]
    fn test_debug_shows_state() {
        let net = AcceleratedNetwork::new(NetworkConfig::default());
        let s = format!("{net:?}");
        assert!(s.contains("Uninitialized"));
    }
}
