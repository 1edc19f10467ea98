// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end compile, cache and inference.
//!
//! These tests drive `AcceleratedNetwork` on the host reference device
//! through every init outcome (compiled, loaded from cache, failed) and
//! check that the cache directory is left consistent after each.

use accelerator::{AccelError, DeviceRegistry, DeviceType, NaiveDeviceFactory, PluginFactory};
use device_memory::MemoryBudget;
use model_ir::{
    DefaultModelInterpreter, LayerParam, LayerResource, LayerSpec, LayerType, NetResource, NetStructure,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::time::Duration;
use tempfile::TempDir;
use tensor_core::{Shape, Tensor};
use trt_runtime::{
    AcceleratedNetwork, BuildOrigin, CacheStore, LockPolicy, ModelConfig, NetworkConfig, Ready, RuntimeError,
    StatusCode,
};

// ── Helpers ────────────────────────────────────────────────────

/// x → relu → y
fn relu_model(dims: Vec<usize>) -> DefaultModelInterpreter {
    let structure = NetStructure::new(
        "relu-net",
        BTreeMap::from([("x".to_string(), dims)]),
        BTreeSet::from(["y".to_string()]),
        vec![LayerSpec::new("act", LayerType::Relu, &["x"], &["y"])],
    )
    .validate()
    .unwrap();
    DefaultModelInterpreter::from_parts(Some(structure), Some(NetResource::default()))
}

/// x → fc → ln → hard_swish → (+ x_skip) → y, every native op plus a plugin.
fn block_model(fc_scale: f32) -> DefaultModelInterpreter {
    let layers = vec![
        LayerSpec::new("fc", LayerType::InnerProduct, &["x"], &["h"]).with_param(LayerParam::InnerProduct {
            num_output: 4,
            has_bias: true,
        }),
        LayerSpec::new("ln", LayerType::LayerNorm, &["h"], &["n"]).with_param(LayerParam::LayerNorm { eps: 1e-5 }),
        LayerSpec::new("hs", LayerType::HardSwish, &["n"], &["a"]),
        LayerSpec::new("skip", LayerType::Sigmoid, &["h"], &["g"]),
        LayerSpec::new("sum", LayerType::Add, &["a", "g"], &["y"]),
    ];
    let structure = NetStructure::new(
        "block",
        BTreeMap::from([("x".to_string(), vec![2, 4])]),
        BTreeSet::from(["y".to_string()]),
        layers,
    )
    .validate()
    .unwrap();

    let weight: Vec<f32> = (0..16).map(|i| (i as f32 - 7.5) * 0.1 * fc_scale).collect();
    let resource_map = BTreeMap::from([
        (
            "fc".to_string(),
            Arc::new(
                LayerResource::new()
                    .with_weight("weight", Tensor::from_vec(Shape::matrix(4, 4), weight).unwrap())
                    .with_weight("bias", Tensor::from_f32(Shape::vector(4), &[0.1, -0.1, 0.2, -0.2]).unwrap()),
            ),
        ),
        (
            "ln".to_string(),
            Arc::new(
                LayerResource::new()
                    .with_weight("scale", Tensor::from_f32(Shape::vector(4), &[1.0, 2.0, 1.0, 0.5]).unwrap())
                    .with_weight("bias", Tensor::zeros(Shape::vector(4))),
            ),
        ),
    ]);
    DefaultModelInterpreter::from_parts(
        Some(structure),
        Some(NetResource {
            resource_map,
            ..NetResource::default()
        }),
    )
}

fn init(config: NetworkConfig, model: &DefaultModelInterpreter) -> Result<AcceleratedNetwork<Ready>, RuntimeError> {
    AcceleratedNetwork::new(config).init(model, &BTreeMap::new())
}

fn lock_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".lock"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn run_block(net: &mut AcceleratedNetwork<Ready>) -> Vec<f32> {
    let x: Vec<f32> = (0..8).map(|i| i as f32 * 0.25 - 1.0).collect();
    net.set_input("x", &x).unwrap();
    net.forward().unwrap();
    net.output("y").unwrap().into_vec()
}

// ── Core scenarios ─────────────────────────────────────────────

#[test]
fn test_relu_224() {
    let dir = TempDir::new().unwrap();
    let mut net = init(NetworkConfig::naive(dir.path()), &relu_model(vec![1, 3, 224, 224])).unwrap();
    let n = 3 * 224 * 224;

    net.set_input("x", &vec![0.0; n]).unwrap();
    net.forward().unwrap();
    let y = net.output("y").unwrap();
    assert_eq!(y.shape().dims(), &[1, 3, 224, 224]);
    assert!(y.as_f32_slice().iter().all(|&v| v == 0.0));

    let mut x: Vec<f32> = (0..n).map(|i| (i % 7) as f32).collect();
    x[1234] = -3.5;
    net.set_input("x", &x).unwrap();
    net.forward().unwrap();
    let y = net.output("y").unwrap().into_vec();
    assert_eq!(y[1234], 0.0);
    assert_eq!(y[1235], x[1235]);

    assert!(lock_files(dir.path()).is_empty());
}

#[test]
fn test_missing_resource_is_null_param() {
    let dir = TempDir::new().unwrap();
    let model = relu_model(vec![1, 4]).without_resource();
    let err = init(NetworkConfig::naive(dir.path()), &model).unwrap_err();

    assert!(matches!(err, RuntimeError::NullParam(_)));
    assert_eq!(err.code(), StatusCode::NullParam);
    assert!(lock_files(dir.path()).is_empty());
    assert!(CacheStore::new(dir.path()).list().unwrap().is_empty());
}

#[test]
fn test_missing_structure_is_null_param() {
    let dir = TempDir::new().unwrap();
    let model = DefaultModelInterpreter::from_parts(None, Some(NetResource::default()));
    let err = init(NetworkConfig::naive(dir.path()), &model).unwrap_err();
    assert_eq!(err.code(), StatusCode::NullParam);
}

#[test]
fn test_unsupported_device() {
    let dir = TempDir::new().unwrap();
    let config = NetworkConfig {
        device_type: DeviceType::Cuda,
        ..NetworkConfig::naive(dir.path())
    };
    let err = init(config, &relu_model(vec![1, 4])).unwrap_err();
    assert_eq!(err.code(), StatusCode::DeviceNotSupported);
    assert!(lock_files(dir.path()).is_empty());

    let config = NetworkConfig {
        device_id: 3,
        ..NetworkConfig::naive(dir.path())
    };
    assert_eq!(init(config, &relu_model(vec![1, 4])).unwrap_err().code(), StatusCode::DeviceNotSupported);
}

#[test]
fn test_zero_batch_rejected() {
    let dir = TempDir::new().unwrap();
    let err = init(NetworkConfig::naive(dir.path()), &relu_model(vec![0, 4])).unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidInput);
}

#[test]
fn test_device_out_of_memory() {
    let dir = TempDir::new().unwrap();
    let mut registry = DeviceRegistry::empty();
    registry.register(
        DeviceType::Naive,
        Arc::new(NaiveDeviceFactory::with_budget(MemoryBudget::from_bytes(1024))),
    );
    let err = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
        .with_registry(registry)
        .init(&relu_model(vec![1, 3, 32, 32]), &BTreeMap::new())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::OutOfMemory);
}

// ── Cache ──────────────────────────────────────────────────────

#[test]
fn test_cache_round_trip_matches_fresh_build() {
    let dir = TempDir::new().unwrap();
    let config = NetworkConfig::naive(dir.path());

    let mut fresh = init(config.clone(), &block_model(1.0)).unwrap();
    assert_eq!(fresh.build_origin(), BuildOrigin::Compiled);
    let expected = run_block(&mut fresh);
    let fresh_bytes = fresh.serialized_engine().unwrap();
    let key = fresh.cache_key().clone();
    drop(fresh);

    let entries = CacheStore::new(dir.path()).list().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].valid);
    assert_eq!(entries[0].key, key.as_str());

    let mut cached = init(config, &block_model(1.0)).unwrap();
    assert_eq!(cached.build_origin(), BuildOrigin::LoadedFromCache);
    assert_eq!(cached.cache_key(), &key);
    assert_eq!(cached.serialized_engine().unwrap(), fresh_bytes);

    let actual = run_block(&mut cached);
    assert_eq!(actual.len(), 8);
    for (a, e) in actual.iter().zip(&expected) {
        assert!((a - e).abs() < 1e-6, "{a} vs {e}");
    }
    assert!(lock_files(dir.path()).is_empty());
}

#[test]
fn test_build_is_deterministic() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let first = init(NetworkConfig::naive(a.path()), &block_model(1.0)).unwrap();
    let second = init(NetworkConfig::naive(b.path()), &block_model(1.0)).unwrap();
    assert_eq!(second.build_origin(), BuildOrigin::Compiled);
    assert_eq!(first.cache_key(), second.cache_key());
    assert_eq!(first.serialized_engine().unwrap(), second.serialized_engine().unwrap());
}

#[test]
fn test_fingerprint_tracks_inputs() {
    let dir = TempDir::new().unwrap();
    let config = NetworkConfig::naive(dir.path());
    let base = init(config.clone(), &block_model(1.0)).unwrap();

    let reweighted = init(config.clone(), &block_model(2.0)).unwrap();
    assert_ne!(base.cache_key(), reweighted.cache_key());
    assert_eq!(reweighted.build_origin(), BuildOrigin::Compiled);

    let shapes = BTreeMap::from([("x".to_string(), vec![1, 4])]);
    let reshaped = AcceleratedNetwork::new(config.clone())
        .init(&block_model(1.0), &shapes)
        .unwrap();
    assert_ne!(base.cache_key(), reshaped.cache_key());

    let smaller_workspace = NetworkConfig {
        max_workspace: "64M".into(),
        ..config
    };
    let rebudgeted = init(smaller_workspace, &block_model(1.0)).unwrap();
    assert_ne!(base.cache_key(), rebudgeted.cache_key());

    assert_eq!(CacheStore::new(dir.path()).list().unwrap().len(), 4);
}

#[test]
fn test_corrupt_cache_is_rebuilt() {
    let dir = TempDir::new().unwrap();
    let config = NetworkConfig::naive(dir.path());
    let key = init(config.clone(), &block_model(1.0)).unwrap().cache_key().clone();
    let path = CacheStore::new(dir.path()).path_for(&key);
    let good = std::fs::read(&path).unwrap();

    // Truncated mid-payload, as if the writer had crashed without the rename.
    std::fs::write(&path, &good[..good.len() / 2]).unwrap();
    let net = init(config.clone(), &block_model(1.0)).unwrap();
    assert_eq!(net.build_origin(), BuildOrigin::Compiled);
    drop(net);
    assert_eq!(std::fs::read(&path).unwrap(), good);

    // Payload bit flip.
    let mut flipped = good.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0x5a;
    std::fs::write(&path, &flipped).unwrap();
    assert_eq!(init(config.clone(), &block_model(1.0)).unwrap().build_origin(), BuildOrigin::Compiled);

    assert_eq!(init(config, &block_model(1.0)).unwrap().build_origin(), BuildOrigin::LoadedFromCache);
    assert!(lock_files(dir.path()).is_empty());
}

#[test]
fn test_no_wait_contention_is_retryable() {
    let dir = TempDir::new().unwrap();
    let model = block_model(1.0);
    let key = init(
        NetworkConfig {
            enable_cache: false,
            ..NetworkConfig::naive(dir.path())
        },
        &model,
    )
    .unwrap()
    .cache_key()
    .clone();

    let store = CacheStore::new(dir.path());
    let held = store.lock(&key, LockPolicy::Block).unwrap();

    let config = NetworkConfig {
        lock_policy: LockPolicy::NoWait,
        ..NetworkConfig::naive(dir.path())
    };
    let err = init(config.clone(), &model).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.code(), StatusCode::CacheContention);

    let timed = NetworkConfig {
        lock_policy: LockPolicy::Timeout { timeout_ms: 50 },
        ..config.clone()
    };
    assert!(init(timed, &model).unwrap_err().is_retryable());

    drop(held);
    assert_eq!(init(config, &model).unwrap().build_origin(), BuildOrigin::Compiled);
}

#[test]
fn test_racing_builders_compile_once() {
    let dir = TempDir::new().unwrap();
    let config = NetworkConfig::naive(dir.path());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let model = block_model(1.0);
                barrier.wait();
                let mut net = init(config, &model).unwrap();
                (net.build_origin(), run_block(&mut net))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let compiled = results.iter().filter(|(o, _)| *o == BuildOrigin::Compiled).count();
    let loaded = results.iter().filter(|(o, _)| *o == BuildOrigin::LoadedFromCache).count();
    assert_eq!((compiled, loaded), (1, 1));
    assert_eq!(results[0].1, results[1].1);
    assert!(lock_files(dir.path()).is_empty());
}

#[test]
fn test_model_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("mlp.json");
    std::fs::write(
        &model_path,
        r#"{
            "name": "mlp",
            "inputs": { "x": [1, 3] },
            "outputs": ["y"],
            "layers": [
                { "name": "fc", "type": "fc", "inputs": ["x"], "outputs": ["y"],
                  "param": { "kind": "inner_product", "num_output": 1, "has_bias": false } }
            ],
            "resources": { "fc": { "weight": { "shape": [1, 3], "data": [1, 2, 3] } } }
        }"#,
    )
    .unwrap();

    let mut net = AcceleratedNetwork::new(NetworkConfig::naive(dir.path().join("cache")))
        .init_from_model(&ModelConfig::new(&model_path), &BTreeMap::new())
        .unwrap();
    net.set_input("x", &[1.0, 1.0, 1.0]).unwrap();
    net.forward().unwrap();
    assert_eq!(net.output("y").unwrap().into_vec(), vec![6.0]);

    let err = AcceleratedNetwork::new(NetworkConfig::naive(dir.path()))
        .init_from_model(&ModelConfig::new(dir.path().join("missing.json")), &BTreeMap::new())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::IoError);
}

#[test]
fn test_input_declared_as_output_rejected_before_build() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("echo.json");
    std::fs::write(
        &model_path,
        r#"{
            "name": "echo",
            "inputs": { "x": [1, 4] },
            "outputs": ["x", "y"],
            "layers": [{ "name": "act", "type": "relu", "inputs": ["x"], "outputs": ["y"] }]
        }"#,
    )
    .unwrap();

    let cache_dir = dir.path().join("cache");
    let err = AcceleratedNetwork::new(NetworkConfig::naive(&cache_dir))
        .init_from_model(&ModelConfig::new(&model_path), &BTreeMap::new())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidInput);
    assert!(err.to_string().contains("output 'x' is a network input"), "{err}");
    assert!(!cache_dir.exists());
}

#[test]
fn test_unknown_layer_type_is_layer_error() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("conv.json");
    std::fs::write(
        &model_path,
        r#"{
            "name": "conv",
            "inputs": { "x": [1, 4] },
            "outputs": ["y"],
            "layers": [{ "name": "c1", "type": "conv3d", "inputs": ["x"], "outputs": ["y"] }]
        }"#,
    )
    .unwrap();

    let err = AcceleratedNetwork::new(NetworkConfig::naive(dir.path().join("cache")))
        .init_from_model(&ModelConfig::new(&model_path), &BTreeMap::new())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::LayerError);
    assert!(matches!(
        err,
        RuntimeError::LayerConstruction { ref layer, ref layer_type, .. } if layer == "c1" && layer_type == "conv3d"
    ));
}

// ── Plugins ────────────────────────────────────────────────────

#[test]
fn test_plugin_missing_on_load_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = NetworkConfig::naive(dir.path());
    init(config.clone(), &block_model(1.0)).unwrap();

    let err = AcceleratedNetwork::new(config)
        .with_plugin_factory(PluginFactory::new())
        .init(&block_model(1.0), &BTreeMap::new())
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Accelerator(AccelError::PluginNotFound { ref plugin_type, ref layer })
            if plugin_type == "hard_swish" && layer == "hs"
    ));
    assert_eq!(err.code(), StatusCode::AcceleratorError);
    assert!(lock_files(dir.path()).is_empty());

    // The valid cache entry is untouched.
    let entries = CacheStore::new(dir.path()).list().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].valid);
}

// ── Async ──────────────────────────────────────────────────────

#[test]
fn test_forward_async_callback_fires_once() {
    let dir = TempDir::new().unwrap();
    let mut net = init(NetworkConfig::naive(dir.path()), &relu_model(vec![2, 8])).unwrap();
    net.set_input("x", &[-1.0; 16]).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let counter = Arc::clone(&calls);
    net.forward_async(Some(Box::new(move |status: Result<(), &AccelError>| {
        counter.fetch_add(1, Ordering::SeqCst);
        tx.send(status.is_ok()).unwrap();
    })))
    .unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    net.synchronize().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(net.output("y").unwrap().into_vec(), vec![0.0; 16]);
    assert_eq!(net.metrics().async_count, 1);
}

#[test]
fn test_outputs_after_async_are_ordered() {
    let dir = TempDir::new().unwrap();
    let mut net = init(NetworkConfig::naive(dir.path()), &relu_model(vec![1, 4])).unwrap();
    net.set_input("x", &[1.0, -2.0, 3.0, -4.0]).unwrap();
    net.forward_async(None).unwrap();
    assert_eq!(net.output("y").unwrap().into_vec(), vec![1.0, 0.0, 3.0, 0.0]);
}

#[tokio::test]
async fn test_forward_await() {
    let dir = TempDir::new().unwrap();
    let mut net = init(NetworkConfig::naive(dir.path()), &block_model(1.0)).unwrap();
    let expected = run_block(&mut net);

    net.forward_await().await.unwrap();
    assert_eq!(net.output("y").unwrap().into_vec(), expected);
    assert_eq!(net.metrics().forward_count, 1);
    assert_eq!(net.metrics().async_count, 1);
}
