// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # trt-runtime
//!
//! Compiles a device-agnostic network into an accelerator engine, keeps the
//! compiled engine in a crash-safe on-disk cache, and runs inference on it.
//!
//! The runtime takes:
//! - A [`ModelInterpreter`](model_ir::ModelInterpreter) from `model-ir`
//!   (network structure plus per-layer weights).
//! - A [`NetworkConfig`] naming the device, cache directory and lock policy.
//! - Optional per-input shape overrides.
//!
//! and produces an [`AcceleratedNetwork<Ready>`] whose blobs are bound to
//! the engine by name.
//!
//! # Type-State Pipeline
//! ```text
//! AcceleratedNetwork<Uninitialized> → AcceleratedNetwork<Ready>
//! ```
//! Only a ready network can run `forward`.
//!
//! # Engine cache
//! Engines are keyed by a [`CacheKey`] fingerprint of everything that shapes
//! them. One process at a time holds the build lock for a key; the others
//! wait (or fail with a retryable error, per [`LockPolicy`]) and then load
//! what the first one persisted.

mod binding;
pub mod blob;
mod blob_manager;
pub mod cache;
mod config;
mod error;
pub mod layer;
mod metrics;
mod network;

pub use binding::BindingTable;
pub use blob::{Blob, BlobDesc, BlobEntry, BlobHandle, ForeignBlob, ForeignTensor, NativeTensor};
pub use blob_manager::{max_batch_size, BlobManager};
pub use cache::{CacheEntry, CacheKey, CacheLock, CacheStore};
pub use config::{LockPolicy, ModelConfig, NetworkConfig};
pub use error::{BlobError, CacheError, LayerError, RuntimeError, StatusCode};
pub use metrics::NetworkMetrics;
pub use network::{AcceleratedNetwork, BuildOrigin, NetworkStage, NetworkState, Ready, Uninitialized};
