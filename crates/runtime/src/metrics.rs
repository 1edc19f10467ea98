// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network build and inference metrics.
//!
//! [`NetworkMetrics`] records how long `init` took, whether the engine was
//! compiled or loaded from cache, and forward-pass counts and latency.

use crate::BuildOrigin;
use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkMetrics {
    /// Wall-clock time of `init`, from interpreter to binding table.
    pub init_duration: Duration,
    /// Whether the engine was compiled or loaded from cache.
    pub build_origin: BuildOrigin,
    /// Size of the serialized engine in bytes.
    pub engine_bytes: usize,
    /// Blob memory held by the network in bytes, scratch included.
    pub blob_bytes: usize,
    /// Completed synchronous forward passes.
    pub forward_count: u64,
    /// Forward passes enqueued without waiting.
    pub async_count: u64,
    /// Total time spent in synchronous forward passes.
    pub total_forward_duration: Duration,
    pub last_forward_duration: Option<Duration>,
}

impl NetworkMetrics {
    pub fn new(build_origin: BuildOrigin) -> Self {
        Self {
            init_duration: Duration::ZERO,
            build_origin,
            engine_bytes: 0,
            blob_bytes: 0,
            forward_count: 0,
            async_count: 0,
            total_forward_duration: Duration::ZERO,
            last_forward_duration: None,
        }
    }

    /// Records one synchronous forward pass.
    pub fn record_forward(&mut self, elapsed: Duration) {
        self.forward_count += 1;
        self.total_forward_duration += elapsed;
        self.last_forward_duration = Some(elapsed);
    }

    pub fn record_async(&mut self) {
        self.async_count += 1;
    }

    /// Finalises build metrics once the network is ready.
    pub fn finalise(&mut self, init: Duration, engine_bytes: usize, blob_bytes: usize) {
        self.init_duration = init;
        self.engine_bytes = engine_bytes;
        self.blob_bytes = blob_bytes;
    }

    /// Mean synchronous forward latency.
    pub fn mean_forward(&self) -> Duration {
        if self.forward_count == 0 {
            return Duration::ZERO;
        }
        self.total_forward_duration.div_f64(self.forward_count as f64)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Network: init {:.2}ms ({}), engine {:.1} KB, blobs {:.2} MB, \
             {} forward ({:.3}ms mean), {} async",
            self.init_duration.as_secs_f64() * 1000.0,
            self.build_origin,
            self.engine_bytes as f64 / 1024.0,
            self.blob_bytes as f64 / (1024.0 * 1024.0),
            self.forward_count,
            self.mean_forward().as_secs_f64() * 1000.0,
            self.async_count,
        )
    }
}
