// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `trt-rt run` command: initialize a network and run forward passes.
//!
//! Walks the type-state pipeline:
//! ```text
//! AcceleratedNetwork<Uninitialized> → init → <Ready> → forward
//! ```

use anyhow::Context;
use std::collections::BTreeMap;
use std::path::PathBuf;
use trt_runtime::{AcceleratedNetwork, ModelConfig, NetworkConfig};

pub struct RunOptions {
    pub model: PathBuf,
    pub config: Option<PathBuf>,
    pub input_shapes: Vec<String>,
    pub fill: f32,
    pub iterations: usize,
    pub use_async: bool,
}

pub async fn execute(options: RunOptions) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║               trt-rt · Network Runner               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let config = match &options.config {
        Some(path) => NetworkConfig::from_file(path)?,
        None => NetworkConfig::default(),
    };
    let overrides = parse_shape_overrides(&options.input_shapes)?;

    println!("  Config:");
    println!("   Model:      {}", options.model.display());
    println!("   Device:     {} #{}", config.device_type, config.device_id);
    println!(
        "   Cache:      {}",
        if config.enable_cache {
            config.cache_dir.display().to_string()
        } else {
            "disabled".to_string()
        }
    );
    println!("   Iterations: {}{}", options.iterations, if options.use_async { " (async)" } else { "" });
    println!();

    // ── Type-State Pipeline ────────────────────────────────────
    println!("  [1/2] Initializing network...");
    let model = ModelConfig::new(&options.model);
    let mut network = AcceleratedNetwork::new(config)
        .init_from_model(&model, &overrides)
        .with_context(|| format!("failed to initialize '{}'", options.model.display()))?;

    println!("        Engine {} ({})", network.cache_key(), network.build_origin());
    println!(
        "        {} bindings, max batch {}, scratch {:.1} KB",
        network.num_bindings(),
        network.max_batch_size(),
        network.device_memory_size() as f64 / 1024.0,
    );
    println!();

    let inputs: Vec<String> = network.input_names().to_vec();
    for name in &inputs {
        let count: usize = network.blob_dims(name)?.iter().product();
        network.set_input(name, &vec![options.fill; count])?;
    }

    println!("  [2/2] Running {} forward pass(es)...", options.iterations);
    for _ in 0..options.iterations {
        if options.use_async {
            network.forward_await().await?;
        } else {
            network.forward()?;
        }
    }
    println!();

    // ── Outputs ────────────────────────────────────────────────
    println!("  Outputs:");
    let outputs: Vec<String> = network.output_names().to_vec();
    for name in &outputs {
        let tensor = network.output(name)?;
        let values = tensor.as_f32_slice();
        println!(
            "   {:<16} {:?} {:?}{}",
            super::truncate(name, 16),
            tensor.shape().dims(),
            &values[..values.len().min(6)],
            if values.len() > 6 { " ..." } else { "" },
        );
    }
    println!();

    println!("  Metrics:");
    println!("   {}", network.metrics().summary());
    println!();

    Ok(())
}

/// Parses `name=d0,d1,...` overrides.
fn parse_shape_overrides(specs: &[String]) -> anyhow::Result<BTreeMap<String, Vec<usize>>> {
    let mut shapes = BTreeMap::new();
    for spec in specs {
        let (name, dims) = spec
            .split_once('=')
            .with_context(|| format!("input shape '{spec}' must look like name=d0,d1,..."))?;
        let dims = dims
            .split(',')
            .map(|d| d.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid dims in '{spec}'"))?;
        shapes.insert(name.trim().to_string(), dims);
    }
    Ok(shapes)
}
