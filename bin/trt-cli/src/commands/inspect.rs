// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `trt-rt inspect` command: display a model's layers and weight sizes.

use model_ir::{DefaultModelInterpreter, ModelInterpreter};
use std::path::PathBuf;

pub fn execute(model: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              trt-rt · Model Inspector               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let interpreter = DefaultModelInterpreter::from_file(&model)
        .map_err(|e| anyhow::anyhow!("failed to load model from '{}': {e}", model.display()))?;
    let structure = interpreter
        .net_structure()
        .ok_or_else(|| anyhow::anyhow!("model has no network structure"))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", structure.summary());
    for (name, dims) in &structure.inputs_shape_map {
        println!("   input  {name}: {dims:?}");
    }
    for name in &structure.outputs {
        println!("   output {name}");
    }
    if let Some(resource) = interpreter.net_resource() {
        println!(
            "  Precision: {}, weights {:.2} MB",
            resource.data_type(),
            resource.total_weight_bytes() as f64 / (1024.0 * 1024.0),
        );
    }
    println!();

    // ── Per-Layer Detail ───────────────────────────────────────
    println!(
        "  {:<4} {:<24} {:<14} {:<28} {:>10}",
        "Idx", "Name", "Type", "Inputs -> Outputs", "Weights",
    );
    println!("  {}", "-".repeat(84));

    for (idx, layer) in structure.iter_layers().enumerate() {
        let weight_kb = interpreter
            .net_resource()
            .and_then(|r| r.resource(&layer.name))
            .map_or(0.0, |r| r.size_bytes() as f64 / 1024.0);
        let flow = format!("{} -> {}", layer.inputs.join(","), layer.outputs.join(","));
        println!(
            "  {:<4} {:<24} {:<14} {:<28} {:>7.1} KB",
            idx,
            super::truncate(&layer.name, 24),
            layer.layer_type.as_str(),
            super::truncate(&flow, 28),
            weight_kb,
        );
    }
    println!();
    Ok(())
}
