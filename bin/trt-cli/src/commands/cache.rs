// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `trt-rt cache` command: list or clear compiled engines.

use std::path::PathBuf;
use trt_runtime::CacheStore;

pub fn list(dir: PathBuf, json: bool) -> anyhow::Result<()> {
    let store = CacheStore::new(dir);
    let entries = store.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("  Engine cache: {}", store.dir().display());
    if entries.is_empty() {
        println!("   (empty)");
        return Ok(());
    }
    println!("  {:<66} {:>10} {:>8}", "Key", "Size", "Status");
    println!("  {}", "-".repeat(86));
    for entry in &entries {
        println!(
            "  {:<66} {:>7.1} KB {:>8}",
            entry.key,
            entry.size_bytes as f64 / 1024.0,
            if entry.valid { "ok" } else { "corrupt" },
        );
    }
    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!();
    println!("  {} engine(s), {:.2} MB", entries.len(), total as f64 / (1024.0 * 1024.0));
    Ok(())
}

pub fn clear(dir: PathBuf) -> anyhow::Result<()> {
    let store = CacheStore::new(dir);
    let removed = store.clear()?;
    tracing::info!(removed, dir = %store.dir().display(), "Cleared engine cache");
    println!("  Removed {removed} engine(s) from {}", store.dir().display());
    Ok(())
}
