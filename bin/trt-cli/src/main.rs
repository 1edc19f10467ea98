// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # trt-rt
//!
//! Command-line interface for the trt-runtime engine compiler and cache.
//!
//! ## Usage
//! ```bash
//! # Compile (or load from cache) and run a model
//! trt-rt run --model ./models/mlp.json --input-shape x=8,64 --iterations 100
//!
//! # Inspect a model description
//! trt-rt inspect --model ./models/mlp.json
//!
//! # List or clear compiled engines
//! trt-rt cache list --dir .engine_cache
//! trt-rt cache clear --dir .engine_cache
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "trt-rt",
    about = "Compile, cache and run networks on an accelerator backend",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a network and run forward passes on it.
    Run {
        /// Path to the JSON model description.
        #[arg(short, long)]
        model: PathBuf,

        /// Path to a TOML network configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override an input shape, e.g. `x=8,3,32,32`. Repeatable.
        #[arg(short = 's', long = "input-shape")]
        input_shapes: Vec<String>,

        /// Value every input element is filled with.
        #[arg(long, default_value_t = 1.0)]
        fill: f32,

        /// Number of forward passes.
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Run passes through the async path.
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Print a model's structure and weight sizes.
    Inspect {
        /// Path to the JSON model description.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Manage the compiled-engine cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached engines and whether they are intact.
    List {
        #[arg(short, long, default_value = ".engine_cache")]
        dir: PathBuf,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove every cached engine.
    Clear {
        #[arg(short, long, default_value = ".engine_cache")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            model,
            config,
            input_shapes,
            fill,
            iterations,
            use_async,
        } => {
            let options = commands::run::RunOptions {
                model,
                config,
                input_shapes,
                fill,
                iterations,
                use_async,
            };
            commands::run::execute(options).await
        }
        Commands::Inspect { model } => commands::inspect::execute(model),
        Commands::Cache { action } => match action {
            CacheAction::List { dir, json } => commands::cache::list(dir, json),
            CacheAction::Clear { dir } => commands::cache::clear(dir),
        },
    }
}
