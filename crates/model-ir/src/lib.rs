// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The device-agnostic description of a network, as handed to an
//! accelerator backend:
//!
//! - [`LayerType`] / [`LayerParam`] / [`LayerSpec`]: one layer, its type tag,
//!   interpreted parameters and the blob names it reads and writes.
//! - [`NetStructure`]: the ordered layer list with declared inputs/outputs,
//!   using a **type-state pattern** (`Loaded` → `Validated`).
//! - [`LayerResource`] / [`NetResource`]: per-layer weights and precision.
//! - [`ModelInterpreter`] / [`DefaultModelInterpreter`]: the seam a compiler
//!   pulls structure and resources through.
//! - [`ModelManifest`]: the JSON model description.
//!
//! # Example
//! ```no_run
//! use model_ir::{DefaultModelInterpreter, ModelInterpreter};
//! use std::path::Path;
//!
//! let interp = DefaultModelInterpreter::from_file(Path::new("./models/tiny.json")).unwrap();
//! let structure = interp.net_structure().unwrap();
//! println!("{}", structure.summary());
//! for layer in structure.iter_layers() {
//!     println!("  {}", layer.summary());
//! }
//! ```

mod error;
pub mod graph;
mod interpreter;
mod layer;
mod manifest;
mod resource;

pub use error::ModelError;
pub use graph::NetStructure;
pub use interpreter::{DefaultModelInterpreter, ModelInterpreter};
pub use layer::{LayerParam, LayerSpec, LayerType};
pub use manifest::{ManifestLayer, ModelManifest};
pub use resource::{LayerResource, NetResource};
