// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Blobs and their accelerator-native decoration.
//!
//! A [`Blob`] is a named, shaped region of device memory. While an engine is
//! being built, each blob also gets the native tensor that produces or
//! consumes it: the blob is wrapped in a [`ForeignBlob`] and the registry
//! entry is swapped to [`BlobEntry::Foreign`]. Native handles are looked up
//! through the [`ForeignTensor`] capability, never by downcasting.

use crate::BlobError;
use accelerator::{DeviceType, TensorId};
use device_memory::DevicePtr;
use std::fmt;
use std::sync::Arc;
use tensor_core::DType;

/// Name, full `[N, ...]` shape, element type and home device of a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobDesc {
    pub name: String,
    pub dims: Vec<usize>,
    pub dtype: DType,
    pub device_type: DeviceType,
}

impl BlobDesc {
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn size_bytes(&self) -> usize {
        self.num_elements() * self.dtype.size_bytes()
    }

    /// Dimension 0.
    pub fn batch(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Everything after dimension 0.
    pub fn per_sample_dims(&self) -> &[usize] {
        self.dims.get(1..).unwrap_or(&[])
    }
}

/// Device address and capacity backing a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHandle {
    pub ptr: DevicePtr,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct Blob {
    desc: BlobDesc,
    handle: BlobHandle,
}

impl Blob {
    pub fn new(desc: BlobDesc, handle: BlobHandle) -> Self {
        Self { desc, handle }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn desc(&self) -> &BlobDesc {
        &self.desc
    }

    pub fn handle(&self) -> BlobHandle {
        self.handle
    }
}

// ── Native decoration ──────────────────────────────────────────

/// Anything that may stand for a tensor in the native graph.
pub trait ForeignTensor: Send + Sync + fmt::Debug {
    fn as_native_tensor(&self) -> Option<TensorId>;
}

/// A tensor of the native graph under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTensor {
    id: TensorId,
}

impl NativeTensor {
    pub fn new(id: TensorId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> TensorId {
        self.id
    }
}

impl ForeignTensor for NativeTensor {
    fn as_native_tensor(&self) -> Option<TensorId> {
        Some(self.id)
    }
}

/// A blob that also carries a native tensor.
///
/// The underlying [`Blob`] is shared with whoever held the generic entry, so
/// both views see the same memory.
#[derive(Debug)]
pub struct ForeignBlob {
    blob: Arc<Blob>,
    foreign: Option<Arc<dyn ForeignTensor>>,
}

impl ForeignBlob {
    pub fn new(blob: Arc<Blob>) -> Self {
        Self { blob, foreign: None }
    }

    pub fn blob(&self) -> &Arc<Blob> {
        &self.blob
    }

    /// Attaches the native tensor. A blob is decorated at most once.
    pub fn set_foreign_tensor(&mut self, tensor: Arc<dyn ForeignTensor>) -> Result<(), BlobError> {
        if self.foreign.is_some() {
            return Err(BlobError::AlreadyDecorated(self.blob.name().to_string()));
        }
        self.foreign = Some(tensor);
        Ok(())
    }

    pub fn foreign_tensor(&self) -> Option<&Arc<dyn ForeignTensor>> {
        self.foreign.as_ref()
    }
}

/// A blob registry entry.
#[derive(Debug, Clone)]
pub enum BlobEntry {
    Generic(Arc<Blob>),
    Foreign(Arc<ForeignBlob>),
}

impl BlobEntry {
    pub fn blob(&self) -> &Arc<Blob> {
        match self {
            Self::Generic(blob) => blob,
            Self::Foreign(foreign) => foreign.blob(),
        }
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::Foreign(_))
    }

    /// The native tensor attached to this blob, if any.
    pub fn native_tensor(&self) -> Option<TensorId> {
        match self {
            Self::Generic(_) => None,
            Self::Foreign(foreign) => foreign.foreign_tensor().and_then(|t| t.as_native_tensor()),
        }
    }
}
