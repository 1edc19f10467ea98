// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owns every blob's device memory and the execution-context scratch region.
//!
//! Blobs are allocated with room for `max_batch` samples even when their own
//! dimension 0 is smaller, because the engine always runs at the network's
//! max batch size. Lookups by name go through the registry, which may swap
//! a generic entry for a [`ForeignBlob`] exactly once.

use crate::blob::{Blob, BlobDesc, BlobEntry, BlobHandle, ForeignBlob};
use crate::BlobError;
use accelerator::{DeviceType, TensorId};
use device_memory::{DeviceAllocator, DeviceBuffer, DeviceMemory, MemoryBudget};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tensor_core::DType;

/// Max batch size for a set of input shapes: the largest dimension 0, at
/// least 1.
///
/// Rejects inputs of rank 0 and inputs whose dimension 0 is zero.
pub fn max_batch_size(input_shapes: &BTreeMap<String, Vec<usize>>) -> Result<usize, BlobError> {
    let mut max_batch = 1;
    for (name, dims) in input_shapes {
        match dims.first() {
            None => {
                return Err(BlobError::InvalidShape {
                    name: name.clone(),
                    detail: "rank 0".into(),
                })
            }
            Some(0) => return Err(BlobError::ZeroBatch(name.clone())),
            Some(&n) => max_batch = max_batch.max(n),
        }
    }
    Ok(max_batch)
}

pub struct BlobManager {
    allocator: DeviceAllocator,
    device_type: DeviceType,
    dtype: DType,
    max_batch: usize,
    workspace: MemoryBudget,
    entries: BTreeMap<String, BlobEntry>,
    /// Backing memory, keyed like `entries`.
    buffers: HashMap<String, DeviceBuffer>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    scratch: Option<DeviceBuffer>,
}

impl BlobManager {
    pub fn new(
        allocator: DeviceAllocator,
        device_type: DeviceType,
        dtype: DType,
        max_batch: usize,
        workspace: MemoryBudget,
    ) -> Self {
        Self {
            allocator,
            device_type,
            dtype,
            max_batch: max_batch.max(1),
            workspace,
            entries: BTreeMap::new(),
            buffers: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            scratch: None,
        }
    }

    // ── Allocation ──────────────────────────────────────────────

    /// Allocates device memory for a blob with full shape `dims`.
    pub fn create_blob(&mut self, name: &str, dims: &[usize]) -> Result<Arc<Blob>, BlobError> {
        if self.entries.contains_key(name) {
            return Err(BlobError::AlreadyExists(name.to_string()));
        }
        if dims.is_empty() || dims.contains(&0) {
            return Err(BlobError::InvalidShape {
                name: name.to_string(),
                detail: format!("dims {dims:?}"),
            });
        }
        if dims[0] > self.max_batch {
            return Err(BlobError::InvalidShape {
                name: name.to_string(),
                detail: format!("batch {} exceeds the network max batch {}", dims[0], self.max_batch),
            });
        }

        let desc = BlobDesc {
            name: name.to_string(),
            dims: dims.to_vec(),
            dtype: self.dtype,
            device_type: self.device_type,
        };
        let per_sample: usize = desc.per_sample_dims().iter().product();
        let capacity = per_sample * self.max_batch * self.dtype.size_bytes();
        let buffer = self.allocator.allocate(capacity)?;
        let blob = Arc::new(Blob::new(
            desc,
            BlobHandle {
                ptr: buffer.ptr(),
                bytes: capacity,
            },
        ));
        tracing::debug!("allocated blob '{name}' {dims:?}: {capacity} bytes");

        self.buffers.insert(name.to_string(), buffer);
        self.entries
            .insert(name.to_string(), BlobEntry::Generic(Arc::clone(&blob)));
        Ok(blob)
    }

    pub fn mark_input(&mut self, name: &str) -> Result<(), BlobError> {
        self.entry(name)?;
        if !self.inputs.iter().any(|n| n == name) {
            self.inputs.push(name.to_string());
        }
        Ok(())
    }

    pub fn mark_output(&mut self, name: &str) -> Result<(), BlobError> {
        self.entry(name)?;
        if !self.outputs.iter().any(|n| n == name) {
            self.outputs.push(name.to_string());
        }
        Ok(())
    }

    /// Scratch memory of at least `bytes` for the execution context.
    ///
    /// The region is owned here and reallocated only when a larger one is
    /// requested. Zero bytes yields an empty region.
    pub fn scratch_memory(&mut self, bytes: usize) -> Result<DeviceMemory, BlobError> {
        if bytes == 0 {
            return Ok(DeviceMemory::empty());
        }
        if !self.workspace.admits(bytes) {
            return Err(BlobError::WorkspaceExceeded {
                requested: bytes,
                limit: self.workspace.as_bytes(),
            });
        }
        if self.scratch.as_ref().map_or(true, |s| s.size_bytes() < bytes) {
            // Release the old region before taking the new one.
            self.scratch = None;
            self.scratch = Some(self.allocator.allocate(bytes)?);
            tracing::debug!("allocated {bytes} bytes of scratch memory");
        }
        Ok(self
            .scratch
            .as_ref()
            .map_or_else(DeviceMemory::empty, DeviceBuffer::as_memory))
    }

    // ── Lookup and decoration ───────────────────────────────────

    pub fn get(&self, name: &str) -> Option<&BlobEntry> {
        self.entries.get(name)
    }

    pub fn entry(&self, name: &str) -> Result<&BlobEntry, BlobError> {
        self.entries
            .get(name)
            .ok_or_else(|| BlobError::NotFound(name.to_string()))
    }

    pub fn desc(&self, name: &str) -> Result<&BlobDesc, BlobError> {
        Ok(self.entry(name)?.blob().desc())
    }

    /// Rebinds `name` to its decorated form. From here on every lookup of
    /// `name` returns `foreign`.
    pub fn replace_blob(&mut self, name: &str, foreign: ForeignBlob) -> Result<(), BlobError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| BlobError::NotFound(name.to_string()))?;
        if entry.is_foreign() {
            return Err(BlobError::AlreadyDecorated(name.to_string()));
        }
        if !Arc::ptr_eq(entry.blob(), foreign.blob()) {
            return Err(BlobError::InvalidShape {
                name: name.to_string(),
                detail: "replacement wraps a different blob".into(),
            });
        }
        *entry = BlobEntry::Foreign(Arc::new(foreign));
        Ok(())
    }

    /// Reverse lookup: the decorated blob carrying native tensor `id`.
    pub fn foreign_tensor_for(&self, id: TensorId) -> Option<Arc<ForeignBlob>> {
        self.entries.values().find_map(|entry| match entry {
            BlobEntry::Foreign(fb) if entry.native_tensor() == Some(id) => Some(Arc::clone(fb)),
            _ => None,
        })
    }

    // ── Host access ─────────────────────────────────────────────

    /// Copies host data into a blob. `values` must cover the blob's full
    /// shape exactly.
    ///
    /// No device work may be in flight on this blob.
    pub fn write_f32(&mut self, name: &str, values: &[f32]) -> Result<(), BlobError> {
        let desc = self.host_accessible(name)?;
        if values.len() != desc.num_elements() {
            return Err(BlobError::SizeMismatch {
                name: name.to_string(),
                expected: desc.num_elements(),
                actual: values.len(),
            });
        }
        let buffer = self
            .buffers
            .get_mut(name)
            .ok_or_else(|| BlobError::NotFound(name.to_string()))?;
        buffer.copy_from_f32(values);
        Ok(())
    }

    /// Reads a blob's full shape back to the host.
    ///
    /// No device work may be in flight on this blob.
    pub fn read_f32(&self, name: &str) -> Result<Vec<f32>, BlobError> {
        let len = self.host_accessible(name)?.num_elements();
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| BlobError::NotFound(name.to_string()))?;
        let mut values = buffer.to_f32_vec();
        values.truncate(len);
        Ok(values)
    }

    fn host_accessible(&self, name: &str) -> Result<&BlobDesc, BlobError> {
        let desc = self.desc(name)?;
        if desc.dtype != DType::F32 {
            return Err(BlobError::UnsupportedDType {
                name: name.to_string(),
                dtype: desc.dtype,
            });
        }
        Ok(desc)
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn input_names(&self) -> &[String] {
        &self.inputs
    }

    pub fn output_names(&self) -> &[String] {
        &self.outputs
    }

    pub fn blob_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Device bytes held for blobs and scratch.
    pub fn allocated_bytes(&self) -> usize {
        let blobs: usize = self.buffers.values().map(DeviceBuffer::size_bytes).sum();
        blobs + self.scratch.as_ref().map_or(0, DeviceBuffer::size_bytes)
    }
}

impl std::fmt::Debug for BlobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobManager")
            .field("blobs", &self.entries.len())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("max_batch", &self.max_batch)
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::NativeTensor;
    use accelerator::NetworkDefinition;

    fn manager(max_batch: usize) -> BlobManager {
        BlobManager::new(
            DeviceAllocator::new(MemoryBudget::from_mb(4)),
            DeviceType::Naive,
            DType::F32,
            max_batch,
            MemoryBudget::from_bytes(4096),
        )
    }

    fn shapes(list: &[(&str, &[usize])]) -> BTreeMap<String, Vec<usize>> {
        list.iter().map(|(n, d)| (n.to_string(), d.to_vec())).collect()
    }

    #[test]
    fn test_max_batch_size() {
        assert_eq!(max_batch_size(&shapes(&[("x", &[1, 3])])).unwrap(), 1);
        assert_eq!(
            max_batch_size(&shapes(&[("a", &[2, 3]), ("b", &[7, 1]), ("c", &[4])])).unwrap(),
            7
        );
        assert_eq!(max_batch_size(&BTreeMap::new()).unwrap(), 1);
        assert!(matches!(
            max_batch_size(&shapes(&[("a", &[2, 3]), ("z", &[0, 3])])),
            Err(BlobError::ZeroBatch(ref n)) if n == "z"
        ));
        assert!(max_batch_size(&shapes(&[("s", &[])])).is_err());
    }

    #[test]
    fn test_create_and_lookup() {
        let mut blobs = manager(4);
        let x = blobs.create_blob("x", &[2, 3]).unwrap();
        assert_eq!(x.handle().bytes, 4 * 3 * 4);
        blobs.mark_input("x").unwrap();
        assert_eq!(blobs.input_names(), &["x".to_string()]);

        assert!(matches!(blobs.create_blob("x", &[1, 3]), Err(BlobError::AlreadyExists(_))));
        assert!(blobs.create_blob("big", &[5, 3]).is_err());
        assert!(blobs.create_blob("zero", &[1, 0]).is_err());
        assert!(matches!(blobs.mark_output("nope"), Err(BlobError::NotFound(_))));
    }

    #[test]
    fn test_replace_blob_rebinds_name() {
        let mut net = NetworkDefinition::new("t");
        let id = net.add_input("x", DType::F32, &[3]).unwrap();

        let mut blobs = manager(1);
        let original = blobs.create_blob("x", &[1, 3]).unwrap();
        assert!(!blobs.get("x").unwrap().is_foreign());

        let mut fb = ForeignBlob::new(Arc::clone(&original));
        fb.set_foreign_tensor(Arc::new(NativeTensor::new(id))).unwrap();
        blobs.replace_blob("x", fb).unwrap();

        for _ in 0..3 {
            let entry = blobs.get("x").unwrap();
            assert!(entry.is_foreign());
            assert_eq!(entry.native_tensor(), Some(id));
            assert!(Arc::ptr_eq(entry.blob(), &original));
        }
        let back = blobs.foreign_tensor_for(id).unwrap();
        assert_eq!(back.blob().name(), "x");

        let again = ForeignBlob::new(original);
        assert!(matches!(
            blobs.replace_blob("x", again),
            Err(BlobError::AlreadyDecorated(_))
        ));
    }

    #[test]
    fn test_replace_rejects_foreign_blob_of_other_name() {
        let mut blobs = manager(1);
        blobs.create_blob("x", &[1, 3]).unwrap();
        let y = blobs.create_blob("y", &[1, 3]).unwrap();
        assert!(blobs.replace_blob("x", ForeignBlob::new(y)).is_err());
        assert!(blobs.replace_blob("nope", ForeignBlob::new(Arc::clone(blobs.get("x").unwrap().blob()))).is_err());
    }

    #[test]
    fn test_host_roundtrip() {
        let mut blobs = manager(2);
        blobs.create_blob("x", &[1, 3]).unwrap();
        blobs.write_f32("x", &[1.0, -2.0, 3.5]).unwrap();
        assert_eq!(blobs.read_f32("x").unwrap(), vec![1.0, -2.0, 3.5]);
        assert!(matches!(
            blobs.write_f32("x", &[1.0]),
            Err(BlobError::SizeMismatch { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn test_f16_blob_rejects_host_data() {
        let mut blobs = BlobManager::new(
            DeviceAllocator::new(MemoryBudget::from_mb(1)),
            DeviceType::Naive,
            DType::F16,
            1,
            MemoryBudget::unlimited(),
        );
        blobs.create_blob("x", &[1, 4]).unwrap();
        assert!(matches!(
            blobs.write_f32("x", &[0.0; 4]),
            Err(BlobError::UnsupportedDType { .. })
        ));
    }

    #[test]
    fn test_scratch_memory() {
        let mut blobs = manager(1);
        assert!(blobs.scratch_memory(0).unwrap().is_empty());
        let first = blobs.scratch_memory(512).unwrap();
        assert_eq!(first.len(), 512);
        // Smaller requests reuse the region.
        assert_eq!(blobs.scratch_memory(256).unwrap().ptr(), first.ptr());
        assert!(blobs.scratch_memory(1024).unwrap().len() >= 1024);
        assert!(matches!(
            blobs.scratch_memory(8192),
            Err(BlobError::WorkspaceExceeded { requested: 8192, limit: 4096 })
        ));
    }
}
