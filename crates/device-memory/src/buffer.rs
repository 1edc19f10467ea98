// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII device buffer that returns memory to the allocator on drop.
//!
//! The allocation is held as a raw pointer rather than a `Box`, because
//! engines read and write it through [`DevicePtr`]s while the buffer is
//! alive. Host access goes through the same pointer.

use crate::allocator::AllocatorInner;
use crate::{DeviceMemory, DevicePtr};
use std::ptr::NonNull;
use std::sync::Arc;

/// An RAII guard owning one device allocation.
///
/// Dropping the buffer returns its memory to the
/// [`DeviceAllocator`](crate::DeviceAllocator). The address reported by
/// [`ptr`](Self::ptr) is stable for the buffer's whole lifetime.
pub struct DeviceBuffer {
    /// Start of the 8-byte aligned allocation.
    data: NonNull<u64>,
    /// Allocation length in `u64` words.
    words: usize,
    /// Requested size in bytes (for accounting).
    size_bytes: usize,
    allocator: Arc<AllocatorInner>,
}

impl DeviceBuffer {
    pub(crate) fn new(storage: Box<[u64]>, allocator: Arc<AllocatorInner>, size_bytes: usize) -> Self {
        let words = storage.len();
        let raw = Box::into_raw(storage) as *mut u64;
        // A boxed slice pointer is never null, even when empty.
        let data = NonNull::new(raw).unwrap_or(NonNull::dangling());
        Self {
            data,
            words,
            size_bytes,
            allocator,
        }
    }

    /// The device address of the first byte.
    pub fn ptr(&self) -> DevicePtr {
        DevicePtr::from_raw(self.data.as_ptr() as *mut u8)
    }

    /// The whole buffer as a lendable region.
    pub fn as_memory(&self) -> DeviceMemory {
        DeviceMemory::new(self.ptr(), self.size_bytes)
    }

    /// Returns the size of this allocation in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Copies `values` into the start of the buffer.
    ///
    /// Callers must ensure no device work touching this buffer is in flight.
    ///
    /// # Panics
    /// Panics if `values` does not fit in the buffer.
    pub fn copy_from_f32(&mut self, values: &[f32]) {
        assert!(
            values.len() * 4 <= self.size_bytes,
            "{} f32 values do not fit in a {}-byte buffer",
            values.len(),
            self.size_bytes
        );
        unsafe { self.ptr().as_f32_slice_mut(values.len()) }.copy_from_slice(values);
    }

    /// Reads the buffer as `f32` values.
    ///
    /// Callers must ensure no device work writing this buffer is in flight.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        unsafe { self.ptr().as_f32_slice(self.size_bytes / 4) }.to_vec()
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        let slice = std::ptr::slice_from_raw_parts_mut(self.data.as_ptr(), self.words);
        // Reconstructs the Box leaked in `new`.
        let storage = unsafe { Box::from_raw(slice) };
        self.allocator.return_buffer(storage, self.size_bytes);
    }
}

// The buffer exclusively owns its allocation.
unsafe impl Send for DeviceBuffer {}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr())
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
