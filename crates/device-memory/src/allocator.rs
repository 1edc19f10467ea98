// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Budget-enforced device allocator.
//!
//! The [`DeviceAllocator`] hands out [`DeviceBuffer`]s for blobs and for
//! execution-context scratch memory. It:
//!
//! 1. Enforces a hard ceiling: allocations that would exceed the budget
//!    return `Err(OutOfMemory)`.
//! 2. Keeps returned allocations in a free list binned by power-of-two size
//!    class, so re-initializing a network does not hit the system allocator.
//! 3. Tracks allocation statistics.
//!
//! Every allocation is 8-byte aligned and zero-filled.

use crate::{AllocationStats, DeviceBuffer, MemoryBudget, MemoryError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Minimum size class: 256 bytes.
const MIN_SIZE_CLASS: usize = 256;

/// Allocator state shared with every live [`DeviceBuffer`].
pub(crate) struct AllocatorInner {
    budget: MemoryBudget,
    allocated_bytes: AtomicUsize,
    /// size class in bytes → returned allocations of exactly that class.
    free_buffers: Mutex<HashMap<usize, Vec<Box<[u64]>>>>,
    free_list_bytes: AtomicUsize,
    stats: Mutex<AllocationStats>,
}

impl AllocatorInner {
    /// Called by `DeviceBuffer::drop`.
    pub(crate) fn return_buffer(&self, storage: Box<[u64]>, size_bytes: usize) {
        self.allocated_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        self.stats.lock().record_deallocation();

        let class_bytes = storage.len() * 8;
        self.free_list_bytes.fetch_add(class_bytes, Ordering::AcqRel);
        self.free_buffers
            .lock()
            .entry(class_bytes)
            .or_default()
            .push(storage);
    }
}

/// The device memory allocator. Cloning shares the same budget and free list.
///
/// # Example
/// ```
/// use device_memory::{DeviceAllocator, MemoryBudget};
///
/// let alloc = DeviceAllocator::new(MemoryBudget::from_mb(4));
/// let buf = alloc.allocate(1024).unwrap();
/// assert_eq!(alloc.allocated_bytes(), 1024);
/// drop(buf);
/// assert_eq!(alloc.allocated_bytes(), 0);
/// ```
#[derive(Clone)]
pub struct DeviceAllocator {
    inner: Arc<AllocatorInner>,
}

impl DeviceAllocator {
    /// Creates an allocator with the given budget.
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            inner: Arc::new(AllocatorInner {
                budget,
                allocated_bytes: AtomicUsize::new(0),
                free_buffers: Mutex::new(HashMap::new()),
                free_list_bytes: AtomicUsize::new(0),
                stats: Mutex::new(AllocationStats::default()),
            }),
        }
    }

    /// Allocates a zeroed buffer of `size_bytes`.
    pub fn allocate(&self, size_bytes: usize) -> Result<DeviceBuffer, MemoryError> {
        if size_bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }

        let budget = self.inner.budget;
        let reserved = self
            .inner
            .allocated_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(size_bytes)
                    .filter(|&total| budget.admits(total))
            });

        let current = match reserved {
            Ok(previous) => previous + size_bytes,
            Err(current) => {
                self.inner.stats.lock().record_oom();
                return Err(MemoryError::OutOfMemory {
                    requested_bytes: size_bytes,
                    available_bytes: budget.headroom(current),
                    budget_bytes: budget.as_bytes(),
                });
            }
        };

        let class_bytes = size_class_for(size_bytes);
        let reused = self
            .inner
            .free_buffers
            .lock()
            .get_mut(&class_bytes)
            .and_then(Vec::pop);

        let storage = match reused {
            Some(mut buf) => {
                self.inner
                    .free_list_bytes
                    .fetch_sub(class_bytes, Ordering::AcqRel);
                buf.fill(0);
                self.inner.stats.lock().record_reuse(size_bytes);
                buf
            }
            None => {
                self.inner.stats.lock().record_fresh(size_bytes);
                vec![0u64; class_bytes / 8].into_boxed_slice()
            }
        };

        self.inner.stats.lock().update_peak(current);
        tracing::trace!(size_bytes, class_bytes, "device allocation");

        Ok(DeviceBuffer::new(storage, Arc::clone(&self.inner), size_bytes))
    }

    /// Bytes currently allocated (live, not yet returned).
    pub fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes.load(Ordering::Acquire)
    }

    /// Bytes remaining before hitting the budget.
    pub fn available_bytes(&self) -> usize {
        self.inner.budget.headroom(self.allocated_bytes())
    }

    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> AllocationStats {
        self.inner.stats.lock().clone()
    }

    /// Drops every cached free allocation.
    pub fn shrink(&self) {
        self.inner.free_buffers.lock().clear();
        self.inner.free_list_bytes.store(0, Ordering::Release);
    }

    /// Bytes held in the free list.
    pub fn free_list_bytes(&self) -> usize {
        self.inner.free_list_bytes.load(Ordering::Acquire)
    }
}

/// Smallest power of two that is `>= size` and `>= MIN_SIZE_CLASS`.
fn size_class_for(size: usize) -> usize {
    size.max(MIN_SIZE_CLASS).next_power_of_two()
}

impl std::fmt::Debug for DeviceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAllocator")
            .field("budget", &self.inner.budget)
            .field("allocated_bytes", &self.allocated_bytes())
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
