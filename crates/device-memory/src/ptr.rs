// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Raw device addresses and borrowed device regions.
//!
//! A [`DevicePtr`] is what an engine binding slot holds: an address with no
//! ownership and no lifetime. Whoever hands one to an engine must keep the
//! backing [`DeviceBuffer`](crate::DeviceBuffer) alive until every piece of
//! work that uses it has completed on its stream.

use std::fmt;

/// A raw device address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePtr(*mut u8);

// Device addresses are plain integers to the host; synchronization of the
// memory behind them is the stream's job.
unsafe impl Send for DevicePtr {}
unsafe impl Sync for DevicePtr {}

impl DevicePtr {
    /// The null address. Unbound binding slots hold this.
    pub const NULL: DevicePtr = DevicePtr(std::ptr::null_mut());

    /// Wraps a raw pointer.
    pub fn from_raw(ptr: *mut u8) -> Self {
        Self(ptr)
    }

    pub fn as_raw(self) -> *mut u8 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Returns the address `bytes` past this one.
    pub fn byte_add(self, bytes: usize) -> Self {
        Self(self.0.wrapping_add(bytes))
    }

    /// Views `len` `f32` values starting at this address.
    ///
    /// # Safety
    /// The region must be live, 4-byte aligned, hold at least `len` values,
    /// and not be written through any other path while the slice exists.
    pub unsafe fn as_f32_slice<'a>(self, len: usize) -> &'a [f32] {
        std::slice::from_raw_parts(self.0 as *const f32, len)
    }

    /// Views `len` `f32` values starting at this address, mutably.
    ///
    /// # Safety
    /// Same as [`as_f32_slice`](Self::as_f32_slice), and the region must not
    /// be accessed through any other path while the slice exists.
    pub unsafe fn as_f32_slice_mut<'a>(self, len: usize) -> &'a mut [f32] {
        std::slice::from_raw_parts_mut(self.0 as *mut f32, len)
    }
}

impl fmt::Debug for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr({:p})", self.0)
    }
}

/// A borrowed device region: address plus length in bytes.
///
/// Handing a `DeviceMemory` to an execution context lends it the region;
/// ownership stays with the allocation it was carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMemory {
    ptr: DevicePtr,
    len: usize,
}

impl DeviceMemory {
    pub fn new(ptr: DevicePtr, len: usize) -> Self {
        Self { ptr, len }
    }

    /// An empty region at the null address.
    pub fn empty() -> Self {
        Self {
            ptr: DevicePtr::NULL,
            len: 0,
        }
    }

    pub fn ptr(&self) -> DevicePtr {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the sub-region `[offset, offset + len)`, if it fits.
    pub fn slice(&self, offset: usize, len: usize) -> Option<DeviceMemory> {
        let end = offset.checked_add(len)?;
        (end <= self.len).then(|| DeviceMemory::new(self.ptr.byte_add(offset), len))
    }
}
