// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-memory
//!
//! Device memory for accelerator backends.
//!
//! # Key Components
//!
//! - [`MemoryBudget`]: a hard ceiling with human-readable parsing
//!   (`"32M"`, `"1G"`, etc.).
//! - [`DeviceAllocator`]: enforces the budget, keeps a size-class free list,
//!   tracks statistics.
//! - [`DeviceBuffer`]: RAII owner of one allocation. Dropping it returns the
//!   memory to the allocator.
//! - [`DevicePtr`] / [`DeviceMemory`]: non-owning addresses and regions, as
//!   stored in engine binding tables and lent to execution contexts.
//!
//! # Ownership Model
//!
//! ```text
//! DeviceAllocator::allocate(size)
//!       │
//!       ▼
//!   DeviceBuffer  ──► ptr() ──► DevicePtr (binding slot, no ownership)
//!       │
//!       │  drop()
//!       ▼
//!   AllocatorInner::return_buffer()  ──► free list
//! ```

mod allocator;
mod budget;
mod buffer;
mod error;
mod ptr;
mod stats;

pub use allocator::DeviceAllocator;
pub use budget::MemoryBudget;
pub use buffer::DeviceBuffer;
pub use error::MemoryError;
pub use ptr::{DeviceMemory, DevicePtr};
pub use stats::AllocationStats;
