// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics.

/// Cumulative statistics about device allocator usage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocationStats {
    /// Total number of allocation requests, failed ones included.
    pub total_allocations: u64,
    /// Allocations served from the free list.
    pub reused: u64,
    /// Allocations that required fresh memory.
    pub fresh: u64,
    /// Requests rejected because the budget was exhausted.
    pub oom_count: u64,
    /// High-water mark of live bytes.
    pub peak_allocated_bytes: usize,
    pub cumulative_allocated_bytes: u64,
    pub total_deallocations: u64,
}

impl AllocationStats {
    /// Fraction of successful allocations served from the free list.
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.reused + self.fresh;
        if total == 0 {
            return 0.0;
        }
        self.reused as f64 / total as f64
    }

    pub(crate) fn record_reuse(&mut self, size: usize) {
        self.total_allocations += 1;
        self.reused += 1;
        self.cumulative_allocated_bytes += size as u64;
    }

    pub(crate) fn record_fresh(&mut self, size: usize) {
        self.total_allocations += 1;
        self.fresh += 1;
        self.cumulative_allocated_bytes += size as u64;
    }

    pub(crate) fn record_oom(&mut self) {
        self.total_allocations += 1;
        self.oom_count += 1;
    }

    pub(crate) fn record_deallocation(&mut self) {
        self.total_deallocations += 1;
    }

    pub(crate) fn update_peak(&mut self, current_bytes: usize) {
        self.peak_allocated_bytes = self.peak_allocated_bytes.max(current_bytes);
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "device allocations: {} total ({} reused, {} fresh), {} OOMs, peak {} bytes, {} frees",
            self.total_allocations,
            self.reused,
            self.fresh,
            self.oom_count,
            self.peak_allocated_bytes,
            self.total_deallocations,
        )
    }
}
