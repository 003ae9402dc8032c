// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for profiling and diagnostics.
//!
//! [`AllocStats`] tracks cumulative metrics about device-memory usage:
//! peak residency, release counts, and capacity-exhaustion events. These
//! are the numbers to look at when sizing the device budget for a task.

/// Cumulative statistics about device memory usage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocStats {
    /// Total number of allocation requests.
    pub total_allocations: u64,
    /// Number of buffers returned so far.
    pub total_releases: u64,
    /// Number of requests rejected for exceeding capacity.
    pub oom_count: u64,
    /// Peak in-use bytes.
    pub peak_bytes: usize,
    /// Total bytes ever handed out (including released ones).
    pub cumulative_bytes: u64,
}

impl AllocStats {
    /// Records a successful allocation of `len` bytes.
    pub(crate) fn record_alloc(&mut self, len: usize) {
        self.total_allocations += 1;
        self.cumulative_bytes += len as u64;
    }

    /// Records a capacity-exhaustion rejection.
    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    /// Records a buffer return.
    pub(crate) fn record_release(&mut self) {
        self.total_releases += 1;
    }

    /// Updates the peak high-water mark if needed.
    pub(crate) fn update_peak(&mut self, in_use: usize) {
        if in_use > self.peak_bytes {
            self.peak_bytes = in_use;
        }
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_bytes as f64 / 1024.0;
        format!(
            "Device allocations: {} total, {} released, {} OOMs, peak {:.1} KB",
            self.total_allocations, self.total_releases, self.oom_count, peak_kb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = AllocStats::default();
        assert_eq!(s.total_allocations, 0);
        assert_eq!(s.peak_bytes, 0);
    }

    #[test]
    fn test_peak_tracking() {
        let mut s = AllocStats::default();
        s.update_peak(4096);
        s.update_peak(1024);
        assert_eq!(s.peak_bytes, 4096);
        s.update_peak(8192);
        assert_eq!(s.peak_bytes, 8192);
    }

    #[test]
    fn test_summary() {
        let mut s = AllocStats::default();
        s.record_alloc(2048);
        s.update_peak(2048);
        s.record_release();
        let summary = s.summary();
        assert!(summary.contains("1 total"));
        assert!(summary.contains("1 released"));
        assert!(summary.contains("2.0 KB"));
    }
}
