// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Frame profiling metrics.
//!
//! [`RunMetrics`] collects per-frame and aggregate timing, device memory,
//! and throughput data across a run of kernel invocations.

use std::time::Duration;

use crate::taskif::FrameResult;

/// Metrics for a single completed frame of a single task.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FrameStats {
    /// Frame id the caller tagged the invocation with.
    pub frame_id: u32,
    /// Host-observed latency from queue to completion.
    pub queue_to_done: Duration,
    /// Time the frame spent on the device proper.
    pub device_residency: Duration,
}

/// Aggregate metrics for a complete run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunMetrics {
    /// Total wall-clock time for the run.
    pub total_duration: Duration,
    /// Summed host-observed frame latency.
    pub total_queue_to_done: Duration,
    /// Summed on-device time.
    pub total_device_residency: Duration,
    /// Peak device memory in use during the run, in bytes.
    pub peak_device_bytes: usize,
    /// Per-frame metrics, one entry per task per invocation.
    pub frame_stats: Vec<FrameStats>,
    /// Number of task interfaces in the kernel.
    pub num_tasks: usize,
}

impl RunMetrics {
    /// Creates an empty metrics container.
    pub fn new(num_tasks: usize) -> Self {
        Self {
            total_duration: Duration::ZERO,
            total_queue_to_done: Duration::ZERO,
            total_device_residency: Duration::ZERO,
            peak_device_bytes: 0,
            frame_stats: Vec::new(),
            num_tasks,
        }
    }

    /// Records one completed frame.
    pub fn record_frame(&mut self, result: &FrameResult) {
        let queue_to_done = result.timing.queue_to_done();
        let device_residency = result.timing.device_residency();
        self.total_queue_to_done += queue_to_done;
        self.total_device_residency += device_residency;
        self.frame_stats.push(FrameStats {
            frame_id: result.frame_id,
            queue_to_done,
            device_residency,
        });
    }

    /// Finalises metrics with the total wall-clock time and the peak device
    /// memory the allocator reported.
    pub fn finalise(&mut self, total: Duration, peak_device_bytes: usize) {
        self.total_duration = total;
        self.peak_device_bytes = peak_device_bytes;
    }

    /// Number of whole-kernel invocations recorded.
    pub fn invocations(&self) -> usize {
        self.frame_stats.len() / self.num_tasks.max(1)
    }

    /// Returns invocations per second throughput.
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        let invocations = self.invocations();
        if secs <= 0.0 || invocations == 0 {
            return 0.0;
        }
        invocations as f64 / secs
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_device_bytes as f64 / 1024.0;
        let device_pct = if self.total_queue_to_done.as_secs_f64() > 0.0 {
            (self.total_device_residency.as_secs_f64() / self.total_queue_to_done.as_secs_f64())
                * 100.0
        } else {
            0.0
        };

        format!(
            "Run: {:.2}ms total, {} invocations across {} tasks, \
             {:.2}ms queue-to-done ({:.0}% on device), \
             peak {:.1} KB device memory ({:.1} frames/s)",
            self.total_duration.as_secs_f64() * 1000.0,
            self.invocations(),
            self.num_tasks,
            self.total_queue_to_done.as_secs_f64() * 1000.0,
            device_pct,
            peak_kb,
            self.frames_per_second(),
        )
    }
}
