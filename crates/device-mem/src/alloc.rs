// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`DeviceAllocator`] capability and the host-backed implementation.
//!
//! The runtime never allocates device memory directly; it goes through a
//! `DeviceAllocator`, which models the host collaborator that can turn a
//! byte size into a file descriptor plus a mapped address. On real
//! hardware this is an ION/DMA-heap style service; [`HostAllocator`]
//! provides the same contract from plain host memory so the full task
//! lifecycle runs on a development machine.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{AllocStats, DeviceBudget, DeviceBuffer, MemError};

/// Pseudo file descriptors start well clear of any real fd the process
/// may hold, which keeps device logs unambiguous.
const FIRST_PSEUDO_FD: i32 = 1000;

/// Capability to allocate device-visible memory.
///
/// Implementations hand out [`DeviceBuffer`]s whose drop returns the
/// bytes to the allocator's accounting. Shared as
/// `Arc<dyn DeviceAllocator>` across the TaskIfs of a kernel.
pub trait DeviceAllocator: Send + Sync {
    /// Human-readable name of this allocator.
    fn name(&self) -> &str;

    /// Allocates a zero-filled buffer of `len` bytes.
    fn alloc(&self, len: usize) -> Result<DeviceBuffer, MemError>;

    /// Bytes currently held by live buffers.
    fn in_use_bytes(&self) -> usize;

    /// Snapshot of cumulative allocator statistics.
    fn stats(&self) -> AllocStats;
}

/// Shared allocator state; buffers hold it through their reclaim hooks.
struct HostInner {
    capacity: DeviceBudget,
    in_use: AtomicUsize,
    next_fd: AtomicI32,
    stats: Mutex<AllocStats>,
}

impl HostInner {
    fn release(&self, len: usize) {
        self.in_use.fetch_sub(len, Ordering::Release);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_release();
        }
    }
}

/// Host-memory stand-in for the device allocator.
///
/// # Example
/// ```
/// use device_mem::{DeviceAllocator, DeviceBudget, HostAllocator};
///
/// let alloc = HostAllocator::new(DeviceBudget::from_mb(1));
/// let a = alloc.alloc(4096).unwrap();
/// let b = alloc.alloc(4096).unwrap();
/// assert_ne!(a.fd(), b.fd());
/// assert_eq!(alloc.in_use_bytes(), 8192);
/// ```
pub struct HostAllocator {
    inner: Arc<HostInner>,
}

impl HostAllocator {
    /// Creates an allocator with the given capacity ceiling.
    pub fn new(capacity: DeviceBudget) -> Self {
        Self {
            inner: Arc::new(HostInner {
                capacity,
                in_use: AtomicUsize::new(0),
                next_fd: AtomicI32::new(FIRST_PSEUDO_FD),
                stats: Mutex::new(AllocStats::default()),
            }),
        }
    }

    /// The configured capacity.
    pub fn capacity(&self) -> DeviceBudget {
        self.inner.capacity
    }

    /// Bytes remaining before the capacity is reached.
    pub fn available_bytes(&self) -> usize {
        self.inner
            .capacity
            .as_bytes()
            .saturating_sub(self.in_use_bytes())
    }
}

impl DeviceAllocator for HostAllocator {
    fn name(&self) -> &str {
        "host"
    }

    fn alloc(&self, len: usize) -> Result<DeviceBuffer, MemError> {
        if len == 0 {
            return Err(MemError::ZeroSized);
        }

        let capacity = self.inner.capacity.as_bytes();
        let current = self.inner.in_use.load(Ordering::Acquire);
        if current + len > capacity {
            if let Ok(mut stats) = self.inner.stats.lock() {
                stats.record_oom();
            }
            return Err(MemError::OutOfMemory {
                requested: len,
                available: capacity.saturating_sub(current),
                capacity,
            });
        }

        let fd = self.inner.next_fd.fetch_add(1, Ordering::Relaxed);
        let in_use = self.inner.in_use.fetch_add(len, Ordering::Release) + len;

        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_alloc(len);
            stats.update_peak(in_use);
        }
        tracing::debug!(fd, len, in_use, "device buffer allocated");

        let inner = Arc::clone(&self.inner);
        Ok(DeviceBuffer::new(fd, vec![0u8; len], move |len| {
            inner.release(len);
        }))
    }

    fn in_use_bytes(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    fn stats(&self) -> AllocStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for HostAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostAllocator")
            .field("capacity", &self.inner.capacity)
            .field("in_use_bytes", &self.in_use_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_drop() {
        let alloc = HostAllocator::new(DeviceBudget::from_mb(1));
        let buf = alloc.alloc(1024).unwrap();
        assert_eq!(alloc.in_use_bytes(), 1024);
        drop(buf);
        assert_eq!(alloc.in_use_bytes(), 0);
        assert_eq!(alloc.stats().total_releases, 1);
    }

    #[test]
    fn test_buffers_are_zeroed_and_distinct() {
        let alloc = HostAllocator::new(DeviceBudget::from_mb(1));
        let a = alloc.alloc(64).unwrap();
        let b = alloc.alloc(64).unwrap();
        assert!(a.as_slice().iter().all(|&x| x == 0));
        assert_eq!(b.fd(), a.fd() + 1);
        assert_ne!(a.addr(), b.addr());
    }

    #[test]
    fn test_capacity_exhaustion() {
        let alloc = HostAllocator::new(DeviceBudget::from_bytes(1024));
        let _a = alloc.alloc(512).unwrap();
        let _b = alloc.alloc(512).unwrap();
        let err = alloc.alloc(1).unwrap_err();
        assert!(matches!(err, MemError::OutOfMemory { .. }));
        assert_eq!(alloc.stats().oom_count, 1);
    }

    #[test]
    fn test_zero_sized_rejected() {
        let alloc = HostAllocator::new(DeviceBudget::from_mb(1));
        assert!(matches!(alloc.alloc(0), Err(MemError::ZeroSized)));
    }

    #[test]
    fn test_released_bytes_become_available() {
        let alloc = HostAllocator::new(DeviceBudget::from_bytes(4096));
        let a = alloc.alloc(4096).unwrap();
        assert_eq!(alloc.available_bytes(), 0);
        drop(a);
        assert_eq!(alloc.available_bytes(), 4096);
        alloc.alloc(4096).unwrap();
    }

    #[test]
    fn test_peak_tracking() {
        let alloc = HostAllocator::new(DeviceBudget::from_mb(1));
        let a = alloc.alloc(1000).unwrap();
        let b = alloc.alloc(2000).unwrap();
        drop(a);
        drop(b);
        assert_eq!(alloc.stats().peak_bytes, 3000);
        assert_eq!(alloc.in_use_bytes(), 0);
    }

    #[test]
    fn test_trait_object_usable() {
        let alloc: Arc<dyn DeviceAllocator> =
            Arc::new(HostAllocator::new(DeviceBudget::from_mb(1)));
        let buf = alloc.alloc(16).unwrap();
        assert_eq!(alloc.name(), "host");
        assert_eq!(buf.len(), 16);
    }
}
