// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII device buffer that returns its bytes to the allocator on drop.
//!
//! [`DeviceBuffer`] mirrors what a real device allocation hands back: a
//! file descriptor the device protocol can queue, plus a host mapping.
//! Ownership of the mapping lives in the buffer; dropping it notifies the
//! originating allocator so its in-use accounting stays exact.

/// One device-visible allocation: a file descriptor plus a host mapping.
///
/// The buffer owns its mapping. When dropped it invokes the reclaim hook
/// installed by the allocator that produced it, which decrements the
/// allocator's in-use counter. The borrow checker prevents use-after-free.
pub struct DeviceBuffer {
    fd: i32,
    addr: usize,
    /// The mapping. Wrapped in `Option` so `drop` can take it.
    data: Option<Vec<u8>>,
    /// Installed by the allocator; called with the buffer length on drop.
    reclaim: Option<Box<dyn FnOnce(usize) + Send>>,
}

impl DeviceBuffer {
    /// Creates a buffer (called by allocator implementations).
    pub fn new(fd: i32, data: Vec<u8>, reclaim: impl FnOnce(usize) + Send + 'static) -> Self {
        let addr = data.as_ptr() as usize;
        Self {
            fd,
            addr,
            data: Some(data),
            reclaim: Some(Box::new(reclaim)),
        }
    }

    /// The file descriptor identifying this allocation to the device.
    pub fn fd(&self) -> i32 {
        self.fd
    }

    /// The mapped address of the allocation.
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// The allocation length in bytes.
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immutable view of the mapping.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Mutable view of the mapping, for host-side staging.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        let len = self.len();
        self.data.take();
        if let Some(reclaim) = self.reclaim.take() {
            reclaim(len);
        }
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("fd", &self.fd)
            .field("len", &self.len())
            .field("addr", &format_args!("{:#x}", self.addr))
            .finish()
    }
}
