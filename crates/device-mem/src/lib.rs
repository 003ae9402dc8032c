// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-mem
//!
//! Device-visible memory allocation for the VPU task runtime.
//!
//! # Key Components
//!
//! - [`DeviceAllocator`] — the allocation capability the runtime programs
//!   against: give it a byte size, get back a file descriptor and a mapped
//!   address.
//! - [`HostAllocator`] — a capacity-bounded host-memory implementation with
//!   monotonically increasing pseudo file descriptors. It stands in for the
//!   real device allocator in tests and on development hosts.
//! - [`DeviceBuffer`] — an RAII wrapper around one allocation. Dropping the
//!   buffer returns its bytes to the allocator's accounting; the borrow
//!   checker prevents use-after-free at compile time.
//! - [`MemSlot`] — a shared memory slot backing an external-memory entry.
//!   Slots can be *allied*: allied slots share one interior state, so
//!   binding a buffer through any of them is visible through all of them.
//! - [`DeviceBudget`] — a hard capacity ceiling with human-readable parsing
//!   (`"64M"`, `"1G"`, etc.).
//! - [`AllocStats`] — cumulative allocator metrics.
//!
//! # Ownership Model
//!
//! ```text
//! HostAllocator::alloc(len)
//!       │
//!       ▼
//!   DeviceBuffer  ◄─── owns the mapping, knows how to return it
//!       │
//!       │  drop()
//!       ▼
//!   in-use counter decremented, release recorded
//! ```
//!
//! # Example
//! ```
//! use device_mem::{DeviceAllocator, DeviceBudget, HostAllocator};
//!
//! let alloc = HostAllocator::new(DeviceBudget::from_mb(4));
//! let buf = alloc.alloc(4096).unwrap();
//! assert_eq!(buf.len(), 4096);
//! assert_eq!(alloc.in_use_bytes(), 4096);
//!
//! drop(buf);
//! assert_eq!(alloc.in_use_bytes(), 0);
//! ```

mod alloc;
mod budget;
mod buffer;
mod error;
mod slot;
mod stats;

pub use alloc::{DeviceAllocator, HostAllocator};
pub use budget::DeviceBudget;
pub use buffer::DeviceBuffer;
pub use error::MemError;
pub use slot::{Binding, MemSlot};
pub use stats::AllocStats;
