// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for device memory management.

use crate::slot::Binding;

/// Errors that can occur during device memory allocation and slot wiring.
#[derive(Debug, thiserror::Error)]
pub enum MemError {
    /// The requested allocation would exceed the allocator capacity.
    #[error("out of device memory: requested {requested} bytes, only {available} available (capacity {capacity})")]
    OutOfMemory {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    /// Attempted to allocate a zero-sized device buffer.
    #[error("cannot allocate a zero-sized device buffer")]
    ZeroSized,

    /// A capacity string could not be parsed.
    #[error("invalid capacity string '{0}'; expected a number with an optional suffix (K, M, G)")]
    InvalidCapacity(String),

    /// A slot was re-bound to a different buffer than the one it holds.
    #[error("slot already bound to {current}, refusing rebind to {requested}")]
    RebindMismatch {
        current: Binding,
        requested: Binding,
    },

    /// Two slots with conflicting bindings were allied.
    #[error("cannot ally bound slots with different buffers: {ours} vs {theirs}")]
    AllianceConflict { ours: Binding, theirs: Binding },
}
