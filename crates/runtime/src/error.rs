// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the device runtime.

use device_mem::MemError;
use task_ir::{ExtMemId, GraphError, PuId, UpdatableId};

use crate::driver::Direction;

/// Errors raised by a driver node, real or simulated.
///
/// These mirror what the character-device ioctls report; the runtime wraps
/// them in [`RuntimeError::Driver`] before they reach callers.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Operation issued while the device is in the wrong state.
    #[error("cannot {op} while the device is {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },

    /// The device refused a task descriptor.
    #[error("descriptor rejected: {detail}")]
    BadDescriptor { detail: String },

    /// The device refused a port format list.
    #[error("format rejected: {detail}")]
    BadFormat { detail: String },

    /// Queue for the given direction has no free slot.
    #[error("{direction} queue is full ({depth} slots)")]
    QueueFull { direction: Direction, depth: usize },

    /// Dequeue issued with nothing in flight.
    #[error("{direction} queue is empty")]
    QueueEmpty { direction: Direction },

    /// A buffer or parameter update named a processing unit the loaded
    /// graph does not contain.
    #[error("unknown target {target}")]
    UnknownTarget { target: u32 },

    /// Parameter block exceeds the per-unit register window.
    #[error("parameter block is {len} bytes, device limit is {limit}")]
    BadParam { len: usize, limit: usize },
}

/// Errors produced by the runtime layer.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A driver node rejected an operation.
    #[error("device error: {0}")]
    Driver(#[from] DriverError),

    /// Task-interface operation issued in the wrong lifecycle state.
    #[error("cannot {op}: task interface is {actual}, expected {expected}")]
    InvalidState {
        op: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    /// Descriptor emission failed while configuring the device.
    #[error("task graph error: {0}")]
    Graph(#[from] GraphError),

    /// Device memory allocation or binding failed.
    #[error("device memory error: {0}")]
    Mem(#[from] MemError),

    /// An intermediate slot is referenced by no memmap, so its size
    /// cannot be derived.
    #[error("intermediate slot {ext} has no consuming memmap")]
    NoConsumer { ext: ExtMemId },

    /// An intermediate slot has no bound buffer at streaming time.
    #[error("slot {ext} has no bound buffer; allocate intermediates before streaming")]
    UnboundSlot { ext: ExtMemId },

    /// Caller supplied the wrong number of I/O buffers for a frame.
    #[error("{direction} bunch needs {expected} I/O buffer(s), caller supplied {given}")]
    BufferCount {
        direction: Direction,
        expected: usize,
        given: usize,
    },

    /// A DMA endpoint's pixel size maps to no known pixel format.
    #[error("no pixel format for {pixel_bytes}-byte pixels on {pu}")]
    NoPixelFormat { pu: PuId, pixel_bytes: u16 },

    /// A completion disagreed with what was queued. Fatal for the
    /// affected frame; the result is discarded, never fabricated.
    #[error("synchronization mismatch on {what}: expected {expected}, device returned {actual}")]
    SyncMismatch {
        what: &'static str,
        expected: u32,
        actual: u32,
    },

    /// `get_buffers` called with no frame in flight.
    #[error("no frame in flight")]
    NoPendingFrame,

    /// Stream stop requested while frames are still in flight.
    #[error("{frames} frame(s) still in flight")]
    PendingFrames { frames: usize },

    /// Kernel operation named a task-interface slot that does not exist.
    #[error("no task interface at index {index}")]
    UnknownTaskIf { index: usize },

    /// Parameter staging named an updatable the task does not declare.
    #[error("task has no updatable {id}")]
    UnknownUpdatable { id: UpdatableId },

    /// Staged parameter block exceeds the per-unit register window.
    #[error("parameter update is {len} bytes, hardware limit is {limit}")]
    ParamTooLarge { len: usize, limit: usize },

    /// `set_inter_pair` named an endpoint that cannot be allied.
    #[error("invalid inter-task pair: {detail}")]
    InterPair { detail: String },

    /// An invocation carried the wrong number of per-task buffer sets.
    #[error("invocation carries {given} buffer set(s) for {expected} task interface(s)")]
    InvocationShape { expected: usize, given: usize },

    /// Configuration file could not be read, parsed, or validated.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
