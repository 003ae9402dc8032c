// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The execution engine that drives compiled task graphs through the vision
//! accelerator.
//!
//! The runtime takes:
//! - A resolved `Task` from `task-ir`.
//! - A `DeviceAllocator` from `device-mem` for intermediate buffers.
//! - A [`DriverNode`] for the device itself: the in-process [`SimNode`], or
//!   a real kernel driver behind the same trait.
//!
//! And runs frames through it: descriptor download, format negotiation,
//! buffer exchange, and per-frame timing.
//!
//! # Interface Lifecycle
//! Every task interface walks a fixed ladder, checked at run time:
//! ```text
//! Closed → Open → Configured → Streaming
//! ```
//! `close()` is reachable from every rung and always lands back on `Closed`.
//!
//! # One Device
//! Kernel entry points serialise on a process-wide gate; however many
//! kernels a process builds, the accelerator sees one caller at a time.

mod config;
mod driver;
mod error;
mod kernel;
mod metrics;
mod taskif;

pub use config::{AllocatorConfig, DeviceConfig, RuntimeConfig};
pub use driver::{
    BufferBunch, BufferDesc, Completion, Direction, DriverNode, PixelFormat, PortBuffers,
    PortFormat, QueueTimestamps, Roi, SimNode, SimStats, DEFAULT_QUEUE_DEPTH,
};
pub use error::{DriverError, RuntimeError};
pub use kernel::{InterPair, Invocation, Kernel, TaskBuffers};
pub use metrics::{FrameStats, RunMetrics};
pub use taskif::{FrameResult, IfState, TaskIf};
