// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # task-ir
//!
//! The object model for VPU task graphs and their flat firmware
//! descriptors.
//!
//! A task is a small control-flow graph of vertices; each processing
//! vertex owns hardware *subchains* — bursts of processing units (PUs)
//! streaming line buffers through fixed-function blocks — plus the memory
//! maps, external-memory slots, and size bookkeeping the device needs to
//! run them. The crate covers:
//!
//! - [`Task`] — the arena-owned graph with a **type-state build flow**
//!   (`Building` → `Resolved`); geometry freezing and serialization only
//!   exist on resolved tasks.
//! - [`Vertex`] / [`Subchain`] / [`Pu`] — control-flow nodes, hardware
//!   bursts, and operator blocks with typed ports.
//! - [`Task::resolve_sizes`] — the size-spread pass: pulls frame geometry
//!   through the `size_graph` transform chain into every PU payload.
//! - [`descriptor`] and the codec — the flat little-endian buffer the
//!   device consumes; [`Task::from_descriptor`] decodes it strictly and
//!   re-serializes byte-identically.
//! - [`TaskBlueprint`] — a JSON pipeline description that builds into a
//!   task; the CLI's build path.
//!
//! # Example
//! ```
//! use task_ir::{ExternalMem, ImageDesc, MemmapBacking, PuKind, PuParams, Task, VertexKind};
//!
//! let mut task = Task::new(7, 1);
//! let start = task.add_vertex(VertexKind::Start).unwrap();
//! let process = task.add_vertex(VertexKind::Process).unwrap();
//! let end = task.add_vertex(VertexKind::End).unwrap();
//! task.add_edge(start, process).unwrap();
//! task.add_edge(process, end).unwrap();
//! let sc = task.add_hw_subchain(process).unwrap();
//!
//! let frame_in = task.add_external_mem(ExternalMem::io()).unwrap();
//! let frame_out = task.add_external_mem(ExternalMem::io()).unwrap();
//! let in_map = task
//!     .add_memmap(MemmapBacking::External(frame_in), ImageDesc::new(64, 64, 1))
//!     .unwrap();
//! let out_map = task
//!     .add_memmap(MemmapBacking::External(frame_out), ImageDesc::new(64, 64, 1))
//!     .unwrap();
//!
//! let root = task.sizes_mut().add_inout(None).unwrap();
//! let stage = task.sizes_mut().add_inout(Some(root)).unwrap();
//! let dma_in = task
//!     .add_pu(sc, PuKind::DmaIn, 0, PuParams::default_for(PuKind::DmaIn), Some(root))
//!     .unwrap();
//! let salb = task
//!     .add_pu(sc, PuKind::Salb, 0, PuParams::default_for(PuKind::Salb), Some(stage))
//!     .unwrap();
//! let dma_out = task
//!     .add_pu(sc, PuKind::DmaOut, 0, PuParams::default_for(PuKind::DmaOut), Some(stage))
//!     .unwrap();
//! task.set_memmap(dma_in, in_map).unwrap();
//! task.set_memmap(dma_out, out_map).unwrap();
//! task.connect(dma_in, 0, salb, 0).unwrap();
//! task.connect(salb, 0, dma_out, 0).unwrap();
//!
//! let resolved = task.resolve_sizes().unwrap();
//! let descriptor = resolved.to_descriptor().unwrap();
//! let decoded = Task::from_descriptor(&descriptor).unwrap();
//! assert_eq!(decoded.to_descriptor().unwrap(), descriptor);
//! ```

mod blueprint;
mod codec;
pub mod descriptor;
mod error;
mod image;
mod memmap;
pub mod pu;
mod subchain;
mod task;
mod vertex;

pub use blueprint::{BlueprintImage, BlueprintStage, TaskBlueprint, BLUEPRINT_VERSION};
pub use error::{BlueprintError, CodecError, GraphError};
pub use image::ImageDesc;
pub use memmap::{ExtMemId, ExternalMem, InternalRam, Memmap, MemmapBacking, MemmapId, RamId};
pub use pu::{PortLink, Pu, PuId, PuKind, PuParams};
pub use subchain::{
    compose_global_id, CpuOp, CpuOpcode, Subchain, SubchainId, SubchainKind, MAX_CPU_OPS,
};
pub use task::{Building, Resolved, Task, TaskPhase, UpdatableId, UpdatablePu};
pub use vertex::{ProcessBase, ProcessBaseId, Vertex, VertexId, VertexKind, MAX_OUT_EDGES};
