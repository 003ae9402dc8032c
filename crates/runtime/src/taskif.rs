// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Task interface: the host-side lifecycle of one task on one device node.
//!
//! A [`TaskIf`] owns a resolved task graph and a driver node and walks them
//! through open, configure, stream and close, assembling buffer bunches for
//! each frame along the way. Intermediate buffers that carry data between
//! subchains of the same task (or, once allied, between tasks) are allocated
//! here and stay bound for the life of the interface.
//!
//! # Lifecycle
//!
//! ```text
//!   Closed ──open()──▶ Open ──configure()──▶ Configured ──stream_on()──▶ Streaming
//!     ▲                                          ▲                          │
//!     │                                          └───── stream_off() ───────┤
//!     └──────────────────────── close() ─────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use device_mem::{DeviceAllocator, DeviceBuffer, MemSlot};
use task_ir::descriptor::PU_PARAM_BYTES;
use task_ir::pu::DmaDataKind;
use task_ir::{ExtMemId, MemmapId, PuId, PuKind, PuParams, Resolved, Task, UpdatableId};

use crate::driver::{
    BufferBunch, BufferDesc, Direction, DriverNode, PixelFormat, PortBuffers, PortFormat,
    QueueTimestamps,
};
use crate::error::RuntimeError;

// ── Lifecycle state ─────────────────────────────────────────────────────────

/// Lifecycle state of a task interface.
///
/// Runtime data rather than a type parameter: `close()` must be callable
/// from every state during teardown, and interfaces in different states
/// share one kernel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfState {
    Closed,
    Open,
    Configured,
    Streaming,
}

impl IfState {
    pub fn as_str(self) -> &'static str {
        match self {
            IfState::Closed => "closed",
            IfState::Open => "open",
            IfState::Configured => "configured",
            IfState::Streaming => "streaming",
        }
    }
}

impl fmt::Display for IfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Frame results ───────────────────────────────────────────────────────────

/// One completed frame of one task.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    pub frame_id: u32,
    /// Input parameter-set selector echoed by the device.
    pub in_index: u32,
    /// Output parameter-set selector echoed by the device.
    pub out_index: u32,
    /// Timestamps of the output completion, which closes the frame.
    pub timing: QueueTimestamps,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    frame_id: u32,
    in_index: u32,
    out_index: u32,
}

/// One external-backed DMA endpoint, precomputed at construction.
#[derive(Debug, Clone)]
struct Endpoint {
    pu: PuId,
    /// Wire index the device knows the endpoint by.
    target: u16,
    ext: ExtMemId,
    io: bool,
    point_list: bool,
    planes: Vec<MemmapId>,
}

// ── Task interface ──────────────────────────────────────────────────────────

/// Host-side handle for one task on one device node.
pub struct TaskIf {
    task: Task<Resolved>,
    node: Box<dyn DriverNode>,
    state: IfState,
    /// External-backed DMA endpoints per direction, wire order.
    endpoints: [Vec<Endpoint>; 2],
    /// Buffers backing this task's own intermediate slots. Allied slots
    /// bound by another task keep their buffer over there.
    inter_bufs: Vec<DeviceBuffer>,
    in_flight: VecDeque<PendingFrame>,
    /// Distinct I/O buffer tuples seen so far, per direction.
    registry: [Vec<Vec<BufferDesc>>; 2],
    staged: Vec<(u32, Vec<u8>)>,
}

impl TaskIf {
    /// Pairs a resolved task with the node that will execute it.
    pub fn new(task: Task<Resolved>, node: Box<dyn DriverNode>) -> Self {
        let endpoints = [
            Self::endpoints_for(&task, Direction::In),
            Self::endpoints_for(&task, Direction::Out),
        ];
        Self {
            task,
            node,
            state: IfState::Closed,
            endpoints,
            inter_bufs: Vec::new(),
            in_flight: VecDeque::new(),
            registry: [Vec::new(), Vec::new()],
            staged: Vec::new(),
        }
    }

    fn endpoints_for(task: &Task<Resolved>, direction: Direction) -> Vec<Endpoint> {
        let wanted = match direction {
            Direction::In => PuKind::DmaIn,
            Direction::Out => PuKind::DmaOut,
        };
        let mut out = Vec::new();
        for (i, pu) in task.pus().iter().enumerate() {
            if pu.kind() != wanted {
                continue;
            }
            let id = PuId(i as u16);
            let planes = pu.memmaps();
            let Some(first) = planes.first().copied() else {
                continue;
            };
            // Preload-backed DMAs stream nothing; only external slots
            // queue buffers.
            let Some(ext) = task.memmap(first).and_then(|m| m.ext_mem()) else {
                continue;
            };
            let Some(target) = task.wire_pu_index(id) else {
                continue;
            };
            let io = task.external_mem(ext).is_some_and(|e| e.is_io());
            let point_list = matches!(
                &pu.params,
                PuParams::Dma(p) if p.data_kind == DmaDataKind::PointList
            );
            out.push(Endpoint {
                pu: id,
                target,
                ext,
                io,
                point_list,
                planes,
            });
        }
        // Wire order is the calling convention for caller-supplied buffers.
        out.sort_by_key(|e| e.target);
        out
    }

    fn require(&self, op: &'static str, expected: IfState) -> Result<(), RuntimeError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RuntimeError::InvalidState {
                op,
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    pub fn state(&self) -> IfState {
        self.state
    }

    pub fn task(&self) -> &Task<Resolved> {
        &self.task
    }

    pub fn node_name(&self) -> &str {
        self.node.name()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of I/O planes the caller must supply per frame for one
    /// direction.
    pub fn io_plane_count(&self, direction: Direction) -> usize {
        self.endpoints[direction.index()]
            .iter()
            .filter(|e| e.io)
            .map(|e| e.planes.len())
            .sum()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    pub fn open(&mut self) -> Result<(), RuntimeError> {
        self.require("open", IfState::Closed)?;
        self.node.open()?;
        self.state = IfState::Open;
        tracing::info!(
            task = self.task.id(),
            node = self.node.name(),
            "task interface opened"
        );
        Ok(())
    }

    /// Loads the serialized graph into the device and negotiates formats
    /// for every external-backed DMA plane, both directions.
    pub fn configure(&mut self) -> Result<(), RuntimeError> {
        self.require("configure", IfState::Open)?;
        let descriptor = self.task.to_descriptor()?;
        self.node.set_graph(&descriptor)?;
        for direction in [Direction::In, Direction::Out] {
            let formats = self.port_formats(direction)?;
            self.node.set_format(direction, &formats)?;
        }
        self.state = IfState::Configured;
        tracing::info!(
            task = self.task.id(),
            bytes = descriptor.len(),
            "task interface configured"
        );
        Ok(())
    }

    fn port_formats(&self, direction: Direction) -> Result<Vec<PortFormat>, RuntimeError> {
        let mut formats = Vec::new();
        for ep in &self.endpoints[direction.index()] {
            for (plane, mm_id) in ep.planes.iter().enumerate() {
                let Some(mm) = self.task.memmap(*mm_id) else {
                    continue;
                };
                let pixel_format = if ep.point_list {
                    PixelFormat::PointList
                } else {
                    PixelFormat::for_pixel_bytes(mm.image.pixel_bytes).ok_or(
                        RuntimeError::NoPixelFormat {
                            pu: ep.pu,
                            pixel_bytes: mm.image.pixel_bytes,
                        },
                    )?
                };
                formats.push(PortFormat {
                    target: ep.target,
                    plane: plane as u8,
                    pixel_format,
                    width: mm.image.width,
                    height: mm.image.height,
                    pixel_bytes: mm.image.pixel_bytes,
                });
            }
        }
        Ok(formats)
    }

    /// Sizes and binds every unbound intermediate slot.
    ///
    /// Slot size is the largest byte extent any memmap over the slot
    /// declares. Bound slots are skipped, so a second call, or a call after
    /// an allied task allocated first, binds nothing new.
    pub fn alloc_inter_subchain_buf(
        &mut self,
        allocator: &dyn DeviceAllocator,
    ) -> Result<(), RuntimeError> {
        self.require("alloc_inter_subchain_buf", IfState::Configured)?;
        for (i, ext) in self.task.external_mems().iter().enumerate() {
            let id = ExtMemId(i as u16);
            if ext.is_io() || ext.slot.is_bound() {
                continue;
            }
            let mut consumers = 0usize;
            let mut size = 0usize;
            for mm in self.task.memmaps() {
                if mm.ext_mem() == Some(id) {
                    consumers += 1;
                    size = size.max(mm.image.byte_size());
                }
            }
            if consumers == 0 {
                return Err(RuntimeError::NoConsumer { ext: id });
            }
            let buf = allocator.alloc(size)?;
            ext.slot.bind(buf.fd(), buf.len())?;
            tracing::debug!(
                task = self.task.id(),
                slot = %id,
                bytes = size,
                fd = buf.fd(),
                "intermediate buffer bound"
            );
            self.inter_bufs.push(buf);
        }
        Ok(())
    }

    pub fn stream_on(&mut self) -> Result<(), RuntimeError> {
        self.require("stream_on", IfState::Configured)?;
        self.node.stream_on()?;
        self.state = IfState::Streaming;
        tracing::info!(task = self.task.id(), "streaming");
        Ok(())
    }

    /// Stops the stream. Refused while frames are in flight: a put without
    /// its get is an unexpected state the caller must resolve, not a
    /// condition to paper over.
    pub fn stream_off(&mut self) -> Result<(), RuntimeError> {
        self.require("stream_off", IfState::Streaming)?;
        if !self.in_flight.is_empty() {
            return Err(RuntimeError::PendingFrames {
                frames: self.in_flight.len(),
            });
        }
        self.node.stream_off()?;
        self.state = IfState::Configured;
        tracing::info!(task = self.task.id(), "stream stopped");
        Ok(())
    }

    /// Best-effort shutdown; callable from every state, reports the first
    /// failure but always finishes in `Closed`.
    pub fn close(&mut self) -> Result<(), RuntimeError> {
        if self.state == IfState::Closed {
            return Ok(());
        }
        let mut first: Option<RuntimeError> = None;
        if self.state == IfState::Streaming {
            if !self.in_flight.is_empty() {
                tracing::warn!(
                    task = self.task.id(),
                    frames = self.in_flight.len(),
                    "closing with frames in flight"
                );
                first = Some(RuntimeError::PendingFrames {
                    frames: self.in_flight.len(),
                });
            }
            if let Err(e) = self.node.stream_off() {
                first.get_or_insert(e.into());
            }
        }
        if let Err(e) = self.node.close() {
            first.get_or_insert(e.into());
        }
        self.in_flight.clear();
        self.staged.clear();
        self.state = IfState::Closed;
        tracing::info!(task = self.task.id(), "task interface closed");
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ── Frames ──────────────────────────────────────────────────────────────

    /// Registry of distinct I/O buffer tuples for one direction. The
    /// returned index rides the bunch as its selector and must be echoed
    /// by the completion.
    pub fn find_io_index(&mut self, direction: Direction, descs: &[BufferDesc]) -> u32 {
        let registry = &mut self.registry[direction.index()];
        if let Some(pos) = registry.iter().position(|known| known == descs) {
            return pos as u32;
        }
        registry.push(descs.to_vec());
        (registry.len() - 1) as u32
    }

    /// Queues one frame: caller-supplied I/O planes in wire order, plus
    /// this task's intermediate bindings, input bunch first.
    pub fn put_buffers(
        &mut self,
        frame_id: u32,
        io_in: &[BufferDesc],
        io_out: &[BufferDesc],
    ) -> Result<(), RuntimeError> {
        self.require("put_buffers", IfState::Streaming)?;
        self.check_io_count(Direction::In, io_in.len())?;
        self.check_io_count(Direction::Out, io_out.len())?;
        let in_index = self.find_io_index(Direction::In, io_in);
        let out_index = self.find_io_index(Direction::Out, io_out);
        let bunch_in = self.assemble(Direction::In, frame_id, in_index, io_in)?;
        let bunch_out = self.assemble(Direction::Out, frame_id, out_index, io_out)?;
        self.node.queue(Direction::In, &bunch_in)?;
        self.node.queue(Direction::Out, &bunch_out)?;
        self.in_flight.push_back(PendingFrame {
            frame_id,
            in_index,
            out_index,
        });
        tracing::trace!(task = self.task.id(), frame = frame_id, "frame queued");
        Ok(())
    }

    fn check_io_count(&self, direction: Direction, given: usize) -> Result<(), RuntimeError> {
        let expected = self.io_plane_count(direction);
        if expected == given {
            Ok(())
        } else {
            Err(RuntimeError::BufferCount {
                direction,
                expected,
                given,
            })
        }
    }

    fn assemble(
        &self,
        direction: Direction,
        frame_id: u32,
        index: u32,
        io_descs: &[BufferDesc],
    ) -> Result<BufferBunch, RuntimeError> {
        let mut supplied = io_descs.iter();
        let mut containers = Vec::new();
        for ep in &self.endpoints[direction.index()] {
            let mut planes = Vec::with_capacity(ep.planes.len());
            if ep.io {
                for _ in &ep.planes {
                    // Counts were checked before assembly.
                    if let Some(desc) = supplied.next() {
                        planes.push(*desc);
                    }
                }
            } else {
                let binding = self
                    .task
                    .external_mem(ep.ext)
                    .and_then(|e| e.slot.binding())
                    .ok_or(RuntimeError::UnboundSlot { ext: ep.ext })?;
                for _ in &ep.planes {
                    planes.push(BufferDesc {
                        fd: binding.fd,
                        len: binding.len,
                        roi: None,
                    });
                }
            }
            containers.push(PortBuffers {
                target: ep.target,
                planes,
            });
        }
        Ok(BufferBunch {
            frame_id,
            index,
            containers,
        })
    }

    /// Collects the oldest frame, both directions, and checks that the
    /// completions agree with what was queued. A disagreement is fatal for
    /// the frame: the result is discarded, never patched up.
    pub fn get_buffers(&mut self) -> Result<FrameResult, RuntimeError> {
        self.require("get_buffers", IfState::Streaming)?;
        let Some(expected) = self.in_flight.pop_front() else {
            return Err(RuntimeError::NoPendingFrame);
        };
        let input = self.node.dequeue(Direction::In)?;
        let output = self.node.dequeue(Direction::Out)?;
        Self::check_sync("input frame id", expected.frame_id, input.frame_id)?;
        Self::check_sync("output frame id", expected.frame_id, output.frame_id)?;
        Self::check_sync("input selector", expected.in_index, input.index)?;
        Self::check_sync("output selector", expected.out_index, output.index)?;
        tracing::trace!(
            task = self.task.id(),
            frame = expected.frame_id,
            "frame completed"
        );
        Ok(FrameResult {
            frame_id: expected.frame_id,
            in_index: expected.in_index,
            out_index: expected.out_index,
            timing: output.timestamps,
        })
    }

    fn check_sync(what: &'static str, expected: u32, actual: u32) -> Result<(), RuntimeError> {
        if expected == actual {
            Ok(())
        } else {
            Err(RuntimeError::SyncMismatch {
                what,
                expected,
                actual,
            })
        }
    }

    // ── Parameters ──────────────────────────────────────────────────────────

    /// Queues a parameter rewrite for an updatable unit; written to the
    /// device at the next kernel invocation.
    pub fn stage_param(&mut self, id: UpdatableId, bytes: &[u8]) -> Result<(), RuntimeError> {
        if bytes.len() > PU_PARAM_BYTES {
            return Err(RuntimeError::ParamTooLarge {
                len: bytes.len(),
                limit: PU_PARAM_BYTES,
            });
        }
        let target = self
            .task
            .wire_updatable_target(id)
            .ok_or(RuntimeError::UnknownUpdatable { id })?;
        self.staged.push((target, bytes.to_vec()));
        tracing::debug!(task = self.task.id(), target, len = bytes.len(), "parameter staged");
        Ok(())
    }

    /// Writes every staged parameter block to the device, oldest first.
    pub(crate) fn apply_staged(&mut self) -> Result<(), RuntimeError> {
        for (target, bytes) in self.staged.drain(..) {
            self.node.set_param(target, &bytes)?;
        }
        Ok(())
    }

    /// Re-points an intermediate slot at a lead slot from another task.
    pub(crate) fn ally_slot(&mut self, ext: ExtMemId, lead: &MemSlot) -> Result<(), RuntimeError> {
        let Some(mem) = self.task.external_mem_mut(ext) else {
            return Err(RuntimeError::InterPair {
                detail: format!("slot {ext} does not exist"),
            });
        };
        mem.slot.ally_with(lead)?;
        Ok(())
    }
}

impl fmt::Debug for TaskIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskIf")
            .field("task", &self.task.id())
            .field("node", &self.node.name())
            .field("state", &self.state)
            .field("in_flight", &self.in_flight.len())
            .field("inter_bufs", &self.inter_bufs.len())
            .finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SimNode;
    use device_mem::{DeviceBudget, HostAllocator};
    use task_ir::{
        Building, ExternalMem, ImageDesc, MemmapBacking, SubchainId, VertexId, VertexKind,
    };

    fn zero_image(pixel_bytes: u16) -> ImageDesc {
        ImageDesc {
            width: 0,
            height: 0,
            pixel_bytes,
            line_ofs: 0,
        }
    }

    /// DmaIn(io) -> Salb -> DmaOut(io), 64x64 gray; handles returned for
    /// tests that mark updatables.
    fn build_io(id: u16, pixel_bytes: u16) -> (Task<Building>, VertexId, SubchainId, PuId) {
        let mut t = Task::new(id, 0);
        let start = t.add_vertex(VertexKind::Start).unwrap();
        let process = t.add_vertex(VertexKind::Process).unwrap();
        let end = t.add_vertex(VertexKind::End).unwrap();
        t.add_edge(start, process).unwrap();
        t.add_edge(process, end).unwrap();
        let sc = t.add_hw_subchain(process).unwrap();

        let in_mem = t.add_external_mem(ExternalMem::io()).unwrap();
        let out_mem = t.add_external_mem(ExternalMem::io()).unwrap();
        let in_map = t
            .add_memmap(
                MemmapBacking::External(in_mem),
                ImageDesc::new(64, 64, pixel_bytes),
            )
            .unwrap();
        let out_map = t
            .add_memmap(MemmapBacking::External(out_mem), zero_image(pixel_bytes))
            .unwrap();

        let root = t.sizes_mut().add_inout(None).unwrap();
        let mid = t.sizes_mut().add_inout(Some(root)).unwrap();
        let dma_in = t
            .add_pu(sc, PuKind::DmaIn, 0, PuParams::default_for(PuKind::DmaIn), Some(root))
            .unwrap();
        let salb = t
            .add_pu(sc, PuKind::Salb, 0, PuParams::default_for(PuKind::Salb), Some(mid))
            .unwrap();
        let dma_out = t
            .add_pu(sc, PuKind::DmaOut, 0, PuParams::default_for(PuKind::DmaOut), Some(mid))
            .unwrap();
        t.set_memmap(dma_in, in_map).unwrap();
        t.set_memmap(dma_out, out_map).unwrap();
        t.connect(dma_in, 0, salb, 0).unwrap();
        t.connect(salb, 0, dma_out, 0).unwrap();
        (t, process, sc, salb)
    }

    fn io_task(id: u16) -> Task<Resolved> {
        build_io(id, 1).0.resolve_sizes().unwrap()
    }

    /// Two subchains bridged by one intermediate slot:
    /// DmaIn(io) -> Salb -> DmaOut(inter), DmaIn(inter) -> Salb -> DmaOut(io).
    fn chained_task(id: u16) -> Task<Resolved> {
        let mut t = Task::new(id, 0);
        let start = t.add_vertex(VertexKind::Start).unwrap();
        let stage1 = t.add_vertex(VertexKind::Process).unwrap();
        let stage2 = t.add_vertex(VertexKind::Process).unwrap();
        let end = t.add_vertex(VertexKind::End).unwrap();
        t.add_edge(start, stage1).unwrap();
        t.add_edge(stage1, stage2).unwrap();
        t.add_edge(stage2, end).unwrap();
        let sc1 = t.add_hw_subchain(stage1).unwrap();
        let sc2 = t.add_hw_subchain(stage2).unwrap();

        let in_mem = t.add_external_mem(ExternalMem::io()).unwrap();
        let mid_mem = t.add_external_mem(ExternalMem::intermediate()).unwrap();
        let out_mem = t.add_external_mem(ExternalMem::io()).unwrap();

        let in_map = t
            .add_memmap(MemmapBacking::External(in_mem), ImageDesc::new(64, 64, 1))
            .unwrap();
        let mid_out_map = t
            .add_memmap(MemmapBacking::External(mid_mem), zero_image(1))
            .unwrap();
        let mid_in_map = t
            .add_memmap(MemmapBacking::External(mid_mem), ImageDesc::new(64, 64, 1))
            .unwrap();
        let out_map = t
            .add_memmap(MemmapBacking::External(out_mem), zero_image(1))
            .unwrap();

        let root1 = t.sizes_mut().add_inout(None).unwrap();
        let mid1 = t.sizes_mut().add_inout(Some(root1)).unwrap();
        let root2 = t.sizes_mut().add_inout(None).unwrap();
        let mid2 = t.sizes_mut().add_inout(Some(root2)).unwrap();

        let dma_in1 = t
            .add_pu(sc1, PuKind::DmaIn, 0, PuParams::default_for(PuKind::DmaIn), Some(root1))
            .unwrap();
        let salb1 = t
            .add_pu(sc1, PuKind::Salb, 0, PuParams::default_for(PuKind::Salb), Some(mid1))
            .unwrap();
        let dma_out1 = t
            .add_pu(sc1, PuKind::DmaOut, 0, PuParams::default_for(PuKind::DmaOut), Some(mid1))
            .unwrap();
        let dma_in2 = t
            .add_pu(sc2, PuKind::DmaIn, 1, PuParams::default_for(PuKind::DmaIn), Some(root2))
            .unwrap();
        let salb2 = t
            .add_pu(sc2, PuKind::Salb, 1, PuParams::default_for(PuKind::Salb), Some(mid2))
            .unwrap();
        let dma_out2 = t
            .add_pu(sc2, PuKind::DmaOut, 1, PuParams::default_for(PuKind::DmaOut), Some(mid2))
            .unwrap();

        t.set_memmap(dma_in1, in_map).unwrap();
        t.set_memmap(dma_out1, mid_out_map).unwrap();
        t.set_memmap(dma_in2, mid_in_map).unwrap();
        t.set_memmap(dma_out2, out_map).unwrap();
        t.connect(dma_in1, 0, salb1, 0).unwrap();
        t.connect(salb1, 0, dma_out1, 0).unwrap();
        t.connect(dma_in2, 0, salb2, 0).unwrap();
        t.connect(salb2, 0, dma_out2, 0).unwrap();
        t.resolve_sizes().unwrap()
    }

    fn sim_if(task: Task<Resolved>) -> TaskIf {
        TaskIf::new(task, Box::new(SimNode::new(4)))
    }

    fn host_alloc() -> HostAllocator {
        HostAllocator::new(DeviceBudget::from_mb(1))
    }

    fn buf(fd: i32) -> BufferDesc {
        BufferDesc {
            fd,
            len: 4096,
            roi: None,
        }
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut t = sim_if(io_task(1));
        assert_eq!(t.state(), IfState::Closed);
        t.open().unwrap();
        assert_eq!(t.state(), IfState::Open);
        t.configure().unwrap();
        assert_eq!(t.state(), IfState::Configured);
        t.stream_on().unwrap();
        assert_eq!(t.state(), IfState::Streaming);
        t.stream_off().unwrap();
        assert_eq!(t.state(), IfState::Configured);
        // Configured -> Streaming again is legal.
        t.stream_on().unwrap();
        t.close().unwrap();
        assert_eq!(t.state(), IfState::Closed);
    }

    #[test]
    fn test_wrong_state_rejected() {
        let mut t = sim_if(io_task(2));
        assert!(matches!(
            t.configure(),
            Err(RuntimeError::InvalidState {
                op: "configure",
                expected: "open",
                actual: "closed"
            })
        ));
        assert!(matches!(
            t.stream_on(),
            Err(RuntimeError::InvalidState { op: "stream_on", .. })
        ));
        assert!(matches!(
            t.put_buffers(0, &[buf(1)], &[buf(2)]),
            Err(RuntimeError::InvalidState { op: "put_buffers", .. })
        ));
        t.open().unwrap();
        assert!(matches!(
            t.open(),
            Err(RuntimeError::InvalidState { op: "open", .. })
        ));
    }

    #[test]
    fn test_close_is_reenterable() {
        let mut t = sim_if(io_task(3));
        t.close().unwrap();
        t.open().unwrap();
        t.configure().unwrap();
        t.close().unwrap();
        t.close().unwrap();
        // A closed interface can be brought up again.
        t.open().unwrap();
        assert_eq!(t.state(), IfState::Open);
    }

    #[test]
    fn test_alloc_binds_intermediate_once() {
        let alloc = host_alloc();
        let mut t = sim_if(chained_task(4));
        t.open().unwrap();
        t.configure().unwrap();

        t.alloc_inter_subchain_buf(&alloc).unwrap();
        assert_eq!(alloc.stats().total_allocations, 1);
        assert_eq!(alloc.in_use_bytes(), 64 * 64);
        let bound = t.task().external_mem(ExtMemId(1)).unwrap().slot.binding();
        assert!(bound.is_some());

        // Second call finds the slot bound and allocates nothing.
        t.alloc_inter_subchain_buf(&alloc).unwrap();
        assert_eq!(alloc.stats().total_allocations, 1);
        assert_eq!(
            t.task().external_mem(ExtMemId(1)).unwrap().slot.binding(),
            bound
        );

        // Dropping the interface releases its buffers.
        drop(t);
        assert_eq!(alloc.in_use_bytes(), 0);
    }

    #[test]
    fn test_alloc_requires_consumer() {
        let (mut building, _, _, _) = build_io(5, 1);
        let orphan = building
            .add_external_mem(ExternalMem::intermediate())
            .unwrap();
        let task = building.resolve_sizes().unwrap();

        let alloc = host_alloc();
        let mut t = sim_if(task);
        t.open().unwrap();
        t.configure().unwrap();
        assert!(matches!(
            t.alloc_inter_subchain_buf(&alloc),
            Err(RuntimeError::NoConsumer { ext }) if ext == orphan
        ));
    }

    #[test]
    fn test_put_get_roundtrip() {
        let mut t = sim_if(io_task(6));
        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();

        t.put_buffers(7, &[buf(10)], &[buf(11)]).unwrap();
        assert_eq!(t.frames_in_flight(), 1);
        let result = t.get_buffers().unwrap();
        assert_eq!(result.frame_id, 7);
        assert_eq!((result.in_index, result.out_index), (0, 0));
        assert!(result.timing.queued <= result.timing.done);
        assert_eq!(t.frames_in_flight(), 0);
    }

    #[test]
    fn test_selector_registry_reuses_tuples() {
        let mut t = sim_if(io_task(7));
        assert_eq!(t.find_io_index(Direction::In, &[buf(10)]), 0);
        assert_eq!(t.find_io_index(Direction::In, &[buf(10)]), 0);
        assert_eq!(t.find_io_index(Direction::In, &[buf(20)]), 1);
        // Directions keep separate registries.
        assert_eq!(t.find_io_index(Direction::Out, &[buf(20)]), 0);

        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();
        t.put_buffers(0, &[buf(20)], &[buf(30)]).unwrap();
        let result = t.get_buffers().unwrap();
        assert_eq!(result.in_index, 1);
        assert_eq!(result.out_index, 1);
    }

    #[test]
    fn test_buffer_count_checked() {
        let mut t = sim_if(io_task(8));
        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();
        assert!(matches!(
            t.put_buffers(0, &[buf(1), buf(2)], &[buf(3)]),
            Err(RuntimeError::BufferCount {
                direction: Direction::In,
                expected: 1,
                given: 2
            })
        ));
        assert!(matches!(
            t.put_buffers(0, &[buf(1)], &[]),
            Err(RuntimeError::BufferCount {
                direction: Direction::Out,
                ..
            })
        ));
    }

    #[test]
    fn test_unbound_intermediate_rejected() {
        let mut t = sim_if(chained_task(9));
        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();
        // alloc_inter_subchain_buf was skipped.
        assert!(matches!(
            t.put_buffers(0, &[buf(1)], &[buf(2)]),
            Err(RuntimeError::UnboundSlot { ext }) if ext == ExtMemId(1)
        ));
    }

    #[test]
    fn test_intermediates_ride_the_bunches() {
        let alloc = host_alloc();
        let mut t = sim_if(chained_task(10));
        t.open().unwrap();
        t.configure().unwrap();
        t.alloc_inter_subchain_buf(&alloc).unwrap();
        t.stream_on().unwrap();

        assert_eq!(t.io_plane_count(Direction::In), 1);
        assert_eq!(t.io_plane_count(Direction::Out), 1);
        t.put_buffers(0, &[buf(1)], &[buf(2)]).unwrap();
        let result = t.get_buffers().unwrap();
        assert_eq!(result.frame_id, 0);
    }

    #[test]
    fn test_stream_off_refused_with_pending_frame() {
        let mut t = sim_if(io_task(11));
        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();
        t.put_buffers(0, &[buf(1)], &[buf(2)]).unwrap();

        assert!(matches!(
            t.stream_off(),
            Err(RuntimeError::PendingFrames { frames: 1 })
        ));
        assert_eq!(t.state(), IfState::Streaming);

        t.get_buffers().unwrap();
        t.stream_off().unwrap();
    }

    #[test]
    fn test_close_reports_pending_but_still_closes() {
        let mut t = sim_if(io_task(12));
        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();
        t.put_buffers(0, &[buf(1)], &[buf(2)]).unwrap();

        assert!(matches!(
            t.close(),
            Err(RuntimeError::PendingFrames { frames: 1 })
        ));
        assert_eq!(t.state(), IfState::Closed);
    }

    #[test]
    fn test_get_without_put() {
        let mut t = sim_if(io_task(13));
        t.open().unwrap();
        t.configure().unwrap();
        t.stream_on().unwrap();
        assert!(matches!(
            t.get_buffers(),
            Err(RuntimeError::NoPendingFrame)
        ));
    }

    #[test]
    fn test_stage_param_validation() {
        let (mut building, process, sc, salb) = build_io(14, 1);
        let updatable = building.mark_updatable(process, sc, salb).unwrap();
        let task = building.resolve_sizes().unwrap();

        let sim = SimNode::new(4);
        let stats = sim.stats_handle();
        let mut t = TaskIf::new(task, Box::new(sim));

        assert!(matches!(
            t.stage_param(updatable, &[0u8; PU_PARAM_BYTES + 1]),
            Err(RuntimeError::ParamTooLarge { .. })
        ));
        assert!(matches!(
            t.stage_param(UpdatableId(9), &[0u8; 4]),
            Err(RuntimeError::UnknownUpdatable { .. })
        ));

        t.stage_param(updatable, &[0xCD; 8]).unwrap();
        assert!(stats.lock().unwrap().param_writes.is_empty());

        t.open().unwrap();
        t.configure().unwrap();
        t.apply_staged().unwrap();
        let writes = stats.lock().unwrap().param_writes.clone();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, vec![0xCD; 8]);
        // Applied parameters do not apply twice.
        t.apply_staged().unwrap();
        assert_eq!(stats.lock().unwrap().param_writes.len(), 1);
    }

    #[test]
    fn test_configure_rejects_unknown_pixel_size() {
        let task = build_io(15, 5).0.resolve_sizes().unwrap();
        let mut t = sim_if(task);
        t.open().unwrap();
        assert!(matches!(
            t.configure(),
            Err(RuntimeError::NoPixelFormat { pixel_bytes: 5, .. })
        ));
    }
}
