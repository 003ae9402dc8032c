// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The task container and its two-phase build protocol.
//!
//! # Type-State Pattern
//!
//! A task transitions through states enforced at compile time:
//!
//! ```text
//! Task<Building>   — graph under construction, payload geometry unresolved.
//!       │  .resolve_sizes()
//!       ▼
//! Task<Resolved>   — spread pass done, parameter payloads frozen,
//!                    ready for descriptor emission.
//! ```
//!
//! Serialization is only implemented on `Task<Resolved>`, so a descriptor
//! can never be emitted with unresolved geometry — the resolve step is
//! enforced by the type, not by call-order discipline. The transition
//! consumes the old state and returns the new one; the marker types are
//! `PhantomData` (ZST), so there is zero runtime cost.
//!
//! Every structural reference between entities is a typed index into one
//! of the task's arenas. The object graph and the flat descriptor are
//! index-isomorphic, which is what makes the codec in [`crate::codec`] a
//! mechanical walk.

use std::fmt;
use std::marker::PhantomData;

use size_graph::{SizeError, SizeGraph, SizeNodeId};

use crate::error::GraphError;
use crate::image::ImageDesc;
use crate::memmap::{ExtMemId, ExternalMem, InternalRam, Memmap, MemmapBacking, MemmapId, RamId};
use crate::pu::{PortLink, Pu, PuId, PuKind, PuParams};
use crate::subchain::{compose_global_id, CpuOp, Subchain, SubchainId, SubchainKind, MAX_CPU_OPS};
use crate::vertex::{ProcessBase, ProcessBaseId, Vertex, VertexId, VertexKind, MAX_OUT_EDGES};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: task graph is under construction.
#[derive(Debug)]
pub struct Building;

/// Marker: the spread pass has run and payload geometry is frozen.
#[derive(Debug)]
pub struct Resolved;

/// Trait for task build phases.
pub trait TaskPhase: fmt::Debug {}
impl TaskPhase for Building {}
impl TaskPhase for Resolved {}

// ── Updatable parameters ───────────────────────────────────────────

/// Index of an updatable-PU record in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UpdatableId(pub u16);

impl fmt::Display for UpdatableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "updatable#{}", self.0)
    }
}

/// A (vertex, subchain, pu) triple whose parameter payload the runtime may
/// patch between invocations without re-serializing the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatablePu {
    pub vertex: VertexId,
    pub subchain: SubchainId,
    pub pu: PuId,
}

// ── Task ───────────────────────────────────────────────────────────

/// The top-level task-graph container.
///
/// Owns every vertex, subchain, PU, memmap, memory slot, and RAM record of
/// one device task, plus the size graph their geometry derives from. The
/// generic parameter `P` encodes the build phase at compile time.
#[derive(Debug)]
pub struct Task<P: TaskPhase = Building> {
    pub(crate) id: u16,
    pub(crate) priority: u16,
    pub(crate) flags: u16,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) subchains: Vec<Subchain>,
    pub(crate) pus: Vec<Pu>,
    pub(crate) memmaps: Vec<Memmap>,
    pub(crate) external_mems: Vec<ExternalMem>,
    pub(crate) internal_rams: Vec<InternalRam>,
    pub(crate) process_bases: Vec<ProcessBase>,
    pub(crate) updatables: Vec<UpdatablePu>,
    pub(crate) sizes: SizeGraph,
    pub(crate) _phase: PhantomData<P>,
}

// Arena indices are u16 with 0xFFFF reserved as the wire sentinel.
fn ensure_capacity(len: usize, arena: &'static str) -> Result<(), GraphError> {
    if len >= usize::from(u16::MAX) {
        return Err(GraphError::ArenaFull { arena });
    }
    Ok(())
}

// ── Building state ─────────────────────────────────────────────────

impl Task<Building> {
    /// Creates an empty task in the `Building` state.
    pub fn new(id: u16, priority: u16) -> Self {
        Self {
            id,
            priority,
            flags: 0,
            vertices: Vec::new(),
            subchains: Vec::new(),
            pus: Vec::new(),
            memmaps: Vec::new(),
            external_mems: Vec::new(),
            internal_rams: Vec::new(),
            process_bases: Vec::new(),
            updatables: Vec::new(),
            sizes: SizeGraph::new(),
            _phase: PhantomData,
        }
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    /// Adds a control-flow vertex.
    pub fn add_vertex(&mut self, kind: VertexKind) -> Result<VertexId, GraphError> {
        ensure_capacity(self.vertices.len(), "vertices")?;
        let id = VertexId(self.vertices.len() as u16);
        self.vertices.push(Vertex::new(kind));
        Ok(id)
    }

    /// Adds a directed edge `from -> to` and records the reverse link on
    /// the successor.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId) -> Result<(), GraphError> {
        self.require_vertex(to)?;
        let v = self.require_vertex(from)?;
        if from == to {
            return Err(GraphError::SelfEdge { vertex: from });
        }
        if v.out_edges().contains(&to) {
            return Err(GraphError::DuplicateEdge { from, to });
        }
        if v.out_edges().len() >= MAX_OUT_EDGES {
            return Err(GraphError::TooManyEdges {
                vertex: from,
                limit: MAX_OUT_EDGES,
            });
        }
        self.vertices[usize::from(from.0)].push_out_edge(to);
        self.vertices[usize::from(to.0)].push_pred(from);
        Ok(())
    }

    /// Adds a hardware subchain under `vertex`.
    pub fn add_hw_subchain(&mut self, vertex: VertexId) -> Result<SubchainId, GraphError> {
        self.add_subchain(vertex, SubchainKind::Hw)
    }

    /// Adds a CPU (firmware micro-op) subchain under `vertex`.
    pub fn add_cpu_subchain(&mut self, vertex: VertexId) -> Result<SubchainId, GraphError> {
        self.add_subchain(vertex, SubchainKind::Cpu)
    }

    fn add_subchain(
        &mut self,
        vertex: VertexId,
        kind: SubchainKind,
    ) -> Result<SubchainId, GraphError> {
        self.require_vertex(vertex)?;
        ensure_capacity(self.subchains.len(), "subchains")?;
        let id = SubchainId(self.subchains.len() as u16);
        let global_id = compose_global_id(self.id, id.0);
        self.subchains.push(match kind {
            SubchainKind::Hw => Subchain::hw(global_id),
            SubchainKind::Cpu => Subchain::cpu(global_id),
        });
        self.vertices[usize::from(vertex.0)].push_subchain(id);
        Ok(id)
    }

    /// Appends a firmware micro-op to a CPU subchain. Operand PUs must
    /// already exist.
    pub fn add_cpu_op(&mut self, subchain: SubchainId, op: CpuOp) -> Result<(), GraphError> {
        if let Some(src) = op.src_pu {
            self.require_pu(src)?;
        }
        if let Some(dst) = op.dst_pu {
            self.require_pu(dst)?;
        }
        let sc = self
            .subchains
            .get_mut(usize::from(subchain.0))
            .ok_or(GraphError::UnknownSubchain { subchain })?;
        if sc.kind() != SubchainKind::Cpu {
            return Err(GraphError::WrongSubchainKind {
                subchain,
                expected: SubchainKind::Cpu,
            });
        }
        if !sc.push_cpu_op(op) {
            return Err(GraphError::TooManyCpuOps {
                subchain,
                limit: MAX_CPU_OPS,
            });
        }
        Ok(())
    }

    /// Registers an external memory slot.
    pub fn add_external_mem(&mut self, mem: ExternalMem) -> Result<ExtMemId, GraphError> {
        ensure_capacity(self.external_mems.len(), "external mems")?;
        let id = ExtMemId(self.external_mems.len() as u16);
        self.external_mems.push(mem);
        Ok(id)
    }

    /// Records an internal-RAM bank reservation.
    pub fn add_internal_ram(&mut self, ram: InternalRam) -> Result<RamId, GraphError> {
        ensure_capacity(self.internal_rams.len(), "internal rams")?;
        let id = RamId(self.internal_rams.len() as u16);
        self.internal_rams.push(ram);
        Ok(id)
    }

    /// Adds a memmap over the given backing store.
    pub fn add_memmap(
        &mut self,
        backing: MemmapBacking,
        image: ImageDesc,
    ) -> Result<MemmapId, GraphError> {
        match backing {
            MemmapBacking::External(ext) => {
                if self.external_mems.get(usize::from(ext.0)).is_none() {
                    return Err(GraphError::UnknownExternalMem { ext });
                }
            }
            MemmapBacking::PreloadPu(pu) => {
                self.require_pu(pu)?;
            }
        }
        ensure_capacity(self.memmaps.len(), "memmaps")?;
        let id = MemmapId(self.memmaps.len() as u16);
        self.memmaps.push(Memmap { backing, image });
        Ok(id)
    }

    /// Adds a PU to a hardware subchain.
    ///
    /// Rejects an `instance` beyond the kind's physical budget, a payload
    /// variant that does not belong to `kind`, and a `(kind, instance)`
    /// pair already present in the subchain (O(1) via the occupancy mask).
    pub fn add_pu(
        &mut self,
        subchain: SubchainId,
        kind: PuKind,
        instance: u8,
        params: PuParams,
        size_node: Option<SizeNodeId>,
    ) -> Result<PuId, GraphError> {
        let sc = self
            .subchains
            .get(usize::from(subchain.0))
            .ok_or(GraphError::UnknownSubchain { subchain })?;
        if sc.kind() != SubchainKind::Hw {
            return Err(GraphError::WrongSubchainKind {
                subchain,
                expected: SubchainKind::Hw,
            });
        }
        if instance >= kind.instance_budget() {
            return Err(GraphError::InstanceOutOfRange {
                kind,
                instance,
                budget: kind.instance_budget(),
            });
        }
        if !params.matches_kind(kind) {
            return Err(GraphError::ParamsKindMismatch {
                kind,
                params: params.variant_name(),
            });
        }
        if let Some(node) = size_node {
            if self.sizes.node(node).is_none() {
                return Err(GraphError::UnknownSizeNode { node });
            }
        }
        ensure_capacity(self.pus.len(), "pus")?;
        // The occupancy claim is the only mutation among the checks, so it
        // goes last and the failed call leaves the task untouched.
        if !self.subchains[usize::from(subchain.0)].try_claim(kind, instance) {
            return Err(GraphError::DuplicateInstance {
                subchain,
                kind,
                instance,
            });
        }
        let id = PuId(self.pus.len() as u16);
        self.pus.push(Pu::new(kind, instance, params, size_node));
        self.subchains[usize::from(subchain.0)].push_pu(id);
        Ok(id)
    }

    /// Attaches a memmap to a DMA-kind PU.
    pub fn set_memmap(&mut self, pu: PuId, memmap: MemmapId) -> Result<(), GraphError> {
        if self.memmaps.get(usize::from(memmap.0)).is_none() {
            return Err(GraphError::UnknownMemmap { memmap });
        }
        let p = self.require_pu(pu)?;
        if !p.kind().is_dma() {
            return Err(GraphError::MemmapOnNonDma {
                pu,
                kind: p.kind(),
            });
        }
        self.pus[usize::from(pu.0)].set_memmap(memmap);
        Ok(())
    }

    /// Binds `producer`'s output port to `consumer`'s input port.
    ///
    /// Exactly one edge per input port: reconnecting a bound port fails
    /// with [`GraphError::PortAlreadyConnected`] and leaves the port state
    /// untouched. The producer side records the fan-out.
    pub fn connect(
        &mut self,
        producer: PuId,
        out_port: u8,
        consumer: PuId,
        in_port: u8,
    ) -> Result<(), GraphError> {
        let producer_kind = self.require_pu(producer)?.kind();
        self.require_pu(consumer)?;
        if out_port >= producer_kind.out_ports() {
            return Err(GraphError::PortOutOfRange {
                pu: producer,
                port: out_port,
                limit: producer_kind.out_ports(),
            });
        }
        self.pus[usize::from(consumer.0)].bind_in_port(
            consumer,
            in_port,
            PortLink {
                producer,
                out_port,
            },
        )?;
        self.pus[usize::from(producer.0)].record_fan_out(consumer, in_port);
        Ok(())
    }

    /// Marks a PU's parameter payload as runtime-patchable.
    ///
    /// The triple must be a containment chain: `subchain` owned by
    /// `vertex`, `pu` inside `subchain`.
    pub fn mark_updatable(
        &mut self,
        vertex: VertexId,
        subchain: SubchainId,
        pu: PuId,
    ) -> Result<UpdatableId, GraphError> {
        let v = self.require_vertex(vertex)?;
        let owned = v.subchains().contains(&subchain);
        let sc = self
            .subchains
            .get(usize::from(subchain.0))
            .ok_or(GraphError::UnknownSubchain { subchain })?;
        self.require_pu(pu)?;
        if !owned || !sc.pus().contains(&pu) {
            return Err(GraphError::UpdatableMismatch {
                vertex,
                subchain,
                pu,
            });
        }
        ensure_capacity(self.updatables.len(), "updatables")?;
        let id = UpdatableId(self.updatables.len() as u16);
        self.updatables.push(UpdatablePu {
            vertex,
            subchain,
            pu,
        });
        Ok(id)
    }

    /// Assigns the layer-table record of a tensor-process vertex.
    pub fn set_process_base(
        &mut self,
        vertex: VertexId,
        n_layers: u16,
        in_width: u16,
        in_height: u16,
        base_ofs: u32,
    ) -> Result<ProcessBaseId, GraphError> {
        let v = self.require_vertex(vertex)?;
        if v.kind() != VertexKind::TensorProcess {
            return Err(GraphError::WrongVertexKind {
                vertex,
                expected: VertexKind::TensorProcess,
                found: v.kind(),
            });
        }
        if v.process_base().is_some() {
            return Err(GraphError::VertexConstraint {
                vertex,
                kind: v.kind(),
                detail: "process base already assigned".into(),
            });
        }
        ensure_capacity(self.process_bases.len(), "process bases")?;
        let id = ProcessBaseId(self.process_bases.len() as u16);
        self.process_bases.push(ProcessBase {
            vertex,
            n_layers,
            in_width,
            in_height,
            base_ofs,
        });
        self.vertices[usize::from(vertex.0)].set_process_base(id);
        Ok(id)
    }

    /// Mutable access to the size graph, for declaring transform nodes
    /// during construction.
    pub fn sizes_mut(&mut self) -> &mut SizeGraph {
        &mut self.sizes
    }

    /// Mutable access to a PU; only the building phase may edit payloads
    /// directly.
    pub fn pu_mut(&mut self, pu: PuId) -> Option<&mut Pu> {
        self.pus.get_mut(usize::from(pu.0))
    }

    /// Runs the spread pass and transitions to the `Resolved` state.
    ///
    /// Walks PUs in vertex-index order, then subchain-insertion order,
    /// then PU-insertion order, pulling concrete dimensions out of the
    /// size graph and freezing them into each PU's parameter payload.
    /// CPU subchains are a no-op. Any failure names the offending PU.
    pub fn resolve_sizes(mut self) -> Result<Task<Resolved>, GraphError> {
        let order = self.spread_order();
        for pu_id in order {
            let pu = &mut self.pus[usize::from(pu_id.0)];
            resolve_pu(
                pu,
                pu_id,
                &mut self.sizes,
                &mut self.memmaps,
                &self.external_mems,
            )?;
        }
        tracing::debug!(
            task = self.id,
            pus = self.pus.len(),
            "size spread complete"
        );
        Ok(Task {
            id: self.id,
            priority: self.priority,
            flags: self.flags,
            vertices: self.vertices,
            subchains: self.subchains,
            pus: self.pus,
            memmaps: self.memmaps,
            external_mems: self.external_mems,
            internal_rams: self.internal_rams,
            process_bases: self.process_bases,
            updatables: self.updatables,
            sizes: self.sizes,
            _phase: PhantomData,
        })
    }

    /// PUs in spread/emission order: vertex index, then each vertex's
    /// subchains in insertion order, then each subchain's PUs in insertion
    /// order.
    pub(crate) fn spread_order(&self) -> Vec<PuId> {
        let mut order = Vec::with_capacity(self.pus.len());
        for v in &self.vertices {
            for &sc in v.subchains() {
                order.extend_from_slice(self.subchains[usize::from(sc.0)].pus());
            }
        }
        order
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<P: TaskPhase> Task<P> {
    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(usize::from(id.0))
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn subchain(&self, id: SubchainId) -> Option<&Subchain> {
        self.subchains.get(usize::from(id.0))
    }

    pub fn subchains(&self) -> &[Subchain] {
        &self.subchains
    }

    pub fn pu(&self, id: PuId) -> Option<&Pu> {
        self.pus.get(usize::from(id.0))
    }

    pub fn pus(&self) -> &[Pu] {
        &self.pus
    }

    pub fn memmap(&self, id: MemmapId) -> Option<&Memmap> {
        self.memmaps.get(usize::from(id.0))
    }

    pub fn memmaps(&self) -> &[Memmap] {
        &self.memmaps
    }

    pub fn external_mem(&self, id: ExtMemId) -> Option<&ExternalMem> {
        self.external_mems.get(usize::from(id.0))
    }

    /// Mutable slot access. Buffer binding is runtime state, not graph
    /// structure, so it stays available after the resolve transition.
    pub fn external_mem_mut(&mut self, id: ExtMemId) -> Option<&mut ExternalMem> {
        self.external_mems.get_mut(usize::from(id.0))
    }

    pub fn external_mems(&self) -> &[ExternalMem] {
        &self.external_mems
    }

    pub fn internal_rams(&self) -> &[InternalRam] {
        &self.internal_rams
    }

    pub fn process_base(&self, id: ProcessBaseId) -> Option<&ProcessBase> {
        self.process_bases.get(usize::from(id.0))
    }

    pub fn process_bases(&self) -> &[ProcessBase] {
        &self.process_bases
    }

    pub fn updatable(&self, id: UpdatableId) -> Option<&UpdatablePu> {
        self.updatables.get(usize::from(id.0))
    }

    pub fn updatables(&self) -> &[UpdatablePu] {
        &self.updatables
    }

    pub fn sizes(&self) -> &SizeGraph {
        &self.sizes
    }

    fn require_vertex(&self, vertex: VertexId) -> Result<&Vertex, GraphError> {
        self.vertices
            .get(usize::from(vertex.0))
            .ok_or(GraphError::UnknownVertex { vertex })
    }

    fn require_pu(&self, pu: PuId) -> Result<&Pu, GraphError> {
        self.pus
            .get(usize::from(pu.0))
            .ok_or(GraphError::UnknownPu { pu })
    }

    /// Returns a one-line summary describing the task.
    pub fn summary(&self) -> String {
        format!(
            "task {} (priority {}): {} vertices, {} subchains, {} pus, {} memmaps, {} updatable(s)",
            self.id,
            self.priority,
            self.vertices.len(),
            self.subchains.len(),
            self.pus.len(),
            self.memmaps.len(),
            self.updatables.len(),
        )
    }
}

impl<P: TaskPhase> fmt::Display for Task<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for (i, v) in self.vertices.iter().enumerate() {
            writeln!(f, "  {} {}", VertexId(i as u16), v.summary())?;
            for &sc in v.subchains() {
                let subchain = &self.subchains[usize::from(sc.0)];
                writeln!(f, "    {} {}", sc, subchain.summary())?;
                for &pu in subchain.pus() {
                    writeln!(f, "      {} {}", pu, self.pus[usize::from(pu.0)].summary())?;
                }
            }
        }
        Ok(())
    }
}

// ── Spread pass ────────────────────────────────────────────────────

/// Narrows a resolved dimension into the 16-bit register range.
fn wire_dim(pu: PuId, value: u32) -> Result<u16, GraphError> {
    u16::try_from(value).map_err(|_| GraphError::GeometryTooLarge { pu, value })
}

fn require_node(pu: &Pu, pu_id: PuId) -> Result<SizeNodeId, GraphError> {
    pu.size_node().ok_or(GraphError::MissingSizeNode {
        pu: pu_id,
        kind: pu.kind(),
        instance: pu.instance(),
    })
}

fn node_kind_name(sizes: &SizeGraph, node: SizeNodeId) -> &'static str {
    sizes.node(node).map_or("missing", |n| n.kind_name())
}

/// The per-kind resolve hook: pulls resolved dimensions out of the size
/// graph and writes them into the PU's hardware parameter payload.
fn resolve_pu(
    pu: &mut Pu,
    pu_id: PuId,
    sizes: &mut SizeGraph,
    memmaps: &mut [Memmap],
    external_mems: &[ExternalMem],
) -> Result<(), GraphError> {
    let kind = pu.kind();
    let size_err = |source: SizeError| GraphError::SizeResolve {
        pu: pu_id,
        source,
    };

    match kind {
        PuKind::DmaIn => {
            // The input DMA is where concrete geometry enters the task:
            // its memmap must already be fully described, and it supplies
            // the origin of its root size node.
            let mm_id = pu
                .memmap()
                .ok_or(GraphError::MissingMemmap { pu: pu_id, kind })?;
            let mm = *memmaps
                .get(usize::from(mm_id.0))
                .ok_or(GraphError::UnknownMemmap { memmap: mm_id })?;
            if !mm.image.is_complete() {
                return Err(GraphError::IncompleteImage {
                    pu: pu_id,
                    memmap: mm_id,
                    image: mm.image,
                });
            }
            let node = require_node(pu, pu_id)?;
            if !sizes.is_root(node) {
                return Err(GraphError::WrongSizeNode {
                    pu: pu_id,
                    node,
                    expected: "root inout",
                    found: node_kind_name(sizes, node),
                });
            }
            let dims = size_graph::Dimensions::new(
                u32::from(mm.image.width),
                u32::from(mm.image.height),
            );
            // Identical resupply is fine; a conflicting one is fatal.
            sizes.set_origin(node, dims).map_err(size_err)?;
            let io = slot_is_io(&mm, external_mems);
            freeze_dma(pu, mm, io);
        }
        PuKind::DmaOut => {
            // The output DMA writes resolved geometry back into its memmap
            // (filling fields the builder left at zero) and its payload.
            let node = require_node(pu, pu_id)?;
            let dims = sizes.dimension(node).map_err(size_err)?.effective();
            let width = wire_dim(pu_id, dims.width)?;
            let height = wire_dim(pu_id, dims.height)?;
            let mm_id = pu
                .memmap()
                .ok_or(GraphError::MissingMemmap { pu: pu_id, kind })?;
            let mm = memmaps
                .get_mut(usize::from(mm_id.0))
                .ok_or(GraphError::UnknownMemmap { memmap: mm_id })?;
            mm.image.fill_missing(width, height);
            let mm = *mm;
            let io = slot_is_io(&mm, external_mems);
            freeze_dma(pu, mm, io);
        }
        PuKind::Upscaler | PuKind::Downscaler => {
            let node = require_node(pu, pu_id)?;
            let Some(scaler) = sizes.scaler_of(node).copied() else {
                return Err(GraphError::WrongSizeNode {
                    pu: pu_id,
                    node,
                    expected: "scale",
                    found: node_kind_name(sizes, node),
                });
            };
            let in_dims = sizes.parent_dimension(node).map_err(size_err)?;
            let out_dims = sizes.dimension(node).map_err(size_err)?;
            if let PuParams::Scaler(p) = &mut pu.params {
                p.in_width = wire_dim(pu_id, in_dims.width)?;
                p.in_height = wire_dim(pu_id, in_dims.height)?;
                p.out_width = wire_dim(pu_id, out_dims.width)?;
                p.out_height = wire_dim(pu_id, out_dims.height)?;
                p.w_num = scaler.w_num;
                p.w_den = scaler.w_den;
                p.h_num = scaler.h_num;
                p.h_den = scaler.h_den;
            }
        }
        PuKind::Crop => {
            let node = require_node(pu, pu_id)?;
            let Some(cropper) = sizes.cropper_of(node).copied() else {
                return Err(GraphError::WrongSizeNode {
                    pu: pu_id,
                    node,
                    expected: "crop",
                    found: node_kind_name(sizes, node),
                });
            };
            let in_dims = sizes.parent_dimension(node).map_err(size_err)?;
            let out_dims = sizes.dimension(node).map_err(size_err)?;
            if let PuParams::Crop(p) = &mut pu.params {
                p.in_width = wire_dim(pu_id, in_dims.width)?;
                p.in_height = wire_dim(pu_id, in_dims.height)?;
                p.out_width = wire_dim(pu_id, out_dims.width)?;
                p.out_height = wire_dim(pu_id, out_dims.height)?;
                p.left = wire_dim(pu_id, cropper.left)?;
                p.right = wire_dim(pu_id, cropper.right)?;
                p.top = wire_dim(pu_id, cropper.top)?;
                p.bottom = wire_dim(pu_id, cropper.bottom)?;
            }
        }
        _ => {
            // Every remaining image-bearing kind just receives its resolved
            // effective input size; FIFOs carry no geometry at all.
            if !kind.demands_size_node() {
                return Ok(());
            }
            let node = require_node(pu, pu_id)?;
            let dims = sizes.dimension(node).map_err(size_err)?.effective();
            let width = wire_dim(pu_id, dims.width)?;
            let height = wire_dim(pu_id, dims.height)?;
            pu.params.set_input_size(width, height);
        }
    }
    Ok(())
}

fn slot_is_io(mm: &Memmap, external_mems: &[ExternalMem]) -> bool {
    mm.ext_mem()
        .and_then(|ext| external_mems.get(usize::from(ext.0)))
        .is_some_and(ExternalMem::is_io)
}

fn freeze_dma(pu: &mut Pu, mm: Memmap, io: bool) {
    if let PuParams::Dma(p) = &mut pu.params {
        p.width = mm.image.width;
        p.height = mm.image.height;
        p.pixel_bytes = mm.image.pixel_bytes;
        p.line_ofs = mm.image.line_ofs;
        p.io = io;
        p.ext_slot = mm.ext_mem().map(|e| e.0);
        p.preload_pu = mm.preload_pu().map(|p| p.0);
    }
}
