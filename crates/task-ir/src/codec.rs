// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Descriptor codec: `Task<Resolved>` to and from the flat firmware buffer.
//!
//! Emission walks the graph in vertex-index order, then subchain-insertion
//! order, then PU-insertion order, so each vertex's subchains and each
//! subchain's PUs occupy contiguous wire ranges. Every cross-reference
//! (port links, CPU-op operands, DMA preload sources, updatable triples)
//! is remapped from arena indices to wire indices on the way out.
//!
//! Import is strict. The header's `total_size` is recomputed from the
//! counts and compared against the stored field before anything is
//! materialized; a mismatch signals version skew or corruption and fails
//! hard with no partial object graph. Offsets, kind tags, cross-reference
//! ranges, range contiguity, instance occupancy, and process-base
//! back-references are all verified. Decoding places entities in wire
//! order, so a decoded task re-serializes byte-identically.
//!
//! Memmaps, external-memory slots, and the size graph are not wire
//! sections; import reconstructs them from the DMA parameter payloads.

use std::marker::PhantomData;
use std::path::Path;

use size_graph::{Dimensions, SizeGraph};

use crate::descriptor::{
    put_u16, WireCpuOp, WireHeader, WireInvokeParam, WirePortLink, WireProcessBase, WirePu,
    WireSubchain, WireVertex, HEADER_BYTES, INVOKE_PARAM_BYTES, NONE_U16, PROCESS_BASE_BYTES,
    PU_BYTES, SUBCHAIN_BYTES, TRAILER_MAGIC, VERTEX_BYTES,
};
use crate::error::{CodecError, GraphError};
use crate::image::ImageDesc;
use crate::memmap::{ExtMemId, ExternalMem, Memmap, MemmapBacking, MemmapId};
use crate::pu::{DmaDataKind, PortLink, Pu, PuId, PuKind, PuParams, MAX_IN_PORTS};
use crate::subchain::{
    compose_global_id, CpuOp, CpuOpcode, Subchain, SubchainId, SubchainKind, MAX_CPU_OPS,
};
use crate::task::{Resolved, Task, UpdatableId, UpdatablePu};
use crate::vertex::{ProcessBase, ProcessBaseId, Vertex, VertexId, VertexKind, MAX_OUT_EDGES};

// ── Section layout ─────────────────────────────────────────────────

/// Canonical offsets computed as running sums over the fixed section
/// order. A zero-element section stores offset 0.
struct Layout {
    vertices_ofs: u32,
    sc_ofs: u32,
    pus_ofs: u32,
    bases_ofs: u32,
    invoke_ofs: u32,
    total: u32,
}

fn layout(
    n_vertices: usize,
    n_subchains: usize,
    n_pus: usize,
    n_bases: usize,
    n_invoke: usize,
) -> Layout {
    let mut running = HEADER_BYTES;
    let mut section = |count: usize, elem: usize| -> u32 {
        if count == 0 {
            0
        } else {
            let ofs = running;
            running += count * elem;
            ofs as u32
        }
    };
    let vertices_ofs = section(n_vertices, VERTEX_BYTES);
    let sc_ofs = section(n_subchains, SUBCHAIN_BYTES);
    let pus_ofs = section(n_pus, PU_BYTES);
    let bases_ofs = section(n_bases, PROCESS_BASE_BYTES);
    let invoke_ofs = section(n_invoke, INVOKE_PARAM_BYTES);
    Layout {
        vertices_ofs,
        sc_ofs,
        pus_ofs,
        bases_ofs,
        invoke_ofs,
        total: running as u32,
    }
}

/// Arena-to-wire index maps for subchains and PUs, in emission order.
/// Vertices, process bases, and updatables keep their arena order on the
/// wire, so they need no map.
pub(crate) struct WireMaps {
    pub(crate) sc_order: Vec<SubchainId>,
    pub(crate) pu_order: Vec<PuId>,
    pub(crate) sc_wire: Vec<u16>,
    pub(crate) pu_wire: Vec<u16>,
}

// ── Emission ───────────────────────────────────────────────────────

impl Task<Resolved> {
    pub(crate) fn wire_maps(&self) -> WireMaps {
        let mut maps = WireMaps {
            sc_order: Vec::with_capacity(self.subchains.len()),
            pu_order: Vec::with_capacity(self.pus.len()),
            sc_wire: vec![NONE_U16; self.subchains.len()],
            pu_wire: vec![NONE_U16; self.pus.len()],
        };
        for v in &self.vertices {
            for &sc in v.subchains() {
                maps.sc_wire[usize::from(sc.0)] = maps.sc_order.len() as u16;
                maps.sc_order.push(sc);
                for &pu in self.subchains[usize::from(sc.0)].pus() {
                    maps.pu_wire[usize::from(pu.0)] = maps.pu_order.len() as u16;
                    maps.pu_order.push(pu);
                }
            }
        }
        maps
    }

    /// Wire index of a PU — the id the device protocol addresses it by.
    pub fn wire_pu_index(&self, pu: PuId) -> Option<u16> {
        self.wire_maps()
            .pu_wire
            .get(usize::from(pu.0))
            .copied()
            .filter(|&w| w != NONE_U16)
    }

    /// Device target id of an updatable parameter location.
    pub fn wire_updatable_target(&self, id: UpdatableId) -> Option<u32> {
        let u = *self.updatable(id)?;
        self.wire_pu_index(u.pu).map(u32::from)
    }

    /// Serializes the task into one contiguous descriptor buffer,
    /// trailer included.
    ///
    /// Every entity validates its local constraints first; any failure
    /// aborts the whole serialization with that entity's diagnostic.
    pub fn to_descriptor(&self) -> Result<Vec<u8>, GraphError> {
        self.check_structure()?;
        let maps = self.wire_maps();
        let lay = layout(
            self.vertices.len(),
            self.subchains.len(),
            self.pus.len(),
            self.process_bases.len(),
            self.updatables.len(),
        );
        let mut buf = vec![0u8; lay.total as usize + TRAILER_MAGIC.len()];

        WireHeader {
            id: self.id,
            priority: self.priority,
            n_vertices: self.vertices.len() as u16,
            n_subchains: self.subchains.len() as u16,
            n_pus: self.pus.len() as u16,
            n_bases_3dnn: self.process_bases.len() as u16,
            n_invoke_params: self.updatables.len() as u16,
            flags: self.flags,
            vertices_vec_ofs: lay.vertices_ofs,
            sc_vec_ofs: lay.sc_ofs,
            pus_vec_ofs: lay.pus_ofs,
            bases_3dnn_vec_ofs: lay.bases_ofs,
            invoke_params_vec_ofs: lay.invoke_ofs,
            total_size: lay.total,
        }
        .write(&mut buf[..HEADER_BYTES]);

        for (i, v) in self.vertices.iter().enumerate() {
            let mut out_edges = [0u16; MAX_OUT_EDGES];
            for (slot, e) in out_edges.iter_mut().zip(v.out_edges()) {
                *slot = e.0;
            }
            let rec = WireVertex {
                kind: v.kind().wire_tag(),
                n_out_edges: v.out_edges().len() as u8,
                out_edges,
                n_subchains: v.subchains().len() as u16,
                first_subchain: v
                    .subchains()
                    .first()
                    .map_or(0, |sc| maps.sc_wire[usize::from(sc.0)]),
                process_base: v.process_base().map_or(NONE_U16, |b| b.0),
            };
            let ofs = lay.vertices_ofs as usize + i * VERTEX_BYTES;
            rec.write(&mut buf[ofs..ofs + VERTEX_BYTES]);
        }

        for (wire_idx, &sc_id) in maps.sc_order.iter().enumerate() {
            let sc = &self.subchains[usize::from(sc_id.0)];
            let mut cpu_ops = [WireCpuOp::default(); MAX_CPU_OPS];
            for (slot, op) in cpu_ops.iter_mut().zip(sc.cpu_ops()) {
                *slot = WireCpuOp {
                    opcode: op.opcode.wire_tag(),
                    src_pu: op
                        .src_pu
                        .map_or(NONE_U16, |p| maps.pu_wire[usize::from(p.0)]),
                    dst_pu: op
                        .dst_pu
                        .map_or(NONE_U16, |p| maps.pu_wire[usize::from(p.0)]),
                    imm: op.imm,
                };
            }
            let rec = WireSubchain {
                // Derived from the wire position, so a decoded descriptor
                // re-encodes with identical ids.
                id: compose_global_id(self.id, wire_idx as u16),
                kind: sc.kind().wire_tag(),
                n_cpu_ops: sc.cpu_ops().len() as u8,
                n_pus: sc.pus().len() as u16,
                first_pu: sc
                    .pus()
                    .first()
                    .map_or(0, |p| maps.pu_wire[usize::from(p.0)]),
                cpu_ops,
            };
            let ofs = lay.sc_ofs as usize + wire_idx * SUBCHAIN_BYTES;
            rec.write(&mut buf[ofs..ofs + SUBCHAIN_BYTES]);
        }

        for (wire_idx, &pu_id) in maps.pu_order.iter().enumerate() {
            let pu = &self.pus[usize::from(pu_id.0)];
            let mut in_ports = [WirePortLink::default(); MAX_IN_PORTS];
            for port in 0..pu.kind().in_ports() {
                if let Some(link) = pu.in_port(port) {
                    in_ports[usize::from(port)] = WirePortLink {
                        producer: maps.pu_wire[usize::from(link.producer.0)],
                        out_port: link.out_port,
                    };
                }
            }
            let mut params = pu.params.encode();
            if let PuParams::Dma(p) = &pu.params {
                // Preload references hold arena ids in memory; the wire
                // carries the emitted PU index.
                if let Some(pre) = p.preload_pu {
                    put_u16(&mut params, 16, maps.pu_wire[usize::from(pre)]);
                }
            }
            let rec = WirePu {
                kind: pu.kind().wire_tag(),
                instance: pu.instance(),
                n_in: pu.kind().in_ports(),
                n_out: pu.kind().out_ports(),
                in_ports,
                params,
            };
            let ofs = lay.pus_ofs as usize + wire_idx * PU_BYTES;
            rec.write(&mut buf[ofs..ofs + PU_BYTES]);
        }

        for (i, base) in self.process_bases.iter().enumerate() {
            let rec = WireProcessBase {
                vertex: base.vertex.0,
                n_layers: base.n_layers,
                in_width: base.in_width,
                in_height: base.in_height,
                base_ofs: base.base_ofs,
            };
            let ofs = lay.bases_ofs as usize + i * PROCESS_BASE_BYTES;
            rec.write(&mut buf[ofs..ofs + PROCESS_BASE_BYTES]);
        }

        for (i, u) in self.updatables.iter().enumerate() {
            let rec = WireInvokeParam {
                vertex: u.vertex.0,
                subchain: maps.sc_wire[usize::from(u.subchain.0)],
                pu: maps.pu_wire[usize::from(u.pu.0)],
            };
            let ofs = lay.invoke_ofs as usize + i * INVOKE_PARAM_BYTES;
            rec.write(&mut buf[ofs..ofs + INVOKE_PARAM_BYTES]);
        }

        buf[lay.total as usize..].copy_from_slice(&TRAILER_MAGIC);
        tracing::debug!(task = self.id, bytes = buf.len(), "descriptor serialized");
        Ok(buf)
    }

    fn check_structure(&self) -> Result<(), GraphError> {
        let starts = self
            .vertices
            .iter()
            .filter(|v| v.kind() == VertexKind::Start)
            .count();
        if starts != 1 {
            return Err(GraphError::StartVertexCount { found: starts });
        }
        if !self.vertices.iter().any(|v| v.kind() == VertexKind::End) {
            return Err(GraphError::MissingEndVertex);
        }
        for (i, v) in self.vertices.iter().enumerate() {
            v.check_constraint(VertexId(i as u16))?;
        }
        for (i, pu) in self.pus.iter().enumerate() {
            self.check_pu(PuId(i as u16), pu)?;
        }
        Ok(())
    }

    fn check_pu(&self, id: PuId, pu: &Pu) -> Result<(), GraphError> {
        if let Some(port) = pu.first_unconnected_port() {
            return Err(GraphError::UnconnectedPort {
                pu: id,
                kind: pu.kind(),
                instance: pu.instance(),
                port,
            });
        }
        if pu.kind().is_dma() {
            if pu.memmap().is_none() {
                return Err(GraphError::MissingMemmap {
                    pu: id,
                    kind: pu.kind(),
                });
            }
            for mm_id in pu.memmaps() {
                let mm = self
                    .memmap(mm_id)
                    .ok_or(GraphError::UnknownMemmap { memmap: mm_id })?;
                if !mm.image.is_complete() {
                    return Err(GraphError::IncompleteImage {
                        pu: id,
                        memmap: mm_id,
                        image: mm.image,
                    });
                }
            }
        }
        Ok(())
    }
}

// ── Import ─────────────────────────────────────────────────────────

fn invalid(entity: &'static str, index: usize, detail: String) -> CodecError {
    CodecError::Invalid {
        entity,
        index,
        detail,
    }
}

fn check_offset(section: &'static str, stored: u32, expected: u32) -> Result<(), CodecError> {
    if stored != expected {
        return Err(CodecError::SectionOffset {
            section,
            stored,
            expected,
        });
    }
    Ok(())
}

/// `Some(raw)` range-checked against `limit`, with [`NONE_U16`] as absent.
fn index_option(entity: &'static str, raw: u16, limit: usize) -> Result<Option<u16>, CodecError> {
    if raw == NONE_U16 {
        return Ok(None);
    }
    if usize::from(raw) >= limit {
        return Err(CodecError::IndexOutOfRange {
            entity,
            index: usize::from(raw),
            limit,
        });
    }
    Ok(Some(raw))
}

fn parse_header(buf: &[u8]) -> Result<(WireHeader, Layout), CodecError> {
    let floor = HEADER_BYTES + TRAILER_MAGIC.len();
    if buf.len() < floor {
        return Err(CodecError::Truncated {
            needed: floor,
            got: buf.len(),
        });
    }
    let hdr = WireHeader::read(buf);
    let lay = layout(
        usize::from(hdr.n_vertices),
        usize::from(hdr.n_subchains),
        usize::from(hdr.n_pus),
        usize::from(hdr.n_bases_3dnn),
        usize::from(hdr.n_invoke_params),
    );
    // Recompute before anything is materialized: a mismatch means version
    // skew or corruption and must not be guessed around.
    if lay.total != hdr.total_size {
        return Err(CodecError::TotalSizeMismatch {
            stored: hdr.total_size,
            computed: lay.total,
        });
    }
    let expected = lay.total as usize + TRAILER_MAGIC.len();
    if buf.len() != expected {
        return Err(CodecError::LengthMismatch {
            expected,
            got: buf.len(),
        });
    }
    let mut found = [0u8; 4];
    found.copy_from_slice(&buf[lay.total as usize..]);
    if found != TRAILER_MAGIC {
        return Err(CodecError::BadTrailer { found });
    }
    check_offset("vertices", hdr.vertices_vec_ofs, lay.vertices_ofs)?;
    check_offset("subchains", hdr.sc_vec_ofs, lay.sc_ofs)?;
    check_offset("pus", hdr.pus_vec_ofs, lay.pus_ofs)?;
    check_offset("process bases", hdr.bases_3dnn_vec_ofs, lay.bases_ofs)?;
    check_offset("invoke params", hdr.invoke_params_vec_ofs, lay.invoke_ofs)?;
    Ok((hdr, lay))
}

fn read_section<T>(
    buf: &[u8],
    ofs: u32,
    count: usize,
    elem: usize,
    read: impl Fn(&[u8]) -> T,
) -> Vec<T> {
    let ofs = ofs as usize;
    (0..count)
        .map(|i| read(&buf[ofs + i * elem..ofs + (i + 1) * elem]))
        .collect()
}

impl Task<Resolved> {
    /// Decodes a flat descriptor buffer back into an object task.
    ///
    /// Entities materialize in wire order, so the result re-serializes
    /// byte-identically. Derived state (predecessor lists, producer
    /// fan-out, occupancy masks, memmaps, external slots, and the size
    /// graph) is rebuilt rather than read.
    pub fn from_descriptor(buf: &[u8]) -> Result<Self, CodecError> {
        let (hdr, lay) = parse_header(buf)?;
        let nv = usize::from(hdr.n_vertices);
        let nsc = usize::from(hdr.n_subchains);
        let npu = usize::from(hdr.n_pus);
        let nb = usize::from(hdr.n_bases_3dnn);
        let ni = usize::from(hdr.n_invoke_params);

        let raw_vertices = read_section(buf, lay.vertices_ofs, nv, VERTEX_BYTES, WireVertex::read);
        let raw_subchains =
            read_section(buf, lay.sc_ofs, nsc, SUBCHAIN_BYTES, WireSubchain::read);
        let raw_pus = read_section(buf, lay.pus_ofs, npu, PU_BYTES, WirePu::read);
        let raw_bases = read_section(
            buf,
            lay.bases_ofs,
            nb,
            PROCESS_BASE_BYTES,
            WireProcessBase::read,
        );
        let raw_invokes = read_section(
            buf,
            lay.invoke_ofs,
            ni,
            INVOKE_PARAM_BYTES,
            WireInvokeParam::read,
        );

        let mut vertices = decode_vertices(&raw_vertices, nsc, nb)?;
        let mut subchains = decode_subchains(&raw_subchains, hdr.id, npu)?;
        let mut pus = decode_pus(&raw_pus)?;

        // Derived links: predecessors on vertices, fan-out on producers.
        for i in 0..vertices.len() {
            let outs = vertices[i].out_edges().to_vec();
            for to in outs {
                vertices[usize::from(to.0)].push_pred(VertexId(i as u16));
            }
        }
        for i in 0..pus.len() {
            let links: Vec<(u8, PortLink)> = (0..pus[i].kind().in_ports())
                .filter_map(|p| pus[i].in_port(p).map(|l| (p, l)))
                .collect();
            for (port, link) in links {
                pus[usize::from(link.producer.0)].record_fan_out(PuId(i as u16), port);
            }
        }

        // Occupancy recheck: one physical instance per burst.
        for (i, sc) in subchains.iter_mut().enumerate() {
            let owned = sc.pus().to_vec();
            for pu_id in owned {
                let pu = &pus[usize::from(pu_id.0)];
                if !sc.try_claim(pu.kind(), pu.instance()) {
                    return Err(invalid(
                        "subchain",
                        i,
                        format!("duplicate instance {}.{}", pu.kind(), pu.instance()),
                    ));
                }
            }
        }

        let (external_mems, memmaps, sizes) = rebuild_backing(&mut pus)?;

        let process_bases = decode_process_bases(&raw_bases, &vertices)?;
        for (vi, v) in vertices.iter().enumerate() {
            if let Some(b) = v.process_base() {
                if process_bases[usize::from(b.0)].vertex != VertexId(vi as u16) {
                    return Err(invalid(
                        "vertex",
                        vi,
                        format!("{b} does not reference it back"),
                    ));
                }
            }
        }

        // Kind-specific shape constraints, now that all links exist.
        let starts = vertices
            .iter()
            .filter(|v| v.kind() == VertexKind::Start)
            .count();
        if starts != 1 {
            return Err(invalid(
                "task",
                0,
                format!("expected exactly one start vertex, found {starts}"),
            ));
        }
        if !vertices.iter().any(|v| v.kind() == VertexKind::End) {
            return Err(invalid("task", 0, "no end vertex".into()));
        }
        for (i, v) in vertices.iter().enumerate() {
            v.check_constraint(VertexId(i as u16))
                .map_err(|e| invalid("vertex", i, e.to_string()))?;
        }

        let mut updatables = Vec::with_capacity(ni);
        for (i, raw) in raw_invokes.iter().enumerate() {
            let vertex = index_option("invoke-param vertex", raw.vertex, nv)?
                .ok_or_else(|| invalid("invoke param", i, "vertex is absent".into()))?;
            let subchain = index_option("invoke-param subchain", raw.subchain, nsc)?
                .ok_or_else(|| invalid("invoke param", i, "subchain is absent".into()))?;
            let pu = index_option("invoke-param pu", raw.pu, npu)?
                .ok_or_else(|| invalid("invoke param", i, "pu is absent".into()))?;
            let v = &vertices[usize::from(vertex)];
            let contained = v.subchains().contains(&SubchainId(subchain))
                && subchains[usize::from(subchain)].pus().contains(&PuId(pu));
            if !contained {
                return Err(invalid(
                    "invoke param",
                    i,
                    "triple is not a containment chain".into(),
                ));
            }
            updatables.push(UpdatablePu {
                vertex: VertexId(vertex),
                subchain: SubchainId(subchain),
                pu: PuId(pu),
            });
        }

        let task = Task::<Resolved> {
            id: hdr.id,
            priority: hdr.priority,
            flags: hdr.flags,
            vertices,
            subchains,
            pus,
            memmaps,
            external_mems,
            internal_rams: Vec::new(),
            process_bases,
            updatables,
            sizes,
            _phase: PhantomData,
        };
        tracing::debug!(task = task.id(), bytes = buf.len(), "descriptor decoded");
        Ok(task)
    }

    /// Memory-maps a descriptor file and decodes it.
    pub fn import(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        tracing::debug!(
            "descriptor import: mmap'd {} ({} bytes)",
            path.display(),
            mmap.len(),
        );
        Self::from_descriptor(&mmap)
    }
}

fn decode_vertices(
    raw_vertices: &[WireVertex],
    nsc: usize,
    nb: usize,
) -> Result<Vec<Vertex>, CodecError> {
    let nv = raw_vertices.len();
    let mut vertices = Vec::with_capacity(nv);
    let mut sc_cursor = 0usize;
    for (i, raw) in raw_vertices.iter().enumerate() {
        let kind = VertexKind::from_wire_tag(raw.kind).ok_or(CodecError::UnknownTag {
            entity: "vertex kind",
            tag: raw.kind,
        })?;
        if usize::from(raw.n_out_edges) > MAX_OUT_EDGES {
            return Err(invalid(
                "vertex",
                i,
                format!("{} out-edges exceed the limit of {MAX_OUT_EDGES}", raw.n_out_edges),
            ));
        }
        let mut v = Vertex::new(kind);
        for slot in 0..usize::from(raw.n_out_edges) {
            let to = raw.out_edges[slot];
            if usize::from(to) >= nv {
                return Err(CodecError::IndexOutOfRange {
                    entity: "vertex out-edge",
                    index: usize::from(to),
                    limit: nv,
                });
            }
            v.push_out_edge(VertexId(to));
        }
        let n_sub = usize::from(raw.n_subchains);
        if n_sub == 0 {
            if raw.first_subchain != 0 {
                return Err(invalid(
                    "vertex",
                    i,
                    format!("empty subchain range starts at {}", raw.first_subchain),
                ));
            }
        } else {
            if usize::from(raw.first_subchain) != sc_cursor {
                return Err(invalid(
                    "vertex",
                    i,
                    format!(
                        "subchain range starts at {}, expected {sc_cursor}",
                        raw.first_subchain
                    ),
                ));
            }
            sc_cursor += n_sub;
            if sc_cursor > nsc {
                return Err(CodecError::IndexOutOfRange {
                    entity: "subchain",
                    index: sc_cursor - 1,
                    limit: nsc,
                });
            }
            for s in 0..n_sub {
                v.push_subchain(SubchainId(raw.first_subchain + s as u16));
            }
        }
        if raw.process_base != NONE_U16 {
            if usize::from(raw.process_base) >= nb {
                return Err(CodecError::IndexOutOfRange {
                    entity: "process base",
                    index: usize::from(raw.process_base),
                    limit: nb,
                });
            }
            v.set_process_base(ProcessBaseId(raw.process_base));
        }
        vertices.push(v);
    }
    if sc_cursor != nsc {
        return Err(invalid(
            "subchain",
            sc_cursor,
            "unreferenced by any vertex".into(),
        ));
    }
    Ok(vertices)
}

fn decode_subchains(
    raw_subchains: &[WireSubchain],
    task_id: u16,
    npu: usize,
) -> Result<Vec<Subchain>, CodecError> {
    let nsc = raw_subchains.len();
    let mut subchains = Vec::with_capacity(nsc);
    let mut pu_cursor = 0usize;
    for (i, raw) in raw_subchains.iter().enumerate() {
        let kind = SubchainKind::from_wire_tag(raw.kind).ok_or(CodecError::UnknownTag {
            entity: "subchain kind",
            tag: raw.kind,
        })?;
        let expected_id = compose_global_id(task_id, i as u16);
        if raw.id != expected_id {
            return Err(invalid(
                "subchain",
                i,
                format!("global id {:#010x}, expected {expected_id:#010x}", raw.id),
            ));
        }
        let n_ops = usize::from(raw.n_cpu_ops);
        if n_ops > MAX_CPU_OPS {
            return Err(invalid(
                "subchain",
                i,
                format!("{n_ops} cpu ops exceed the limit of {MAX_CPU_OPS}"),
            ));
        }
        match kind {
            SubchainKind::Hw => {
                if n_ops != 0 {
                    return Err(invalid("subchain", i, "hardware subchain carries cpu ops".into()));
                }
                let mut sc = Subchain::hw(raw.id);
                let n_pus_local = usize::from(raw.n_pus);
                if n_pus_local == 0 {
                    if raw.first_pu != 0 {
                        return Err(invalid(
                            "subchain",
                            i,
                            format!("empty pu range starts at {}", raw.first_pu),
                        ));
                    }
                } else {
                    if usize::from(raw.first_pu) != pu_cursor {
                        return Err(invalid(
                            "subchain",
                            i,
                            format!("pu range starts at {}, expected {pu_cursor}", raw.first_pu),
                        ));
                    }
                    pu_cursor += n_pus_local;
                    if pu_cursor > npu {
                        return Err(CodecError::IndexOutOfRange {
                            entity: "pu",
                            index: pu_cursor - 1,
                            limit: npu,
                        });
                    }
                    for p in 0..n_pus_local {
                        sc.push_pu(PuId(raw.first_pu + p as u16));
                    }
                }
                subchains.push(sc);
            }
            SubchainKind::Cpu => {
                if raw.n_pus != 0 || raw.first_pu != 0 {
                    return Err(invalid("subchain", i, "cpu subchain owns pus".into()));
                }
                let mut sc = Subchain::cpu(raw.id);
                for op_raw in &raw.cpu_ops[..n_ops] {
                    let opcode =
                        CpuOpcode::from_wire_tag(op_raw.opcode).ok_or(CodecError::UnknownTag {
                            entity: "cpu opcode",
                            tag: op_raw.opcode,
                        })?;
                    let src = index_option("cpu-op source", op_raw.src_pu, npu)?;
                    let dst = index_option("cpu-op destination", op_raw.dst_pu, npu)?;
                    let pushed = sc.push_cpu_op(CpuOp {
                        opcode,
                        src_pu: src.map(PuId),
                        dst_pu: dst.map(PuId),
                        imm: op_raw.imm,
                    });
                    debug_assert!(pushed);
                }
                subchains.push(sc);
            }
        }
    }
    if pu_cursor != npu {
        return Err(invalid(
            "pu",
            pu_cursor,
            "unreferenced by any subchain".into(),
        ));
    }
    Ok(subchains)
}

fn decode_pus(raw_pus: &[WirePu]) -> Result<Vec<Pu>, CodecError> {
    let npu = raw_pus.len();
    let mut kinds = Vec::with_capacity(npu);
    for (i, raw) in raw_pus.iter().enumerate() {
        let kind = PuKind::from_wire_tag(raw.kind).ok_or(CodecError::UnknownTag {
            entity: "pu kind",
            tag: raw.kind,
        })?;
        if raw.instance >= kind.instance_budget() {
            return Err(invalid(
                "pu",
                i,
                format!(
                    "{kind} instance {} out of range (budget {})",
                    raw.instance,
                    kind.instance_budget()
                ),
            ));
        }
        if raw.n_in != kind.in_ports() || raw.n_out != kind.out_ports() {
            return Err(invalid(
                "pu",
                i,
                format!(
                    "port counts {}/{} do not match {kind} ({}/{})",
                    raw.n_in,
                    raw.n_out,
                    kind.in_ports(),
                    kind.out_ports()
                ),
            ));
        }
        kinds.push(kind);
    }

    let mut pus = Vec::with_capacity(npu);
    for (i, raw) in raw_pus.iter().enumerate() {
        let kind = kinds[i];
        let params = PuParams::decode(kind, &raw.params)?;
        let mut pu = Pu::new(kind, raw.instance, params, None);
        for port in 0..kind.in_ports() {
            let link = raw.in_ports[usize::from(port)];
            if link.producer == NONE_U16 {
                return Err(invalid(
                    "pu",
                    i,
                    format!("input port {port} is not connected"),
                ));
            }
            if usize::from(link.producer) >= npu {
                return Err(CodecError::IndexOutOfRange {
                    entity: "port producer",
                    index: usize::from(link.producer),
                    limit: npu,
                });
            }
            let producer_kind = kinds[usize::from(link.producer)];
            if link.out_port >= producer_kind.out_ports() {
                return Err(invalid(
                    "pu",
                    i,
                    format!(
                        "input port {port} names output {} beyond {producer_kind}'s {}",
                        link.out_port,
                        producer_kind.out_ports()
                    ),
                ));
            }
            pu.bind_in_port(
                PuId(i as u16),
                port,
                PortLink {
                    producer: PuId(link.producer),
                    out_port: link.out_port,
                },
            )
            .map_err(|e| invalid("pu", i, e.to_string()))?;
        }
        pus.push(pu);
    }
    Ok(pus)
}

/// Rebuilds external slots, memmaps, and the size graph from the DMA
/// parameter payloads; slots observed by several DMAs fold their boundary
/// flags together.
fn rebuild_backing(
    pus: &mut [Pu],
) -> Result<(Vec<ExternalMem>, Vec<Memmap>, SizeGraph), CodecError> {
    let npu = pus.len();
    let mut max_slot: Option<u16> = None;
    for pu in pus.iter() {
        if let PuParams::Dma(p) = &pu.params {
            if let Some(s) = p.ext_slot {
                max_slot = Some(max_slot.map_or(s, |m| m.max(s)));
            }
        }
    }
    let n_slots = max_slot.map_or(0, |m| usize::from(m) + 1);
    let mut io_flags = vec![false; n_slots];
    for pu in pus.iter() {
        if let PuParams::Dma(p) = &pu.params {
            if let Some(s) = p.ext_slot {
                io_flags[usize::from(s)] |= p.io;
            }
        }
    }
    let external_mems: Vec<ExternalMem> = io_flags
        .iter()
        .map(|&io| {
            if io {
                ExternalMem::io()
            } else {
                ExternalMem::intermediate()
            }
        })
        .collect();

    let mut memmaps: Vec<Memmap> = Vec::new();
    let mut sizes = SizeGraph::new();
    for i in 0..npu {
        let PuParams::Dma(p) = pus[i].params else {
            continue;
        };
        let backing = match (p.ext_slot, p.preload_pu) {
            (Some(s), _) => MemmapBacking::External(ExtMemId(s)),
            (None, Some(pre)) => {
                if usize::from(pre) >= npu {
                    return Err(CodecError::IndexOutOfRange {
                        entity: "preload source",
                        index: usize::from(pre),
                        limit: npu,
                    });
                }
                MemmapBacking::PreloadPu(PuId(pre))
            }
            (None, None) => {
                return Err(invalid("pu", i, "dma names no backing store".into()));
            }
        };
        let image = ImageDesc::with_line_ofs(p.width, p.height, p.pixel_bytes, p.line_ofs);
        let copies = if p.data_kind == DmaDataKind::PointList {
            usize::from(p.roi_count).max(1)
        } else {
            1
        };
        let base = MemmapId(memmaps.len() as u16);
        for _ in 0..copies {
            memmaps.push(Memmap { backing, image });
        }
        pus[i].set_memmap(base);

        // Input DMAs re-seed the size graph with their resolved origins.
        if pus[i].kind() == PuKind::DmaIn {
            let node = sizes
                .add_inout(None)
                .map_err(|e| invalid("pu", i, e.to_string()))?;
            sizes
                .set_origin(node, Dimensions::new(u32::from(p.width), u32::from(p.height)))
                .map_err(|e| invalid("pu", i, e.to_string()))?;
            pus[i].set_size_node(node);
        }
    }
    Ok((external_mems, memmaps, sizes))
}

fn decode_process_bases(
    raw_bases: &[WireProcessBase],
    vertices: &[Vertex],
) -> Result<Vec<ProcessBase>, CodecError> {
    let mut process_bases = Vec::with_capacity(raw_bases.len());
    for (i, raw) in raw_bases.iter().enumerate() {
        if usize::from(raw.vertex) >= vertices.len() {
            return Err(CodecError::IndexOutOfRange {
                entity: "process-base vertex",
                index: usize::from(raw.vertex),
                limit: vertices.len(),
            });
        }
        let owner = &vertices[usize::from(raw.vertex)];
        if owner.process_base() != Some(ProcessBaseId(i as u16)) {
            return Err(invalid(
                "process base",
                i,
                "owning vertex does not reference it back".into(),
            ));
        }
        process_bases.push(ProcessBase {
            vertex: VertexId(raw.vertex),
            n_layers: raw.n_layers,
            in_width: raw.in_width,
            in_height: raw.in_height,
            base_ofs: raw.base_ofs,
        });
    }
    Ok(process_bases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{get_u32, put_u32};
    use crate::task::Building;
    use std::io::Write;

    /// The smallest runnable pipeline: DmaIn -> Salb -> DmaOut under a
    /// single hardware subchain, 64x64 gray input.
    fn scenario_task() -> Task<Building> {
        let mut t = Task::new(7, 1);
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
                ImageDesc::new(64, 64, 1),
            )
            .unwrap();
        let out_map = t
            .add_memmap(
                MemmapBacking::External(out_mem),
                ImageDesc {
                    width: 0,
                    height: 0,
                    pixel_bytes: 1,
                    line_ofs: 0,
                },
            )
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
        t
    }

    fn scenario_bytes() -> Vec<u8> {
        scenario_task()
            .resolve_sizes()
            .unwrap()
            .to_descriptor()
            .unwrap()
    }

    #[test]
    fn test_header_offsets_are_running_sums() {
        let bytes = scenario_bytes();
        // 40 + 3*16 + 1*48 + 3*84 = 388, plus the 4-byte trailer.
        assert_eq!(bytes.len(), 392);

        let hdr = WireHeader::read(&bytes);
        assert_eq!(hdr.id, 7);
        assert_eq!(hdr.priority, 1);
        assert_eq!(
            (hdr.n_vertices, hdr.n_subchains, hdr.n_pus),
            (3, 1, 3)
        );
        assert_eq!(hdr.vertices_vec_ofs, 40);
        assert_eq!(
            hdr.sc_vec_ofs,
            hdr.vertices_vec_ofs + 3 * VERTEX_BYTES as u32
        );
        assert_eq!(hdr.pus_vec_ofs, hdr.sc_vec_ofs + SUBCHAIN_BYTES as u32);
        // Absent sections store the zero sentinel, never a dangling offset.
        assert_eq!(hdr.bases_3dnn_vec_ofs, 0);
        assert_eq!(hdr.invoke_params_vec_ofs, 0);
        assert_eq!(
            hdr.total_size,
            40 + 3 * 16 + 48 + 3 * 84
        );
        assert_eq!(&bytes[388..], b"VXIO");
    }

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let bytes = scenario_bytes();
        let decoded = Task::from_descriptor(&bytes).unwrap();
        assert_eq!(decoded.to_descriptor().unwrap(), bytes);
    }

    #[test]
    fn test_decode_rebuilds_structure() {
        let bytes = scenario_bytes();
        let t = Task::from_descriptor(&bytes).unwrap();

        assert_eq!(t.id(), 7);
        assert_eq!(t.vertices().len(), 3);
        assert_eq!(t.vertex(VertexId(0)).unwrap().kind(), VertexKind::Start);
        assert_eq!(t.vertex(VertexId(1)).unwrap().subchains(), &[SubchainId(0)]);
        // Predecessors are derived, not stored.
        assert_eq!(t.vertex(VertexId(2)).unwrap().predecessors(), &[VertexId(1)]);

        let sc = t.subchain(SubchainId(0)).unwrap();
        assert_eq!(sc.global_id(), 0x0007_0000);
        assert_eq!(sc.pus(), &[PuId(0), PuId(1), PuId(2)]);
        assert_ne!(sc.occupancy(), 0);

        let salb = t.pu(PuId(1)).unwrap();
        let link = salb.in_port(0).unwrap();
        assert_eq!((link.producer, link.out_port), (PuId(0), 0));
        // Fan-out is rebuilt on the producer side.
        assert_eq!(t.pu(PuId(0)).unwrap().fan_out(), &[(PuId(1), 0)]);

        // External slots and memmaps come back from the DMA payloads.
        assert_eq!(t.external_mems().len(), 2);
        assert!(t.external_mems().iter().all(ExternalMem::is_io));
        assert_eq!(t.memmaps().len(), 2);
        let in_map = t.memmap(t.pu(PuId(0)).unwrap().memmap().unwrap()).unwrap();
        assert_eq!(in_map.image, ImageDesc::new(64, 64, 1));
        assert_eq!(in_map.ext_mem(), Some(ExtMemId(0)));

        // The size graph is re-seeded from the input DMA's origin.
        let node = t.pu(PuId(0)).unwrap().size_node().unwrap();
        assert_eq!(t.sizes().origin(node), Some(Dimensions::new(64, 64)));
    }

    #[test]
    fn test_total_size_mismatch_fails_hard() {
        let mut bytes = scenario_bytes();
        let stored = get_u32(&bytes, 36);
        put_u32(&mut bytes, 36, stored + 4);
        let err = Task::from_descriptor(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::TotalSizeMismatch { .. }));
    }

    #[test]
    fn test_trailer_is_checked() {
        let mut bytes = scenario_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            Task::from_descriptor(&bytes),
            Err(CodecError::BadTrailer { .. })
        ));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let bytes = scenario_bytes();
        assert!(matches!(
            Task::from_descriptor(&bytes[..30]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_surplus_bytes_rejected() {
        let mut bytes = scenario_bytes();
        bytes.push(0);
        assert!(matches!(
            Task::from_descriptor(&bytes),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_pu_kind_tag_rejected() {
        let mut bytes = scenario_bytes();
        let hdr = WireHeader::read(&bytes);
        bytes[hdr.pus_vec_ofs as usize] = 200;
        assert!(matches!(
            Task::from_descriptor(&bytes),
            Err(CodecError::UnknownTag {
                entity: "pu kind",
                tag: 200,
            })
        ));
    }

    #[test]
    fn test_subchain_global_id_validated() {
        let mut bytes = scenario_bytes();
        let hdr = WireHeader::read(&bytes);
        // Stamp a foreign task id into the subchain's global id.
        let ofs = hdr.sc_vec_ofs as usize;
        bytes[ofs + 2] = 0x09;
        let err = Task::from_descriptor(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Invalid { entity: "subchain", .. }));
    }

    #[test]
    fn test_contiguity_validated() {
        let mut bytes = scenario_bytes();
        let hdr = WireHeader::read(&bytes);
        // Shift the process vertex's subchain range start from 0 to 1.
        let vertex1 = hdr.vertices_vec_ofs as usize + VERTEX_BYTES;
        put_u16(&mut bytes, vertex1 + 12, 1);
        let err = Task::from_descriptor(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Invalid { entity: "vertex", .. }));
    }

    #[test]
    fn test_unconnected_port_aborts_serialization() {
        let mut t = Task::new(3, 0);
        let start = t.add_vertex(VertexKind::Start).unwrap();
        let process = t.add_vertex(VertexKind::Process).unwrap();
        let end = t.add_vertex(VertexKind::End).unwrap();
        t.add_edge(start, process).unwrap();
        t.add_edge(process, end).unwrap();
        let sc = t.add_hw_subchain(process).unwrap();
        let mem = t.add_external_mem(ExternalMem::io()).unwrap();
        let mm = t
            .add_memmap(MemmapBacking::External(mem), ImageDesc::new(8, 8, 1))
            .unwrap();
        let root = t.sizes_mut().add_inout(None).unwrap();
        let dma_in = t
            .add_pu(sc, PuKind::DmaIn, 0, PuParams::default_for(PuKind::DmaIn), Some(root))
            .unwrap();
        t.set_memmap(dma_in, mm).unwrap();
        let salb = t
            .add_pu(sc, PuKind::Salb, 0, PuParams::default_for(PuKind::Salb), Some(root))
            .unwrap();
        // salb's input port is never connected.
        let err = t.resolve_sizes().unwrap().to_descriptor().unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnconnectedPort {
                pu,
                kind: PuKind::Salb,
                port: 0,
                ..
            } if pu == salb
        ));
    }

    #[test]
    fn test_exactly_one_start_enforced() {
        let mut t = Task::new(1, 0);
        t.add_vertex(VertexKind::Start).unwrap();
        t.add_vertex(VertexKind::Start).unwrap();
        t.add_vertex(VertexKind::End).unwrap();
        let err = t.resolve_sizes().unwrap().to_descriptor().unwrap_err();
        assert!(matches!(err, GraphError::StartVertexCount { found: 2 }));
    }

    #[test]
    fn test_end_vertex_required() {
        let mut t = Task::new(1, 0);
        t.add_vertex(VertexKind::Start).unwrap();
        let err = t.resolve_sizes().unwrap().to_descriptor().unwrap_err();
        assert!(matches!(err, GraphError::MissingEndVertex));
    }

    #[test]
    fn test_updatable_location_remaps_to_wire_indices() {
        let mut t = scenario_task();
        let process = VertexId(1);
        let sc = SubchainId(0);
        let salb = PuId(1);
        let updatable = t.mark_updatable(process, sc, salb).unwrap();
        let resolved = t.resolve_sizes().unwrap();
        assert_eq!(resolved.wire_pu_index(salb), Some(1));
        assert_eq!(resolved.wire_updatable_target(updatable), Some(1));

        let bytes = resolved.to_descriptor().unwrap();
        let hdr = WireHeader::read(&bytes);
        assert_eq!(hdr.n_invoke_params, 1);
        let raw = WireInvokeParam::read(&bytes[hdr.invoke_params_vec_ofs as usize..]);
        assert_eq!((raw.vertex, raw.subchain, raw.pu), (1, 0, 1));

        let decoded = Task::from_descriptor(&bytes).unwrap();
        assert_eq!(decoded.updatables()[0].pu, PuId(1));
        assert_eq!(decoded.to_descriptor().unwrap(), bytes);
    }

    #[test]
    fn test_point_list_dma_fans_out_roi_memmaps() {
        let mut t = Task::new(9, 0);
        let start = t.add_vertex(VertexKind::Start).unwrap();
        let process = t.add_vertex(VertexKind::Process).unwrap();
        let end = t.add_vertex(VertexKind::End).unwrap();
        t.add_edge(start, process).unwrap();
        t.add_edge(process, end).unwrap();
        let sc = t.add_hw_subchain(process).unwrap();

        let mem = t.add_external_mem(ExternalMem::io()).unwrap();
        let out_mem = t.add_external_mem(ExternalMem::io()).unwrap();
        // ROI slots occupy consecutive memmap ids after the base one.
        let image = ImageDesc::new(32, 4, 2);
        let roi_base = t
            .add_memmap(MemmapBacking::External(mem), image)
            .unwrap();
        t.add_memmap(MemmapBacking::External(mem), image).unwrap();
        t.add_memmap(MemmapBacking::External(mem), image).unwrap();
        let out_map = t
            .add_memmap(MemmapBacking::External(out_mem), image)
            .unwrap();

        let root = t.sizes_mut().add_inout(None).unwrap();
        let dp = crate::pu::DmaParams {
            data_kind: DmaDataKind::PointList,
            roi_count: 3,
            ..Default::default()
        };
        let dma_in = t
            .add_pu(sc, PuKind::DmaIn, 0, PuParams::Dma(dp), Some(root))
            .unwrap();
        t.set_memmap(dma_in, roi_base).unwrap();
        let out = t
            .add_pu(sc, PuKind::DmaOut, 0, PuParams::default_for(PuKind::DmaOut), Some(root))
            .unwrap();
        t.set_memmap(out, out_map).unwrap();
        t.connect(dma_in, 0, out, 0).unwrap();

        let resolved = t.resolve_sizes().unwrap();
        assert_eq!(
            resolved.pu(dma_in).unwrap().memmaps(),
            vec![MemmapId(0), MemmapId(1), MemmapId(2)]
        );

        let bytes = resolved.to_descriptor().unwrap();
        let decoded = Task::from_descriptor(&bytes).unwrap();
        // The decode side re-fans the ROI slots from the carried count.
        assert_eq!(decoded.pu(dma_in).unwrap().memmaps().len(), 3);
        assert_eq!(decoded.memmaps().len(), 4);
        assert_eq!(decoded.to_descriptor().unwrap(), bytes);
    }

    #[test]
    fn test_preload_backing_survives_roundtrip() {
        let mut t = Task::new(4, 0);
        let start = t.add_vertex(VertexKind::Start).unwrap();
        let process = t.add_vertex(VertexKind::Process).unwrap();
        let end = t.add_vertex(VertexKind::End).unwrap();
        t.add_edge(start, process).unwrap();
        t.add_edge(process, end).unwrap();
        let sc = t.add_hw_subchain(process).unwrap();

        let mem = t.add_external_mem(ExternalMem::io()).unwrap();
        let in_map = t
            .add_memmap(MemmapBacking::External(mem), ImageDesc::new(16, 16, 1))
            .unwrap();
        let root = t.sizes_mut().add_inout(None).unwrap();
        let dma_in = t
            .add_pu(sc, PuKind::DmaIn, 0, PuParams::default_for(PuKind::DmaIn), Some(root))
            .unwrap();
        t.set_memmap(dma_in, in_map).unwrap();
        let lut = t
            .add_pu(sc, PuKind::Lut, 0, PuParams::default_for(PuKind::Lut), Some(root))
            .unwrap();
        t.connect(dma_in, 0, lut, 0).unwrap();

        // A second input DMA streams the LUT's table out of its preloaded
        // constant region.
        let table_root = t.sizes_mut().add_inout(None).unwrap();
        let table_map = t
            .add_memmap(MemmapBacking::PreloadPu(lut), ImageDesc::new(256, 1, 1))
            .unwrap();
        let table_dma = t
            .add_pu(sc, PuKind::DmaIn, 1, PuParams::default_for(PuKind::DmaIn), Some(table_root))
            .unwrap();
        t.set_memmap(table_dma, table_map).unwrap();
        let sink_map = t
            .add_memmap(
                MemmapBacking::External(mem),
                ImageDesc::new(256, 1, 1),
            )
            .unwrap();
        let out = t
            .add_pu(sc, PuKind::DmaOut, 0, PuParams::default_for(PuKind::DmaOut), Some(table_root))
            .unwrap();
        t.set_memmap(out, sink_map).unwrap();
        t.connect(table_dma, 0, out, 0).unwrap();

        let bytes = t.resolve_sizes().unwrap().to_descriptor().unwrap();
        let decoded = Task::from_descriptor(&bytes).unwrap();
        let mm = decoded
            .memmap(decoded.pu(PuId(2)).unwrap().memmap().unwrap())
            .unwrap();
        // The preload reference decodes to the LUT's wire index.
        assert_eq!(mm.preload_pu(), Some(PuId(1)));
        assert_eq!(decoded.to_descriptor().unwrap(), bytes);
    }

    #[test]
    fn test_import_memmaps_file() {
        let bytes = scenario_bytes();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let t = Task::import(file.path()).unwrap();
        assert_eq!(t.id(), 7);
        assert_eq!(t.pus().len(), 3);
    }

    #[test]
    fn test_import_missing_file_is_io_error() {
        let err = Task::import("/nonexistent/task.desc").unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
