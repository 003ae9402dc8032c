// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The flat descriptor wire layout.
//!
//! Everything here is byte-exact firmware contract: element sizes, field
//! order, and the little-endian encoding are not renegotiable. The
//! descriptor is one contiguous buffer:
//!
//! ```text
//! ┌────────────┬──────────┬───────────┬───────┬──────────────┬───────────────┬─────────┐
//! │ header 40B │ vertices │ subchains │  PUs  │ 3DNN process │ invoke params │ trailer │
//! │            │  16B ea  │  48B ea   │ 84B ea│  bases 16B ea│    8B ea      │ "VXIO"  │
//! └────────────┴──────────┴───────────┴───────┴──────────────┴───────────────┴─────────┘
//! ```
//!
//! Section offsets in the header are running sums relative to the header
//! start; a zero-element section stores offset 0. `total_size` covers
//! everything except the 4-byte trailer.
//!
//! This module holds the raw fixed-layout records and their read/write
//! routines; [`crate::codec`] maps them to and from the object model.

/// Header size in bytes.
pub const HEADER_BYTES: usize = 40;
/// Vertex record size in bytes.
pub const VERTEX_BYTES: usize = 16;
/// Subchain record size in bytes.
pub const SUBCHAIN_BYTES: usize = 48;
/// PU record size in bytes.
pub const PU_BYTES: usize = 84;
/// 3DNN process-base record size in bytes.
pub const PROCESS_BASE_BYTES: usize = 16;
/// Invoke-param (updatable location) record size in bytes.
pub const INVOKE_PARAM_BYTES: usize = 8;
/// Inline CPU micro-op record size in bytes.
pub const CPU_OP_BYTES: usize = 8;
/// PU parameter payload size in bytes.
pub const PU_PARAM_BYTES: usize = 64;
/// Trailer magic marking the I/O-extension descriptor format.
pub const TRAILER_MAGIC: [u8; 4] = *b"VXIO";
/// Sentinel for "no reference" in u16 index fields.
pub const NONE_U16: u16 = 0xFFFF;

pub(crate) fn get_u16(buf: &[u8], ofs: usize) -> u16 {
    u16::from_le_bytes([buf[ofs], buf[ofs + 1]])
}

pub(crate) fn get_u32(buf: &[u8], ofs: usize) -> u32 {
    u32::from_le_bytes([buf[ofs], buf[ofs + 1], buf[ofs + 2], buf[ofs + 3]])
}

pub(crate) fn put_u16(buf: &mut [u8], ofs: usize, v: u16) {
    buf[ofs..ofs + 2].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_u32(buf: &mut [u8], ofs: usize, v: u32) {
    buf[ofs..ofs + 4].copy_from_slice(&v.to_le_bytes());
}

/// Raw descriptor header.
///
/// `read` expects at least [`HEADER_BYTES`] bytes; `write` fills exactly
/// that many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireHeader {
    pub id: u16,
    pub priority: u16,
    pub n_vertices: u16,
    pub n_subchains: u16,
    pub n_pus: u16,
    pub n_bases_3dnn: u16,
    pub n_invoke_params: u16,
    pub flags: u16,
    pub vertices_vec_ofs: u32,
    pub sc_vec_ofs: u32,
    pub pus_vec_ofs: u32,
    pub bases_3dnn_vec_ofs: u32,
    pub invoke_params_vec_ofs: u32,
    pub total_size: u32,
}

impl WireHeader {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= HEADER_BYTES);
        Self {
            id: get_u16(buf, 0),
            priority: get_u16(buf, 2),
            n_vertices: get_u16(buf, 4),
            n_subchains: get_u16(buf, 6),
            n_pus: get_u16(buf, 8),
            n_bases_3dnn: get_u16(buf, 10),
            n_invoke_params: get_u16(buf, 12),
            flags: get_u16(buf, 14),
            vertices_vec_ofs: get_u32(buf, 16),
            sc_vec_ofs: get_u32(buf, 20),
            pus_vec_ofs: get_u32(buf, 24),
            bases_3dnn_vec_ofs: get_u32(buf, 28),
            invoke_params_vec_ofs: get_u32(buf, 32),
            total_size: get_u32(buf, 36),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.id);
        put_u16(buf, 2, self.priority);
        put_u16(buf, 4, self.n_vertices);
        put_u16(buf, 6, self.n_subchains);
        put_u16(buf, 8, self.n_pus);
        put_u16(buf, 10, self.n_bases_3dnn);
        put_u16(buf, 12, self.n_invoke_params);
        put_u16(buf, 14, self.flags);
        put_u32(buf, 16, self.vertices_vec_ofs);
        put_u32(buf, 20, self.sc_vec_ofs);
        put_u32(buf, 24, self.pus_vec_ofs);
        put_u32(buf, 28, self.bases_3dnn_vec_ofs);
        put_u32(buf, 32, self.invoke_params_vec_ofs);
        put_u32(buf, 36, self.total_size);
    }
}

/// Raw vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireVertex {
    pub kind: u8,
    pub n_out_edges: u8,
    pub out_edges: [u16; 4],
    pub n_subchains: u16,
    pub first_subchain: u16,
    /// [`NONE_U16`] when the vertex owns no process base.
    pub process_base: u16,
}

impl WireVertex {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= VERTEX_BYTES);
        let mut out_edges = [0u16; 4];
        for (i, edge) in out_edges.iter_mut().enumerate() {
            *edge = get_u16(buf, 2 + i * 2);
        }
        Self {
            kind: buf[0],
            n_out_edges: buf[1],
            out_edges,
            n_subchains: get_u16(buf, 10),
            first_subchain: get_u16(buf, 12),
            process_base: get_u16(buf, 14),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        buf[0] = self.kind;
        buf[1] = self.n_out_edges;
        for (i, edge) in self.out_edges.iter().enumerate() {
            put_u16(buf, 2 + i * 2, *edge);
        }
        put_u16(buf, 10, self.n_subchains);
        put_u16(buf, 12, self.first_subchain);
        put_u16(buf, 14, self.process_base);
    }
}

/// Raw inline CPU micro-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireCpuOp {
    pub opcode: u8,
    /// [`NONE_U16`] when the op has no source operand.
    pub src_pu: u16,
    /// [`NONE_U16`] when the op has no destination operand.
    pub dst_pu: u16,
    pub imm: u16,
}

impl WireCpuOp {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= CPU_OP_BYTES);
        Self {
            opcode: buf[0],
            src_pu: get_u16(buf, 2),
            dst_pu: get_u16(buf, 4),
            imm: get_u16(buf, 6),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        buf[0] = self.opcode;
        put_u16(buf, 2, self.src_pu);
        put_u16(buf, 4, self.dst_pu);
        put_u16(buf, 6, self.imm);
    }
}

/// Raw subchain record. Up to four CPU micro-ops are stored inline; the
/// hardware-instance occupancy mask is derived state and never hits the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireSubchain {
    pub id: u32,
    pub kind: u8,
    pub n_cpu_ops: u8,
    pub n_pus: u16,
    pub first_pu: u16,
    pub cpu_ops: [WireCpuOp; 4],
}

impl WireSubchain {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= SUBCHAIN_BYTES);
        let mut cpu_ops = [WireCpuOp::default(); 4];
        for (i, op) in cpu_ops.iter_mut().enumerate() {
            *op = WireCpuOp::read(&buf[12 + i * CPU_OP_BYTES..]);
        }
        Self {
            id: get_u32(buf, 0),
            kind: buf[4],
            n_cpu_ops: buf[5],
            n_pus: get_u16(buf, 6),
            first_pu: get_u16(buf, 8),
            cpu_ops,
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.id);
        buf[4] = self.kind;
        buf[5] = self.n_cpu_ops;
        put_u16(buf, 6, self.n_pus);
        put_u16(buf, 8, self.first_pu);
        for (i, op) in self.cpu_ops.iter().enumerate() {
            op.write(&mut buf[12 + i * CPU_OP_BYTES..12 + (i + 1) * CPU_OP_BYTES]);
        }
    }
}

/// Raw input-port link inside a PU record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePortLink {
    /// Producer PU wire index; [`NONE_U16`] for an unbound port slot.
    pub producer: u16,
    pub out_port: u8,
}

impl Default for WirePortLink {
    fn default() -> Self {
        Self {
            producer: NONE_U16,
            out_port: 0,
        }
    }
}

/// Raw PU record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePu {
    pub kind: u8,
    pub instance: u8,
    pub n_in: u8,
    pub n_out: u8,
    pub in_ports: [WirePortLink; 4],
    pub params: [u8; PU_PARAM_BYTES],
}

impl WirePu {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= PU_BYTES);
        let mut in_ports = [WirePortLink::default(); 4];
        for (i, port) in in_ports.iter_mut().enumerate() {
            let ofs = 4 + i * 4;
            *port = WirePortLink {
                producer: get_u16(buf, ofs),
                out_port: buf[ofs + 2],
            };
        }
        let mut params = [0u8; PU_PARAM_BYTES];
        params.copy_from_slice(&buf[20..PU_BYTES]);
        Self {
            kind: buf[0],
            instance: buf[1],
            n_in: buf[2],
            n_out: buf[3],
            in_ports,
            params,
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        buf[0] = self.kind;
        buf[1] = self.instance;
        buf[2] = self.n_in;
        buf[3] = self.n_out;
        for (i, port) in self.in_ports.iter().enumerate() {
            let ofs = 4 + i * 4;
            put_u16(buf, ofs, port.producer);
            buf[ofs + 2] = port.out_port;
            buf[ofs + 3] = 0;
        }
        buf[20..PU_BYTES].copy_from_slice(&self.params);
    }
}

/// Raw 3DNN process-base record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireProcessBase {
    pub vertex: u16,
    pub n_layers: u16,
    pub in_width: u16,
    pub in_height: u16,
    pub base_ofs: u32,
}

impl WireProcessBase {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= PROCESS_BASE_BYTES);
        Self {
            vertex: get_u16(buf, 0),
            n_layers: get_u16(buf, 2),
            in_width: get_u16(buf, 4),
            in_height: get_u16(buf, 6),
            base_ofs: get_u32(buf, 8),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.vertex);
        put_u16(buf, 2, self.n_layers);
        put_u16(buf, 4, self.in_width);
        put_u16(buf, 6, self.in_height);
        put_u32(buf, 8, self.base_ofs);
    }
}

/// Raw invoke-param record: the wire location of one updatable PU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireInvokeParam {
    pub vertex: u16,
    pub subchain: u16,
    pub pu: u16,
}

impl WireInvokeParam {
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= INVOKE_PARAM_BYTES);
        Self {
            vertex: get_u16(buf, 0),
            subchain: get_u16(buf, 2),
            pu: get_u16(buf, 4),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.vertex);
        put_u16(buf, 2, self.subchain);
        put_u16(buf, 4, self.pu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let hdr = WireHeader {
            id: 7,
            priority: 1,
            n_vertices: 3,
            n_subchains: 1,
            n_pus: 3,
            n_bases_3dnn: 0,
            n_invoke_params: 0,
            flags: 0,
            vertices_vec_ofs: 40,
            sc_vec_ofs: 88,
            pus_vec_ofs: 136,
            bases_3dnn_vec_ofs: 0,
            invoke_params_vec_ofs: 0,
            total_size: 388,
        };
        let mut buf = [0u8; HEADER_BYTES];
        hdr.write(&mut buf);
        assert_eq!(WireHeader::read(&buf), hdr);
        // total_size sits in the last header word.
        assert_eq!(get_u32(&buf, 36), 388);
    }

    #[test]
    fn test_vertex_record_roundtrip() {
        let v = WireVertex {
            kind: 2,
            n_out_edges: 1,
            out_edges: [2, 0, 0, 0],
            n_subchains: 1,
            first_subchain: 0,
            process_base: NONE_U16,
        };
        let mut buf = [0u8; VERTEX_BYTES];
        v.write(&mut buf);
        assert_eq!(WireVertex::read(&buf), v);
    }

    #[test]
    fn test_subchain_record_roundtrip() {
        let sc = WireSubchain {
            id: 0x0007_0000,
            kind: 1,
            n_cpu_ops: 2,
            n_pus: 0,
            first_pu: 0,
            cpu_ops: [
                WireCpuOp {
                    opcode: 0,
                    src_pu: 1,
                    dst_pu: 2,
                    imm: 0,
                },
                WireCpuOp {
                    opcode: 3,
                    src_pu: NONE_U16,
                    dst_pu: NONE_U16,
                    imm: 5,
                },
                WireCpuOp::default(),
                WireCpuOp::default(),
            ],
        };
        let mut buf = [0u8; SUBCHAIN_BYTES];
        sc.write(&mut buf);
        assert_eq!(WireSubchain::read(&buf), sc);
    }

    #[test]
    fn test_pu_record_roundtrip() {
        let mut params = [0u8; PU_PARAM_BYTES];
        params[0] = 64;
        params[2] = 64;
        let pu = WirePu {
            kind: 2,
            instance: 0,
            n_in: 1,
            n_out: 1,
            in_ports: [
                WirePortLink {
                    producer: 0,
                    out_port: 0,
                },
                WirePortLink::default(),
                WirePortLink::default(),
                WirePortLink::default(),
            ],
            params,
        };
        let mut buf = [0u8; PU_BYTES];
        pu.write(&mut buf);
        assert_eq!(WirePu::read(&buf), pu);
    }

    #[test]
    fn test_element_sizes_add_up() {
        // Scenario: 3 vertices, 1 subchain, 3 PUs — the smallest runnable
        // pipeline.
        let total = HEADER_BYTES + 3 * VERTEX_BYTES + SUBCHAIN_BYTES + 3 * PU_BYTES;
        assert_eq!(total, 388);
    }
}
