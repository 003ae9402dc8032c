// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subchains: burst-atomic groups of PUs, or firmware micro-op sequences.
//!
//! A hardware subchain executes its PUs as one device burst, so each
//! physical block instance can appear at most once per subchain — tracked
//! in O(1) by a 64-bit occupancy mask over the task-wide instance
//! numbering (see [`PuKind::instance_base`]). A CPU subchain holds up to
//! [`MAX_CPU_OPS`] firmware micro-ops that shuffle results between bursts.

use crate::pu::{PuId, PuKind};
use std::fmt;

/// Index of a subchain in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SubchainId(pub u16);

impl fmt::Display for SubchainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subchain#{}", self.0)
    }
}

/// A CPU subchain holds at most this many micro-ops (the descriptor stores
/// them inline).
pub const MAX_CPU_OPS: usize = 4;

/// Firmware micro-operations executed between hardware bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuOpcode {
    /// Copy a PU's result register into another PU's operand slot.
    CopyResult,
    /// Accumulate a PU's result into the running accumulator.
    AccumResult,
    /// Compare a PU's result against the immediate; sets the loop predicate.
    CompareThreshold,
    /// Jump back to the subchain start while the predicate holds.
    LoopEnd,
}

impl CpuOpcode {
    pub fn wire_tag(&self) -> u8 {
        *self as u8
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CpuOpcode::CopyResult),
            1 => Some(CpuOpcode::AccumResult),
            2 => Some(CpuOpcode::CompareThreshold),
            3 => Some(CpuOpcode::LoopEnd),
            _ => None,
        }
    }
}

/// One firmware micro-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CpuOp {
    pub opcode: CpuOpcode,
    pub src_pu: Option<PuId>,
    pub dst_pu: Option<PuId>,
    pub imm: u16,
}

/// The two subchain flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubchainKind {
    Hw,
    Cpu,
}

impl SubchainKind {
    pub fn wire_tag(&self) -> u8 {
        *self as u8
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SubchainKind::Hw),
            1 => Some(SubchainKind::Cpu),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubchainKind::Hw => "hw",
            SubchainKind::Cpu => "cpu",
        }
    }
}

impl fmt::Display for SubchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SubchainBody {
    Hw { pus: Vec<PuId>, occupancy: u64 },
    Cpu { ops: Vec<CpuOp> },
}

/// An ordered group of PUs (hardware burst) or micro-ops (firmware glue)
/// inside a vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subchain {
    global_id: u32,
    body: SubchainBody,
}

/// Composes the task-global subchain id from the task id and the
/// subchain's arena index.
pub fn compose_global_id(task_id: u16, index: u16) -> u32 {
    (u32::from(task_id) << 16) | u32::from(index)
}

impl Subchain {
    pub(crate) fn hw(global_id: u32) -> Self {
        Self {
            global_id,
            body: SubchainBody::Hw {
                pus: Vec::new(),
                occupancy: 0,
            },
        }
    }

    pub(crate) fn cpu(global_id: u32) -> Self {
        Self {
            global_id,
            body: SubchainBody::Cpu { ops: Vec::new() },
        }
    }

    pub fn kind(&self) -> SubchainKind {
        match self.body {
            SubchainBody::Hw { .. } => SubchainKind::Hw,
            SubchainBody::Cpu { .. } => SubchainKind::Cpu,
        }
    }

    pub fn is_hw(&self) -> bool {
        matches!(self.body, SubchainBody::Hw { .. })
    }

    /// Task-global id, `(task_id << 16) | arena_index`.
    pub fn global_id(&self) -> u32 {
        self.global_id
    }

    /// The PU list, in insertion (burst) order. Empty for CPU subchains.
    pub fn pus(&self) -> &[PuId] {
        match &self.body {
            SubchainBody::Hw { pus, .. } => pus,
            SubchainBody::Cpu { .. } => &[],
        }
    }

    /// The micro-op list. Empty for hardware subchains.
    pub fn cpu_ops(&self) -> &[CpuOp] {
        match &self.body {
            SubchainBody::Cpu { ops } => ops,
            SubchainBody::Hw { .. } => &[],
        }
    }

    /// The hardware-instance occupancy mask (0 for CPU subchains).
    pub fn occupancy(&self) -> u64 {
        match &self.body {
            SubchainBody::Hw { occupancy, .. } => *occupancy,
            SubchainBody::Cpu { .. } => 0,
        }
    }

    /// Claims the (kind, instance) occupancy bit. Returns false if the
    /// instance is already present or this is not a hardware subchain.
    pub(crate) fn try_claim(&mut self, kind: PuKind, instance: u8) -> bool {
        let SubchainBody::Hw { occupancy, .. } = &mut self.body else {
            return false;
        };
        let bit = 1u64 << (kind.instance_base() + instance);
        if *occupancy & bit != 0 {
            return false;
        }
        *occupancy |= bit;
        true
    }

    pub(crate) fn push_pu(&mut self, pu: PuId) {
        if let SubchainBody::Hw { pus, .. } = &mut self.body {
            pus.push(pu);
        }
    }

    /// Appends a micro-op. Returns false if the subchain is full or not a
    /// CPU subchain.
    pub(crate) fn push_cpu_op(&mut self, op: CpuOp) -> bool {
        let SubchainBody::Cpu { ops } = &mut self.body else {
            return false;
        };
        if ops.len() >= MAX_CPU_OPS {
            return false;
        }
        ops.push(op);
        true
    }

    pub fn summary(&self) -> String {
        match &self.body {
            SubchainBody::Hw { pus, occupancy } => format!(
                "hw subchain {:#010x}: {} pu(s), occupancy {:#018x}",
                self.global_id,
                pus.len(),
                occupancy
            ),
            SubchainBody::Cpu { ops } => {
                format!("cpu subchain {:#010x}: {} op(s)", self.global_id, ops.len())
            }
        }
    }
}
