// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Processing units: one hardware operator instance with typed ports.
//!
//! A [`Pu`] is always owned by a task arena and addressed by [`PuId`];
//! construction and wiring go through [`Task`] so the structural invariants
//! (port ranges, single producer per input, per-subchain instance
//! occupancy) hold by the time a task serializes.
//!
//! [`Task`]: crate::Task

pub mod kind;
pub mod params;

pub use kind::PuKind;
pub use params::{
    CalbOp, CalbParams, CnnParams, CropParams, DmaDataKind, DmaParams, FifoParams,
    Map2ListParams, NmsParams, PuParams, RawParams, RoisParams, SalbOp, SalbParams, ScalerParams,
};

use crate::error::GraphError;
use crate::memmap::MemmapId;
use size_graph::SizeNodeId;
use std::fmt;

/// Hardware limit on input ports per block.
pub const MAX_IN_PORTS: usize = 4;
/// Hardware limit on output ports per block.
pub const MAX_OUT_PORTS: usize = 4;

/// Index of a PU in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PuId(pub u16);

impl fmt::Display for PuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pu#{}", self.0)
    }
}

/// One bound input edge: the producing PU and which of its output ports
/// feeds this input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PortLink {
    pub producer: PuId,
    pub out_port: u8,
}

impl fmt::Display for PortLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.producer, self.out_port)
    }
}

/// A single hardware operation in a subchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pu {
    kind: PuKind,
    instance: u8,
    in_ports: [Option<PortLink>; MAX_IN_PORTS],
    /// Producer-side fan-out, derived from `connect` calls:
    /// (consumer, consumer input port).
    fan_out: Vec<(PuId, u8)>,
    size_node: Option<SizeNodeId>,
    memmap: Option<MemmapId>,
    /// Hardware parameter payload; frozen into the descriptor at serialize
    /// time, after the spread pass has written resolved geometry into it.
    pub params: PuParams,
}

impl Pu {
    pub(crate) fn new(
        kind: PuKind,
        instance: u8,
        params: PuParams,
        size_node: Option<SizeNodeId>,
    ) -> Self {
        Self {
            kind,
            instance,
            in_ports: [None; MAX_IN_PORTS],
            fan_out: Vec::new(),
            size_node,
            memmap: None,
            params,
        }
    }

    pub fn kind(&self) -> PuKind {
        self.kind
    }

    pub fn instance(&self) -> u8 {
        self.instance
    }

    pub fn size_node(&self) -> Option<SizeNodeId> {
        self.size_node
    }

    pub(crate) fn set_size_node(&mut self, node: SizeNodeId) {
        self.size_node = Some(node);
    }

    /// The (first) memmap backing this DMA, if one is attached.
    pub fn memmap(&self) -> Option<MemmapId> {
        self.memmap
    }

    pub(crate) fn set_memmap(&mut self, memmap: MemmapId) {
        self.memmap = Some(memmap);
    }

    /// The memmap backing one ROI slot of a point-list DMA. Slot `roi` maps
    /// to the `roi`-th memmap after the base one.
    pub fn memmap_for_roi(&self, roi: u8) -> Option<MemmapId> {
        let base = self.memmap?;
        match &self.params {
            PuParams::Dma(p) if p.data_kind == DmaDataKind::PointList && roi < p.roi_count => {
                Some(MemmapId(base.0 + u16::from(roi)))
            }
            _ => None,
        }
    }

    /// Every memmap this PU touches: one for a plain DMA, one per ROI slot
    /// for a point-list DMA.
    pub fn memmaps(&self) -> Vec<MemmapId> {
        let Some(base) = self.memmap else {
            return Vec::new();
        };
        match &self.params {
            PuParams::Dma(p) if p.data_kind == DmaDataKind::PointList => (0..p.roi_count)
                .map(|roi| MemmapId(base.0 + u16::from(roi)))
                .collect(),
            _ => vec![base],
        }
    }

    /// The producer bound to one input port.
    pub fn in_port(&self, port: u8) -> Option<PortLink> {
        self.in_ports.get(usize::from(port)).copied().flatten()
    }

    /// Number of input ports that currently have a producer.
    pub fn bound_in_ports(&self) -> u8 {
        self.in_ports.iter().flatten().count() as u8
    }

    /// First declared input port without a producer, if any.
    pub fn first_unconnected_port(&self) -> Option<u8> {
        (0..self.kind.in_ports()).find(|&p| self.in_port(p).is_none())
    }

    /// Consumers fed by this PU, in connection order.
    pub fn fan_out(&self) -> &[(PuId, u8)] {
        &self.fan_out
    }

    /// Binds a producer to one input port. Fails without touching the port
    /// state if the port is out of range or already bound.
    pub(crate) fn bind_in_port(
        &mut self,
        self_id: PuId,
        port: u8,
        link: PortLink,
    ) -> Result<(), GraphError> {
        if port >= self.kind.in_ports() {
            return Err(GraphError::PortOutOfRange {
                pu: self_id,
                port,
                limit: self.kind.in_ports(),
            });
        }
        let slot = &mut self.in_ports[usize::from(port)];
        if let Some(bound_to) = *slot {
            return Err(GraphError::PortAlreadyConnected {
                pu: self_id,
                port,
                bound_to,
            });
        }
        *slot = Some(link);
        Ok(())
    }

    pub(crate) fn record_fan_out(&mut self, consumer: PuId, in_port: u8) {
        self.fan_out.push((consumer, in_port));
    }

    /// One-line state dump used in diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "{}.{}: {}/{} in-ports bound, {} consumer(s)",
            self.kind,
            self.instance,
            self.bound_in_ports(),
            self.kind.in_ports(),
            self.fan_out.len()
        )
    }
}
