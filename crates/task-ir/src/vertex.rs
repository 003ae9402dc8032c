// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Control-flow vertices of a task graph.
//!
//! Edges store only the successor index; predecessor links are derived
//! when an edge is added. Each vertex owns an ordered list of subchains,
//! and a tensor-process vertex additionally owns a [`ProcessBase`] record
//! describing its preloaded network.

use crate::error::GraphError;
use crate::subchain::SubchainId;
use std::fmt;

/// Index of a vertex in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct VertexId(pub u16);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vertex#{}", self.0)
    }
}

/// Index of a process-base record in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ProcessBaseId(pub u16);

impl fmt::Display for ProcessBaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process-base#{}", self.0)
    }
}

/// Hardware limit on out-edges per vertex (the descriptor stores them
/// inline).
pub const MAX_OUT_EDGES: usize = 4;

/// The four vertex kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexKind {
    /// Entry point; exactly one per task, with exactly one out-edge.
    Start,
    /// Exit point; no out-edges.
    End,
    /// Ordinary processing stage.
    Process,
    /// CNN stage; owns a process base describing the preloaded network.
    TensorProcess,
}

impl VertexKind {
    pub fn wire_tag(&self) -> u8 {
        *self as u8
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(VertexKind::Start),
            1 => Some(VertexKind::End),
            2 => Some(VertexKind::Process),
            3 => Some(VertexKind::TensorProcess),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VertexKind::Start => "start",
            VertexKind::End => "end",
            VertexKind::Process => "process",
            VertexKind::TensorProcess => "tensor_process",
        }
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Layer-table record owned by a tensor-process vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessBase {
    /// The owning vertex.
    pub vertex: VertexId,
    pub n_layers: u16,
    pub in_width: u16,
    pub in_height: u16,
    /// Byte offset of the layer table inside the preloaded blob.
    pub base_ofs: u32,
}

/// One node of the task's control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    kind: VertexKind,
    subchains: Vec<SubchainId>,
    out_edges: Vec<VertexId>,
    /// Derived from other vertices' out-edges.
    preds: Vec<VertexId>,
    process_base: Option<ProcessBaseId>,
}

impl Vertex {
    pub(crate) fn new(kind: VertexKind) -> Self {
        Self {
            kind,
            subchains: Vec::new(),
            out_edges: Vec::new(),
            preds: Vec::new(),
            process_base: None,
        }
    }

    pub fn kind(&self) -> VertexKind {
        self.kind
    }

    /// Owned subchains, in insertion (execution) order.
    pub fn subchains(&self) -> &[SubchainId] {
        &self.subchains
    }

    pub fn out_edges(&self) -> &[VertexId] {
        &self.out_edges
    }

    pub fn predecessors(&self) -> &[VertexId] {
        &self.preds
    }

    pub fn process_base(&self) -> Option<ProcessBaseId> {
        self.process_base
    }

    pub(crate) fn push_subchain(&mut self, sc: SubchainId) {
        self.subchains.push(sc);
    }

    pub(crate) fn push_out_edge(&mut self, to: VertexId) {
        self.out_edges.push(to);
    }

    pub(crate) fn push_pred(&mut self, from: VertexId) {
        self.preds.push(from);
    }

    pub(crate) fn set_process_base(&mut self, base: ProcessBaseId) {
        self.process_base = Some(base);
    }

    /// Kind-specific local constraints, checked at serialize time.
    pub fn check_constraint(&self, id: VertexId) -> Result<(), GraphError> {
        let fail = |detail: String| {
            Err(GraphError::VertexConstraint {
                vertex: id,
                kind: self.kind,
                detail,
            })
        };
        match self.kind {
            VertexKind::Start => {
                if self.out_edges.len() != 1 {
                    return fail(format!(
                        "start vertex must have exactly one out-edge, found {}",
                        self.out_edges.len()
                    ));
                }
                if !self.preds.is_empty() {
                    return fail("start vertex may not have predecessors".into());
                }
                if !self.subchains.is_empty() {
                    return fail("start vertex owns no subchains".into());
                }
            }
            VertexKind::End => {
                if !self.out_edges.is_empty() {
                    return fail(format!(
                        "end vertex may not have out-edges, found {}",
                        self.out_edges.len()
                    ));
                }
                if !self.subchains.is_empty() {
                    return fail("end vertex owns no subchains".into());
                }
            }
            VertexKind::Process => {
                if self.process_base.is_some() {
                    return fail("only tensor-process vertices carry a process base".into());
                }
            }
            VertexKind::TensorProcess => {
                if self.process_base.is_none() {
                    return Err(GraphError::MissingProcessBase { vertex: id });
                }
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} subchain(s), {} out-edge(s), {} pred(s)",
            self.kind,
            self.subchains.len(),
            self.out_edges.len(),
            self.preds.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_constraint() {
        let mut v = Vertex::new(VertexKind::Start);
        assert!(v.check_constraint(VertexId(0)).is_err());

        v.push_out_edge(VertexId(1));
        assert!(v.check_constraint(VertexId(0)).is_ok());

        v.push_out_edge(VertexId(2));
        let err = v.check_constraint(VertexId(0)).unwrap_err();
        assert!(err.to_string().contains("exactly one out-edge"));
    }

    #[test]
    fn test_end_constraint() {
        let mut v = Vertex::new(VertexKind::End);
        assert!(v.check_constraint(VertexId(2)).is_ok());
        v.push_out_edge(VertexId(0));
        assert!(v.check_constraint(VertexId(2)).is_err());
    }

    #[test]
    fn test_tensor_process_needs_base() {
        let mut v = Vertex::new(VertexKind::TensorProcess);
        assert!(matches!(
            v.check_constraint(VertexId(1)),
            Err(GraphError::MissingProcessBase { .. })
        ));
        v.set_process_base(ProcessBaseId(0));
        assert!(v.check_constraint(VertexId(1)).is_ok());
    }

    #[test]
    fn test_process_rejects_stray_base() {
        let mut v = Vertex::new(VertexKind::Process);
        assert!(v.check_constraint(VertexId(1)).is_ok());
        v.set_process_base(ProcessBaseId(0));
        assert!(v.check_constraint(VertexId(1)).is_err());
    }
}
