// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for task construction, the size-spread pass, and the
//! descriptor codec.
//!
//! Three families, matching the failure domains:
//! - [`GraphError`] — structural: raised while building or resolving a task.
//!   Always names the offending entity (vertex/subchain/pu index) so the
//!   diagnostic pinpoints where the graph is wrong.
//! - [`CodecError`] — raised while decoding a flat descriptor. Signals
//!   corruption or version skew; never worked around.
//! - [`BlueprintError`] — raised while loading or building a JSON pipeline
//!   blueprint; wraps I/O, parse, and the graph errors the build step hits.

use crate::image::ImageDesc;
use crate::memmap::{ExtMemId, MemmapId};
use crate::pu::{PortLink, PuId, PuKind};
use crate::subchain::{SubchainId, SubchainKind};
use crate::vertex::{VertexId, VertexKind};
use size_graph::{SizeError, SizeNodeId};

/// Structural errors raised while building, wiring, or resolving a task.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A task arena reached its index-type capacity.
    #[error("task arena '{arena}' is full")]
    ArenaFull { arena: &'static str },

    /// A vertex index does not exist in the task.
    #[error("unknown {vertex}")]
    UnknownVertex { vertex: VertexId },

    /// A subchain index does not exist in the task.
    #[error("unknown {subchain}")]
    UnknownSubchain { subchain: SubchainId },

    /// A PU index does not exist in the task.
    #[error("unknown {pu}")]
    UnknownPu { pu: PuId },

    /// A memmap index does not exist in the task.
    #[error("unknown {memmap}")]
    UnknownMemmap { memmap: MemmapId },

    /// An external-memory index does not exist in the task.
    #[error("unknown {ext}")]
    UnknownExternalMem { ext: ExtMemId },

    /// A size-graph node referenced by a PU does not exist.
    #[error("unknown {node}")]
    UnknownSizeNode { node: SizeNodeId },

    /// An edge may not connect a vertex to itself.
    #[error("{vertex} may not have an edge to itself")]
    SelfEdge { vertex: VertexId },

    /// The edge already exists.
    #[error("edge {from} -> {to} already exists")]
    DuplicateEdge { from: VertexId, to: VertexId },

    /// A vertex exceeded its out-edge capacity.
    #[error("{vertex} already has {limit} out-edges")]
    TooManyEdges { vertex: VertexId, limit: usize },

    /// An operation requires the other subchain flavour.
    #[error("{subchain} is not a {expected} subchain")]
    WrongSubchainKind {
        subchain: SubchainId,
        expected: SubchainKind,
    },

    /// A CPU subchain exceeded its micro-op capacity.
    #[error("{subchain} already holds {limit} cpu ops")]
    TooManyCpuOps { subchain: SubchainId, limit: usize },

    /// The requested hardware instance number exceeds the per-kind budget.
    #[error("{kind} instance {instance} out of range (budget {budget})")]
    InstanceOutOfRange {
        kind: PuKind,
        instance: u8,
        budget: u8,
    },

    /// The (kind, instance) pair is already occupied in this subchain.
    #[error("{subchain} already contains {kind}.{instance}")]
    DuplicateInstance {
        subchain: SubchainId,
        kind: PuKind,
        instance: u8,
    },

    /// The parameter payload variant does not belong to the PU kind.
    #[error("{kind} cannot carry '{params}' parameters")]
    ParamsKindMismatch { kind: PuKind, params: &'static str },

    /// A port number exceeds the kind's declared port count.
    #[error("{pu}: port {port} out of range (kind allows {limit})")]
    PortOutOfRange { pu: PuId, port: u8, limit: u8 },

    /// The input port already has a producer; the failed attempt left the
    /// port untouched.
    #[error("{pu}: input port {port} already connected to {bound_to}")]
    PortAlreadyConnected {
        pu: PuId,
        port: u8,
        bound_to: PortLink,
    },

    /// A declared input port was never connected.
    #[error("{pu} ({kind}.{instance}): input port {port} is not connected")]
    UnconnectedPort {
        pu: PuId,
        kind: PuKind,
        instance: u8,
        port: u8,
    },

    /// A DMA-kind PU has no memmap attached.
    #[error("{pu} ({kind}): DMA without a memmap")]
    MissingMemmap { pu: PuId, kind: PuKind },

    /// Only DMA-kind PUs may carry a memmap.
    #[error("{pu} ({kind}): memmaps are only valid on DMA kinds")]
    MemmapOnNonDma { pu: PuId, kind: PuKind },

    /// A memmap's image descriptor still has zero fields where the spread
    /// pass needs concrete values.
    #[error("{pu}: {memmap} image descriptor incomplete ({image})")]
    IncompleteImage {
        pu: PuId,
        memmap: MemmapId,
        image: ImageDesc,
    },

    /// The PU kind demands a size-graph node but none was attached.
    #[error("{pu} ({kind}.{instance}): no size node attached")]
    MissingSizeNode {
        pu: PuId,
        kind: PuKind,
        instance: u8,
    },

    /// The attached size node has the wrong transform kind for this PU.
    #[error("{pu}: {node} is a {found} node, expected {expected}")]
    WrongSizeNode {
        pu: PuId,
        node: SizeNodeId,
        expected: &'static str,
        found: &'static str,
    },

    /// Dimension resolution failed underneath a PU.
    #[error("{pu}: size resolution failed: {source}")]
    SizeResolve {
        pu: PuId,
        #[source]
        source: SizeError,
    },

    /// A resolved dimension does not fit the 16-bit hardware register.
    #[error("{pu}: resolved dimension {value} exceeds the 16-bit register range")]
    GeometryTooLarge { pu: PuId, value: u32 },

    /// A task must contain exactly one start vertex.
    #[error("task must contain exactly one start vertex, found {found}")]
    StartVertexCount { found: usize },

    /// A task must contain at least one end vertex.
    #[error("task contains no end vertex")]
    MissingEndVertex,

    /// A vertex violated one of its kind-specific local constraints.
    #[error("{vertex} ({kind}): {detail}")]
    VertexConstraint {
        vertex: VertexId,
        kind: VertexKind,
        detail: String,
    },

    /// The operation requires a different vertex kind.
    #[error("{vertex} is a {found} vertex, expected {expected}")]
    WrongVertexKind {
        vertex: VertexId,
        expected: VertexKind,
        found: VertexKind,
    },

    /// A tensor-process vertex reached serialization without a process base.
    #[error("{vertex}: tensor-process vertex has no process base")]
    MissingProcessBase { vertex: VertexId },

    /// The (vertex, subchain, pu) triple is not a real containment chain.
    #[error("updatable triple ({vertex}, {subchain}, {pu}) is not a containment chain")]
    UpdatableMismatch {
        vertex: VertexId,
        subchain: SubchainId,
        pu: PuId,
    },

    /// A blueprint stage cannot be built into the pipeline.
    #[error("blueprint stage {stage}: {detail}")]
    Blueprint { stage: usize, detail: String },
}

/// Errors raised while decoding a flat task descriptor.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The buffer is smaller than the region being read.
    #[error("descriptor truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    /// The stored `total_size` disagrees with the size recomputed from the
    /// header's own section counts. Version skew or corruption; fatal.
    #[error("total_size mismatch: header says {stored}, counts give {computed}")]
    TotalSizeMismatch { stored: u32, computed: u32 },

    /// The buffer length does not match `total_size` plus the trailer.
    #[error("descriptor length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// The 4-byte trailer magic is wrong.
    #[error("bad descriptor trailer magic {found:02x?}")]
    BadTrailer { found: [u8; 4] },

    /// A section offset is not the canonical running sum (or a zero-element
    /// section stored a non-zero offset).
    #[error("{section} section offset {stored} does not match layout (expected {expected})")]
    SectionOffset {
        section: &'static str,
        stored: u32,
        expected: u32,
    },

    /// An enum tag byte has no known mapping.
    #[error("unknown {entity} tag {tag:#04x}")]
    UnknownTag { entity: &'static str, tag: u8 },

    /// A cross-reference index points outside its section.
    #[error("{entity} index {index} out of range (section holds {limit})")]
    IndexOutOfRange {
        entity: &'static str,
        index: usize,
        limit: usize,
    },

    /// An element is internally inconsistent with the rest of the descriptor.
    #[error("{entity} {index} invalid: {detail}")]
    Invalid {
        entity: &'static str,
        index: usize,
        detail: String,
    },

    /// Reading a descriptor file failed.
    #[error("descriptor i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or building a JSON task blueprint.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    /// Reading the blueprint file failed.
    #[error("blueprint i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The blueprint is not valid JSON for the schema.
    #[error("blueprint parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema version is not one this build understands.
    #[error("unsupported blueprint version {version} (this build reads version {supported})")]
    Version { version: u32, supported: u32 },

    /// A blueprint-level field violates the schema rules.
    #[error("invalid blueprint: {detail}")]
    Schema { detail: String },

    /// Building or resolving the task graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A size-graph edit failed while laying out the pipeline.
    #[error(transparent)]
    Size(#[from] SizeError),
}
