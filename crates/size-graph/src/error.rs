// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for size-graph construction and resolution.

use crate::node::{Dimensions, SizeNodeId};
use crate::ops::Cropper;

/// Errors from building or resolving a [`crate::SizeGraph`].
#[derive(Debug, thiserror::Error)]
pub enum SizeError {
    /// The referenced node does not exist in the graph.
    #[error("unknown {node}")]
    UnknownNode { node: SizeNodeId },

    /// An origin dimension was assigned to a node that is not a root
    /// inout node.
    #[error("{node} ({kind}) is not a root inout node, cannot take an origin")]
    NotRoot {
        node: SizeNodeId,
        kind: &'static str,
    },

    /// An origin dimension was re-assigned with a different value.
    #[error("origin conflict on {node}: already {current}, requested {requested}")]
    DimensionConflict {
        node: SizeNodeId,
        current: Dimensions,
        requested: Dimensions,
    },

    /// Resolution reached a root whose origin has never been supplied.
    #[error("no origin dimension set on the ancestor chain of {node}")]
    AncestorUnset { node: SizeNodeId },

    /// Crop margins exceed the parent dimension.
    #[error("crop on {node} exceeds parent {parent} ({cropper})")]
    CropExceedsParent {
        node: SizeNodeId,
        parent: Dimensions,
        cropper: Cropper,
    },

    /// A scaler was declared with a zero denominator.
    #[error("scaler denominator must be non-zero")]
    ZeroDenominator,

    /// The arena cannot hold more nodes (indices are u16).
    #[error("size graph is full")]
    GraphFull,
}
