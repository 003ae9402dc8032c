// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # size-graph
//!
//! Derived-dimension DAG for VPU task graphs.
//!
//! Every hardware process carries a small graph of size-transform nodes.
//! A node describes how the image dimensions seen by one processing unit
//! are derived from the dimensions seen by another:
//!
//! - [`SizeNode::Inout`] — identity passthrough; a *root* inout node is the
//!   point where a concrete origin dimension enters the graph (supplied
//!   lazily by the first DMA that touches it).
//! - [`SizeNode::Fix`] — a constant dimension, independent of any ancestor.
//! - [`SizeNode::Crop`] — subtracts fixed margins from the parent dimension.
//! - [`SizeNode::Scale`] — applies a rational scale factor, rounding up.
//!
//! Dimensions resolve lazily: [`SizeGraph::dimension`] walks the ancestor
//! chain to the origin and folds the transforms forward. Until an origin is
//! set, resolution fails with [`SizeError::AncestorUnset`]; a conflicting
//! re-assignment of an origin fails with [`SizeError::DimensionConflict`].
//!
//! # Example
//! ```
//! use size_graph::{Cropper, Dimensions, Scaler, SizeGraph};
//!
//! let mut g = SizeGraph::new();
//! let root = g.add_inout(None).unwrap();
//! let half = g.add_scale(root, Scaler::new(1, 2, 1, 2)).unwrap();
//! g.set_origin(root, Dimensions::new(65, 64)).unwrap();
//! // Scale rounds up: ceil(65 / 2) = 33.
//! assert_eq!(g.dimension(half).unwrap(), Dimensions::new(33, 32));
//! ```

mod error;
mod graph;
mod node;
mod ops;

pub use error::SizeError;
pub use graph::SizeGraph;
pub use node::{Dimensions, SizeNode, SizeNodeId};
pub use ops::{ceil_scale, Cropper, CropperId, Scaler, ScalerId};
