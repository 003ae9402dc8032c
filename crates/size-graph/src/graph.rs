// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`SizeGraph`] arena and lazy dimension resolution.

use crate::error::SizeError;
use crate::node::{Dimensions, SizeNode, SizeNodeId};
use crate::ops::{Cropper, CropperId, Scaler, ScalerId};

/// Arena of size-transform nodes plus the crop/scale operator records
/// they reference.
///
/// Nodes only ever reference already-inserted parents, so the graph is
/// acyclic by construction and resolution always terminates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeGraph {
    nodes: Vec<SizeNode>,
    croppers: Vec<Cropper>,
    scalers: Vec<Scaler>,
}

impl SizeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by id.
    pub fn node(&self, id: SizeNodeId) -> Option<&SizeNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Adds an identity passthrough node. Without a parent the node is a
    /// root and may later receive an origin via [`SizeGraph::set_origin`].
    pub fn add_inout(&mut self, parent: Option<SizeNodeId>) -> Result<SizeNodeId, SizeError> {
        if let Some(p) = parent {
            self.require(p)?;
        }
        self.push(SizeNode::Inout {
            parent,
            origin: None,
        })
    }

    /// Adds a constant-dimension node.
    pub fn add_fix(&mut self, dims: Dimensions) -> Result<SizeNodeId, SizeError> {
        self.push(SizeNode::Fix { dims })
    }

    /// Adds a crop node deriving from `parent`.
    pub fn add_crop(
        &mut self,
        parent: SizeNodeId,
        cropper: Cropper,
    ) -> Result<SizeNodeId, SizeError> {
        self.require(parent)?;
        let cid = CropperId(self.croppers.len() as u16);
        self.croppers.push(cropper);
        self.push(SizeNode::Crop {
            parent,
            cropper: cid,
        })
    }

    /// Adds a scale node deriving from `parent`. Denominators must be
    /// non-zero.
    pub fn add_scale(
        &mut self,
        parent: SizeNodeId,
        scaler: Scaler,
    ) -> Result<SizeNodeId, SizeError> {
        self.require(parent)?;
        if scaler.w_den == 0 || scaler.h_den == 0 {
            return Err(SizeError::ZeroDenominator);
        }
        let sid = ScalerId(self.scalers.len() as u16);
        self.scalers.push(scaler);
        self.push(SizeNode::Scale {
            parent,
            scaler: sid,
        })
    }

    /// Assigns the origin dimension of a root inout node.
    ///
    /// Idempotent for an identical repeat assignment; a differing repeat
    /// fails with [`SizeError::DimensionConflict`] and leaves the stored
    /// origin untouched.
    pub fn set_origin(&mut self, id: SizeNodeId, dims: Dimensions) -> Result<(), SizeError> {
        let node = self
            .nodes
            .get_mut(id.0 as usize)
            .ok_or(SizeError::UnknownNode { node: id })?;
        match node {
            SizeNode::Inout {
                parent: None,
                origin,
            } => match *origin {
                None => {
                    *origin = Some(dims);
                    Ok(())
                }
                Some(current) if current == dims => Ok(()),
                Some(current) => Err(SizeError::DimensionConflict {
                    node: id,
                    current,
                    requested: dims,
                }),
            },
            other => Err(SizeError::NotRoot {
                node: id,
                kind: other.kind_name(),
            }),
        }
    }

    /// The origin assigned to a root inout node, if any.
    pub fn origin(&self, id: SizeNodeId) -> Option<Dimensions> {
        match self.node(id) {
            Some(SizeNode::Inout {
                parent: None,
                origin,
            }) => *origin,
            _ => None,
        }
    }

    /// `true` if `id` names a root inout node.
    pub fn is_root(&self, id: SizeNodeId) -> bool {
        matches!(self.node(id), Some(SizeNode::Inout { parent: None, .. }))
    }

    /// Resolves the dimension of `id` by walking its ancestor chain to an
    /// origin and folding the transforms forward.
    ///
    /// A parent's declared region of interest collapses into the effective
    /// size before each hop's own transform applies; only the queried
    /// node's own ROI (if it is the origin or a fix node) survives in the
    /// returned value.
    pub fn dimension(&self, id: SizeNodeId) -> Result<Dimensions, SizeError> {
        let node = self.require(id)?;
        match node {
            SizeNode::Fix { dims } => Ok(*dims),
            SizeNode::Inout {
                parent: Some(p), ..
            } => Ok(self.dimension(*p)?.effective()),
            SizeNode::Inout {
                parent: None,
                origin,
            } => origin.ok_or(SizeError::AncestorUnset { node: id }),
            SizeNode::Crop { parent, cropper } => {
                let base = self.dimension(*parent)?.effective();
                let cropper = self.croppers[cropper.0 as usize];
                cropper
                    .apply(base)
                    .ok_or(SizeError::CropExceedsParent {
                        node: id,
                        parent: base,
                        cropper,
                    })
            }
            SizeNode::Scale { parent, scaler } => {
                let base = self.dimension(*parent)?.effective();
                Ok(self.scalers[scaler.0 as usize].apply(base))
            }
        }
    }

    /// Resolves the *input* dimension of a crop/scale node, i.e. its
    /// parent's effective size.
    pub fn parent_dimension(&self, id: SizeNodeId) -> Result<Dimensions, SizeError> {
        let node = self.require(id)?;
        match node.parent() {
            Some(p) => Ok(self.dimension(p)?.effective()),
            None => Err(SizeError::AncestorUnset { node: id }),
        }
    }

    /// The scaler record of a scale node, if `id` names one.
    pub fn scaler_of(&self, id: SizeNodeId) -> Option<&Scaler> {
        match self.node(id)? {
            SizeNode::Scale { scaler, .. } => self.scalers.get(scaler.0 as usize),
            _ => None,
        }
    }

    /// The cropper record of a crop node, if `id` names one.
    pub fn cropper_of(&self, id: SizeNodeId) -> Option<&Cropper> {
        match self.node(id)? {
            SizeNode::Crop { cropper, .. } => self.croppers.get(cropper.0 as usize),
            _ => None,
        }
    }

    fn require(&self, id: SizeNodeId) -> Result<&SizeNode, SizeError> {
        self.node(id).ok_or(SizeError::UnknownNode { node: id })
    }

    fn push(&mut self, node: SizeNode) -> Result<SizeNodeId, SizeError> {
        if self.nodes.len() > u16::MAX as usize {
            return Err(SizeError::GraphFull);
        }
        let id = SizeNodeId(self.nodes.len() as u16);
        self.nodes.push(node);
        Ok(id)
    }
}
