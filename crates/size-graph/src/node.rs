// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Size-graph nodes and the resolved dimension value type.

use std::fmt;

use crate::ops::{CropperId, ScalerId};

/// Index of a node within a [`crate::SizeGraph`] arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SizeNodeId(pub u16);

impl fmt::Display for SizeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "size-node#{}", self.0)
    }
}

/// A resolved (or declared) image dimension.
///
/// The `roi_*` fields, when both non-zero, mean "the next consumer's
/// effective size is this region of interest, not the raw width/height".
/// The ROI collapses into width/height for the next hop and is cleared;
/// see [`Dimensions::effective`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub roi_width: u32,
    pub roi_height: u32,
}

impl Dimensions {
    /// Creates a plain dimension with no region of interest.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            roi_width: 0,
            roi_height: 0,
        }
    }

    /// Creates a dimension carrying a region of interest.
    pub fn with_roi(width: u32, height: u32, roi_width: u32, roi_height: u32) -> Self {
        Self {
            width,
            height,
            roi_width,
            roi_height,
        }
    }

    /// Returns `true` if a region of interest is declared.
    pub fn has_roi(&self) -> bool {
        self.roi_width != 0 && self.roi_height != 0
    }

    /// Collapses the region of interest into the effective size seen by
    /// the next hop: `(roi_width, roi_height)` if an ROI is declared,
    /// otherwise `(width, height)`. The result never carries an ROI.
    pub fn effective(&self) -> Self {
        if self.has_roi() {
            Self::new(self.roi_width, self.roi_height)
        } else {
            Self::new(self.width, self.height)
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.has_roi() {
            write!(f, " (roi {}x{})", self.roi_width, self.roi_height)?;
        }
        Ok(())
    }
}

/// One node in the size graph.
///
/// Crop and Scale nodes always have a parent (enforced at construction);
/// an Inout node without a parent is a *root* and is the only place an
/// origin dimension may be assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeNode {
    /// Identity passthrough; roots accept an origin dimension.
    Inout {
        parent: Option<SizeNodeId>,
        origin: Option<Dimensions>,
    },
    /// A constant dimension with no ancestor.
    Fix { dims: Dimensions },
    /// Subtracts the referenced cropper's margins from the parent.
    Crop {
        parent: SizeNodeId,
        cropper: CropperId,
    },
    /// Applies the referenced scaler's rational factor to the parent.
    Scale {
        parent: SizeNodeId,
        scaler: ScalerId,
    },
}

impl SizeNode {
    /// The node's parent, if any.
    pub fn parent(&self) -> Option<SizeNodeId> {
        match self {
            SizeNode::Inout { parent, .. } => *parent,
            SizeNode::Fix { .. } => None,
            SizeNode::Crop { parent, .. } | SizeNode::Scale { parent, .. } => Some(*parent),
        }
    }

    /// Short kind tag for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SizeNode::Inout { .. } => "inout",
            SizeNode::Fix { .. } => "fix",
            SizeNode::Crop { .. } => "crop",
            SizeNode::Scale { .. } => "scale",
        }
    }
}
