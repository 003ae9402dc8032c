// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Crop and scale operator records referenced by size-graph nodes.

use std::fmt;

use crate::node::Dimensions;

/// Index of a [`Cropper`] within a [`crate::SizeGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CropperId(pub u16);

/// Index of a [`Scaler`] within a [`crate::SizeGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ScalerId(pub u16);

/// Fixed margins subtracted from a parent dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cropper {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Cropper {
    pub fn new(left: u32, right: u32, top: u32, bottom: u32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Total horizontal margin (`left + right`).
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Total vertical margin (`top + bottom`).
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }

    /// Applies the margins to `dims`, or `None` if they exceed it.
    pub fn apply(&self, dims: Dimensions) -> Option<Dimensions> {
        let width = dims.width.checked_sub(self.horizontal())?;
        let height = dims.height.checked_sub(self.vertical())?;
        Some(Dimensions::new(width, height))
    }
}

impl fmt::Display for Cropper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={} right={} top={} bottom={}",
            self.left, self.right, self.top, self.bottom
        )
    }
}

/// A rational per-axis scale factor.
///
/// Scaling always rounds *up*; hardware tiling depends on the output
/// covering the whole input, so a 65-wide image halved is 33 wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Scaler {
    pub w_num: u16,
    pub w_den: u16,
    pub h_num: u16,
    pub h_den: u16,
}

impl Scaler {
    pub fn new(w_num: u16, w_den: u16, h_num: u16, h_den: u16) -> Self {
        Self {
            w_num,
            w_den,
            h_num,
            h_den,
        }
    }

    /// The identity factor (1/1 on both axes).
    pub fn identity() -> Self {
        Self::new(1, 1, 1, 1)
    }

    /// Applies the factor to `dims`, rounding each axis up.
    ///
    /// Denominators are validated non-zero when the scaler enters a
    /// [`crate::SizeGraph`].
    pub fn apply(&self, dims: Dimensions) -> Dimensions {
        Dimensions::new(
            ceil_scale(dims.width, self.w_num, self.w_den),
            ceil_scale(dims.height, self.h_num, self.h_den),
        )
    }
}

impl fmt::Display for Scaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} x {}/{}",
            self.w_num, self.w_den, self.h_num, self.h_den
        )
    }
}

/// `ceil(dim * num / den)` without intermediate overflow.
pub fn ceil_scale(dim: u32, num: u16, den: u16) -> u32 {
    debug_assert!(den != 0);
    let scaled = u64::from(dim) * u64::from(num);
    ((scaled + u64::from(den) - 1) / u64::from(den)) as u32
}
