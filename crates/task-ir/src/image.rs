// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Image geometry descriptor shared by memmaps and DMA parameter payloads.

use std::fmt;

/// Geometry of one image buffer: pixel dimensions, bytes per pixel, and the
/// byte stride between consecutive lines.
///
/// All fields must be non-zero before a task serializes; the spread pass
/// fills DMA-out descriptors that were left at zero. Widths and heights are
/// 16-bit because that is what the hardware registers hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageDesc {
    /// Width in pixels.
    pub width: u16,
    /// Height in lines.
    pub height: u16,
    /// Bytes per pixel.
    pub pixel_bytes: u16,
    /// Byte offset between consecutive lines (≥ `width * pixel_bytes`).
    #[serde(default)]
    pub line_ofs: u32,
}

impl ImageDesc {
    /// Creates a densely packed descriptor (`line_ofs = width * pixel_bytes`).
    pub fn new(width: u16, height: u16, pixel_bytes: u16) -> Self {
        Self {
            width,
            height,
            pixel_bytes,
            line_ofs: u32::from(width) * u32::from(pixel_bytes),
        }
    }

    /// Creates a descriptor with an explicit line stride.
    pub fn with_line_ofs(width: u16, height: u16, pixel_bytes: u16, line_ofs: u32) -> Self {
        Self {
            width,
            height,
            pixel_bytes,
            line_ofs,
        }
    }

    /// Total byte size of the buffer the descriptor spans.
    pub fn byte_size(&self) -> usize {
        self.line_ofs as usize * self.height as usize
    }

    /// Whether every field holds a concrete (non-zero) value.
    pub fn is_complete(&self) -> bool {
        self.width != 0 && self.height != 0 && self.pixel_bytes != 0 && self.line_ofs != 0
    }

    /// Fills any zero geometry field from the resolved dimensions, leaving
    /// fields the builder already populated untouched.
    pub fn fill_missing(&mut self, width: u16, height: u16) {
        if self.width == 0 {
            self.width = width;
        }
        if self.height == 0 {
            self.height = height;
        }
        if self.line_ofs == 0 {
            self.line_ofs = u32::from(self.width) * u32::from(self.pixel_bytes);
        }
    }
}

impl fmt::Display for ImageDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @{}B/px, {}B/line",
            self.width, self.height, self.pixel_bytes, self.line_ofs
        )
    }
}
