// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hardware processing-unit kinds and their fixed per-kind tables.
//!
//! Every kind fixes three things at the hardware level: how many input and
//! output ports the block exposes (at most [`MAX_IN_PORTS`] /
//! [`MAX_OUT_PORTS`]), how many physical instances of the block exist, and
//! where those instances sit in the task-wide instance numbering. The
//! instance numbering is dense: `instance_base() + instance` is a unique
//! bit position below 64 for every legal (kind, instance) pair, which is
//! what lets a subchain track occupancy in a single `u64` mask.
//!
//! [`MAX_IN_PORTS`]: crate::pu::MAX_IN_PORTS
//! [`MAX_OUT_PORTS`]: crate::pu::MAX_OUT_PORTS

use std::fmt;

/// The closed set of hardware operation kinds.
///
/// Wire tags are the declaration order (0-based); the order is part of the
/// descriptor format and must not be rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuKind {
    /// Reads a frame from device memory into the chain.
    DmaIn,
    /// Writes chain output back to device memory.
    DmaOut,
    /// Single-input arithmetic-logic block (threshold, constant ops).
    Salb,
    /// Two-input arithmetic-logic block.
    Calb,
    /// Region-of-interest extractor.
    Rois,
    /// Crops margins off the frame.
    Crop,
    /// Motion estimator (two-frame input).
    Mde,
    /// Converts a response map into a coordinate list.
    Map2List,
    /// Non-maximum suppression over a response map.
    Nms,
    /// Colour-correction matrix.
    Ccm,
    /// Look-up-table point transform.
    Lut,
    /// Integral-image accumulator.
    Integral,
    /// Rational upsampler.
    Upscaler,
    /// Rational downsampler.
    Downscaler,
    /// Separable linear filter, 5 taps.
    Slf5,
    /// Separable linear filter, 7 taps.
    Slf7,
    /// General 5x5 linear filter.
    Glf5,
    /// Non-linear (rank/median) filter.
    Nlf,
    /// Copies one stream to up to four consumers.
    Duplicator,
    /// Splits planes to up to four outputs.
    Splitter,
    /// Merges up to four inputs into one stream.
    Joiner,
    /// Histogram accumulator.
    Histogram,
    /// Depth-from-stereo block.
    Depth,
    /// Disparity refinement block.
    Disparity,
    /// Hole-filling block.
    Inpaint,
    /// Optical flow (vectors + confidence outputs).
    Flow,
    /// Rate-matching queue between hardware bursts.
    Fifo,
    /// Convolutional-network engine.
    Cnn,
}

impl PuKind {
    /// All kinds in wire-tag order.
    pub const ALL: [PuKind; 28] = [
        PuKind::DmaIn,
        PuKind::DmaOut,
        PuKind::Salb,
        PuKind::Calb,
        PuKind::Rois,
        PuKind::Crop,
        PuKind::Mde,
        PuKind::Map2List,
        PuKind::Nms,
        PuKind::Ccm,
        PuKind::Lut,
        PuKind::Integral,
        PuKind::Upscaler,
        PuKind::Downscaler,
        PuKind::Slf5,
        PuKind::Slf7,
        PuKind::Glf5,
        PuKind::Nlf,
        PuKind::Duplicator,
        PuKind::Splitter,
        PuKind::Joiner,
        PuKind::Histogram,
        PuKind::Depth,
        PuKind::Disparity,
        PuKind::Inpaint,
        PuKind::Flow,
        PuKind::Fifo,
        PuKind::Cnn,
    ];

    /// The descriptor tag byte for this kind.
    pub fn wire_tag(&self) -> u8 {
        *self as u8
    }

    /// Maps a descriptor tag byte back to a kind.
    pub fn from_wire_tag(tag: u8) -> Option<PuKind> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    /// Number of input ports the block exposes.
    pub fn in_ports(&self) -> u8 {
        match self {
            PuKind::DmaIn => 0,
            PuKind::Joiner => 4,
            PuKind::Calb
            | PuKind::Mde
            | PuKind::Depth
            | PuKind::Disparity
            | PuKind::Inpaint
            | PuKind::Flow => 2,
            _ => 1,
        }
    }

    /// Number of output ports the block exposes.
    pub fn out_ports(&self) -> u8 {
        match self {
            PuKind::DmaOut => 0,
            PuKind::Duplicator | PuKind::Splitter => 4,
            PuKind::Map2List | PuKind::Flow => 2,
            _ => 1,
        }
    }

    /// Number of physical instances of this block on the device.
    pub fn instance_budget(&self) -> u8 {
        match self {
            PuKind::DmaIn | PuKind::DmaOut => 8,
            PuKind::Salb | PuKind::Fifo => 4,
            PuKind::Calb
            | PuKind::Rois
            | PuKind::Crop
            | PuKind::Map2List
            | PuKind::Lut
            | PuKind::Integral
            | PuKind::Upscaler
            | PuKind::Downscaler
            | PuKind::Slf5
            | PuKind::Slf7
            | PuKind::Glf5
            | PuKind::Duplicator
            | PuKind::Splitter
            | PuKind::Joiner
            | PuKind::Histogram => 2,
            PuKind::Mde
            | PuKind::Nms
            | PuKind::Ccm
            | PuKind::Nlf
            | PuKind::Depth
            | PuKind::Disparity
            | PuKind::Inpaint
            | PuKind::Flow
            | PuKind::Cnn => 1,
        }
    }

    /// First bit position of this kind's instances in the task-wide
    /// occupancy numbering.
    pub fn instance_base(&self) -> u8 {
        let mut base = 0u8;
        for kind in Self::ALL {
            if kind == *self {
                break;
            }
            base += kind.instance_budget();
        }
        base
    }

    /// Whether the kind moves data between device memory and the chain.
    pub fn is_dma(&self) -> bool {
        matches!(self, PuKind::DmaIn | PuKind::DmaOut)
    }

    /// Whether the spread pass requires a size-graph node on this kind.
    /// Every image-bearing block needs one; only the FIFO is pure plumbing.
    pub fn demands_size_node(&self) -> bool {
        !matches!(self, PuKind::Fifo)
    }

    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PuKind::DmaIn => "dma_in",
            PuKind::DmaOut => "dma_out",
            PuKind::Salb => "salb",
            PuKind::Calb => "calb",
            PuKind::Rois => "rois",
            PuKind::Crop => "crop",
            PuKind::Mde => "mde",
            PuKind::Map2List => "map2_list",
            PuKind::Nms => "nms",
            PuKind::Ccm => "ccm",
            PuKind::Lut => "lut",
            PuKind::Integral => "integral",
            PuKind::Upscaler => "upscaler",
            PuKind::Downscaler => "downscaler",
            PuKind::Slf5 => "slf5",
            PuKind::Slf7 => "slf7",
            PuKind::Glf5 => "glf5",
            PuKind::Nlf => "nlf",
            PuKind::Duplicator => "duplicator",
            PuKind::Splitter => "splitter",
            PuKind::Joiner => "joiner",
            PuKind::Histogram => "histogram",
            PuKind::Depth => "depth",
            PuKind::Disparity => "disparity",
            PuKind::Inpaint => "inpaint",
            PuKind::Flow => "flow",
            PuKind::Fifo => "fifo",
            PuKind::Cnn => "cnn",
        }
    }

    /// Parses a kind from a string, tolerating common aliases.
    pub fn from_str_loose(s: &str) -> Option<PuKind> {
        match s.to_lowercase().as_str() {
            "dma_in" | "dma-in" | "dmain" => Some(PuKind::DmaIn),
            "dma_out" | "dma-out" | "dmaout" => Some(PuKind::DmaOut),
            "salb" => Some(PuKind::Salb),
            "calb" => Some(PuKind::Calb),
            "rois" | "roi" => Some(PuKind::Rois),
            "crop" | "cropper" => Some(PuKind::Crop),
            "mde" => Some(PuKind::Mde),
            "map2_list" | "map2list" | "map_to_list" => Some(PuKind::Map2List),
            "nms" => Some(PuKind::Nms),
            "ccm" => Some(PuKind::Ccm),
            "lut" => Some(PuKind::Lut),
            "integral" => Some(PuKind::Integral),
            "upscaler" | "upscale" => Some(PuKind::Upscaler),
            "downscaler" | "downscale" => Some(PuKind::Downscaler),
            "slf5" => Some(PuKind::Slf5),
            "slf7" => Some(PuKind::Slf7),
            "glf5" => Some(PuKind::Glf5),
            "nlf" => Some(PuKind::Nlf),
            "duplicator" | "dup" => Some(PuKind::Duplicator),
            "splitter" | "split" => Some(PuKind::Splitter),
            "joiner" | "join" => Some(PuKind::Joiner),
            "histogram" | "hist" => Some(PuKind::Histogram),
            "depth" => Some(PuKind::Depth),
            "disparity" => Some(PuKind::Disparity),
            "inpaint" => Some(PuKind::Inpaint),
            "flow" | "optical_flow" => Some(PuKind::Flow),
            "fifo" => Some(PuKind::Fifo),
            "cnn" => Some(PuKind::Cnn),
            _ => None,
        }
    }
}

impl fmt::Display for PuKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tag_roundtrip() {
        for kind in PuKind::ALL {
            assert_eq!(PuKind::from_wire_tag(kind.wire_tag()), Some(kind));
        }
        assert_eq!(PuKind::from_wire_tag(28), None);
        assert_eq!(PuKind::from_wire_tag(0xFF), None);
    }

    #[test]
    fn test_instance_numbering_fits_occupancy_mask() {
        let total: u32 = PuKind::ALL
            .iter()
            .map(|k| u32::from(k.instance_budget()))
            .sum();
        assert!(total <= 64, "instance numbering overflows the u64 mask");

        // The last legal bit position must stay below 64.
        let last = PuKind::Cnn;
        assert!(u32::from(last.instance_base()) + u32::from(last.instance_budget()) <= 64);
    }

    #[test]
    fn test_instance_bases_are_disjoint() {
        let mut seen = 0u64;
        for kind in PuKind::ALL {
            for instance in 0..kind.instance_budget() {
                let bit = 1u64 << (kind.instance_base() + instance);
                assert_eq!(seen & bit, 0, "{kind}.{instance} collides");
                seen |= bit;
            }
        }
    }

    #[test]
    fn test_port_counts() {
        assert_eq!(PuKind::DmaIn.in_ports(), 0);
        assert_eq!(PuKind::DmaIn.out_ports(), 1);
        assert_eq!(PuKind::DmaOut.in_ports(), 1);
        assert_eq!(PuKind::DmaOut.out_ports(), 0);
        assert_eq!(PuKind::Joiner.in_ports(), 4);
        assert_eq!(PuKind::Duplicator.out_ports(), 4);
        assert_eq!(PuKind::Flow.in_ports(), 2);
        assert_eq!(PuKind::Flow.out_ports(), 2);
        assert_eq!(PuKind::Salb.in_ports(), 1);
        assert_eq!(PuKind::Calb.in_ports(), 2);
    }

    #[test]
    fn test_from_str_loose() {
        assert_eq!(PuKind::from_str_loose("dma_in"), Some(PuKind::DmaIn));
        assert_eq!(PuKind::from_str_loose("DMA-OUT"), Some(PuKind::DmaOut));
        assert_eq!(PuKind::from_str_loose("map2list"), Some(PuKind::Map2List));
        assert_eq!(PuKind::from_str_loose("upscale"), Some(PuKind::Upscaler));
        assert_eq!(PuKind::from_str_loose("bogus"), None);
    }

    #[test]
    fn test_only_fifo_skips_size_node() {
        for kind in PuKind::ALL {
            assert_eq!(kind.demands_size_node(), kind != PuKind::Fifo);
        }
    }
}
