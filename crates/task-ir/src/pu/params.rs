// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-kind PU parameter payloads and their fixed 64-byte wire encoding.
//!
//! The core only interprets the payloads it has to read or write while
//! propagating sizes: DMA geometry, the resampler rationals, crop margins,
//! and the input-size prefix of the remaining blocks. Everything else is
//! carried verbatim in [`RawParams`] — the numeric semantics of a filter's
//! coefficient block belong to the firmware, not to this crate.
//!
//! Every payload encodes into exactly [`PU_PARAM_BYTES`] little-endian
//! bytes; reserved regions encode as zero.

use crate::descriptor::{get_u16, get_u32, put_u16, put_u32, NONE_U16, PU_PARAM_BYTES};
use crate::error::CodecError;
use crate::pu::kind::PuKind;

/// What a DMA moves: a raster image or an ROI-indexed point list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmaDataKind {
    #[default]
    Image,
    PointList,
}

impl DmaDataKind {
    fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DmaDataKind::Image),
            1 => Some(DmaDataKind::PointList),
            _ => None,
        }
    }
}

/// DMA payload: frozen image geometry plus the backing-store description
/// the codec needs to rebuild memmaps and external slots on import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DmaParams {
    pub width: u16,
    pub height: u16,
    pub pixel_bytes: u16,
    pub line_ofs: u32,
    /// Set when the backing memmap is an I/O-boundary external slot.
    pub io: bool,
    pub data_kind: DmaDataKind,
    /// Number of ROI slots for a point-list DMA (0 for plain images).
    pub roi_count: u8,
    /// External-memory slot index, when externally backed.
    pub ext_slot: Option<u16>,
    /// Backing PU (wire index) for preload-backed DMAs.
    pub preload_pu: Option<u16>,
}

impl DmaParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.width);
        put_u16(buf, 2, self.height);
        put_u16(buf, 4, self.pixel_bytes);
        put_u16(buf, 6, self.ext_slot.unwrap_or(NONE_U16));
        put_u32(buf, 8, self.line_ofs);
        buf[12] = u8::from(self.io);
        buf[13] = self.data_kind as u8;
        buf[14] = self.roi_count;
        put_u16(buf, 16, self.preload_pu.unwrap_or(NONE_U16));
    }

    fn read(buf: &[u8]) -> Result<Self, CodecError> {
        let io = match buf[12] {
            0 => false,
            1 => true,
            tag => return Err(CodecError::UnknownTag { entity: "dma io flag", tag }),
        };
        let data_kind = DmaDataKind::from_wire_tag(buf[13]).ok_or(CodecError::UnknownTag {
            entity: "dma data kind",
            tag: buf[13],
        })?;
        let ext_slot = match get_u16(buf, 6) {
            NONE_U16 => None,
            slot => Some(slot),
        };
        let preload_pu = match get_u16(buf, 16) {
            NONE_U16 => None,
            pu => Some(pu),
        };
        Ok(Self {
            width: get_u16(buf, 0),
            height: get_u16(buf, 2),
            pixel_bytes: get_u16(buf, 4),
            line_ofs: get_u32(buf, 8),
            io,
            data_kind,
            roi_count: buf[14],
            ext_slot,
            preload_pu,
        })
    }
}

/// Single-input ALB operations (second operand is an immediate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalbOp {
    #[default]
    Threshold,
    Add,
    Sub,
    Mult,
    AbsDiff,
    And,
    Or,
    Xor,
    Not,
    Min,
    Max,
}

impl SalbOp {
    fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SalbOp::Threshold),
            1 => Some(SalbOp::Add),
            2 => Some(SalbOp::Sub),
            3 => Some(SalbOp::Mult),
            4 => Some(SalbOp::AbsDiff),
            5 => Some(SalbOp::And),
            6 => Some(SalbOp::Or),
            7 => Some(SalbOp::Xor),
            8 => Some(SalbOp::Not),
            9 => Some(SalbOp::Min),
            10 => Some(SalbOp::Max),
            _ => None,
        }
    }
}

/// Single-input arithmetic-logic block payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SalbParams {
    pub in_width: u16,
    pub in_height: u16,
    pub op: SalbOp,
    /// Primary immediate (threshold level, addend, mask, …).
    pub operand: u32,
    /// Secondary immediate (upper band limit, …).
    pub operand2: u32,
}

impl SalbParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        buf[4] = self.op as u8;
        put_u32(buf, 8, self.operand);
        put_u32(buf, 12, self.operand2);
    }

    fn read(buf: &[u8]) -> Result<Self, CodecError> {
        let op = SalbOp::from_wire_tag(buf[4]).ok_or(CodecError::UnknownTag {
            entity: "salb op",
            tag: buf[4],
        })?;
        Ok(Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            op,
            operand: get_u32(buf, 8),
            operand2: get_u32(buf, 12),
        })
    }
}

/// Two-input ALB operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalbOp {
    #[default]
    Add,
    Sub,
    Mult,
    AbsDiff,
    And,
    Or,
    Xor,
    Min,
    Max,
}

impl CalbOp {
    fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CalbOp::Add),
            1 => Some(CalbOp::Sub),
            2 => Some(CalbOp::Mult),
            3 => Some(CalbOp::AbsDiff),
            4 => Some(CalbOp::And),
            5 => Some(CalbOp::Or),
            6 => Some(CalbOp::Xor),
            7 => Some(CalbOp::Min),
            8 => Some(CalbOp::Max),
            _ => None,
        }
    }
}

/// Two-input arithmetic-logic block payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CalbParams {
    pub in_width: u16,
    pub in_height: u16,
    pub op: CalbOp,
    /// Post-op right shift applied to the result.
    pub shift: u8,
}

impl CalbParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        buf[4] = self.op as u8;
        buf[5] = self.shift;
    }

    fn read(buf: &[u8]) -> Result<Self, CodecError> {
        let op = CalbOp::from_wire_tag(buf[4]).ok_or(CodecError::UnknownTag {
            entity: "calb op",
            tag: buf[4],
        })?;
        Ok(Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            op,
            shift: buf[5],
        })
    }
}

/// Resampler payload. The spread pass fills every field from the attached
/// scale node; builders normally leave this at its identity default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScalerParams {
    pub in_width: u16,
    pub in_height: u16,
    pub out_width: u16,
    pub out_height: u16,
    pub w_num: u16,
    pub w_den: u16,
    pub h_num: u16,
    pub h_den: u16,
}

impl Default for ScalerParams {
    fn default() -> Self {
        Self {
            in_width: 0,
            in_height: 0,
            out_width: 0,
            out_height: 0,
            w_num: 1,
            w_den: 1,
            h_num: 1,
            h_den: 1,
        }
    }
}

impl ScalerParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        put_u16(buf, 4, self.out_width);
        put_u16(buf, 6, self.out_height);
        put_u16(buf, 8, self.w_num);
        put_u16(buf, 10, self.w_den);
        put_u16(buf, 12, self.h_num);
        put_u16(buf, 14, self.h_den);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            out_width: get_u16(buf, 4),
            out_height: get_u16(buf, 6),
            w_num: get_u16(buf, 8),
            w_den: get_u16(buf, 10),
            h_num: get_u16(buf, 12),
            h_den: get_u16(buf, 14),
        }
    }
}

/// Crop-block payload; margins come from the attached crop node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropParams {
    pub in_width: u16,
    pub in_height: u16,
    pub out_width: u16,
    pub out_height: u16,
    pub left: u16,
    pub right: u16,
    pub top: u16,
    pub bottom: u16,
}

impl CropParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        put_u16(buf, 4, self.out_width);
        put_u16(buf, 6, self.out_height);
        put_u16(buf, 8, self.left);
        put_u16(buf, 10, self.right);
        put_u16(buf, 12, self.top);
        put_u16(buf, 14, self.bottom);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            out_width: get_u16(buf, 4),
            out_height: get_u16(buf, 6),
            left: get_u16(buf, 8),
            right: get_u16(buf, 10),
            top: get_u16(buf, 12),
            bottom: get_u16(buf, 14),
        }
    }
}

/// ROI-extractor payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoisParams {
    pub in_width: u16,
    pub in_height: u16,
    pub max_rois: u16,
    pub score_threshold: u32,
}

impl RoisParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        put_u16(buf, 4, self.max_rois);
        put_u32(buf, 8, self.score_threshold);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            max_rois: get_u16(buf, 4),
            score_threshold: get_u32(buf, 8),
        }
    }
}

/// Non-maximum-suppression payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NmsParams {
    pub in_width: u16,
    pub in_height: u16,
    /// Suppression window radius in pixels.
    pub window: u8,
    pub max_points: u16,
    pub threshold: u32,
}

impl NmsParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        buf[4] = self.window;
        put_u16(buf, 6, self.max_points);
        put_u32(buf, 8, self.threshold);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            window: buf[4],
            max_points: get_u16(buf, 6),
            threshold: get_u32(buf, 8),
        }
    }
}

/// Map-to-list payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Map2ListParams {
    pub in_width: u16,
    pub in_height: u16,
    pub max_entries: u16,
    pub threshold: u32,
}

impl Map2ListParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        put_u16(buf, 4, self.max_entries);
        put_u32(buf, 8, self.threshold);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            max_entries: get_u16(buf, 4),
            threshold: get_u32(buf, 8),
        }
    }
}

/// CNN-engine payload; the layer table itself lives in the vertex's
/// process base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CnnParams {
    pub in_width: u16,
    pub in_height: u16,
    pub n_layers: u16,
    /// Byte offset of the layer table in the preloaded base blob.
    pub base_ofs: u32,
}

impl CnnParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        put_u16(buf, 4, self.n_layers);
        put_u32(buf, 8, self.base_ofs);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            n_layers: get_u16(buf, 4),
            base_ofs: get_u32(buf, 8),
        }
    }
}

/// FIFO payload. No geometry: the FIFO is the one kind that carries no
/// size node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FifoParams {
    pub depth: u16,
    pub watermark: u16,
}

impl FifoParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.depth);
        put_u16(buf, 2, self.watermark);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            depth: get_u16(buf, 0),
            watermark: get_u16(buf, 2),
        }
    }
}

/// Opaque payload for the kinds whose internals the core never interprets.
/// Only the common input-size prefix is typed; the remaining 60 words pass
/// through the codec untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawParams {
    pub in_width: u16,
    pub in_height: u16,
    #[serde(with = "raw_words")]
    pub words: [u8; 60],
}

impl Default for RawParams {
    fn default() -> Self {
        Self {
            in_width: 0,
            in_height: 0,
            words: [0u8; 60],
        }
    }
}

impl RawParams {
    fn write(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.in_width);
        put_u16(buf, 2, self.in_height);
        buf[4..PU_PARAM_BYTES].copy_from_slice(&self.words);
    }

    fn read(buf: &[u8]) -> Self {
        let mut words = [0u8; 60];
        words.copy_from_slice(&buf[4..PU_PARAM_BYTES]);
        Self {
            in_width: get_u16(buf, 0),
            in_height: get_u16(buf, 2),
            words,
        }
    }
}

/// Serde shim for the 60-byte word block: serialized as a byte sequence,
/// shorter sequences are zero-padded on the way in.
mod raw_words {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(words: &[u8; 60], serializer: S) -> Result<S::Ok, S::Error> {
        words.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 60], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        if bytes.len() > 60 {
            return Err(serde::de::Error::custom(format!(
                "raw parameter block holds {} bytes, limit is 60",
                bytes.len()
            )));
        }
        let mut words = [0u8; 60];
        words[..bytes.len()].copy_from_slice(&bytes);
        Ok(words)
    }
}

/// The closed parameter union carried by every PU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuParams {
    Dma(DmaParams),
    Salb(SalbParams),
    Calb(CalbParams),
    Scaler(ScalerParams),
    Crop(CropParams),
    Rois(RoisParams),
    Nms(NmsParams),
    Map2List(Map2ListParams),
    Cnn(CnnParams),
    Fifo(FifoParams),
    Raw(RawParams),
}

impl PuParams {
    /// Default payload variant for a kind.
    pub fn default_for(kind: PuKind) -> PuParams {
        match kind {
            PuKind::DmaIn | PuKind::DmaOut => PuParams::Dma(DmaParams::default()),
            PuKind::Salb => PuParams::Salb(SalbParams::default()),
            PuKind::Calb => PuParams::Calb(CalbParams::default()),
            PuKind::Upscaler | PuKind::Downscaler => PuParams::Scaler(ScalerParams::default()),
            PuKind::Crop => PuParams::Crop(CropParams::default()),
            PuKind::Rois => PuParams::Rois(RoisParams::default()),
            PuKind::Nms => PuParams::Nms(NmsParams::default()),
            PuKind::Map2List => PuParams::Map2List(Map2ListParams::default()),
            PuKind::Cnn => PuParams::Cnn(CnnParams::default()),
            PuKind::Fifo => PuParams::Fifo(FifoParams::default()),
            _ => PuParams::Raw(RawParams::default()),
        }
    }

    /// Whether this payload variant is the one `kind` carries.
    pub fn matches_kind(&self, kind: PuKind) -> bool {
        matches!(
            (self, kind),
            (PuParams::Dma(_), PuKind::DmaIn | PuKind::DmaOut)
                | (PuParams::Salb(_), PuKind::Salb)
                | (PuParams::Calb(_), PuKind::Calb)
                | (PuParams::Scaler(_), PuKind::Upscaler | PuKind::Downscaler)
                | (PuParams::Crop(_), PuKind::Crop)
                | (PuParams::Rois(_), PuKind::Rois)
                | (PuParams::Nms(_), PuKind::Nms)
                | (PuParams::Map2List(_), PuKind::Map2List)
                | (PuParams::Cnn(_), PuKind::Cnn)
                | (PuParams::Fifo(_), PuKind::Fifo)
        ) || matches!(self, PuParams::Raw(_)) && PuParams::raw_kind(kind)
    }

    fn raw_kind(kind: PuKind) -> bool {
        matches!(
            kind,
            PuKind::Mde
                | PuKind::Ccm
                | PuKind::Lut
                | PuKind::Integral
                | PuKind::Slf5
                | PuKind::Slf7
                | PuKind::Glf5
                | PuKind::Nlf
                | PuKind::Duplicator
                | PuKind::Splitter
                | PuKind::Joiner
                | PuKind::Histogram
                | PuKind::Depth
                | PuKind::Disparity
                | PuKind::Inpaint
                | PuKind::Flow
        )
    }

    /// Variant name for diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            PuParams::Dma(_) => "dma",
            PuParams::Salb(_) => "salb",
            PuParams::Calb(_) => "calb",
            PuParams::Scaler(_) => "scaler",
            PuParams::Crop(_) => "crop",
            PuParams::Rois(_) => "rois",
            PuParams::Nms(_) => "nms",
            PuParams::Map2List(_) => "map2_list",
            PuParams::Cnn(_) => "cnn",
            PuParams::Fifo(_) => "fifo",
            PuParams::Raw(_) => "raw",
        }
    }

    /// Writes the resolved effective input size into the payload's geometry
    /// prefix. A no-op for FIFOs, which carry no geometry.
    pub fn set_input_size(&mut self, width: u16, height: u16) {
        match self {
            PuParams::Dma(p) => {
                p.width = width;
                p.height = height;
            }
            PuParams::Salb(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Calb(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Scaler(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Crop(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Rois(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Nms(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Map2List(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Cnn(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Raw(p) => {
                p.in_width = width;
                p.in_height = height;
            }
            PuParams::Fifo(_) => {}
        }
    }

    /// The payload's input geometry, if it carries one.
    pub fn input_size(&self) -> Option<(u16, u16)> {
        match self {
            PuParams::Dma(p) => Some((p.width, p.height)),
            PuParams::Salb(p) => Some((p.in_width, p.in_height)),
            PuParams::Calb(p) => Some((p.in_width, p.in_height)),
            PuParams::Scaler(p) => Some((p.in_width, p.in_height)),
            PuParams::Crop(p) => Some((p.in_width, p.in_height)),
            PuParams::Rois(p) => Some((p.in_width, p.in_height)),
            PuParams::Nms(p) => Some((p.in_width, p.in_height)),
            PuParams::Map2List(p) => Some((p.in_width, p.in_height)),
            PuParams::Cnn(p) => Some((p.in_width, p.in_height)),
            PuParams::Raw(p) => Some((p.in_width, p.in_height)),
            PuParams::Fifo(_) => None,
        }
    }

    /// Encodes the payload into its fixed wire block.
    pub fn encode(&self) -> [u8; PU_PARAM_BYTES] {
        let mut buf = [0u8; PU_PARAM_BYTES];
        match self {
            PuParams::Dma(p) => p.write(&mut buf),
            PuParams::Salb(p) => p.write(&mut buf),
            PuParams::Calb(p) => p.write(&mut buf),
            PuParams::Scaler(p) => p.write(&mut buf),
            PuParams::Crop(p) => p.write(&mut buf),
            PuParams::Rois(p) => p.write(&mut buf),
            PuParams::Nms(p) => p.write(&mut buf),
            PuParams::Map2List(p) => p.write(&mut buf),
            PuParams::Cnn(p) => p.write(&mut buf),
            PuParams::Fifo(p) => p.write(&mut buf),
            PuParams::Raw(p) => p.write(&mut buf),
        }
        buf
    }

    /// Decodes the payload variant `kind` carries from its wire block.
    pub fn decode(kind: PuKind, buf: &[u8]) -> Result<PuParams, CodecError> {
        debug_assert_eq!(buf.len(), PU_PARAM_BYTES);
        Ok(match kind {
            PuKind::DmaIn | PuKind::DmaOut => PuParams::Dma(DmaParams::read(buf)?),
            PuKind::Salb => PuParams::Salb(SalbParams::read(buf)?),
            PuKind::Calb => PuParams::Calb(CalbParams::read(buf)?),
            PuKind::Upscaler | PuKind::Downscaler => PuParams::Scaler(ScalerParams::read(buf)),
            PuKind::Crop => PuParams::Crop(CropParams::read(buf)),
            PuKind::Rois => PuParams::Rois(RoisParams::read(buf)),
            PuKind::Nms => PuParams::Nms(NmsParams::read(buf)),
            PuKind::Map2List => PuParams::Map2List(Map2ListParams::read(buf)),
            PuKind::Cnn => PuParams::Cnn(CnnParams::read(buf)),
            PuKind::Fifo => PuParams::Fifo(FifoParams::read(buf)),
            _ => PuParams::Raw(RawParams::read(buf)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dma_wire_roundtrip() {
        let params = PuParams::Dma(DmaParams {
            width: 64,
            height: 48,
            pixel_bytes: 2,
            line_ofs: 128,
            io: true,
            data_kind: DmaDataKind::Image,
            roi_count: 0,
            ext_slot: Some(3),
            preload_pu: None,
        });
        let wire = params.encode();
        assert_eq!(PuParams::decode(PuKind::DmaIn, &wire).unwrap(), params);
    }

    #[test]
    fn test_scaler_wire_roundtrip() {
        let params = PuParams::Scaler(ScalerParams {
            in_width: 65,
            in_height: 64,
            out_width: 33,
            out_height: 32,
            w_num: 1,
            w_den: 2,
            h_num: 1,
            h_den: 2,
        });
        let wire = params.encode();
        assert_eq!(PuParams::decode(PuKind::Downscaler, &wire).unwrap(), params);
    }

    #[test]
    fn test_raw_words_survive_the_wire() {
        let mut raw = RawParams {
            in_width: 32,
            in_height: 32,
            words: [0u8; 60],
        };
        for (i, w) in raw.words.iter_mut().enumerate() {
            *w = i as u8;
        }
        let wire = PuParams::Raw(raw).encode();
        match PuParams::decode(PuKind::Glf5, &wire).unwrap() {
            PuParams::Raw(back) => assert_eq!(back, raw),
            other => panic!("expected raw params, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_op_tag_rejected() {
        let mut wire = PuParams::Salb(SalbParams::default()).encode();
        wire[4] = 0x7F;
        assert!(matches!(
            PuParams::decode(PuKind::Salb, &wire),
            Err(CodecError::UnknownTag { entity: "salb op", .. })
        ));
    }

    #[test]
    fn test_factory_variants_match_their_kind() {
        for kind in PuKind::ALL {
            let params = PuParams::default_for(kind);
            assert!(params.matches_kind(kind), "{kind} factory mismatch");
        }
    }

    #[test]
    fn test_factory_variant_rejected_on_other_kind() {
        let salb = PuParams::default_for(PuKind::Salb);
        assert!(!salb.matches_kind(PuKind::Calb));
        let raw = PuParams::default_for(PuKind::Glf5);
        assert!(raw.matches_kind(PuKind::Nlf));
        assert!(!raw.matches_kind(PuKind::Salb));
    }

    #[test]
    fn test_set_input_size() {
        let mut dma = PuParams::default_for(PuKind::DmaIn);
        dma.set_input_size(64, 48);
        assert_eq!(dma.input_size(), Some((64, 48)));

        let mut fifo = PuParams::default_for(PuKind::Fifo);
        fifo.set_input_size(64, 48);
        assert_eq!(fifo.input_size(), None);
    }

    #[test]
    fn test_raw_params_json_padding() {
        let json = r#"{ "in_width": 16, "in_height": 8, "words": [1, 2, 3] }"#;
        let raw: RawParams = serde_json::from_str(json).unwrap();
        assert_eq!(raw.words[0], 1);
        assert_eq!(raw.words[2], 3);
        assert_eq!(raw.words[3], 0);
    }
}
