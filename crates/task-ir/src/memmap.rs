// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backing-store descriptors: memmaps, external memory slots, internal RAM.
//!
//! A [`Memmap`] says *what* a DMA port reads or writes (geometry plus the
//! kind of backing store); an [`ExternalMem`] is the device-visible slot
//! that eventually holds a concrete buffer binding. The slot side is a
//! [`MemSlot`], so allied slots (a DMA-out feeding a later DMA-in) observe
//! one shared binding.

use crate::image::ImageDesc;
use crate::pu::PuId;
use device_mem::MemSlot;
use std::fmt;

/// Index of a memmap in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MemmapId(pub u16);

impl fmt::Display for MemmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memmap#{}", self.0)
    }
}

/// Index of an external-memory slot in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ExtMemId(pub u16);

impl fmt::Display for ExtMemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ext-mem#{}", self.0)
    }
}

/// Index of an internal-RAM bank record in its owning task's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RamId(pub u16);

impl fmt::Display for RamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ram#{}", self.0)
    }
}

/// What backs a memmap: a device-visible external slot or a fixed PU's
/// preloaded constant table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemmapBacking {
    External(ExtMemId),
    PreloadPu(PuId),
}

/// Geometry and backing of one memory region a DMA port touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memmap {
    pub backing: MemmapBacking,
    /// Must be fully populated before serialization; the spread pass fills
    /// zero fields on DMA-out memmaps from resolved dimensions.
    pub image: ImageDesc,
}

impl Memmap {
    /// A memmap backed by an external memory slot.
    pub fn external(ext: ExtMemId, image: ImageDesc) -> Self {
        Self {
            backing: MemmapBacking::External(ext),
            image,
        }
    }

    /// A memmap backed by a PU's preloaded constant table.
    pub fn preload(pu: PuId, image: ImageDesc) -> Self {
        Self {
            backing: MemmapBacking::PreloadPu(pu),
            image,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.backing, MemmapBacking::External(_))
    }

    /// The external slot behind this memmap, if externally backed.
    pub fn ext_mem(&self) -> Option<ExtMemId> {
        match self.backing {
            MemmapBacking::External(ext) => Some(ext),
            MemmapBacking::PreloadPu(_) => None,
        }
    }

    /// The preload source PU, if PU-backed.
    pub fn preload_pu(&self) -> Option<PuId> {
        match self.backing {
            MemmapBacking::PreloadPu(pu) => Some(pu),
            MemmapBacking::External(_) => None,
        }
    }

    pub fn summary(&self) -> String {
        match self.backing {
            MemmapBacking::External(ext) => format!("{} ({})", self.image, ext),
            MemmapBacking::PreloadPu(pu) => format!("{} (preload from {})", self.image, pu),
        }
    }
}

/// A device-visible memory slot.
///
/// I/O-boundary slots receive a caller-supplied buffer every invocation;
/// intermediate slots are allocated once by the runtime and bound to the
/// owning task interface for its lifetime.
#[derive(Debug, Default)]
pub struct ExternalMem {
    io: bool,
    /// Binding state. Shared with allied slots; see [`MemSlot::ally_with`].
    pub slot: MemSlot,
}

impl ExternalMem {
    /// An I/O-boundary slot (caller supplies the buffer per invocation).
    pub fn io() -> Self {
        Self {
            io: true,
            slot: MemSlot::new(),
        }
    }

    /// An intermediate slot (runtime allocates and owns the buffer).
    pub fn intermediate() -> Self {
        Self {
            io: false,
            slot: MemSlot::new(),
        }
    }

    pub fn is_io(&self) -> bool {
        self.io
    }
}

/// One internal-RAM bank reservation. Nothing cross-references these; they
/// are carried for the device's sake and never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalRam {
    pub bytes: u32,
    pub bank: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_accessors() {
        let ext = Memmap::external(ExtMemId(1), ImageDesc::new(64, 64, 1));
        assert!(ext.is_external());
        assert_eq!(ext.ext_mem(), Some(ExtMemId(1)));
        assert_eq!(ext.preload_pu(), None);

        let pre = Memmap::preload(PuId(3), ImageDesc::new(8, 8, 2));
        assert!(!pre.is_external());
        assert_eq!(pre.ext_mem(), None);
        assert_eq!(pre.preload_pu(), Some(PuId(3)));
    }

    #[test]
    fn test_slot_flavours() {
        assert!(ExternalMem::io().is_io());
        assert!(!ExternalMem::intermediate().is_io());
        assert!(!ExternalMem::intermediate().slot.is_bound());
    }

    #[test]
    fn test_summary_names_backing() {
        let m = Memmap::external(ExtMemId(0), ImageDesc::new(64, 64, 1));
        assert!(m.summary().contains("ext-mem#0"));
    }
}
