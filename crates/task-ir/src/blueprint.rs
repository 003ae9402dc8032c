// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON pipeline blueprints.
//!
//! A blueprint describes a linear processing pipeline: an input image, an
//! ordered list of hardware stages, and optionally the output geometry.
//! [`TaskBlueprint::build`] turns it into a [`Task`] with the standard
//! start → process → end shape, a single hardware subchain, and implicit
//! DMA endpoints: stage lists never name `dma_in`/`dma_out`, the builder
//! adds them around the chain and binds them to two I/O memory slots.
//!
//! # Format
//! ```json
//! {
//!   "version": 1,
//!   "name": "blur-shrink-threshold",
//!   "task_id": 11,
//!   "priority": 2,
//!   "input": { "width": 64, "height": 48, "pixel_bytes": 1 },
//!   "stages": [
//!     { "kind": "slf5" },
//!     { "kind": "downscaler",
//!       "scale": { "w_num": 1, "w_den": 2, "h_num": 1, "h_den": 2 } },
//!     { "kind": "salb",
//!       "params": { "salb": { "in_width": 0, "in_height": 0,
//!                             "op": "threshold",
//!                             "operand": 96, "operand2": 0 } } }
//!   ]
//! }
//! ```
//!
//! An empty stage list is legal and builds a plain DMA copy task.

use std::collections::HashSet;
use std::path::Path;

use size_graph::{Cropper, Scaler, SizeNodeId};

use crate::error::{BlueprintError, GraphError};
use crate::image::ImageDesc;
use crate::memmap::{ExternalMem, MemmapBacking};
use crate::pu::{PuKind, PuParams};
use crate::task::{Building, Task};
use crate::vertex::VertexKind;

/// Schema version this build reads and writes.
pub const BLUEPRINT_VERSION: u32 = 1;

fn default_version() -> u32 {
    BLUEPRINT_VERSION
}

/// Top-level pipeline blueprint, deserialized from JSON.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskBlueprint {
    /// Schema version; defaults to the current one.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Human-readable pipeline name.
    pub name: String,
    /// Task id stamped into the descriptor header.
    pub task_id: u16,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: u16,
    /// Geometry of the frame the input DMA reads.
    pub input: BlueprintImage,
    /// Hardware stages, in stream order.
    pub stages: Vec<BlueprintStage>,
    /// Output geometry; omitted fields are filled by the size-spread pass.
    pub output: Option<BlueprintImage>,
}

/// Image geometry as the blueprint states it.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct BlueprintImage {
    pub width: u16,
    pub height: u16,
    pub pixel_bytes: u16,
}

impl BlueprintImage {
    fn image(&self) -> ImageDesc {
        ImageDesc::new(self.width, self.height, self.pixel_bytes)
    }
}

/// One hardware stage in the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlueprintStage {
    /// Block kind name (see [`PuKind::from_str_loose`] for aliases).
    pub kind: String,
    /// Physical instance number; defaults to 0.
    #[serde(default)]
    pub instance: u8,
    /// Rational resize factors; required for scaler kinds.
    pub scale: Option<Scaler>,
    /// Margin trims; required for crop stages.
    pub crop: Option<Cropper>,
    /// Hardware parameter payload; defaults per kind when omitted.
    pub params: Option<PuParams>,
}

fn stage_err(stage: usize, detail: String) -> BlueprintError {
    BlueprintError::Graph(GraphError::Blueprint { stage, detail })
}

impl TaskBlueprint {
    /// Loads a blueprint from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, BlueprintError> {
        let content = std::fs::read_to_string(path)?;
        let blueprint: Self = serde_json::from_str(&content)?;
        Ok(blueprint)
    }

    /// Parses a blueprint from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, BlueprintError> {
        let blueprint: Self = serde_json::from_str(json)?;
        Ok(blueprint)
    }

    /// Validates that the blueprint is internally consistent.
    ///
    /// Checks:
    /// - The schema version is supported.
    /// - The input geometry is fully specified.
    /// - Every stage kind is recognised, is not a DMA endpoint, and takes
    ///   exactly one input stream.
    /// - Instance numbers stay inside the per-kind hardware budget with no
    ///   (kind, instance) pair used twice.
    /// - Scaler stages carry non-degenerate scale factors; crop stages
    ///   carry margins; explicit payloads match their stage's kind.
    pub fn validate(&self) -> Result<(), BlueprintError> {
        if self.version != BLUEPRINT_VERSION {
            return Err(BlueprintError::Version {
                version: self.version,
                supported: BLUEPRINT_VERSION,
            });
        }

        if self.input.width == 0 || self.input.height == 0 || self.input.pixel_bytes == 0 {
            return Err(BlueprintError::Schema {
                detail: "input geometry must be fully specified".into(),
            });
        }

        let mut claimed = HashSet::new();
        for (i, stage) in self.stages.iter().enumerate() {
            let kind = PuKind::from_str_loose(&stage.kind)
                .ok_or_else(|| stage_err(i, format!("unrecognised kind '{}'", stage.kind)))?;

            if kind.is_dma() {
                return Err(stage_err(i, "dma endpoints are implicit".into()));
            }
            if kind.in_ports() != 1 {
                return Err(stage_err(
                    i,
                    format!(
                        "{kind} takes {} input streams; blueprints describe single-stream pipelines",
                        kind.in_ports()
                    ),
                ));
            }
            if stage.instance >= kind.instance_budget() {
                return Err(stage_err(
                    i,
                    format!(
                        "instance {} out of range (budget {})",
                        stage.instance,
                        kind.instance_budget()
                    ),
                ));
            }
            if !claimed.insert((kind, stage.instance)) {
                return Err(stage_err(
                    i,
                    format!("{kind}.{} already used by an earlier stage", stage.instance),
                ));
            }

            match kind {
                PuKind::Upscaler | PuKind::Downscaler => {
                    let scale = stage
                        .scale
                        .ok_or_else(|| stage_err(i, "scaler stage without a scale factor".into()))?;
                    if scale.w_num == 0 || scale.w_den == 0 || scale.h_num == 0 || scale.h_den == 0
                    {
                        return Err(stage_err(i, "scale factors must be non-zero".into()));
                    }
                }
                PuKind::Crop => {
                    if stage.crop.is_none() {
                        return Err(stage_err(i, "crop stage without margins".into()));
                    }
                }
                _ => {}
            }

            if let Some(params) = &stage.params {
                if !params.matches_kind(kind) {
                    return Err(stage_err(
                        i,
                        format!("{kind} cannot carry '{}' parameters", params.variant_name()),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Builds the blueprint into a task graph, ready for the size-spread
    /// pass.
    ///
    /// Steps:
    /// 1. Validate the blueprint.
    /// 2. Lay down the start → process → end skeleton with one hardware
    ///    subchain and two I/O memory slots.
    /// 3. Add the input DMA reading the declared frame.
    /// 4. Chain each stage behind the previous one, growing the size graph
    ///    (scale and crop stages add transform nodes; FIFOs are pure
    ///    plumbing and get no node).
    /// 5. Close with the output DMA; its geometry stays open unless the
    ///    blueprint declared one, and the spread pass fills the rest.
    pub fn build(&self) -> Result<Task<Building>, BlueprintError> {
        self.validate()?;

        let mut task = Task::new(self.task_id, self.priority);
        let start = task.add_vertex(VertexKind::Start)?;
        let process = task.add_vertex(VertexKind::Process)?;
        let end = task.add_vertex(VertexKind::End)?;
        task.add_edge(start, process)?;
        task.add_edge(process, end)?;
        let sc = task.add_hw_subchain(process)?;

        let in_mem = task.add_external_mem(ExternalMem::io())?;
        let out_mem = task.add_external_mem(ExternalMem::io())?;
        let in_map = task.add_memmap(MemmapBacking::External(in_mem), self.input.image())?;
        let out_image = match &self.output {
            Some(img) => img.image(),
            // Extent flows from the spread pass; only the depth is pinned.
            None => ImageDesc {
                width: 0,
                height: 0,
                pixel_bytes: self.input.pixel_bytes,
                line_ofs: 0,
            },
        };
        let out_map = task.add_memmap(MemmapBacking::External(out_mem), out_image)?;

        let root = task.sizes_mut().add_inout(None)?;
        let dma_in = task.add_pu(
            sc,
            PuKind::DmaIn,
            0,
            PuParams::default_for(PuKind::DmaIn),
            Some(root),
        )?;
        task.set_memmap(dma_in, in_map)?;

        let mut tail = dma_in;
        let mut tail_node = root;
        for (i, stage) in self.stages.iter().enumerate() {
            let kind = PuKind::from_str_loose(&stage.kind)
                .ok_or_else(|| stage_err(i, format!("unrecognised kind '{}'", stage.kind)))?;

            let node: Option<SizeNodeId> = match kind {
                PuKind::Fifo => None,
                PuKind::Upscaler | PuKind::Downscaler => {
                    let scale = stage
                        .scale
                        .ok_or_else(|| stage_err(i, "scaler stage without a scale factor".into()))?;
                    Some(task.sizes_mut().add_scale(tail_node, scale)?)
                }
                PuKind::Crop => {
                    let crop = stage
                        .crop
                        .ok_or_else(|| stage_err(i, "crop stage without margins".into()))?;
                    Some(task.sizes_mut().add_crop(tail_node, crop)?)
                }
                _ => Some(task.sizes_mut().add_inout(Some(tail_node))?),
            };
            let params = stage.params.unwrap_or_else(|| PuParams::default_for(kind));

            let pu = task
                .add_pu(sc, kind, stage.instance, params, node)
                .map_err(|e| stage_err(i, e.to_string()))?;
            task.connect(tail, 0, pu, 0)
                .map_err(|e| stage_err(i, e.to_string()))?;

            tail = pu;
            if let Some(n) = node {
                tail_node = n;
            }
        }

        let dma_out = task.add_pu(
            sc,
            PuKind::DmaOut,
            0,
            PuParams::default_for(PuKind::DmaOut),
            Some(tail_node),
        )?;
        task.set_memmap(dma_out, out_map)?;
        task.connect(tail, 0, dma_out, 0)?;

        tracing::debug!(
            task = self.task_id,
            stages = self.stages.len(),
            "blueprint '{}' built",
            self.name,
        );
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pu::PuId;

    fn sample_blueprint_json() -> &'static str {
        r#"{
            "version": 1,
            "name": "blur-shrink-threshold",
            "task_id": 11,
            "priority": 2,
            "input": { "width": 64, "height": 48, "pixel_bytes": 1 },
            "stages": [
                { "kind": "slf5" },
                { "kind": "downscaler",
                  "scale": { "w_num": 1, "w_den": 2, "h_num": 1, "h_den": 2 } },
                { "kind": "salb",
                  "params": { "salb": { "in_width": 0, "in_height": 0,
                                        "op": "threshold",
                                        "operand": 96, "operand2": 0 } } }
            ]
        }"#
    }

    #[test]
    fn test_parse_blueprint() {
        let bp = TaskBlueprint::from_json(sample_blueprint_json()).unwrap();
        assert_eq!(bp.name, "blur-shrink-threshold");
        assert_eq!(bp.task_id, 11);
        assert_eq!(bp.priority, 2);
        assert_eq!(bp.stages.len(), 3);
        assert_eq!(bp.stages[1].kind, "downscaler");
        assert!(bp.output.is_none());
    }

    #[test]
    fn test_validate_ok() {
        let bp = TaskBlueprint::from_json(sample_blueprint_json()).unwrap();
        bp.validate().unwrap();
    }

    #[test]
    fn test_version_defaults_when_omitted() {
        let json = r#"{
            "name": "bare", "task_id": 1,
            "input": { "width": 8, "height": 8, "pixel_bytes": 1 },
            "stages": []
        }"#;
        let bp = TaskBlueprint::from_json(json).unwrap();
        assert_eq!(bp.version, BLUEPRINT_VERSION);
        bp.validate().unwrap();
    }

    #[test]
    fn test_future_version_rejected() {
        let json = r#"{
            "version": 2, "name": "future", "task_id": 1,
            "input": { "width": 8, "height": 8, "pixel_bytes": 1 },
            "stages": []
        }"#;
        let bp = TaskBlueprint::from_json(json).unwrap();
        assert!(matches!(
            bp.validate(),
            Err(BlueprintError::Version { version: 2, .. })
        ));
    }

    fn one_stage_blueprint(stage_json: &str) -> TaskBlueprint {
        let json = format!(
            r#"{{
                "name": "t", "task_id": 1,
                "input": {{ "width": 16, "height": 16, "pixel_bytes": 1 }},
                "stages": [{stage_json}]
            }}"#
        );
        TaskBlueprint::from_json(&json).unwrap()
    }

    #[test]
    fn test_validate_rejects_unknown_kind() {
        let bp = one_stage_blueprint(r#"{ "kind": "warp" }"#);
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_explicit_dma_stage() {
        let bp = one_stage_blueprint(r#"{ "kind": "dma_in" }"#);
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_multi_input_kind() {
        let bp = one_stage_blueprint(r#"{ "kind": "calb" }"#);
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_instance() {
        let json = r#"{
            "name": "dup", "task_id": 1,
            "input": { "width": 16, "height": 16, "pixel_bytes": 1 },
            "stages": [{ "kind": "slf5" }, { "kind": "slf5" }]
        }"#;
        let bp = TaskBlueprint::from_json(json).unwrap();
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_scaler_without_factor() {
        let bp = one_stage_blueprint(r#"{ "kind": "upscaler" }"#);
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_scale_denominator() {
        let bp = one_stage_blueprint(
            r#"{ "kind": "upscaler",
                 "scale": { "w_num": 2, "w_den": 0, "h_num": 2, "h_den": 1 } }"#,
        );
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_params() {
        let bp = one_stage_blueprint(
            r#"{ "kind": "slf5",
                 "params": { "salb": { "in_width": 0, "in_height": 0,
                                       "op": "add", "operand": 1, "operand2": 0 } } }"#,
        );
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_build_resolves_geometry() {
        let bp = TaskBlueprint::from_json(sample_blueprint_json()).unwrap();
        let resolved = bp.build().unwrap().resolve_sizes().unwrap();

        // dma_in, slf5, downscaler, salb, dma_out.
        assert_eq!(resolved.pus().len(), 5);

        let PuParams::Dma(out) = resolved.pu(PuId(4)).unwrap().params else {
            panic!("output stage is not a dma");
        };
        assert_eq!((out.width, out.height), (32, 24));
        assert_eq!(out.pixel_bytes, 1);
        assert!(out.io);
        assert_eq!(out.ext_slot, Some(1));

        // The threshold stage saw the downscaled frame.
        assert_eq!(
            resolved.pu(PuId(3)).unwrap().params.input_size(),
            Some((32, 24))
        );

        let bytes = resolved.to_descriptor().unwrap();
        let decoded = Task::from_descriptor(&bytes).unwrap();
        assert_eq!(decoded.to_descriptor().unwrap(), bytes);
    }

    #[test]
    fn test_build_empty_stage_list_is_plain_copy() {
        let json = r#"{
            "name": "copy", "task_id": 3,
            "input": { "width": 64, "height": 48, "pixel_bytes": 2 },
            "stages": []
        }"#;
        let bp = TaskBlueprint::from_json(json).unwrap();
        let resolved = bp.build().unwrap().resolve_sizes().unwrap();
        assert_eq!(resolved.pus().len(), 2);

        let PuParams::Dma(out) = resolved.pu(PuId(1)).unwrap().params else {
            panic!("output stage is not a dma");
        };
        assert_eq!((out.width, out.height, out.pixel_bytes), (64, 48, 2));
        assert_eq!(out.line_ofs, 128);
    }

    #[test]
    fn test_build_fifo_stage_needs_no_size_node() {
        let json = r#"{
            "name": "buffered-copy", "task_id": 5,
            "input": { "width": 32, "height": 32, "pixel_bytes": 1 },
            "stages": [{ "kind": "fifo" }]
        }"#;
        let bp = TaskBlueprint::from_json(json).unwrap();
        let task = bp.build().unwrap();
        assert!(task.pu(PuId(1)).unwrap().size_node().is_none());

        let resolved = task.resolve_sizes().unwrap();
        let PuParams::Dma(out) = resolved.pu(PuId(2)).unwrap().params else {
            panic!("output stage is not a dma");
        };
        assert_eq!((out.width, out.height), (32, 32));
    }

    #[test]
    fn test_build_honours_declared_output_surface() {
        // Declared output is larger than the resolved frame: the pipeline
        // writes a cropped result into a bigger surface.
        let json = r#"{
            "name": "trim", "task_id": 6,
            "input": { "width": 64, "height": 48, "pixel_bytes": 1 },
            "stages": [{ "kind": "crop",
                         "crop": { "left": 2, "right": 2, "top": 1, "bottom": 1 } }],
            "output": { "width": 64, "height": 48, "pixel_bytes": 1 }
        }"#;
        let bp = TaskBlueprint::from_json(json).unwrap();
        let resolved = bp.build().unwrap().resolve_sizes().unwrap();

        let PuParams::Dma(out) = resolved.pu(PuId(2)).unwrap().params else {
            panic!("output stage is not a dma");
        };
        assert_eq!((out.width, out.height), (64, 48));

        let PuParams::Crop(crop) = resolved.pu(PuId(1)).unwrap().params else {
            panic!("crop stage lost its payload");
        };
        assert_eq!((crop.out_width, crop.out_height), (60, 46));
    }

    #[test]
    fn test_serde_roundtrip() {
        let bp = TaskBlueprint::from_json(sample_blueprint_json()).unwrap();
        let json = serde_json::to_string_pretty(&bp).unwrap();
        let back = TaskBlueprint::from_json(&json).unwrap();
        assert_eq!(back.name, bp.name);
        assert_eq!(back.task_id, bp.task_id);
        assert_eq!(back.stages.len(), bp.stages.len());
    }
}
