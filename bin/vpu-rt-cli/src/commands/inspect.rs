// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vpu-rt inspect` command: display the contents of a wire descriptor.
//!
//! Reads the raw header for the on-wire view, then decodes the full task
//! for the structural view: processing units, memory slots, and updatable
//! parameter targets.

use std::path::PathBuf;

use task_ir::descriptor::{WireHeader, HEADER_BYTES};
use task_ir::{ExtMemId, PuId, Resolved, Task, UpdatableId};

pub fn execute(descriptor: PathBuf, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&descriptor).map_err(|e| {
        anyhow::anyhow!("cannot read descriptor '{}': {e}", descriptor.display())
    })?;
    if bytes.len() < HEADER_BYTES {
        anyhow::bail!(
            "'{}' is {} bytes, shorter than a descriptor header ({} bytes)",
            descriptor.display(),
            bytes.len(),
            HEADER_BYTES,
        );
    }

    let header = WireHeader::read(&bytes);
    let task = Task::<Resolved>::from_descriptor(&bytes).map_err(|e| {
        anyhow::anyhow!("'{}' does not decode: {e}", descriptor.display())
    })?;

    if json {
        print_json(&descriptor, bytes.len(), &header, &task)?;
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           vpu-rt · Descriptor Inspector             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Header ─────────────────────────────────────────────────
    println!("  File: {} ({} bytes)", descriptor.display(), bytes.len());
    println!("   Task id:    {}", header.id);
    println!("   Priority:   {}", header.priority);
    println!("   Flags:      {:#06x}", header.flags);
    println!("   Total size: {} bytes (+4 trailer)", header.total_size);
    println!();

    println!("  {:<16} {:>8} {:>10}", "Section", "Count", "Offset");
    println!("  {}", "-".repeat(38));
    let sections: [(&str, u16, u32); 5] = [
        ("vertices", header.n_vertices, header.vertices_vec_ofs),
        ("subchains", header.n_subchains, header.sc_vec_ofs),
        ("processing", header.n_pus, header.pus_vec_ofs),
        ("3dnn bases", header.n_bases_3dnn, header.bases_3dnn_vec_ofs),
        ("invoke params", header.n_invoke_params, header.invoke_params_vec_ofs),
    ];
    for (name, count, offset) in sections {
        let offset = if offset == 0 {
            "-".to_string()
        } else {
            offset.to_string()
        };
        println!("  {:<16} {:>8} {:>10}", name, count, offset);
    }
    println!();

    // ── Processing Units ───────────────────────────────────────
    println!(
        "  {:<6} {:<14} {:>10} {:>8} {:<10}",
        "PU", "Kind", "Instance", "Wire", "Memmap",
    );
    println!("  {}", "-".repeat(54));
    for (i, pu) in task.pus().iter().enumerate() {
        let id = PuId(i as u16);
        let wire = task
            .wire_pu_index(id)
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".into());
        let memmap = pu
            .memmap()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<6} {:<14} {:>10} {:>8} {:<10}",
            id.0,
            pu.kind(),
            pu.instance(),
            wire,
            memmap,
        );
    }
    println!();

    // ── Memory Slots ───────────────────────────────────────────
    println!("  Memory slots:");
    for (i, ext) in task.external_mems().iter().enumerate() {
        let role = if ext.is_io() { "i/o" } else { "intermediate" };
        println!("   {:<6} {}", ExtMemId(i as u16), role);
    }
    println!();

    // ── Updatables ─────────────────────────────────────────────
    let updatables = task.updatables();
    if updatables.is_empty() {
        println!("  No updatable parameter targets.");
    } else {
        println!("  Updatable parameter targets:");
        for i in 0..updatables.len() {
            let id = UpdatableId(i as u16);
            let target = task
                .wire_updatable_target(id)
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".into());
            println!("   {:<6} wire target {}", id, target);
        }
    }
    println!();
    Ok(())
}

#[derive(serde::Serialize)]
struct HeaderView {
    id: u16,
    priority: u16,
    flags: u16,
    total_size: u32,
    n_vertices: u16,
    n_subchains: u16,
    n_pus: u16,
    n_bases_3dnn: u16,
    n_invoke_params: u16,
}

#[derive(serde::Serialize)]
struct PuView {
    index: u16,
    kind: String,
    instance: u8,
    wire: Option<u16>,
    memmap: Option<u16>,
}

#[derive(serde::Serialize)]
struct SlotView {
    index: u16,
    io: bool,
}

#[derive(serde::Serialize)]
struct InspectView {
    file: String,
    bytes: usize,
    header: HeaderView,
    pus: Vec<PuView>,
    slots: Vec<SlotView>,
    updatable_targets: Vec<Option<u32>>,
}

fn print_json(
    path: &PathBuf,
    bytes: usize,
    header: &WireHeader,
    task: &Task<Resolved>,
) -> anyhow::Result<()> {
    let view = InspectView {
        file: path.display().to_string(),
        bytes,
        header: HeaderView {
            id: header.id,
            priority: header.priority,
            flags: header.flags,
            total_size: header.total_size,
            n_vertices: header.n_vertices,
            n_subchains: header.n_subchains,
            n_pus: header.n_pus,
            n_bases_3dnn: header.n_bases_3dnn,
            n_invoke_params: header.n_invoke_params,
        },
        pus: task
            .pus()
            .iter()
            .enumerate()
            .map(|(i, pu)| {
                let id = PuId(i as u16);
                PuView {
                    index: id.0,
                    kind: pu.kind().to_string(),
                    instance: pu.instance(),
                    wire: task.wire_pu_index(id),
                    memmap: pu.memmap().map(|m| m.0),
                }
            })
            .collect(),
        slots: task
            .external_mems()
            .iter()
            .enumerate()
            .map(|(i, ext)| SlotView {
                index: i as u16,
                io: ext.is_io(),
            })
            .collect(),
        updatable_targets: (0..task.updatables().len())
            .map(|i| task.wire_updatable_target(UpdatableId(i as u16)))
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
