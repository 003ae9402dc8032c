// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vpu-rt build` command: compile a blueprint into a wire descriptor.
//!
//! Walks the whole offline path:
//! ```text
//! blueprint JSON → Task<Building> → resolve_sizes → Task<Resolved> → descriptor
//! ```

use std::path::PathBuf;

use task_ir::{PuId, TaskBlueprint};

pub fn execute(blueprint: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            vpu-rt · Blueprint Compiler              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Load ───────────────────────────────────────────────────
    let bp = TaskBlueprint::from_file(&blueprint).map_err(|e| {
        anyhow::anyhow!("failed to load blueprint '{}': {e}", blueprint.display())
    })?;

    println!("  Blueprint: {}", bp.name);
    println!("   Task id:  {}", bp.task_id);
    println!("   Priority: {}", bp.priority);
    println!("   Stages:   {}", bp.stages.len());
    println!();

    // ── Build + Resolve ────────────────────────────────────────
    println!("  [1/2] Building task graph and spreading sizes...");
    let task = bp.build()?.resolve_sizes()?;

    println!(
        "  {:<6} {:<14} {:>10} {:>8}",
        "PU", "Kind", "Instance", "Wire",
    );
    println!("  {}", "-".repeat(42));
    for (i, pu) in task.pus().iter().enumerate() {
        let id = PuId(i as u16);
        let wire = task
            .wire_pu_index(id)
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<6} {:<14} {:>10} {:>8}",
            id.0,
            pu.kind(),
            pu.instance(),
            wire,
        );
    }
    println!();

    // ── Emit ───────────────────────────────────────────────────
    println!("  [2/2] Emitting descriptor...");
    let descriptor = task.to_descriptor()?;
    std::fs::write(&output, &descriptor).map_err(|e| {
        anyhow::anyhow!("cannot write descriptor '{}': {e}", output.display())
    })?;

    println!(
        "        Wrote {} bytes ({} processing units) to {}",
        descriptor.len(),
        task.pus().len(),
        output.display(),
    );
    println!();
    Ok(())
}
