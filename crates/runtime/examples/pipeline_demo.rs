// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Run a blueprint pipeline against the simulator node.
//!
//! Demonstrates the full path a task takes: blueprint JSON → task graph →
//! size spread → wire descriptor → device configuration → streamed frames,
//! with per-frame timing collected along the way.
//!
//! ```bash
//! cargo run -p runtime --example pipeline_demo
//! ```

use std::time::Instant;

use runtime::{BufferDesc, Invocation, Kernel, RunMetrics, RuntimeConfig, TaskBuffers, TaskIf};
use task_ir::{PuId, TaskBlueprint};

const BLUEPRINT: &str = r#"{
    "version": 1,
    "name": "blur-shrink-threshold",
    "task_id": 7,
    "input": { "width": 640, "height": 480, "pixel_bytes": 1 },
    "stages": [
        { "kind": "slf5" },
        { "kind": "downscaler",
          "scale": { "w_num": 1, "w_den": 2, "h_num": 1, "h_den": 2 } },
        { "kind": "salb",
          "params": { "salb": { "in_width": 0, "in_height": 0,
                                "op": "threshold",
                                "operand": 96, "operand2": 0 } } }
    ]
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    // Build and resolve the pipeline.
    let blueprint = TaskBlueprint::from_json(BLUEPRINT)?;
    let task = blueprint.build()?.resolve_sizes()?;

    println!("Pipeline '{}' (task {})\n", blueprint.name, task.id());
    println!("{:<6} {:<14} {:>10} {:>8}", "PU", "Kind", "Instance", "Wire");
    println!("{}", "-".repeat(42));
    for (i, pu) in task.pus().iter().enumerate() {
        let id = PuId(i as u16);
        let wire = task
            .wire_pu_index(id)
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".into());
        println!("{:<6} {:<14} {:>10} {:>8}", id.0, pu.kind(), pu.instance(), wire);
    }

    let descriptor = task.to_descriptor()?;
    println!("\nDescriptor: {} bytes\n", descriptor.len());

    // Bring the simulator up.
    let config = RuntimeConfig::default();
    let allocator = config.create_allocator()?;
    let mut kernel = Kernel::new("demo");
    kernel.add_taskif(TaskIf::new(task, config.create_node()?));
    kernel.setup_driver(allocator.as_ref())?;

    // Stream frames and collect timing.
    let frames = 10u32;
    let mut metrics = RunMetrics::new(1);
    let start = Instant::now();

    println!("{:<8} {:>16} {:>16}", "Frame", "Queue-done us", "On-device us");
    println!("{}", "-".repeat(42));
    for frame in 0..frames {
        let invocation = Invocation {
            frame_id: frame,
            buffers: vec![TaskBuffers {
                io_in: vec![BufferDesc { fd: 10, len: 640 * 480, roi: None }],
                io_out: vec![BufferDesc { fd: 11, len: 320 * 240, roi: None }],
            }],
        };
        let results = kernel.kernel_function(&invocation)?;
        for result in &results {
            println!(
                "{:<8} {:>16} {:>16}",
                result.frame_id,
                result.timing.queue_to_done().as_micros(),
                result.timing.device_residency().as_micros(),
            );
            metrics.record_frame(result);
        }
    }
    metrics.finalise(start.elapsed(), allocator.stats().peak_bytes);

    println!("\n{}", metrics.summary());
    println!("{}", allocator.stats().summary());

    kernel.teardown()?;
    Ok(())
}
