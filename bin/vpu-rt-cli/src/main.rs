// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # vpu-rt
//!
//! Command-line interface for the VPU task-graph runtime.
//!
//! ## Usage
//! ```bash
//! # Compile a blueprint into a wire descriptor
//! vpu-rt build --blueprint pipeline.json --output pipeline.bin
//!
//! # Inspect a compiled descriptor
//! vpu-rt inspect --descriptor pipeline.bin
//!
//! # Stream frames through the device
//! vpu-rt run --blueprint pipeline.json --frames 30
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vpu-rt",
    about = "Task-graph runtime for the vision accelerator",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (defaults apply when absent).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a blueprint into a wire descriptor file.
    Build {
        /// Path to the blueprint JSON.
        #[arg(short, long)]
        blueprint: std::path::PathBuf,

        /// Where to write the descriptor.
        #[arg(short, long)]
        output: std::path::PathBuf,
    },

    /// Inspect a descriptor: print the header, processing units, and slots.
    Inspect {
        /// Path to a compiled descriptor.
        #[arg(short, long)]
        descriptor: std::path::PathBuf,

        /// Emit machine-readable JSON instead of tables.
        #[arg(long)]
        json: bool,
    },

    /// Build a blueprint and stream frames through the device.
    Run {
        /// Path to the blueprint JSON.
        #[arg(short, long)]
        blueprint: std::path::PathBuf,

        /// Number of frames to stream.
        #[arg(short, long, default_value_t = 10)]
        frames: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { blueprint, output } => commands::build::execute(blueprint, output),
        Commands::Inspect { descriptor, json } => commands::inspect::execute(descriptor, json),
        Commands::Run { blueprint, frames } => {
            commands::run::execute(blueprint, frames, cli.config)
        }
    }
}
