// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! cachex CLI entry point
//!
//! Runs an access trace through a simulated cache and reports per-access
//! outcomes and final statistics.

use std::path::PathBuf;

use clap::Parser;

use cachex::core::config::SimConfig;
use cachex::core::system::System;
use cachex::trace::{self, TraceOp};

/// Cycle-accurate write-back cache simulator
#[derive(Parser, Debug)]
#[command(name = "cachex", version, about)]
struct Args {
    /// Access trace file (R/W operations, one per line)
    trace: PathBuf,

    /// TOML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit final statistics as JSON instead of a table
    #[arg(long)]
    stats_json: bool,

    /// Write a save state of the final simulation state to this path
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            SimConfig::load(path)?
        }
        None => SimConfig::default(),
    };

    let ops = trace::load_trace(&args.trace)?;
    log::info!(
        "Running {} operations from {}",
        ops.len(),
        args.trace.display()
    );

    let mut system = System::new(&config)?;

    for (index, op) in ops.iter().enumerate() {
        match *op {
            TraceOp::Read { address } => {
                let response = system.read_word(address)?;
                println!(
                    "{:>5}  R 0x{:08X}           -> 0x{:08X}  {}",
                    index,
                    address,
                    response.data.unwrap_or(0) as u32,
                    if response.hit { "hit " } else { "miss" }
                );
            }
            TraceOp::Write { address, data } => {
                let response = system.write_word(address, data)?;
                println!(
                    "{:>5}  W 0x{:08X} 0x{:08X}               {}",
                    index,
                    address,
                    data as u32,
                    if response.hit { "hit " } else { "miss" }
                );
            }
        }
    }

    let stats = system.stats();
    if args.stats_json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        println!();
        println!("cycles:         {}", system.cycles());
        println!("accesses:       {}", stats.accesses());
        println!("hits:           {}", stats.hits);
        println!("misses:         {}", stats.misses);
        println!("evictions:      {}", stats.evictions);
        println!("fills:          {}", stats.fills);
        println!("write-throughs: {}", stats.write_throughs);
        println!("hit rate:       {:.1}%", stats.hit_rate());
    }

    if let Some(path) = &args.snapshot_out {
        system.snapshot()?.save(path)?;
        log::info!("Saved snapshot to {}", path.display());
    }

    Ok(())
}
