// This file is part of fpga_access, a userspace access layer for PCIe-attached FPGA accelerators.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fpga_access is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fpga_access is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! `fpgadiag`, a diagnostic front end for `fpga_access`.
//!
//! ```text
//! fpgadiag properties --sysfs /sys/class/fpga/intel-fpga-dev.0/intel-fpga-port.0 \
//!                     --dev /dev/intel-fpga-port.0
//! fpgadiag peek --dev /dev/intel-fpga-port.0 --window 0 --offset 0x18 --wide
//! fpgadiag poke --dev /dev/intel-fpga-port.0 --window 0 --offset 0x18 --value 0xdead --wide
//! ```
//!
//! On failure the error and its result code are printed to stderr and the exit status is 1.
//! Set `RUST_LOG=debug` (or `trace`) to see what the library does underneath.

mod mmio;
mod properties;

use clap::{Parser, Subcommand, arg, command};
use fpga_access::error::FpgaError;
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fpgadiag")]
#[command(bin_name = "fpgadiag")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every property that can be resolved for a token
    Properties {
        #[arg(long, help = "sysfs directory of the FME or port, e.g. \
            /sys/class/fpga/intel-fpga-dev.0/intel-fpga-port.0")]
        sysfs: PathBuf,
        #[arg(long, help = "device node of the same object, e.g. /dev/intel-fpga-port.0")]
        dev: PathBuf,
    },
    /// Read one register
    Peek {
        #[command(flatten)]
        target: mmio::Target,
    },
    /// Write one register
    Poke {
        #[command(flatten)]
        target: mmio::Target,
        #[arg(long, value_parser = parse_number, help = "value to write, decimal or 0x-prefixed hex")]
        value: u64,
    },
}

/// Parse a decimal or `0x`-prefixed hexadecimal number.
fn parse_number(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("{s:?} is not a number: {e}"))
}

fn run(command: Commands) -> Result<String, FpgaError> {
    match command {
        Commands::Properties { sysfs, dev } => properties::properties_handler(sysfs, dev),
        Commands::Peek { target } => mmio::peek_handler(&target),
        Commands::Poke { target, value } => mmio::poke_handler(&target, value),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    match run(cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}
