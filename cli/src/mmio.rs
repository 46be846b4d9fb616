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

//! Peek and poke implementation for the FPGA diagnostic CLI.
//!
//! Each invocation opens the port device, maps the requested window, performs exactly one
//! access and closes the handle again, which unmaps the window.

use crate::parse_number;
use clap::Args;
use fpga_access::error::FpgaError;
use fpga_access::handle::FpgaHandle;
use fpga_access::token::Token;
use log::debug;
use std::path::PathBuf;

/// The register a peek or poke addresses.
#[derive(Args, Debug)]
pub struct Target {
    #[arg(long, help = "port device node, e.g. /dev/intel-fpga-port.0")]
    dev: PathBuf,
    #[arg(long, default_value_t = 0, help = "MMIO window index")]
    window: u32,
    #[arg(long, value_parser = parse_number, help = "byte offset, decimal or 0x-prefixed hex")]
    offset: u64,
    #[arg(long, help = "access 64 bits instead of 32")]
    wide: bool,
}

fn open(target: &Target) -> Result<FpgaHandle, FpgaError> {
    // Only the device node is needed to open a handle.
    let token = Token::new(PathBuf::new(), &target.dev);
    let handle = FpgaHandle::open(&token)?;
    handle.map_mmio(target.window)?;
    debug!("Mapped window {} of {:?}", target.window, target.dev);
    Ok(handle)
}

/// Main handler for the peek command.
///
/// # Returns: `Result<String, FpgaError>`
/// * `Ok(String)` - The register value, formatted as hex
/// * `Err(FpgaError)` - Opening, mapping or the read itself failed
pub fn peek_handler(target: &Target) -> Result<String, FpgaError> {
    let handle = open(target)?;
    let value = if target.wide {
        format!("{:#018x}", handle.read_mmio64(target.window, target.offset)?)
    } else {
        format!("{:#010x}", handle.read_mmio32(target.window, target.offset)?)
    };
    handle.close()?;
    Ok(value)
}

/// Main handler for the poke command.
///
/// A 32-bit poke of a value wider than 32 bits is refused before the device is opened.
pub fn poke_handler(target: &Target, value: u64) -> Result<String, FpgaError> {
    let narrow = if target.wide {
        None
    } else {
        Some(u32::try_from(value).map_err(|_| {
            FpgaError::InvalidParam(format!("{value:#x} does not fit in 32 bits, use --wide"))
        })?)
    };
    let handle = open(target)?;
    match narrow {
        Some(v) => handle.write_mmio32(target.window, target.offset, v)?,
        None => handle.write_mmio64(target.window, target.offset, value)?,
    }
    handle.close()?;
    Ok(format!(
        "wrote {value:#x} to window {} offset {:#x}",
        target.window, target.offset
    ))
}
