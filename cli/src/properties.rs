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

//! Properties command implementation for the FPGA diagnostic CLI.

use fpga_access::error::{FpgaError, ResultCode};
use fpga_access::properties::Properties;
use fpga_access::properties::set::PropertyField;
use fpga_access::token::Token;
use std::fmt::Display;
use std::path::PathBuf;

/// Append `name: value` to `out`, or nothing if the property is not available.
fn line<T: Display>(out: &mut String, name: &str, value: Result<T, FpgaError>) {
    match value {
        Ok(v) => out.push_str(&format!("{name:<20}{v}\n")),
        Err(e) if e.code() == ResultCode::NotFound || e.code() == ResultCode::InvalidParam => {}
        Err(e) => out.push_str(&format!("{name:<20}<{}>\n", e.code())),
    }
}

fn render(props: &Properties) -> String {
    let mut out = String::new();
    line(&mut out, "object type", props.object_type());
    line(
        &mut out,
        "parent",
        props.parent().map(|p| p.sysfs_path().display().to_string()),
    );
    line(&mut out, "guid", props.guid());
    line(
        &mut out,
        "pci address",
        props.bus().and_then(|b| {
            Ok(format!("{b:02x}:{:02x}.{:x}", props.device()?, props.function()?))
        }),
    );
    line(&mut out, "socket", props.socket_id());
    line(&mut out, "slots", props.num_slots());
    line(&mut out, "bbs id", props.bbs_id().map(|id| format!("{id:#018x}")));
    line(&mut out, "bbs version", props.bbs_version());
    line(&mut out, "state", props.accelerator_state());
    line(&mut out, "mmio spaces", props.num_mmio());
    line(&mut out, "interrupts", props.num_interrupts());
    let fields: Vec<String> = props
        .valid_fields()
        .iter()
        .map(|f: PropertyField| format!("{f:?}"))
        .collect();
    out.push_str(&format!("{:<20}{}", "valid", fields.join(" ")));
    out
}

/// Main handler for the properties command.
///
/// # Returns: `Result<String, FpgaError>`
/// * `Ok(String)` - One line per populated property
/// * `Err(FpgaError)` - The token could not be resolved
pub fn properties_handler(sysfs: PathBuf, dev: PathBuf) -> Result<String, FpgaError> {
    let token = Token::new(sysfs, dev);
    let props = Properties::from_token(&token)?;
    Ok(render(&props))
}
