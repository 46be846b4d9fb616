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

//! Building a property set from an identity token.
//!
//! The set is assembled completely in a local value before anything is returned, so a failure
//! to resolve any scalar leaves the caller's properties untouched.

use crate::config;
use crate::error::FpgaError;
use crate::properties::set::{
    AcceleratorAttributes, AttributeGroup, DeviceAttributes, PropertySet,
};
use crate::sysfs::{IdentityResolver, device_id_from_name};
use crate::token::Token;
use crate::types::{AcceleratorState, ObjectType, Version};
use log::{debug, trace};
use std::path::Path;

/// Decide whether `sysfs_path` names a device or an accelerator.
///
/// Exactly one of the two object markers must appear among the path components.
pub(crate) fn classify(sysfs_path: &Path) -> Result<ObjectType, FpgaError> {
    let has_marker = |marker: &str| {
        sysfs_path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with(marker))
    };
    match (has_marker(config::FPGA_SYSFS_FME), has_marker(config::FPGA_SYSFS_AFU)) {
        (true, false) => Ok(ObjectType::Device),
        (false, true) => Ok(ObjectType::Accelerator),
        (true, true) => Err(FpgaError::InvalidParam(format!(
            "Token sysfs path {sysfs_path:?} names both a device and an accelerator"
        ))),
        (false, false) => Err(FpgaError::InvalidParam(format!(
            "Token sysfs path {sysfs_path:?} names neither a device nor an accelerator"
        ))),
    }
}

/// Resolve every attribute of `token` into a fresh set.
pub(crate) fn resolve(
    token: &Token,
    resolver: &dyn IdentityResolver,
) -> Result<PropertySet, FpgaError> {
    // The token names an FME or a port; its parent directory is the card.
    let device_dir = token.sysfs_path().parent().ok_or_else(|| {
        FpgaError::InvalidParam(format!(
            "Invalid token sysfs path {:?}: no enclosing device",
            token.sysfs_path()
        ))
    })?;
    let device_name = device_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            FpgaError::InvalidParam(format!("Invalid token sysfs path {device_dir:?}"))
        })?;
    let device_id = device_id_from_name(device_name)?;
    let object_type = classify(token.sysfs_path())?;
    trace!("Resolving {object_type} properties of {token:?} (device id {device_id})");

    let mut set = PropertySet::default();
    match object_type {
        ObjectType::Accelerator => {
            set.guid = Some(resolver.afu_id(device_id)?);
            set.parent = resolver.parent(token);
            let state = if resolver.probe_exclusive_open(token.dev_path()) {
                AcceleratorState::Unassigned
            } else {
                AcceleratorState::Assigned
            };
            set.group = Some(AttributeGroup::Accelerator(AcceleratorAttributes {
                state: Some(state),
                num_mmio: Some(config::ACCELERATOR_NUM_MMIO),
                num_interrupts: Some(config::ACCELERATOR_NUM_INTERRUPTS),
            }));
        }
        ObjectType::Device => {
            set.guid = Some(resolver.pr_interface_id(device_id)?);
            let num_slots = resolver.num_slots(device_id)?;
            let bbs_id = resolver.bitstream_id(device_id)?;
            set.group = Some(AttributeGroup::Device(DeviceAttributes {
                num_slots: Some(num_slots),
                bbs_id: Some(bbs_id),
                bbs_version: Some(Version::from_bitstream_id(bbs_id)),
            }));
        }
    }

    let bdf = resolver.bdf(device_dir)?;
    set.bus = Some(bdf.bus);
    set.device = Some(bdf.device);
    set.function = Some(bdf.function);
    set.socket_id = Some(resolver.socket_id(device_id)?);

    debug!("Resolved {object_type} {token:?} at {bdf}");
    Ok(set)
}
