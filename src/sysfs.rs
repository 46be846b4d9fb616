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

//! Resolution of hardware identity scalars.
//!
//! Refreshing a property set needs a handful of raw values that the driver publishes in sysfs.
//! [`IdentityResolver`] is the seam between the property code and wherever those values come
//! from; [`SysfsResolver`] reads them from the intel-fpga class directory.
//!
//! # A sysfs map of one card
//!
//! ```text
//! /sys/class/fpga/intel-fpga-dev.0
//! ├── device -> ../../../0000:5e:00.0
//! ├── intel-fpga-fme.0
//! │   ├── bitstream_id
//! │   ├── ports_num
//! │   ├── pr
//! │   │   └── interface_id
//! │   └── socket_id
//! └── intel-fpga-port.0
//!     └── afu_id
//! ```

use crate::config;
use crate::error::FpgaError;
use crate::system_io::{fs_open_rw, fs_read, fs_read_link, fs_read_u64};
use crate::token::Token;
use crate::types::Bdf;
use log::trace;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Source of the raw identity values of a card, keyed by its numeric device id.
pub trait IdentityResolver {
    /// GUID of the accelerator function currently loaded behind the port.
    fn afu_id(&self, device_id: u32) -> Result<Uuid, FpgaError>;

    /// GUID of the partial-reconfiguration interface of the device.
    fn pr_interface_id(&self, device_id: u32) -> Result<Uuid, FpgaError>;

    /// Number of accelerator slots (ports) of the device.
    fn num_slots(&self, device_id: u32) -> Result<u32, FpgaError>;

    /// Raw id of the blue bitstream, including its packed version.
    fn bitstream_id(&self, device_id: u32) -> Result<u64, FpgaError>;

    fn socket_id(&self, device_id: u32) -> Result<u8, FpgaError>;

    /// PCIe address of the card whose class directory is `device_dir`.
    fn bdf(&self, device_dir: &Path) -> Result<Bdf, FpgaError>;

    /// The device token owning an accelerator token, if there is one.
    fn parent(&self, token: &Token) -> Option<Token>;

    /// Try to open `dev_path` exclusively, closing it again straight away.
    ///
    /// Returns `true` if the open succeeded, i.e. nobody else holds the node.
    fn probe_exclusive_open(&self, dev_path: &Path) -> bool;
}

/// Split the numeric device id off a sysfs object name such as `intel-fpga-dev.3`.
pub fn device_id_from_name(name: &str) -> Result<u32, FpgaError> {
    name.rsplit_once('.')
        .and_then(|(_, id)| id.parse::<u32>().ok())
        .ok_or_else(|| {
            FpgaError::InvalidParam(format!("Invalid token sysfs path: no device id in {name:?}"))
        })
}

/// [`IdentityResolver`] reading the intel-fpga sysfs class.
#[derive(Debug, Clone)]
pub struct SysfsResolver {
    root: PathBuf,
}

impl Default for SysfsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsResolver {
    /// Resolver for [`config::FPGA_CLASS_DIR`].
    pub fn new() -> Self {
        Self::with_root(config::FPGA_CLASS_DIR)
    }

    /// Resolver for a class directory at a different location.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        SysfsResolver { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn card_dir(&self, device_id: u32) -> PathBuf {
        self.root
            .join(format!("{}.{device_id}", config::FPGA_SYSFS_DEV))
    }

    fn fme_attr(&self, device_id: u32, attr: &str) -> PathBuf {
        self.card_dir(device_id)
            .join(format!("{}.{device_id}", config::FPGA_SYSFS_FME))
            .join(attr)
    }

    fn port_attr(&self, device_id: u32, attr: &str) -> PathBuf {
        self.card_dir(device_id)
            .join(format!("{}.{device_id}", config::FPGA_SYSFS_AFU))
            .join(attr)
    }
}

fn read_guid(path: &Path) -> Result<Uuid, FpgaError> {
    let contents = fs_read(path)?;
    let trimmed = contents.trim();
    Uuid::parse_str(trimmed).map_err(|e| FpgaError::Parse {
        file: path.into(),
        value: trimmed.to_string(),
        reason: e.to_string(),
    })
}

fn read_narrow<T: TryFrom<u64>>(path: &Path) -> Result<T, FpgaError> {
    let value = fs_read_u64(path)?;
    T::try_from(value).map_err(|_| FpgaError::Parse {
        file: path.into(),
        value: value.to_string(),
        reason: format!("does not fit in {}", std::any::type_name::<T>()),
    })
}

impl IdentityResolver for SysfsResolver {
    fn afu_id(&self, device_id: u32) -> Result<Uuid, FpgaError> {
        read_guid(&self.port_attr(device_id, config::SYSFS_AFU_ID))
    }

    fn pr_interface_id(&self, device_id: u32) -> Result<Uuid, FpgaError> {
        read_guid(&self.fme_attr(device_id, config::SYSFS_PR_INTERFACE_ID))
    }

    fn num_slots(&self, device_id: u32) -> Result<u32, FpgaError> {
        read_narrow(&self.fme_attr(device_id, config::SYSFS_NUM_SLOTS))
    }

    fn bitstream_id(&self, device_id: u32) -> Result<u64, FpgaError> {
        fs_read_u64(&self.fme_attr(device_id, config::SYSFS_BITSTREAM_ID))
    }

    fn socket_id(&self, device_id: u32) -> Result<u8, FpgaError> {
        read_narrow(&self.fme_attr(device_id, config::SYSFS_SOCKET_ID))
    }

    fn bdf(&self, device_dir: &Path) -> Result<Bdf, FpgaError> {
        let link = device_dir.join(config::SYSFS_DEVICE_LINK);
        let target = fs_read_link(&link)?;
        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                FpgaError::InvalidParam(format!("{link:?} does not point to a PCI device"))
            })?;
        trace!("{link:?} resolves to PCI device {name}");
        name.parse()
    }

    fn parent(&self, token: &Token) -> Option<Token> {
        let object = token.sysfs_path().file_name()?.to_str()?;
        if !object.starts_with(config::FPGA_SYSFS_AFU) {
            return None;
        }
        let device_id = device_id_from_name(object).ok()?;
        let fme = format!("{}.{device_id}", config::FPGA_SYSFS_FME);
        let fme_path = token.sysfs_path().parent()?.join(&fme);
        if !fme_path.exists() {
            trace!("{token:?} has no management engine at {fme_path:?}");
            return None;
        }
        Some(Token::new(fme_path, Path::new(config::FPGA_DEV_DIR).join(fme)))
    }

    fn probe_exclusive_open(&self, dev_path: &Path) -> bool {
        match fs_open_rw(dev_path) {
            Ok(_file) => true,
            Err(e) => {
                trace!("Probe open failed, treating accelerator as assigned: {e}");
                false
            }
        }
    }
}
