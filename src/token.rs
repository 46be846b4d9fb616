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

//! Identity tokens.
//!
//! A [`Token`] names one hardware object: the sysfs directory describing it and the character
//! device node used to talk to it. Tokens are produced by enumeration, which lives outside this
//! crate; the helpers here build tokens for the standard driver layout.
//!
//! ```text
//! /sys/class/fpga/intel-fpga-dev.0
//! ├── device -> ../../../0000:5e:00.0
//! ├── intel-fpga-fme.0      <- device token, /dev/intel-fpga-fme.0
//! └── intel-fpga-port.0     <- accelerator token, /dev/intel-fpga-port.0
//! ```

use crate::config;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    sysfs_path: PathBuf,
    dev_path: PathBuf,
}

impl Token {
    pub fn new(sysfs_path: impl Into<PathBuf>, dev_path: impl Into<PathBuf>) -> Token {
        Token {
            sysfs_path: sysfs_path.into(),
            dev_path: dev_path.into(),
        }
    }

    /// Token for the management engine of card `device_id` below `class_dir`.
    pub fn device(class_dir: &Path, device_id: u32) -> Token {
        Self::for_object(class_dir, config::FPGA_SYSFS_FME, device_id)
    }

    /// Token for the port of card `device_id` below `class_dir`.
    pub fn accelerator(class_dir: &Path, device_id: u32) -> Token {
        Self::for_object(class_dir, config::FPGA_SYSFS_AFU, device_id)
    }

    fn for_object(class_dir: &Path, marker: &str, device_id: u32) -> Token {
        let object = format!("{marker}.{device_id}");
        Token {
            sysfs_path: class_dir
                .join(format!("{}.{device_id}", config::FPGA_SYSFS_DEV))
                .join(&object),
            dev_path: Path::new(config::FPGA_DEV_DIR).join(object),
        }
    }

    pub fn sysfs_path(&self) -> &Path {
        &self.sysfs_path
    }

    pub fn dev_path(&self) -> &Path {
        &self.dev_path
    }
}
