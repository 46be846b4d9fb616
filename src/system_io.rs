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

//! Error Wrapping File System I/O Helpers
//!
//! Thin wrappers around the standard library file system calls used to resolve sysfs
//! attributes and device nodes, converting failures to [`FpgaError`] with the path attached.
//! All functions trace-log the access.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpga_access::system_io::{fs_read, fs_read_link};
//! # use std::path::Path;
//! # fn example() -> Result<(), fpga_access::error::FpgaError> {
//! let socket = fs_read(Path::new("/sys/class/fpga/intel-fpga-dev.0/intel-fpga-fme.0/socket_id"))?;
//! let pci = fs_read_link(Path::new("/sys/class/fpga/intel-fpga-dev.0/device"))?;
//! # Ok(())
//! # }
//! ```

use crate::error::FpgaError;
use log::trace;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, FpgaError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(FpgaError::IORead)` - If the file cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, FpgaError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf: String = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(FpgaError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Read a sysfs attribute and parse it as an unsigned integer.
///
/// Sysfs prints these values either in decimal or as `0x`-prefixed hexadecimal, followed by a
/// newline. Both forms are accepted.
///
/// # Returns: `Result<u64, FpgaError>`
/// * `Ok(u64)` - The parsed value
/// * `Err(FpgaError::IORead)` - If the file cannot be read
/// * `Err(FpgaError::Parse)` - If the contents are not a number
pub fn fs_read_u64(file_path: &Path) -> Result<u64, FpgaError> {
    let contents = fs_read(file_path)?;
    let trimmed = contents.trim().trim_end_matches('\0');
    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|e| FpgaError::Parse {
        file: file_path.into(),
        value: trimmed.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve the target of a symbolic link without following it further.
///
/// # Returns: `Result<PathBuf, FpgaError>`
/// * `Ok(PathBuf)` - The (possibly relative) link target
/// * `Err(FpgaError::IOReadLink)` - If the path is not a link or cannot be read
pub fn fs_read_link(link_path: &Path) -> Result<PathBuf, FpgaError> {
    trace!("Attempting to resolve link {link_path:?}");
    std::fs::read_link(link_path).map_err(|e| FpgaError::IOReadLink {
        file: link_path.into(),
        e,
    })
}

/// Open a device node for reading and writing.
///
/// # Returns: `Result<File, FpgaError>`
/// * `Ok(File)` - The open node
/// * `Err(FpgaError::IOOpen)` - If the node cannot be opened (missing, busy, permissions, etc.)
pub fn fs_open_rw(dev_path: &Path) -> Result<File, FpgaError> {
    trace!("Attempting to open {dev_path:?} read/write");
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(dev_path)
        .map_err(|e| FpgaError::IOOpen {
            file: dev_path.into(),
            e,
        })
}
