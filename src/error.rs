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

//! Error type shared by every module of the crate.
//!
//! [`FpgaError`] carries enough context to be logged on its own. Callers that only care about the
//! class of failure use [`FpgaError::code`], which collapses every variant onto [`ResultCode`].
//! The distinction between [`ResultCode::NotFound`] (not populated yet),
//! [`ResultCode::InvalidParam`] (not applicable to this object) and
//! [`ResultCode::NotSupported`] (never populated by this platform) is part of the API contract.

use log::error;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FpgaError {
    #[error("FpgaError::InvalidParam: {0}")]
    InvalidParam(String),
    #[error("FpgaError::NotFound: {0}")]
    NotFound(String),
    #[error("FpgaError::NoAccess: {0}")]
    NoAccess(String),
    #[error("FpgaError::NoMemory: {0}")]
    NoMemory(String),
    #[error("FpgaError::NotSupported: {0}")]
    NotSupported(String),
    #[error("FpgaError::Exception: An internal error occurred: {0}")]
    Exception(String),
    #[error("FpgaError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("FpgaError::IOReadLink: An IO error occurred when resolving link {file:?}: {e}")]
    IOReadLink { file: PathBuf, e: std::io::Error },
    #[error("FpgaError::IOOpen: An IO error occurred when opening {file:?}: {e}")]
    IOOpen { file: PathBuf, e: std::io::Error },
    #[error("FpgaError::Parse: Failed to parse {value:?} read from {file:?}: {reason}")]
    Parse {
        file: PathBuf,
        value: String,
        reason: String,
    },
    #[error("FpgaError::Ioctl: region info query for window {window} failed: {e}")]
    Ioctl { window: u32, e: nix::errno::Errno },
    #[error("FpgaError::Mmap: Unable to map window {window} ({size:#x} bytes at {offset:#x}): {e}")]
    Mmap {
        window: u32,
        size: u64,
        offset: u64,
        e: nix::errno::Errno,
    },
    #[error("FpgaError::Munmap: Unable to unmap window {window}: {e}")]
    Munmap { window: u32, e: nix::errno::Errno },
}

/// Coarse classification of an [`FpgaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    InvalidParam,
    NotFound,
    NoAccess,
    NoMemory,
    NotSupported,
    Exception,
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultCode::InvalidParam => "FPGA_INVALID_PARAM",
            ResultCode::NotFound => "FPGA_NOT_FOUND",
            ResultCode::NoAccess => "FPGA_NO_ACCESS",
            ResultCode::NoMemory => "FPGA_NO_MEMORY",
            ResultCode::NotSupported => "FPGA_NOT_SUPPORTED",
            ResultCode::Exception => "FPGA_EXCEPTION",
        };
        f.write_str(s)
    }
}

impl FpgaError {
    /// Map this error onto the result taxonomy exposed to callers.
    ///
    /// I/O failures while resolving sysfs scalars surface as `NotFound`: the attribute could not
    /// be read. So does a failed region info query, the driver does not know the window. Failed
    /// `mmap`/`munmap` calls surface as `InvalidParam`.
    pub fn code(&self) -> ResultCode {
        match self {
            FpgaError::InvalidParam(..) => ResultCode::InvalidParam,
            FpgaError::NotFound(..) => ResultCode::NotFound,
            FpgaError::NoAccess(..) => ResultCode::NoAccess,
            FpgaError::NoMemory(..) => ResultCode::NoMemory,
            FpgaError::NotSupported(..) => ResultCode::NotSupported,
            FpgaError::Exception(..) => ResultCode::Exception,
            FpgaError::IORead { .. } => ResultCode::NotFound,
            FpgaError::IOReadLink { .. } => ResultCode::NotFound,
            FpgaError::IOOpen { .. } => ResultCode::NotFound,
            FpgaError::Parse { .. } => ResultCode::Exception,
            FpgaError::Ioctl { .. } => ResultCode::NotFound,
            FpgaError::Mmap { .. } => ResultCode::InvalidParam,
            FpgaError::Munmap { .. } => ResultCode::InvalidParam,
        }
    }

    /// Log the error at `error` level and hand it back, for use in `map_err` chains.
    pub(crate) fn logged(self) -> Self {
        error!("{self}");
        self
    }
}
