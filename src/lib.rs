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

//! Userspace access to PCIe-attached FPGA accelerators.
//!
//! The crate exposes two independent objects:
//!
//! * [`handle::FpgaHandle`], an open port device. Register windows are mapped into the process
//!   with [`FpgaHandle::map_mmio`](handle::FpgaHandle::map_mmio) and accessed with aligned,
//!   bounds-checked volatile reads and writes. Every mapping is recorded in a
//!   [`registry::ResourceRegistry`] owned by the handle.
//! * [`properties::Properties`], a sparse description of a device or accelerator, refreshed
//!   from an identity [`token::Token`] through sysfs.
//!
//! Both are safe to share between threads; each one serializes its own operations.
//! Errors are [`error::FpgaError`] values, which map onto the coarse [`error::ResultCode`]
//! taxonomy through [`FpgaError::code`](error::FpgaError::code).

pub mod config;
pub mod device;
pub mod error;
pub mod handle;
pub mod mmio;
pub mod properties;
pub mod registry;
pub mod sysfs;
pub mod system_io;
pub mod token;
pub mod types;
