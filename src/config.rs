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

/// The driver-decided location of the intel-fpga class objects. Typically `/sys/class/fpga/`.
pub static FPGA_CLASS_DIR: &str = "/sys/class/fpga/";

/// Directory holding the character device nodes of ports and management engines.
pub static FPGA_DEV_DIR: &str = "/dev/";

/// Prefix of the per-card directory inside [`FPGA_CLASS_DIR`], suffixed with `.<device id>`.
pub static FPGA_SYSFS_DEV: &str = "intel-fpga-dev";

/// Path marker of an accelerator (port / AFU) object.
pub static FPGA_SYSFS_AFU: &str = "intel-fpga-port";

/// Path marker of a device (FPGA management engine) object.
pub static FPGA_SYSFS_FME: &str = "intel-fpga-fme";

/// Attribute files read from sysfs, relative to the port or FME directory.
pub static SYSFS_AFU_ID: &str = "afu_id";
pub static SYSFS_PR_INTERFACE_ID: &str = "pr/interface_id";
pub static SYSFS_NUM_SLOTS: &str = "ports_num";
pub static SYSFS_BITSTREAM_ID: &str = "bitstream_id";
pub static SYSFS_SOCKET_ID: &str = "socket_id";

/// Link from the card directory to its PCIe function, e.g. `../../../0000:5e:00.0`.
pub static SYSFS_DEVICE_LINK: &str = "device";

/// Number of MMIO spaces every accelerator exposes.
pub const ACCELERATOR_NUM_MMIO: u32 = 2;

/// Number of interrupts every accelerator exposes.
pub const ACCELERATOR_NUM_INTERRUPTS: u32 = 0;
