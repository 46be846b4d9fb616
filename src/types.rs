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

//! Plain value types shared by the MMIO and property modules.

use crate::error::FpgaError;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Class of hardware object a property set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// An FPGA device, i.e. its management engine (FME).
    Device,
    /// An accelerator function unit behind a port.
    Accelerator,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Device => f.write_str("device"),
            ObjectType::Accelerator => f.write_str("accelerator"),
        }
    }
}

/// Whether an accelerator is currently owned by some process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceleratorState {
    Assigned,
    Unassigned,
}

impl fmt::Display for AcceleratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorState::Assigned => f.write_str("assigned"),
            AcceleratorState::Unassigned => f.write_str("unassigned"),
        }
    }
}

/// Version of the blue bitstream (FPGA interface manager) loaded on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    /// Decompose a bitstream id into its version sub-fields.
    ///
    /// The driver packs the version into the top byte pair of the id:
    ///
    /// ```text
    ///  63    60 59   56 55   52 51   48 47                    0
    /// +--------+-------+-------+-------+-----------------------+
    /// |        | major | minor | patch |                       |
    /// +--------+-------+-------+-------+-----------------------+
    /// ```
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fpga_access::types::Version;
    /// let v = Version::from_bitstream_id(0x0123_0000_0000_0000);
    /// assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    /// ```
    pub fn from_bitstream_id(bbs_id: u64) -> Self {
        Version {
            major: ((bbs_id >> 56) & 0xf) as u8,
            minor: ((bbs_id >> 52) & 0xf) as u8,
            patch: ((bbs_id >> 48) & 0xf) as u8,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Access permission bits reported by the driver for a register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegionFlags(pub u32);

impl RegionFlags {
    pub const READ: RegionFlags = RegionFlags(1 << 0);
    pub const WRITE: RegionFlags = RegionFlags(1 << 1);
    pub const MMAP: RegionFlags = RegionFlags(1 << 2);

    /// The exact permission set an accelerator register window must report.
    pub const AFU_PERMISSION: RegionFlags =
        RegionFlags(Self::READ.0 | Self::WRITE.0 | Self::MMAP.0);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: RegionFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RegionFlags {
    type Output = RegionFlags;

    fn bitor(self, rhs: RegionFlags) -> RegionFlags {
        RegionFlags(self.0 | rhs.0)
    }
}

/// Description of one indexed register window, as returned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo {
    pub flags: RegionFlags,
    /// Size of the window in bytes.
    pub size: u64,
    /// Offset of the window within the device file, to be passed to `mmap`.
    pub offset: u64,
}

/// PCIe bus/device/function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bdf {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl fmt::Display for Bdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{:x}", self.bus, self.device, self.function)
    }
}

impl FromStr for Bdf {
    type Err = FpgaError;

    /// Parse `[segment:]bus:device.function`, all hexadecimal, as found at the end of a sysfs
    /// PCI device link (`0000:5e:00.0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || FpgaError::InvalidParam(format!("{s:?} is not a PCI address"));
        let (rest, function) = s.rsplit_once('.').ok_or_else(bad)?;
        let mut parts = rest.rsplit(':');
        let device = parts.next().ok_or_else(bad)?;
        let bus = parts.next().ok_or_else(bad)?;

        let device = u8::from_str_radix(device, 16).map_err(|_| bad())?;
        let function = u8::from_str_radix(function, 16).map_err(|_| bad())?;
        if device > 31 || function > 7 {
            return Err(bad());
        }
        Ok(Bdf {
            bus: u8::from_str_radix(bus, 16).map_err(|_| bad())?,
            device,
            function,
        })
    }
}
