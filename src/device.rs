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

//! Device backends.
//!
//! [`RegionDevice`] is everything the MMIO code needs from an open device: a query describing an
//! indexed register window, and the ability to map and unmap it. [`PortDevice`] implements it
//! for the Linux port character device (`/dev/intel-fpga-port.N`) using the
//! `FPGA_PORT_GET_REGION_INFO` ioctl and `mmap(2)`.

use crate::error::FpgaError;
use crate::system_io::fs_open_rw;
use crate::types::{RegionFlags, RegionInfo};
use log::{debug, trace};
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use std::fs::File;
use std::num::NonZeroUsize;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// An open device that exposes indexed register windows.
///
/// # Safety
///
/// Implementors must return from [`RegionDevice::map_region`] only pointers to live, writable
/// memory of at least `size` bytes, aligned to 8 bytes, that stays valid until it is passed back
/// to [`RegionDevice::unmap_region`]. Handles read and write through these pointers.
pub unsafe trait RegionDevice: Send {
    /// Describe register window `window`.
    ///
    /// # Returns: `Result<RegionInfo, FpgaError>`
    /// * `Ok(RegionInfo)` - Flags, size and file offset of the window
    /// * `Err(_)` - The device does not know the window; the error code is `NotFound`
    fn region_info(&self, window: u32) -> Result<RegionInfo, FpgaError>;

    /// Map `size` bytes at `offset` shared and read/write into this process.
    fn map_region(&self, window: u32, size: u64, offset: u64) -> Result<NonNull<u8>, FpgaError>;

    /// Undo a mapping previously returned by [`RegionDevice::map_region`].
    ///
    /// # Safety
    ///
    /// `addr` and `size` must describe a mapping returned by `map_region` on this device that has
    /// not been unmapped yet, and nothing may access it afterwards.
    unsafe fn unmap_region(
        &self,
        window: u32,
        addr: NonNull<u8>,
        size: u64,
    ) -> Result<(), FpgaError>;
}

const FPGA_MAGIC: u8 = 0xB6;
const PORT_BASE: u8 = 0x40;

/// Argument of `FPGA_PORT_GET_REGION_INFO`.
#[repr(C)]
#[derive(Debug, Default)]
struct PortRegionInfo {
    argsz: u32,
    flags: u32,
    index: u32,
    padding: u32,
    size: u64,
    offset: u64,
}

nix::ioctl_readwrite_bad!(
    fpga_port_get_region_info,
    nix::request_code_none!(FPGA_MAGIC, PORT_BASE + 2),
    PortRegionInfo
);

/// A port device node opened read/write.
///
/// The driver allows a single open of a port at a time, so holding a `PortDevice` claims the
/// accelerator until it is dropped.
#[derive(Debug)]
pub struct PortDevice {
    file: File,
    path: PathBuf,
}

impl PortDevice {
    pub fn open(path: &Path) -> Result<PortDevice, FpgaError> {
        let file = fs_open_rw(path)?;
        debug!("Opened port device {path:?}");
        Ok(PortDevice {
            file,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// SAFETY: `map_region` hands out fresh page-aligned `MAP_SHARED` mappings of exactly `size`
// bytes, which stay valid until `munmap` in `unmap_region`.
unsafe impl RegionDevice for PortDevice {
    fn region_info(&self, window: u32) -> Result<RegionInfo, FpgaError> {
        let mut rinfo = PortRegionInfo {
            argsz: size_of::<PortRegionInfo>() as u32,
            index: window,
            ..Default::default()
        };
        // SAFETY: `rinfo` is a live, correctly laid out argument for this request and the fd is
        // owned by `self.file` for the duration of the call.
        unsafe { fpga_port_get_region_info(self.file.as_raw_fd(), &mut rinfo) }
            .map_err(|e| FpgaError::Ioctl { window, e })?;
        trace!("Region info for window {window} of {:?}: {rinfo:?}", self.path);
        Ok(RegionInfo {
            flags: RegionFlags(rinfo.flags),
            size: rinfo.size,
            offset: rinfo.offset,
        })
    }

    fn map_region(&self, window: u32, size: u64, offset: u64) -> Result<NonNull<u8>, FpgaError> {
        let length = usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                FpgaError::InvalidParam(format!("Window {window} reports unusable size {size:#x}"))
            })?;
        let file_offset = i64::try_from(offset).map_err(|_| {
            FpgaError::InvalidParam(format!("Window {window} reports offset {offset:#x} out of range"))
        })?;
        // SAFETY: a fresh shared mapping is requested at an address of the kernel's choosing, so
        // no existing memory is replaced.
        let addr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &self.file,
                file_offset,
            )
        }
        .map_err(|e| FpgaError::Mmap {
            window,
            size,
            offset,
            e,
        })?;
        Ok(addr.cast())
    }

    unsafe fn unmap_region(
        &self,
        window: u32,
        addr: NonNull<u8>,
        size: u64,
    ) -> Result<(), FpgaError> {
        // SAFETY: the caller guarantees `addr`/`size` is a live mapping from `map_region`.
        unsafe { munmap(addr.cast(), size as usize) }.map_err(|e| FpgaError::Munmap { window, e })
    }
}
