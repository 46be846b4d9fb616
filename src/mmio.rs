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

//! Register window mapping and MMIO access.
//!
//! Windows are opened with [`FpgaHandle::map_mmio`], which validates the permissions the driver
//! reports, maps the window and records it in the handle's registry. Reads and writes then look
//! the window up by index and perform a single volatile access after checking alignment and
//! bounds. Nothing is cached or batched: every call is exactly one load or store against the
//! hardware.
//!
//! # Errors
//!
//! | condition                              | code           |
//! |----------------------------------------|----------------|
//! | offset not a multiple of access width  | `InvalidParam` |
//! | window not mapped                      | `NotFound`     |
//! | access extends past the window         | `InvalidParam` |
//! | window permissions not read/write/mmap | `NoAccess`     |
//! | unmapping a window that is not mapped  | `InvalidParam` |

use crate::error::FpgaError;
use crate::handle::{FpgaHandle, HandleState};
use crate::registry::{Resource, ResourceKind};
use crate::types::RegionFlags;
use log::{debug, error, trace, warn};
use std::ptr::NonNull;

/// Scalar types that can be moved to and from a register window.
trait MmioWord: Copy + std::fmt::LowerHex {
    const WIDTH: u64 = size_of::<Self>() as u64;
}

impl MmioWord for u32 {}
impl MmioWord for u64 {}

impl FpgaHandle {
    /// Map register window `window` into this process.
    ///
    /// # Returns: `Result<NonNull<u8>, FpgaError>`
    /// * `Ok(NonNull<u8>)` - Base address of the mapping
    /// * `Err(FpgaError::InvalidParam)` - The window is already mapped through this handle
    /// * `Err(FpgaError::Ioctl)` - The device does not describe the window (code `NotFound`)
    /// * `Err(FpgaError::NoAccess)` - The window is not readable, writable and mappable
    /// * `Err(FpgaError::Mmap)` - The mapping itself failed
    /// * `Err(FpgaError::NoMemory)` - The registry could not grow; the window has been unmapped
    /// * `Err(FpgaError::InvalidParam)` - The registry refused the descriptor (e.g. an id
    ///   collision from the id generator); the window has been unmapped
    /// * `Err(FpgaError::Exception)` - The window could not be registered and unmapping it
    ///   failed too, the mapping is leaked
    pub fn map_mmio(&self, window: u32) -> Result<NonNull<u8>, FpgaError> {
        let mut state = self.lock();
        map_locked(&mut state, window)
    }

    /// Unmap register window `window` and forget it.
    ///
    /// If `munmap` fails the window stays registered, so the call can be retried.
    pub fn unmap_mmio(&self, window: u32) -> Result<(), FpgaError> {
        let mut state = self.lock();
        unmap_locked(&mut state, window)
    }

    pub fn read_mmio32(&self, window: u32, offset: u64) -> Result<u32, FpgaError> {
        self.read(window, offset)
    }

    pub fn read_mmio64(&self, window: u32, offset: u64) -> Result<u64, FpgaError> {
        self.read(window, offset)
    }

    pub fn write_mmio32(&self, window: u32, offset: u64, value: u32) -> Result<(), FpgaError> {
        self.write(window, offset, value)
    }

    pub fn write_mmio64(&self, window: u32, offset: u64, value: u64) -> Result<(), FpgaError> {
        self.write(window, offset, value)
    }

    fn read<T: MmioWord>(&self, window: u32, offset: u64) -> Result<T, FpgaError> {
        check_alignment::<T>(offset)?;
        let state = self.lock();
        let ptr = locate::<T>(&state, window, offset)?;
        // SAFETY: `locate` guarantees the pointer lies within a live mapping, fully covers a `T`
        // and is aligned to it. The lock keeps the mapping alive for the duration of the read.
        let value = unsafe { ptr.as_ptr().read_volatile() };
        trace!("mmio[{window}][{offset:#x}] -> {value:#x}");
        Ok(value)
    }

    fn write<T: MmioWord>(&self, window: u32, offset: u64, value: T) -> Result<(), FpgaError> {
        check_alignment::<T>(offset)?;
        let state = self.lock();
        let ptr = locate::<T>(&state, window, offset)?;
        trace!("mmio[{window}][{offset:#x}] <- {value:#x}");
        // SAFETY: see `read`.
        unsafe { ptr.as_ptr().write_volatile(value) };
        Ok(())
    }
}

fn map_locked(state: &mut HandleState, window: u32) -> Result<NonNull<u8>, FpgaError> {
    if state.mmio.find_by_index(window).is_some() {
        return Err(FpgaError::InvalidParam(format!(
            "MMIO window {window} is already mapped"
        )));
    }

    let info = state.device.region_info(window).map_err(FpgaError::logged)?;
    if info.flags != RegionFlags::AFU_PERMISSION {
        return Err(FpgaError::NoAccess(format!(
            "Invalid MMIO permission flags {:#x} for window {window}, expected {:#x}",
            info.flags.bits(),
            RegionFlags::AFU_PERMISSION.bits()
        ))
        .logged());
    }

    let addr = state
        .device
        .map_region(window, info.size, info.offset)
        .map_err(FpgaError::logged)?;

    let id = state.mmio.generate_id();
    let resource = Resource {
        id,
        kind: ResourceKind::Mmio,
        addr,
        len: info.size,
        index: window,
    };
    if let Err(e) = state.mmio.insert(resource) {
        warn!("Failed to add MMIO window {window}: {e}");
        // SAFETY: `addr` was just returned by `map_region` for `info.size` bytes and never
        // reached the registry, so nothing else refers to it.
        return match unsafe { state.device.unmap_region(window, addr, info.size) } {
            Ok(()) => Err(e),
            Err(unmap_err) => Err(FpgaError::Exception(format!(
                "Failed to register MMIO window {window} ({e}) and to unmap it again ({unmap_err}), \
                 the mapping is leaked"
            ))
            .logged()),
        };
    }

    debug!(
        "Mapped MMIO window {window}: {:#x} bytes at {addr:p} as resource {id}",
        info.size
    );
    Ok(addr)
}

fn unmap_locked(state: &mut HandleState, window: u32) -> Result<(), FpgaError> {
    let (id, addr, len) = match state.mmio.find_by_index(window) {
        Some(r) => (r.id, r.addr, r.len),
        None => {
            return Err(FpgaError::InvalidParam(format!(
                "MMIO region {window} not found"
            ))
            .logged());
        }
    };

    // SAFETY: the registry only holds mappings made by `map_locked` on this device, and the entry
    // is deleted below, so no later access can reach the unmapped range.
    unsafe { state.device.unmap_region(window, addr, len) }.map_err(FpgaError::logged)?;

    if state.mmio.delete(id).is_none() {
        error!("MMIO window {window} vanished from the registry while locked");
    }
    debug!("Unmapped MMIO window {window} (resource {id})");
    Ok(())
}

fn check_alignment<T: MmioWord>(offset: u64) -> Result<(), FpgaError> {
    if offset % T::WIDTH != 0 {
        return Err(FpgaError::InvalidParam(format!(
            "Misaligned MMIO access: offset {offset:#x} is not a multiple of {}",
            T::WIDTH
        )));
    }
    Ok(())
}

/// Resolve `offset` within `window` to a pointer to a `T`.
fn locate<T: MmioWord>(
    state: &HandleState,
    window: u32,
    offset: u64,
) -> Result<NonNull<T>, FpgaError> {
    let resource = state.mmio.find_by_index(window).ok_or_else(|| {
        FpgaError::NotFound(format!(
            "Trying to access MMIO window {window} before mapping it"
        ))
    })?;

    let in_bounds = offset
        .checked_add(T::WIDTH)
        .is_some_and(|end| end <= resource.len);
    if !in_bounds {
        return Err(FpgaError::InvalidParam(format!(
            "MMIO offset {offset:#x} out of bounds for window {window} of {:#x} bytes",
            resource.len
        )));
    }

    // SAFETY: `offset + size_of::<T>() <= len`, so the result stays within the mapping.
    let ptr = unsafe { resource.addr.add(offset as usize) };
    Ok(ptr.cast())
}
