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

//! Device handles.
//!
//! An [`FpgaHandle`] is an open session against one accelerator. It owns the device backend and
//! the registry of register windows mapped through it, both behind a single mutex. Every public
//! operation on a handle takes that mutex exactly once and passes the locked [`HandleState`] to
//! its helpers, so no helper ever needs to re-acquire it.
//!
//! Handles can only be created by [`FpgaHandle::open`], [`FpgaHandle::from_device`] or
//! [`FpgaHandle::with_ids`], each starting with an empty registry, and
//! [`FpgaHandle::close`] consumes them: a stale handle cannot be named.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpga_access::handle::FpgaHandle;
//! # use fpga_access::token::Token;
//! # use std::path::Path;
//! # fn example() -> Result<(), fpga_access::error::FpgaError> {
//! let token = Token::accelerator(Path::new("/sys/class/fpga/"), 0);
//! let handle = FpgaHandle::open(&token)?;
//! handle.map_mmio(0)?;
//! let scratch = handle.read_mmio64(0, 0x18)?;
//! handle.close()?;
//! # Ok(())
//! # }
//! ```

use crate::device::{PortDevice, RegionDevice};
use crate::error::FpgaError;
use crate::registry::{IdGenerator, Resource, ResourceKind, ResourceRegistry, SequentialIds};
use crate::token::Token;
use log::{debug, error, warn};
use parking_lot::{Mutex, MutexGuard};

/// State guarded by a handle's lock.
pub struct HandleState {
    pub(crate) device: Box<dyn RegionDevice>,
    pub(crate) mmio: ResourceRegistry,
}

impl HandleState {
    /// Unmap every registered window, reporting the first failure.
    fn release_all(&mut self) -> Result<(), FpgaError> {
        let mut first_err = None;
        for resource in self.mmio.drain() {
            if let Err(e) = release(self.device.as_ref(), &resource) {
                error!("{e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

fn release(device: &dyn RegionDevice, resource: &Resource) -> Result<(), FpgaError> {
    debug!(
        "Unmapping window {} ({:#x} bytes) on close",
        resource.index, resource.len
    );
    // SAFETY: `resource` was drained from the registry, which only records mappings made by
    // `map_region` on this device; it is dropped right after, so nothing accesses it again.
    unsafe { device.unmap_region(resource.index, resource.addr, resource.len) }
}

impl Drop for HandleState {
    fn drop(&mut self) {
        if !self.mmio.is_empty() {
            warn!(
                "Handle dropped with {} window(s) still mapped",
                self.mmio.len()
            );
            let _ = self.release_all();
        }
    }
}

pub struct FpgaHandle {
    state: Mutex<HandleState>,
}

impl FpgaHandle {
    /// Open the device node of `token` and create a handle for it.
    ///
    /// # Returns: `Result<FpgaHandle, FpgaError>`
    /// * `Ok(FpgaHandle)` - The device is open and claimed by this handle
    /// * `Err(FpgaError::IOOpen)` - The node is missing, busy or not accessible
    pub fn open(token: &Token) -> Result<FpgaHandle, FpgaError> {
        let device = PortDevice::open(token.dev_path())?;
        Ok(Self::from_device(Box::new(device)))
    }

    /// Wrap an already open device backend.
    pub fn from_device(device: Box<dyn RegionDevice>) -> FpgaHandle {
        Self::with_ids(device, Box::new(SequentialIds))
    }

    /// Wrap an already open device backend, drawing resource ids from `ids`.
    ///
    /// The registry always starts empty: only [`FpgaHandle::map_mmio`] adds windows to it.
    pub fn with_ids(device: Box<dyn RegionDevice>, ids: Box<dyn IdGenerator>) -> FpgaHandle {
        FpgaHandle {
            state: Mutex::new(HandleState {
                device,
                mmio: ResourceRegistry::new(ids),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock()
    }

    /// Indices of the windows currently mapped through this handle, in ascending order.
    pub fn mapped_windows(&self) -> Vec<u32> {
        let mut windows: Vec<u32> = self.lock().mmio.indices(ResourceKind::Mmio).collect();
        windows.sort_unstable();
        windows
    }

    /// Unmap every window still mapped and release the device.
    ///
    /// # Returns: `Result<(), FpgaError>`
    /// * `Ok(())` - All windows unmapped
    /// * `Err(FpgaError::Munmap)` - The first unmap failure; remaining windows are still
    ///   attempted and the device is released regardless
    pub fn close(self) -> Result<(), FpgaError> {
        let mut state = self.state.into_inner();
        state.release_all()
    }
}
