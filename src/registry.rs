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

//! Per-handle registry of mapped resources.
//!
//! Each [`FpgaHandle`](crate::handle::FpgaHandle) owns one [`ResourceRegistry`]. The registry is
//! never shared between handles and is only mutated while the owning handle's lock is held,
//! which the borrow checker enforces: every mutating method takes `&mut self`, and the only
//! `&mut` path to a registry goes through the handle's mutex guard.
//!
//! Resource identifiers come from an [`IdGenerator`] supplied at construction. The default,
//! [`SequentialIds`], draws from a process-wide counter so an identifier is never handed out
//! twice within a process.

use crate::error::FpgaError;
use log::trace;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Source of fresh resource identifiers.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> ResourceId;
}

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Monotonic identifiers shared by every registry in the process.
#[derive(Debug, Default)]
pub struct SequentialIds;

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> ResourceId {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Kind of resource a descriptor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A register window mapped with `mmap`.
    Mmio,
    /// A shared memory buffer pinned for the device.
    Buffer,
}

/// Bookkeeping for one mapped resource.
///
/// Only the crate creates descriptors, from mappings it made itself.
#[derive(Debug)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) kind: ResourceKind,
    /// Base address in this process.
    pub(crate) addr: NonNull<u8>,
    /// Length in bytes, never zero.
    pub(crate) len: u64,
    /// Device-defined index the resource was opened with.
    pub(crate) index: u32,
}

// SAFETY: `addr` points into a mapping owned by the registry's handle, not into memory owned by
// any thread. The handle's mutex serializes every access that dereferences it.
unsafe impl Send for Resource {}

pub struct ResourceRegistry {
    ids: Box<dyn IdGenerator>,
    resources: Vec<Resource>,
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new(Box::new(SequentialIds))
    }
}

impl ResourceRegistry {
    pub fn new(ids: Box<dyn IdGenerator>) -> Self {
        ResourceRegistry {
            ids,
            resources: Vec::new(),
        }
    }

    /// Draw a fresh identifier from the injected generator.
    pub(crate) fn generate_id(&mut self) -> ResourceId {
        self.ids.next_id()
    }

    /// Add a descriptor.
    ///
    /// # Returns: `Result<(), FpgaError>`
    /// * `Ok(())` - The descriptor is now live
    /// * `Err(FpgaError::InvalidParam)` - Zero length, duplicate id, or a live descriptor of the
    ///   same kind already uses `resource.index`
    /// * `Err(FpgaError::NoMemory)` - The registry could not grow
    pub(crate) fn insert(&mut self, resource: Resource) -> Result<(), FpgaError> {
        if resource.len == 0 {
            return Err(FpgaError::InvalidParam(format!(
                "Refusing to register resource {} with zero length",
                resource.id
            )));
        }
        if self.resources.iter().any(|r| r.id == resource.id) {
            return Err(FpgaError::InvalidParam(format!(
                "Resource id {} is already registered",
                resource.id
            )));
        }
        if self.find(resource.kind, resource.index).is_some() {
            return Err(FpgaError::InvalidParam(format!(
                "A {:?} resource with index {} is already registered",
                resource.kind, resource.index
            )));
        }
        self.resources.try_reserve(1).map_err(|e| {
            FpgaError::NoMemory(format!("Failed to add resource {}: {e}", resource.id))
        })?;
        trace!(
            "Registered {:?} resource {} for index {} ({:#x} bytes)",
            resource.kind, resource.id, resource.index, resource.len
        );
        self.resources.push(resource);
        Ok(())
    }

    /// Find the live MMIO window opened with `index`.
    pub fn find_by_index(&self, index: u32) -> Option<&Resource> {
        self.find(ResourceKind::Mmio, index)
    }

    /// Find the live resource of `kind` opened with `index`.
    pub fn find(&self, kind: ResourceKind, index: u32) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.index == index)
    }

    /// Indices of the live resources of `kind`, in no particular order.
    pub fn indices(&self, kind: ResourceKind) -> impl Iterator<Item = u32> + '_ {
        self.resources
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| r.index)
    }

    /// Remove a descriptor, handing it back. Unknown ids yield `None`.
    pub(crate) fn delete(&mut self, id: ResourceId) -> Option<Resource> {
        let pos = self.resources.iter().position(|r| r.id == id)?;
        trace!("Removed resource {id}");
        Some(self.resources.swap_remove(pos))
    }

    /// Remove every descriptor, handing them back for teardown.
    pub(crate) fn drain(&mut self) -> Vec<Resource> {
        std::mem::take(&mut self.resources)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
