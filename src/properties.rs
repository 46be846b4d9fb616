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

//! Cached hardware properties.
//!
//! A [`Properties`] object holds a sparse [`PropertySet`] behind its own lock. It is populated
//! from an identity [`Token`] by [`Properties::refresh`], or field by field through the setters,
//! which is how callers build filters for enumeration.
//!
//! # Getter and setter contract
//!
//! * A field that is not populated yields `NotFound`.
//! * A field that only exists on one object type yields `InvalidParam` when the set describes
//!   the other type, or no type at all. This is a usage error, not missing data. Setters of
//!   such fields refuse the write the same way.
//! * Fields this platform never provides (vendor id, model, local memory size, capabilities,
//!   device id) yield `NotSupported` on both get and set.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpga_access::properties::Properties;
//! # use fpga_access::token::Token;
//! # use std::path::Path;
//! # fn example() -> Result<(), fpga_access::error::FpgaError> {
//! let token = Token::device(Path::new("/sys/class/fpga/"), 0);
//! let props = Properties::from_token(&token)?;
//! println!("{} slots, FIM {}", props.num_slots()?, props.bbs_version()?);
//! # Ok(())
//! # }
//! ```

mod refresh;
pub mod set;

use crate::error::FpgaError;
use crate::sysfs::{IdentityResolver, SysfsResolver};
use crate::token::Token;
use crate::types::{AcceleratorState, ObjectType, Version};
use log::trace;
use parking_lot::Mutex;
use set::{AcceleratorAttributes, AttributeGroup, DeviceAttributes, FieldMask, PropertySet};
use uuid::Uuid;

/// Highest device number on a PCIe bus.
const PCI_MAX_DEVICE: u8 = 31;
/// Highest function number of a PCIe device.
const PCI_MAX_FUNCTION: u8 = 7;

#[derive(Debug, Default)]
pub struct Properties {
    set: Mutex<PropertySet>,
}

fn not_found(field: &str) -> FpgaError {
    FpgaError::NotFound(format!("No {field}"))
}

fn wrong_type(verb: &str, field: &str, actual: Option<ObjectType>) -> FpgaError {
    let actual = actual.map_or_else(|| "unset".to_string(), |t| t.to_string());
    FpgaError::InvalidParam(format!(
        "Attempting to {verb} {field} on invalid object type: {actual}"
    ))
    .logged()
}

fn not_supported(field: &str) -> FpgaError {
    FpgaError::NotSupported(format!("{field} not supported"))
}

impl Clone for Properties {
    /// Copy the current contents into a new, independently locked object.
    fn clone(&self) -> Properties {
        Properties {
            set: Mutex::new(self.snapshot()),
        }
    }
}

impl Properties {
    /// Create an empty property object.
    pub fn new() -> Properties {
        Properties::default()
    }

    /// Create a property object populated from `token` through sysfs.
    pub fn from_token(token: &Token) -> Result<Properties, FpgaError> {
        Self::from_token_with(token, &SysfsResolver::new())
    }

    /// Create a property object populated from `token` through `resolver`.
    pub fn from_token_with(
        token: &Token,
        resolver: &dyn IdentityResolver,
    ) -> Result<Properties, FpgaError> {
        let props = Properties::new();
        props.refresh_with(token, resolver)?;
        Ok(props)
    }

    /// Replace the contents with the current state of `token`, read through sysfs.
    pub fn refresh(&self, token: &Token) -> Result<(), FpgaError> {
        self.refresh_with(token, &SysfsResolver::new())
    }

    /// Replace the contents with the current state of `token`, read through `resolver`.
    ///
    /// The new set is built completely before the lock is taken; on error the current contents
    /// are left as they were.
    pub fn refresh_with(
        &self,
        token: &Token,
        resolver: &dyn IdentityResolver,
    ) -> Result<(), FpgaError> {
        let shadow = refresh::resolve(token, resolver).map_err(FpgaError::logged)?;
        *self.set.lock() = shadow;
        Ok(())
    }

    /// Mark every field as unpopulated.
    pub fn clear(&self) {
        *self.set.lock() = PropertySet::default();
    }

    /// Release the object.
    pub fn destroy(self) {
        trace!("Destroying properties {:?}", self.valid_fields());
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> PropertySet {
        self.set.lock().clone()
    }

    pub fn valid_fields(&self) -> FieldMask {
        self.set.lock().valid_fields()
    }

    fn common<T>(
        &self,
        field: &str,
        get: impl FnOnce(&PropertySet) -> Option<T>,
    ) -> Result<T, FpgaError> {
        get(&self.set.lock()).ok_or_else(|| not_found(field))
    }

    fn set_common(&self, update: impl FnOnce(&mut PropertySet)) {
        update(&mut self.set.lock());
    }

    fn device_attr<T>(
        &self,
        field: &str,
        get: impl FnOnce(&DeviceAttributes) -> Option<T>,
    ) -> Result<T, FpgaError> {
        let set = self.set.lock();
        match &set.group {
            Some(AttributeGroup::Device(attrs)) => get(attrs).ok_or_else(|| not_found(field)),
            _ => Err(wrong_type("get", field, set.object_type())),
        }
    }

    fn set_device_attr(
        &self,
        field: &str,
        update: impl FnOnce(&mut DeviceAttributes),
    ) -> Result<(), FpgaError> {
        let mut set = self.set.lock();
        let actual = set.object_type();
        match &mut set.group {
            Some(AttributeGroup::Device(attrs)) => {
                update(attrs);
                Ok(())
            }
            _ => Err(wrong_type("set", field, actual)),
        }
    }

    fn accelerator_attr<T>(
        &self,
        field: &str,
        get: impl FnOnce(&AcceleratorAttributes) -> Option<T>,
    ) -> Result<T, FpgaError> {
        let set = self.set.lock();
        match &set.group {
            Some(AttributeGroup::Accelerator(attrs)) => {
                get(attrs).ok_or_else(|| not_found(field))
            }
            _ => Err(wrong_type("get", field, set.object_type())),
        }
    }

    fn set_accelerator_attr(
        &self,
        field: &str,
        update: impl FnOnce(&mut AcceleratorAttributes),
    ) -> Result<(), FpgaError> {
        let mut set = self.set.lock();
        let actual = set.object_type();
        match &mut set.group {
            Some(AttributeGroup::Accelerator(attrs)) => {
                update(attrs);
                Ok(())
            }
            _ => Err(wrong_type("set", field, actual)),
        }
    }

    // Common fields.

    /// The device token owning this accelerator.
    pub fn parent(&self) -> Result<Token, FpgaError> {
        self.common("parent", |s| s.parent.clone())
    }

    pub fn set_parent(&self, parent: Token) -> Result<(), FpgaError> {
        self.set_common(|s| s.parent = Some(parent));
        Ok(())
    }

    pub fn object_type(&self) -> Result<ObjectType, FpgaError> {
        self.common("object type", PropertySet::object_type)
    }

    /// Set the object type.
    ///
    /// Changing the type discards every attribute of the previous type.
    pub fn set_object_type(&self, object_type: ObjectType) -> Result<(), FpgaError> {
        self.set_common(|s| {
            if s.object_type() != Some(object_type) {
                s.group = Some(AttributeGroup::empty(object_type));
            }
        });
        Ok(())
    }

    pub fn bus(&self) -> Result<u8, FpgaError> {
        self.common("bus", |s| s.bus)
    }

    pub fn set_bus(&self, bus: u8) -> Result<(), FpgaError> {
        self.set_common(|s| s.bus = Some(bus));
        Ok(())
    }

    /// PCIe device number.
    pub fn device(&self) -> Result<u8, FpgaError> {
        self.common("device", |s| s.device)
    }

    pub fn set_device(&self, device: u8) -> Result<(), FpgaError> {
        if device > PCI_MAX_DEVICE {
            return Err(FpgaError::InvalidParam(format!(
                "Invalid device number {device}"
            )));
        }
        self.set_common(|s| s.device = Some(device));
        Ok(())
    }

    /// PCIe function number.
    pub fn function(&self) -> Result<u8, FpgaError> {
        self.common("function", |s| s.function)
    }

    pub fn set_function(&self, function: u8) -> Result<(), FpgaError> {
        if function > PCI_MAX_FUNCTION {
            return Err(FpgaError::InvalidParam(format!(
                "Invalid function number {function}"
            )));
        }
        self.set_common(|s| s.function = Some(function));
        Ok(())
    }

    pub fn socket_id(&self) -> Result<u8, FpgaError> {
        self.common("socket ID", |s| s.socket_id)
    }

    pub fn set_socket_id(&self, socket_id: u8) -> Result<(), FpgaError> {
        self.set_common(|s| s.socket_id = Some(socket_id));
        Ok(())
    }

    /// AFU id for accelerators, PR interface id for devices.
    pub fn guid(&self) -> Result<Uuid, FpgaError> {
        self.common("GUID", |s| s.guid)
    }

    pub fn set_guid(&self, guid: Uuid) -> Result<(), FpgaError> {
        self.set_common(|s| s.guid = Some(guid));
        Ok(())
    }

    // Device fields.

    pub fn num_slots(&self) -> Result<u32, FpgaError> {
        self.device_attr("num_slots", |d| d.num_slots)
    }

    pub fn set_num_slots(&self, num_slots: u32) -> Result<(), FpgaError> {
        self.set_device_attr("num_slots", |d| d.num_slots = Some(num_slots))
    }

    /// Raw id of the blue bitstream.
    pub fn bbs_id(&self) -> Result<u64, FpgaError> {
        self.device_attr("BBS ID", |d| d.bbs_id)
    }

    pub fn set_bbs_id(&self, bbs_id: u64) -> Result<(), FpgaError> {
        self.set_device_attr("BBS ID", |d| d.bbs_id = Some(bbs_id))
    }

    pub fn bbs_version(&self) -> Result<Version, FpgaError> {
        self.device_attr("BBS version", |d| d.bbs_version)
    }

    pub fn set_bbs_version(&self, version: Version) -> Result<(), FpgaError> {
        self.set_device_attr("BBS version", |d| d.bbs_version = Some(version))
    }

    // Accelerator fields.

    pub fn num_mmio(&self) -> Result<u32, FpgaError> {
        self.accelerator_attr("number of MMIO spaces", |a| a.num_mmio)
    }

    pub fn set_num_mmio(&self, num_mmio: u32) -> Result<(), FpgaError> {
        self.set_accelerator_attr("number of MMIO spaces", |a| a.num_mmio = Some(num_mmio))
    }

    pub fn num_interrupts(&self) -> Result<u32, FpgaError> {
        self.accelerator_attr("number of interrupts", |a| a.num_interrupts)
    }

    pub fn set_num_interrupts(&self, num_interrupts: u32) -> Result<(), FpgaError> {
        self.set_accelerator_attr("number of interrupts", |a| {
            a.num_interrupts = Some(num_interrupts)
        })
    }

    pub fn accelerator_state(&self) -> Result<AcceleratorState, FpgaError> {
        self.accelerator_attr("accelerator state", |a| a.state)
    }

    pub fn set_accelerator_state(&self, state: AcceleratorState) -> Result<(), FpgaError> {
        self.set_accelerator_attr("accelerator state", |a| a.state = Some(state))
    }

    // Fields this platform does not provide.

    pub fn vendor_id(&self) -> Result<u16, FpgaError> {
        Err(not_supported("Vendor ID"))
    }

    pub fn set_vendor_id(&self, _vendor_id: u16) -> Result<(), FpgaError> {
        Err(not_supported("Vendor ID"))
    }

    pub fn device_id(&self) -> Result<u32, FpgaError> {
        Err(not_supported("Device ID"))
    }

    pub fn set_device_id(&self, _device_id: u32) -> Result<(), FpgaError> {
        Err(not_supported("Device ID"))
    }

    pub fn model(&self) -> Result<String, FpgaError> {
        Err(not_supported("Model"))
    }

    pub fn set_model(&self, _model: &str) -> Result<(), FpgaError> {
        Err(not_supported("Model"))
    }

    pub fn local_memory_size(&self) -> Result<u64, FpgaError> {
        Err(not_supported("Local memory"))
    }

    pub fn set_local_memory_size(&self, _size: u64) -> Result<(), FpgaError> {
        Err(not_supported("Local memory"))
    }

    pub fn capabilities(&self) -> Result<u64, FpgaError> {
        Err(not_supported("Capabilities"))
    }

    pub fn set_capabilities(&self, _capabilities: u64) -> Result<(), FpgaError> {
        Err(not_supported("Capabilities"))
    }
}
