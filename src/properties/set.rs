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

//! The attribute set held by a [`Properties`](crate::properties::Properties) object.

use crate::token::Token;
use crate::types::{AcceleratorState, ObjectType, Version};
use std::fmt;
use uuid::Uuid;

/// One attribute of a property set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyField {
    Parent,
    ObjectType,
    Bus,
    Device,
    Function,
    SocketId,
    Guid,
    NumSlots,
    BbsId,
    BbsVersion,
    AcceleratorState,
    NumMmio,
    NumInterrupts,
}

impl PropertyField {
    pub const ALL: [PropertyField; 13] = [
        PropertyField::Parent,
        PropertyField::ObjectType,
        PropertyField::Bus,
        PropertyField::Device,
        PropertyField::Function,
        PropertyField::SocketId,
        PropertyField::Guid,
        PropertyField::NumSlots,
        PropertyField::BbsId,
        PropertyField::BbsVersion,
        PropertyField::AcceleratorState,
        PropertyField::NumMmio,
        PropertyField::NumInterrupts,
    ];

    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Bitmask of the fields currently populated in a property set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldMask(u32);

impl FieldMask {
    pub const EMPTY: FieldMask = FieldMask(0);

    pub fn contains(self, field: PropertyField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    fn with(self, field: PropertyField, present: bool) -> FieldMask {
        if present {
            FieldMask(self.0 | field.bit())
        } else {
            self
        }
    }

    pub fn iter(self) -> impl Iterator<Item = PropertyField> {
        PropertyField::ALL
            .into_iter()
            .filter(move |f| self.contains(*f))
    }
}

impl fmt::Debug for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Attributes that only exist on device objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub(crate) num_slots: Option<u32>,
    pub(crate) bbs_id: Option<u64>,
    pub(crate) bbs_version: Option<Version>,
}

/// Attributes that only exist on accelerator objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceleratorAttributes {
    pub(crate) state: Option<AcceleratorState>,
    pub(crate) num_mmio: Option<u32>,
    pub(crate) num_interrupts: Option<u32>,
}

/// The type-specific half of a property set. Its variant is the object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeGroup {
    Device(DeviceAttributes),
    Accelerator(AcceleratorAttributes),
}

impl AttributeGroup {
    pub fn empty(object_type: ObjectType) -> AttributeGroup {
        match object_type {
            ObjectType::Device => AttributeGroup::Device(DeviceAttributes::default()),
            ObjectType::Accelerator => AttributeGroup::Accelerator(AcceleratorAttributes::default()),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            AttributeGroup::Device(_) => ObjectType::Device,
            AttributeGroup::Accelerator(_) => ObjectType::Accelerator,
        }
    }
}

/// A sparse set of identity attributes.
///
/// Every field is optional; a field is valid exactly when it is `Some`. The object type is valid
/// exactly when a [`AttributeGroup`] is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    pub(crate) parent: Option<Token>,
    pub(crate) bus: Option<u8>,
    pub(crate) device: Option<u8>,
    pub(crate) function: Option<u8>,
    pub(crate) socket_id: Option<u8>,
    pub(crate) guid: Option<Uuid>,
    pub(crate) group: Option<AttributeGroup>,
}

impl PropertySet {
    pub fn object_type(&self) -> Option<ObjectType> {
        self.group.as_ref().map(AttributeGroup::object_type)
    }

    pub fn valid_fields(&self) -> FieldMask {
        let mask = FieldMask::EMPTY
            .with(PropertyField::Parent, self.parent.is_some())
            .with(PropertyField::ObjectType, self.group.is_some())
            .with(PropertyField::Bus, self.bus.is_some())
            .with(PropertyField::Device, self.device.is_some())
            .with(PropertyField::Function, self.function.is_some())
            .with(PropertyField::SocketId, self.socket_id.is_some())
            .with(PropertyField::Guid, self.guid.is_some());
        match &self.group {
            Some(AttributeGroup::Device(d)) => mask
                .with(PropertyField::NumSlots, d.num_slots.is_some())
                .with(PropertyField::BbsId, d.bbs_id.is_some())
                .with(PropertyField::BbsVersion, d.bbs_version.is_some()),
            Some(AttributeGroup::Accelerator(a)) => mask
                .with(PropertyField::AcceleratorState, a.state.is_some())
                .with(PropertyField::NumMmio, a.num_mmio.is_some())
                .with(PropertyField::NumInterrupts, a.num_interrupts.is_some()),
            None => mask,
        }
    }
}
