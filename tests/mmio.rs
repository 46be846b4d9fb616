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

mod common;

use common::{MockDevice, code_of};
use fpga_access::error::ResultCode;
use fpga_access::handle::FpgaHandle;
use fpga_access::registry::{IdGenerator, ResourceId};
use fpga_access::types::RegionFlags;
use googletest::prelude::*;
use rstest::*;

const WINDOW_SIZE: u64 = 0x40000;

#[fixture]
fn device() -> MockDevice {
    MockDevice::new(WINDOW_SIZE)
}

#[fixture]
fn mapped(device: MockDevice) -> (MockDevice, FpgaHandle) {
    let handle = FpgaHandle::from_device(device.boxed());
    handle.map_mmio(0).expect("map window 0");
    (device, handle)
}

/// Hands out the same id every time, so the second registration collides.
struct StuckIds;

impl IdGenerator for StuckIds {
    fn next_id(&mut self) -> ResourceId {
        ResourceId(7)
    }
}

#[gtest]
#[rstest]
fn test_write_then_read_back(mapped: (MockDevice, FpgaHandle)) {
    let (device, handle) = mapped;
    expect_that!(handle.write_mmio32(0, 0x100, 0xDEADBEEF), ok(eq(&())));
    expect_that!(handle.read_mmio32(0, 0x100), ok(eq(&0xDEADBEEF)));
    expect_that!(handle.write_mmio64(0, 0x3fff8, 0x0123_4567_89ab_cdef), ok(eq(&())));
    expect_that!(handle.read_mmio64(0, 0x3fff8), ok(eq(&0x0123_4567_89ab_cdef)));
    expect_that!(device.word(0x3fff8 / 8), eq(0x0123_4567_89ab_cdef));
    expect_that!(handle.mapped_windows(), elements_are![eq(&0)]);
}

#[gtest]
#[rstest]
fn test_map_rejects_wrong_permissions(device: MockDevice) {
    let device = device.with_flags(RegionFlags::READ | RegionFlags::WRITE);
    let handle = FpgaHandle::from_device(device.boxed());
    expect_that!(code_of(handle.map_mmio(0)), eq(ResultCode::NoAccess));
    expect_that!(handle.mapped_windows(), is_empty());
    expect_that!(device.maps(), eq(0));
}

#[gtest]
#[rstest]
fn test_map_unknown_window(device: MockDevice) {
    device.set_fail_region_info(true);
    let handle = FpgaHandle::from_device(device.boxed());
    expect_that!(code_of(handle.map_mmio(3)), eq(ResultCode::NotFound));
    expect_that!(handle.mapped_windows(), is_empty());
}

#[gtest]
#[rstest]
fn test_map_twice_is_rejected(mapped: (MockDevice, FpgaHandle)) {
    let (device, handle) = mapped;
    expect_that!(code_of(handle.map_mmio(0)), eq(ResultCode::InvalidParam));
    expect_that!(device.maps(), eq(1));
}

#[gtest]
#[rstest]
fn test_access_before_map(device: MockDevice) {
    let handle = FpgaHandle::from_device(device.boxed());
    expect_that!(code_of(handle.read_mmio32(0, 0)), eq(ResultCode::NotFound));
    expect_that!(code_of(handle.write_mmio64(0, 0, 1)), eq(ResultCode::NotFound));
}

#[gtest]
#[rstest]
#[case::read32(2, false, false)]
#[case::read64(4, true, false)]
#[case::write32(2, false, true)]
#[case::write64(4, true, true)]
fn test_misaligned_before_map(
    device: MockDevice,
    #[case] offset: u64,
    #[case] wide: bool,
    #[case] write: bool,
) {
    let handle = FpgaHandle::from_device(device.boxed());
    let code = match (wide, write) {
        (false, false) => code_of(handle.read_mmio32(0, offset)),
        (true, false) => code_of(handle.read_mmio64(0, offset)),
        (false, true) => code_of(handle.write_mmio32(0, offset, 0xffff_ffff)),
        (true, true) => code_of(handle.write_mmio64(0, offset, u64::MAX)),
    };
    expect_that!(code, eq(ResultCode::InvalidParam));
    expect_that!(device.untouched(), eq(true));
}

#[gtest]
#[rstest]
fn test_access_after_unmap(mapped: (MockDevice, FpgaHandle)) {
    let (device, handle) = mapped;
    expect_that!(handle.unmap_mmio(0), ok(eq(&())));
    expect_that!(device.unmaps(), eq(1));
    expect_that!(code_of(handle.read_mmio64(0, 0x100)), eq(ResultCode::NotFound));
    expect_that!(code_of(handle.write_mmio32(0, 0x100, 1)), eq(ResultCode::NotFound));
}

#[gtest]
#[rstest]
fn test_unmap_twice(mapped: (MockDevice, FpgaHandle)) {
    let (device, handle) = mapped;
    expect_that!(handle.unmap_mmio(0), ok(eq(&())));
    expect_that!(code_of(handle.unmap_mmio(0)), eq(ResultCode::InvalidParam));
    expect_that!(device.unmaps(), eq(1));
}

#[gtest]
#[rstest]
#[case::misaligned(0x102)]
#[case::at_end(WINDOW_SIZE)]
#[case::past_end(WINDOW_SIZE + 0x100)]
#[case::overflow(u64::MAX - 3)]
fn test_write32_rejected(mapped: (MockDevice, FpgaHandle), #[case] offset: u64) {
    let (device, handle) = mapped;
    expect_that!(
        code_of(handle.write_mmio32(0, offset, 0xffff_ffff)),
        eq(ResultCode::InvalidParam)
    );
    expect_that!(device.untouched(), eq(true));
}

#[gtest]
#[rstest]
fn test_last_word_is_accessible(mapped: (MockDevice, FpgaHandle)) {
    let (_device, handle) = mapped;
    expect_that!(handle.write_mmio32(0, WINDOW_SIZE - 4, 0xa5a5_a5a5), ok(eq(&())));
    expect_that!(handle.read_mmio32(0, WINDOW_SIZE - 4), ok(eq(&0xa5a5_a5a5)));
    expect_that!(handle.read_mmio64(0, WINDOW_SIZE - 8), ok(eq(&0xa5a5_a5a5_0000_0000)));
}

#[gtest]
#[rstest]
#[case::misaligned(0x104)]
#[case::straddles_end(WINDOW_SIZE - 4)]
#[case::at_end(WINDOW_SIZE)]
#[case::overflow(u64::MAX - 7)]
fn test_write64_rejected(mapped: (MockDevice, FpgaHandle), #[case] offset: u64) {
    let (device, handle) = mapped;
    expect_that!(
        code_of(handle.write_mmio64(0, offset, u64::MAX)),
        eq(ResultCode::InvalidParam)
    );
    expect_that!(device.untouched(), eq(true));
}

#[gtest]
#[rstest]
#[case::misaligned(0x101)]
#[case::at_end(WINDOW_SIZE)]
fn test_read_rejected(mapped: (MockDevice, FpgaHandle), #[case] offset: u64) {
    let (_device, handle) = mapped;
    expect_that!(code_of(handle.read_mmio32(0, offset)), eq(ResultCode::InvalidParam));
    expect_that!(code_of(handle.read_mmio64(0, offset)), eq(ResultCode::InvalidParam));
}

#[gtest]
#[rstest]
fn test_failed_unmap_keeps_window(mapped: (MockDevice, FpgaHandle)) {
    let (device, handle) = mapped;
    device.set_fail_unmap(true);
    expect_that!(code_of(handle.unmap_mmio(0)), eq(ResultCode::InvalidParam));
    expect_that!(handle.mapped_windows(), elements_are![eq(&0)]);
    expect_that!(handle.read_mmio32(0, 0), ok(eq(&0)));

    device.set_fail_unmap(false);
    expect_that!(handle.unmap_mmio(0), ok(eq(&())));
    expect_that!(handle.mapped_windows(), is_empty());
}

#[gtest]
#[rstest]
fn test_registration_failure_unmaps(device: MockDevice) {
    let handle = FpgaHandle::with_ids(device.boxed(), Box::new(StuckIds));
    expect_that!(handle.map_mmio(0), ok(anything()));
    let e = handle.map_mmio(1).expect_err("id collision");
    expect_that!(e.code(), eq(ResultCode::InvalidParam));
    expect_that!(e.to_string(), contains_substring("already registered"));
    expect_that!(device.maps(), eq(2));
    expect_that!(device.unmaps(), eq(1));
    expect_that!(handle.mapped_windows(), elements_are![eq(&0)]);
}

#[gtest]
#[rstest]
fn test_handle_reaches_only_mapped_windows(device: MockDevice) {
    let handle = FpgaHandle::with_ids(device.boxed(), Box::new(StuckIds));
    expect_that!(handle.mapped_windows(), is_empty());
    for window in 0..4 {
        expect_that!(code_of(handle.read_mmio32(window, 0)), eq(ResultCode::NotFound));
        expect_that!(code_of(handle.write_mmio64(window, 0, 1)), eq(ResultCode::NotFound));
        expect_that!(code_of(handle.unmap_mmio(window)), eq(ResultCode::InvalidParam));
    }
    expect_that!(handle.close(), ok(eq(&())));
    expect_that!(device.maps(), eq(0));
    expect_that!(device.unmaps(), eq(0));
}

#[gtest]
#[rstest]
fn test_registration_failure_with_failed_unmap(device: MockDevice) {
    let handle = FpgaHandle::with_ids(device.boxed(), Box::new(StuckIds));
    expect_that!(handle.map_mmio(0), ok(anything()));
    device.set_fail_unmap(true);
    expect_that!(code_of(handle.map_mmio(1)), eq(ResultCode::Exception));
    device.set_fail_unmap(false);
}

#[gtest]
#[rstest]
fn test_close_unmaps_everything(device: MockDevice) {
    let handle = FpgaHandle::from_device(device.boxed());
    expect_that!(handle.map_mmio(0), ok(anything()));
    expect_that!(handle.map_mmio(1), ok(anything()));
    expect_that!(handle.close(), ok(eq(&())));
    expect_that!(device.unmaps(), eq(2));
}

#[gtest]
#[rstest]
fn test_drop_unmaps_everything(device: MockDevice) {
    {
        let handle = FpgaHandle::from_device(device.boxed());
        handle.map_mmio(0).expect("map window 0");
    }
    expect_that!(device.unmaps(), eq(1));
}

#[gtest]
#[rstest]
fn test_concurrent_access(mapped: (MockDevice, FpgaHandle)) {
    let (_device, handle) = mapped;
    std::thread::scope(|s| {
        for t in 0..4u64 {
            let handle = &handle;
            s.spawn(move || {
                for i in 0..64u64 {
                    let offset = (t * 64 + i) * 8;
                    handle.write_mmio64(0, offset, offset).expect("write");
                }
            });
        }
    });
    for offset in (0..256u64).map(|i| i * 8) {
        expect_that!(handle.read_mmio64(0, offset), ok(eq(&offset)));
    }
}
