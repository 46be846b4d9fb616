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

use common::FakeSysfs;
use fpga_access::error::FpgaError;
use fpga_access::system_io::{fs_open_rw, fs_read, fs_read_link, fs_read_u64};
use googletest::prelude::*;
use rstest::*;
use std::path::{Path, PathBuf};

#[fixture]
fn sysfs() -> FakeSysfs {
    FakeSysfs::new(0)
}

#[gtest]
#[rstest]
#[case::not_found(
    "bad_input",
    err(displays_as(contains_substring("No such file or directory")))
)]
#[case::is_dir("/etc/", err(displays_as(contains_substring("Is a directory"))))]
#[case::ok("intel-fpga-dev.0/intel-fpga-fme.0/ports_num", ok(eq("1\n")))]
fn test_fs_read<M: for<'a> Matcher<&'a std::result::Result<String, FpgaError>>>(
    sysfs: FakeSysfs,
    #[case] path_str: &str,
    #[case] condition: M,
) {
    let r = fs_read(&sysfs.root.join(path_str));
    expect_that!(r, condition);
}

#[gtest]
#[rstest]
#[case::decimal("intel-fpga-dev.0/intel-fpga-fme.0/socket_id", ok(eq(&1u64)))]
#[case::hex("intel-fpga-dev.0/intel-fpga-fme.0/bitstream_id", ok(eq(&0x0123000000000000u64)))]
#[case::not_a_number(
    "intel-fpga-dev.0/intel-fpga-fme.0/pr/interface_id",
    err(displays_as(contains_substring("FpgaError::Parse")))
)]
#[case::missing("intel-fpga-dev.0/nothing", err(displays_as(contains_substring("IORead"))))]
fn test_fs_read_u64<M: for<'a> Matcher<&'a std::result::Result<u64, FpgaError>>>(
    sysfs: FakeSysfs,
    #[case] path_str: &str,
    #[case] condition: M,
) {
    let r = fs_read_u64(&sysfs.root.join(path_str));
    expect_that!(r, condition);
}

#[gtest]
#[rstest]
fn test_fs_read_link(sysfs: FakeSysfs) {
    let link = sysfs.root.join("intel-fpga-dev.0/device");
    expect_that!(
        fs_read_link(&link),
        ok(eq(&PathBuf::from("../../../0000:5e:00.0")))
    );
    expect_that!(
        fs_read_link(&sysfs.root.join("intel-fpga-dev.0/intel-fpga-fme.0/socket_id")),
        err(displays_as(contains_substring("IOReadLink")))
    );
}

#[gtest]
#[rstest]
fn test_fs_open_rw(sysfs: FakeSysfs) {
    let token = sysfs.accelerator_token(0);
    expect_that!(fs_open_rw(token.dev_path()).is_ok(), eq(true));
    expect_that!(
        fs_open_rw(Path::new("/nonexistent/intel-fpga-port.0")).map(|_| ()),
        err(displays_as(contains_substring("IOOpen")))
    );
}
