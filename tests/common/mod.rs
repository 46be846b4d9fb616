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

#![allow(dead_code)]

use fpga_access::device::RegionDevice;
use fpga_access::error::{FpgaError, ResultCode};
use fpga_access::sysfs::IdentityResolver;
use fpga_access::token::Token;
use fpga_access::types::{Bdf, RegionFlags, RegionInfo};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Route library logging to the test harness, honouring `RUST_LOG`.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn code_of<T: std::fmt::Debug>(r: Result<T, FpgaError>) -> ResultCode {
    match r {
        Ok(v) => panic!("expected an error, got Ok({v:?})"),
        Err(e) => e.code(),
    }
}

#[derive(Debug)]
pub struct MockState {
    /// Backing memory of every window, kept as u64 so it is 8-byte aligned.
    pub buffer: Vec<u64>,
    pub flags: RegionFlags,
    pub size: u64,
    pub offset: u64,
    pub fail_region_info: bool,
    pub fail_unmap: bool,
    pub maps: usize,
    pub unmaps: usize,
}

/// In-memory register windows. Clones share state so tests can inspect the device after the
/// handle took ownership of it.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new(size: u64) -> MockDevice {
        init_logger();
        MockDevice {
            state: Arc::new(Mutex::new(MockState {
                buffer: vec![0; (size as usize).div_ceil(8)],
                flags: RegionFlags::AFU_PERMISSION,
                size,
                offset: 0,
                fail_region_info: false,
                fail_unmap: false,
                maps: 0,
                unmaps: 0,
            })),
        }
    }

    pub fn with_flags(self, flags: RegionFlags) -> MockDevice {
        self.state.lock().flags = flags;
        self
    }

    pub fn boxed(&self) -> Box<dyn RegionDevice> {
        Box::new(self.clone())
    }

    pub fn set_fail_unmap(&self, fail: bool) {
        self.state.lock().fail_unmap = fail;
    }

    pub fn set_fail_region_info(&self, fail: bool) {
        self.state.lock().fail_region_info = fail;
    }

    pub fn maps(&self) -> usize {
        self.state.lock().maps
    }

    pub fn unmaps(&self) -> usize {
        self.state.lock().unmaps
    }

    /// True if no byte of the backing memory was ever written.
    pub fn untouched(&self) -> bool {
        self.state.lock().buffer.iter().all(|w| *w == 0)
    }

    pub fn word(&self, index: usize) -> u64 {
        self.state.lock().buffer[index]
    }
}

// SAFETY: every window maps the start of `buffer`, which is `size` bytes long, 8-byte aligned and
// never reallocated while any clone of the device is alive.
unsafe impl RegionDevice for MockDevice {
    fn region_info(&self, window: u32) -> Result<RegionInfo, FpgaError> {
        let state = self.state.lock();
        if state.fail_region_info {
            return Err(FpgaError::NotFound(format!("no region {window}")));
        }
        Ok(RegionInfo {
            flags: state.flags,
            size: state.size,
            offset: state.offset,
        })
    }

    fn map_region(&self, _window: u32, _size: u64, _offset: u64) -> Result<NonNull<u8>, FpgaError> {
        let mut state = self.state.lock();
        state.maps += 1;
        NonNull::new(state.buffer.as_mut_ptr().cast::<u8>())
            .ok_or_else(|| FpgaError::NoMemory("empty mock buffer".into()))
    }

    unsafe fn unmap_region(
        &self,
        window: u32,
        _addr: NonNull<u8>,
        _size: u64,
    ) -> Result<(), FpgaError> {
        let mut state = self.state.lock();
        if state.fail_unmap {
            return Err(FpgaError::Munmap {
                window,
                e: nix::errno::Errno::EINVAL,
            });
        }
        state.unmaps += 1;
        Ok(())
    }
}

pub const PR_INTERFACE_ID: &str = "a3e6a7c2-5f1e-4b8d-9c0a-1f2e3d4c5b6a";
pub const AFU_ID: &str = "d8424dc4-a4a3-c413-f89e-433683f9040b";

/// Resolver answering from fixed values.
#[derive(Debug, Clone)]
pub struct MockResolver {
    pub bbs_id: u64,
    pub num_slots: u32,
    pub socket_id: u8,
    pub bdf: Bdf,
    pub fail_socket_id: bool,
    pub accelerator_busy: bool,
    pub parent: Option<Token>,
}

impl Default for MockResolver {
    fn default() -> Self {
        init_logger();
        MockResolver {
            bbs_id: 0x0102030400000000,
            num_slots: 1,
            socket_id: 0,
            bdf: Bdf {
                bus: 0x5e,
                device: 0,
                function: 0,
            },
            fail_socket_id: false,
            accelerator_busy: false,
            parent: None,
        }
    }
}

impl IdentityResolver for MockResolver {
    fn afu_id(&self, _device_id: u32) -> Result<Uuid, FpgaError> {
        Uuid::parse_str(AFU_ID).map_err(|e| FpgaError::Exception(e.to_string()))
    }

    fn pr_interface_id(&self, _device_id: u32) -> Result<Uuid, FpgaError> {
        Uuid::parse_str(PR_INTERFACE_ID).map_err(|e| FpgaError::Exception(e.to_string()))
    }

    fn num_slots(&self, _device_id: u32) -> Result<u32, FpgaError> {
        Ok(self.num_slots)
    }

    fn bitstream_id(&self, _device_id: u32) -> Result<u64, FpgaError> {
        Ok(self.bbs_id)
    }

    fn socket_id(&self, device_id: u32) -> Result<u8, FpgaError> {
        if self.fail_socket_id {
            return Err(FpgaError::IORead {
                file: PathBuf::from(format!("intel-fpga-dev.{device_id}/socket_id")),
                e: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(self.socket_id)
    }

    fn bdf(&self, _device_dir: &Path) -> Result<Bdf, FpgaError> {
        Ok(self.bdf)
    }

    fn parent(&self, _token: &Token) -> Option<Token> {
        self.parent.clone()
    }

    fn probe_exclusive_open(&self, _dev_path: &Path) -> bool {
        !self.accelerator_busy
    }
}

static FAKE_SYSFS_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A throwaway copy of the sysfs layout of one card, removed on drop.
pub struct FakeSysfs {
    pub root: PathBuf,
}

impl FakeSysfs {
    pub fn new(device_id: u32) -> FakeSysfs {
        init_logger();
        let root = std::env::temp_dir().join(format!(
            "fpga_access_sysfs_{}_{}",
            std::process::id(),
            FAKE_SYSFS_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let card = root.join(format!("intel-fpga-dev.{device_id}"));
        let fme = card.join(format!("intel-fpga-fme.{device_id}"));
        let port = card.join(format!("intel-fpga-port.{device_id}"));
        std::fs::create_dir_all(fme.join("pr")).expect("create fme dir");
        std::fs::create_dir_all(&port).expect("create port dir");
        std::fs::write(fme.join("pr/interface_id"), format!("{PR_INTERFACE_ID}\n"))
            .expect("write interface_id");
        std::fs::write(fme.join("ports_num"), "1\n").expect("write ports_num");
        std::fs::write(fme.join("bitstream_id"), "0x0123000000000000\n")
            .expect("write bitstream_id");
        std::fs::write(fme.join("socket_id"), "1\n").expect("write socket_id");
        std::fs::write(port.join("afu_id"), "d8424dc4a4a3c413f89e433683f9040b\n")
            .expect("write afu_id");
        std::os::unix::fs::symlink("../../../0000:5e:00.0", card.join("device"))
            .expect("create device link");
        FakeSysfs { root }
    }

    pub fn device_token(&self, device_id: u32) -> Token {
        Token::device(&self.root, device_id)
    }

    /// Accelerator token whose device node is a plain file in the tree, so it can be opened.
    pub fn accelerator_token(&self, device_id: u32) -> Token {
        let token = Token::accelerator(&self.root, device_id);
        let node = self.root.join(format!("port_node.{device_id}"));
        std::fs::write(&node, "").expect("create fake device node");
        Token::new(token.sysfs_path(), node)
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.root.join(relative)).expect("remove attribute");
    }
}

impl Drop for FakeSysfs {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
