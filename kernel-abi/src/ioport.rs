// Copyright 2022 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! I/O-port access, brokered through the microkernel (user-space code may
//! not execute `in`/`out` directly on most targets). The kernel's port-I/O
//! syscall is the thing §6 calls "I/O-port byte in/out (single-byte and
//! batched)"; [`PortIo`] is the trait boundary so register code can be
//! exercised against a mock in host tests.

/// A single-byte in/out port-I/O surface for one device's register window.
///
/// Implementations are not required to be `Sync`; callers serialize access
/// themselves (the register bank is always reached through a port lock).
pub trait PortIo {
    /// Reads one byte from `base + offset`.
    fn inb(&self, base: u16, offset: u16) -> u8;

    /// Writes one byte to `base + offset`.
    fn outb(&self, base: u16, offset: u16, value: u8);

    /// Writes `values` to `base + offset` one byte at a time, in order.
    fn outb_batch(&self, base: u16, offset: u16, values: &[u8]) {
        for &value in values {
            self.outb(base, offset, value);
        }
    }
}

/// Real port I/O via the microkernel's syscall, for x86/x86_64 targets.
///
/// The actual `in`/`out` instructions are privileged; `mk_io_port_in` /
/// `mk_io_port_out` are provided by the microkernel's runtime support
/// library linked into this task, the same way the privileged in/out
/// instructions are wrapped by a kernel call on any microkernel that
/// doesn't grant user tasks raw I/O-port access.
#[derive(Clone, Copy, Debug, Default)]
pub struct KernelPortIo;

extern "C" {
    fn mk_io_port_in_byte(port: u16, buf: *mut u8, count: usize) -> usize;
    fn mk_io_port_out_byte(port: u16, buf: *const u8, count: usize) -> usize;
}

impl PortIo for KernelPortIo {
    fn inb(&self, base: u16, offset: u16) -> u8 {
        let mut byte: u8 = 0;
        unsafe {
            mk_io_port_in_byte(base + offset, &mut byte as *mut u8, 1);
        }
        byte
    }

    fn outb(&self, base: u16, offset: u16, value: u8) {
        unsafe {
            mk_io_port_out_byte(base + offset, &value as *const u8, 1);
        }
    }

    fn outb_batch(&self, base: u16, offset: u16, values: &[u8]) {
        if values.is_empty() {
            return;
        }
        unsafe {
            mk_io_port_out_byte(base + offset, values.as_ptr(), values.len());
        }
    }
}
