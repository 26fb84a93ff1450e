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

//! Interrupt registration and the blocking wait/complete cycle.
//!
//! One notification carries every IRQ line this task consumes (COM1's
//! IRQ4 and COM2's IRQ3 share a single interrupt thread, per §4.3), badged
//! the same way the shared-IRQ CAmkES connections badge a single
//! notification object: each line gets a distinct bit of the mask
//! `irq_wait` returns.

use crate::error::KernelError;

extern "C" {
    fn mk_int_start_monitoring(irq: u8) -> usize;
    fn mk_int_enable(irq: u8) -> usize;
    fn mk_int_wait() -> usize;
    fn mk_int_complete(irq: u8);
}

/// A single hardware interrupt line, identified by its number and the bit
/// it occupies in the bitmask returned by [`irq_wait`].
#[derive(Debug)]
pub struct Irq {
    name: &'static str,
    number: u8,
    mask: usize,
}

impl Irq {
    pub const fn new(name: &'static str, number: u8, mask: usize) -> Self { Self { name, number, mask } }

    pub fn name(&self) -> &str { self.name }
    pub fn number(&self) -> u8 { self.number }
    pub fn mask(&self) -> usize { self.mask }

    /// True if this line's bit is set in a mask returned by [`irq_wait`].
    pub fn is_present(&self, fired: usize) -> bool { (fired & self.mask) != 0 }

    /// Begins kernel monitoring of this line, then enables delivery.
    /// Called once at startup; failure of either step is fatal (§7 item 4).
    pub fn start(&self) -> Result<(), KernelError> {
        let err: KernelError = unsafe { mk_int_start_monitoring(self.number) }.into();
        Result::from(err)?;
        let err: KernelError = unsafe { mk_int_enable(self.number) }.into();
        Result::from(err)
    }

    /// Acknowledges completion of this line's interrupt, letting the kernel
    /// deliver the next one.
    pub fn complete(&self) { unsafe { mk_int_complete(self.number) } }
}

/// Blocks until at least one monitored line fires; returns the bitmask of
/// lines that did (possibly more than one).
pub fn irq_wait() -> usize { unsafe { mk_int_wait() } }
