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

//! Register Bank (§4.1): typed read/write of the NS16550 registers for one
//! port, with a cached shadow of IER/FCR/LCR/MCR and the divisor latch so
//! bit-field setters can read-modify-write without re-reading the device.

use kernel_abi::PortIo;

use crate::regs::{self, Fcr, Ier, Lcr, Lsr, Mcr};

pub struct RegisterBank<P: PortIo> {
    io: P,
    base: u16,
    ier_shadow: u8,
    fcr_shadow: u8,
    lcr_shadow: u8,
    mcr_shadow: u8,
    divisor_shadow: u16,
}

impl<P: PortIo> RegisterBank<P> {
    pub const fn new(io: P, base: u16) -> Self {
        Self {
            io,
            base,
            ier_shadow: 0,
            fcr_shadow: 0,
            lcr_shadow: 0,
            mcr_shadow: 0,
            divisor_shadow: 0,
        }
    }

    /// Device bring-up per §4.1: all interrupts masked, MCR/LCR/FCR/divisor
    /// set to their power-on-safe defaults.
    pub fn init(&mut self) {
        self.set_ier(0xFF, 0x00);
        self.set_mcr(
            0xFF,
            Mcr::new().with_dtr(true).with_rts(true).with_out1(false).with_out2(false).into_bytes()[0],
        );
        self.set_lcr(
            0xFF,
            Lcr::new().with_word_length(regs::WORD_LENGTH_8).with_dlab(false).into_bytes()[0],
        );
        self.set_divisor(regs::DIVISOR_LATCH_DEFAULT);
        self.set_fcr(
            0xFF,
            Fcr::new()
                .with_fifo_enable(true)
                .with_rxfifo_reset(true)
                .with_txfifo_reset(true)
                .with_rx_trigger(regs::RX_TRIGGER_14)
                .into_bytes()[0],
        );
    }

    /// Exposes the underlying [`PortIo`] for callers that need to drive it
    /// directly (host tests simulating hardware activity).
    pub fn io(&self) -> &P { &self.io }

    pub fn read_iir(&self) -> u8 { self.io.inb(self.base, regs::IIR) }
    pub fn read_lsr(&self) -> Lsr { Lsr::from_bytes([self.io.inb(self.base, regs::LSR)]) }
    pub fn read_msr(&self) -> u8 { self.io.inb(self.base, regs::MSR) }
    pub fn read_rbr(&self) -> u8 { self.io.inb(self.base, regs::RBR) }

    /// Writes `bytes` to THR in one batch (up to the FIFO's capacity; it is
    /// the caller's job to not exceed the level the FIFO can currently take).
    pub fn write_thr(&self, bytes: &[u8]) { self.io.outb_batch(self.base, regs::THR, bytes); }

    pub fn ier(&self) -> Ier { Ier::from_bytes([self.ier_shadow]) }

    pub fn set_ier(&mut self, mask: u8, value: u8) {
        let value = (value & mask) | (self.ier_shadow & !mask);
        self.io.outb(self.base, regs::IER, value);
        self.ier_shadow = value;
    }

    pub fn set_fcr(&mut self, mask: u8, value: u8) {
        let value = (value & mask) | (self.fcr_shadow & !mask);
        self.io.outb(self.base, regs::FCR, value);
        // FCR's reset bits self-clear in hardware; don't retain them in the
        // shadow (§12 "FCR shadow masks out the self-clearing reset bits").
        let reset_bits = Fcr::new().with_rxfifo_reset(true).with_txfifo_reset(true).into_bytes()[0];
        self.fcr_shadow = value & !reset_bits;
    }

    pub fn set_lcr(&mut self, mask: u8, value: u8) {
        let value = (value & mask) | (self.lcr_shadow & !mask);
        self.io.outb(self.base, regs::LCR, value);
        self.lcr_shadow = value;
    }

    pub fn set_mcr(&mut self, mask: u8, value: u8) {
        let value = (value & mask) | (self.mcr_shadow & !mask);
        self.io.outb(self.base, regs::MCR, value);
        self.mcr_shadow = value;
    }

    /// Sets the baud-rate divisor. Initialization-only: concurrent traffic
    /// with DLAB set corrupts received bytes (§4.1).
    pub fn set_divisor(&mut self, value: u16) {
        self.divisor_shadow = value;
        let dlab_mask = Lcr::new().with_dlab(true).into_bytes()[0];
        self.set_lcr(dlab_mask, dlab_mask);
        self.io.outb(self.base, regs::DLL, (value & 0x00FF) as u8);
        self.io.outb(self.base, regs::DLM, (value >> 8) as u8);
        self.set_lcr(dlab_mask, 0);
    }
}
