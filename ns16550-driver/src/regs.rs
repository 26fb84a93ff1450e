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

//! NS16550 register offsets and bit layouts (§6). This is the fixed
//! external hardware contract: consumed here, not redesigned.

use modular_bitfield::prelude::*;

// I/O-port offsets from the port's base address.
pub const RBR: u16 = 0; // R
pub const THR: u16 = 0; // W
pub const DLL: u16 = 0; // W, LCR.DLAB=1
pub const IER: u16 = 1; // W
pub const DLM: u16 = 1; // W, LCR.DLAB=1
pub const IIR: u16 = 2; // R
pub const FCR: u16 = 2; // W
pub const LCR: u16 = 3; // W
pub const MCR: u16 = 4; // W
pub const LSR: u16 = 5; // R
pub const MSR: u16 = 6; // R

pub const DIVISOR_LATCH_DEFAULT: u16 = 0x000C;
pub const TX_FIFO_DEPTH: usize = 16;

/// IIR cause field, masked with 0x0E (bits 1-3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IirCause {
    Msr,
    ThrEmpty,
    Rbr,
    Lsr,
    RbrTimeout,
    Unknown(u8),
}
impl IirCause {
    pub fn from_iir(iir: u8) -> Option<Self> {
        if iir & 0x01 != 0 {
            // Pending bit set means no interrupt pending.
            return None;
        }
        Some(match iir & 0x0E {
            0x00 => Self::Msr,
            0x02 => Self::ThrEmpty,
            0x04 => Self::Rbr,
            0x06 => Self::Lsr,
            0x0C => Self::RbrTimeout,
            other => Self::Unknown(other),
        })
    }
}

#[bitfield]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ier {
    pub rbr: bool,
    pub thr: bool,
    pub lsr: bool,
    pub msr: bool,
    #[skip]
    __: B4,
}

#[bitfield]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fcr {
    pub fifo_enable: bool,
    pub rxfifo_reset: bool,
    pub txfifo_reset: bool,
    #[skip]
    __: B3,
    pub rx_trigger: B2,
}
pub const RX_TRIGGER_14: u8 = 0b11;

#[bitfield]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lcr {
    pub word_length: B2,
    pub stop_bits: bool,
    pub parity_enable: bool,
    pub parity_even: bool,
    pub stick_parity: bool,
    pub set_break: bool,
    pub dlab: bool,
}
pub const WORD_LENGTH_8: u8 = 0b11;

#[bitfield]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Mcr {
    pub dtr: bool,
    pub rts: bool,
    pub out1: bool,
    pub out2: bool,
    pub loopback: bool,
    #[skip]
    __: B3,
}

#[bitfield]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lsr {
    pub data_ready: bool,
    pub overrun_error: bool,
    pub parity_error: bool,
    pub framing_error: bool,
    pub break_interrupt: bool,
    pub thr_empty: bool,
    pub tx_empty: bool,
    pub rx_fifo_error: bool,
}
impl Lsr {
    /// Any of the line-error bits §7 item 3 asks to be logged.
    pub fn has_error(&self) -> bool {
        self.overrun_error() || self.parity_error() || self.framing_error() || self.break_interrupt()
    }
}
