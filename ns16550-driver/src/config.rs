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

//! Compile-time configuration: I/O bases, IRQ wiring, mount paths, buffer
//! sizes. Out of scope for redesign (§1); kept as plain constants the way
//! `uart-driver` keeps `UART_FIFO_CAPACITY`/`BAUD_RATE` at the top of its
//! `lib.rs`.

use crate::port::Port;

/// RX ring must absorb bursts without blocking the interrupt thread;
/// TX ring need only outrun the 16-byte hardware FIFO (§3).
pub const RX_RING_CAPACITY: usize = 4096;
pub const TX_RING_CAPACITY: usize = 256;

pub const COM1_IOBASE: u16 = 0x03F8;
pub const COM2_IOBASE: u16 = 0x02F8;

pub const COM1_IRQ: u8 = 4;
pub const COM2_IRQ: u8 = 3;

pub const COM1_PATH: &str = "/serial1";
pub const COM2_PATH: &str = "/serial2";

pub struct PortConfig {
    pub port: Port,
    pub io_base: u16,
    pub irq_number: u8,
    pub irq_mask: usize,
    pub path: &'static str,
}

/// One entry per configured port; iterated with `.iter()` everywhere so
/// there is no hand-rolled `id <= N` loop to get wrong (§9 open question:
/// the source's `main.c` has an off-by-one here).
pub const PORTS: [PortConfig; 2] = [
    PortConfig { port: Port::Com1, io_base: COM1_IOBASE, irq_number: COM1_IRQ, irq_mask: 0b01, path: COM1_PATH },
    PortConfig { port: Port::Com2, io_base: COM2_IOBASE, irq_number: COM2_IRQ, irq_mask: 0b10, path: COM2_PATH },
];

pub const fn config_for(port: Port) -> &'static PortConfig {
    match port {
        Port::Com1 => &PORTS[0],
        Port::Com2 => &PORTS[1],
    }
}

pub const INTERRUPT_THREAD_STACK_SIZE: usize = 16 * 1024;

/// Largest read serviced in one request; bounds the on-stack scratch
/// buffer in the scheduler shim (§4.8).
pub const MAX_READ_SIZE: usize = 4096;
