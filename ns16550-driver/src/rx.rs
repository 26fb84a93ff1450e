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

//! RX Controller (§4.3): drains the hardware FIFO into the RX ring on
//! RBR/RBR-timeout interrupts, mirroring `uart_getchar`/`rx_fifo_level`
//! in `uart-driver`.

use kernel_abi::PortIo;

use crate::port::PortState;

/// Drains the hardware FIFO until LSR.DR clears. Uses `push_overwrite`
/// (§3, §4.3): the RX ring drops the oldest byte rather than block or
/// refuse new ones, since there is no backpressure path to the sender.
pub fn rx_drive<P: PortIo>(state: &mut PortState<P>) {
    loop {
        let lsr = state.regs.read_lsr();
        if !lsr.data_ready() {
            break;
        }
        if lsr.has_error() {
            log::warn!("line error on RX (lsr={:?})", lsr);
        }
        let byte = state.regs.read_rbr();
        state.rx.push_overwrite(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RX_RING_CAPACITY, TX_RING_CAPACITY};
    use crate::registers::RegisterBank;
    use crate::regs::{self, Lsr};
    use crate::tx::TxState;
    use core::cell::Cell;
    use ring_buffer::Ring;
    use vfs_protocol::ReadyMask;

    /// Feeds `read_lsr`/`read_rbr` from a fixed byte queue; reports DR=0
    /// once exhausted, like a FIFO that has drained.
    struct QueuedIo {
        bytes: Cell<&'static [u8]>,
    }
    impl PortIo for QueuedIo {
        fn inb(&self, _base: u16, offset: u16) -> u8 {
            if offset == regs::LSR {
                let remaining = self.bytes.get();
                if remaining.is_empty() {
                    0
                } else {
                    Lsr::new().with_data_ready(true).into_bytes()[0]
                }
            } else if offset == regs::RBR {
                let remaining = self.bytes.get();
                let byte = remaining[0];
                self.bytes.set(&remaining[1..]);
                byte
            } else {
                0
            }
        }
        fn outb(&self, _base: u16, _offset: u16, _value: u8) {}
    }

    fn fresh_state(io: QueuedIo) -> PortState<QueuedIo> {
        PortState {
            regs: RegisterBank::new(io, 0x3F8),
            rx: Ring::<RX_RING_CAPACITY>::new(),
            tx: Ring::<TX_RING_CAPACITY>::new(),
            tx_state: TxState::Stopped,
            file: crate::port::FileRecord::new(),
            ready: ReadyMask::NONE,
        }
    }

    #[test]
    fn drains_until_fifo_reports_empty() {
        static BYTES: [u8; 3] = [b'a', b'b', b'c'];
        let mut state = fresh_state(QueuedIo { bytes: Cell::new(&BYTES) });
        rx_drive(&mut state);
        assert_eq!(state.rx.len(), 3);
        let mut out = [0u8; 3];
        state.rx.read_batch(&mut out);
        assert_eq!(&out, b"abc");
    }

    #[test]
    fn empty_fifo_leaves_ring_untouched() {
        static BYTES: [u8; 0] = [];
        let mut state = fresh_state(QueuedIo { bytes: Cell::new(&BYTES) });
        rx_drive(&mut state);
        assert!(state.rx.is_empty());
    }
}
