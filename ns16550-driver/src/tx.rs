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

//! TX Controller (§4.4): keeps the hardware FIFO fed from the TX ring and
//! turns THR-empty interrupts on only while there is something to send,
//! mirroring `fill_tx_fifo`/`tx_fifo_level` in `uart-driver`.

use kernel_abi::PortIo;

use crate::regs::TX_FIFO_DEPTH;
use crate::port::PortState;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxState {
    /// THR-empty interrupt is enabled; the ring is expected to keep feeding it.
    Started,
    /// THR-empty interrupt is disabled; nothing queued last time it fired.
    Stopped,
}

/// Refills the hardware FIFO from the ring. Called on THR-empty (from the
/// interrupt thread) and right after a write lands in an empty ring
/// (§4.4 "a write into an empty ring must itself (re)start TX").
pub fn tx_drive<P: PortIo>(state: &mut PortState<P>) {
    let mut batch = [0u8; TX_FIFO_DEPTH];
    let n = state.tx.read_batch(&mut batch);
    if n > 0 {
        state.regs.write_thr(&batch[..n]);
        ensure_started(state);
    } else {
        stop(state);
    }
}

/// Called after a write enqueues bytes. If TX was stopped (ring was empty
/// last time the interrupt fired), kicks it back on; an already-running TX
/// will pick the new bytes up on its own.
pub fn tx_request<P: PortIo>(state: &mut PortState<P>) {
    if state.tx_state == TxState::Stopped {
        ensure_started(state);
    }
}

fn ensure_started<P: PortIo>(state: &mut PortState<P>) {
    if state.tx_state != TxState::Started {
        let thr_bit = crate::regs::Ier::new().with_thr(true).into_bytes()[0];
        state.regs.set_ier(thr_bit, thr_bit);
        state.tx_state = TxState::Started;
    }
}

fn stop<P: PortIo>(state: &mut PortState<P>) {
    if state.tx_state != TxState::Stopped {
        let thr_bit = crate::regs::Ier::new().with_thr(true).into_bytes()[0];
        state.regs.set_ier(thr_bit, 0);
        state.tx_state = TxState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RX_RING_CAPACITY, TX_RING_CAPACITY};
    use crate::registers::RegisterBank;
    use ring_buffer::Ring;
    use vfs_protocol::ReadyMask;

    #[derive(Default)]
    struct RecordingIo;
    impl PortIo for RecordingIo {
        fn inb(&self, _base: u16, _offset: u16) -> u8 { 0 }
        fn outb(&self, _base: u16, _offset: u16, _value: u8) {}
    }

    fn fresh_state() -> PortState<RecordingIo> {
        PortState {
            regs: RegisterBank::new(RecordingIo, 0x3F8),
            rx: Ring::<RX_RING_CAPACITY>::new(),
            tx: Ring::<TX_RING_CAPACITY>::new(),
            tx_state: TxState::Stopped,
            file: crate::port::FileRecord::new(),
            ready: ReadyMask::NONE,
        }
    }

    #[test]
    fn drive_on_empty_ring_stops() {
        let mut state = fresh_state();
        state.tx_state = TxState::Started;
        tx_drive(&mut state);
        assert_eq!(state.tx_state, TxState::Stopped);
        assert!(!state.regs.ier().thr(), "§8: TxState STOPPED ⇔ IER.THR=0");
    }

    #[test]
    fn drive_with_data_starts_and_drains_up_to_fifo_depth() {
        let mut state = fresh_state();
        for b in 0..20u8 {
            assert!(state.tx.push(b));
        }
        tx_drive(&mut state);
        assert_eq!(state.tx_state, TxState::Started);
        assert_eq!(state.tx.len(), 4);
        assert!(state.regs.ier().thr(), "§8: TxState STARTED ⇔ IER.THR=1");
    }

    #[test]
    fn request_restarts_stopped_tx_with_pending_bytes() {
        let mut state = fresh_state();
        state.tx.push(1);
        tx_request(&mut state);
        assert_eq!(state.tx_state, TxState::Started);
        assert!(state.regs.ier().thr());
    }

    #[test]
    fn request_starts_tx_unconditionally_when_stopped() {
        let mut state = fresh_state();
        tx_request(&mut state);
        assert_eq!(state.tx_state, TxState::Started);
        assert!(state.regs.ier().thr());
    }

    #[test]
    fn request_is_noop_when_already_started() {
        let mut state = fresh_state();
        state.tx_state = TxState::Started;
        tx_request(&mut state);
        assert_eq!(state.tx_state, TxState::Started);
    }
}
