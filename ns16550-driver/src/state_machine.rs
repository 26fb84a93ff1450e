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

//! Per-Port State Machine (§4.6): CLOSED/OPENED, one state per port. Two
//! states is too small to justify a table-driven dispatcher; a direct
//! match on (state, event) is what the source's own `Ioctrl.c` does.

use kernel_abi::PortIo;
use ring_buffer::OverflowPolicy;
use vfs_protocol::GlobalFd;

use crate::port::PortState;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileState {
    Closed,
    Opened,
}

/// VFS_OPEN. Rejects a second open while one is already outstanding
/// (§4.6 "AlreadyOpen"); clears the RX ring so a reopen never serves
/// bytes received while nobody held the file.
pub fn on_open<P: PortIo>(state: &mut PortState<P>, gfd: GlobalFd, pid: u32) -> bool {
    match state.file.state {
        FileState::Closed => {
            state.rx.clear();
            state.file.state = FileState::Opened;
            state.file.gfd = gfd;
            state.file.pid = pid;
            true
        }
        FileState::Opened => false,
    }
}

/// VFS_READ. Only reachable once a gfd resolves to this port, which only
/// happens in OPENED (§4.7); drains whatever is in the RX ring, up to
/// `out.len()`, short reads included.
pub fn on_read<P: PortIo>(state: &mut PortState<P>, out: &mut [u8]) -> usize {
    state.rx.read_batch(out)
}

/// VFS_WRITE. Queues as much of `data` as the TX ring has room for and
/// leaves the rest for the caller to retry; never blocks (§4.4).
pub fn on_write<P: PortIo>(state: &mut PortState<P>, data: &[u8]) -> usize {
    state.tx.write_batch(data, OverflowPolicy::Reject)
}

/// VFS_CLOSE. Returns the port to CLOSED regardless of what is still
/// queued; in-flight TX bytes keep draining, matching the source's
/// close-does-not-flush behavior (§12). Resets the cached readiness mask
/// (§4.6) so a later reopen starts edge detection from a clean baseline.
pub fn on_close<P: PortIo>(state: &mut PortState<P>) {
    state.file.state = FileState::Closed;
    state.file.gfd = 0;
    state.file.pid = 0;
    state.ready = vfs_protocol::ReadyMask::NONE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RX_RING_CAPACITY, TX_RING_CAPACITY};
    use crate::registers::RegisterBank;
    use ring_buffer::Ring;
    use vfs_protocol::ReadyMask;

    #[derive(Default)]
    struct NullIo;
    impl PortIo for NullIo {
        fn inb(&self, _base: u16, _offset: u16) -> u8 { 0 }
        fn outb(&self, _base: u16, _offset: u16, _value: u8) {}
    }

    fn fresh_state() -> PortState<NullIo> {
        PortState {
            regs: RegisterBank::new(NullIo, 0x3F8),
            rx: Ring::<RX_RING_CAPACITY>::new(),
            tx: Ring::<TX_RING_CAPACITY>::new(),
            tx_state: crate::tx::TxState::Stopped,
            file: crate::port::FileRecord::new(),
            ready: ReadyMask::NONE,
        }
    }

    #[test]
    fn second_open_rejected() {
        let mut state = fresh_state();
        assert!(on_open(&mut state, 7, 1));
        assert!(!on_open(&mut state, 8, 2));
        assert_eq!(state.file.gfd, 7);
    }

    #[test]
    fn reopen_after_close_clears_rx() {
        let mut state = fresh_state();
        assert!(on_open(&mut state, 7, 1));
        state.rx.push_overwrite(0x41);
        on_close(&mut state);
        assert!(on_open(&mut state, 9, 1));
        assert!(state.rx.is_empty());
    }

    #[test]
    fn read_drains_only_whats_buffered() {
        let mut state = fresh_state();
        on_open(&mut state, 1, 1);
        state.rx.push_overwrite(b'a');
        state.rx.push_overwrite(b'b');
        let mut out = [0u8; 8];
        let n = on_read(&mut state, &mut out);
        assert_eq!(n, 2);
        assert_eq!(&out[..n], b"ab");
    }

    #[test]
    fn write_rejects_past_capacity() {
        let mut state = fresh_state();
        on_open(&mut state, 1, 1);
        let full = [0u8; TX_RING_CAPACITY];
        assert_eq!(on_write(&mut state, &full), TX_RING_CAPACITY);
        assert_eq!(on_write(&mut state, &[1, 2, 3]), 0);
    }
}
