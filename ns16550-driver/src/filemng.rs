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

//! File Manager (§4.7): path/gfd resolution, readiness-edge tracking and
//! the VFS_OPEN/READ/WRITE/CLOSE opcode handlers built on top of the
//! state machine and RX/TX controllers.

use kernel_abi::PortIo;
use vfs_protocol::{
    CloseReply, CloseRequest, GlobalFd, OpenReply, OpenRequest, ReadReply, ReadRequest, ReadyMask,
    ResultCode, VfsReady, WriteReply, WriteRequest,
};

use crate::port::{Port, Ports};
use crate::state_machine::{self, FileState};
use crate::tx;

/// Delivers unsolicited `VfsReady` notices to the broker. A trait so host
/// tests can observe notices without a kernel to send them through.
pub trait ReadyNotifier {
    fn notify_ready(&mut self, path: &'static str, ready: ReadyMask);
}

/// Production notifier: serializes `VfsReady` and sends it to the broker
/// task, the way `uart-interface`'s RPC wrappers marshal over CAmkES.
pub struct BrokerNotifier {
    pub broker: kernel_abi::TaskId,
}
impl ReadyNotifier for BrokerNotifier {
    fn notify_ready(&mut self, path: &'static str, ready: ReadyMask) {
        let notice = VfsReady { path, ready };
        let mut buf = [0u8; 64];
        match postcard::to_slice(&notice, &mut buf) {
            Ok(bytes) => {
                if let Err(err) = kernel_abi::msg::send(self.broker, bytes) {
                    log::warn!("VfsReady send to broker failed: {:?}", err);
                }
            }
            Err(err) => log::warn!("VfsReady serialize failed: {:?}", err),
        }
    }
}

/// Recomputes a port's readiness mask and notifies on 0->1 transitions
/// only (§4.7, §8 "edge-only notifications"); repeats are suppressed by
/// comparing against the cached mask under the port lock.
pub fn update_ready<P: PortIo>(ports: &Ports<P>, port: Port, notifier: &mut impl ReadyNotifier) {
    let record = ports.get(port);
    let mut state = record.lock.lock();
    let now = ReadyMask::NONE.with_read(!state.rx.is_empty()).with_write(!state.tx.is_full());
    let edges = now.rising_edges(state.ready);
    state.ready = now;
    drop(state);
    if !edges.is_empty() {
        notifier.notify_ready(record.config.path, now);
    }
}

pub fn handle_open<P: PortIo>(
    ports: &Ports<P>,
    notifier: &mut impl ReadyNotifier,
    req: &OpenRequest,
    gfd: GlobalFd,
    pid: u32,
) -> OpenReply {
    let Some(port) = ports.resolve_path(req.path) else {
        return OpenReply { result: ResultCode::Failure };
    };
    let opened = {
        let mut state = ports.get(port).lock.lock();
        state_machine::on_open(&mut state, gfd, pid)
    };
    if opened {
        update_ready(ports, port, notifier);
    }
    OpenReply { result: ResultCode::from_bool(opened) }
}

pub fn handle_read<'a, P: PortIo>(
    ports: &Ports<P>,
    notifier: &mut impl ReadyNotifier,
    req: &ReadRequest,
    out: &'a mut [u8],
) -> ReadReply<'a> {
    let Some(port) = ports.resolve_gfd(req.gfd) else {
        return ReadReply { result: ResultCode::Failure, ready: ReadyMask::NONE, data: &[] };
    };
    let want = req.size.min(out.len());
    let n = {
        let mut state = ports.get(port).lock.lock();
        if state.file.state != FileState::Opened {
            return ReadReply { result: ResultCode::Failure, ready: ReadyMask::NONE, data: &[] };
        }
        state_machine::on_read(&mut state, &mut out[..want])
    };
    update_ready(ports, port, notifier);
    let ready = ports.get(port).lock.lock().ready;
    ReadReply { result: ResultCode::Success, ready, data: &out[..n] }
}

pub fn handle_write<P: PortIo>(
    ports: &Ports<P>,
    notifier: &mut impl ReadyNotifier,
    req: &WriteRequest,
) -> WriteReply {
    let Some(port) = ports.resolve_gfd(req.gfd) else {
        return WriteReply { result: ResultCode::Failure, ready: ReadyMask::NONE, num_written: 0 };
    };
    let n = {
        let mut state = ports.get(port).lock.lock();
        if state.file.state != FileState::Opened {
            return WriteReply { result: ResultCode::Failure, ready: ReadyMask::NONE, num_written: 0 };
        }
        let n = state_machine::on_write(&mut state, req.data);
        if n > 0 {
            tx::tx_request(&mut state);
        }
        n
    };
    update_ready(ports, port, notifier);
    let ready = ports.get(port).lock.lock().ready;
    WriteReply { result: ResultCode::Success, ready, num_written: n }
}

pub fn handle_close<P: PortIo>(
    ports: &Ports<P>,
    _notifier: &mut impl ReadyNotifier,
    req: &CloseRequest,
) -> CloseReply {
    let Some(port) = ports.resolve_gfd(req.gfd) else {
        return CloseReply { result: ResultCode::Failure };
    };
    // §4.6: close resets the cached readiness mask directly; unlike
    // open/read/write it does not recompute-and-notify, since there is no
    // longer an open descriptor for the broker to notify about.
    let mut state = ports.get(port).lock.lock();
    state_machine::on_close(&mut state);
    CloseReply { result: ResultCode::Success }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Ports;
    use kernel_abi::PortIo;

    #[derive(Clone, Copy, Default)]
    struct NullIo;
    impl PortIo for NullIo {
        fn inb(&self, _base: u16, _offset: u16) -> u8 { 0 }
        fn outb(&self, _base: u16, _offset: u16, _value: u8) {}
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: std::vec::Vec<(&'static str, ReadyMask)>,
    }
    impl ReadyNotifier for RecordingNotifier {
        fn notify_ready(&mut self, path: &'static str, ready: ReadyMask) {
            self.notices.push((path, ready));
        }
    }

    fn fresh_ports() -> Ports<NullIo> { Ports::new(NullIo, NullIo) }

    #[test]
    fn open_unknown_path_fails() {
        let ports = fresh_ports();
        let mut notifier = RecordingNotifier::default();
        let reply = handle_open(&ports, &mut notifier, &OpenRequest { path: "/nope" }, 1, 1);
        assert_eq!(reply.result, ResultCode::Failure);
    }

    #[test]
    fn open_then_second_open_rejected() {
        let ports = fresh_ports();
        let mut notifier = RecordingNotifier::default();
        let first = handle_open(&ports, &mut notifier, &OpenRequest { path: "/serial1" }, 1, 1);
        assert_eq!(first.result, ResultCode::Success);
        let second = handle_open(&ports, &mut notifier, &OpenRequest { path: "/serial1" }, 2, 1);
        assert_eq!(second.result, ResultCode::Failure);
    }

    #[test]
    fn write_then_read_round_trips_through_rings() {
        let ports = fresh_ports();
        let mut notifier = RecordingNotifier::default();
        handle_open(&ports, &mut notifier, &OpenRequest { path: "/serial1" }, 5, 1);
        {
            let mut state = ports.com1.lock.lock();
            state.rx.push_overwrite(b'x');
        }
        let mut buf = [0u8; 8];
        let reply =
            handle_read(&ports, &mut notifier, &ReadRequest { gfd: 5, offset: 0, size: 8 }, &mut buf);
        assert_eq!(reply.result, ResultCode::Success);
        assert_eq!(reply.data, b"x");
    }

    #[test]
    fn close_unknown_gfd_fails() {
        let ports = fresh_ports();
        let mut notifier = RecordingNotifier::default();
        let reply = handle_close(&ports, &mut notifier, &CloseRequest { gfd: 99 });
        assert_eq!(reply.result, ResultCode::Failure);
    }

    #[test]
    fn readiness_notice_sent_only_on_rising_edge() {
        let ports = fresh_ports();
        let mut notifier = RecordingNotifier::default();
        handle_open(&ports, &mut notifier, &OpenRequest { path: "/serial1" }, 5, 1);
        notifier.notices.clear();
        {
            let mut state = ports.com1.lock.lock();
            state.rx.push_overwrite(b'a');
        }
        update_ready(&ports, Port::Com1, &mut notifier);
        assert_eq!(notifier.notices.len(), 1);
        update_ready(&ports, Port::Com1, &mut notifier);
        assert_eq!(notifier.notices.len(), 1);
    }
}
