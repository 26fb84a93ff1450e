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

//! A `log::Log` implementation writing through the kernel's debug-console
//! syscall, the way `cantrip-os-common::logger`'s `CantripLogger` writes
//! through a CAmkES RPC endpoint instead.

use core2::io::{Cursor, Write};
use log::{Level, LevelFilter, Log, Metadata, Record};

pub const MAX_MSG_LEN: usize = 512;

pub struct DebugLogger;

impl Log for DebugLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool { true }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut buf = [0u8; MAX_MSG_LEN];
        let mut cursor = Cursor::new(&mut buf[..]);
        write!(&mut cursor, "{}::{}::{}\n", level_tag(record.level()), record.target(), record.args())
            .unwrap_or_else(|_| {
                cursor.set_position((MAX_MSG_LEN - 4) as u64);
                let _ = cursor.write(b"...\n");
            });
        let pos = cursor.position() as usize;
        kernel_abi::debug::write_line(&buf[..pos]);
    }

    fn flush(&self) {}
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

static DEBUG_LOGGER: DebugLogger = DebugLogger;

/// Installs [`DebugLogger`] as the global logger. Called once at startup
/// (§7 item 4); a second call is a programmer error, not a runtime one.
pub fn init(level: LevelFilter) {
    log::set_logger(&DEBUG_LOGGER).expect("logger already installed");
    log::set_max_level(level);
}
