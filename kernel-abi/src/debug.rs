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

//! The kernel's debug-output syscall, the destination for this task's log
//! messages (§7 item 4 "driver logs...through whatever facility the
//! platform provides").

extern "C" {
    fn mk_debug_write(buf: *const u8, len: usize);
}

/// Writes `line` to the kernel's debug console. Best-effort: the syscall
/// has no failure return, matching a debug sink nothing else depends on.
pub fn write_line(line: &[u8]) {
    unsafe { mk_debug_write(line.as_ptr(), line.len()) }
}
