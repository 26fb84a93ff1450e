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

//! Inter-task messaging: the transport the VFS broker and this driver
//! exchange opcode requests and replies over.

use crate::error::KernelError;

/// Opaque task identifier minted by the kernel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TaskId(pub usize);

extern "C" {
    fn mk_task_get_id(out_id: *mut usize) -> usize;
    fn mk_msg_send(dst: usize, buf: *const u8, len: usize) -> usize;
    fn mk_msg_receive(buf: *mut u8, cap: usize, out_len: *mut usize) -> usize;
}

/// Returns this task's own id, as assigned by the kernel.
pub fn task_id() -> Result<TaskId, KernelError> {
    let mut id: usize = 0;
    let err: KernelError = unsafe { mk_task_get_id(&mut id as *mut usize) }.into();
    Result::from(err)?;
    Ok(TaskId(id))
}

/// Sends `msg` to `dst`. A failed send is logged and dropped by callers
/// (§7 item 4); it never panics or retries on its own.
pub fn send(dst: TaskId, msg: &[u8]) -> Result<(), KernelError> {
    let err: KernelError = unsafe { mk_msg_send(dst.0, msg.as_ptr(), msg.len()) }.into();
    Result::from(err)
}

/// Blocks for the next inbound message, copying it into `buf`. Returns the
/// number of bytes received.
pub fn receive(buf: &mut [u8]) -> Result<usize, KernelError> {
    let mut len: usize = 0;
    let err: KernelError =
        unsafe { mk_msg_receive(buf.as_mut_ptr(), buf.len(), &mut len as *mut usize) }.into();
    Result::from(err)?;
    Ok(len)
}
