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

//! Kernel thread creation with an explicit, caller-owned stack.

use crate::error::KernelError;

extern "C" {
    fn mk_thread_create(entry: extern "C" fn(), stack: *mut u8, stack_len: usize) -> usize;
}

/// Spawns a kernel thread running `entry`, using `stack` as its stack.
///
/// `stack` must outlive the thread; the interrupt thread's stack is
/// allocated once at startup as a `static mut` array for exactly this
/// reason (§5 resource lifecycles).
pub fn spawn(entry: extern "C" fn(), stack: &'static mut [u8]) -> Result<(), KernelError> {
    let err: KernelError =
        unsafe { mk_thread_create(entry, stack.as_mut_ptr(), stack.len()) }.into();
    Result::from(err)
}
