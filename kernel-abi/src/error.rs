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

use num_enum::{FromPrimitive, IntoPrimitive};

/// Failure of a microkernel syscall (thread create, interrupt registration,
/// message send/receive, task-id query).
#[repr(usize)]
#[derive(Debug, Default, Eq, PartialEq, FromPrimitive, IntoPrimitive)]
pub enum KernelError {
    Success = 0,
    NoResource,
    BadHandle,
    WouldBlock,
    #[default]
    UnknownError,
}
impl From<KernelError> for Result<(), KernelError> {
    fn from(err: KernelError) -> Result<(), KernelError> {
        if err == KernelError::Success {
            Ok(())
        } else {
            Err(err)
        }
    }
}
