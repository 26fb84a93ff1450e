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

//! Bindings to the microkernel primitives consumed by the driver (§6):
//! I/O-port in/out, thread create, interrupt monitor/enable/wait/complete,
//! and inter-task messaging. These are external collaborators — the real
//! syscall bodies are provided by the kernel's runtime support library
//! linked into this task, not implemented here.

#![no_std]

pub mod debug;
pub mod error;
pub mod ioport;
pub mod irq;
pub mod msg;
pub mod thread;

pub use error::KernelError;
pub use ioport::{KernelPortIo, PortIo};
pub use irq::Irq;
pub use msg::TaskId;
