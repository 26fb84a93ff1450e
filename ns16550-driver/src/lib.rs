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

//! User-space driver for the two NS16550-compatible UARTs COM1/COM2,
//! exposed to the rest of the system as `/serial1` and `/serial2` through
//! a VFS broker (see `vfs-protocol`).
//!
//! Two threads run inside this task: the control thread loops on
//! [`scheduler::run`], servicing VFS requests; the interrupt thread loops
//! on [`interrupt::run`], draining/refilling the hardware on IRQ4/IRQ3.
//! Both reach into the same [`port::Ports`] behind each port's spinlock.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod filemng;
pub mod interrupt;
pub mod logging;
pub mod port;
pub mod registers;
pub mod regs;
pub mod rx;
pub mod scheduler;
pub mod state_machine;
pub mod tx;

use kernel_abi::{KernelPortIo, TaskId};

use filemng::BrokerNotifier;
use port::Ports;

static PORTS: Ports<KernelPortIo> = Ports::new(KernelPortIo, KernelPortIo);

static mut INTERRUPT_STACK: [u8; config::INTERRUPT_THREAD_STACK_SIZE] =
    [0; config::INTERRUPT_THREAD_STACK_SIZE];

/// Brings up both ports' hardware and interrupt lines, then spawns the
/// interrupt thread. Must run before the control thread starts servicing
/// requests (§4.5 startup order); failure of any step is fatal (§7 item 4).
pub fn init(broker: TaskId) -> Result<(), kernel_abi::KernelError> {
    logging::init(log::LevelFilter::Info);
    PORTS.init();
    interrupt::start_port(&PORTS, port::Port::Com1, &interrupt::COM1_IRQ)?;
    interrupt::start_port(&PORTS, port::Port::Com2, &interrupt::COM2_IRQ)?;

    // Must be set before the interrupt thread is spawned: that thread reads
    // BROKER on its very first instruction and has no way to wait for us.
    BROKER.with(|cell| *cell = Some(broker));

    // SAFETY: INTERRUPT_STACK is written only here, before the thread that
    // uses it as its stack is spawned, and never touched again from this
    // task (§5 resource lifecycles: the stack must outlive the thread).
    let stack: &'static mut [u8] = unsafe { &mut INTERRUPT_STACK };
    kernel_abi::thread::spawn(interrupt_thread_entry, stack)?;

    Ok(())
}

/// Runs the control thread's request loop. Never returns.
pub fn run_control_thread(broker: TaskId) -> ! {
    let mut notifier = BrokerNotifier { broker };
    scheduler::run(&PORTS, broker, &mut notifier)
}

extern "C" fn interrupt_thread_entry() {
    let broker = BROKER
        .with(|cell| *cell)
        .expect("init() must run before the interrupt thread starts");
    let mut notifier = BrokerNotifier { broker };
    let lines = [(port::Port::Com1, &interrupt::COM1_IRQ), (port::Port::Com2, &interrupt::COM2_IRQ)];
    interrupt::run(&PORTS, &lines, &mut notifier)
}

/// The broker task id, set once by [`init`] and read by the interrupt
/// thread entry point, which (being a bare `extern "C" fn()`) cannot
/// capture it directly.
struct BrokerCell(spin::Mutex<Option<TaskId>>);
impl BrokerCell {
    const fn new() -> Self { Self(spin::Mutex::new(None)) }
    fn with<R>(&self, f: impl FnOnce(&mut Option<TaskId>) -> R) -> R { f(&mut self.0.lock()) }
}
static BROKER: BrokerCell = BrokerCell::new();
