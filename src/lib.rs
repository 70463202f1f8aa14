//! A small, real-time, event-driven kernel for 32-bit microcontrollers.
//!
//! The scheduler, event subsystem, and synchronization primitives are
//! written once against the [`port::Port`] trait and linked against
//! whichever concrete target provides the assembly glue, the tick
//! peripheral, and stack memory (§1, §3). An integrating application:
//!
//! ```ignore
//! struct MyPort; // implements `port::Port`
//!
//! static KERNEL: Kernel<MyPort> = Kernel::new(MyPort);
//! static mut MAIN_TASK: Task = Task::new();
//!
//! extern "C" fn main_task(_: *mut u8) -> ! {
//!     loop {
//!         unsafe { task::delay(&KERNEL, 100) };
//!     }
//! }
//!
//! fn boot() -> ! {
//!     unsafe {
//!         MAIN_TASK.create(&KERNEL, 1024, main_task, core::ptr::null_mut()).unwrap();
//!         MAIN_TASK.enable(&KERNEL);
//!     }
//!     KERNEL.start(16_000_000);
//! }
//! ```
//!
//! See each module for the corresponding design-spec section.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod context;
pub mod error;
#[cfg(feature = "events")]
pub mod event;
pub mod features;
pub mod hooks;
pub mod kernel;
pub mod port;
pub mod process;
pub mod sched;
#[cfg(test)]
mod test_support;
#[cfg(feature = "sw-interrupts")]
pub mod swi;
#[cfg(feature = "events")]
pub mod sync;
pub mod task;

pub use error::{KernelError, KernelResult};
pub use kernel::Kernel;
pub use port::Port;
pub use process::{Priority, ProcessKind, ProcessRecord, ProcessStatus};
pub use task::Task;
