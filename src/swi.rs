//! Software interrupts: handlers that run to completion on the
//! application's own stack, never preempted by the tick scheduler
//! (§4.4).
//!
//! Grounded on `os_interrupt.c`'s `__os_interrupt_handler` trampoline: a
//! software interrupt never gets its own saved register frame (`sp` stays
//! null, see `os_interrupt_setup`) because it is never switched *into* —
//! the hardware vector calls its handler directly. The trampoline exists
//! to make that borrowed execution visible to the rest of the kernel: it
//! disables the interrupt's own process record (so nothing tries to
//! schedule it while its handler is already running), runs the handler,
//! then performs a cooperative switch with `bypass_save = true` — there
//! is no frame to save because nothing was ever restored to get here.

use crate::kernel::Kernel;
use crate::port::Port;
use crate::process::{ProcessKind, ProcessRecord};

/// A software interrupt's identity within the scheduler. Does not own a
/// stack — it borrows whatever stack the hardware was already running on
/// when it fired (§4.4).
pub struct SoftwareInterrupt {
    pub(crate) record: ProcessRecord,
    handler: fn(*mut u8),
}

impl SoftwareInterrupt {
    pub const fn new(handler: fn(*mut u8)) -> Self {
        SoftwareInterrupt {
            record: ProcessRecord::new(ProcessKind::SoftwareInterrupt),
            handler,
        }
    }

    /// Link this interrupt into the ready list. An interrupt must be
    /// enabled before [`SoftwareInterrupt::trigger`] will run its handler
    /// with scheduler bookkeeping intact — mirrors tasks' disabled-at-
    /// creation default (§4.4, §4.9).
    pub fn enable<P: Port>(&mut self, kernel: &Kernel<P>) {
        kernel.enable_process(&mut self.record);
    }

    pub fn disable<P: Port>(&mut self, kernel: &Kernel<P>) {
        kernel.disable_process(&mut self.record);
    }

    /// Run this interrupt's handler on the caller's stack. Must be called
    /// from the actual hardware ISR context (never from task code) —
    /// `args` is passed through to the handler unexamined.
    ///
    /// # Safety
    /// Must be invoked with the tick/hardware interrupt already disabled
    /// on entry, and the caller must not itself be a process the
    /// scheduler believes is the one that was interrupted other than
    /// `kernel.current_process()`.
    pub unsafe fn trigger<P: Port>(&mut self, kernel: &Kernel<P>, args: *mut u8) {
        // Held across the disable, the handler, and the switch — matching
        // `__os_interrupt_handler`'s single `os_enter_critical()` that is
        // never left until after `os_switch_context`, so a real tick firing
        // mid-handler cannot preempt it (§4.4).
        let _guard = crate::port::CriticalSection::enter(kernel.port());
        kernel.disable_process(&mut self.record);

        crate::hooks::pre_interrupt();
        (self.handler)(args);
        crate::hooks::post_interrupt();

        kernel.cooperative_switch(true);
    }
}
