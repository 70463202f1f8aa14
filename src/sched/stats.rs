//! Per-process cycle accounting, compiled in only with `statistics` (§4.9).
//!
//! Grounded on the teacher's switch-time cycle counting
//! (`utils/system/timer.rs`'s `TIMER_INTERRUPT_COUNT`/`UPTIME_MS` pair of
//! free-running atomics sampled at fixed points), adapted here to sample
//! [`Port::read_cycle_counter`] at every switch instead of a millisecond
//! timer, and to attribute the delta to the process that was *running*
//! rather than a global counter.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::port::Port;
use crate::process::ProcessRecord;

static LAST_SWITCH_CYCLE: AtomicU32 = AtomicU32::new(0);

/// Called from [`crate::context::enter`] with the critical section held.
///
/// # Safety
/// `previous` must point at a live `ProcessRecord`.
pub unsafe fn record_switch<P: Port>(
    port: &P,
    previous: *mut ProcessRecord,
    _next: *mut ProcessRecord,
) {
    let now = port.read_cycle_counter();
    let last = LAST_SWITCH_CYCLE.swap(now, Ordering::Relaxed);
    // Wrapping: the cycle counter is free-running and will wrap on every
    // target eventually; wrapping_sub gives the correct delta regardless.
    let elapsed = now.wrapping_sub(last);
    if !previous.is_null() {
        (*previous).cycles = (*previous).cycles.wrapping_add(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessKind;

    struct FakeCycles(core::cell::Cell<u32>);

    impl crate::port::Port for FakeCycles {
        fn critical_enter(&self) {}
        fn critical_leave(&self) {}
        fn is_critical(&self) -> bool {
            false
        }
        fn read_cycle_counter(&self) -> u32 {
            self.0.get()
        }
        fn setup_tick(&self, _ref_hz: u32) {}
        fn switch_context(&self, _current: &mut ProcessRecord, _next: &ProcessRecord, _bypass_save: bool) {}
        unsafe fn context_load(
            &self,
            _stack: &mut crate::port::StackBuffer,
            _entry: extern "C" fn(*mut u8),
            _args: *mut u8,
        ) -> Option<*mut u8> {
            Some(core::ptr::null_mut())
        }
        fn stack_pointer(&self, _process: &ProcessRecord) -> *mut u8 {
            core::ptr::null_mut()
        }
        fn set_stack_pointer(&self, _process: &mut ProcessRecord, _sp: *mut u8) {}
        fn acquire(&self, _n: usize) -> Option<crate::port::StackBuffer> {
            None
        }
        unsafe fn release(&self, _buffer: crate::port::StackBuffer) {}
    }

    #[test]
    fn attributes_elapsed_cycles_to_the_outgoing_process() {
        let port = FakeCycles(core::cell::Cell::new(100));
        let mut proc = ProcessRecord::new(ProcessKind::Task);
        unsafe {
            record_switch(&port, &mut proc as *mut _, core::ptr::null_mut());
        }
        port.0.set(140);
        unsafe {
            record_switch(&port, &mut proc as *mut _, core::ptr::null_mut());
        }
        assert_eq!(proc.cycles(), 40);
    }
}
