//! Host-side fake [`Port`] used only by `#[cfg(test)]` unit tests (§A.4).
//!
//! There is no real register file to save/restore or stack to switch onto
//! on the host, so [`TestPort::switch_context`] is a stand-in: it records
//! nothing and returns immediately rather than transferring control the
//! way a real target's assembly stub would. That is enough to exercise the
//! ready-list, task-lifecycle, and event-registration logic this crate
//! owns; it is not a substitute for running the kernel on a target.

use std::boxed::Box;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::vec::Vec;

use crate::port::{Port, StackBuffer};
use crate::process::ProcessRecord;

pub struct TestPort {
    critical: AtomicBool,
    cycles: AtomicU32,
    fail_next_acquire: AtomicBool,
    // Keeps acquired buffers alive for the test's duration; `release` does
    // not need to do anything beyond what dropping this does at the end of
    // the test.
    pool: Mutex<Vec<Box<[u8]>>>,
}

impl TestPort {
    pub fn new() -> Self {
        TestPort {
            critical: AtomicBool::new(false),
            cycles: AtomicU32::new(0),
            fail_next_acquire: AtomicBool::new(false),
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next call to `acquire` return `None`, simulating an
    /// exhausted stack pool (§4.3 `AllocationFailure`).
    pub fn fail_next_acquire(&self) {
        self.fail_next_acquire.store(true, Ordering::SeqCst);
    }
}

impl Default for TestPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for TestPort {
    fn critical_enter(&self) {
        self.critical.store(true, Ordering::SeqCst);
    }

    fn critical_leave(&self) {
        self.critical.store(false, Ordering::SeqCst);
    }

    fn is_critical(&self) -> bool {
        self.critical.load(Ordering::SeqCst)
    }

    fn read_cycle_counter(&self) -> u32 {
        self.cycles.fetch_add(1, Ordering::Relaxed)
    }

    fn setup_tick(&self, _ref_hz: u32) {}

    fn switch_context(&self, current: &mut ProcessRecord, next: &ProcessRecord, bypass_save: bool) {
        let _ = (current, next, bypass_save);
    }

    unsafe fn context_load(
        &self,
        stack: &mut StackBuffer,
        _entry: extern "C" fn(*mut u8),
        _args: *mut u8,
    ) -> Option<*mut u8> {
        Some(stack.top())
    }

    fn stack_pointer(&self, process: &ProcessRecord) -> *mut u8 {
        process.stack_pointer()
    }

    fn set_stack_pointer(&self, process: &mut ProcessRecord, sp: *mut u8) {
        unsafe { process.set_stack_pointer(sp) };
    }

    fn acquire(&self, n: usize) -> Option<StackBuffer> {
        if self.fail_next_acquire.swap(false, Ordering::SeqCst) {
            return None;
        }
        let mut buffer: Box<[u8]> = vec![0u8; n].into_boxed_slice();
        let ptr = buffer.as_mut_ptr();
        self.pool.lock().unwrap().push(buffer);
        Some(unsafe { StackBuffer::new(ptr, n) })
    }

    unsafe fn release(&self, buffer: StackBuffer) {
        let _ = buffer;
    }
}
