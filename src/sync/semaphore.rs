//! Counting semaphore (§4.6).
//!
//! Grounded on `os_semaphore.c`'s event descriptor: `is_triggered`
//! decrements the counter and reports [`Trigger::Stop`] when it reaches
//! zero, [`Trigger::Continue`] when stock remains (so a release that
//! frees up more than one slot can wake more than one waiter in the same
//! scheduler pass), and [`Trigger::None`] when empty. `take`/`release`
//! themselves are expressed here as a blocking wait on that descriptor
//! rather than the original's busy-yield loop — no task spins, it parks
//! via [`crate::event::sleep`] until woken.

use crate::event::{Event, EventDescriptor, SortOrder, Trigger};
use crate::kernel::Kernel;
use crate::port::{CriticalSection, Port};
use crate::process::ProcessRecord;

pub struct SemaphoreDescriptor {
    counter: spin::Mutex<u32>,
    max: u32,
}

impl EventDescriptor for SemaphoreDescriptor {
    fn is_triggered(&self, _proc: *mut ProcessRecord) -> Trigger {
        let mut counter = self.counter.lock();
        if *counter == 0 {
            return Trigger::None;
        }
        *counter -= 1;
        if *counter == 0 {
            Trigger::Stop
        } else {
            Trigger::Continue
        }
    }
}

/// `N` bounds how many tasks may simultaneously block on [`Semaphore::take`].
pub struct Semaphore<const N: usize = 4> {
    event: Event<SemaphoreDescriptor, N>,
}

impl<const N: usize> Semaphore<N> {
    pub const fn new(initial: u32, max: u32) -> Self {
        Semaphore {
            event: Event::new(
                SemaphoreDescriptor {
                    counter: spin::Mutex::new(initial),
                    max,
                },
                SortOrder::default_for_priority(),
            ),
        }
    }

    /// A semaphore with a single permit, available immediately — the
    /// common "signal" / binary-semaphore configuration (§4.6).
    pub const fn binary() -> Self {
        Self::new(1, 1)
    }

    /// Block until a permit is available, then take it.
    ///
    /// # Safety
    /// Must be called by the process that is itself currently running.
    pub unsafe fn take<P: Port>(&'static self, kernel: &'static Kernel<P>) {
        let proc = kernel.current_process();
        let trigger = {
            let _guard = CriticalSection::enter(kernel.port());
            self.event.descriptor().is_triggered(proc)
        };
        if !matches!(trigger, Trigger::None) {
            return;
        }
        // `sleep_on` only returns once this process has already been
        // granted a permit, either by a scheduler pass's `is_triggered`
        // call decrementing the counter for it or by `release`'s direct
        // handoff, so there is nothing left to re-check here.
        let _ = kernel.sleep_on(&[&self.event]);
    }

    /// Return a permit (§4.6): if a process is already queued, hand the
    /// ticket straight to the head waiter without touching `counter` at
    /// all; otherwise increment up to `max`, or drop the release silently
    /// if already at `max` with nobody waiting.
    pub fn release<P: Port>(&self, kernel: &Kernel<P>) {
        let _guard = CriticalSection::enter(kernel.port());
        if let Some(proc) = self.event.take_head_waiter() {
            kernel.enable_process(proc);
            return;
        }
        let mut counter = self.event.descriptor().counter.lock();
        if *counter < self.event.descriptor().max {
            *counter += 1;
        }
    }

    pub fn count(&self) -> u32 {
        *self.event.descriptor().counter.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLike;
    use crate::process::{ProcessKind, ProcessStatus};
    use crate::test_support::TestPort;

    #[test]
    fn release_stops_at_max() {
        let kernel = Kernel::new(TestPort::new());
        let sem: Semaphore<4> = Semaphore::new(1, 1);
        sem.release(&kernel);
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn release_with_a_waiter_queued_hands_off_the_ticket_without_touching_count() {
        let kernel = Kernel::new(TestPort::new());
        let sem: Semaphore<4> = Semaphore::new(0, 1);
        let mut waiter = ProcessRecord::new(ProcessKind::Task);
        let waiter_ptr: *mut ProcessRecord = &mut waiter;
        sem.event.register_waiter(waiter_ptr);

        sem.release(&kernel);

        assert_eq!(sem.count(), 0, "ticket transferred directly, counter untouched");
        assert_eq!(unsafe { (*waiter_ptr).status }, ProcessStatus::Active);
        assert!(!sem.event.has_waiters());
    }

    #[test]
    fn two_releases_with_two_waiters_and_max_one_wake_both() {
        // A binary semaphore (max=1) with two waiters queued and two
        // back-to-back releases (no scheduler pass in between) must wake
        // both waiters rather than silently dropping the second release.
        let kernel = Kernel::new(TestPort::new());
        let sem: Semaphore<4> = Semaphore::new(0, 1);
        let mut w1 = ProcessRecord::new(ProcessKind::Task);
        let mut w2 = ProcessRecord::new(ProcessKind::Task);
        let w1_ptr: *mut ProcessRecord = &mut w1;
        let w2_ptr: *mut ProcessRecord = &mut w2;
        sem.event.register_waiter(w1_ptr);
        sem.event.register_waiter(w2_ptr);

        sem.release(&kernel);
        sem.release(&kernel);

        assert_eq!(unsafe { (*w1_ptr).status }, ProcessStatus::Active);
        assert_eq!(unsafe { (*w2_ptr).status }, ProcessStatus::Active);
        assert_eq!(sem.count(), 0);
        assert!(!sem.event.has_waiters());
    }

    #[test]
    fn is_triggered_reports_stop_on_last_permit() {
        let sem: Semaphore<4> = Semaphore::new(1, 1);
        let proc = core::ptr::null_mut();
        assert_eq!(sem.event.descriptor().is_triggered(proc), Trigger::Stop);
        assert_eq!(sem.event.descriptor().is_triggered(proc), Trigger::None);
    }

    #[test]
    fn is_triggered_continues_while_stock_remains() {
        let sem: Semaphore<4> = Semaphore::new(2, 2);
        let proc = core::ptr::null_mut();
        assert_eq!(sem.event.descriptor().is_triggered(proc), Trigger::Continue);
        assert_eq!(sem.event.descriptor().is_triggered(proc), Trigger::Stop);
    }
}
