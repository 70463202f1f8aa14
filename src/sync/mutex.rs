//! Mutual exclusion lock (§4.7).
//!
//! Grounded on `os_mutex.c`: `is_triggered` claims the lock for whichever
//! process is currently at the head of the wait queue and reports
//! [`Trigger::Stop`] (a mutex can only ever hand itself to one waiter per
//! release, unlike a semaphore with surplus stock). `unlock` is a no-op
//! unless the caller is the current owner — mirroring
//! `os_mutex_unlock`'s `os_process_get_current() == mutex->process`
//! guard. Priority inheritance is explicitly out of scope (§ Non-goals).

use crate::event::{Event, EventDescriptor, SortOrder, Trigger};
use crate::kernel::Kernel;
use crate::port::{CriticalSection, Port};
use crate::process::ProcessRecord;

pub struct MutexDescriptor {
    owner: spin::Mutex<Option<*mut ProcessRecord>>,
}

// SAFETY: `owner` is only read/written under the caller's critical
// section, the same discipline as every other raw process pointer here.
unsafe impl Sync for MutexDescriptor {}

impl EventDescriptor for MutexDescriptor {
    fn is_triggered(&self, proc: *mut ProcessRecord) -> Trigger {
        let mut owner = self.owner.lock();
        if owner.is_none() {
            *owner = Some(proc);
            Trigger::Stop
        } else {
            Trigger::None
        }
    }
}

/// `N` bounds how many tasks may simultaneously block on [`Mutex::lock`].
pub struct Mutex<const N: usize = 4> {
    event: Event<MutexDescriptor, N>,
}

impl<const N: usize> Mutex<N> {
    pub const fn new() -> Self {
        Mutex {
            event: Event::new(
                MutexDescriptor {
                    owner: spin::Mutex::new(None),
                },
                SortOrder::default_for_priority(),
            ),
        }
    }

    /// Block until the lock is free, then take it.
    ///
    /// # Safety
    /// Must be called by the process that is itself currently running.
    pub unsafe fn lock<P: Port>(&'static self, kernel: &'static Kernel<P>) {
        let proc = kernel.current_process();
        let trigger = {
            let _guard = CriticalSection::enter(kernel.port());
            self.event.descriptor().is_triggered(proc)
        };
        if !matches!(trigger, Trigger::None) {
            return;
        }
        // `sleep_on` only returns once a scheduler pass's `is_triggered`
        // call has already claimed ownership for this process as a side
        // effect of waking it, so there is nothing left to re-check here.
        let _ = kernel.sleep_on(&[&self.event]);
    }

    /// Release the lock. A no-op if `kernel.current_process()` is not the
    /// current owner (§4.7).
    pub fn unlock<P: Port>(&self, kernel: &Kernel<P>) {
        let current = kernel.current_process();
        let mut owner = self.event.descriptor().owner.lock();
        if *owner == Some(current) {
            *owner = None;
        } else {
            log::warn!("mutex unlock by non-owner ignored");
        }
    }

    pub fn is_locked(&self) -> bool {
        self.event.descriptor().owner.lock().is_some()
    }
}

impl<const N: usize> Default for Mutex<N> {
    fn default() -> Self {
        Self::new()
    }
}
