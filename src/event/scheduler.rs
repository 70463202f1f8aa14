//! The event scheduler loop: one pass over every active event (§4.5).
//!
//! Grounded on `os_event_scheduler`: walk the active-events list, and for
//! each one re-check its head waiter until it reports [`super::Trigger::None`]
//! or the queue empties, then move to the next event. Capacity-bounded
//! (`heapless`) rather than a true linked active-list as the original
//! uses, for the same no-allocator reason as [`super::Event`]'s queue.
//!
//! The tick-delay sleep list (`Task::delay`) is a separate mechanism
//! gated purely on the `tick` feature, independent of `events`; it lives
//! on [`crate::kernel::Kernel`] rather than here.

use super::{EventLike, SchedulerHandle};

/// Maximum number of distinct events that can simultaneously have at
/// least one waiter. Raise if an application registers more concurrently
/// active wait conditions than this.
pub const MAX_ACTIVE_EVENTS: usize = 16;

pub struct Registry {
    active: spin::Mutex<heapless::Vec<&'static dyn EventLike, MAX_ACTIVE_EVENTS>>,
}

impl Registry {
    pub const fn new() -> Self {
        Registry {
            active: spin::Mutex::new(heapless::Vec::new()),
        }
    }

    /// Register `event` as active so the scheduler loop starts visiting
    /// it. A no-op if already registered or if the active-events table is
    /// full (logged, since it means a wait will never be woken).
    pub fn register_active(&self, event: &'static dyn EventLike) {
        let mut active = self.active.lock();
        if active.iter().any(|e| core::ptr::eq(*e, event)) {
            return;
        }
        if active.push(event).is_err() {
            log::error!("event registry full, new wait condition cannot be scheduled");
        }
    }

    /// One pass over every active event, per-event critical sections
    /// (§9 REDESIGN FLAGS: not one critical section for the whole pass).
    /// Returns whether any waiter was woken. Events left with no waiters
    /// are dropped from the active list.
    pub fn run_scheduler(&self, handle: &dyn SchedulerHandle) -> bool {
        let mut progressed = false;
        let mut active = self.active.lock();
        let mut i = 0;
        while i < active.len() {
            let event = active[i];
            if event.scheduler_pass(handle) {
                progressed = true;
            }
            if event.has_waiters() {
                i += 1;
            } else {
                active.remove(i);
            }
        }
        progressed
    }
}
