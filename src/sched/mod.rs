//! The ready list and the round-robin(-with-priority) scheduler (§4.1).
//!
//! Encoded as a circular singly-linked list addressed through one field,
//! the cursor, exactly as the original C's `os_current_task` pointer. The
//! application record permanently anchors the list (§3: "the ready list...
//! at minimum contains the application record" — see `DESIGN.md` for why
//! this crate resolves the "application marked Idle" wording as "its
//! persona flips between idle-loop and event-scheduler", never as the
//! record being spliced out of the list).
//!
//! Every function here assumes the caller already holds the port's
//! critical section (§4.1: "All enable/disable mutations must happen
//! inside the critical section provided by the port") — this module has
//! no `Port` of its own, it is pure list surgery.

use core::ptr;

use crate::process::{ProcessRecord, ProcessStatus};

#[cfg(feature = "statistics")]
pub mod stats;

/// The circular ready list plus its cursor.
pub struct ReadyList {
    cursor: *mut ProcessRecord,
    /// The permanent anchor. Never unlinked; see module docs.
    app: *mut ProcessRecord,
}

impl ReadyList {
    /// # Safety
    /// `app` must point at a live, stable-address [`ProcessRecord`] whose
    /// `next` has already been initialized to point at itself.
    pub unsafe fn new(app: *mut ProcessRecord) -> Self {
        ReadyList { cursor: app, app }
    }

    pub fn current(&self) -> *mut ProcessRecord {
        self.cursor
    }

    pub fn application(&self) -> *mut ProcessRecord {
        self.app
    }

    /// Advance the cursor one link. With the `priority` feature enabled,
    /// repeats until a candidate's priority counter has reached zero,
    /// resetting it and decrementing every counter it skips past — this
    /// is what gives each active process a CPU share of roughly
    /// `(1/priority) / sum(1/priority)` (§4.1, tested in §8).
    ///
    /// # Safety
    /// Must be called with the critical section held; the list must
    /// satisfy the module invariants.
    pub unsafe fn step(&mut self) -> *mut ProcessRecord {
        loop {
            self.cursor = (*self.cursor).next;
            #[cfg(feature = "priority")]
            {
                let record = &mut *self.cursor;
                if record.priority_counter == 0 {
                    record.priority_counter = record.priority.counter_reset();
                    return self.cursor;
                }
                record.priority_counter -= 1;
                continue;
            }
            #[cfg(not(feature = "priority"))]
            {
                return self.cursor;
            }
        }
    }

    /// Insert `proc` into the ready list, immediately before the cursor's
    /// current successor. Idempotent: enabling an already-Active process
    /// is a no-op (§4.9, §8 round-trip property).
    ///
    /// # Safety
    /// `proc` must point at a live `ProcessRecord` that outlives its
    /// membership in this list (i.e. until a matching `disable`).
    pub unsafe fn enable(&mut self, proc: *mut ProcessRecord) {
        if (*proc).status == ProcessStatus::Active {
            log::debug!("enable: process already active, no-op");
            return;
        }
        let successor = (*self.cursor).next;
        (*proc).next = successor;
        (*self.cursor).next = proc;
        (*proc).status = ProcessStatus::Active;
    }

    /// Remove `proc` from the ready list. Idempotent: disabling an
    /// already-Idle/Pending process is a no-op. Returns `true` if `proc`
    /// was the process the cursor currently points at — the caller must
    /// then request an immediate context switch so control does not
    /// resume inside a no-longer-scheduled process (§4.1).
    ///
    /// # Safety
    /// `proc` must currently be a member of this list if `Active`.
    pub unsafe fn disable(&mut self, proc: *mut ProcessRecord) -> bool {
        if (*proc).status != ProcessStatus::Active {
            log::debug!("disable: process already inactive, no-op");
            return false;
        }
        if proc == self.app {
            // The application anchor is never unlinked; "disabling" it
            // just means it stops being eligible to run its task-like
            // persona, which callers model via `kernel::AppMode` instead.
            return false;
        }
        let mut pred = proc;
        loop {
            pred = (*pred).next;
            if (*pred).next == proc {
                break;
            }
        }
        let successor = (*proc).next;
        (*pred).next = successor;
        let was_current = self.cursor == proc;
        if was_current {
            self.cursor = successor;
        }
        (*proc).status = ProcessStatus::Idle;
        (*proc).next = ptr::null_mut();
        was_current
    }

    /// Returns `true` if `proc` is the application and no other process is
    /// presently linked into the list (used by the idle loop to decide
    /// whether anything but the application could ever be scheduled).
    pub fn is_singleton(&self) -> bool {
        unsafe { (*self.app).next == self.app }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessKind;

    unsafe fn link_singleton(app: *mut ProcessRecord) {
        (*app).next = app;
        (*app).status = ProcessStatus::Active;
    }

    #[test]
    fn enable_disable_round_trip_preserves_membership() {
        unsafe {
            let mut app = ProcessRecord::new(ProcessKind::Application);
            link_singleton(&mut app);
            let mut list = ReadyList::new(&mut app);

            let mut t1 = ProcessRecord::new(ProcessKind::Task);
            let ptr1: *mut ProcessRecord = &mut t1;

            list.enable(ptr1);
            assert_eq!((*ptr1).status, ProcessStatus::Active);
            assert!(!list.is_singleton());

            list.disable(ptr1);
            assert_eq!((*ptr1).status, ProcessStatus::Idle);
            assert!(list.is_singleton());

            // enable;enable == enable
            list.enable(ptr1);
            list.enable(ptr1);
            assert!(!list.is_singleton());
            // disable;disable == disable
            list.disable(ptr1);
            list.disable(ptr1);
            assert!(list.is_singleton());
        }
    }

    #[test]
    fn step_rotates_through_all_active_members() {
        unsafe {
            let mut app = ProcessRecord::new(ProcessKind::Application);
            link_singleton(&mut app);
            let mut list = ReadyList::new(&mut app);

            let mut t1 = ProcessRecord::new(ProcessKind::Task);
            let mut t2 = ProcessRecord::new(ProcessKind::Task);
            let p1: *mut ProcessRecord = &mut t1;
            let p2: *mut ProcessRecord = &mut t2;
            list.enable(p1);
            list.enable(p2);

            let mut seen = alloc_free_set();
            for _ in 0..6 {
                let cur = list.step();
                seen.push(cur);
            }
            assert!(seen.contains(&(&mut app as *mut ProcessRecord)));
            assert!(seen.contains(&p1));
            assert!(seen.contains(&p2));
        }
    }

    fn alloc_free_set() -> std::vec::Vec<*mut ProcessRecord> {
        std::vec::Vec::new()
    }
}
