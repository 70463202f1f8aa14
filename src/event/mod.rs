//! Events: the generic wait/wake mechanism semaphores, mutexes, and
//! tick-delay are all built from (§4.5, §4.6, §4.7).
//!
//! Grounded on the original's `os_event.c`: an event is a descriptor
//! (`is_triggered`, called repeatedly by the scheduler loop) plus a queue
//! of waiting processes, FIFO- or LIFO-ordered at registration time. The
//! scheduler loop here takes the per-event critical section variant
//! (§9 DESIGN NOTES / REDESIGN FLAGS): each event is checked under its own
//! short critical section rather than the whole active-events pass
//! running under one, bounding worst-case interrupt latency to the cost
//! of checking a single event (§5).
//!
//! Wait-any (`sleep` registers a process against several events at once)
//! is resolved without a side table: the caller's event slice stays alive
//! on its own stack for the duration of the sleep, so once one event
//! fires the same call site can walk the slice again and remove the
//! process from whichever siblings it is still queued on (§9, "no
//! alternate-process workaround needed for GC").

mod scheduler;

pub use scheduler::Registry;

use crate::process::ProcessRecord;

/// What an event's `is_triggered` check reports for its head waiter,
/// mirroring `os_event.h`'s `OS_EVENT_NONE` / `OS_EVENT_OK_CONTINUE` /
/// `OS_EVENT_OK_STOP` tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The head waiter's condition has not fired; stop scanning this
    /// event's queue and move to the next event.
    None,
    /// The head waiter fired and should be woken; re-check the new head
    /// (another waiter may also already be satisfiable, e.g. a semaphore
    /// released with count 2 and two waiters).
    Continue,
    /// The head waiter fired and no further waiter in this queue could
    /// possibly be satisfiable this pass.
    Stop,
}

/// The order new waiters are inserted into an event's queue (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Fifo,
    Lifo,
    /// Ascending-priority order (lower `Priority` number = dequeued
    /// first), stable FIFO among equal priorities. Only meaningful with
    /// the `priority` feature enabled.
    #[cfg(feature = "priority")]
    Priority,
}

impl SortOrder {
    /// §4.5/§5's default: priority order when priorities are enabled,
    /// FIFO otherwise ("default order is priority-descending when
    /// priorities are enabled, FIFO otherwise").
    pub const fn default_for_priority() -> Self {
        #[cfg(feature = "priority")]
        {
            SortOrder::Priority
        }
        #[cfg(not(feature = "priority"))]
        {
            SortOrder::Fifo
        }
    }
}

/// Named equivalents of the original's `os_event_sort_fifo`/
/// `os_event_sort_lifo` helpers (SPEC_FULL B). This crate models an
/// event's sort order as a tag rather than a comparator function pointer,
/// so these are thin constructors rather than callbacks, but they fill the
/// same role: an explicit, named choice instead of leaving the default
/// implicit.
pub const fn sort_fifo() -> SortOrder {
    SortOrder::Fifo
}

pub const fn sort_lifo() -> SortOrder {
    SortOrder::Lifo
}

/// The condition an [`Event`] waits on. Implemented by semaphores,
/// mutexes, and any application-defined wait condition.
pub trait EventDescriptor {
    /// Called once when `proc` is registered as a new waiter, before it
    /// is linked into the queue — e.g. a mutex descriptor has nothing to
    /// do here, a semaphore likewise; kept for parity with the original's
    /// `os_event_start` hook and for descriptors that need to snapshot
    /// state at registration time.
    fn start(&self, proc: *mut ProcessRecord) {
        let _ = proc;
    }

    /// Check whether the head waiter's condition is satisfied.
    fn is_triggered(&self, proc: *mut ProcessRecord) -> Trigger;
}

/// A trait-object-safe handle to whatever owns the ready list, so the
/// event subsystem does not need to be generic over `Port` itself (§9:
/// "policy/mechanism separation", grounded on the teacher's
/// `KernelSchedCtx` trait).
pub trait SchedulerHandle {
    fn enable(&self, proc: *mut ProcessRecord);
    /// Unlink `proc` from the ready list without requesting a switch —
    /// callers that are about to park `proc` against an event or a
    /// tick-sleep deadline call this first, then drive the switch
    /// themselves once `proc`'s new status and queue membership are fully
    /// recorded (§4.5 "sleep... atomically: disables the process, sets its
    /// status to Pending"). Unlike [`SchedulerHandle::enable`]'s caller-
    /// facing counterpart (`Kernel::disable_process`), this never triggers
    /// a switch itself — it would be premature, the caller still has
    /// bookkeeping left to do under the same critical section.
    fn park(&self, proc: *mut ProcessRecord);
    fn current(&self) -> *mut ProcessRecord;
    fn critical_enter(&self);
    fn critical_leave(&self);
    /// Pick the next ready process and switch to it, saving the current
    /// process's register file unless `bypass_save`. Does not return
    /// until the calling process is itself rescheduled.
    fn cooperative_switch(&self, bypass_save: bool);
}

impl<P: crate::port::Port> SchedulerHandle for crate::kernel::Kernel<P> {
    fn enable(&self, proc: *mut ProcessRecord) {
        self.enable_process(proc);
    }
    fn park(&self, proc: *mut ProcessRecord) {
        self.unlink_process(proc);
    }
    fn current(&self) -> *mut ProcessRecord {
        self.current_process()
    }
    fn critical_enter(&self) {
        self.port().critical_enter();
    }
    fn critical_leave(&self) {
        self.port().critical_leave();
    }
    fn cooperative_switch(&self, bypass_save: bool) {
        self.cooperative_switch(bypass_save);
    }
}

/// Object-safe face of an [`Event`] used by [`Registry`]'s active-events
/// list, which must hold events of heterogeneous descriptor types.
pub trait EventLike: Sync {
    /// Re-check the head waiter (and, on `Continue`, successive waiters)
    /// once. Returns `true` if any waiter was woken.
    fn scheduler_pass(&self, handle: &dyn SchedulerHandle) -> bool;

    fn has_waiters(&self) -> bool;

    /// Remove `proc` from this event's queue if present — the wait-any
    /// sibling garbage collection step (§9).
    fn remove_waiter(&self, proc: *mut ProcessRecord);

    /// Register a new waiter, in this event's configured sort order.
    fn register_waiter(&self, proc: *mut ProcessRecord);
}

/// A wait condition plus its queue of waiting processes.
///
/// `N` bounds the number of processes that may simultaneously wait on
/// this one event — a `no_std`, non-allocating crate has no unbounded
/// queue to reach for, so, like the teacher's use of `heapless`
/// throughout, capacity is part of the type.
pub struct Event<D: EventDescriptor, const N: usize> {
    descriptor: D,
    waiters: spin::Mutex<heapless::Vec<*mut ProcessRecord, N>>,
    sort: SortOrder,
}

// SAFETY: as with `ProcessRecord`, all access to the raw pointers stored
// here happens under the `SchedulerHandle`'s critical section.
unsafe impl<D: EventDescriptor + Sync, const N: usize> Sync for Event<D, N> {}

impl<D: EventDescriptor, const N: usize> Event<D, N> {
    pub const fn new(descriptor: D, sort: SortOrder) -> Self {
        Event {
            descriptor,
            waiters: spin::Mutex::new(heapless::Vec::new()),
            sort,
        }
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Pop the head waiter off this event's queue and report it, without
    /// consulting `is_triggered` — the direct-handoff path a release/unlock
    /// that already knows the resource is free takes instead of waiting for
    /// the next scheduler pass to notice (§4.6 "transferring the ticket
    /// without touching count"). Caller must hold the scheduler handle's
    /// critical section.
    pub fn take_head_waiter(&self) -> Option<*mut ProcessRecord> {
        let mut waiters = self.waiters.lock();
        if waiters.is_empty() {
            return None;
        }
        let head = waiters.remove(0);
        drop(waiters);
        // SAFETY: `head` is a live process record; writing `woken_by`
        // under the caller's critical section races nothing, same as
        // `scheduler_pass`.
        unsafe { (*head).woken_by = self as *const Self as *const () };
        Some(head)
    }
}

/// Wraps a plain `Fn() -> bool` as an [`EventDescriptor`] (§4.5: "Custom
/// events can be built from a plain boolean predicate via a helper that
/// wraps it in a descriptor whose `is_triggered` returns `OkContinue` iff
/// the predicate returns true").
pub struct Predicate<F: Fn() -> bool> {
    f: F,
}

impl<F: Fn() -> bool> Predicate<F> {
    pub const fn new(f: F) -> Self {
        Predicate { f }
    }
}

// SAFETY: `f` is never called concurrently — `is_triggered` always runs
// under the caller's critical section, same discipline as every other
// descriptor in this module.
unsafe impl<F: Fn() -> bool> Sync for Predicate<F> {}

impl<F: Fn() -> bool> EventDescriptor for Predicate<F> {
    fn is_triggered(&self, _proc: *mut ProcessRecord) -> Trigger {
        if (self.f)() {
            Trigger::Continue
        } else {
            Trigger::None
        }
    }
}

impl<F: Fn() -> bool, const N: usize> Event<Predicate<F>, N> {
    /// Build a custom wait condition from a plain boolean predicate,
    /// checked every scheduler pass (§4.5).
    pub const fn from_predicate(f: F, sort: SortOrder) -> Self {
        Event::new(Predicate::new(f), sort)
    }
}

impl<D: EventDescriptor, const N: usize> EventLike for Event<D, N> {
    fn register_waiter(&self, proc: *mut ProcessRecord) {
        self.descriptor.start(proc);
        let mut waiters = self.waiters.lock();
        match self.sort {
            SortOrder::Fifo => {
                let _ = waiters.push(proc);
            }
            SortOrder::Lifo => {
                let _ = waiters.insert(0, proc);
            }
            #[cfg(feature = "priority")]
            SortOrder::Priority => {
                // SAFETY: every queued pointer is a live process record
                // for as long as it stays queued (§3 invariants).
                let new_priority = unsafe { (*proc).priority() };
                let pos = waiters
                    .iter()
                    .position(|p| unsafe { (**p).priority() } > new_priority)
                    .unwrap_or(waiters.len());
                let _ = waiters.insert(pos, proc);
            }
        }
    }

    fn has_waiters(&self) -> bool {
        !self.waiters.lock().is_empty()
    }

    fn remove_waiter(&self, proc: *mut ProcessRecord) {
        let mut waiters = self.waiters.lock();
        if let Some(pos) = waiters.iter().position(|p| *p == proc) {
            waiters.remove(pos);
        }
    }

    fn scheduler_pass(&self, handle: &dyn SchedulerHandle) -> bool {
        let mut progressed = false;
        loop {
            handle.critical_enter();
            let head = {
                let waiters = self.waiters.lock();
                match waiters.first().copied() {
                    Some(p) => p,
                    None => {
                        handle.critical_leave();
                        break;
                    }
                }
            };
            let trigger = self.descriptor.is_triggered(head);
            match trigger {
                Trigger::None => {
                    handle.critical_leave();
                    break;
                }
                Trigger::Continue | Trigger::Stop => {
                    self.waiters.lock().remove(0);
                    // SAFETY: `head` is a live process record; writing
                    // `woken_by` under the critical section just taken
                    // races nothing (§4.5 "event-triggered feedback
                    // pointer").
                    unsafe { (*head).woken_by = self as *const Self as *const () };
                    handle.critical_leave();
                    handle.enable(head);
                    progressed = true;
                    if trigger == Trigger::Stop {
                        break;
                    }
                }
            }
        }
        progressed
    }
}

/// Sleep the currently running process until one of `events` wakes it,
/// then remove it from whatever siblings it is still queued on. Returns
/// the index into `events` of whichever one actually fired (§4.5:
/// "write the event-triggered feedback pointer so the waking process can
/// learn which event fired"), or `None` if woken by some other means
/// (never expected in normal operation, but not assumed away).
///
/// # Safety
/// Must be called by the process that is itself currently running, with
/// no locks held that the scheduler pass or another process's progress
/// depends on.
pub unsafe fn sleep(handle: &dyn SchedulerHandle, events: &[&dyn EventLike]) -> Option<usize> {
    let proc = handle.current();
    handle.critical_enter();
    for event in events {
        event.register_waiter(proc);
    }
    // Unlink from the ready list before marking Pending — otherwise the
    // scheduler would keep rotating a blocked process back into the
    // cursor (§3 invariants: "no Idle or Pending process appears in
    // [the ready list]").
    handle.park(proc);
    (*proc).status = crate::process::ProcessStatus::Pending;
    (*proc).woken_by = core::ptr::null();
    handle.critical_leave();

    // Cooperative switch away; resumes here once re-enabled by whichever
    // event's scheduler pass woke us.
    handle.cooperative_switch(false);

    let woken_by = (*proc).woken_by;
    let fired = events
        .iter()
        .position(|event| *event as *const dyn EventLike as *const () == woken_by);

    // Garbage-collect any sibling queue entries left on other events in
    // this wait-any set (§4.5, §9).
    for event in events {
        event.remove_waiter(proc);
    }
    fired
}
