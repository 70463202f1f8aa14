//! The kernel singleton: ties the ready list, the event subsystem, and the
//! tick counter to one concrete [`Port`] (§3, §4.1, §4.8).
//!
//! The teacher crate keeps exactly one scheduler alive behind
//! `lazy_static! { static ref SCHEDULER: Mutex<Option<Scheduler>> }`, a
//! global the library itself declares. A generic `Kernel<P: Port>` cannot
//! do the same — `static` items cannot be generic — so instead this type
//! is a plain, `const`-constructible struct that the *integrating
//! application* places into its own `static`:
//!
//! ```ignore
//! static KERNEL: Kernel<MyPort> = Kernel::new(MyPort::new());
//! ```
//!
//! Everything inside follows the teacher's shape regardless: a
//! `spin::Mutex<Option<_>>` guarding state that cannot be built in a
//! `const fn` (the ready list needs the application record's final,
//! stable address, which only exists once `KERNEL` above has been placed
//! at its static address) and a one-shot `start` that performs the
//! deferred initialization, exactly the role the teacher's own `init()`
//! plays for `SCHEDULER`.

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;

#[cfg(feature = "events")]
use crate::event::Registry as EventRegistry;
use crate::port::Port;
use crate::process::{ProcessKind, ProcessRecord, ProcessStatus};
use crate::sched::ReadyList;

/// Maximum number of processes that may simultaneously be tick-sleeping
/// (`Task::delay`/`delay_current`). Independent of the `events` feature —
/// tick-delay is its own mechanism, not built on [`crate::event::Event`].
#[cfg(feature = "tick")]
pub const MAX_TICK_SLEEPERS: usize = 16;

/// The application record's persona while it is the one running (§4.1,
/// §9 DESIGN NOTES): an idle loop when nothing else is pending, the event
/// scheduler when the `events` feature is enabled and there is a pending
/// event to re-check. Kept separate from [`ProcessStatus`] because the
/// application record's `status` is always `Active` — see module docs on
/// why it is never unlinked from the ready list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Idle,
    #[cfg(feature = "events")]
    EventScheduler,
}

pub struct Kernel<P: Port> {
    port: P,
    app: UnsafeCell<ProcessRecord>,
    ready: spin::Mutex<Option<ReadyList>>,
    mode: spin::Mutex<AppMode>,
    #[cfg(feature = "tick")]
    tick: crate::config::TickAtomic,
    #[cfg(feature = "tick")]
    tick_sleepers: spin::Mutex<heapless::Vec<*mut ProcessRecord, MAX_TICK_SLEEPERS>>,
    #[cfg(feature = "events")]
    events: EventRegistry,
}

// SAFETY: `app` is only ever mutated with the port's critical section
// held (enforced by every method that touches it), and `ReadyList`'s raw
// pointers are subject to the same discipline (§5).
unsafe impl<P: Port> Sync for Kernel<P> {}

impl<P: Port> Kernel<P> {
    pub const fn new(port: P) -> Self {
        Kernel {
            port,
            app: UnsafeCell::new(ProcessRecord::new(ProcessKind::Application)),
            ready: spin::Mutex::new(None),
            mode: spin::Mutex::new(AppMode::Idle),
            #[cfg(feature = "tick")]
            tick: crate::config::TickAtomic::new(0),
            #[cfg(feature = "tick")]
            tick_sleepers: spin::Mutex::new(heapless::Vec::new()),
            #[cfg(feature = "events")]
            events: EventRegistry::new(),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// One-shot deferred initialization plus the idle loop. Never
    /// returns. `ref_hz` is passed straight to [`Port::setup_tick`].
    ///
    /// # Panics
    /// Panics if called more than once on the same `Kernel` (the ready
    /// list is already initialized).
    pub fn start(&'static self, #[cfg_attr(not(feature = "tick"), allow(unused))] ref_hz: u32) -> ! {
        let app_ptr = self.app.get();
        // SAFETY: nothing else can be touching `app` before the ready
        // list exists, single-threaded bring-up.
        unsafe {
            (*app_ptr).next = app_ptr;
            (*app_ptr).status = ProcessStatus::Active;
        }
        {
            let mut guard = self.ready.lock();
            assert!(guard.is_none(), "Kernel::start called twice");
            *guard = Some(unsafe { ReadyList::new(app_ptr) });
        }

        #[cfg(feature = "tick")]
        self.port.setup_tick(ref_hz);

        log::info!("kernel started, features={:?}", crate::features::KernelFeatures::current());

        loop {
            self.idle_step();
        }
    }

    fn idle_step(&self) {
        #[cfg(feature = "events")]
        {
            *self.mode.lock() = AppMode::EventScheduler;
            let made_progress = self.events.run_scheduler(self);
            *self.mode.lock() = AppMode::Idle;
            if made_progress {
                return;
            }
        }
        #[cfg(feature = "tick")]
        if self.wake_due_tick_sleepers(self.ticks()) {
            return;
        }
        crate::hooks::on_idle();
    }

    #[cfg(feature = "events")]
    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn mode(&self) -> AppMode {
        *self.mode.lock()
    }

    /// The process record presently at the ready-list cursor.
    pub fn current_process(&self) -> *mut ProcessRecord {
        let guard = self.ready.lock();
        guard
            .as_ref()
            .expect("Kernel::start must run before scheduling")
            .current()
    }

    pub fn application(&self) -> *mut ProcessRecord {
        self.app.get()
    }

    /// Link a process into the ready list and, if nothing is currently
    /// running that outranks it, request an immediate reschedule.
    ///
    /// # Safety
    /// `proc` must point at a live `ProcessRecord` owned by the caller
    /// for at least as long as it stays enabled.
    pub fn enable_process(&self, proc: *mut ProcessRecord) {
        let _guard = crate::port::CriticalSection::enter(&self.port);
        let mut ready = self.ready.lock();
        let list = ready
            .as_mut()
            .expect("Kernel::start must run before scheduling");
        unsafe { list.enable(proc) };
    }

    /// Unlink a process from the ready list. If it was the running
    /// process, triggers a cooperative switch before returning — callers
    /// must not assume control returns immediately to their own call
    /// site's process after this call if they disabled themselves.
    pub fn disable_process(&self, proc: *mut ProcessRecord) {
        let was_current = self.unlink_process(proc);
        if was_current {
            self.cooperative_switch(false);
        }
    }

    /// Unlink a process from the ready list without requesting a switch —
    /// the primitive [`Kernel::disable_process`] and
    /// [`crate::event::SchedulerHandle::park`] both build on. Returns
    /// whether `proc` was the running process.
    pub(crate) fn unlink_process(&self, proc: *mut ProcessRecord) -> bool {
        let _guard = crate::port::CriticalSection::enter(&self.port);
        let mut ready = self.ready.lock();
        let list = ready
            .as_mut()
            .expect("Kernel::start must run before scheduling");
        unsafe { list.disable(proc) }
    }

    /// Pick the next ready process (rotating the ready list, applying the
    /// `priority` feature's share scheme) and switch to it. Does not
    /// return until the calling process is itself rescheduled.
    pub fn cooperative_switch(&self, bypass_save: bool) {
        let current = self.current_process();
        let next = {
            let _guard = crate::port::CriticalSection::enter(&self.port);
            let mut ready = self.ready.lock();
            let list = ready
                .as_mut()
                .expect("Kernel::start must run before scheduling");
            unsafe {
                crate::context::enter(
                    &self.port,
                    list,
                    crate::context::SwitchReason::Yield,
                )
            }
        };
        // SAFETY: both point at live records; `current` is the process
        // whose context the port is about to save, `next` the one it
        // restores into. Neither pointer is null — the ready list always
        // contains at least the application record.
        unsafe { self.port.switch_context(&mut *current, &*next, bypass_save) };
    }

    /// Register `events` as active (so the event scheduler starts visiting
    /// them) and block the running process until one of them fires,
    /// returning the index of whichever one did (§4.5: "enables the
    /// event-scheduler", then "sleep(process, [event1, event2, ...])").
    /// The single entry point custom wait conditions use; [`crate::sync::Semaphore`]
    /// and [`crate::sync::Mutex`] build `take`/`lock` on the same pair of
    /// calls.
    ///
    /// # Safety
    /// Must be called by the process that is itself currently running.
    #[cfg(feature = "events")]
    pub unsafe fn sleep_on(
        &'static self,
        events: &[&'static dyn crate::event::EventLike],
    ) -> Option<usize> {
        for event in events {
            self.events.register_active(*event);
        }
        crate::event::sleep(self, events)
    }

    #[cfg(feature = "tick")]
    pub fn ticks(&self) -> crate::config::Tick {
        self.tick.load(Ordering::Relaxed)
    }

    /// Called from the tick ISR. Wrapping add, matching §4.3's required
    /// wrap-safe `delay` semantics.
    #[cfg(feature = "tick")]
    pub fn on_tick(&'static self) {
        self.tick.fetch_add(1, Ordering::Relaxed);
        crate::hooks::on_tick();
        #[cfg(feature = "events")]
        self.events.run_scheduler(self);
        self.wake_due_tick_sleepers(self.ticks());
        self.cooperative_switch(false);
    }

    /// Put the running task to sleep for `ticks` timer ticks (§4.3, §8:
    /// wrap-safe, `delay(0)` yields exactly once).
    ///
    /// # Safety
    /// Must be called by the process that is itself currently running.
    #[cfg(feature = "tick")]
    pub unsafe fn delay_current(&'static self, ticks: crate::config::Tick) {
        let proc = self.current_process();
        let wake_at = self.ticks().wrapping_add(ticks);
        self.park_until_tick(proc, wake_at);
    }

    /// One pass over the tick-sleep list: re-enable every process whose
    /// `wake_at` has been reached or passed. Returns whether any process
    /// was woken. Wraparound-safe (§4.3, §8).
    #[cfg(feature = "tick")]
    fn wake_due_tick_sleepers(&self, now: crate::config::Tick) -> bool {
        let mut progressed = false;
        let mut sleepers = self.tick_sleepers.lock();
        let mut i = 0;
        while i < sleepers.len() {
            let proc = sleepers[i];
            // Wrapping comparison: true once `now` has reached or passed
            // `wake_at`, even across a tick-counter wraparound.
            let wake_at = unsafe { (*proc).wake_at };
            if now.wrapping_sub(wake_at) < (crate::config::Tick::MAX / 2) {
                sleepers.remove(i);
                self.enable_process(proc);
                progressed = true;
            } else {
                i += 1;
            }
        }
        progressed
    }

    /// Park the running process in the tick-sleep list until `wake_at`
    /// (absolute tick count, wraparound-safe), then switch away.
    ///
    /// # Safety
    /// Must be called by the process that is itself currently running.
    #[cfg(feature = "tick")]
    unsafe fn park_until_tick(&'static self, proc: *mut ProcessRecord, wake_at: crate::config::Tick) {
        let _guard = crate::port::CriticalSection::enter(&self.port);
        // Unlink before marking Pending, same reasoning as `event::sleep`:
        // a parked process must not remain in the ready-list rotation.
        self.unlink_process(proc);
        (*proc).wake_at = wake_at;
        (*proc).status = ProcessStatus::Pending;
        let _ = self.tick_sleepers.lock().push(proc);
        drop(_guard);
        self.cooperative_switch(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessKind;
    use crate::test_support::TestPort;
    use std::boxed::Box;

    /// Initializes the ready list the same way `start` would, without
    /// entering its infinite idle loop — `start` is not callable from a
    /// host test since it never returns.
    fn init_ready<P: Port>(kernel: &Kernel<P>) {
        let app_ptr = kernel.app.get();
        unsafe {
            (*app_ptr).next = app_ptr;
            (*app_ptr).status = ProcessStatus::Active;
        }
        *kernel.ready.lock() = Some(unsafe { ReadyList::new(app_ptr) });
    }

    #[test]
    fn enable_disable_process_round_trip_preserves_membership() {
        let kernel = Kernel::new(TestPort::new());
        init_ready(&kernel);

        let mut t = ProcessRecord::new(ProcessKind::Task);
        let ptr: *mut ProcessRecord = &mut t;

        kernel.enable_process(ptr);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Active);

        // enable;enable == enable (§8 idempotence)
        kernel.enable_process(ptr);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Active);

        kernel.disable_process(ptr);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Idle);

        // disable;disable == disable
        kernel.disable_process(ptr);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Idle);
    }

    #[cfg(feature = "tick")]
    #[test]
    fn on_tick_advances_the_counter_with_wrapping_semantics() {
        let kernel: &'static Kernel<TestPort> = Box::leak(Box::new(Kernel::new(TestPort::new())));
        init_ready(kernel);
        kernel.tick.store(crate::config::Tick::MAX, Ordering::Relaxed);
        kernel.on_tick();
        assert_eq!(kernel.ticks(), 0);
    }

    #[cfg(feature = "tick")]
    #[test]
    fn delay_parks_then_tick_sleeper_pass_wakes_it_at_wake_at() {
        let kernel: &'static Kernel<TestPort> = Box::leak(Box::new(Kernel::new(TestPort::new())));
        init_ready(kernel);

        let mut t = ProcessRecord::new(ProcessKind::Task);
        let ptr: *mut ProcessRecord = &mut t;
        kernel.enable_process(ptr);
        // Rotate the cursor onto the task so `current_process` (and thus
        // `delay_current`) acts on it rather than the application record.
        {
            let mut guard = kernel.ready.lock();
            let list = guard.as_mut().unwrap();
            unsafe {
                while list.current() != ptr {
                    list.step();
                }
            }
        }
        assert_eq!(kernel.current_process(), ptr);

        unsafe { kernel.delay_current(5) };
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Pending);

        // Not due yet: a tick-sleeper pass before `wake_at` leaves it parked.
        let made_progress = kernel.wake_due_tick_sleepers(1);
        assert!(!made_progress);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Pending);

        // Due: the tick-sleeper pass re-enables it.
        let made_progress = kernel.wake_due_tick_sleepers(5);
        assert!(made_progress);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Active);
    }

    #[cfg(feature = "tick")]
    #[test]
    fn delay_of_zero_ticks_is_immediately_due() {
        let kernel: &'static Kernel<TestPort> = Box::leak(Box::new(Kernel::new(TestPort::new())));
        init_ready(kernel);

        let mut t = ProcessRecord::new(ProcessKind::Task);
        let ptr: *mut ProcessRecord = &mut t;
        kernel.enable_process(ptr);
        {
            let mut guard = kernel.ready.lock();
            let list = guard.as_mut().unwrap();
            unsafe {
                while list.current() != ptr {
                    list.step();
                }
            }
        }

        unsafe { kernel.delay_current(0) };
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Pending);
        let made_progress = kernel.wake_due_tick_sleepers(kernel.ticks());
        assert!(made_progress);
        assert_eq!(unsafe { (*ptr).status }, ProcessStatus::Active);
    }

    /// Relocated from `event::scheduler`'s old tick-sleeper tests now that
    /// the wrap-safe comparison lives directly in `wake_due_tick_sleepers`.
    #[cfg(feature = "tick")]
    #[test]
    fn wrap_safe_compare_handles_rollover() {
        let now: crate::config::Tick = 5;
        let wake_at: crate::config::Tick = crate::config::Tick::MAX - 2;
        // `now` (5) is "after" `wake_at` once the counter wraps around;
        // delta = 5 - (MAX-2) = 8 (mod 2^32), which is < MAX/2.
        assert!(now.wrapping_sub(wake_at) < (crate::config::Tick::MAX / 2));
    }

    #[cfg(feature = "tick")]
    #[test]
    fn wrap_safe_compare_rejects_not_yet_due() {
        let now: crate::config::Tick = 100;
        let wake_at: crate::config::Tick = 200;
        assert!(now.wrapping_sub(wake_at) >= (crate::config::Tick::MAX / 2));
    }
}
