//! Tasks: user code scheduled cooperatively/preemptively on its own stack
//! (§4.3).
//!
//! A `Task` owns its [`ProcessRecord`] and the stack memory backing it.
//! Mirroring the original's `os_task_create`, a task is created *disabled*
//! — it does not appear in the ready list, and does not run, until
//! [`Task::enable`] is called. This lets an application finish wiring up
//! whatever the task needs (semaphores, other tasks) before it can
//! possibly be scheduled.
//!
//! Because this crate has no allocator, a `Task` is meant to live for the
//! `'static` lifetime the application gives it (typically a `static`
//! binding protected the same way the `Kernel` itself is — see
//! `crate::kernel`), not to be constructed on a stack and dropped.

use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::port::{Port, StackBuffer};
use crate::process::{ProcessKind, ProcessRecord, ProcessStatus};

#[cfg(feature = "priority")]
use crate::process::Priority;

/// A user task: its scheduling header plus the stack memory it runs on.
///
/// `#[repr(C)]` with `record` as the first field is load-bearing: it is
/// what lets [`current`] cast a `*mut ProcessRecord` known to belong to a
/// task back into a `*mut Task` (§9, "Polymorphism over process kinds").
#[repr(C)]
pub struct Task {
    pub(crate) record: ProcessRecord,
    stack: Option<StackBuffer>,
    /// `true` if `stack` came from `Port::acquire` and must be handed back
    /// to `Port::release` on delete; `false` for an adopted custom stack,
    /// which the kernel never owns (§4.3 "use-custom-stack").
    owns_stack: bool,
}

impl Task {
    /// A task with no backing stack yet. Must be completed with
    /// [`Task::create`] or [`Task::create_with_stack`] before it is usable.
    pub const fn new() -> Self {
        Task {
            record: ProcessRecord::new(ProcessKind::Task),
            stack: None,
            owns_stack: false,
        }
    }

    /// Acquire `stack_bytes` from the port's stack pool and set up the
    /// task to begin executing `entry(args)` once enabled. The task is
    /// created disabled (§4.3).
    pub fn create<P: Port>(
        &mut self,
        kernel: &Kernel<P>,
        stack_bytes: usize,
        entry: extern "C" fn(*mut u8),
        args: *mut u8,
    ) -> KernelResult<()> {
        let buffer = kernel
            .port()
            .acquire(stack_bytes)
            .ok_or(KernelError::AllocationFailure)?;
        self.owns_stack = true;
        self.install(kernel, buffer, entry, args)
    }

    /// As [`Task::create`], but runs on caller-supplied memory instead of
    /// the port's stack pool. The kernel never calls `Port::release` on
    /// this memory — ownership stays with the caller (§4.3, "use-custom-
    /// stack").
    pub fn create_with_stack<P: Port>(
        &mut self,
        kernel: &Kernel<P>,
        stack: &mut [u8],
        entry: extern "C" fn(*mut u8),
        args: *mut u8,
    ) -> KernelResult<()> {
        let buffer = StackBuffer::from_slice(stack);
        self.install(kernel, buffer, entry, args)
    }

    fn install<P: Port>(
        &mut self,
        kernel: &Kernel<P>,
        mut buffer: StackBuffer,
        entry: extern "C" fn(*mut u8),
        args: *mut u8,
    ) -> KernelResult<()> {
        #[cfg(feature = "debug")]
        unsafe {
            for byte in buffer.as_mut_slice().iter_mut() {
                *byte = crate::config::DEBUG_STACK_PATTERN;
            }
        }
        // SAFETY: `buffer` is exclusively ours, not yet in use by any
        // running process.
        let sp = match unsafe { kernel.port().context_load(&mut buffer, entry, args) } {
            Some(sp) => sp,
            None => {
                self.stack = Some(buffer);
                return Err(KernelError::ContextLoadFailure);
            }
        };
        unsafe { self.record.set_stack_pointer(sp) };
        self.record.status = ProcessStatus::Idle;
        #[cfg(feature = "priority")]
        {
            self.record.priority = crate::config::TASK_DEFAULT_PRIORITY;
            self.record.priority_counter = crate::config::TASK_DEFAULT_PRIORITY.counter_reset();
        }
        self.stack = Some(buffer);
        Ok(())
    }

    /// Link the task into the ready list. Idempotent (§4.9).
    pub fn enable<P: Port>(&mut self, kernel: &Kernel<P>) {
        kernel.enable_process(&mut self.record);
    }

    /// Unlink the task from the ready list. Idempotent (§4.9). If this was
    /// the running task, the caller observes control return only after a
    /// switch has occurred — the disabled task never resumes past this
    /// call until re-enabled.
    pub fn disable<P: Port>(&mut self, kernel: &Kernel<P>) {
        kernel.disable_process(&mut self.record);
    }

    /// Disable the task, then release its stack back to the port's pool if
    /// the kernel owns it (§4.3). A no-op on the stack if `create_with_stack`
    /// was used — that memory stays the caller's (§4.3, "use-custom-stack").
    ///
    /// # Safety
    /// The task must not be referenced again afterwards (it has no stack
    /// left to resume onto) and must not be the currently running process.
    pub unsafe fn delete<P: Port>(&mut self, kernel: &Kernel<P>) {
        self.disable(kernel);
        if let Some(buffer) = self.stack.take() {
            if self.owns_stack {
                kernel.port().release(buffer);
            }
        }
        self.owns_stack = false;
    }

    #[cfg(feature = "priority")]
    pub fn set_priority(&mut self, priority: Priority) {
        self.record.set_priority(priority);
    }

    #[cfg(feature = "priority")]
    pub fn priority(&self) -> Priority {
        self.record.priority()
    }

    #[cfg(feature = "statistics")]
    pub fn cycles(&self) -> u32 {
        self.record.cycles()
    }

    pub fn status(&self) -> ProcessStatus {
        self.record.status
    }

    /// Scan from the low end of this task's stack for the first byte that
    /// no longer matches [`crate::config::DEBUG_STACK_PATTERN`], reporting
    /// how many untouched bytes remain below the high-water mark. Returns
    /// `None` if this task has no kernel-managed stack to inspect (a
    /// custom stack, or `create` was never called) or the `debug` feature
    /// is disabled.
    ///
    /// Invokes [`crate::hooks::on_stack_overflow`] if the pattern has been
    /// overwritten all the way to the last byte — the original's
    /// `HOOK_OS_STACK_OVERFLOW` condition.
    #[cfg(feature = "debug")]
    pub fn check_stack_margin(&self, name: &'static str) -> Option<usize> {
        let buffer = self.stack.as_ref()?;
        // SAFETY: a task never runs concurrently with its own margin
        // check (the check only makes sense called from another task or
        // the idle loop, both single-core and not racing a live write to
        // this exact region — an actively running task would defeat the
        // point of the check anyway).
        let bytes = unsafe { core::slice::from_raw_parts(buffer.as_ptr(), buffer.len()) };
        let margin = bytes
            .iter()
            .take_while(|b| **b == crate::config::DEBUG_STACK_PATTERN)
            .count();
        if margin == 0 {
            crate::hooks::on_stack_overflow(name);
        }
        Some(margin)
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::new()
    }
}

// No `Drop` impl: releasing a kernel-owned stack requires the same `Port`
// the task was created against, which a `Task` does not itself retain a
// reference to. Tasks are `'static` by convention (see module docs);
// reclaiming stack memory is `delete`'s job, called explicitly once a task
// is confirmed disabled and no longer referenced by any event queue.

/// The currently running task's wrap-safe tick delay (§4.3, §8).
///
/// # Safety
/// Must be called from the currently-running process's own context, never
/// on behalf of another process.
#[cfg(feature = "tick")]
pub unsafe fn delay<P: Port>(kernel: &'static Kernel<P>, ticks: crate::config::Tick) {
    kernel.delay_current(ticks);
}

/// Returns the currently scheduled process coerced to a `Task`, or `None`
/// if the application (idle loop / event scheduler) is presently running
/// (§4.3: "returns the current process coerced to Task, or none if the
/// application is running").
///
/// # Safety
/// The returned pointer is only valid as long as the underlying `Task`
/// stays alive and enabled; callers must not retain it past a point where
/// the task could have been deleted.
pub fn current<P: Port>(kernel: &Kernel<P>) -> Option<*mut Task> {
    let proc = kernel.current_process();
    // SAFETY: `proc` is always a live process record owned by the ready
    // list; reading its `kind` tag does not race anything outside a
    // critical section.
    unsafe {
        if (*proc).kind == ProcessKind::Task {
            // `Task` is `#[repr(C)]` with `record` as its first field, so a
            // `*mut ProcessRecord` known to belong to a `Task` can be cast
            // back to `*mut Task` (§9: "Polymorphism over process kinds").
            Some(proc as *mut Task)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;
    use crate::test_support::TestPort;

    extern "C" fn noop_entry(_: *mut u8) {}

    #[test]
    fn create_leaves_task_disabled_until_enable() {
        let kernel = Kernel::new(TestPort::new());
        let mut task = Task::new();
        task.create(&kernel, 256, noop_entry, core::ptr::null_mut())
            .unwrap();
        assert_eq!(task.status(), ProcessStatus::Idle);
    }

    #[test]
    fn create_surfaces_allocation_failure() {
        let kernel = Kernel::new(TestPort::new());
        kernel.port().fail_next_acquire();
        let mut task = Task::new();
        let err = task
            .create(&kernel, 256, noop_entry, core::ptr::null_mut())
            .unwrap_err();
        assert_eq!(err, KernelError::AllocationFailure);
    }

    #[cfg(feature = "priority")]
    #[test]
    fn create_assigns_the_configured_default_priority() {
        let kernel = Kernel::new(TestPort::new());
        let mut task = Task::new();
        task.create(&kernel, 256, noop_entry, core::ptr::null_mut())
            .unwrap();
        assert_eq!(task.priority(), crate::config::TASK_DEFAULT_PRIORITY);
        task.set_priority(crate::process::Priority::P5);
        assert_eq!(task.priority(), crate::process::Priority::P5);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn check_stack_margin_flags_full_overflow_and_leaves_fresh_stack_untouched() {
        let kernel = Kernel::new(TestPort::new());
        let mut task = Task::new();
        task.create(&kernel, 64, noop_entry, core::ptr::null_mut())
            .unwrap();
        // A freshly created stack is untouched: the whole buffer still
        // matches the debug pattern.
        assert_eq!(task.check_stack_margin("probe"), Some(64));
    }
}
