//! Weak, overridable callback points (§4.8).
//!
//! The original exposes these as `HOOK_OS_TICK`/`HOOK_OS_IDLE`/
//! `HOOK_OS_STACK_OVERFLOW` macros an application defines or leaves
//! empty. Rust has no weak-symbol default-empty-macro equivalent that
//! works in a library crate without a build-script dance, so instead
//! each hook is a `#[inline]` no-op the application overrides by
//! providing its own `hooks` module and re-exporting it in place of this
//! one — or, more commonly, by registering a handler through
//! [`set_tick_hook`] et al. at startup, which is what every test and
//! example in this crate does.

use core::sync::atomic::{AtomicPtr, Ordering};

type TickHook = fn();
type IdleHook = fn();
type StackOverflowHook = fn(task_name: &'static str);
type TraceHook = fn(message: &'static str);
type InterruptHook = fn();

static TICK_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static IDLE_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static STACK_OVERFLOW_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static TRACE_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static PRE_INTERRUPT_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static POST_INTERRUPT_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

pub fn set_tick_hook(hook: TickHook) {
    TICK_HOOK.store(hook as *mut (), Ordering::Release);
}

pub fn set_idle_hook(hook: IdleHook) {
    IDLE_HOOK.store(hook as *mut (), Ordering::Release);
}

pub fn set_stack_overflow_hook(hook: StackOverflowHook) {
    STACK_OVERFLOW_HOOK.store(hook as *mut (), Ordering::Release);
}

/// Registers a handler for `on-trace` (§6): informational events an
/// integrating application wants surfaced (e.g. a UART trace channel)
/// beyond what the `log` facade already emits.
pub fn set_trace_hook(hook: TraceHook) {
    TRACE_HOOK.store(hook as *mut (), Ordering::Release);
}

/// Registers the hook run just before the scheduler hands control to a
/// software interrupt's handler (§4.2, §6 "pre-/post-interrupt scheduler
/// hooks").
pub fn set_pre_interrupt_hook(hook: InterruptHook) {
    PRE_INTERRUPT_HOOK.store(hook as *mut (), Ordering::Release);
}

/// Registers the hook run immediately after a software interrupt's
/// handler returns control to the scheduler (§4.2, §6).
pub fn set_post_interrupt_hook(hook: InterruptHook) {
    POST_INTERRUPT_HOOK.store(hook as *mut (), Ordering::Release);
}

pub(crate) fn on_tick() {
    let ptr = TICK_HOOK.load(Ordering::Acquire);
    if !ptr.is_null() {
        // SAFETY: only ever stored by `set_tick_hook` with a real `fn()`.
        let f: TickHook = unsafe { core::mem::transmute(ptr) };
        f();
    }
}

pub(crate) fn on_idle() {
    let ptr = IDLE_HOOK.load(Ordering::Acquire);
    if !ptr.is_null() {
        let f: IdleHook = unsafe { core::mem::transmute(ptr) };
        f();
    }
}

pub(crate) fn on_trace(message: &'static str) {
    let ptr = TRACE_HOOK.load(Ordering::Acquire);
    if !ptr.is_null() {
        let f: TraceHook = unsafe { core::mem::transmute(ptr) };
        f(message);
    }
}

pub(crate) fn pre_interrupt() {
    let ptr = PRE_INTERRUPT_HOOK.load(Ordering::Acquire);
    if !ptr.is_null() {
        let f: InterruptHook = unsafe { core::mem::transmute(ptr) };
        f();
    }
}

pub(crate) fn post_interrupt() {
    let ptr = POST_INTERRUPT_HOOK.load(Ordering::Acquire);
    if !ptr.is_null() {
        let f: InterruptHook = unsafe { core::mem::transmute(ptr) };
        f();
    }
}

/// Called when the `debug` feature detects a task's stack pattern has
/// been overwritten down to its low-water mark (§4.3, §4.9). Never
/// returns: the kernel does not recover from a detected stack overflow,
/// it invokes whatever hook is registered (for last-gasp diagnostics) and
/// then traps regardless (§4.9, §7).
pub(crate) fn on_stack_overflow(task_name: &'static str) -> ! {
    let ptr = STACK_OVERFLOW_HOOK.load(Ordering::Acquire);
    if ptr.is_null() {
        log::error!("stack overflow detected in task {task_name}, no hook registered, halting");
    } else {
        // SAFETY: only ever stored by `set_stack_overflow_hook`.
        let f: StackOverflowHook = unsafe { core::mem::transmute(ptr) };
        f(task_name);
    }
    loop {
        core::hint::spin_loop();
    }
}
