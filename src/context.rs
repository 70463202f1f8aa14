//! Context-switch entry points (§4.2).
//!
//! Two independent paths reach the same rotation logic:
//! - the tick ISR, which preempts whatever is running and must not save a
//!   register frame that was never pushed (it always was — a tick fires
//!   into *some* process's context);
//! - a cooperative switch requested by `Task::delay`, `Event::sleep`, an
//!   explicit yield, or a software interrupt's trampoline returning. The
//!   software-interrupt case is the one that needs `bypass_save`: the
//!   interrupt shares the application's stack and must never have its
//!   "frame" (there isn't one — it runs to completion on the borrowed
//!   stack) written back as if it were a task (§4.4, §9 "bypass-save").
//!
//! Both paths fence through [`Port::switch_context`], which calls back
//! into [`enter`] after the outgoing register file is on the stack (or,
//! with `bypass_save`, after deciding not to bother).

use crate::port::{CriticalSection, Port};
use crate::process::ProcessRecord;
use crate::sched::ReadyList;

/// Why a switch is happening, used only for trace logging and, with the
/// `statistics` feature, switch accounting — never changes control flow.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    Tick,
    Yield,
    EventWake,
    InterruptReturn,
}

/// Invoked by a port implementation from inside [`Port::switch_context`],
/// after the outgoing context has been saved (or, for a software
/// interrupt trampoline, deliberately has not been). Picks the next
/// process to run and returns it; the port is responsible for the actual
/// register restore.
///
/// # Safety
/// Must be called with the critical section held and `ready` must
/// describe a consistent list (§4.1 invariants).
pub unsafe fn enter<P: Port>(
    port: &P,
    ready: &mut ReadyList,
    reason: SwitchReason,
) -> *mut ProcessRecord {
    let _guard = CriticalSection::enter(port);
    let previous = ready.current();
    let next = ready.step();

    #[cfg(feature = "statistics")]
    crate::sched::stats::record_switch(port, previous, next);

    if log::log_enabled!(log::Level::Trace) {
        log::trace!("context switch ({reason:?}): {previous:p} -> {next:p}");
    }
    #[cfg(feature = "trace-logging")]
    crate::hooks::on_trace(reason.label());

    next
}

impl SwitchReason {
    pub const fn label(self) -> &'static str {
        match self {
            SwitchReason::Tick => "tick",
            SwitchReason::Yield => "yield",
            SwitchReason::EventWake => "event-wake",
            SwitchReason::InterruptReturn => "interrupt-return",
        }
    }
}

impl core::fmt::Debug for SwitchReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
