//! Typed failures returned from the kernel's fallible entry points.
//!
//! Most kernel operations either succeed, fail with one of the variants
//! below, or silently no-op (redundant enable/disable, unlock by a
//! non-owner, release of a semaphore already at its max count) — those
//! no-ops are not represented here, they simply return `()`/`bool`.

use core::fmt;

/// Failure kinds the kernel itself can produce.
///
/// Structural invariant violations (stack overflow) are not part of this
/// enum: they invoke the stack-overflow hook and halt, they are never
/// returned to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A non-custom stack could not be obtained from the stack pool.
    AllocationFailure,
    /// The port could not build the initial register frame for a task.
    ContextLoadFailure,
    /// Propagated verbatim from the [`crate::port::Port`] implementation;
    /// the core does not attempt to interpret or translate it.
    PortFailure(&'static str),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::AllocationFailure => write!(f, "stack allocation failed"),
            KernelError::ContextLoadFailure => write!(f, "failed to build initial task frame"),
            KernelError::PortFailure(msg) => write!(f, "port failure: {msg}"),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
