//! Compile-time configuration surface.
//!
//! The original eeOS/asf_os configures itself through a `conf_os.h` header
//! full of `#define`s; a `no_std` Rust crate has no equivalent of runtime
//! environment configuration, so the same knobs are expressed as Cargo
//! features (gating which modules get compiled in, see `Cargo.toml`) plus
//! the `pub const` tunables below (gating *values*, the way a vendored
//! `conf_os.h` would). An integrating application overrides these by
//! patching this module, the same way it would override a `conf_os.h`.

use crate::process::Priority;

/// The tick counter's width. Narrowed to `u16` by the `tick-16bit`
/// feature (the original's `CONFIG_OS_USE_16BIT_TICKS`) for targets where
/// a 32-bit counter costs more than its wider wraparound period is worth.
#[cfg(feature = "tick-16bit")]
pub type Tick = u16;
#[cfg(not(feature = "tick-16bit"))]
pub type Tick = u32;

#[cfg(feature = "tick-16bit")]
pub type TickAtomic = core::sync::atomic::AtomicU16;
#[cfg(not(feature = "tick-16bit"))]
pub type TickAtomic = core::sync::atomic::AtomicU32;

/// Tick frequency in Hz. Unused when the `tick` feature is disabled.
pub const TICK_HZ: u32 = 1000;

/// Default priority newly-created tasks are assigned.
pub const TASK_DEFAULT_PRIORITY: Priority = Priority::P1;

/// Default priority assigned to software interrupts.
pub const INTERRUPT_DEFAULT_PRIORITY: Priority = Priority::P1;

/// Byte pattern used to fill a new task's stack when the `debug` feature is
/// enabled, and checked on every tick to detect overflow.
pub const DEBUG_STACK_PATTERN: u8 = 0xAA;

// The cooperative-only / tick-counter combination that the original forbids
// at preprocessor time (`CONFIG_OS_SCHEDULER_TYPE == COOPERATIVE && \
// CONFIG_OS_USE_TICK_COUNTER == true` is a hard error there) has no direct
// analogue here: `tick` feature absent simply means `Task::delay` and the
// tick-driven context switch entry point are not compiled at all, so the
// combination cannot arise.
