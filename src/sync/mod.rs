//! Synchronization primitives, both layered on the generic event/wait
//! mechanism in [`crate::event`] (§4.6, §4.7).

pub mod mutex;
pub mod semaphore;

pub use mutex::Mutex;
pub use semaphore::Semaphore;
