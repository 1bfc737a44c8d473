#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Lightweight cooperative threading on a single shared stack.
//!
//! This library schedules threads cooperatively on targets where a full
//! preemptive RTOS is unwanted: microcontrollers, bare-metal boards and
//! small embedded runtimes. There is no preemption and no OS thread —
//! every "thread" is a routine that runs until it voluntarily suspends
//! through one of the yield-family calls, and all thread stacks are
//! carved out of one statically allocated main stack, so the core never
//! touches a heap.
//!
//! # Scheduling model
//!
//! A fixed pool of thread slots is served round-robin. A thread leaves
//! the processor only at a suspension point: [`yield_now`], [`idle`],
//! [`yield_after`], [`wait`] or the return from its entry routine. A
//! thread that terminates while a later-started thread still lives above
//! it on the main stack leaves its stack region behind as a *hole*; the
//! region is reclaimed, together with the whole contiguous run above it,
//! when the topmost thread terminates.
//!
//! # Features
//!
//! - `idle`: timed sleeps via [`idle`], plus collapsing of fully idle
//!   periods into a single platform sleep
//! - `wait`: blocking on semaphore keys via [`wait`] / [`notify`]
//! - `yield-after`: coarse time-sliced yielding via [`yield_after`]
//!
//! All three are enabled by default; disabling one removes its states and
//! bookkeeping entirely.
//!
//! # Quick start
//!
//! ```ignore
//! use cooperative_threads as coop;
//!
//! fn worker(_arg: *mut ()) {
//!     for round in 0..3 {
//!         // do a slice of work, then let the other threads run
//!         let _ = round;
//!         coop::yield_now();
//!     }
//! }
//!
//! coop::spawn(worker, Some("worker_1"), 0, core::ptr::null_mut()).unwrap();
//! coop::spawn(worker, Some("worker_2"), 0, core::ptr::null_mut()).unwrap();
//! coop::service(); // returns once both workers are done
//! ```
//!
//! # Architecture
//!
//! - explicit callee-saved context switching (x86_64, aarch64)
//! - a static main-stack arena carved into per-thread regions by depth
//! - a hole-tracking unwind engine reclaiming terminated stacks in order
//! - tick-based, wrap-safe timing fed by platform hooks

pub mod arch;
pub mod config;
pub mod errors;
mod mem;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
pub mod platform;
mod sched;
pub mod thread;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
pub mod time;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests;

pub use errors::{SchedResult, ScheduleError};
#[cfg(feature = "idle")]
pub use sched::idle;
#[cfg(feature = "wait")]
pub use sched::{notify, notify_all, wait};
#[cfg(feature = "yield-after")]
pub use sched::yield_after;
pub use sched::{current_name, service, spawn, stats, yield_now, SchedStats};
#[cfg(feature = "wait")]
pub use thread::SemId;
pub use thread::{ThreadProc, ThreadState};
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
pub use time::{is_tick_over, Tick, TickCounter, GLOBAL_TICK_COUNTER};

// Panic handler for bare-metal targets only; hosted builds link the one
// from std.
#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
