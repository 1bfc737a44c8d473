//! Platform hooks.
//!
//! The scheduler asks the platform for at most two services: the current
//! tick and, when the `idle` feature is enabled, a way to sleep through a
//! quiet period. Both default to the crate's global
//! [`TickCounter`](crate::time::TickCounter) so that everything works out
//! of the box; real targets install their own sources here.
//!
//! Hooks run between suspension points, on whatever stack the scheduler
//! happens to be on. They must not call back into the scheduler.

use spin::Mutex;

use crate::time::{Tick, GLOBAL_TICK_COUNTER};

/// Tick source: returns the current tick; may wrap.
pub type TickFn = fn() -> Tick;

/// Idle handler: sleep for up to the given number of ticks; returning
/// early is allowed.
#[cfg(feature = "idle")]
pub type IdleFn = fn(Tick);

struct Hooks {
    tick: Option<TickFn>,
    #[cfg(feature = "idle")]
    idle: Option<IdleFn>,
}

static HOOKS: Mutex<Hooks> = Mutex::new(Hooks {
    tick: None,
    #[cfg(feature = "idle")]
    idle: None,
});

/// Install the platform tick source.
pub fn set_tick_source(source: TickFn) {
    HOOKS.lock().tick = Some(source);
}

/// Install the platform idle handler.
///
/// Called by the scheduler when every runnable thread is in a timed sleep;
/// the handler may put the processor into a low-power state for up to the
/// given number of ticks.
#[cfg(feature = "idle")]
pub fn set_idle_handler(handler: IdleFn) {
    HOOKS.lock().idle = Some(handler);
}

/// Restore the default hooks (the built-in simulated clock).
pub fn reset_hooks() {
    let mut hooks = HOOKS.lock();
    hooks.tick = None;
    #[cfg(feature = "idle")]
    {
        hooks.idle = None;
    }
}

pub(crate) fn current_tick() -> Tick {
    let source = HOOKS.lock().tick;
    match source {
        Some(source) => source(),
        None => GLOBAL_TICK_COUNTER.ticks(),
    }
}

#[cfg(feature = "idle")]
pub(crate) fn platform_idle(period: Tick) {
    let handler = HOOKS.lock().idle;
    match handler {
        Some(handler) => handler(period),
        // No way to sleep for real: let the quiet period pass in
        // simulated time.
        None => GLOBAL_TICK_COUNTER.advance(period),
    }
}
