//! Shared utilities for scheduler tests.

use std::sync::{Mutex, MutexGuard};
use std::vec::Vec;

static SCHED_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Serialize access to the process-wide scheduler.
///
/// The scheduler, the main-stack arena and the platform hooks are all
/// singletons, so tests touching them cannot run concurrently. Taking the
/// guard also restores every singleton to its pristine state, so each
/// test starts from a blank slate no matter what an earlier (possibly
/// failed) test left behind.
pub(crate) fn serialize() -> MutexGuard<'static, ()> {
    let guard = SCHED_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    unsafe { crate::sched::sched() }.reset();
    #[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
    {
        crate::platform::reset_hooks();
        crate::time::GLOBAL_TICK_COUNTER.set(0);
    }

    guard
}

/// Ordered record of what the worker threads did.
///
/// Threads push labeled values as they run; the host asserts on the drained
/// sequence once `service()` has returned.
pub(crate) struct EventLog {
    events: Mutex<Vec<(&'static str, u32)>>,
}

impl EventLog {
    pub(crate) const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, who: &'static str, value: u32) {
        self.events.lock().unwrap().push((who, value));
    }

    pub(crate) fn take(&self) -> Vec<(&'static str, u32)> {
        core::mem::take(&mut *self.events.lock().unwrap())
    }
}
