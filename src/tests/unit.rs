//! Unit tests for the scheduling surface.

use core::ptr::null_mut;

use portable_atomic::{AtomicU32, Ordering};

use super::helpers;
use crate::config::{DEFAULT_STACK_SIZE, MAIN_STACK_SIZE, MAX_THREADS};
use crate::errors::ScheduleError;
use crate::thread::ThreadState;
use crate::{current_name, service, spawn, stats, yield_now};

fn nop_thread(_arg: *mut ()) {}

#[test]
fn test_spawn_rejects_oversize_stack() {
    let _guard = helpers::serialize();

    let result = spawn(nop_thread, None, MAIN_STACK_SIZE + 1, null_mut());
    assert_eq!(
        result,
        Err(ScheduleError::InvalidStackSize(MAIN_STACK_SIZE + 1))
    );
    assert_eq!(stats().busy, 0);
}

#[test]
fn test_spawn_rejects_full_pool() {
    let _guard = helpers::serialize();

    for _ in 0..MAX_THREADS {
        spawn(nop_thread, None, 0, null_mut()).unwrap();
    }
    assert_eq!(
        spawn(nop_thread, None, 0, null_mut()),
        Err(ScheduleError::TooManyThreads)
    );

    service();
    assert_eq!(stats().busy, 0);
}

#[test]
fn test_spawn_substitutes_default_stack_size() {
    let _guard = helpers::serialize();

    spawn(nop_thread, None, 0, null_mut()).unwrap();
    {
        let s = unsafe { crate::sched::sched() };
        assert_eq!(s.pool[0].state, ThreadState::New);
        assert_eq!(s.pool[0].stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(s.pool[0].depth, 0);
    }
    service();
}

#[test]
fn test_spawn_takes_first_empty_slot() {
    let _guard = helpers::serialize();

    spawn(nop_thread, Some("first"), 0, null_mut()).unwrap();
    spawn(nop_thread, Some("second"), 0, null_mut()).unwrap();
    {
        let s = unsafe { crate::sched::sched() };
        assert_eq!(s.pool[0].name, Some("first"));
        assert_eq!(s.pool[1].name, Some("second"));
    }
    service();
}

#[test]
fn test_service_with_empty_pool_returns() {
    let _guard = helpers::serialize();

    service();
    assert_eq!(stats().busy, 0);
    assert_eq!(stats().depth, 0);
}

#[test]
fn test_current_name_outside_thread() {
    let _guard = helpers::serialize();

    assert_eq!(current_name(), None);
}

#[test]
fn test_yield_outside_thread_is_diagnosed_not_fatal() {
    let _guard = helpers::serialize();

    // Nothing to switch to; must return instead of corrupting state.
    yield_now();
    assert_eq!(stats().busy, 0);
}

#[cfg(feature = "wait")]
#[test]
fn test_notify_without_waiter_is_discarded() {
    let _guard = helpers::serialize();

    crate::notify(42);
    crate::notify_all(42);
    assert_eq!(stats().busy, 0);

    // A later waiter must not see the stale notification.
    static WOKE_BY_NOTIFY: AtomicU32 = AtomicU32::new(u32::MAX);
    fn waiter(_arg: *mut ()) {
        let notified = crate::wait(42, 5);
        WOKE_BY_NOTIFY.store(notified as u32, Ordering::SeqCst);
    }

    static TICKS: AtomicU32 = AtomicU32::new(0);
    fn ticking() -> crate::Tick {
        TICKS.fetch_add(1, Ordering::SeqCst)
    }
    crate::platform::set_tick_source(ticking);

    spawn(waiter, None, 0, null_mut()).unwrap();
    service();
    assert_eq!(WOKE_BY_NOTIFY.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stats_snapshot_while_running() {
    let _guard = helpers::serialize();

    static SEEN_BUSY: AtomicU32 = AtomicU32::new(0);
    static SEEN_DEPTH: AtomicU32 = AtomicU32::new(0);
    fn observer(_arg: *mut ()) {
        SEEN_BUSY.store(stats().busy as u32, Ordering::SeqCst);
        SEEN_DEPTH.store(stats().depth as u32, Ordering::SeqCst);
    }

    spawn(observer, None, 0, null_mut()).unwrap();
    spawn(nop_thread, None, 0, null_mut()).unwrap();
    service();

    assert_eq!(SEEN_BUSY.load(Ordering::SeqCst), 2);
    assert_eq!(SEEN_DEPTH.load(Ordering::SeqCst), 1);
    assert_eq!(stats(), crate::SchedStats::default());
}
