//! The cooperative scheduler.
//!
//! One process-wide scheduler drives a fixed pool of thread control
//! blocks round-robin. Threads run until they voluntarily suspend through
//! a yield-family primitive or return from their entry routine; the
//! dispatcher then resumes the next eligible slot. Thread stacks are
//! carved out of the shared main stack at increasing depth, and a thread
//! that terminates while a later-started thread is still live above it
//! leaves a hole: its stack region stays reserved until the topmost
//! terminating thread lets the unwind path reclaim the whole contiguous
//! run at once.
//!
//! Everything here executes on a single cooperative execution context, so
//! the state needs no locking; references into the singleton are always
//! dropped before a context switch.

use core::cell::UnsafeCell;

use log::{debug, error, trace};

use crate::arch::{self, Context};
use crate::config::{DEFAULT_STACK_SIZE, MAIN_STACK_SIZE, MAX_THREADS};
use crate::errors::{SchedResult, ScheduleError};
use crate::mem::{MainStack, StackRegion};
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::platform;
#[cfg(feature = "wait")]
use crate::thread::SemId;
use crate::thread::{Tcb, ThreadProc, ThreadState};
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::time::is_tick_over;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::time::Tick;

/// Slot index sentinel: no thread selected yet.
const NO_THREAD: usize = usize::MAX;

/// Scheduler state: the thread pool, the counters and the saved contexts.
pub(crate) struct Scheduler {
    /// Currently selected pool slot, or `NO_THREAD` before first dispatch.
    pub(crate) cur_slot: usize,
    /// Non-empty pool slots, holes included.
    pub(crate) busy_n: usize,
    /// Hole slots.
    pub(crate) hole_n: usize,
    /// Idle slots.
    #[cfg(feature = "idle")]
    pub(crate) idle_n: usize,
    /// Current top-of-main-stack ordinal.
    pub(crate) depth: usize,
    /// Scheduler execution context, saved at every dispatch.
    ctx: Context,
    /// Main-stack occupancy.
    stack: MainStack,
    /// Thread pool.
    pub(crate) pool: [Tcb; MAX_THREADS],
}

/// Outcome of examining the selected slot.
enum Dispatch {
    /// Nothing runnable here.
    Skip,
    /// Switch into the selected thread.
    Enter {
        save: *mut Context,
        load: *const Context,
    },
}

struct SchedCell(UnsafeCell<Scheduler>);

// One scheduler per process, used from a single cooperative execution
// context; references handed out never survive a context switch.
unsafe impl Sync for SchedCell {}

static SCHED: SchedCell = SchedCell(UnsafeCell::new(Scheduler::new()));

/// Reborrow the scheduler singleton.
///
/// # Safety
///
/// Callers must be on the single cooperative execution context and must
/// drop the reference before any context switch.
pub(crate) unsafe fn sched() -> &'static mut Scheduler {
    unsafe { &mut *SCHED.0.get() }
}

impl Scheduler {
    const fn new() -> Self {
        Scheduler {
            cur_slot: NO_THREAD,
            busy_n: 0,
            hole_n: 0,
            #[cfg(feature = "idle")]
            idle_n: 0,
            depth: 0,
            ctx: Context::ZERO,
            stack: MainStack::new(),
            pool: [Tcb::EMPTY; MAX_THREADS],
        }
    }

    /// Pick the action for the freshly selected slot.
    fn dispatch(&mut self) -> Dispatch {
        let slot = self.cur_slot;
        match self.pool[slot].state {
            ThreadState::Empty | ThreadState::Hole => Dispatch::Skip,
            #[cfg(feature = "idle")]
            ThreadState::Idle => {
                if is_tick_over(platform::current_tick(), self.pool[slot].idle_to) {
                    self.pool[slot].state = ThreadState::Running;
                    self.idle_n -= 1;
                    self.enter(slot)
                } else {
                    Dispatch::Skip
                }
            }
            #[cfg(feature = "wait")]
            ThreadState::Waiting => {
                let tcb = &self.pool[slot];
                if tcb.infinite || !is_tick_over(platform::current_tick(), tcb.wait_to) {
                    Dispatch::Skip
                } else {
                    // Timeout wake: `notified` stays clear, which is what
                    // `wait` reports back to the thread.
                    trace!("wait timed out in thread #{}", slot);
                    self.pool[slot].state = ThreadState::Running;
                    self.enter(slot)
                }
            }
            ThreadState::Running => self.enter(slot),
            ThreadState::New => self.start(slot),
        }
    }

    /// Resume a started thread.
    fn enter(&mut self, slot: usize) -> Dispatch {
        #[cfg(feature = "yield-after")]
        {
            self.pool[slot].switch_tick = platform::current_tick();
        }
        trace!("resuming thread #{}", slot);
        Dispatch::Enter {
            save: &mut self.ctx as *mut Context,
            load: &self.pool[slot].ctx as *const Context,
        }
    }

    /// First dispatch of a scheduled thread: carve its stack region at the
    /// next depth and aim a fresh context at the entry trampoline.
    fn start(&mut self, slot: usize) -> Dispatch {
        let size = self.pool[slot].stack_size;
        let region = match self.stack.carve(size) {
            Some(region) => region,
            None => {
                // The pool accepts threads the arena may turn out unable
                // to hold once earlier threads have carved theirs; all
                // that can be done this late is diagnose and drop.
                error!(
                    "main stack exhausted: thread #{} wants {} bytes, {} of {} in use",
                    slot,
                    size,
                    self.stack.used(),
                    MAIN_STACK_SIZE,
                );
                self.pool[slot].clear();
                self.busy_n -= 1;
                return Dispatch::Skip;
            }
        };

        self.depth += 1;
        let depth = self.depth;
        let tcb = &mut self.pool[slot];
        tcb.depth = depth;
        tcb.region = region;
        tcb.ctx = unsafe { Context::prepare(thread_trampoline as usize, region.top()) };
        tcb.state = ThreadState::Running;
        trace!(
            "starting thread #{} at depth {} ({} stack bytes)",
            slot,
            depth,
            region.size()
        );
        self.enter(slot)
    }

    /// Collapse a pool where every non-hole thread sits in a timed sleep:
    /// nothing can run until the earliest wake-up tick, so the quiet
    /// period is forwarded to the platform in one piece.
    #[cfg(feature = "idle")]
    fn collapse_idle(&mut self) {
        while self.idle_n > 0 && self.idle_n + self.hole_n == self.busy_n {
            let now = platform::current_tick();
            let mut min_left = Tick::MAX;
            let mut promoted = false;

            for (slot, tcb) in self.pool.iter_mut().enumerate() {
                if tcb.state != ThreadState::Idle {
                    continue;
                }
                if is_tick_over(now, tcb.idle_to) {
                    tcb.state = ThreadState::Running;
                    self.idle_n -= 1;
                    promoted = true;
                    trace!("idle period of thread #{} elapsed", slot);
                } else {
                    let left = tcb.idle_to.wrapping_sub(now);
                    if left < min_left {
                        min_left = left;
                    }
                }
            }

            if promoted {
                continue;
            }
            debug!("every thread idle, sleeping for {} ticks", min_left);
            platform::platform_idle(min_left);
        }
    }

    /// Termination path of the current thread. Never returns: control goes
    /// back to the scheduler context with the terminating stack either
    /// left behind as a hole or reclaimed by the unwind.
    fn exit_current(&mut self) -> ! {
        let slot = self.cur_slot;
        debug_assert_eq!(self.pool[slot].state, ThreadState::Running);

        if self.pool[slot].depth < self.depth {
            // Terminated under a live thread's stack: the region cannot be
            // reclaimed until everything above it is gone.
            self.pool[slot].state = ThreadState::Hole;
            self.hole_n += 1;
            trace!(
                "thread #{} became a hole at depth {}",
                slot,
                self.pool[slot].depth
            );
        } else {
            let unwind = self.mark_unwind_threads();
            self.stack.unwind_to(unwind);
            debug!(
                "unwound main stack to depth {} ({} bytes in use)",
                self.depth,
                self.stack.used()
            );
        }

        let load: *const Context = &self.ctx;
        unsafe { arch::context_load(load) }
    }

    /// Free the terminating topmost thread together with every hole left
    /// above the new top of stack, and report the region whose frame base
    /// the main stack unwinds to.
    fn mark_unwind_threads(&mut self) -> StackRegion {
        let term = self.cur_slot;

        // The terminating (most shallow) thread leaves the pool.
        let mut unwind = self.pool[term].region;
        self.pool[term].clear();
        self.busy_n -= 1;

        // New top of stack: greatest depth among still-started threads.
        let mut depth = 0;
        for tcb in self.pool.iter() {
            if still_started(tcb.state) && depth < tcb.depth {
                depth = tcb.depth;
            }
        }

        if depth + 1 < self.depth {
            // Every hole buried between the new top of stack and the
            // terminating thread goes with it; the one immediately above
            // the new top marks where the stack physically unwinds to.
            for slot in 0..MAX_THREADS {
                if self.pool[slot].state == ThreadState::Hole && self.pool[slot].depth > depth {
                    if self.pool[slot].depth == depth + 1 {
                        unwind = self.pool[slot].region;
                    }
                    trace!(
                        "reclaiming hole #{} at depth {}",
                        slot,
                        self.pool[slot].depth
                    );
                    self.pool[slot].clear();
                    self.busy_n -= 1;
                    self.hole_n -= 1;
                }
            }
        }

        self.depth = depth;
        unwind
    }

    /// Force the scheduler back to its initial state.
    pub(crate) fn reset(&mut self) {
        for tcb in self.pool.iter_mut() {
            tcb.clear();
        }
        self.cur_slot = NO_THREAD;
        self.busy_n = 0;
        self.hole_n = 0;
        #[cfg(feature = "idle")]
        {
            self.idle_n = 0;
        }
        self.depth = 0;
        self.ctx = Context::ZERO;
        self.stack.reset();
    }

    /// Self-check of the pool and counter invariants, run after every
    /// dispatch iteration in debug builds.
    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        let mut busy = 0;
        let mut holes = 0;
        #[cfg(feature = "idle")]
        let mut idle = 0;
        let mut max_depth = 0;
        let mut stacked = 0;
        let mut depth_seen = [false; MAX_THREADS];

        for tcb in self.pool.iter() {
            if tcb.state != ThreadState::Empty {
                busy += 1;
            }
            if tcb.state == ThreadState::Hole {
                holes += 1;
            }
            #[cfg(feature = "idle")]
            if tcb.state == ThreadState::Idle {
                idle += 1;
            }

            if tcb.has_stack() {
                debug_assert!(tcb.depth >= 1 && tcb.depth <= MAX_THREADS);
                debug_assert!(!depth_seen[tcb.depth - 1], "stack depth occupied twice");
                depth_seen[tcb.depth - 1] = true;
                stacked += tcb.region.size();
                if tcb.depth > max_depth {
                    max_depth = tcb.depth;
                }
            } else {
                debug_assert_eq!(tcb.depth, 0);
            }
        }

        debug_assert_eq!(busy, self.busy_n);
        debug_assert_eq!(holes, self.hole_n);
        #[cfg(feature = "idle")]
        debug_assert_eq!(idle, self.idle_n);
        debug_assert_eq!(max_depth, self.depth);
        debug_assert!(depth_seen.iter().take(self.depth).all(|&seen| seen));
        debug_assert_eq!(stacked, self.stack.used());
    }
}

/// States of threads that are still started, as opposed to terminated
/// (hole) or not yet begun.
fn still_started(state: ThreadState) -> bool {
    match state {
        ThreadState::Running => true,
        #[cfg(feature = "idle")]
        ThreadState::Idle => true,
        #[cfg(feature = "wait")]
        ThreadState::Waiting => true,
        _ => false,
    }
}

/// Shared entry point of every thread: runs the entry routine, then hands
/// the slot over to the termination path.
extern "C" fn thread_trampoline() -> ! {
    let (proc, arg) = {
        let s = unsafe { sched() };
        let tcb = &s.pool[s.cur_slot];
        (tcb.proc, tcb.arg)
    };

    // Always set while the slot is scheduled; empty slots are never
    // entered.
    if let Some(proc) = proc {
        proc(arg);
    }

    unsafe { sched() }.exit_current()
}

/// Schedule a thread to run.
///
/// Reserves the first free pool slot for a thread executing `proc(arg)` on
/// a stack of `stack_size` bytes; a `stack_size` of 0 selects
/// [`DEFAULT_STACK_SIZE`]. Legal both before [`service`] starts and from
/// within any running thread; the new thread first runs once the
/// round-robin dispatcher reaches its slot.
pub fn spawn(
    proc: ThreadProc,
    name: Option<&'static str>,
    stack_size: usize,
    arg: *mut (),
) -> SchedResult<()> {
    let stack_size = if stack_size == 0 {
        DEFAULT_STACK_SIZE
    } else {
        stack_size
    };
    if stack_size > MAIN_STACK_SIZE {
        return Err(ScheduleError::InvalidStackSize(stack_size));
    }

    let s = unsafe { sched() };
    if s.busy_n >= MAX_THREADS {
        return Err(ScheduleError::TooManyThreads);
    }

    for (slot, tcb) in s.pool.iter_mut().enumerate() {
        if tcb.state == ThreadState::Empty {
            tcb.clear();
            tcb.proc = Some(proc);
            tcb.arg = arg;
            tcb.name = name;
            tcb.stack_size = stack_size;
            tcb.state = ThreadState::New;
            s.busy_n += 1;
            trace!("scheduled thread #{} ({})", slot, name.unwrap_or("unnamed"));
            return Ok(());
        }
    }

    Err(ScheduleError::TooManyThreads)
}

/// Run the scheduler until every scheduled thread has terminated.
///
/// Drives the pool round-robin: threads scheduled before the call and
/// threads scheduled by running threads all run to completion. When the
/// pool drains the scheduler state is reset, so a fresh session can be
/// started afterwards.
pub fn service() {
    if unsafe { sched() }.cur_slot != NO_THREAD {
        error!("service() re-entered from a running thread");
        return;
    }

    loop {
        let step = {
            let s = unsafe { sched() };
            if s.busy_n == 0 {
                break;
            }

            // The increment sits at loop entry so the slot after the one
            // just serviced is examined next.
            s.cur_slot = s.cur_slot.wrapping_add(1) % MAX_THREADS;

            #[cfg(feature = "idle")]
            s.collapse_idle();

            s.dispatch()
        };

        if let Dispatch::Enter { save, load } = step {
            // No scheduler borrow is live here; the running thread
            // reborrows the singleton itself.
            unsafe { arch::context_switch(save, load) };
        }

        #[cfg(debug_assertions)]
        unsafe { sched() }.check_invariants();
    }

    trace!("all threads terminated, resetting scheduler");
    unsafe { sched() }.reset();
}

/// Yield the current thread back to the scheduler.
///
/// Cooperative reschedule: the thread stays runnable and resumes once the
/// round robin comes back to its slot. To be called from a thread routine
/// only.
pub fn yield_now() {
    let Some((save, load)) = suspend_ptrs() else {
        return;
    };
    trace!("thread #{} yields", unsafe { sched() }.cur_slot);
    unsafe { arch::context_switch(save, load) };
}

/// Yield if at least `limit` ticks have passed since the current thread
/// was last resumed.
///
/// Returns whether a yield happened. Lets long-running loops give up the
/// processor on a coarse time slice without paying for a context switch on
/// every iteration.
#[cfg(feature = "yield-after")]
pub fn yield_after(limit: Tick) -> bool {
    let due = {
        let s = unsafe { sched() };
        if s.cur_slot >= MAX_THREADS {
            error!("yield primitive called from outside a thread");
            return false;
        }
        s.pool[s.cur_slot].switch_tick.wrapping_add(limit)
    };

    if is_tick_over(platform::current_tick(), due) {
        yield_now();
        true
    } else {
        false
    }
}

/// Put the current thread into a timed sleep of `period` ticks.
///
/// The thread resumes once the period has elapsed (and the round robin
/// reaches it again). A zero period degrades to a plain [`yield_now`]. To
/// be called from a thread routine only.
#[cfg(feature = "idle")]
pub fn idle(period: Tick) {
    if period == 0 {
        return yield_now();
    }

    let Some((save, load)) = suspend_ptrs() else {
        return;
    };
    {
        let s = unsafe { sched() };
        let slot = s.cur_slot;
        let tcb = &mut s.pool[slot];
        tcb.state = ThreadState::Idle;
        tcb.idle_to = platform::current_tick().wrapping_add(period);
        s.idle_n += 1;
        trace!("thread #{} idle until tick {}", slot, tcb.idle_to);
    }
    unsafe { arch::context_switch(save, load) };
}

/// Block the current thread on the semaphore key `sem_id`.
///
/// A `timeout` of 0 waits indefinitely. Returns `true` when the thread was
/// woken by [`notify`]/[`notify_all`] and `false` when the timeout
/// elapsed. To be called from a thread routine only.
#[cfg(feature = "wait")]
pub fn wait(sem_id: SemId, timeout: Tick) -> bool {
    let Some((save, load)) = suspend_ptrs() else {
        return false;
    };
    let slot = {
        let s = unsafe { sched() };
        let slot = s.cur_slot;
        let tcb = &mut s.pool[slot];
        tcb.state = ThreadState::Waiting;
        tcb.sem_id = sem_id;
        tcb.infinite = timeout == 0;
        tcb.wait_to = platform::current_tick().wrapping_add(timeout);
        tcb.notified = false;
        trace!("thread #{} waiting on sem {}", slot, sem_id);
        slot
    };
    unsafe { arch::context_switch(save, load) };

    unsafe { sched() }.pool[slot].notified
}

/// Wake the lowest-index thread waiting on `sem_id`, if any.
///
/// A notification with no matching waiter is discarded; nothing is
/// queued. To be called from a running thread (between suspension
/// points); calling from an interrupt handler is unsupported.
#[cfg(feature = "wait")]
pub fn notify(sem_id: SemId) {
    notify_matching(sem_id, false);
}

/// Wake every thread waiting on `sem_id`.
///
/// Same restrictions as [`notify`].
#[cfg(feature = "wait")]
pub fn notify_all(sem_id: SemId) {
    notify_matching(sem_id, true);
}

#[cfg(feature = "wait")]
fn notify_matching(sem_id: SemId, all: bool) {
    let s = unsafe { sched() };
    for (slot, tcb) in s.pool.iter_mut().enumerate() {
        if tcb.state == ThreadState::Waiting && tcb.sem_id == sem_id {
            tcb.notified = true;
            tcb.state = ThreadState::Running;
            trace!("notified thread #{} on sem {}", slot, sem_id);
            if !all {
                return;
            }
        }
    }
}

/// Display name of the currently executing thread.
///
/// `None` when the thread was scheduled without a name, or when no thread
/// is executing.
pub fn current_name() -> Option<&'static str> {
    let s = unsafe { sched() };
    if s.cur_slot >= MAX_THREADS {
        return None;
    }
    s.pool[s.cur_slot].name
}

/// A snapshot of the scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedStats {
    /// Non-empty pool slots, holes included.
    pub busy: usize,
    /// Terminated threads whose stack regions are still buried.
    pub holes: usize,
    /// Threads in a timed sleep.
    #[cfg(feature = "idle")]
    pub idle: usize,
    /// Current top-of-main-stack ordinal.
    pub depth: usize,
}

/// Snapshot the scheduler counters, e.g. for diagnostics output.
pub fn stats() -> SchedStats {
    let s = unsafe { sched() };
    SchedStats {
        busy: s.busy_n,
        holes: s.hole_n,
        #[cfg(feature = "idle")]
        idle: s.idle_n,
        depth: s.depth,
    }
}

/// Save/load context pointers for parking the current thread, or `None`
/// (diagnosed) when no thread is current.
fn suspend_ptrs() -> Option<(*mut Context, *const Context)> {
    let s = unsafe { sched() };
    if s.cur_slot >= MAX_THREADS {
        error!("yield primitive called from outside a thread");
        return None;
    }
    let slot = s.cur_slot;
    Some((
        &mut s.pool[slot].ctx as *mut Context,
        &s.ctx as *const Context,
    ))
}
