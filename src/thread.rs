//! Thread control blocks.

use crate::arch::Context;
use crate::mem::StackRegion;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::time::Tick;

/// Entry routine of a thread. Receives the opaque argument the thread was
/// scheduled with.
pub type ThreadProc = fn(*mut ());

/// Opaque key matching waiters with notifiers.
///
/// The scheduler keeps no semaphore objects; a waiting thread records the
/// key and [`notify`](crate::notify) wakes whoever recorded the same one.
#[cfg(feature = "wait")]
pub type SemId = u32;

/// Thread states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Free pool slot.
    Empty,
    /// Terminated, but the thread's stack region is still buried under a
    /// live thread's region and cannot be reclaimed yet.
    Hole,
    /// Scheduled but not yet entered; no stack region.
    New,
    /// Active thread whose stack region is live on the main stack.
    Running,
    /// Timed sleep until a wake-up tick.
    #[cfg(feature = "idle")]
    Idle,
    /// Blocked on a semaphore key, optionally with a timeout.
    #[cfg(feature = "wait")]
    Waiting,
}

/// Thread control block: one slot of the scheduler pool.
pub(crate) struct Tcb {
    /// Entry routine. `None` only while the slot is empty.
    pub(crate) proc: Option<ThreadProc>,
    /// Opaque argument handed to the entry routine.
    pub(crate) arg: *mut (),
    /// Display name.
    pub(crate) name: Option<&'static str>,
    /// Requested stack size in bytes.
    pub(crate) stack_size: usize,
    pub(crate) state: ThreadState,
    /// Position on the main stack: 1 for the deepest started thread, the
    /// scheduler's current depth for the most shallow one. 0 until
    /// started.
    pub(crate) depth: usize,
    /// Execution context at the last suspension point.
    pub(crate) ctx: Context,
    /// Carved stack region; meaningful once started.
    pub(crate) region: StackRegion,
    /// Wake-up tick while idling.
    #[cfg(feature = "idle")]
    pub(crate) idle_to: Tick,
    /// Tick at which the thread was last resumed.
    #[cfg(feature = "yield-after")]
    pub(crate) switch_tick: Tick,
    /// Semaphore key the thread is blocked on.
    #[cfg(feature = "wait")]
    pub(crate) sem_id: SemId,
    /// Wake-up tick while waiting; unused when `infinite`.
    #[cfg(feature = "wait")]
    pub(crate) wait_to: Tick,
    /// Waiting without a timeout.
    #[cfg(feature = "wait")]
    pub(crate) infinite: bool,
    /// Wake cause: set by a notification, left clear by a timeout.
    #[cfg(feature = "wait")]
    pub(crate) notified: bool,
}

impl Tcb {
    pub(crate) const EMPTY: Tcb = Tcb {
        proc: None,
        arg: core::ptr::null_mut(),
        name: None,
        stack_size: 0,
        state: ThreadState::Empty,
        depth: 0,
        ctx: Context::ZERO,
        region: StackRegion::EMPTY,
        #[cfg(feature = "idle")]
        idle_to: 0,
        #[cfg(feature = "yield-after")]
        switch_tick: 0,
        #[cfg(feature = "wait")]
        sem_id: 0,
        #[cfg(feature = "wait")]
        wait_to: 0,
        #[cfg(feature = "wait")]
        infinite: false,
        #[cfg(feature = "wait")]
        notified: false,
    };

    /// Return the slot to the free pool.
    pub(crate) fn clear(&mut self) {
        *self = Tcb::EMPTY;
    }

    /// Whether the thread occupies a stack region on the main stack.
    pub(crate) fn has_stack(&self) -> bool {
        match self.state {
            ThreadState::Running | ThreadState::Hole => true,
            #[cfg(feature = "idle")]
            ThreadState::Idle => true,
            #[cfg(feature = "wait")]
            ThreadState::Waiting => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tcb() {
        let tcb = Tcb::EMPTY;
        assert_eq!(tcb.state, ThreadState::Empty);
        assert_eq!(tcb.depth, 0);
        assert!(tcb.proc.is_none());
        assert!(!tcb.has_stack());
    }

    #[test]
    fn test_has_stack_by_state() {
        let mut tcb = Tcb::EMPTY;

        tcb.state = ThreadState::New;
        assert!(!tcb.has_stack());

        tcb.state = ThreadState::Running;
        assert!(tcb.has_stack());

        tcb.state = ThreadState::Hole;
        assert!(tcb.has_stack());

        #[cfg(feature = "idle")]
        {
            tcb.state = ThreadState::Idle;
            assert!(tcb.has_stack());
        }

        #[cfg(feature = "wait")]
        {
            tcb.state = ThreadState::Waiting;
            assert!(tcb.has_stack());
        }
    }
}
