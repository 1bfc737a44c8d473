//! Compile-time scheduler configuration.
//!
//! All sizing is fixed at build time: the thread pool and the main-stack
//! arena are static, and the core never touches a heap. Adjust these
//! constants (or vendor the crate) to fit the target's memory.

/// Maximum number of threads supported by the scheduler.
///
/// Defined as the thread pool size; scheduling more than this many
/// concurrently live threads fails with
/// [`ScheduleError::TooManyThreads`](crate::errors::ScheduleError).
pub const MAX_THREADS: usize = 8;

/// Default thread stack size in bytes.
///
/// Substituted when a caller passes a stack size of 0 to
/// [`spawn`](crate::spawn).
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Total size of the main stack shared by all thread stack regions.
///
/// Thread stacks are carved out of this arena as contiguous frames; the
/// summed sizes of all live threads' regions can never exceed it.
pub const MAIN_STACK_SIZE: usize = 1024 * 1024;

/// Stack regions and initial stack pointers are kept aligned to this.
pub const STACK_ALIGN: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_sanity() {
        assert!(MAX_THREADS > 0);
        assert!(DEFAULT_STACK_SIZE % STACK_ALIGN == 0);
        assert!(MAIN_STACK_SIZE % STACK_ALIGN == 0);
        assert!(DEFAULT_STACK_SIZE <= MAIN_STACK_SIZE);
    }
}
