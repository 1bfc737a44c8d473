//! Error types for thread scheduling.

use core::fmt;

/// Result type for scheduling operations.
pub type SchedResult<T> = Result<T, ScheduleError>;

/// Errors that can occur when scheduling a thread.
///
/// These are the only errors the crate surfaces: both are returned
/// synchronously from [`spawn`](crate::spawn). Nothing inside the service
/// loop or the yield primitives reports errors; wait timeouts are a normal
/// `false` return from [`wait`](crate::wait), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// Requested stack size can never fit the main stack.
    InvalidStackSize(usize),
    /// Thread pool is full.
    TooManyThreads,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidStackSize(size) => {
                write!(f, "invalid stack size: {} bytes", size)
            }
            ScheduleError::TooManyThreads => write!(f, "maximum number of threads reached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        use std::string::ToString;

        assert_eq!(
            ScheduleError::InvalidStackSize(3).to_string(),
            "invalid stack size: 3 bytes"
        );
        assert_eq!(
            ScheduleError::TooManyThreads.to_string(),
            "maximum number of threads reached"
        );
    }
}
