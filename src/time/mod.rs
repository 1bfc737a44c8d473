//! Tick-based timekeeping.
//!
//! All timed behaviour in the scheduler is expressed in abstract ticks
//! supplied by the platform. The counter is allowed to wrap: comparisons
//! go through [`is_tick_over`], which stays correct across the wrap as
//! long as the compared ticks are within half the tick range of each
//! other.

pub mod tick;

pub use tick::{TickCounter, GLOBAL_TICK_COUNTER};

/// Abstract monotonic time unit provided by the host; may wrap.
pub type Tick = u32;

/// Comparison window: half the tick range.
const TICK_HALF_RANGE: Tick = Tick::MAX / 2;

/// Wrap-safe past-comparison.
///
/// `true` iff `limit` is not in the future relative to `now`, tolerating
/// counter wrap within the half-range window.
pub fn is_tick_over(now: Tick, limit: Tick) -> bool {
    now.wrapping_sub(limit) <= TICK_HALF_RANGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_over_plain() {
        assert!(is_tick_over(10, 10));
        assert!(is_tick_over(11, 10));
        assert!(!is_tick_over(9, 10));
    }

    #[test]
    fn test_tick_over_across_wrap() {
        // Deadline just past the wrap point, observer just before it.
        let limit = (Tick::MAX - 10).wrapping_add(20);
        assert_eq!(limit, 9);
        assert!(!is_tick_over(Tick::MAX - 5, limit));
        assert!(is_tick_over(9, limit));
        assert!(is_tick_over(25, limit));
    }

    #[test]
    fn test_tick_over_half_range_window() {
        assert!(is_tick_over(TICK_HALF_RANGE, 0));
        assert!(!is_tick_over(TICK_HALF_RANGE + 1, 0));
    }
}
