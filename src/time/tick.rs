//! Global tick counting.

use portable_atomic::{AtomicU32, Ordering};

use super::Tick;

/// Free-running tick counter, the default time source of the scheduler.
///
/// On a real target the platform timer interrupt drives it through
/// [`increment`](TickCounter::increment) (or
/// [`advance`](TickCounter::advance) when interrupts are coalesced). The
/// default idle handler also advances it, so quiet periods pass in
/// simulated time on hosts without a timer.
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    /// Create a counter starting at tick 0.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one tick (timer interrupt handler).
    pub fn increment(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }

    /// Advance by `n` ticks, wrapping at the end of the tick range.
    pub fn advance(&self, n: Tick) {
        self.ticks.fetch_add(n, Ordering::AcqRel);
    }

    /// Current tick count.
    pub fn ticks(&self) -> Tick {
        self.ticks.load(Ordering::Acquire)
    }

    /// Force the counter to a known tick value.
    pub fn set(&self, value: Tick) {
        self.ticks.store(value, Ordering::Release);
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Global tick counter instance.
pub static GLOBAL_TICK_COUNTER: TickCounter = TickCounter::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counter() {
        let counter = TickCounter::new();
        assert_eq!(counter.ticks(), 0);

        counter.increment();
        assert_eq!(counter.ticks(), 1);

        counter.advance(41);
        assert_eq!(counter.ticks(), 42);

        counter.set(7);
        assert_eq!(counter.ticks(), 7);
    }

    #[test]
    fn test_tick_counter_wraps() {
        let counter = TickCounter::new();
        counter.set(Tick::MAX - 1);
        counter.advance(3);
        assert_eq!(counter.ticks(), 1);
    }
}
