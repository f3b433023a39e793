//! Virtual clock for discrete-event simulation.
//!
//! The [`SimClock`] tracks simulation time independently of wall-clock time,
//! advancing only when events are processed. Time is a dimensionless `f64`
//! in the same unit as the configured rates (a rate of 2.0 means two events
//! per time unit on average).

use serde::{Deserialize, Serialize};

/// Virtual simulation clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    now: f64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Current simulation time.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advance the clock to `time`, returning the elapsed interval.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `time` is in the past.
    pub fn advance_to(&mut self, time: f64) -> f64 {
        debug_assert!(
            time >= self.now,
            "Cannot move clock backwards: current={}, target={}",
            self.now,
            time,
        );
        let elapsed = time - self.now;
        self.now = time;
        elapsed
    }

    /// Whether the clock has reached `horizon`.
    pub fn reached(&self, horizon: f64) -> bool {
        self.now >= horizon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_advance_to_returns_elapsed() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance_to(2.5), 2.5);
        assert_eq!(clock.advance_to(4.0), 1.5);
        assert_eq!(clock.now(), 4.0);
    }

    #[test]
    fn test_advance_to_same_time_is_zero() {
        let mut clock = SimClock::new();
        clock.advance_to(1.0);
        assert_eq!(clock.advance_to(1.0), 0.0);
    }

    #[test]
    fn test_reached() {
        let mut clock = SimClock::new();
        assert!(!clock.reached(10.0));
        clock.advance_to(10.0);
        assert!(clock.reached(10.0));
    }

    #[test]
    #[should_panic(expected = "Cannot move clock backwards")]
    fn test_cannot_go_backwards() {
        let mut clock = SimClock::new();
        clock.advance_to(100.0);
        clock.advance_to(50.0);
    }
}
