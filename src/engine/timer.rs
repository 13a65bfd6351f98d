//! Frame-delta accumulator used for every rate-limited step (piece gravity,
//! floating cells, swap-back).

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallTimer {
    acc: Duration,
}

impl FallTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `dt` and returns how many whole `interval`s are now due.
    /// The remainder carries over to the next call.
    pub fn advance(&mut self, dt: Duration, interval: Duration) -> u32 {
        self.acc += dt;
        if interval.is_zero() {
            self.acc = Duration::ZERO;
            return 1;
        }
        let due = self.acc.as_nanos() / interval.as_nanos();
        if due == 0 {
            return 0;
        }
        self.acc -= interval * due as u32;
        due.min(u128::from(u32::MAX)) as u32
    }

    pub fn reset(&mut self) {
        self.acc = Duration::ZERO;
    }

    pub fn elapsed(&self) -> Duration {
        self.acc
    }
}

/// Cells per second -> time per cell.
pub fn interval_for_speed(cells_per_sec: f64) -> Duration {
    Duration::from_secs_f64(1.0 / cells_per_sec.max(f64::EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_carries_remainder() {
        let mut t = FallTimer::new();
        let step = Duration::from_millis(100);
        assert_eq!(t.advance(Duration::from_millis(60), step), 0);
        assert_eq!(t.advance(Duration::from_millis(60), step), 1);
        assert_eq!(t.elapsed(), Duration::from_millis(20));
        assert_eq!(t.advance(Duration::from_millis(380), step), 4);
        assert_eq!(t.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_interval_for_speed() {
        assert_eq!(interval_for_speed(2.0), Duration::from_millis(500));
    }
}
