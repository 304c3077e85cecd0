//! Fixed-cadence tick gating for a variable-rate render loop.

use std::time::Duration;

use crate::params::ScheduleConfig;

/// Decides, per render callback, whether an ingestion tick is due.
///
/// Timestamps are supplied by the caller (time since the loop started), so
/// tests can drive it with a synthetic clock.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    min_interval: Duration,
    last_tick: Option<Duration>,
}

impl TickScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_tick: None,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(Duration::from_millis(config.min_tick_interval_ms))
    }

    /// Returns true (and records `now`) if a tick should run at `now`.
    ///
    /// A timestamp earlier than the last tick never ticks.
    pub fn maybe_tick(&mut self, now: Duration) -> bool {
        let due = match self.last_tick {
            None => true,
            Some(last) => now
                .checked_sub(last)
                .is_some_and(|elapsed| elapsed >= self.min_interval),
        };
        if due {
            self.last_tick = Some(now);
        }
        due
    }

    pub fn last_tick(&self) -> Option<Duration> {
        self.last_tick
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Forget the last tick; the next callback ticks immediately
    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_first_callback_ticks() {
        let mut scheduler = TickScheduler::new(ms(5));
        assert!(scheduler.maybe_tick(ms(0)));
        assert_eq!(scheduler.last_tick(), Some(ms(0)));
    }

    #[test]
    fn test_fast_callbacks_are_throttled() {
        let mut scheduler = TickScheduler::new(ms(5));
        let ticks: Vec<u64> = (0..50)
            .map(|i| i * 2)
            .filter(|&t| scheduler.maybe_tick(ms(t)))
            .collect();

        assert_eq!(&ticks[..4], &[0, 6, 12, 18]);
        for pair in ticks.windows(2) {
            assert!(pair[1] - pair[0] >= 5, "ticks {:?} closer than 5ms", pair);
        }
    }

    #[test]
    fn test_slow_callbacks_tick_every_time() {
        let mut scheduler = TickScheduler::new(ms(5));
        for i in 0..20 {
            assert!(scheduler.maybe_tick(ms(i * 10)), "callback {} should tick", i);
        }
    }

    #[test]
    fn test_exact_interval_ticks() {
        let mut scheduler = TickScheduler::new(ms(5));
        assert!(scheduler.maybe_tick(ms(100)));
        assert!(!scheduler.maybe_tick(ms(104)));
        assert!(scheduler.maybe_tick(ms(105)));
    }

    #[test]
    fn test_clock_going_backwards_does_not_tick() {
        let mut scheduler = TickScheduler::new(ms(5));
        assert!(scheduler.maybe_tick(ms(100)));
        assert!(!scheduler.maybe_tick(ms(50)));
        assert_eq!(scheduler.last_tick(), Some(ms(100)));
    }

    #[test]
    fn test_reset() {
        let mut scheduler = TickScheduler::from_config(&ScheduleConfig::default());
        assert_eq!(scheduler.min_interval(), ms(5));
        assert!(scheduler.maybe_tick(ms(1)));
        scheduler.reset();
        assert!(scheduler.maybe_tick(ms(2)));
    }
}
