//! Fixed-step tick clock.
//!
//! Wall-clock time accumulates; every full tick interval fires one
//! simulation tick. A single update can fire none, one or several ticks.

use std::time::Duration;

use crate::config::{check_tick_rate, DEFAULT_TICKS_PER_SECOND};
use crate::error::Result;

/// Accumulator that converts elapsed time into fixed ticks.
#[derive(Debug, Clone)]
pub struct TickClock {
    ticks_per_second: u32,
    tick_interval: Duration,
    accumulator: Duration,
    current_tick: u64,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND)
    }
}

impl TickClock {
    /// Clock at `ticks_per_second`. A rate of zero, or one too high for a
    /// whole-nanosecond interval, logs an error and falls back to
    /// [`DEFAULT_TICKS_PER_SECOND`].
    #[must_use]
    pub fn new(ticks_per_second: u32) -> Self {
        Self::try_new(ticks_per_second).unwrap_or_else(|err| {
            tracing::error!(%err, default = DEFAULT_TICKS_PER_SECOND, "Falling back to default tick rate");
            Self::with_rate(DEFAULT_TICKS_PER_SECOND)
        })
    }

    /// Clock at `ticks_per_second`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`](crate::error::GameError::InvalidConfig)
    /// when the rate is zero or above
    /// [`MAX_TICKS_PER_SECOND`](crate::config::MAX_TICKS_PER_SECOND).
    pub fn try_new(ticks_per_second: u32) -> Result<Self> {
        check_tick_rate(ticks_per_second)?;
        Ok(Self::with_rate(ticks_per_second))
    }

    fn with_rate(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second,
            tick_interval: Duration::from_nanos(1_000_000_000 / u64::from(ticks_per_second)),
            accumulator: Duration::ZERO,
            current_tick: 0,
        }
    }

    /// Add `elapsed` and fire `on_tick(tick, interval)` for every full
    /// interval accumulated. Returns the number of ticks fired.
    pub fn advance(&mut self, elapsed: Duration, mut on_tick: impl FnMut(u64, Duration)) -> u32 {
        self.accumulator += elapsed;
        let mut fired = 0;
        while self.accumulator >= self.tick_interval {
            on_tick(self.current_tick, self.tick_interval);
            self.accumulator -= self.tick_interval;
            self.current_tick += 1;
            fired += 1;
        }
        fired
    }

    /// Fraction of the next tick already accumulated, in `[0, 1)`.
    ///
    /// Presentation only.
    #[must_use]
    pub fn interpolation_factor(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.tick_interval.as_secs_f32()
    }

    /// Ticks fired so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Configured rate.
    #[must_use]
    pub const fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Length of one tick.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Seconds covered by `ticks`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / f64::from(self.ticks_per_second)
    }

    /// Ticks closest to `seconds`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        (seconds * f64::from(self.ticks_per_second)).round().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TICKS_PER_SECOND;
    use crate::error::GameError;

    #[test]
    fn test_zero_rate_falls_back() {
        assert!(matches!(TickClock::try_new(0), Err(GameError::InvalidConfig(_))));
        let clock = TickClock::new(0);
        assert_eq!(clock.ticks_per_second(), DEFAULT_TICKS_PER_SECOND);
        assert_eq!(clock.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_rate_above_nanosecond_resolution_falls_back() {
        let fastest = TickClock::try_new(MAX_TICKS_PER_SECOND).unwrap();
        assert_eq!(fastest.tick_interval(), Duration::from_nanos(1));

        assert!(matches!(
            TickClock::try_new(2_000_000_000),
            Err(GameError::InvalidConfig(_))
        ));
        let mut clock = TickClock::new(2_000_000_000);
        assert_eq!(clock.ticks_per_second(), DEFAULT_TICKS_PER_SECOND);
        assert!(clock.tick_interval() > Duration::ZERO);
        assert_eq!(clock.advance(Duration::from_millis(1), |_, _| {}), 0);
    }

    #[test]
    fn test_catch_up_fires_many() {
        let mut clock = TickClock::new(20);
        let mut seen = Vec::new();
        let fired = clock.advance(Duration::from_millis(130), |tick, dt| {
            assert_eq!(dt, Duration::from_millis(50));
            seen.push(tick);
        });
        assert_eq!(fired, 2);
        assert_eq!(seen, vec![0, 1]);
        assert!((clock.interpolation_factor() - 0.6).abs() < 1e-4);

        let fired = clock.advance(Duration::from_millis(10), |_, _| {});
        assert_eq!(fired, 0);
        let fired = clock.advance(Duration::from_millis(10), |tick, _| assert_eq!(tick, 2));
        assert_eq!(fired, 1);
        assert_eq!(clock.current_tick(), 3);
    }

    #[test]
    fn test_conversions() {
        let clock = TickClock::new(20);
        assert!((clock.ticks_to_seconds(30) - 1.5).abs() < f64::EPSILON);
        assert_eq!(clock.seconds_to_ticks(1.52), 30);
        assert_eq!(clock.seconds_to_ticks(-1.0), 0);
    }
}
