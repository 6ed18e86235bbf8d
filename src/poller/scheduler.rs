use crate::config::PollerConfig;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound (exclusive) of a jitter sample, in seconds.
const JITTER_CEILING: f64 = 1.0;
const MAX_JITTER_NANOS: u64 = 999_999_999;

/// Source of the random component added to every computed interval.
pub trait JitterSource: Send + Sync {
    /// Returns a value in `[0, 1)` seconds.
    fn sample(&self) -> f64;
}

/// Uniform jitter drawn from the thread-local RNG on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(0.0..JITTER_CEILING)
    }
}

/// Constant jitter, for deterministic schedules.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Backoff state of a single in-flight poll.
///
/// Created when a poll starts and dropped when it ends; never shared between
/// polls. `initial_interval <= current_interval <= max_interval` holds for the
/// whole lifetime.
#[derive(Debug, Clone)]
pub struct PollState {
    start_time: Instant,
    current_interval: Duration,
    initial_interval: Duration,
    max_interval: Duration,
    backoff_factor: f64,
    total_elapsed: Duration,
}

impl PollState {
    pub fn new(config: &PollerConfig, start_time: Instant) -> Self {
        Self {
            start_time,
            current_interval: config.initial_interval,
            initial_interval: config.initial_interval,
            max_interval: config.max_interval,
            backoff_factor: config.backoff_factor,
            total_elapsed: Duration::ZERO,
        }
    }

    /// Records and returns the time elapsed since the poll started.
    pub fn observe(&mut self, now: Instant) -> Duration {
        self.total_elapsed = now.saturating_duration_since(self.start_time);
        self.total_elapsed
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }
}

/// Computes wait durations between polls:
/// `next = min(current * backoff_factor + jitter, max_interval)`.
pub struct IntervalScheduler {
    jitter: Box<dyn JitterSource>,
}

impl IntervalScheduler {
    pub fn new(jitter: impl JitterSource + 'static) -> Self {
        Self {
            jitter: Box::new(jitter),
        }
    }

    /// Returns the next wait and stores it as the state's current interval.
    pub fn next(&self, state: &mut PollState) -> Duration {
        let jitter = jitter_duration(self.jitter.sample());

        let grown = state.current_interval.as_secs_f64() * state.backoff_factor;
        let next = Duration::try_from_secs_f64(grown)
            .unwrap_or(state.max_interval)
            .saturating_add(jitter)
            .min(state.max_interval)
            .max(state.current_interval);

        state.current_interval = next;
        next
    }
}

/// Converts a jitter sample to whole nanoseconds strictly below one second.
/// Out-of-range or NaN samples would otherwise break the interval bounds.
fn jitter_duration(sample: f64) -> Duration {
    if !sample.is_finite() || sample <= 0.0 {
        return Duration::ZERO;
    }
    let nanos = (sample.min(JITTER_CEILING) * 1e9) as u64;
    Duration::from_nanos(nanos.min(MAX_JITTER_NANOS))
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new(RandomJitter)
    }
}

impl std::fmt::Debug for IntervalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalScheduler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial: u64, max: u64, factor: f64) -> PollerConfig {
        PollerConfig {
            initial_interval: Duration::from_secs(initial),
            max_interval: Duration::from_secs(max),
            backoff_factor: factor,
            ..PollerConfig::default()
        }
    }

    fn state(initial: u64, max: u64, factor: f64) -> PollState {
        PollState::new(&config(initial, max, factor), Instant::now())
    }

    mod next {
        use super::*;

        #[test]
        fn starts_from_initial_interval() {
            let state = state(1, 30, 2.0);
            assert_eq!(state.current_interval(), Duration::from_secs(1));
        }

        #[test]
        fn grows_by_factor_without_jitter() {
            let scheduler = IntervalScheduler::new(FixedJitter(0.0));
            let mut state = state(1, 30, 2.0);

            assert_eq!(scheduler.next(&mut state), Duration::from_secs(2));
            assert_eq!(scheduler.next(&mut state), Duration::from_secs(4));
            assert_eq!(scheduler.next(&mut state), Duration::from_secs(8));
            assert_eq!(state.current_interval(), Duration::from_secs(8));
        }

        #[test]
        fn adds_jitter_after_growth() {
            let scheduler = IntervalScheduler::new(FixedJitter(0.5));
            let mut state = state(1, 30, 2.0);

            assert_eq!(scheduler.next(&mut state), Duration::from_millis(2500));
            assert_eq!(scheduler.next(&mut state), Duration::from_millis(5500));
        }

        #[test]
        fn clamps_to_max_interval() {
            let scheduler = IntervalScheduler::new(FixedJitter(0.9));
            let mut state = state(1, 5, 2.0);

            scheduler.next(&mut state);
            scheduler.next(&mut state);
            assert_eq!(scheduler.next(&mut state), Duration::from_secs(5));
            assert_eq!(scheduler.next(&mut state), Duration::from_secs(5));
        }

        #[test]
        fn out_of_range_jitter_is_bounded() {
            let scheduler = IntervalScheduler::new(FixedJitter(7.0));
            let mut state = state(1, 30, 2.0);

            assert_eq!(scheduler.next(&mut state), Duration::from_nanos(2_999_999_999));
        }

        #[test]
        fn jitter_just_below_one_second_stays_below() {
            let scheduler = IntervalScheduler::new(FixedJitter(1.0 - f64::EPSILON));
            let mut state = state(1, 30, 2.0);

            assert!(scheduler.next(&mut state) < Duration::from_secs(3));
        }

        #[test]
        fn negative_jitter_is_ignored() {
            let scheduler = IntervalScheduler::new(FixedJitter(-0.5));
            let mut state = state(1, 30, 2.0);

            assert_eq!(scheduler.next(&mut state), Duration::from_secs(2));
        }

        #[test]
        fn nan_jitter_is_ignored() {
            let scheduler = IntervalScheduler::new(FixedJitter(f64::NAN));
            let mut state = state(1, 30, 2.0);

            assert_eq!(scheduler.next(&mut state), Duration::from_secs(2));
        }

        #[test]
        fn random_output_stays_within_bounds() {
            let scheduler = IntervalScheduler::default();

            for factor in [1.1, 1.5, 2.0, 3.0] {
                let mut state = state(1, 20, factor);
                let mut previous = state.current_interval();

                for _ in 0..100 {
                    let next = scheduler.next(&mut state);
                    assert!(next >= previous, "{next:?} < {previous:?}");
                    assert!(next <= state.max_interval());
                    assert!(next >= state.initial_interval());
                    previous = next;
                }
                assert_eq!(previous, state.max_interval());
            }
        }

        #[test]
        fn huge_factor_saturates_at_max() {
            let scheduler = IntervalScheduler::new(FixedJitter(0.0));
            let mut state = state(1, 60, f64::MAX);

            assert_eq!(scheduler.next(&mut state), Duration::from_secs(60));
        }
    }

    mod observe {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn tracks_elapsed_since_start() {
            let mut state = state(1, 30, 2.0);
            tokio::time::advance(Duration::from_millis(1500)).await;

            let elapsed = state.observe(Instant::now());
            assert_eq!(elapsed, Duration::from_millis(1500));
            assert_eq!(state.total_elapsed(), elapsed);
        }
    }
}
