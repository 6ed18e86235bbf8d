use super::MockConfig;
use crate::domain::JobResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct SimulatedJob {
    started_at: Instant,
    duration: Duration,
    queries: u32,
}

#[derive(Debug)]
struct Inner {
    jobs: HashMap<String, SimulatedJob>,
    rng: StdRng,
}

/// In-memory job table of the mock server.
///
/// A job is created the first time it is queried, with a duration drawn from
/// the configured range. Nothing outlives the process.
#[derive(Debug)]
pub struct JobStore {
    config: MockConfig,
    inner: Mutex<Inner>,
}

impl JobStore {
    pub fn new(config: MockConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            config,
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                rng,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers one status query for `job_id`.
    ///
    /// A finished job always reports `Completed`. An unfinished one reports
    /// `Error` with the configured probability, drawn anew on every query,
    /// and `Pending` otherwise.
    pub fn query(&self, job_id: &str) -> JobResult {
        let now = Instant::now();
        let mut inner = self.lock();
        let Inner { jobs, rng } = &mut *inner;

        let job = jobs.entry(job_id.to_string()).or_insert_with(|| SimulatedJob {
            started_at: now,
            duration: draw_duration(rng, self.config.min_duration, self.config.max_duration),
            queries: 0,
        });
        job.queries += 1;

        if now.duration_since(job.started_at) >= job.duration {
            return JobResult::Completed;
        }

        if rng.random::<f64>() < self.config.error_rate {
            return JobResult::Error;
        }

        JobResult::Pending
    }

    /// Number of queries seen for `job_id` so far.
    pub fn query_count(&self, job_id: &str) -> u32 {
        self.lock().jobs.get(job_id).map_or(0, |job| job.queries)
    }

    /// Duration assigned to `job_id`, if it has been queried.
    pub fn job_duration(&self, job_id: &str) -> Option<Duration> {
        self.lock().jobs.get(job_id).map(|job| job.duration)
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn draw_duration(rng: &mut StdRng, min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    rng.random_range(min..=max)
}
