use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::job::JobResult;

/// Aggregate counters for one run.
///
/// Only the result collector mutates these; everyone else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    /// Sum of every received result's generator time.
    pub total_duration: Duration,
    /// Mean over received results while running, over `total_jobs` once finished.
    pub average_duration: Duration,
    pub worker_count: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Statistics {
    /// Fresh counters for a run that is starting now.
    pub fn begin(total_jobs: usize, worker_count: usize) -> Self {
        Self {
            total_jobs,
            worker_count,
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Folds one result into the counters.
    pub fn record(&mut self, result: &JobResult) {
        if result.is_success() {
            self.completed_jobs += 1;
        } else {
            self.failed_jobs += 1;
        }
        self.total_duration += result.duration;
        self.average_duration = divide(self.total_duration, self.processed());
    }

    /// Stamps the end time and computes the final average over `total_jobs`.
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
        self.average_duration = divide(self.total_duration, self.total_jobs);
    }

    /// Results received so far.
    pub fn processed(&self) -> usize {
        self.completed_jobs + self.failed_jobs
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Completed jobs as a percentage of `total_jobs`.
    pub fn success_rate(&self) -> f64 {
        if self.total_jobs == 0 {
            return 0.0;
        }
        self.completed_jobs as f64 / self.total_jobs as f64 * 100.0
    }

    pub fn wall_time(&self) -> Option<Duration> {
        let (start, end) = (self.start_time?, self.end_time?);
        (end - start).to_std().ok()
    }

    /// Jobs per second of wall time.
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.wall_time()?.as_secs_f64();
        (secs > 0.0).then(|| self.total_jobs as f64 / secs)
    }
}

fn divide(total: Duration, count: usize) -> Duration {
    u32::try_from(count)
        .ok()
        .and_then(|n| total.checked_div(n))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::job::Job;

    fn result(ok: bool, millis: u64) -> JobResult {
        JobResult {
            job: Job::new("job-1", "prompt"),
            outcome: if ok {
                Ok("text".into())
            } else {
                Err(JobError::Generation("nope".into()))
            },
            duration: Duration::from_millis(millis),
            worker_id: 1,
        }
    }

    #[test]
    fn record_counts_success_and_failure() {
        let mut stats = Statistics::begin(3, 2);
        stats.record(&result(true, 100));
        stats.record(&result(false, 50));

        assert_eq!(stats.completed_jobs, 1);
        assert_eq!(stats.failed_jobs, 1);
        assert_eq!(stats.processed(), 2);
        assert_eq!(stats.total_duration, Duration::from_millis(150));
        assert_eq!(stats.average_duration, Duration::from_millis(75));
        assert!(!stats.is_finished());
    }

    #[test]
    fn finish_averages_over_total_jobs() {
        let mut stats = Statistics::begin(4, 2);
        for _ in 0..4 {
            stats.record(&result(true, 30));
        }
        stats.finish();

        assert!(stats.is_finished());
        assert_eq!(stats.average_duration * 4, stats.total_duration);
        assert!(stats.wall_time().is_some());
        assert!((stats.success_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_jobs_do_not_divide_by_zero() {
        let mut stats = Statistics::begin(0, 1);
        stats.finish();
        assert_eq!(stats.average_duration, Duration::ZERO);
        assert_eq!(stats.success_rate(), 0.0);
    }
}
