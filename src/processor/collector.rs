use tokio::sync::{mpsc, watch};

use crate::{job::JobResult, stats::Statistics};

/// Drains worker output until every worker is gone.
///
/// This is the only writer of the run's statistics.
pub(super) async fn collect(
    mut results: mpsc::Receiver<JobResult>,
    stats: &watch::Sender<Statistics>,
    expected: usize,
) -> Vec<JobResult> {
    let mut collected = Vec::with_capacity(expected);
    while let Some(result) = results.recv().await {
        match result.error() {
            None => log::debug!(
                "{} completed by worker {} in {:?}",
                result.job.id,
                result.worker_id,
                result.duration
            ),
            Some(err) => log::debug!(
                "{} failed on worker {}: {err}",
                result.job.id,
                result.worker_id
            ),
        }
        stats.send_modify(|s| s.record(&result));
        collected.push(result);
    }
    stats.send_modify(Statistics::finish);
    collected
}
