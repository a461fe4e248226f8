use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;

use crate::{
    config::GeneratorConfig,
    context::RunContext,
    error::RunError,
    generator::GeneratorFactory,
    job::{Job, JobResult},
    stats::Statistics,
};

use super::collector::collect;
use super::dispatcher::dispatch;
use super::worker::Worker;

/// What a run produced.
///
/// When `error` is set the run was cancelled or hit its deadline and
/// `results` may be partial; inspect each result to see which jobs succeeded.
#[derive(Debug)]
pub struct RunOutcome {
    /// One entry per dispatched job, in completion order.
    pub results: Vec<JobResult>,
    pub error: Option<RunError>,
}

impl RunOutcome {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs batches of jobs across a fixed pool of workers.
///
/// Each worker builds its own generator through the injected factory.
/// Statistics of the latest run are readable at any time via
/// [`BatchProcessor::statistics`].
pub struct BatchProcessor {
    factory: Arc<dyn GeneratorFactory>,
    config: Arc<GeneratorConfig>,
    worker_count: usize,
    debug: bool,
    stats: watch::Sender<Statistics>,
}

impl BatchProcessor {
    /// Creates a processor; a worker count of zero is raised to one.
    pub fn new<F>(factory: F, config: GeneratorConfig, worker_count: usize) -> Self
    where
        F: GeneratorFactory + 'static,
    {
        Self::with_factory(Arc::new(factory), config, worker_count)
    }

    pub fn with_factory(
        factory: Arc<dyn GeneratorFactory>,
        config: GeneratorConfig,
        worker_count: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (stats, _) = watch::channel(Statistics {
            worker_count,
            ..Statistics::default()
        });
        Self {
            factory,
            config: Arc::new(config),
            worker_count,
            debug: false,
            stats,
        }
    }

    /// Passes the debug flag through to the factory.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Snapshot of the current (or last) run's statistics.
    pub fn statistics(&self) -> Statistics {
        self.stats.borrow().clone()
    }

    /// Receiver notified every time a result is folded in.
    pub fn subscribe(&self) -> watch::Receiver<Statistics> {
        self.stats.subscribe()
    }

    /// Processes `jobs` concurrently and returns every collected result.
    ///
    /// An empty job list returns immediately without starting any worker.
    pub async fn process_jobs(&self, ctx: &RunContext, jobs: Vec<Job>) -> RunOutcome {
        if jobs.is_empty() {
            let mut stats = Statistics::begin(0, self.worker_count);
            stats.finish();
            self.stats.send_replace(stats);
            return RunOutcome::empty();
        }

        let total = jobs.len();
        self.stats
            .send_replace(Statistics::begin(total, self.worker_count));
        log::info!(
            "processing {total} jobs with {} workers",
            self.worker_count
        );

        let run_ctx = ctx.child();
        let (intake_tx, intake_rx) = mpsc::channel::<Job>(self.worker_count);
        let intake = Arc::new(Mutex::new(intake_rx));
        let (result_tx, result_rx) = mpsc::channel::<JobResult>(total);

        let mut tasks = JoinSet::new();
        for id in 1..=self.worker_count {
            let worker = Worker {
                id,
                ctx: run_ctx.clone(),
                intake: Arc::clone(&intake),
                results: result_tx.clone(),
            };
            tasks.spawn(worker.run(
                Arc::clone(&self.factory),
                Arc::clone(&self.config),
                self.debug,
            ));
        }
        // Workers hold the only senders, so the output closes once the last one exits.
        drop(result_tx);
        drop(intake);
        tasks.spawn(dispatch(run_ctx.clone(), jobs, intake_tx));

        let results = collect(result_rx, &self.stats, total).await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                log::error!("batch task ended abnormally: {err}");
            }
        }

        let error = run_ctx.err();
        let stats = self.statistics();
        match error {
            None => log::info!(
                "batch finished: {} completed, {} failed",
                stats.completed_jobs,
                stats.failed_jobs
            ),
            Some(cause) => log::warn!(
                "batch stopped early ({cause}): {}/{total} results collected",
                results.len()
            ),
        }
        RunOutcome { results, error }
    }
}

/// One-shot entry point: builds a processor and runs `jobs` through it.
pub async fn process_jobs<F>(
    ctx: &RunContext,
    jobs: Vec<Job>,
    factory: F,
    config: GeneratorConfig,
    worker_count: usize,
) -> RunOutcome
where
    F: GeneratorFactory + 'static,
{
    BatchProcessor::new(factory, config, worker_count)
        .process_jobs(ctx, jobs)
        .await
}
