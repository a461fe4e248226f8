use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{
    config::GeneratorConfig,
    context::RunContext,
    error::{JobError, LLMError, RunError},
    generator::Generator,
    job::{jobs_from_prompts, Job},
};

use super::{process_jobs, BatchProcessor};

const FAIL_MARKER: &str = "[fail]";

/// Echoes prompts back, failing any prompt containing `FAIL_MARKER`.
struct EchoGenerator {
    delay: Duration,
    calls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, _ctx: &RunContext, prompt: &str) -> Result<String, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if prompt.contains(FAIL_MARKER) {
            return Err(LLMError::ProviderError(format!("rejected: {prompt}")));
        }
        Ok(format!("echo: {prompt}"))
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn release(&self) -> Result<(), LLMError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Counters {
    created: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl Counters {
    fn factory(
        &self,
        delay: Duration,
    ) -> impl Fn(&GeneratorConfig, bool) -> Result<Box<dyn Generator>, LLMError> + Send + Sync
    {
        let counters = self.clone();
        move |_cfg: &GeneratorConfig, _debug: bool| {
            counters.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoGenerator {
                delay,
                calls: Arc::clone(&counters.calls),
                releases: Arc::clone(&counters.releases),
            }) as Box<dyn Generator>)
        }
    }
}

fn failing_factory(
    created: Arc<AtomicUsize>,
) -> impl Fn(&GeneratorConfig, bool) -> Result<Box<dyn Generator>, LLMError> + Send + Sync {
    move |_cfg: &GeneratorConfig, _debug: bool| {
        created.fetch_add(1, Ordering::SeqCst);
        Err(LLMError::AuthError("missing API key".to_string()))
    }
}

fn prompts(n: usize) -> Vec<Job> {
    jobs_from_prompts((1..=n).map(|i| format!("prompt {i}")))
}

#[tokio::test]
async fn all_jobs_succeed() {
    let counters = Counters::default();
    let processor = BatchProcessor::new(
        counters.factory(Duration::ZERO),
        GeneratorConfig::default(),
        3,
    );

    let outcome = processor.process_jobs(&RunContext::new(), prompts(5)).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.results.len(), 5);
    let ids: HashSet<_> = outcome.results.iter().map(|r| r.job.id.clone()).collect();
    assert_eq!(ids.len(), 5, "exactly one result per job");
    for result in &outcome.results {
        assert_eq!(
            result.response(),
            Some(format!("echo: {}", result.job.prompt).as_str())
        );
        assert!((1..=3).contains(&result.worker_id));
    }

    let stats = processor.statistics();
    assert_eq!(stats.total_jobs, 5);
    assert_eq!(stats.completed_jobs, 5);
    assert_eq!(stats.failed_jobs, 0);
    assert_eq!(stats.worker_count, 3);
    assert!(stats.is_finished());
    assert_eq!(counters.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn failing_jobs_do_not_affect_siblings() {
    let counters = Counters::default();
    let jobs = jobs_from_prompts([
        "first".to_string(),
        format!("second {FAIL_MARKER}"),
        "third".to_string(),
        format!("fourth {FAIL_MARKER}"),
    ]);

    let processor = BatchProcessor::new(
        counters.factory(Duration::ZERO),
        GeneratorConfig::default(),
        2,
    );
    let outcome = processor.process_jobs(&RunContext::new(), jobs).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.results.len(), 4);
    for result in &outcome.results {
        match result.job.id.as_str() {
            "job-2" | "job-4" => {
                let err = result.error().expect("failure expected");
                assert!(matches!(err, JobError::Generation(_)));
                assert!(!err.to_string().is_empty());
            }
            _ => {
                assert!(!result.response().unwrap_or_default().is_empty());
            }
        }
    }

    let stats = processor.statistics();
    assert_eq!(stats.completed_jobs, 2);
    assert_eq!(stats.failed_jobs, 2);
}

#[tokio::test]
async fn factory_failure_fails_every_job() {
    let created = Arc::new(AtomicUsize::new(0));
    let processor = BatchProcessor::new(
        failing_factory(Arc::clone(&created)),
        GeneratorConfig::default(),
        2,
    );

    let outcome = processor.process_jobs(&RunContext::new(), prompts(3)).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.results.len(), 3);
    for result in &outcome.results {
        let err = result.error().expect("setup failure");
        assert!(matches!(err, JobError::Setup(_)));
        assert!(err.to_string().starts_with("client setup failed"));
        assert_eq!(result.duration, Duration::ZERO);
    }
    assert_eq!(processor.statistics().failed_jobs, 3);
    assert_eq!(created.load(Ordering::SeqCst), 2, "one attempt per worker, no retry");
}

#[tokio::test]
async fn deadline_cuts_run_short() {
    let counters = Counters::default();
    let ctx = RunContext::with_timeout(Duration::from_millis(100));

    let outcome = process_jobs(
        &ctx,
        prompts(3),
        counters.factory(Duration::from_millis(200)),
        GeneratorConfig::default(),
        1,
    )
    .await;

    assert_eq!(outcome.error, Some(RunError::DeadlineExceeded));
    assert!(outcome.results.len() <= 3);
    for result in &outcome.results {
        assert!(result.error().is_some_and(JobError::is_cancellation));
    }
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn explicit_cancel_is_reported() {
    let counters = Counters::default();
    let ctx = RunContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let outcome = process_jobs(
        &ctx,
        prompts(3),
        counters.factory(Duration::from_millis(200)),
        GeneratorConfig::default(),
        3,
    )
    .await;

    assert_eq!(outcome.error, Some(RunError::Cancelled));
    assert!(outcome.results.len() <= 3);
    assert!(started.elapsed() < Duration::from_millis(190));
    assert_eq!(counters.releases.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cancelled_before_start_yields_no_successes() {
    let counters = Counters::default();
    let ctx = RunContext::new();
    ctx.cancel();

    let processor = BatchProcessor::new(
        counters.factory(Duration::ZERO),
        GeneratorConfig::default(),
        2,
    );
    let outcome = processor.process_jobs(&ctx, prompts(4)).await;

    assert!(outcome.error.is_some());
    assert!(outcome.results.len() <= 4);
    assert!(outcome.results.iter().all(|r| !r.is_success()));
    let stats = processor.statistics();
    assert_eq!(stats.processed(), outcome.results.len());
}

#[tokio::test]
async fn more_workers_finish_sooner() {
    async fn timed(workers: usize) -> Duration {
        let counters = Counters::default();
        let started = Instant::now();
        let outcome = process_jobs(
            &RunContext::new(),
            prompts(10),
            counters.factory(Duration::from_millis(50)),
            GeneratorConfig::default(),
            workers,
        )
        .await;
        assert_eq!(outcome.results.len(), 10);
        started.elapsed()
    }

    let single = timed(1).await;
    let pooled = timed(5).await;
    assert!(
        pooled * 2 < single,
        "5 workers took {pooled:?}, 1 worker took {single:?}"
    );
}

#[tokio::test]
async fn empty_run_starts_no_workers() {
    let counters = Counters::default();
    let processor = BatchProcessor::new(
        counters.factory(Duration::ZERO),
        GeneratorConfig::default(),
        4,
    );

    let outcome = processor.process_jobs(&RunContext::new(), Vec::new()).await;

    assert!(outcome.results.is_empty());
    assert!(outcome.error.is_none());
    assert_eq!(counters.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_generator_is_released_once() {
    let counters = Counters::default();
    let processor = BatchProcessor::new(
        counters.factory(Duration::from_millis(5)),
        GeneratorConfig::default(),
        4,
    );

    processor.process_jobs(&RunContext::new(), prompts(9)).await;

    assert_eq!(counters.created.load(Ordering::SeqCst), 4);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn statistics_add_up() {
    let counters = Counters::default();
    let mut jobs = prompts(6);
    jobs[0].prompt.push_str(FAIL_MARKER);
    let processor = BatchProcessor::new(
        counters.factory(Duration::from_millis(10)),
        GeneratorConfig::default(),
        3,
    );

    let outcome = processor.process_jobs(&RunContext::new(), jobs).await;
    let stats = processor.statistics();

    assert_eq!(stats.completed_jobs + stats.failed_jobs, outcome.results.len());
    let summed: Duration = outcome.results.iter().map(|r| r.duration).sum();
    assert_eq!(stats.total_duration, summed);
    let rebuilt = stats.average_duration * stats.total_jobs as u32;
    let drift = if stats.total_duration > rebuilt {
        stats.total_duration - rebuilt
    } else {
        rebuilt - stats.total_duration
    };
    assert!(drift < Duration::from_micros(10), "drift {drift:?}");
}

#[tokio::test]
async fn statistics_are_readable_mid_run() {
    let counters = Counters::default();
    let processor = Arc::new(BatchProcessor::new(
        counters.factory(Duration::from_millis(30)),
        GeneratorConfig::default(),
        1,
    ));

    let runner = Arc::clone(&processor);
    let handle =
        tokio::spawn(async move { runner.process_jobs(&RunContext::new(), prompts(10)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = processor.statistics();
    assert_eq!(snapshot.total_jobs, 10);
    assert!(!snapshot.is_finished());
    assert!(snapshot.processed() < 10);

    let outcome = handle.await.expect("run task");
    assert_eq!(outcome.results.len(), 10);
    assert!(processor.statistics().is_finished());
}

#[tokio::test]
async fn metadata_survives_the_round_trip() {
    let counters = Counters::default();
    let jobs = vec![Job::new("custom", "hello").with_metadata("lang", serde_json::json!("en"))];

    let outcome = process_jobs(
        &RunContext::new(),
        jobs,
        counters.factory(Duration::ZERO),
        GeneratorConfig::default(),
        1,
    )
    .await;

    let result = &outcome.results[0];
    assert_eq!(result.job.id, "custom");
    assert_eq!(result.job.metadata["lang"], serde_json::json!("en"));
}

/// Panics on prompts equal to `"boom"`, echoes everything else.
struct PanickingGenerator {
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl Generator for PanickingGenerator {
    async fn generate(&self, _ctx: &RunContext, prompt: &str) -> Result<String, LLMError> {
        if prompt == "boom" {
            panic!("generator exploded on {prompt}");
        }
        Ok(format!("echo: {prompt}"))
    }

    fn provider_name(&self) -> &str {
        "panicky"
    }

    async fn release(&self) -> Result<(), LLMError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn generator_panic_is_isolated_to_its_job() {
    let releases = Arc::new(AtomicUsize::new(0));
    let factory_releases = Arc::clone(&releases);
    let factory = move |_cfg: &GeneratorConfig, _debug: bool| {
        Ok(Box::new(PanickingGenerator {
            releases: Arc::clone(&factory_releases),
        }) as Box<dyn Generator>)
    };

    let outcome = process_jobs(
        &RunContext::new(),
        jobs_from_prompts(["a", "boom", "c"]),
        factory,
        GeneratorConfig::default(),
        1,
    )
    .await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.results.len(), 3);
    for result in &outcome.results {
        match result.job.prompt.as_str() {
            "boom" => {
                let err = result.error().expect("panic recorded as failure");
                assert!(matches!(err, JobError::Generation(_)));
                assert!(err.to_string().contains("generator panicked"));
                assert!(err.to_string().contains("exploded"));
            }
            other => assert_eq!(result.response(), Some(format!("echo: {other}").as_str())),
        }
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn factory_panic_becomes_setup_failure() {
    let factory = |_cfg: &GeneratorConfig, _debug: bool| -> Result<Box<dyn Generator>, LLMError> {
        panic!("factory exploded")
    };

    let outcome = process_jobs(
        &RunContext::new(),
        prompts(2),
        factory,
        GeneratorConfig::default(),
        1,
    )
    .await;

    assert_eq!(outcome.results.len(), 2);
    for result in &outcome.results {
        let err = result.error().expect("setup failure");
        assert!(matches!(err, JobError::Setup(msg) if msg.contains("factory exploded")));
    }
}

#[tokio::test]
async fn empty_run_resets_previous_statistics() {
    let counters = Counters::default();
    let processor = BatchProcessor::new(
        counters.factory(Duration::ZERO),
        GeneratorConfig::default(),
        2,
    );

    processor.process_jobs(&RunContext::new(), prompts(3)).await;
    assert_eq!(processor.statistics().completed_jobs, 3);

    processor.process_jobs(&RunContext::new(), Vec::new()).await;
    let stats = processor.statistics();
    assert_eq!(stats.total_jobs, 0);
    assert_eq!(stats.processed(), 0);
    assert_eq!(stats.worker_count, 2);
    assert!(stats.is_finished());
}
