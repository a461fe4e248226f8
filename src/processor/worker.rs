use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};

use crate::{
    config::GeneratorConfig,
    context::RunContext,
    error::{JobError, LLMError},
    generator::{Generator, GeneratorFactory},
    job::{Job, JobResult},
};

/// Intake side shared by every worker of a run.
pub(super) type SharedIntake = Arc<Mutex<mpsc::Receiver<Job>>>;

/// One concurrent execution unit; owns a single generator for its lifetime.
pub(super) struct Worker {
    pub(super) id: usize,
    pub(super) ctx: RunContext,
    pub(super) intake: SharedIntake,
    pub(super) results: mpsc::Sender<JobResult>,
}

impl Worker {
    pub(super) async fn run(
        self,
        factory: Arc<dyn GeneratorFactory>,
        config: Arc<GeneratorConfig>,
        debug: bool,
    ) {
        let created = panic::catch_unwind(AssertUnwindSafe(|| factory.create(&config, debug)))
            .unwrap_or_else(|payload| {
                Err(LLMError::Generic(format!(
                    "generator factory panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        let generator = match created {
            Ok(generator) => generator,
            Err(err) => {
                log::warn!("worker {}: failed to create generator: {err}", self.id);
                self.fail_remaining(err.to_string()).await;
                return;
            }
        };

        // `execute` never unwinds, so this release is reached on every exit path.
        let handled = self.process(generator.as_ref()).await;
        log::debug!(
            "worker {} exiting after {handled} jobs ({})",
            self.id,
            generator.provider_name()
        );
        match AssertUnwindSafe(generator.release()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("worker {}: failed to release generator: {err}", self.id),
            Err(payload) => log::warn!(
                "worker {}: generator release panicked: {}",
                self.id,
                panic_message(payload.as_ref())
            ),
        }
    }

    /// Takes the next job, or `None` once the intake is closed or the run is done.
    async fn next_job(&self) -> Option<Job> {
        if self.ctx.is_done() {
            return None;
        }
        self.ctx
            .run_until_done(async { self.intake.lock().await.recv().await })
            .await
            .ok()
            .flatten()
    }

    /// Answers every job this worker receives with a setup failure.
    async fn fail_remaining(&self, reason: String) {
        while let Some(job) = self.next_job().await {
            let result = JobResult {
                job,
                outcome: Err(JobError::Setup(reason.clone())),
                duration: Duration::ZERO,
                worker_id: self.id,
            };
            self.emit(result).await;
        }
    }

    async fn process(&self, generator: &dyn Generator) -> usize {
        let mut handled = 0;
        while let Some(job) = self.next_job().await {
            let result = self.execute(generator, job).await;
            self.emit(result).await;
            handled += 1;
        }
        handled
    }

    async fn execute(&self, generator: &dyn Generator, job: Job) -> JobResult {
        log::debug!("worker {} starting {}", self.id, job.id);
        let start = Instant::now();
        let call = AssertUnwindSafe(generator.generate(&self.ctx, &job.prompt)).catch_unwind();
        let outcome = match self.ctx.run_until_done(call).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(err))) => Err(self.classify(err)),
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                log::error!("worker {}: generator panicked on {}: {message}", self.id, job.id);
                Err(JobError::Generation(format!("generator panicked: {message}")))
            }
            Err(cause) => Err(JobError::Cancelled {
                cause,
                message: "generation abandoned while in flight".to_string(),
            }),
        };
        let duration = start.elapsed();
        JobResult {
            job,
            outcome,
            duration,
            worker_id: self.id,
        }
    }

    fn classify(&self, err: LLMError) -> JobError {
        match (err, self.ctx.err()) {
            (LLMError::Cancelled(cause), _) => JobError::Cancelled {
                cause,
                message: LLMError::Cancelled(cause).to_string(),
            },
            (err, Some(cause)) => JobError::Cancelled {
                cause,
                message: err.to_string(),
            },
            (err, None) => JobError::Generation(err.to_string()),
        }
    }

    async fn emit(&self, result: JobResult) {
        if self.results.send(result).await.is_err() {
            log::warn!("worker {}: result collector is gone", self.id);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
