//! Concurrent batch processing of LLM generation jobs.
//!
//! A run takes an ordered list of [`Job`]s, feeds them to a fixed pool of
//! workers, and collects one [`JobResult`] per dispatched job. Every worker
//! owns a single [`Generator`] built by the injected [`GeneratorFactory`], so
//! a failing prompt or a failing client only ever affects its own results.
//!
//! ```no_run
//! use llm_batch::{jobs_from_prompts, BatchProcessor, GeneratorConfig, ProviderFactory, RunContext};
//!
//! # async fn demo() {
//! let processor = BatchProcessor::new(ProviderFactory, GeneratorConfig::default(), 3);
//! let jobs = jobs_from_prompts(["What is Rust?", "Explain borrowing."]);
//! let outcome = processor.process_jobs(&RunContext::new(), jobs).await;
//! for result in &outcome.results {
//!     println!("{}: {:?}", result.job.id, result.response());
//! }
//! println!("{:?}", processor.statistics());
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod job;
pub mod processor;
pub mod stats;

pub use backends::ProviderFactory;
pub use config::{GeneratorConfig, ProviderConfig};
pub use context::RunContext;
pub use error::{ConfigError, JobError, JobSourceError, LLMError, RunError};
pub use generator::{Generator, GeneratorFactory};
pub use job::{jobs_from_file, jobs_from_prompts, jobs_from_reader, Job, JobResult};
pub use processor::{process_jobs, BatchProcessor, RunOutcome};
pub use stats::Statistics;
