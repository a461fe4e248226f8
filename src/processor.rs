#[path = "processor/worker.rs"]
mod worker;

#[path = "processor/dispatcher.rs"]
mod dispatcher;

#[path = "processor/collector.rs"]
mod collector;

#[path = "processor/engine.rs"]
mod engine;

#[cfg(test)]
#[path = "processor/tests.rs"]
mod tests;

pub use engine::{process_jobs, BatchProcessor, RunOutcome};
