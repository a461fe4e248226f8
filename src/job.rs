//! Jobs, their results, and the helpers that build job lists from raw text.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JobError, JobSourceError};

/// One unit of generation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique within a run; used to correlate results.
    pub id: String,
    /// Text handed to the generator.
    pub prompt: String,
    /// Caller data carried through untouched.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Job {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Terminal outcome of one job.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// The job this result answers; ownership returns to the caller here.
    pub job: Job,
    /// Generated text, or the classified failure.
    pub outcome: Result<String, JobError>,
    /// Wall-clock time of the single generator call. Zero for setup failures.
    pub duration: Duration,
    /// 1-based id of the worker that produced this result.
    pub worker_id: usize,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn response(&self) -> Option<&str> {
        self.outcome.as_ref().ok().map(String::as_str)
    }

    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }
}

/// Builds jobs with ids `job-1`, `job-2`, ... in prompt order.
pub fn jobs_from_prompts<I, S>(prompts: I) -> Vec<Job>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    prompts
        .into_iter()
        .enumerate()
        .map(|(idx, prompt)| Job::new(format!("job-{}", idx + 1), prompt))
        .collect()
}

/// Reads one prompt per line, skipping blank lines and `#` comments.
///
/// Any read error discards the lines gathered so far.
pub fn jobs_from_reader<R: BufRead>(reader: R) -> Result<Vec<Job>, JobSourceError> {
    let mut prompts = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        prompts.push(trimmed.to_string());
    }
    Ok(jobs_from_prompts(prompts))
}

pub fn jobs_from_file(path: impl AsRef<Path>) -> Result<Vec<Job>, JobSourceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| JobSourceError::Open {
        path: path.display().to_string(),
        source,
    })?;
    jobs_from_reader(BufReader::new(file))
}
