use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use llm_batch::JobResult;

#[derive(Serialize)]
struct ResultRecord<'a> {
    id: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    success: bool,
    duration_ms: u128,
    worker: usize,
}

impl<'a> From<&'a JobResult> for ResultRecord<'a> {
    fn from(result: &'a JobResult) -> Self {
        Self {
            id: &result.job.id,
            prompt: &result.job.prompt,
            response: result.response(),
            error: result.error().map(ToString::to_string),
            success: result.is_success(),
            duration_ms: result.duration.as_millis(),
            worker: result.worker_id,
        }
    }
}

pub fn save_results(results: &[JobResult], path: &Path) -> anyhow::Result<()> {
    let records: Vec<ResultRecord> = results.iter().map(ResultRecord::from).collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}
