use std::fmt::Write;
use std::time::Duration;

use llm_batch::{JobResult, Statistics};

const RESPONSE_PREVIEW: usize = 100;

/// Human-readable summary followed by one entry per result, sorted by job id.
pub fn generate_report(results: &[JobResult], stats: &Statistics) -> String {
    let mut report = String::new();
    let _ = write_report(&mut report, results, stats);
    report
}

fn write_report(out: &mut String, results: &[JobResult], stats: &Statistics) -> std::fmt::Result {
    writeln!(out, "BATCH PROCESSING REPORT")?;
    writeln!(out, "=======================")?;
    writeln!(out)?;

    writeln!(out, "Summary:")?;
    writeln!(out, "--------")?;
    writeln!(out, "Total jobs: {}", stats.total_jobs)?;
    writeln!(out, "Completed: {}", stats.completed_jobs)?;
    writeln!(out, "Failed: {}", stats.failed_jobs)?;
    writeln!(out, "Success rate: {:.1}%", stats.success_rate())?;
    writeln!(out, "Workers: {}", stats.worker_count)?;
    writeln!(out)?;

    writeln!(out, "Performance:")?;
    writeln!(out, "------------")?;
    writeln!(out, "Total duration: {:?}", round_ms(stats.total_duration))?;
    writeln!(out, "Average per job: {:?}", round_ms(stats.average_duration))?;
    if let Some(wall) = stats.wall_time() {
        writeln!(out, "Wall clock time: {:?}", round_ms(wall))?;
    }
    if let Some(throughput) = stats.throughput() {
        writeln!(out, "Throughput: {throughput:.2} jobs/second")?;
    }
    writeln!(out)?;

    writeln!(out, "Individual Results:")?;
    writeln!(out, "-------------------")?;
    let mut sorted: Vec<&JobResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.job.id.cmp(&b.job.id));
    for result in sorted {
        match &result.outcome {
            Ok(response) => {
                writeln!(
                    out,
                    "✓ {}: {}ms (worker {})",
                    result.job.id,
                    result.duration.as_millis(),
                    result.worker_id
                )?;
                writeln!(out, "  Response: {}", preview(response))?;
            }
            Err(err) => {
                writeln!(
                    out,
                    "✗ {}: FAILED (worker {})",
                    result.job.id, result.worker_id
                )?;
                writeln!(out, "  Error: {err}")?;
            }
        }
    }
    Ok(())
}

fn round_ms(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

fn preview(response: &str) -> String {
    let flat = response.replace('\n', " ");
    if flat.chars().count() <= RESPONSE_PREVIEW {
        return flat;
    }
    let head: String = flat.chars().take(RESPONSE_PREVIEW - 3).collect();
    format!("{head}...")
}
