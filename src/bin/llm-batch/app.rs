use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use llm_batch::{
    jobs_from_file, jobs_from_prompts, BatchProcessor, GeneratorConfig, Job, ProviderFactory,
    RunContext, RunError, Statistics,
};

use crate::args::CliArgs;
use crate::logging::init_logging;
use crate::output::save_results;
use crate::report::generate_report;

const RUN_DEADLINE_SLACK: Duration = Duration::from_secs(10);

const SAMPLE_PROMPTS: [&str; 5] = [
    "What is artificial intelligence?",
    "Explain quantum computing in simple terms.",
    "What are the benefits of renewable energy?",
    "How does machine learning work?",
    "What is the future of space exploration?",
];

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.debug);

    let config = build_config(&args)?;
    let jobs = load_jobs(&args)?;
    if jobs.is_empty() {
        bail!("no jobs to process");
    }
    let total = jobs.len();

    let processor = BatchProcessor::new(ProviderFactory, config.clone(), args.workers)
        .debug(args.debug);
    println!(
        "Processing {total} jobs with {} workers using {} provider...",
        processor.worker_count(),
        config.default_provider
    );

    let ctx =
        RunContext::with_timeout(Duration::from_secs(args.timeout).saturating_add(RUN_DEADLINE_SLACK));
    let interrupt = spawn_interrupt_handler(ctx.clone());
    let progress = args
        .progress
        .then(|| spawn_progress(processor.subscribe(), total));

    let started = Instant::now();
    let outcome = processor.process_jobs(&ctx, jobs).await;
    let elapsed = started.elapsed();

    interrupt.abort();
    if let Some(progress) = progress {
        progress.abort();
        println!("\rProgress: {}/{total} jobs completed", outcome.results.len());
    }

    match outcome.error {
        None => {}
        Some(RunError::DeadlineExceeded) => {
            eprintln!("Warning: run deadline exceeded, results are partial");
        }
        Some(err) => bail!("batch processing failed: {err}"),
    }

    let stats = processor.statistics();
    println!(
        "\nBatch processing completed in {:?}",
        Duration::from_millis(elapsed.as_millis() as u64)
    );
    println!(
        "Completed: {}/{} jobs ({:.1}% success rate)",
        stats.completed_jobs,
        stats.total_jobs,
        stats.success_rate()
    );
    if stats.failed_jobs > 0 {
        println!("Failed: {} jobs", stats.failed_jobs);
    }

    if let Some(path) = &args.output {
        match save_results(&outcome.results, path) {
            Ok(()) => println!("Results saved to: {}", path.display()),
            Err(err) => eprintln!("Warning: failed to save results to {}: {err}", path.display()),
        }
    }

    let report = generate_report(&outcome.results, &stats);
    match &args.report {
        Some(path) => match std::fs::write(path, &report) {
            Ok(()) => println!("Report saved to: {}", path.display()),
            Err(err) => eprintln!("Warning: failed to save report to {}: {err}", path.display()),
        },
        None => println!("\n{report}"),
    }
    Ok(())
}

fn build_config(args: &CliArgs) -> anyhow::Result<GeneratorConfig> {
    let mut config =
        GeneratorConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    if let Some(provider) = &args.provider {
        config.default_provider = provider.clone();
    }
    let section = config
        .llms
        .entry(config.default_provider.clone())
        .or_default();
    if let Some(model) = &args.model {
        section.model = Some(model.clone());
    }
    if let Some(base_url) = &args.base_url {
        section.base_url = Some(base_url.clone());
    }
    config.request_timeout_seconds = i64::try_from(args.timeout).unwrap_or(i64::MAX);
    config.validate()?;

    if args.debug {
        log::debug!(
            "provider={} workers={} timeout={}s",
            config.default_provider,
            args.workers,
            args.timeout
        );
    }
    Ok(config)
}

/// Environment variables layered over the config file, per provider section.
const ENV_OVERRIDES: [(&str, &str, &str); 6] = [
    ("ollama", "OLLAMA_BASE_URL", "base_url"),
    ("ollama", "OLLAMA_MODEL", "model"),
    ("groq", "GROQ_API_KEY", "api_key"),
    ("groq", "GROQ_MODEL", "model"),
    ("gemini", "GEMINI_API_KEY", "api_key"),
    ("gemini", "GEMINI_MODEL", "model"),
];

fn apply_env_overrides<F>(config: &mut GeneratorConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (provider, var, field) in ENV_OVERRIDES {
        let Some(value) = lookup(var).filter(|v| !v.is_empty()) else {
            continue;
        };
        let section = config.llms.entry(provider.to_string()).or_default();
        let slot = match field {
            "base_url" => &mut section.base_url,
            "api_key" => &mut section.api_key,
            _ => &mut section.model,
        };
        *slot = Some(value);
    }
}

fn load_jobs(args: &CliArgs) -> anyhow::Result<Vec<Job>> {
    if let Some(path) = &args.input {
        return jobs_from_file(path).context("failed to load jobs from file");
    }
    if !args.prompts.is_empty() {
        return Ok(jobs_from_prompts(args.prompts.iter().cloned()));
    }
    Ok(jobs_from_prompts(SAMPLE_PROMPTS))
}

fn spawn_interrupt_handler(ctx: RunContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, cancelling run");
            ctx.cancel();
        }
    })
}

fn spawn_progress(mut stats: watch::Receiver<Statistics>, total: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let done = stats.borrow_and_update().processed();
            let percent = done as f64 / total as f64 * 100.0;
            print!("\rProgress: {done}/{total} jobs completed ({percent:.1}%)");
            let _ = std::io::stdout().flush();
        }
    })
}
