use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "llm-batch",
    about = "Run a batch of prompts through an LLM provider with concurrent workers"
)]
pub struct CliArgs {
    /// Prompts to process; ignored when --input is given
    pub prompts: Vec<String>,
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Overrides `default_provider` from the config file (ollama, groq or gemini)
    #[arg(long, short = 'p')]
    pub provider: Option<String>,
    #[arg(long, short = 'm')]
    pub model: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long, short = 'w', default_value_t = 3)]
    pub workers: usize,
    /// Per-request timeout in seconds; the whole run gets ten seconds more
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
    /// File with one prompt per line, `#` starts a comment
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
    /// Write results as JSON
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Write the text report to a file instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,
    #[arg(long)]
    pub debug: bool,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub progress: bool,
}
