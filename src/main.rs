//! # sitelens CLI
//!
//! Enriches a newline-delimited list of URLs with language, summary, HTTP
//! status and detected platforms, and writes one JSON record per input row.
//!
//! ## Features
//!
//! - Bounded concurrency with per-URL fault isolation
//! - Periodic `intermediate_results_<n>.json` checkpoints
//! - Static, dynamic or render-on-failure fetching
//! - Gemini summaries with an extractive fallback (`--no-model` for offline runs)
//! - Progress bar and `site_analysis.log` file logging

mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rig::providers::gemini;
use sitelens::batch::{BatchConfig, BatchOrchestrator, JsonCheckpointSink};
use sitelens::classifier::{HttpDetector, NoopDetector, TechnologyDetector};
use sitelens::fetcher::{FetchStrategy, FetcherConfig};
use sitelens::model::ratelimited_completion::RateLimitedCompletionModel;
use sitelens::summarizer::{Summarizer, SummarizerConfig};
use tokio::sync::mpsc;
use tracing::{info, instrument};

type GeminiModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Concurrent site analysis for large URL lists", long_about = None)]
struct Cli {
    /// File with one URL per line (blank lines and `#` comments are skipped)
    #[arg(required = true)]
    input: PathBuf,

    /// Where to write the JSON records
    #[arg(short, long, default_value = "analyzed_forms.json")]
    output: PathBuf,

    /// Directory for intermediate results
    #[arg(long, default_value = ".")]
    checkpoint_dir: PathBuf,

    /// Number of URLs analyzed at once
    #[arg(short, long, default_value = "5")]
    concurrency: usize,

    /// Save intermediate results every N completed URLs (0 disables)
    #[arg(long, default_value = "1000")]
    checkpoint_every: usize,

    /// Fetch strategy (static|dynamic|fallback)
    #[arg(short, long, default_value = "static")]
    strategy: FetchStrategy,

    /// Wappalyzer-compatible detector endpoint, queried with `?url=`
    #[arg(short, long)]
    detector: Option<String>,

    /// Deadline for fetching a single URL in seconds
    #[arg(long, default_value = "120")]
    url_timeout: u64,

    /// Directory for site_analysis.log
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Summarize extractively without calling a model
    #[arg(long)]
    no_model: bool,

    /// Use the free-tier Gemini key and quota (GEMINI_FREE_API_KEY)
    #[arg(long)]
    free_tier: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_tracing_subscriber(&cli.log_dir)?;

    analyze(cli).await
}

#[instrument]
async fn analyze(cli: Cli) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let urls = parse_url_list(&content);
    info!("Loaded {} URLs from {}", urls.len(), cli.input.display());

    let summarizer = summarizer(&cli)?;
    let detector: Arc<dyn TechnologyDetector> = match &cli.detector {
        Some(endpoint) => Arc::new(HttpDetector::new(endpoint, Duration::from_secs(30))?),
        None => Arc::new(NoopDetector),
    };

    let config = BatchConfig::builder()
        .concurrency(cli.concurrency)
        .checkpoint_every(cli.checkpoint_every)
        .fetch_strategy(cli.strategy)
        .url_timeout(Duration::from_secs(cli.url_timeout))
        .build();

    let (progress_sender, mut progress_receiver) = mpsc::channel(100);
    let orchestrator = BatchOrchestrator::builder(summarizer)
        .config(config)
        .fetcher_config(FetcherConfig::default())
        .detector(detector)
        .checkpoint_sink(Arc::new(JsonCheckpointSink::new(&cli.checkpoint_dir)))
        .progress(progress_sender)
        .build()?;

    let progress_bar = ProgressBar::new(urls.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Analyzing sites...");

    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(update) = progress_receiver.recv().await {
                progress_bar.set_length(update.total as u64);
                progress_bar.set_position(update.completed as u64);
                progress_bar.set_message(update.url);
            }
        }
    });

    let start_time = std::time::Instant::now();
    let output = orchestrator.run(&urls).await;

    // Dropping the orchestrator closes the progress channel
    drop(orchestrator);
    let _ = progress_handle.await;
    progress_bar.finish_with_message("Analysis completed");

    let rows = output.expand();
    let json = serde_json::to_string_pretty(&rows)?;
    tokio::fs::write(&cli.output, json)
        .await
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    println!(
        "Analyzed {} unique URLs ({} rows, {} failed) in {:.2?}",
        output.records.len(),
        rows.len(),
        output.failures(),
        start_time.elapsed()
    );
    println!("Results saved to {}", cli.output.display());

    Ok(())
}

fn summarizer(cli: &Cli) -> anyhow::Result<Summarizer<GeminiModel>> {
    let config = SummarizerConfig::default();
    if cli.no_model {
        return Ok(Summarizer::extractive_only(config));
    }

    let client = if cli.free_tier {
        sitelens::model::Client::new_gemini_free_from_env()?
    } else {
        sitelens::model::Client::new_gemini_from_env()?
    };
    Ok(Summarizer::new(client.into_completion(), config))
}

/// One URL per non-empty line; `#` starts a comment line
fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_list() {
        let urls = parse_url_list(
            "# forms\nhttps://a.example/contact\n\n  https://b.example  \nhttps://a.example/contact\n",
        );
        assert_eq!(
            urls,
            vec![
                "https://a.example/contact",
                "https://b.example",
                "https://a.example/contact",
            ]
        );
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::parse_from([
            "sitelens",
            "urls.txt",
            "--concurrency",
            "20",
            "--strategy",
            "fallback",
            "--no-model",
        ]);
        assert_eq!(cli.concurrency, 20);
        assert_eq!(cli.strategy, FetchStrategy::StaticThenDynamic);
        assert!(cli.no_model);
        assert_eq!(cli.output, PathBuf::from("analyzed_forms.json"));
    }
}
