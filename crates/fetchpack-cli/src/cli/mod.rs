//! CLI for fetchpack.

mod report;

use anyhow::Result;
use clap::Parser;
use fetchpack_core::batch::{run_batch, BatchPlan};
use fetchpack_core::config::{self, FetchpackConfig};
use fetchpack_core::control::CancelToken;
use fetchpack_core::fetch::CurlFetcher;
use fetchpack_core::source::ListSource;
use std::path::PathBuf;

/// Download every archive in a URL list and extract each one.
#[derive(Debug, Parser)]
#[command(name = "fetchpack")]
#[command(about = "Download and extract every archive named in a URL list", long_about = None)]
pub struct Cli {
    /// URL (http:// or https://) or local path of the newline-delimited URL list.
    #[arg(short, long)]
    pub source: String,

    /// Root directory for `savedFiles/` and `extractedFiles/`.
    #[arg(short, long)]
    pub destination: PathBuf,

    /// 0-based index of the first list entry to process.
    #[arg(short, long, default_value_t = 0)]
    pub pointer: usize,

    /// Process up to N items concurrently (default from config, normally 1).
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Use this config file instead of `~/.config/fetchpack/config.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// How a run that did not hit a fatal error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Ctrl-C stopped the batch before every item was handled.
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::Interrupted => 130,
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<FetchpackConfig> {
        match &self.config {
            Some(path) => config::load_from(path),
            None => config::load_or_init(),
        }
    }

    /// Builds the batch plan; `--jobs` overrides the configured job count.
    pub fn plan(&self, cfg: &FetchpackConfig) -> BatchPlan {
        BatchPlan::new(ListSource::parse(&self.source), &self.destination)
            .with_start_pointer(self.pointer)
            .with_jobs(self.jobs.unwrap_or(cfg.jobs).max(1))
    }

    pub async fn run(self) -> Result<RunStatus> {
        let cfg = self.load_config()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let plan = self.plan(&cfg);
        let fetcher = CurlFetcher::new(cfg.http.clone());

        let cancel = CancelToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Interrupted: finishing items in progress, starting no new ones.");
                    tracing::warn!("interrupt received, cancelling batch");
                    cancel.cancel();
                }
            })
        };

        let (tx, rx) = std::sync::mpsc::channel();
        let printer = std::thread::spawn(move || report::print_events(rx));

        let result =
            tokio::task::spawn_blocking(move || run_batch(&fetcher, &plan, &cancel, Some(&tx)))
                .await
                .map_err(|e| anyhow::anyhow!("batch task join: {}", e))?;
        let _ = printer.join();
        interrupt.abort();

        let summary = result?;
        println!(
            "Processing completed. {} files processed.",
            summary.processed()
        );
        tracing::info!(
            processed = summary.processed(),
            failed = summary.failed(),
            "run completed"
        );

        if summary.was_cancelled() {
            eprintln!(
                "{} item(s) were not processed because the run was interrupted.",
                summary.cancelled()
            );
            return Ok(RunStatus::Interrupted);
        }
        Ok(RunStatus::Completed)
    }
}
