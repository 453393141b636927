//! # Fresh News
//!
//! An interactive news research tool: it searches the Reuters content API
//! for a phrase within a date range, enriches every hit with text metrics,
//! saves the results as a spreadsheet, and then lets the user question an
//! AI assistant about the collected articles.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... fresh_news -o ./output
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Filters**: Phrase, date range and image width are asked for interactively
//! 2. **Fetching**: Result pages are requested one after another until the
//!    provider's reported total has been retrieved
//! 3. **Enrichment**: Each article gets a phrase count and a money flag
//! 4. **Output**: A spreadsheet (plus optional JSON copy) is written
//! 5. **Conversation**: The user asks the assistant about the articles

use clap::Parser;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod api;
mod cli;
mod config;
mod dialog;
mod error;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod utils;

use api::chat_with_backoff;
use cli::Cli;
use config::AppConfig;
use dialog::TerminalDialog;
use fetcher::ArticleFetcher;
use outputs::xlsx::SpreadsheetReport;
use pipeline::{Pipeline, RunOutcome};
use utils::ensure_writable_dir;

const LOG_FILE_NAME: &str = "output.log";

/// Warnings and errors go to stderr; the log file gets everything `RUST_LOG`
/// allows (default `info`).
fn init_tracing(log_path: &Path) -> Result<(), Box<dyn Error>> {
    let log_file = OpenOptions::new().create(true).append(true).open(log_path)?;
    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tfmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(UtcTime::rfc_3339())
                .with_filter(LevelFilter::WARN),
        )
        .with(
            tfmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(UtcTime::rfc_3339())
                .with_filter(file_filter),
        )
        .try_init()?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Cli::parse();

    // The log lives in the output directory, so it has to exist first.
    ensure_writable_dir(&args.output_dir).await?;
    init_tracing(&Path::new(&args.output_dir).join(LOG_FILE_NAME))?;

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), output_dir = %args.output_dir, "fresh_news starting up");

    let mut config = AppConfig::load(args.config.as_deref().map(Path::new)).await?;
    config.assistant.api_key = args.openai_api_key.clone();

    let fetcher = ArticleFetcher::new(config.provider.clone())?;
    let backend = chat_with_backoff(&config.assistant);
    let report = SpreadsheetReport::new(&args.output_dir, config.json_copy);

    let mut pipeline = Pipeline::new(
        &fetcher,
        TerminalDialog::default(),
        report,
        backend.as_ref(),
        config.assistant.system_prompt.as_str(),
    );
    let outcome = pipeline.run().await;

    let elapsed = start_time.elapsed();
    info!(stages = ?pipeline.stages(), "Run finished");
    match outcome {
        RunOutcome::Completed {
            rows_written,
            exchanges,
        } => {
            info!(?elapsed, rows_written, exchanges, "Execution complete");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failed { reason } => {
            error!(?elapsed, %reason, "Execution failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
