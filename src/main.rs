//! # Contact Scout CLI
//!
//! Command-line interface for the Contact Scout library (`contact_scout`).
//! This binary parses arguments, sets up configuration, connects the
//! WebDriver session, runs the batch processor against the configured sheet,
//! and prints a final run report.

use contact_scout::{
    channel, connect_session, BatchOrchestrator, ConfigBuilder, CsvStore, ProgressEvent, Status,
};

// Dependencies specific to the CLI binary
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Extracts contact details for a list of email addresses from a webmail directory.",
    long_about = "Contact Scout reads pending addresses from a spreadsheet, resolves each one \
                  through the webmail compose surface and contact cards, and writes the \
                  extracted details back row by row."
)]
struct AppArgs {
    /// Path to a configuration file (TOML format). CLI args override file settings.
    #[arg(long, env = "CONTACT_SCOUT_CONFIG")]
    config_file: Option<String>,

    /// Path to the CSV sheet with the addresses to process.
    #[arg(short, long, env = "CONTACT_SCOUT_SHEET")]
    sheet: Option<String>,

    /// Path to the saved session storage-state JSON.
    #[arg(long, env = "CONTACT_SCOUT_SESSION")]
    session: Option<String>,

    /// URL of the webmail page to drive.
    #[arg(long, env = "CONTACT_SCOUT_PAGE_URL")]
    page_url: Option<String>,

    /// URL of the running WebDriver instance.
    #[arg(long, env = "CONTACT_SCOUT_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Run the browser headless.
    #[arg(long, action = clap::ArgAction::SetTrue, env = "CONTACT_SCOUT_HEADLESS")]
    headless: Option<bool>,

    /// First sheet row to consider (1-based).
    #[arg(long, env = "CONTACT_SCOUT_START_ROW")]
    start_row: Option<u32>,

    /// Number of addresses resolved per compose pass.
    #[arg(short, long, env = "CONTACT_SCOUT_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Directory for failure screenshots; disabled when unset.
    #[arg(long, env = "CONTACT_SCOUT_SCREENSHOT_DIR")]
    screenshot_dir: Option<String>,

    /// Keep one user agent for the whole run instead of rotating.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pin_identity: Option<bool>,

    /// Validate session, sheet and WebDriver connectivity, then exit.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    check: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!(
        "Contact Scout CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(ref sheet) = args.sheet {
        config_builder = config_builder.sheet_file(sheet);
    }
    if let Some(ref session) = args.session {
        config_builder = config_builder.session_file(session);
    }
    if let Some(ref url) = args.page_url {
        config_builder = config_builder.page_url(url);
    }
    if let Some(ref url) = args.webdriver_url {
        config_builder = config_builder.webdriver_url(url);
    }
    if args.headless == Some(true) {
        config_builder = config_builder.headless(true);
    }
    if let Some(row) = args.start_row {
        config_builder = config_builder.start_row(row);
    }
    if let Some(size) = args.batch_size {
        config_builder = config_builder.batch_size(size);
    }
    if let Some(ref dir) = args.screenshot_dir {
        config_builder = config_builder.screenshot_dir(Some(dir));
    }
    if args.pin_identity == Some(true) {
        config_builder = config_builder.rotate_identity(false);
    }

    let config = config_builder
        .build()
        .context("Failed to build configuration")?;
    tracing::debug!("Effective configuration loaded: {:?}", config);

    let mut store = CsvStore::open(&config)
        .with_context(|| format!("Failed to open sheet '{}'", config.sheet_file.display()))?;

    let session = connect_session(&config)
        .await
        .context("Failed to establish WebDriver session")?;

    let (sender, mut receiver) = channel();
    let orchestrator = BatchOrchestrator::new(config, session).with_events(sender);

    let report = orchestrator.validate_setup(&mut store);
    if let Some(ref detail) = report.session_detail {
        tracing::error!("Session check failed: {}", detail);
    }
    if let Some(ref detail) = report.store_detail {
        tracing::error!("Sheet check failed: {}", detail);
    }
    tracing::info!("Pending records: {}", report.pending_records);

    if args.check == Some(true) {
        println!("Session:  {}", if report.session_ok { "ok" } else { "INVALID" });
        println!("Sheet:    {}", if report.store_ok { "ok" } else { "UNREADABLE" });
        println!("Pending:  {}", report.pending_records);
        orchestrator.into_driver().close().await;
        return if report.is_ready() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Preflight check failed"))
        };
    }
    if !report.is_ready() {
        orchestrator.into_driver().close().await;
        return Err(anyhow::anyhow!("Preflight check failed; not starting"));
    }

    // Ctrl-C requests a graceful stop: the record in flight finishes and its
    // result is written before the run winds down.
    let stop = orchestrator.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Stop requested; finishing the current record...");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let bar = ProgressBar::new(report.pending_records as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .context("Invalid progress bar template")?
        .progress_chars("=> "),
    );

    let reporter = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                ProgressEvent::BatchStarted {
                    batch_number,
                    total_batches,
                    size,
                } => {
                    bar.println(format!(
                        "Batch {}/{} ({} records)",
                        batch_number, total_batches, size
                    ));
                }
                ProgressEvent::RecordProcessed { email, status } => {
                    let marker = match status {
                        Status::Success => "ok",
                        Status::NotFound => "not found",
                        _ => "error",
                    };
                    bar.set_message(format!("{} [{}]", email, marker));
                    bar.inc(1);
                }
                ProgressEvent::Log(message) => bar.println(message),
                ProgressEvent::RunCompleted(_) => {
                    bar.finish_with_message("done");
                    break;
                }
                ProgressEvent::RunFailed(message) => {
                    bar.abandon_with_message(message);
                    break;
                }
            }
        }
    });

    let started = Instant::now();
    let outcome = orchestrator.run(&mut store).await;
    // Dropping the orchestrator also drops the event sender, so the reporter
    // task always terminates even when the run bailed out early.
    orchestrator.into_driver().close().await;
    let _ = reporter.await;

    match outcome {
        Ok(stats) => {
            println!();
            println!("================ Run report ================");
            println!("Batches:     {}", stats.total_batches);
            println!("Processed:   {}", stats.total_emails);
            println!("Found:       {}", stats.successful);
            println!("Not found:   {}", stats.not_found);
            println!("Errors:      {}", stats.errors);
            println!("Duration:    {:.1}s", stats.duration_seconds);
            println!("============================================");
            tracing::info!(
                "Processing finished successfully. Total duration: {:.2?}",
                started.elapsed()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Execution failed: {}", e);
            Err(anyhow::anyhow!("Run failed: {}", e))
        }
    }
}
