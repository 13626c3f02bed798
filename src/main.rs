//! Experiment Server - field-experiment submission intake
//!
//! Accepts sensor/survey submissions over HTTP and, during the configured
//! hours, emails operators a report of how many submissions each beacon
//! made since the previous report.
//!
//! Exit codes:
//!   0 - Clean shutdown
//!   1 - Startup error (arguments, config, mail transport, bind failure)

mod aggregation;
mod cli;
mod config;
mod error;
mod intake;
mod models;
mod notify;
mod report;

use aggregation::{submission_channel, Clock, ReportAggregator, ReportLoop, SystemClock};
use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use notify::SmtpMailer;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config(&args);
    }

    // Initialize logging
    init_logging(&args);

    info!("Experiment Server v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_server(args).await {
        error!("Server failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: write a default config file.
fn handle_init_config(args: &Args) -> Result<()> {
    let path = args.config_file.as_path();

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit the [mail] section before starting the server.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Start the report loop and serve submissions until Ctrl-C.
async fn run_server(args: Args) -> Result<()> {
    // Load configuration
    info!("Loading config from: {}", args.config_file.display());
    let mut config = Config::load(&args.config_file)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let mailer = SmtpMailer::new(&config.mail).context("Invalid mail configuration")?;

    if args.skip_startup_notice {
        warn!("Startup notice skipped; mail delivery is unverified");
    } else {
        notify::send_startup_notice(&mailer, &SystemClock.now())
            .await
            .context("Fatal error while sending the startup notice")?;
    }

    info!(
        "Reports scheduled for hours {:?} to {} recipient(s)",
        config.report.hours,
        config.mail.to.len()
    );

    let (handle, events) = submission_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let aggregator = ReportAggregator::new(config.report.hours.iter().copied(), mailer);
    let report_loop = ReportLoop::new(aggregator, config.report.tick_interval());
    let loop_task = tokio::spawn(report_loop.run(events, shutdown_rx));

    let served = intake::serve(handle, config.server.port, shutdown_signal()).await;

    // Stop the loop whether the server exited cleanly or not.
    let _ = shutdown_tx.send(true);
    if let Err(e) = loop_task.await {
        warn!("Report loop ended abnormally: {}", e);
    }

    served.with_context(|| format!("HTTP server on port {} failed", config.server.port))?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
