use anyhow::{Context, Result};
use clap::Parser;
use evexport::{
    init_tracing_once, init_tracing_with_file, log_file_path, Clock, Credentials, DataExporter, RunConfig,
    SystemClock, DEFAULT_CONFIG_PATH, DEFAULT_CREDENTIALS_PATH,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Export every analytics event in a day window to per-event CSV files.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Exporter configuration document (JSON).
    #[arg(long, env = "EVEXPORT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// API key/secret document (JSON).
    #[arg(long, env = "EVEXPORT_CREDENTIALS", default_value = DEFAULT_CREDENTIALS_PATH)]
    credentials: PathBuf,

    /// Override "From Days Ago".
    #[arg(long)]
    from_days_ago: Option<u32>,

    /// Override "To Days Ago".
    #[arg(long)]
    to_days_ago: Option<u32>,

    /// Number of events exported in parallel.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Show an event-count progress bar.
    #[arg(long)]
    progress: bool,

    /// Log to the console only.
    #[arg(long)]
    no_log_file: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let clock = SystemClock;

    let mut config = RunConfig::load(&args.config).context("loading exporter configuration")?;
    if let Some(days) = args.from_days_ago {
        config = config.with_from_days_ago(days);
    }
    if let Some(days) = args.to_days_ago {
        config = config.with_to_days_ago(days);
    }
    if let Some(n) = args.concurrency {
        config = config.with_concurrency(n);
    }
    if args.progress {
        config = config.with_progress(true);
    }
    config.validate().context("validating command-line overrides")?;
    let credentials = Credentials::load(&args.credentials).context("loading API credentials")?;

    if args.no_log_file {
        init_tracing_once();
    } else {
        let log_path = log_file_path(&config.output_root, clock.today());
        init_tracing_with_file(&log_path).with_context(|| format!("opening log file {}", log_path.display()))?;
    }

    tracing::info!(
        config = %args.config.display(),
        credentials = %args.credentials.display(),
        "loaded configuration"
    );

    let exporter = DataExporter::connect(config, credentials, Arc::new(clock)).context("building HTTP transport")?;
    let summary = exporter.run()?;

    for report in summary.events.iter() {
        tracing::debug!(event = %report.event, outcome = ?report.outcome, "event outcome");
    }
    Ok(())
}
