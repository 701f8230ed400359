//! guardplot
//!
//! Turns a rate-limiter load-test log into delay charts, a CSV table and an
//! HTML report.
//!
//! ```bash
//! # Analyse ./testloop.out.json, writing artefacts next to it
//! guardplot
//!
//! # Analyse a specific log into another directory
//! guardplot runs/burst.json --output-dir reports/
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG` unless `--log-level` is given.
//! The process exits with status 1 when the run is aborted, for example when
//! the log's issue timestamps contradict its sequence numbers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use guardplot_core::config::{DEFAULT_HTML_ROW_LIMIT, DEFAULT_INPUT_FILE};
use guardplot_core::report::io::{write_charts, write_csv, write_html, write_json};
use guardplot_core::{assemble_report, read_log, GuardplotError, ReportConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "guardplot", version)]
#[command(about = "Delay and throughput report for rate-limiter load-test logs", long_about = None)]
struct Args {
    /// Load-test log to analyse
    #[arg(default_value = DEFAULT_INPUT_FILE)]
    input: PathBuf,

    /// Directory for generated artefacts (default: next to the input)
    #[arg(short, long, env = "GUARDPLOT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `guardplot_core=trace` (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Skip the CSV transaction table
    #[arg(long)]
    no_csv: bool,

    /// Skip the HTML report
    #[arg(long)]
    no_html: bool,

    /// Skip the SVG charts
    #[arg(long)]
    no_charts: bool,

    /// Skip the JSON report
    #[arg(long)]
    no_json: bool,

    /// Maximum transaction rows shown in the HTML report
    #[arg(long, default_value_t = DEFAULT_HTML_ROW_LIMIT)]
    html_rows: usize,
}

impl Args {
    fn report_config(&self) -> ReportConfig {
        ReportConfig {
            output_dir: self.output_dir.clone(),
            write_csv: !self.no_csv,
            write_html: !self.no_html,
            write_charts: !self.no_charts,
            write_json: !self.no_json,
            html_row_limit: self.html_rows,
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("guardplot: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = args.report_config();

    let doc = read_log(&args.input)
        .await
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    tracing::info!(
        shape = %doc.shape,
        transactions = doc.len(),
        "loaded {}",
        args.input.display()
    );

    let report = assemble_report(&doc, &args.input.to_string_lossy())
        .context("report generation aborted")?;

    for view in report.views() {
        println!(
            "{:<16} n={:<6} mean={:>10.2}ms  ratio={:.2}",
            view.label, view.summary.count, view.summary.mean_ms, view.summary.ratio
        );
    }
    for skipped in &report.skipped {
        println!("{:<16} skipped: {}", skipped.label, skipped.reason);
    }

    let dir = config.output_dir_for(&args.input);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    if config.write_charts {
        let charts = write_charts(&report, &dir).await?;
        tracing::info!(count = charts.len(), "wrote charts");
    }
    if config.write_json {
        let path = write_json(&report, &dir).await?;
        tracing::info!("wrote {}", path.display());
    }
    if config.write_html {
        let path = write_html(&report, &config, &dir).await?;
        tracing::info!("wrote {}", path.display());
    }
    if config.write_csv {
        // A row without a required column fails this export only.
        match write_csv(&report, &dir).await {
            Ok(path) => tracing::info!("wrote {}", path.display()),
            Err(err @ GuardplotError::MissingField { .. }) => {
                tracing::error!("CSV export failed: {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_analyse_conventional_file() {
        let args = Args::parse_from(["guardplot"]);
        assert_eq!(args.input, PathBuf::from(DEFAULT_INPUT_FILE));
        assert_eq!(args.report_config(), ReportConfig::default());
    }

    #[test]
    fn flags_map_onto_report_config() {
        let args = Args::parse_from([
            "guardplot",
            "run.json",
            "--output-dir",
            "out",
            "--no-csv",
            "--no-charts",
            "--html-rows",
            "10",
        ]);
        let config = args.report_config();
        assert_eq!(args.input, PathBuf::from("run.json"));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(!config.write_csv);
        assert!(!config.write_charts);
        assert!(config.write_html);
        assert!(config.write_json);
        assert_eq!(config.html_row_limit, 10);
    }
}
