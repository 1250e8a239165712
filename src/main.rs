//! CLI entry point for the flight report tool.
//!
//! Provides subcommands for building the semester average-price report and
//! for exporting the consolidated flight/passenger/airline table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flight_report::{
    config::ReportConfig,
    output::{pivot_json, render_text, write_consolidated_csv, write_pivot_csv},
    pipeline::{consolidate, load_sources, semester_report},
};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "flight_report")]
#[command(about = "Consolidates passenger and flight records into a semester price report", long_about = None)]
struct Cli {
    /// JSON config naming the source files
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the source CSVs (overrides the config)
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the semester average-price pivot
    Report {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// File to write to instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the consolidated table as CSV
    Consolidate {
        /// File to write to instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/flight_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("flight_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    config.validate()?;

    info!(data_dir = %config.data_dir.display(), "Loading sources");
    let sources = load_sources(&config)?;
    let consolidation = consolidate(&sources, &config)?;

    if !consolidation.conflicting_keys.is_empty() {
        info!(
            keys = ?consolidation.conflicting_keys,
            "Conflicting passenger duplicates resolved by keeping the first record"
        );
    }

    match cli.command {
        Commands::Report { format, output } => {
            let report = semester_report(consolidation.records, &config)?;
            let mut out = open_output(output.as_deref())?;
            match format {
                Format::Text => out.write_all(render_text(&report.pivot).as_bytes())?,
                Format::Csv => write_pivot_csv(&report.pivot, &mut out)?,
                Format::Json => writeln!(out, "{}", pivot_json(&report.pivot)?)?,
            }
            out.flush()?;
        }
        Commands::Consolidate { output } => {
            let mut out = open_output(output.as_deref())?;
            write_consolidated_csv(&consolidation.records, &mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}

/// Opens `path` for writing, or stdout when no path is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}
