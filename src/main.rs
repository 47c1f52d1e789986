use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use thermogrid::config::RunConfig;
use thermogrid::pipeline;

/// Screen a temperature sensor grid for fast-heating sensors and chart them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON run configuration; every field is optional
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input file (overrides dataset_dir/file_name)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory the charts are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// First time step of the analysis window
    #[arg(long)]
    start: Option<usize>,

    /// Number of time steps in the window
    #[arg(long)]
    offset: Option<usize>,

    /// Number of sensor rows to analyse, from the top
    #[arg(long)]
    rows: Option<usize>,

    /// Derivative sampling interval, in time steps
    #[arg(long)]
    stride: Option<usize>,

    /// Peak derivative a sensor must exceed to be reported
    #[arg(long)]
    threshold: Option<f64>,

    /// Grid columns to report (1-based, comma separated)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<usize>>,
}

impl Args {
    fn into_config(self) -> Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(input) = self.input {
            if let Some(dir) = input.parent() {
                cfg.dataset_dir = dir.to_path_buf();
            }
            cfg.file_name = input
                .file_name()
                .and_then(|n| n.to_str())
                .context("input path has no file name")?
                .to_string();
        }
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        if let Some(start) = self.start {
            cfg.start_index = start;
        }
        if let Some(offset) = self.offset {
            cfg.offset = offset;
        }
        if let Some(rows) = self.rows {
            cfg.rows = rows;
        }
        if let Some(stride) = self.stride {
            cfg.stride = stride;
        }
        if let Some(threshold) = self.threshold {
            cfg.threshold = threshold;
        }
        if self.columns.is_some() {
            cfg.columns = self.columns;
        }
        Ok(cfg)
    }
}

fn run(args: Args) -> Result<()> {
    let cfg = args.into_config()?;
    cfg.validate().context("invalid run configuration")?;
    info!(
        "Analysing {} steps {}..{} ({} rows, stride {})",
        cfg.input_path().display(),
        cfg.start_index,
        cfg.window().end(),
        cfg.rows,
        cfg.stride
    );

    let summary = pipeline::run(&cfg)
        .with_context(|| format!("analysing {}", cfg.input_path().display()))?;

    for (column, sensors) in &summary.reported {
        info!("Column {column}: {sensors:?}");
    }
    info!(
        "Done: {} charts written to {}",
        summary.files.len(),
        cfg.output_dir.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
