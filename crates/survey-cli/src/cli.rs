//! CLI argument definitions for `svyind`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use survey_cli::pipeline::WaveInput;
use survey_indicators::CalculationOptions;

#[derive(Parser)]
#[command(
    name = "svyind",
    version,
    about = "Survey-weighted labor, poverty, and inequality indicators",
    long_about = "Harmonize labor force and household survey microdata onto a canonical\n\
                  schema and estimate indicators with design-based 95% intervals.\n\n\
                  Wave layouts and poverty lines are read from a checksum-pinned\n\
                  standards directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Standards directory (default: $SURVEY_STANDARDS_DIR or the bundled one).
    #[arg(long = "standards-dir", value_name = "DIR", global = true)]
    pub standards_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered survey waves, or show one wave's field mapping.
    Waves(WavesArgs),

    /// List the indicator catalogue.
    Indicators,

    /// Estimate indicators for a single wave.
    Compute(ComputeArgs),

    /// Estimate indicators across several waves.
    Compare(CompareArgs),
}

#[derive(Args)]
pub struct WavesArgs {
    /// Show the canonical field mapping of this wave (YYYY-MM).
    #[arg(value_name = "WAVE")]
    pub wave: Option<String>,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Indicators to compute (names or comma lists; `all` for the catalogue).
    #[arg(long = "indicators", value_name = "NAME", num_args = 1.., default_value = "all")]
    pub indicators: Vec<String>,

    /// Add design-based 95% confidence intervals.
    #[arg(long = "ci")]
    pub ci: bool,

    /// Leave single-person households out of poverty, Gini, and percentile
    /// indicators (BPS methodology).
    #[arg(long = "exclude-single-person")]
    pub exclude_single_person: bool,

    /// Write results as JSON.
    #[arg(long = "json", value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write results as CSV.
    #[arg(long = "csv", value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

impl OutputArgs {
    pub fn options(&self) -> CalculationOptions {
        CalculationOptions::new(self.ci).with_exclude_single_person(self.exclude_single_person)
    }
}

#[derive(Args)]
pub struct ComputeArgs {
    /// Wave identifier (YYYY-MM).
    #[arg(long = "wave", value_name = "WAVE")]
    pub wave: String,

    /// Microdata file (CSV or Parquet).
    #[arg(long = "input", value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Wave and microdata file, repeated per wave.
    #[arg(
        long = "input",
        value_name = "WAVE=FILE",
        value_parser = parse_wave_input,
        required = true,
        num_args = 1..
    )]
    pub inputs: Vec<WaveInput>,

    /// One row per indicator with waves as columns.
    #[arg(long = "wide")]
    pub wide: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn parse_wave_input(value: &str) -> Result<WaveInput, String> {
    WaveInput::parse(value).map_err(|error| error.to_string())
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
