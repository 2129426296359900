use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuantileImplArg {
    Brute,
    Tdigest,
}

#[derive(Parser, Debug)]
#[command(about = "Summarize flow completion times from datacenter simulator logs")]
pub struct Args {
    /// Log file, .7z archive, or directory of *.log files
    #[arg(value_name = "input_file")]
    pub input_file: PathBuf,

    /// Quantile implementation for tail values (tdigest is approximate)
    #[arg(short = 'q', long = "quantile-impl", value_enum, default_value = "brute")]
    pub quantile_impl: QuantileImplArg,

    /// Report empty buckets as nan instead of failing
    #[arg(long = "allow-empty")]
    pub allow_empty: bool,

    /// Print a per-bucket statistics table after the report
    #[arg(short = 't', long = "table")]
    pub table: bool,

    /// Write the computed report as JSON to this path
    #[arg(long = "json", value_name = "path")]
    pub json: Option<PathBuf>,
}
