mod args;
mod config;
mod io_utils;
mod model;
mod parser;
mod quantile;
mod report;
mod stats;

use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::process;
use std::time::Instant;

use args::{Args, QuantileImplArg};
use model::FctData;
use parser::load_and_merge_logs;
use quantile::QuantileImpl;
use report::{build_stats_table, compute_report, print_fixed_report, write_json_report};

fn usage() {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "parse_fct_rs".to_string());
    println!("Usage: {} input_file", program);
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => {
            usage();
            process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    let profile_enabled = std::env::var("PARSE_FCT_PROFILE")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let t0 = Instant::now();

    let args = parse_args();
    if !args.input_file.exists() {
        return Err(anyhow!("input path not found: {}", args.input_file.display()));
    }

    let quantile_impl = match args.quantile_impl {
        QuantileImplArg::Brute => QuantileImpl::Brute,
        QuantileImplArg::Tdigest => QuantileImpl::TDigest,
    };
    let mut data = FctData::new(quantile_impl);
    let t_load = Instant::now();
    load_and_merge_logs(&args.input_file, &mut data)?;
    if profile_enabled {
        eprintln!("[profile] load_and_merge_logs: {:.3}s", t_load.elapsed().as_secs_f64());
    }

    let t_report = Instant::now();
    print_fixed_report(&data, args.allow_empty)?;
    if args.table {
        build_stats_table(&data).printstd();
    }
    if let Some(path) = &args.json {
        let json_report = compute_report(&data, args.allow_empty)?;
        write_json_report(path, &json_report)?;
    }
    if profile_enabled {
        eprintln!("[profile] report: {:.3}s", t_report.elapsed().as_secs_f64());
        eprintln!("[profile] total main: {:.3}s", t0.elapsed().as_secs_f64());
    }

    Ok(())
}
