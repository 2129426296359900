use anyhow::{anyhow, Context, Result};
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::Path;

use crate::config::SMALL_TAIL_QUANTILE;
use crate::model::{FctData, FlowPercentile};
use crate::quantile::FctAgg;

fn format_ms(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    format!("{:.6}", v)
}

fn bucket_avg(agg: &FctAgg, label: &str, allow_empty: bool) -> Result<f64> {
    if agg.is_empty() && !allow_empty {
        return Err(anyhow!("no {} flows to average (empty bucket)", label));
    }
    Ok(agg.avg())
}

fn small_tail(agg: &FctAgg, allow_empty: bool) -> Result<f64> {
    if agg.is_empty() && !allow_empty {
        return Err(anyhow!("no small flows for the 99th percentile (empty bucket)"));
    }
    Ok(agg.quantile(SMALL_TAIL_QUANTILE))
}

/// Print the fixed nine-line report. Each value is computed right before
/// its line is printed, so a failure on an empty bucket leaves the lines
/// already emitted on stdout, matching the historical reports.
pub fn print_fixed_report(data: &FctData, allow_empty: bool) -> Result<()> {
    println!("{} flows in total", data.overall.count);
    println!(
        "Overall average FCT: {} ms",
        format_ms(bucket_avg(&data.overall, "overall", allow_empty)?)
    );

    println!("{} small flows in (0, 100KB]", data.small.count);
    println!(
        "Small flows average FCT: {} ms",
        format_ms(bucket_avg(&data.small, "small", allow_empty)?)
    );
    println!(
        "Small flows 99th FCT: {} ms",
        format_ms(small_tail(&data.small, allow_empty)?)
    );

    println!("{} median flows in (100KB, 1MB]", data.median.count);
    println!(
        "Median flows average FCT: {} ms",
        format_ms(bucket_avg(&data.median, "median", allow_empty)?)
    );

    // Historical label for the large bucket, kept for output compatibility.
    println!("{} median flows in (1MB, )", data.large.count);
    println!(
        "Large flows average FCT: {} ms",
        format_ms(bucket_avg(&data.large, "large", allow_empty)?)
    );

    Ok(())
}

pub fn build_stats_table(data: &FctData) -> Table {
    let mut table = Table::new();
    let mut titles = vec![Cell::new("bucket")];
    for p in FlowPercentile::all_in_order() {
        titles.push(Cell::new(p.name()));
    }
    titles.push(Cell::new("Cnt"));
    table.set_titles(Row::new(titles));

    for (name, agg) in [
        ("overall", &data.overall),
        ("small (0, 100KB]", &data.small),
        ("median (100KB, 1MB]", &data.median),
        ("large (1MB, )", &data.large),
    ] {
        table.add_row(row_from_agg(name, agg));
    }
    table
}

fn row_from_agg(name: &str, agg: &FctAgg) -> Row {
    let f = |v: f64| -> String {
        if v.is_nan() {
            return "nan".to_string();
        }
        format!("{:.2}", v)
    };

    let mut cells = vec![Cell::new(name)];
    for p in FlowPercentile::all_in_order() {
        cells.push(Cell::new(&f(agg.value_for(*p))));
    }
    cells.push(Cell::new(&format!("{}", agg.count)));
    Row::new(cells)
}

#[derive(Debug, Serialize)]
pub struct BucketReport {
    pub count: u32,
    pub avg_fct_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99_fct_ms: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FctReport {
    pub overall: BucketReport,
    pub small: BucketReport,
    pub median: BucketReport,
    pub large: BucketReport,
}

pub fn compute_report(data: &FctData, allow_empty: bool) -> Result<FctReport> {
    Ok(FctReport {
        overall: BucketReport {
            count: data.overall.count,
            avg_fct_ms: bucket_avg(&data.overall, "overall", allow_empty)?,
            p99_fct_ms: None,
        },
        small: BucketReport {
            count: data.small.count,
            avg_fct_ms: bucket_avg(&data.small, "small", allow_empty)?,
            p99_fct_ms: Some(small_tail(&data.small, allow_empty)?),
        },
        median: BucketReport {
            count: data.median.count,
            avg_fct_ms: bucket_avg(&data.median, "median", allow_empty)?,
            p99_fct_ms: None,
        },
        large: BucketReport {
            count: data.large.count,
            avg_fct_ms: bucket_avg(&data.large, "large", allow_empty)?,
            p99_fct_ms: None,
        },
    })
}

pub fn write_json_report(path: &Path, report: &FctReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize JSON report")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
