use anyhow::{anyhow, Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::config::{FINISHED_MARKER, FLOW_LINE_TOKENS};
use crate::io_utils::{read_log_text, read_log_text_from_archive, scan_logs};
use crate::model::{FctData, FlowRecord};

/// Parse one log line. `Ok(None)` covers the two silent skip cases (no
/// finished marker, wrong token count); malformed numeric tokens on an
/// otherwise well-formed line are an error.
pub fn parse_flow_line(line: &str) -> Result<Option<FlowRecord>> {
    if !line.contains(FINISHED_MARKER) {
        return Ok(None);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != FLOW_LINE_TOKENS {
        return Ok(None);
    }

    let size_token = tokens[FLOW_LINE_TOKENS - 1];
    let fct_token = tokens[FLOW_LINE_TOKENS - 3];
    let size_bytes: u64 = size_token
        .parse()
        .with_context(|| format!("invalid flow size '{}'", size_token))?;
    let fct_ms: f64 = fct_token
        .parse()
        .with_context(|| format!("invalid completion time '{}'", fct_token))?;

    Ok(Some(FlowRecord { fct_ms, size_bytes }))
}

fn parse_log_text(path: &Path, text: &str) -> Result<Vec<FlowRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let record = parse_flow_line(line)
            .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
        if let Some(r) = record {
            records.push(r);
        }
    }
    Ok(records)
}

#[derive(Debug, Clone)]
enum LogSource {
    Plain(PathBuf),
    Archive(PathBuf),
}

fn load_source(source: &LogSource) -> Result<Vec<FlowRecord>> {
    match source {
        LogSource::Plain(p) => parse_log_text(p, &read_log_text(p)?),
        LogSource::Archive(p) => parse_log_text(p, &read_log_text_from_archive(p)?),
    }
}

fn collect_sources(input: &Path) -> Result<Vec<LogSource>> {
    if input.is_dir() {
        let (log_files, archives) = scan_logs(input)?;
        if log_files.is_empty() && archives.is_empty() {
            return Err(anyhow!(
                "no logs found under: {} (expected *.log files or .7z archives)",
                input.display()
            ));
        }

        let mut sources = Vec::with_capacity(log_files.len() + archives.len());
        for p in log_files {
            sources.push(LogSource::Plain(p));
        }
        for p in archives {
            sources.push(LogSource::Archive(p));
        }
        return Ok(sources);
    }

    if input.extension() == Some(OsStr::new("7z")) {
        Ok(vec![LogSource::Archive(input.to_path_buf())])
    } else {
        Ok(vec![LogSource::Plain(input.to_path_buf())])
    }
}

fn merge_records(data: &mut FctData, records: Vec<FlowRecord>) {
    for record in records {
        data.insert(record);
    }
}

/// Load every log source reachable from `input` and merge the finished-flow
/// records into `data`. A single source is processed sequentially; multiple
/// sources fan out over a small worker pool.
pub fn load_and_merge_logs(input: &Path, data: &mut FctData) -> Result<()> {
    let sources = collect_sources(input)?;
    let total_sources = sources.len();
    let mut sources_processed: usize = 0;

    let mut worker_count = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(1)
        .min(8)
        .min(total_sources.max(1));
    if let Ok(override_workers) = std::env::var("PARSE_FCT_WORKERS") {
        if let Ok(n) = override_workers.parse::<usize>() {
            worker_count = n.max(1).min(total_sources.max(1));
        }
    }

    if worker_count == 1 {
        for source in &sources {
            let records = load_source(source)?;
            merge_records(data, records);
            sources_processed += 1;
            if sources_processed % 100 == 0 {
                eprintln!("processed {}/{} logs...", sources_processed, total_sources);
            }
        }
        return Ok(());
    }

    let shared_sources = Arc::new(sources);
    let next_index = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::sync_channel::<Result<Vec<FlowRecord>>>(worker_count * 2);
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
        let tx = tx.clone();
        let shared_sources = Arc::clone(&shared_sources);
        let next_index = Arc::clone(&next_index);
        handles.push(thread::spawn(move || {
            loop {
                let idx = next_index.fetch_add(1, Ordering::Relaxed);
                if idx >= shared_sources.len() {
                    break;
                }
                if tx.send(load_source(&shared_sources[idx])).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    for result in rx {
        let records = result?;
        merge_records(data, records);
        sources_processed += 1;
        if sources_processed % 100 == 0 {
            eprintln!("processed {}/{} logs...", sources_processed, total_sources);
        }
        if sources_processed == total_sources {
            break;
        }
    }

    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantile::QuantileImpl;
    use std::fs;

    const FLOW_LINE: &str = "Flow 12 0->7 finished at time 1.52 size 50000";

    #[test]
    fn parses_a_nine_token_finished_line() {
        let record = parse_flow_line(FLOW_LINE).unwrap().unwrap();
        assert_eq!(record.fct_ms, 1.52);
        assert_eq!(record.size_bytes, 50_000);
    }

    #[test]
    fn ignores_lines_without_the_finished_marker() {
        let line = "Flow 12 0->7 started at time 1.52 size 50000";
        assert_eq!(parse_flow_line(line).unwrap(), None);
    }

    #[test]
    fn ignores_finished_lines_with_the_wrong_token_count() {
        let eight = "Flow 12 finished at time 1.52 size 50000";
        let ten = "Flow 12 0 -> 7 finished at 1.52 size 50000";
        assert_eq!(parse_flow_line(eight).unwrap(), None);
        assert_eq!(parse_flow_line(ten).unwrap(), None);
    }

    #[test]
    fn malformed_size_token_is_an_error() {
        let line = "Flow 12 0->7 finished at time 1.52 size fifty";
        let err = parse_flow_line(line).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid flow size"));
    }

    #[test]
    fn malformed_fct_token_is_an_error() {
        let line = "Flow 12 0->7 finished at time soon size 50000";
        let err = parse_flow_line(line).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid completion time"));
    }

    #[test]
    fn parse_errors_name_the_file_and_line() {
        let text = format!("{}\nFlow 13 0->7 finished at time bad size 50000\n", FLOW_LINE);
        let err = parse_log_text(Path::new("flows.log"), &text).unwrap_err();
        assert!(format!("{:#}", err).contains("flows.log:2"));
    }

    #[test]
    fn load_and_merge_aggregates_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.log"),
            "Flow 1 0->7 finished at time 1.5 size 50000\nqueue 3 dropped 0 pkts\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.log"),
            "Flow 2 0->7 finished at time 3.2 size 2000000\n",
        )
        .unwrap();

        let mut data = FctData::new(QuantileImpl::Brute);
        load_and_merge_logs(dir.path(), &mut data).unwrap();
        assert_eq!(data.overall.count, 2);
        assert_eq!(data.small.count, 1);
        assert_eq!(data.median.count, 0);
        assert_eq!(data.large.count, 1);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = FctData::new(QuantileImpl::Brute);
        let err = load_and_merge_logs(dir.path(), &mut data).unwrap_err();
        assert!(format!("{:#}", err).contains("no logs found"));
    }
}
