use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect `*.log` files under `log_dir`, plus `.7z` archives that live in
/// directories holding no plain log (same precedence as extracted runs).
pub fn scan_logs(log_dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut log_files = Vec::new();
    let mut dirs_with_logs = HashSet::new();

    for entry in WalkDir::new(log_dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension() == Some(OsStr::new("log")) {
            log_files.push(path.to_path_buf());
            if let Some(parent) = path.parent() {
                dirs_with_logs.insert(parent.to_path_buf());
            }
        }
    }

    let mut archives = Vec::new();
    for entry in WalkDir::new(log_dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension() == Some(OsStr::new("7z")) {
            let parent = path.parent().unwrap_or(log_dir);
            if !dirs_with_logs.contains(parent) {
                archives.push(path.to_path_buf());
            }
        }
    }

    log_files.sort();
    archives.sort();
    Ok((log_files, archives))
}

pub fn read_log_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

pub fn read_log_text_from_archive(path: &Path) -> Result<String> {
    let data = extract_log_from_7z(path)?;
    String::from_utf8(data)
        .with_context(|| format!("log text in {} is not valid UTF-8", path.display()))
}

fn archive_reader(path: &Path) -> Result<sevenz_rust::SevenZReader<fs::File>> {
    let mut file =
        fs::File::open(path).with_context(|| format!("failed to open archive {}", path.display()))?;

    let pos = file
        .stream_position()
        .with_context(|| format!("failed to get stream position for {}", path.display()))?;
    let len = file
        .seek(SeekFrom::End(0))
        .with_context(|| format!("failed to seek to end for {}", path.display()))?;
    file.seek(SeekFrom::Start(pos))
        .with_context(|| format!("failed to seek to start for {}", path.display()))?;

    let password = sevenz_rust::Password::empty();
    sevenz_rust::SevenZReader::new(file, len, password)
        .with_context(|| format!("failed to create 7z reader for {}", path.display()))
}

fn extract_log_from_7z(archive_path: &Path) -> Result<Vec<u8>> {
    if let Ok(bytes) = extract_member_from_7z(archive_path, "logout.dat") {
        return Ok(bytes);
    }

    let mut seven = archive_reader(archive_path)?;
    let mut candidates: Vec<String> = Vec::new();
    seven
        .for_each_entries(|entry, _| {
            if entry.name().ends_with(".log") || entry.name().ends_with(".dat") {
                candidates.push(entry.name().to_string());
            }
            Ok(true)
        })
        .with_context(|| format!("failed to iterate entries in {}", archive_path.display()))?;

    if candidates.is_empty() {
        return Err(anyhow!(
            "no log member found in archive {}",
            archive_path.display()
        ));
    }

    candidates.sort_by(|a, b| {
        let la = a.len();
        let lb = b.len();
        la.cmp(&lb).then_with(|| a.cmp(b))
    });
    extract_member_from_7z(archive_path, &candidates[0])
}

fn extract_member_from_7z(archive_path: &Path, member: &str) -> Result<Vec<u8>> {
    let mut seven = archive_reader(archive_path)?;
    let mut result: Option<Vec<u8>> = None;

    seven
        .for_each_entries(|entry, reader| {
            if entry.name() == member {
                let mut out = Vec::new();
                reader.read_to_end(&mut out)?;
                result = Some(out);
            }
            Ok(true)
        })
        .with_context(|| {
            format!(
                "failed to read content of {} from {}",
                member,
                archive_path.display()
            )
        })?;

    result.ok_or_else(|| {
        anyhow!(
            "member {} not found in archive {}",
            member,
            archive_path.display()
        )
    })
}
