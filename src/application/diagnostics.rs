//! Rotating on-disk diagnostic records, one JSON file per reported failure.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::application::executor::FailureReport;

pub const DEFAULT_RETAINED_LOGS: usize = 10;

const LOG_PREFIX: &str = "error-";
const LOG_SUFFIX: &str = ".json";

#[derive(Debug, Serialize)]
struct EnvironmentInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
    cwd: Option<String>,
}

impl EnvironmentInfo {
    fn capture() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cwd: std::env::current_dir()
                .ok()
                .map(|p| p.display().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct DiagnosticRecord<'a> {
    #[serde(flatten)]
    report: &'a FailureReport,
    environment: EnvironmentInfo,
}

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    dir: PathBuf,
    retain: usize,
}

impl DiagnosticLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retain: DEFAULT_RETAINED_LOGS,
        }
    }

    /// Writes `report` to a new file and prunes the directory down to the
    /// newest records. File names sort lexically in creation order.
    pub fn record(&self, report: &FailureReport) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let record = DiagnosticRecord {
            report,
            environment: EnvironmentInfo::capture(),
        };
        let contents = serde_json::to_vec_pretty(&record)?;

        let (path, mut file) = self.create_unique()?;
        write_or_discard(&path, &mut file, &contents)?;
        file.sync_all()?;

        self.prune()?;
        Ok(path)
    }

    fn create_unique(&self) -> io::Result<(PathBuf, fs::File)> {
        let mut stamp = Utc::now().timestamp_millis().max(0) as u64;
        // Never go backwards relative to what is already on disk.
        if let Some(newest) = self.log_files()?.last().and_then(|p| stamp_of(p)) {
            stamp = stamp.max(newest + 1);
        }

        loop {
            let path = self.dir.join(format!("{}{:020}{}", LOG_PREFIX, stamp, LOG_SUFFIX));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e),
            }
        }
    }

    fn log_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(LOG_PREFIX) && n.ends_with(LOG_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn prune(&self) -> io::Result<()> {
        let files = self.log_files()?;
        let excess = files.len().saturating_sub(self.retain);
        for old in &files[..excess] {
            fs::remove_file(old)?;
        }
        Ok(())
    }
}

/// Writes `contents` to the freshly created `path`, removing it again on
/// failure so a partial record never counts toward retention.
fn write_or_discard<W: Write>(path: &Path, writer: &mut W, contents: &[u8]) -> io::Result<()> {
    match writer.write_all(contents).and_then(|()| writer.flush()) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}

fn stamp_of(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(LOG_PREFIX)?
        .strip_suffix(LOG_SUFFIX)?
        .parse()
        .ok()
}
