//! File-backed analysis store using one JSON document per line.

use super::{AnalysisStore, count_matching, select_recent};
use crate::core::errors::{SimpleError, SmearError, SmearResult};
use crate::domain::AnalysisRecord;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Appends records to a JSON-lines file.
///
/// The file is created on first append; its parent directory must already
/// exist, otherwise every operation fails with
/// [`SmearError::StoreUnavailable`]. Lines that do not parse as a valid
/// record are skipped on read.
#[derive(Debug)]
pub struct JsonlAnalysisStore {
    path: PathBuf,
    file_lock: Mutex<()>,
}

impl JsonlAnalysisStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the file keeping only parseable, valid records and returns
    /// how many lines were dropped. Blank lines are removed without being
    /// counted.
    pub fn purge_invalid(&self) -> SmearResult<usize> {
        let _guard = self.guard()?;
        let Some(text) = self.read_text()? else {
            return Ok(0);
        };

        let mut kept = String::with_capacity(text.len());
        let mut removed = 0;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if parse_record(line).is_some() {
                kept.push_str(line);
                kept.push('\n');
            } else {
                removed += 1;
            }
        }

        let staging = self.path.with_extension("jsonl.tmp");
        std::fs::write(&staging, kept)
            .and_then(|_| std::fs::rename(&staging, &self.path))
            .map_err(|e| SmearError::store_unavailable("rewriting analysis log", e))?;
        info!(removed, path = %self.path.display(), "Purged invalid analysis records");
        Ok(removed)
    }

    fn guard(&self) -> SmearResult<MutexGuard<'_, ()>> {
        self.file_lock.lock().map_err(|_| {
            SmearError::store_unavailable("analysis log", SimpleError::new("lock poisoned"))
        })
    }

    fn ensure_reachable(&self) -> SmearResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if parent.is_dir() {
            Ok(())
        } else {
            Err(SmearError::store_unavailable(
                &format!("opening {}", self.path.display()),
                SimpleError::new(format!("directory {} does not exist", parent.display())),
            ))
        }
    }

    /// File contents, or `None` when nothing has been appended yet.
    fn read_text(&self) -> SmearResult<Option<String>> {
        self.ensure_reachable()?;
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SmearError::store_unavailable("reading analysis log", e)),
        }
    }

    fn load(&self) -> SmearResult<Vec<AnalysisRecord>> {
        let _guard = self.guard()?;
        let Some(text) = self.read_text()? else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(line) {
                Some(record) => records.push(record),
                None => warn!(line = number + 1, path = %self.path.display(), "Skipping invalid analysis record"),
            }
        }
        Ok(records)
    }
}

/// Whether the last byte of a non-empty file is something other than `\n`.
fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn parse_record(line: &str) -> Option<AnalysisRecord> {
    serde_json::from_str::<AnalysisRecord>(line)
        .ok()
        .filter(|record| record.validate().is_ok())
}

impl AnalysisStore for JsonlAnalysisStore {
    fn append(&self, record: AnalysisRecord) -> SmearResult<()> {
        record.validate()?;
        let line = serde_json::to_string(&record).map_err(|e| {
            SmearError::invalid_input(format!("analysis record is not serializable: {e}"))
        })?;

        let _guard = self.guard()?;
        self.ensure_reachable()?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SmearError::store_unavailable("opening analysis log", e))?;

        let mut buffer = String::with_capacity(line.len() + 2);
        if ends_mid_line(&mut file)
            .map_err(|e| SmearError::store_unavailable("inspecting analysis log", e))?
        {
            warn!(path = %self.path.display(), "Analysis log ends without a newline, terminating it");
            buffer.push('\n');
        }
        buffer.push_str(&line);
        buffer.push('\n');
        file.write_all(buffer.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| SmearError::store_unavailable("writing analysis record", e))?;
        debug!(analysis_id = %record.analysis_id, "Appended analysis record");
        Ok(())
    }

    fn list(&self, subject_id: Option<&str>, limit: usize) -> SmearResult<Vec<AnalysisRecord>> {
        let records = self.load()?;
        Ok(select_recent(records.iter(), subject_id, limit))
    }

    fn count(&self, subject_id: Option<&str>, since: Option<DateTime<Utc>>) -> SmearResult<usize> {
        let records = self.load()?;
        Ok(count_matching(records.iter(), subject_id, since))
    }
}
