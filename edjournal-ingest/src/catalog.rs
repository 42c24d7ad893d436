// Copyright 2025 EDJournal (https://github.com/edjournal)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Journal file catalog
//!
//! Lists `Journal.<timestamp>.<part>.log[.backup]` files in a directory,
//! newest first. Two timestamp forms are understood:
//!
//! - `Journal.20250101120000.01.log` (14-digit legacy form)
//! - `Journal.2025-01-01T120000.01.log` (current game form)
//!
//! Names matching neither sort last with the epoch as their timestamp.

use crate::error::{DirectoryError, FileReadError};
use chrono::{DateTime, NaiveDateTime, Utc};
use edjournal_core::{decode_line, RawRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

const PREFIX: &str = "Journal.";
const SUFFIX: &str = ".log";
const BACKUP_SUFFIX: &str = ".log.backup";

static JOURNAL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Journal\.(\d{14}|\d{4}-\d{2}-\d{2}T\d{6})\.(\d+)\.log(\.backup)?$")
        .expect("journal name pattern is valid")
});

/// A journal file found in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalFile {
    pub path: PathBuf,
    /// Timestamp embedded in the name, or the epoch when it doesn't parse
    pub timestamp: DateTime<Utc>,
    pub part: u32,
    pub backup: bool,
}

impl JournalFile {
    /// Describe `path` if its name is a journal candidate.
    ///
    /// Backups are only accepted when `include_backups` is set.
    pub fn from_path(path: &Path, include_backups: bool) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if !name.starts_with(PREFIX) {
            return None;
        }
        let backup = name.ends_with(BACKUP_SUFFIX);
        if backup && !include_backups {
            return None;
        }
        if !backup && !name.ends_with(SUFFIX) {
            return None;
        }

        let (timestamp, part) = parse_name(name).unwrap_or((DateTime::<Utc>::UNIX_EPOCH, 0));
        Some(Self {
            path: path.to_path_buf(),
            timestamp,
            part,
            backup,
        })
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Newest-first ordering: timestamp, then part number, then name.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.part.cmp(&self.part))
            .then_with(|| other.name().cmp(self.name()))
    }

    /// Whether this file sorts strictly before `other` in newest-first order.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.cmp_newest_first(other) == Ordering::Less
    }

    /// Decode the first line of the file.
    pub fn first_record(&self) -> Result<RawRecord, FileReadError> {
        let file = File::open(&self.path).map_err(|source| FileReadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut line = Vec::new();
        let read = BufReader::new(file)
            .read_until(b'\n', &mut line)
            .map_err(|source| FileReadError::Io {
                path: self.path.clone(),
                source,
            })?;
        if read == 0 {
            return Err(FileReadError::Empty {
                path: self.path.clone(),
            });
        }
        decode_line(&line).map_err(|source| FileReadError::Decode {
            path: self.path.clone(),
            source,
        })
    }
}

fn parse_name(name: &str) -> Option<(DateTime<Utc>, u32)> {
    let caps = JOURNAL_NAME.captures(name)?;
    let stamp = caps.get(1)?.as_str();
    let format = if stamp.contains('T') {
        "%Y-%m-%dT%H%M%S"
    } else {
        "%Y%m%d%H%M%S"
    };
    let timestamp = NaiveDateTime::parse_from_str(stamp, format).ok()?.and_utc();
    let part = caps.get(2)?.as_str().parse().ok()?;
    Some((timestamp, part))
}

/// List journal files in `dir`, newest first.
pub fn discover(dir: &Path, include_backups: bool) -> Result<Vec<JournalFile>, DirectoryError> {
    let meta = fs::metadata(dir).map_err(|e| DirectoryError::from_io(dir.to_path_buf(), e))?;
    if !meta.is_dir() {
        return Err(DirectoryError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| DirectoryError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        let Some(file) = JournalFile::from_path(&path, include_backups) else {
            continue;
        };
        if fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
            files.push(file);
        }
    }

    files.sort_by(JournalFile::cmp_newest_first);
    debug!(dir = %dir.display(), count = files.len(), "Discovered journal files");
    Ok(files)
}

/// The newest non-backup journal file in `dir`.
pub fn latest(dir: &Path) -> Result<Option<JournalFile>, DirectoryError> {
    Ok(discover(dir, false)?.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_name_pattern_compiles() {
        let pattern = Lazy::force(&JOURNAL_NAME);
        assert!(pattern.is_match("Journal.20250101000000.01.log"));
        assert!(!pattern.is_match("Status.json"));
    }

    #[test]
    fn test_parse_both_timestamp_forms() {
        let legacy = JournalFile::from_path(Path::new("Journal.20250102030405.02.log"), false).unwrap();
        assert_eq!(legacy.timestamp, Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(legacy.part, 2);

        let current = JournalFile::from_path(Path::new("Journal.2025-01-02T030405.01.log"), false).unwrap();
        assert_eq!(current.timestamp, Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(current.part, 1);
    }

    #[test]
    fn test_candidate_filtering() {
        assert!(JournalFile::from_path(Path::new("Status.json"), true).is_none());
        assert!(JournalFile::from_path(Path::new("Journal.20250101000000.01.log.backup"), false).is_none());

        let backup =
            JournalFile::from_path(Path::new("Journal.20250101000000.01.log.backup"), true).unwrap();
        assert!(backup.backup);

        let odd = JournalFile::from_path(Path::new("Journal.renamed.log"), false).unwrap();
        assert_eq!(odd.timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_discover_orders_newest_first() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "Journal.20250101000000.01.log", "");
        touch(dir.path(), "Journal.2025-03-01T000000.01.log", "");
        touch(dir.path(), "Journal.20250301000000.02.log", "");
        touch(dir.path(), "Journal.custom.log", "");
        touch(dir.path(), "Journal.20250201000000.01.log.backup", "");
        touch(dir.path(), "Status.json", "{}");
        fs::create_dir(dir.path().join("Journal.20260101000000.01.log")).unwrap();

        let names: Vec<String> = discover(dir.path(), false)
            .unwrap()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Journal.20250301000000.02.log",
                "Journal.2025-03-01T000000.01.log",
                "Journal.20250101000000.01.log",
                "Journal.custom.log",
            ]
        );

        let with_backups = discover(dir.path(), true).unwrap();
        assert_eq!(with_backups.len(), 5);
        assert!(with_backups[2].backup);
    }

    #[test]
    fn test_latest() {
        let dir = tempdir().unwrap();
        assert!(latest(dir.path()).unwrap().is_none());

        touch(dir.path(), "Journal.20250101000000.01.log", "");
        touch(dir.path(), "Journal.20250102000000.01.log", "");
        let head = latest(dir.path()).unwrap().unwrap();
        assert_eq!(head.name(), "Journal.20250102000000.01.log");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(discover(&missing, false), Err(DirectoryError::NotFound(_))));

        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(matches!(latest(&file), Err(DirectoryError::NotADirectory(_))));
    }

    #[test]
    fn test_first_record() {
        let dir = tempdir().unwrap();
        touch(
            dir.path(),
            "Journal.20250101000000.01.log",
            "{\"timestamp\":\"2025-01-01T00:00:00Z\",\"event\":\"Fileheader\",\"part\":1}\n{\"broken\n",
        );
        touch(dir.path(), "Journal.20250102000000.01.log", "");
        touch(dir.path(), "Journal.20250103000000.01.log", "not json\n");

        let files = discover(dir.path(), false).unwrap();
        assert!(matches!(files[0].first_record(), Err(FileReadError::Decode { .. })));
        assert!(matches!(files[1].first_record(), Err(FileReadError::Empty { .. })));
        assert_eq!(files[2].first_record().unwrap().record_type, "Fileheader");
    }
}
