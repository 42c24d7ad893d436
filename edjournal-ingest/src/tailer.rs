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

//! Line-boundary tailing of append-only journal files.
//!
//! A [`ReadPosition`] only advances past bytes that ended in `\n`. A trailing
//! partial line stays unconsumed and is re-read on the next call, so any
//! chunking of the writer's output yields the same records as a single read.

use edjournal_core::{decode_line, DecodeError, RawRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Byte offset of the last fully consumed line of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPosition {
    pub path: PathBuf,
    pub offset: u64,
}

/// A line that was consumed but did not decode.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFailure {
    /// Byte offset of the start of the line
    pub offset: u64,
    pub error: DecodeError,
}

/// Result of one [`ReadPosition::read_new`] call.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub records: Vec<RawRecord>,
    pub failures: Vec<LineFailure>,
    /// Non-blank complete lines consumed
    pub lines: usize,
    /// The file shrank below the previous offset and was re-read from zero
    pub truncated: bool,
}

impl ReadOutcome {
    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

impl ReadPosition {
    pub fn at_start(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    /// Position at the file's current end, skipping existing content.
    pub fn at_end(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let offset = std::fs::metadata(&path)?.len();
        Ok(Self { path, offset })
    }

    /// Read and decode every complete line appended since the last call.
    ///
    /// On error the offset is left untouched so the next call retries.
    pub fn read_new(&mut self) -> io::Result<ReadOutcome> {
        let mut outcome = ReadOutcome::default();
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();

        if len < self.offset {
            warn!(
                path = %self.path.display(),
                offset = self.offset,
                len,
                "Journal file shrank, re-reading from start"
            );
            self.offset = 0;
            outcome.truncated = true;
        }
        if len == self.offset {
            return Ok(outcome);
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::with_capacity(usize::try_from(len - self.offset).unwrap_or(0));
        file.take(len - self.offset).read_to_end(&mut buf)?;

        let (lines, consumed) = split_lines(&buf);
        for (start, line) in lines {
            outcome.lines += 1;
            match decode_line(line) {
                Ok(record) => outcome.records.push(record),
                Err(error) => outcome.failures.push(LineFailure {
                    offset: self.offset + start as u64,
                    error,
                }),
            }
        }

        self.offset += consumed as u64;
        debug!(
            path = %self.path.display(),
            offset = self.offset,
            lines = outcome.lines,
            pending = buf.len() - consumed,
            "Read journal lines"
        );
        Ok(outcome)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Split `buf` into complete non-blank lines.
///
/// Returns each line's start offset and bytes (without `\n` or a trailing
/// `\r`), plus the number of bytes consumed, which ends at the last `\n`.
pub fn split_lines(buf: &[u8]) -> (Vec<(usize, &[u8])>, usize) {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, byte) in buf.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        let mut line = &buf[start..i];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        if !line.iter().all(u8::is_ascii_whitespace) {
            lines.push((start, line));
        }
        start = i + 1;
    }
    (lines, start)
}
