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

//! Ingestion error types

use edjournal_core::DecodeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for starting ingestion
pub type IngestResult<T> = Result<T, IngestError>;

/// The watch target itself is inaccessible.
///
/// Distinct from "no journal files yet", which is an empty listing.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Journal directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Journal directory unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DirectoryError {
    pub(crate) fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => DirectoryError::NotFound(path),
            _ => DirectoryError::Unreadable { path, source: err },
        }
    }
}

/// Errors returned by `JournalWatcher::start`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Filesystem watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Failure to read a whole-file JSON object (status file, first record).
#[derive(Debug, Error)]
pub enum FileReadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is empty")]
    Empty { path: PathBuf },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// Error returned by a batch handler. Logged and counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }
}
