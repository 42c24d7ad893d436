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

//! EDJournal Ingestion
//!
//! Turns a directory of append-only journal files plus a status file into a
//! stream of classified events.
//!
//! ## Components
//!
//! - [`catalog`]: discovers and orders `Journal.*.log` files
//! - [`tailer`]: per-file read positions and line-boundary reads
//! - [`status`]: status file reads and the dispatch debouncer
//! - [`dispatch`]: bounded batch queue drained by a handler thread
//! - [`stats`]: ingestion counters
//! - [`watcher`]: the directory watch loop tying the above together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edjournal_ingest::{JournalWatcher, WatcherConfig};
//!
//! let store = Arc::new(EventStore::default());
//! let handle = JournalWatcher::start(WatcherConfig::new(dir), store.clone(), vec![])?;
//! // ...
//! handle.stop();
//! ```

pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod stats;
pub mod status;
pub mod tailer;
pub mod watcher;

pub use catalog::{discover, latest, JournalFile};
pub use dispatch::{
    BatchHandler, BatchKind, DispatchConfig, Dispatcher, Enqueued, FnHandler, IngestBatch,
    SystemEvent, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::{DirectoryError, FileReadError, HandlerError, IngestError, IngestResult};
pub use stats::{IngestStats, IngestStatsSnapshot};
pub use status::{read_status, StatusDebouncer, DEFAULT_STATUS_DEBOUNCE, STATUS_FILE_NAME};
pub use tailer::{LineFailure, ReadOutcome, ReadPosition};
pub use watcher::{JournalWatcher, PositionTable, WatcherConfig, WatcherHandle};
