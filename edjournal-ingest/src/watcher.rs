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

//! Directory watch loop
//!
//! ```text
//!   notify ──► event channel ──► watch thread ──► EventStore::append_batch
//!                                     │
//!                                     └──► Dispatcher queue ──► handlers
//! ```
//!
//! The watch thread is the only writer of read positions and the only
//! ingestion writer of the store. It blocks on the notify channel; a timer
//! is armed only while a debounced status update is held back.
//!
//! Rotation: when a journal file newer than the active one shows up, the
//! active file is drained one final time and retired before the new file is
//! read from offset zero. A `SystemEvent::Rotated` batch sits between the
//! last batch of the old file and the first batch of the new one. If the
//! final drain fails, the old file stays tracked and the new one is held
//! back until a retry succeeds.

use crate::catalog::{self, JournalFile};
use crate::dispatch::{BatchHandler, DispatchConfig, Dispatcher, Enqueued, IngestBatch, SystemEvent};
use crate::error::{FileReadError, IngestError, IngestResult};
use crate::stats::{IngestStats, IngestStatsSnapshot};
use crate::status::{read_status, StatusDebouncer, DEFAULT_STATUS_DEBOUNCE, STATUS_FILE_NAME};
use crate::tailer::ReadPosition;
use crossbeam_channel::{after, bounded, never, select, unbounded, Receiver, Sender, TryRecvError};
use edjournal_core::{classify_record, ClassifiedEvent};
use edjournal_storage::EventStore;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Watcher settings
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub journal_dir: PathBuf,
    /// Status file name inside `journal_dir`
    pub status_file: String,
    /// Read the newest journal from the start instead of its end
    pub catch_up: bool,
    pub status_debounce: Duration,
    pub dispatch: DispatchConfig,
}

impl WatcherConfig {
    pub fn new(journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            journal_dir: journal_dir.into(),
            status_file: STATUS_FILE_NAME.to_string(),
            catch_up: false,
            status_debounce: DEFAULT_STATUS_DEBOUNCE,
            dispatch: DispatchConfig::default(),
        }
    }

    pub fn with_catch_up(mut self, catch_up: bool) -> Self {
        self.catch_up = catch_up;
        self
    }

    pub fn with_status_debounce(mut self, window: Duration) -> Self {
        self.status_debounce = window;
        self
    }

    pub fn with_status_file(mut self, name: impl Into<String>) -> Self {
        self.status_file = name.into();
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }
}

/// Read positions of every journal file the watcher knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionTable {
    /// Current tail target
    pub active: Option<PathBuf>,
    pub tracked: BTreeMap<PathBuf, ReadPosition>,
    /// Final offsets of files superseded by rotation
    pub retired: BTreeMap<PathBuf, u64>,
}

impl PositionTable {
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.tracked.get(path).map(|p| p.offset)
    }

    pub fn active_offset(&self) -> Option<u64> {
        self.active.as_deref().and_then(|p| self.offset(p))
    }

    fn retire(&mut self, path: &Path) {
        if let Some(pos) = self.tracked.remove(path) {
            self.retired.insert(pos.path, pos.offset);
        }
        if self.active.as_deref() == Some(path) {
            self.active = None;
        }
    }
}

/// Delay before a failed final drain of a rotated-out file is retried
const RETIRE_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// State owned by the watch thread.
pub struct JournalWatcher {
    journal_dir: PathBuf,
    status_file: String,
    store: Arc<EventStore>,
    positions: Arc<Mutex<PositionTable>>,
    stats: Arc<IngestStats>,
    dispatcher: Dispatcher,
    debouncer: StatusDebouncer,
    active: Option<JournalFile>,
    /// Rotated-out files still awaiting a successful final drain, oldest
    /// first, each paired with the file that replaced it
    retiring: VecDeque<(PathBuf, PathBuf)>,
    retry_at: Option<Instant>,
}

impl JournalWatcher {
    /// Snapshot the directory, install the watch and spawn the watch thread.
    ///
    /// Fails with [`IngestError::Directory`] when the directory is missing
    /// or unreadable. Existing files are positioned at their end; with
    /// `catch_up` the newest file is read from the start instead.
    pub fn start(
        config: WatcherConfig,
        store: Arc<EventStore>,
        handlers: Vec<Arc<dyn BatchHandler>>,
    ) -> IngestResult<WatcherHandle> {
        let files = catalog::discover(&config.journal_dir, false)?;
        let active = files.first().cloned();

        let mut table = PositionTable::default();
        for file in &files {
            match ReadPosition::at_end(&file.path) {
                Ok(pos) => {
                    table.tracked.insert(file.path.clone(), pos);
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Cannot position journal file, skipping")
                }
            }
        }
        if let Some(active) = &active {
            if config.catch_up {
                table
                    .tracked
                    .insert(active.path.clone(), ReadPosition::at_start(&active.path));
            }
            table.active = Some(active.path.clone());
        }

        let status_path = config.journal_dir.join(&config.status_file);
        if status_path.is_file() {
            match read_status(&status_path) {
                Ok(snapshot) => store.update_status(snapshot),
                Err(e) => debug!(error = %e, "No initial status snapshot"),
            }
        }

        let (event_tx, event_rx) = unbounded();
        let mut fs_watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;
        fs_watcher.watch(&config.journal_dir, RecursiveMode::NonRecursive)?;

        let stats = Arc::new(IngestStats::default());
        let dispatcher = Dispatcher::spawn(handlers, &config.dispatch, Arc::clone(&stats))
            .map_err(|source| IngestError::Spawn {
                name: "dispatcher",
                source,
            })?;

        let positions = Arc::new(Mutex::new(table));
        let (stop_tx, stop_rx) = bounded(1);
        let watcher = JournalWatcher {
            journal_dir: config.journal_dir.clone(),
            status_file: config.status_file.clone(),
            store,
            positions: Arc::clone(&positions),
            stats: Arc::clone(&stats),
            dispatcher,
            debouncer: StatusDebouncer::new(config.status_debounce),
            active,
            retiring: VecDeque::new(),
            retry_at: None,
        };
        let catch_up = config.catch_up;

        let thread = thread::Builder::new()
            .name("edjournal-watcher".to_string())
            .spawn(move || watcher.run(fs_watcher, event_rx, stop_rx, catch_up))
            .map_err(|source| IngestError::Spawn {
                name: "watcher",
                source,
            })?;

        Ok(WatcherHandle {
            directory: config.journal_dir,
            stop_tx,
            thread: Mutex::new(Some(thread)),
            positions,
            stats,
        })
    }

    fn run(
        mut self,
        fs_watcher: RecommendedWatcher,
        events: Receiver<notify::Result<Event>>,
        stop: Receiver<()>,
        catch_up: bool,
    ) {
        let active = self.active.as_ref().map(|f| f.path.clone());
        info!(
            dir = %self.journal_dir.display(),
            active = ?active,
            catch_up,
            "Journal watcher started"
        );
        self.dispatch(IngestBatch::SystemEvent(SystemEvent::Started {
            directory: self.journal_dir.clone(),
            active: active.clone(),
        }));
        if catch_up {
            self.drain_active();
        }

        loop {
            let due = match (self.debouncer.deadline(), self.retry_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            let timer = match due {
                Some(due) => after(due.saturating_duration_since(Instant::now())),
                None => never(),
            };

            select! {
                recv(stop) -> _ => break,
                recv(events) -> msg => {
                    // a pending stop wins over queued notifications
                    if !matches!(stop.try_recv(), Err(TryRecvError::Empty)) {
                        break;
                    }
                    match msg {
                        Ok(Ok(event)) => self.handle_event(event),
                        Ok(Err(e)) => warn!(error = %e, "Filesystem watch error"),
                        Err(_) => {
                            warn!("Filesystem watch channel closed");
                            break;
                        }
                    }
                },
                recv(timer) -> _ => {},
            }

            let now = Instant::now();
            if let Some(snapshot) = self.debouncer.flush_due(now) {
                self.dispatch(IngestBatch::StatusUpdate(snapshot));
            }
            if self.retry_at.is_some_and(|at| at <= now) {
                self.drain_active();
            }
        }

        drop(fs_watcher);
        if !self.retiring.is_empty() && !self.finish_retiring() {
            warn!(
                pending = self.retiring.len(),
                "Stopping with rotated-out journals not fully drained"
            );
        }
        if let Some(snapshot) = self.debouncer.take_pending() {
            self.dispatch(IngestBatch::StatusUpdate(snapshot));
        }
        self.dispatch(IngestBatch::SystemEvent(SystemEvent::Stopped));
        if !self.dispatcher.shutdown() {
            warn!(dir = %self.journal_dir.display(), "Handlers did not finish queued batches before stop");
        }

        let stats = self.stats.snapshot();
        info!(
            dir = %self.journal_dir.display(),
            records = stats.records_decoded,
            decode_failures = stats.decode_failures,
            rotations = stats.rotations,
            "Journal watcher stopped"
        );
    }

    fn handle_event(&mut self, event: Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other => {}
            _ => return,
        }

        for path in &event.paths {
            let Some(name) = path.file_name() else {
                continue;
            };
            // Key everything by our own directory path; notify may report
            // a canonicalized form.
            let path = self.journal_dir.join(name);

            if name == self.status_file.as_str() {
                self.on_status(&path);
            } else if let Some(file) = JournalFile::from_path(&path, false) {
                self.on_journal(file);
            }
        }
    }

    fn on_journal(&mut self, file: JournalFile) {
        let retiring = self.retiring.iter().any(|(old, _)| *old == file.path);
        if retiring || self.active.as_ref().is_some_and(|a| a.path == file.path) {
            self.drain_active();
            return;
        }

        let (tracked, retired) = {
            let table = self.positions.lock();
            (
                table.tracked.contains_key(&file.path),
                table.retired.contains_key(&file.path),
            )
        };
        if retired {
            debug!(path = %file.path.display(), "Ignoring change to retired journal");
            return;
        }

        let newer = self.active.as_ref().map_or(true, |a| file.is_newer_than(a));
        if newer {
            self.rotate(file);
        } else if tracked {
            self.drain(&file.path);
        } else {
            match ReadPosition::at_end(&file.path) {
                Ok(pos) => {
                    debug!(path = %file.path.display(), "Tracking older journal file");
                    self.positions.lock().tracked.insert(file.path, pos);
                }
                Err(e) => debug!(path = %file.path.display(), error = %e, "Cannot position journal file"),
            }
        }
    }

    fn rotate(&mut self, next: JournalFile) {
        let previous = self.active.take().map(|p| p.path);

        self.stats.record_rotation();
        info!(
            from = ?previous.as_ref().map(|p| p.display().to_string()),
            to = %next.path.display(),
            "Journal rotated"
        );

        {
            let mut table = self.positions.lock();
            table
                .tracked
                .insert(next.path.clone(), ReadPosition::at_start(&next.path));
            table.active = Some(next.path.clone());
        }
        let path = next.path.clone();
        self.active = Some(next);

        match previous {
            Some(prev) => self.retiring.push_back((prev, path)),
            None => self.dispatch(IngestBatch::SystemEvent(SystemEvent::Rotated {
                from: None,
                to: path,
            })),
        }
        self.drain_active();
    }

    /// Finish pending retirements, then read the active file.
    fn drain_active(&mut self) {
        if !self.finish_retiring() {
            return;
        }
        if let Some(path) = self.active.as_ref().map(|f| f.path.clone()) {
            self.drain(&path);
        }
    }

    /// Final drain and retirement of rotated-out files, in rotation order.
    ///
    /// Stops at the first failed read and schedules a retry. Returns true
    /// once no file is left waiting.
    fn finish_retiring(&mut self) -> bool {
        while let Some((old, new)) = self.retiring.front().cloned() {
            if !self.drain(&old) {
                self.retry_at = Some(Instant::now() + RETIRE_RETRY_INTERVAL);
                return false;
            }
            self.positions.lock().retire(&old);
            self.retiring.pop_front();
            self.dispatch(IngestBatch::SystemEvent(SystemEvent::Rotated {
                from: Some(old),
                to: new,
            }));
        }
        self.retry_at = None;
        true
    }

    /// Read everything new in `path`, append it to the store and enqueue it.
    ///
    /// Returns false only when the read failed; untracked paths have
    /// nothing to read.
    fn drain(&mut self, path: &Path) -> bool {
        let Some(mut pos) = self.positions.lock().tracked.get(path).cloned() else {
            return true;
        };

        let outcome = match pos.read_new() {
            Ok(outcome) => outcome,
            Err(e) => {
                // position untouched; the next notification retries
                self.stats.record_read_error();
                warn!(path = %path.display(), offset = pos.offset, error = %e, "Journal read failed");
                return false;
            }
        };
        self.positions.lock().tracked.insert(path.to_path_buf(), pos);

        for failure in &outcome.failures {
            warn!(
                path = %path.display(),
                offset = failure.offset,
                reason = failure.error.reason(),
                error = %failure.error,
                "Skipping undecodable journal line"
            );
        }
        self.stats.record_read(
            outcome.lines,
            outcome.records.len(),
            outcome.failures.len(),
        );
        if outcome.records.is_empty() {
            return true;
        }

        let events: Vec<ClassifiedEvent> = outcome.records.into_iter().map(classify_record).collect();
        debug!(path = %path.display(), count = events.len(), "Ingested journal events");
        self.store.append_batch(events.clone());
        self.dispatch(IngestBatch::JournalEntries {
            path: path.to_path_buf(),
            events,
        });
        true
    }

    fn on_status(&mut self, path: &Path) {
        match read_status(path) {
            Ok(snapshot) => {
                self.stats.record_status(true);
                self.store.update_status(snapshot.clone());
                if let Some(snapshot) = self.debouncer.offer(snapshot, Instant::now()) {
                    self.dispatch(IngestBatch::StatusUpdate(snapshot));
                }
            }
            Err(e @ FileReadError::Empty { .. }) => {
                debug!(error = %e, "Status file empty, keeping previous snapshot");
            }
            Err(e) => {
                self.stats.record_status(false);
                warn!(error = %e, "Status file unreadable, keeping previous snapshot");
            }
        }
    }

    fn dispatch(&self, batch: IngestBatch) {
        let kind = batch.kind();
        match self.dispatcher.send(batch) {
            Enqueued::Queued => {}
            Enqueued::Dropped => warn!(?kind, "Handler queue full, batch dropped"),
            Enqueued::Closed => warn!(?kind, "Dispatcher gone, batch dropped"),
        }
    }
}

/// Handle to a running watcher. Dropping it stops the watcher.
pub struct WatcherHandle {
    directory: PathBuf,
    stop_tx: Sender<()>,
    thread: Mutex<Option<JoinHandle<()>>>,
    positions: Arc<Mutex<PositionTable>>,
    stats: Arc<IngestStats>,
}

impl WatcherHandle {
    /// Stop watching and wait for the in-flight read and queued batches.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        let _ = self.stop_tx.try_send(());
        if thread.join().is_err() {
            error!(dir = %self.directory.display(), "Watcher thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Copy of the current and retired read positions.
    pub fn positions(&self) -> PositionTable {
        self.positions.lock().clone()
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
