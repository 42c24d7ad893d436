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

//! Batch delivery to registered handlers.
//!
//! The watch loop never calls handlers itself. It enqueues [`IngestBatch`]es
//! on a bounded channel; a dedicated thread drains the channel and invokes
//! each handler in registration order. A handler error or panic is logged
//! and counted, and delivery continues with the next handler.
//!
//! Enqueueing never blocks: when handlers fall a full queue behind, new
//! batches are dropped and counted. Shutdown waits for the queue to drain
//! for at most `shutdown_timeout`, then leaves the consumer thread to finish
//! on its own.

use crate::error::HandlerError;
use crate::stats::IngestStats;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use edjournal_core::{ClassifiedEvent, StatusSnapshot};
use serde::Serialize;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default capacity of the batch queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default wait for queued batches at shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Dispatcher settings
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Batches held before new ones are dropped
    pub queue_capacity: usize,
    /// How long shutdown waits for handlers to work through the queue
    pub shutdown_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Result of [`Dispatcher::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// The queue was full; the batch was discarded
    Dropped,
    /// The dispatcher has shut down
    Closed,
}

/// Kind tag of an [`IngestBatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BatchKind {
    JournalEntries,
    StatusUpdate,
    SystemEvent,
}

/// Watcher lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SystemEvent {
    Started {
        directory: PathBuf,
        active: Option<PathBuf>,
    },
    /// The tail target moved to a newer file; `from` was fully drained first.
    Rotated {
        from: Option<PathBuf>,
        to: PathBuf,
    },
    Stopped,
}

/// Unit of delivery to handlers
#[derive(Debug, Clone, Serialize)]
pub enum IngestBatch {
    /// Events decoded from one read of one journal file, in file order
    JournalEntries {
        path: PathBuf,
        events: Vec<ClassifiedEvent>,
    },
    StatusUpdate(StatusSnapshot),
    SystemEvent(SystemEvent),
}

impl IngestBatch {
    pub fn kind(&self) -> BatchKind {
        match self {
            IngestBatch::JournalEntries { .. } => BatchKind::JournalEntries,
            IngestBatch::StatusUpdate(_) => BatchKind::StatusUpdate,
            IngestBatch::SystemEvent(_) => BatchKind::SystemEvent,
        }
    }

    pub fn events(&self) -> &[ClassifiedEvent] {
        match self {
            IngestBatch::JournalEntries { events, .. } => events,
            _ => &[],
        }
    }
}

/// Consumer of ingested batches.
///
/// Runs on the dispatcher thread. Must not call `WatcherHandle::stop`.
pub trait BatchHandler: Send + Sync {
    fn handle(&self, batch: &IngestBatch) -> Result<(), HandlerError>;

    /// Handler name used in logs
    fn name(&self) -> &str;
}

/// [`BatchHandler`] built from a closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&IngestBatch) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> BatchHandler for FnHandler<F>
where
    F: Fn(&IngestBatch) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, batch: &IngestBatch) -> Result<(), HandlerError> {
        (self.f)(batch)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Owns the batch queue and its consumer thread.
pub struct Dispatcher {
    sender: Option<Sender<IngestBatch>>,
    thread: Option<JoinHandle<()>>,
    done: Receiver<()>,
    shutdown_timeout: Duration,
    stats: Arc<IngestStats>,
}

impl Dispatcher {
    /// Start the consumer thread.
    pub fn spawn(
        handlers: Vec<Arc<dyn BatchHandler>>,
        config: &DispatchConfig,
        stats: Arc<IngestStats>,
    ) -> io::Result<Self> {
        let (sender, receiver) = bounded::<IngestBatch>(config.queue_capacity.max(1));
        let (done_tx, done) = bounded::<()>(1);
        let consumer_stats = Arc::clone(&stats);

        let thread = thread::Builder::new()
            .name("edjournal-dispatch".to_string())
            .spawn(move || {
                for batch in receiver.iter() {
                    deliver(&handlers, &batch, &consumer_stats);
                }
                debug!("Dispatcher queue closed");
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
            done,
            shutdown_timeout: config.shutdown_timeout,
            stats,
        })
    }

    /// Enqueue a batch without blocking.
    pub fn send(&self, batch: IngestBatch) -> Enqueued {
        let Some(sender) = &self.sender else {
            return Enqueued::Closed;
        };
        match sender.try_send(batch) {
            Ok(()) => Enqueued::Queued,
            Err(TrySendError::Full(_)) => {
                self.stats.record_batch_dropped();
                Enqueued::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Enqueued::Closed,
        }
    }

    /// Close the queue and wait, up to the shutdown timeout, for queued
    /// batches to be delivered.
    ///
    /// Returns false if handlers were still busy when the timeout expired;
    /// the consumer thread then keeps delivering in the background.
    pub fn shutdown(&mut self) -> bool {
        self.sender.take();
        let Some(thread) = self.thread.take() else {
            return true;
        };
        match self.done.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.join().is_err() {
                    error!("Dispatcher thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Handlers still busy at shutdown, detaching dispatcher"
                );
                false
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn deliver(handlers: &[Arc<dyn BatchHandler>], batch: &IngestBatch, stats: &IngestStats) {
    let kind = batch.kind();
    for handler in handlers {
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(batch)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

        if let Err(e) = result {
            stats.record_handler_failure();
            match e {
                HandlerError::Panicked(_) => {
                    error!(handler = handler.name(), ?kind, error = %e, "Batch handler panicked")
                }
                HandlerError::Failed(_) => {
                    warn!(handler = handler.name(), ?kind, error = %e, "Batch handler failed")
                }
            }
        }
    }
    stats.record_batch_dispatched();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
