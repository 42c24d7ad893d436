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

//! Ingestion counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by the watch loop and the dispatcher.
#[derive(Debug, Default)]
pub struct IngestStats {
    lines_read: AtomicU64,
    records_decoded: AtomicU64,
    decode_failures: AtomicU64,
    read_errors: AtomicU64,
    batches_dispatched: AtomicU64,
    batches_dropped: AtomicU64,
    handler_failures: AtomicU64,
    rotations: AtomicU64,
    status_updates: AtomicU64,
    status_failures: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStatsSnapshot {
    pub lines_read: u64,
    pub records_decoded: u64,
    pub decode_failures: u64,
    pub read_errors: u64,
    pub batches_dispatched: u64,
    /// Batches discarded because the handler queue was full
    pub batches_dropped: u64,
    pub handler_failures: u64,
    pub rotations: u64,
    pub status_updates: u64,
    pub status_failures: u64,
}

impl IngestStats {
    #[inline]
    pub(crate) fn record_read(&self, lines: usize, decoded: usize, failed: usize) {
        self.lines_read.fetch_add(lines as u64, Ordering::Relaxed);
        self.records_decoded
            .fetch_add(decoded as u64, Ordering::Relaxed);
        self.decode_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_dispatched(&self) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_status(&self, ok: bool) {
        let counter = if ok {
            &self.status_updates
        } else {
            &self.status_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            status_failures: self.status_failures.load(Ordering::Relaxed),
        }
    }
}
