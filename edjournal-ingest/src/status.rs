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

//! Status file reads and dispatch debouncing.

use crate::error::FileReadError;
use edjournal_core::{decode_object, StatusSnapshot};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Name of the status file inside the journal directory
pub const STATUS_FILE_NAME: &str = "Status.json";

/// Minimum spacing between two status dispatches
pub const DEFAULT_STATUS_DEBOUNCE: Duration = Duration::from_millis(250);

/// Read and decode the whole status file.
///
/// The game truncates and rewrites the file, so an empty or half-written
/// read is expected now and then; callers keep their previous snapshot.
pub fn read_status(path: &Path) -> Result<StatusSnapshot, FileReadError> {
    let body = fs::read(path).map_err(|source| FileReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FileReadError::Empty {
            path: path.to_path_buf(),
        });
    }
    let record = decode_object(&body).map_err(|source| FileReadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(StatusSnapshot::from_record(record))
}

/// Coalesces status updates so at most one is dispatched per window.
///
/// An update arriving inside the window replaces any held one and is
/// released by [`flush_due`](Self::flush_due) once the window closes, so
/// the last state observed is always delivered.
#[derive(Debug)]
pub struct StatusDebouncer {
    window: Duration,
    last_dispatch: Option<Instant>,
    pending: Option<StatusSnapshot>,
}

impl StatusDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_dispatch: None,
            pending: None,
        }
    }

    /// Offer a new snapshot. Returns it back if it should go out now.
    pub fn offer(&mut self, snapshot: StatusSnapshot, now: Instant) -> Option<StatusSnapshot> {
        match self.last_dispatch {
            Some(last) if now.saturating_duration_since(last) < self.window => {
                self.pending = Some(snapshot);
                None
            }
            _ => {
                self.pending = None;
                self.last_dispatch = Some(now);
                Some(snapshot)
            }
        }
    }

    /// When the held snapshot becomes due, if one is held.
    pub fn deadline(&self) -> Option<Instant> {
        match (&self.pending, self.last_dispatch) {
            (Some(_), Some(last)) => Some(last + self.window),
            (Some(_), None) => Some(Instant::now()),
            _ => None,
        }
    }

    /// Release the held snapshot if its window has closed.
    pub fn flush_due(&mut self, now: Instant) -> Option<StatusSnapshot> {
        let due = self.deadline()?;
        if now < due {
            return None;
        }
        self.last_dispatch = Some(now);
        self.pending.take()
    }

    /// Release the held snapshot regardless of the window.
    pub fn take_pending(&mut self) -> Option<StatusSnapshot> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for StatusDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edjournal_core::decode_line;
    use tempfile::tempdir;

    fn snapshot(flags: u64) -> StatusSnapshot {
        let line = format!(r#"{{"timestamp":"2025-01-01T00:00:00Z","event":"Status","Flags":{flags}}}"#);
        StatusSnapshot::from_record(decode_line(line.as_bytes()).unwrap())
    }

    #[test]
    fn test_read_status() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STATUS_FILE_NAME);

        fs::write(
            &path,
            "{ \"timestamp\":\"2025-01-01T00:00:00Z\", \"event\":\"Status\",\n  \"Flags\":16777225, \"Balance\":12345 }\n",
        )
        .unwrap();
        let status = read_status(&path).unwrap();
        assert!(status.docked());
        assert_eq!(status.balance, Some(12345));

        fs::write(&path, "").unwrap();
        assert!(matches!(read_status(&path), Err(FileReadError::Empty { .. })));

        fs::write(&path, "{\"timestamp\":").unwrap();
        assert!(matches!(read_status(&path), Err(FileReadError::Decode { .. })));

        assert!(matches!(
            read_status(&dir.path().join("missing.json")),
            Err(FileReadError::Io { .. })
        ));
    }

    #[test]
    fn test_first_update_goes_out_immediately() {
        let mut debouncer = StatusDebouncer::new(Duration::from_millis(250));
        let now = Instant::now();
        assert!(debouncer.offer(snapshot(1), now).is_some());
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn test_burst_is_coalesced_to_last() {
        let mut debouncer = StatusDebouncer::new(Duration::from_millis(250));
        let t0 = Instant::now();
        assert!(debouncer.offer(snapshot(1), t0).is_some());
        assert!(debouncer.offer(snapshot(2), t0 + Duration::from_millis(10)).is_none());
        assert!(debouncer.offer(snapshot(3), t0 + Duration::from_millis(20)).is_none());

        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(250)));
        assert!(debouncer.flush_due(t0 + Duration::from_millis(100)).is_none());

        let flushed = debouncer.flush_due(t0 + Duration::from_millis(250)).unwrap();
        assert_eq!(flushed.flags, 3);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_update_after_window_goes_out() {
        let mut debouncer = StatusDebouncer::new(Duration::from_millis(250));
        let t0 = Instant::now();
        debouncer.offer(snapshot(1), t0);
        debouncer.offer(snapshot(2), t0 + Duration::from_millis(50));

        let late = debouncer.offer(snapshot(3), t0 + Duration::from_millis(300)).unwrap();
        assert_eq!(late.flags, 3);
        // the held intermediate state is superseded
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_take_pending_on_shutdown() {
        let mut debouncer = StatusDebouncer::default();
        let t0 = Instant::now();
        debouncer.offer(snapshot(1), t0);
        debouncer.offer(snapshot(2), t0);
        assert_eq!(debouncer.take_pending().map(|s| s.flags), Some(2));
        assert!(debouncer.take_pending().is_none());
    }
}
