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

//! Event Store - bounded, concurrently readable index of journal events
//!
//! Events are retained in arrival order up to a configured bound; beyond it
//! the oldest arrival is evicted first, regardless of category.
//!
//! **Complexity:**
//! - `append`: O(1) amortized (one push plus at most one eviction per index)
//! - `query_by_type` / `query_by_category`: O(limit)
//! - `query_recent` / `query_filtered` / `statistics`: O(retained) full scan,
//!   narrowed to one index when the filter names a type or category
//!
//! **Ordering:** indexed queries return newest arrival first. Scans return
//! newest timestamp first, ties broken by newest arrival. The journal is
//! written in time order, so both orders agree for well-formed input.

use crate::error::{StoreError, StoreResult};
use crate::filter::EventFilter;
use crate::stats::StoreStatistics;
use chrono::{DateTime, Utc};
use edjournal_core::{Category, ClassifiedEvent, GameState, StatusSnapshot};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info};

/// Default maximum number of retained events
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Configuration for the event store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Retention bound; the oldest events are evicted beyond it
    pub max_events: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl StoreConfig {
    pub fn with_max_events(max_events: usize) -> Self {
        Self { max_events }
    }
}

/// Thread-safe store of classified events and derived state.
///
/// Share it across threads via `Arc`. One writer (the ingestion loop) and
/// any number of readers may use it concurrently.
pub struct EventStore {
    inner: RwLock<StoreInner>,
}

struct StoreInner {
    max_events: usize,
    /// Primary log; `events[i]` has sequence number `first_seq + i`
    events: VecDeque<ClassifiedEvent>,
    first_seq: u64,
    next_seq: u64,
    by_type: HashMap<String, VecDeque<u64>>,
    by_category: HashMap<Category, VecDeque<u64>>,
    state: GameState,
    status: Option<StatusSnapshot>,
    total_appended: u64,
    total_evicted: u64,
}

impl EventStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        if config.max_events == 0 {
            return Err(StoreError::InvalidRetention(config.max_events));
        }
        Ok(Self {
            inner: RwLock::new(StoreInner::new(config.max_events)),
        })
    }

    /// Create a store with the default retention bound.
    pub fn with_defaults() -> Self {
        Self {
            inner: RwLock::new(StoreInner::new(DEFAULT_MAX_EVENTS)),
        }
    }

    /// Append one event, folding it into the game state when relevant.
    ///
    /// Returns the event's arrival sequence number.
    pub fn append(&self, event: ClassifiedEvent) -> u64 {
        let mut inner = self.inner.write();
        let seq = inner.push(event);
        inner.enforce_retention();
        seq
    }

    /// Append a batch under one critical section. Returns the number of
    /// events appended.
    pub fn append_batch(&self, events: Vec<ClassifiedEvent>) -> usize {
        if events.is_empty() {
            return 0;
        }
        let count = events.len();
        let mut inner = self.inner.write();
        for event in events {
            inner.push(event);
            inner.enforce_retention();
        }
        count
    }

    /// Newest events with the given type tag, at most `limit`.
    ///
    /// Ordered by arrival, newest first, in O(limit). Arrival order is file
    /// order, which matches timestamp order for a journal written by one
    /// game client; use [`query_filtered`](Self::query_filtered) for strict
    /// timestamp ordering.
    pub fn query_by_type(&self, record_type: &str, limit: usize) -> Vec<ClassifiedEvent> {
        let inner = self.inner.read();
        match inner.by_type.get(record_type) {
            Some(seqs) => inner.collect_newest(seqs, limit),
            None => Vec::new(),
        }
    }

    /// Newest events in the given category, at most `limit`.
    ///
    /// Ordered by arrival like [`query_by_type`](Self::query_by_type).
    pub fn query_by_category(&self, category: Category, limit: usize) -> Vec<ClassifiedEvent> {
        let inner = self.inner.read();
        match inner.by_category.get(&category) {
            Some(seqs) => inner.collect_newest(seqs, limit),
            None => Vec::new(),
        }
    }

    /// Most recent event with the given type tag.
    pub fn last_of_type(&self, record_type: &str) -> Option<ClassifiedEvent> {
        self.query_by_type(record_type, 1).into_iter().next()
    }

    /// Events with a timestamp within `[now - window, now]`.
    pub fn query_recent(&self, window: Duration) -> Vec<ClassifiedEvent> {
        self.query_recent_at(window, Utc::now())
    }

    /// [`query_recent`](Self::query_recent) against an explicit clock.
    pub fn query_recent_at(&self, window: Duration, now: DateTime<Utc>) -> Vec<ClassifiedEvent> {
        let filter = EventFilter::new().between(window_start(now, window), now);
        self.query_filtered(&filter)
    }

    /// Events matching every predicate of `filter`, newest first.
    pub fn query_filtered(&self, filter: &EventFilter) -> Vec<ClassifiedEvent> {
        let matcher = filter.matcher();
        let inner = self.inner.read();

        // Narrow to the smaller index when the filter names one.
        let by_type = filter
            .record_type
            .as_ref()
            .map(|t| inner.by_type.get(t.as_str()));
        let by_category = filter.category.map(|c| inner.by_category.get(&c));
        let candidates: Option<&VecDeque<u64>> = match (by_type, by_category) {
            (Some(None), _) | (_, Some(None)) => return Vec::new(),
            (Some(Some(a)), Some(Some(b))) => Some(if a.len() <= b.len() { a } else { b }),
            (Some(Some(a)), None) => Some(a),
            (None, Some(Some(b))) => Some(b),
            (None, None) => None,
        };

        let mut out: Vec<ClassifiedEvent> = match candidates {
            Some(seqs) => seqs
                .iter()
                .rev()
                .filter_map(|seq| inner.get(*seq))
                .filter(|e| matcher.matches(e))
                .cloned()
                .collect(),
            None => inner
                .events
                .iter()
                .rev()
                .filter(|e| matcher.matches(e))
                .cloned()
                .collect(),
        };
        drop(inner);

        // Stable: equal timestamps keep newest-arrival-first.
        out.sort_by_key(|e| Reverse(e.timestamp()));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        out
    }

    /// Copy of the current game state.
    pub fn current_state(&self) -> GameState {
        self.inner.read().state.clone()
    }

    /// Copy of the latest status snapshot.
    pub fn status(&self) -> Option<StatusSnapshot> {
        self.inner.read().status.clone()
    }

    /// Replace the status snapshot.
    pub fn update_status(&self, snapshot: StatusSnapshot) {
        self.inner.write().status = Some(snapshot);
    }

    /// Counts and bounds of the retained events.
    pub fn statistics(&self) -> StoreStatistics {
        let inner = self.inner.read();
        let counts_by_category: BTreeMap<Category, usize> = inner
            .by_category
            .iter()
            .filter(|(_, seqs)| !seqs.is_empty())
            .map(|(category, seqs)| (*category, seqs.len()))
            .collect();

        let mut oldest: Option<DateTime<Utc>> = None;
        let mut newest: Option<DateTime<Utc>> = None;
        for event in &inner.events {
            let ts = event.timestamp();
            oldest = Some(oldest.map_or(ts, |o| o.min(ts)));
            newest = Some(newest.map_or(ts, |n| n.max(ts)));
        }

        StoreStatistics {
            counts_by_category,
            total_retained: inner.events.len(),
            total_appended: inner.total_appended,
            total_evicted: inner.total_evicted,
            retention_limit: inner.max_events,
            oldest,
            newest,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    pub fn retention_limit(&self) -> usize {
        self.inner.read().max_events
    }

    /// Change the retention bound, evicting immediately if it shrank.
    pub fn set_retention(&self, max_events: usize) -> StoreResult<()> {
        if max_events == 0 {
            return Err(StoreError::InvalidRetention(max_events));
        }
        let mut inner = self.inner.write();
        inner.max_events = max_events;
        let before = inner.total_evicted;
        inner.enforce_retention();
        debug!(
            max_events,
            evicted = inner.total_evicted - before,
            "Retention bound changed"
        );
        Ok(())
    }

    /// Drop every retained event and reset the derived state.
    ///
    /// Atomic with respect to readers. Sequence numbers keep increasing
    /// across a clear. Returns the number of events dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let dropped = inner.events.len();
        let next_seq = inner.next_seq;
        let max_events = inner.max_events;
        *inner = StoreInner::new(max_events);
        inner.first_seq = next_seq;
        inner.next_seq = next_seq;
        info!(dropped, "Event store cleared");
        dropped
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl StoreInner {
    fn new(max_events: usize) -> Self {
        Self {
            max_events,
            events: VecDeque::with_capacity(max_events.min(DEFAULT_MAX_EVENTS)),
            first_seq: 0,
            next_seq: 0,
            by_type: HashMap::new(),
            by_category: HashMap::new(),
            state: GameState::default(),
            status: None,
            total_appended: 0,
            total_evicted: 0,
        }
    }

    fn push(&mut self, event: ClassifiedEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.state.apply(&event);
        self.by_type
            .entry(event.record_type().to_string())
            .or_default()
            .push_back(seq);
        self.by_category
            .entry(event.category)
            .or_default()
            .push_back(seq);
        self.events.push_back(event);
        self.total_appended += 1;
        seq
    }

    fn enforce_retention(&mut self) {
        while self.events.len() > self.max_events {
            let Some(evicted) = self.events.pop_front() else {
                break;
            };
            let seq = self.first_seq;
            self.first_seq += 1;
            self.total_evicted += 1;

            // Indices are FIFO too: the evicted seq is at the front of both.
            let tag = evicted.record_type();
            if let Some(seqs) = self.by_type.get_mut(tag) {
                debug_assert_eq!(seqs.front(), Some(&seq));
                seqs.pop_front();
                if seqs.is_empty() {
                    self.by_type.remove(tag);
                }
            }
            if let Some(seqs) = self.by_category.get_mut(&evicted.category) {
                debug_assert_eq!(seqs.front(), Some(&seq));
                seqs.pop_front();
                if seqs.is_empty() {
                    self.by_category.remove(&evicted.category);
                }
            }
        }
    }

    fn get(&self, seq: u64) -> Option<&ClassifiedEvent> {
        let offset = seq.checked_sub(self.first_seq)?;
        self.events.get(usize::try_from(offset).ok()?)
    }

    fn collect_newest(&self, seqs: &VecDeque<u64>, limit: usize) -> Vec<ClassifiedEvent> {
        seqs.iter()
            .rev()
            .take(limit)
            .filter_map(|seq| self.get(*seq))
            .cloned()
            .collect()
    }
}

fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use edjournal_core::{classify_record, decode_line};

    fn event_at(secs: i64, json_tail: &str) -> ClassifiedEvent {
        let ts = Utc.timestamp_opt(1_735_689_600 + secs, 0).unwrap();
        let line = format!(
            r#"{{"timestamp":"{}",{}}}"#,
            ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            json_tail
        );
        classify_record(decode_line(line.as_bytes()).unwrap())
    }

    fn jump(secs: i64, system: &str) -> ClassifiedEvent {
        event_at(secs, &format!(r#""type":"FSDJump","StarSystem":"{system}","JumpDist":10.0"#))
    }

    fn small_store(max: usize) -> EventStore {
        EventStore::new(StoreConfig::with_max_events(max)).unwrap()
    }

    #[test]
    fn test_fsd_jump_by_category() {
        let store = EventStore::default();
        let event = classify_record(
            decode_line(br#"{"timestamp":"2025-01-01T00:00:00Z","type":"FSDJump","StarSystem":"Sol"}"#)
                .unwrap(),
        );
        store.append(event);

        let found = store.query_by_category(Category::Navigation, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key_fields["StarSystem"], "Sol");
        assert_eq!(store.current_state().star_system.as_deref(), Some("Sol"));
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        assert_eq!(
            EventStore::new(StoreConfig::with_max_events(0)).err(),
            Some(StoreError::InvalidRetention(0))
        );
        let store = small_store(3);
        assert!(store.set_retention(0).is_err());
        assert_eq!(store.retention_limit(), 3);
    }

    #[test]
    fn test_fifo_eviction_keeps_newest() {
        let store = small_store(3);
        for i in 0..5 {
            store.append(jump(i, &format!("System {i}")));
        }

        let stats = store.statistics();
        assert_eq!(stats.total_retained, 3);
        assert_eq!(stats.total_appended, 5);
        assert_eq!(stats.total_evicted, 2);

        let systems: Vec<String> = store
            .query_by_type("FSDJump", 10)
            .iter()
            .map(|e| e.key_str("StarSystem").unwrap().to_string())
            .collect();
        assert_eq!(systems, vec!["System 4", "System 3", "System 2"]);
    }

    #[test]
    fn test_eviction_ignores_category() {
        let store = small_store(2);
        store.append(event_at(0, r#""type":"Music","MusicTrack":"Exploration""#));
        store.append(jump(1, "Sol"));
        store.append(jump(2, "Achenar"));

        assert!(store.query_by_type("Music", 10).is_empty());
        assert_eq!(store.statistics().count(Category::Session), 0);
        assert_eq!(store.statistics().count(Category::Navigation), 2);
    }

    #[test]
    fn test_query_limit_and_order() {
        let store = EventStore::default();
        for i in 0..10 {
            store.append(jump(i, &format!("S{i}")));
        }
        let top = store.query_by_category(Category::Navigation, 3);
        assert_eq!(top.len(), 3);
        assert!(top[0].timestamp() > top[1].timestamp());
        assert!(top[1].timestamp() > top[2].timestamp());
        assert!(store.query_by_type("Scan", 3).is_empty());
        assert!(store.query_by_type("FSDJump", 0).is_empty());
    }

    #[test]
    fn test_query_recent_window() {
        let store = EventStore::default();
        for i in 0..10 {
            store.append(jump(i * 60, &format!("S{i}")));
        }
        let now = Utc.timestamp_opt(1_735_689_600 + 9 * 60, 0).unwrap();

        let recent = store.query_recent_at(Duration::from_secs(120), now);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].key_str("StarSystem"), Some("S9"));

        let everything = store.query_recent_at(Duration::from_secs(u64::MAX), now);
        assert_eq!(everything.len(), 10);

        let long_ago = now - chrono::Duration::days(30);
        assert!(store
            .query_recent_at(Duration::from_secs(60), long_ago)
            .is_empty());
    }

    #[test]
    fn test_query_filtered_combines_predicates() {
        let store = EventStore::default();
        store.append(jump(0, "Sol"));
        store.append(event_at(
            10,
            r#""type":"Docked","StarSystem":"Sol","StationName":"Abraham Lincoln""#,
        ));
        store.append(jump(20, "Alpha Centauri"));
        store.append(event_at(
            30,
            r#""type":"Docked","StarSystem":"Alpha Centauri","StationName":"Hutton Orbital""#,
        ));

        let docked_in_sol =
            store.query_filtered(&EventFilter::new().record_type("Docked").system_name("sol"));
        assert_eq!(docked_in_sol.len(), 1);
        assert_eq!(docked_in_sol[0].key_str("StationName"), Some("Abraham Lincoln"));

        let hutton = store.query_filtered(&EventFilter::new().text("HUTTON"));
        assert_eq!(hutton.len(), 1);

        let nav = store.query_filtered(
            &EventFilter::new()
                .category(Category::Navigation)
                .since(Utc.timestamp_opt(1_735_689_600 + 15, 0).unwrap()),
        );
        assert_eq!(nav.len(), 2);
        assert_eq!(nav[0].record_type(), "Docked");

        let none = store.query_filtered(&EventFilter::new().record_type("Scan"));
        assert!(none.is_empty());

        let limited = store.query_filtered(&EventFilter::new().limit(1));
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].key_str("StationName"), Some("Hutton Orbital"));
    }

    #[test]
    fn test_filtered_orders_by_timestamp() {
        let store = EventStore::default();
        // written out of order
        store.append(jump(50, "Late"));
        store.append(jump(10, "Early"));
        let all = store.query_filtered(&EventFilter::new());
        assert_eq!(all[0].key_str("StarSystem"), Some("Late"));
        assert_eq!(all[1].key_str("StarSystem"), Some("Early"));

        // indexed lookups stay in arrival order
        let by_type = store.query_by_type("FSDJump", 10);
        assert_eq!(by_type[0].key_str("StarSystem"), Some("Early"));
        let by_category = store.query_by_category(Category::Navigation, 10);
        assert_eq!(by_category[1].key_str("StarSystem"), Some("Late"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = EventStore::default();
        store.append(jump(0, "Sol"));
        store.update_status(edjournal_core::StatusSnapshot::from_record(
            decode_line(br#"{"timestamp":"2025-01-01T00:00:00Z","event":"Status","Flags":1}"#).unwrap(),
        ));

        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
        assert!(store.status().is_none());
        assert_eq!(store.current_state(), GameState::default());
        assert!(store.query_by_type("FSDJump", 10).is_empty());

        let seq = store.append(jump(1, "Achenar"));
        assert_eq!(seq, 1);
        assert_eq!(store.query_by_type("FSDJump", 10).len(), 1);
    }

    #[test]
    fn test_shrinking_retention_evicts() {
        let store = small_store(10);
        for i in 0..6 {
            store.append(jump(i, "Sol"));
        }
        store.set_retention(2).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.statistics().total_evicted, 4);
    }

    #[test]
    fn test_statistics_bounds() {
        let store = EventStore::default();
        assert!(store.statistics().is_empty());
        store.append(jump(30, "B"));
        store.append(jump(10, "A"));
        let stats = store.statistics();
        assert_eq!(stats.oldest, Some(Utc.timestamp_opt(1_735_689_600 + 10, 0).unwrap()));
        assert_eq!(stats.newest, Some(Utc.timestamp_opt(1_735_689_600 + 30, 0).unwrap()));
    }
}
