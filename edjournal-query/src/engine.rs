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

//! Query engine over a shared event store.
//!
//! The engine holds a weak reference: once the store is dropped every call
//! returns [`QueryError::StoreUnavailable`] instead of keeping the store
//! alive past shutdown.

use crate::error::{QueryError, QueryResult};
use crate::summary::{
    CombatSummary, CreditChange, ExplorationSummary, MissionSummary, SessionOverview,
    TradingSummary,
};
use chrono::{DateTime, Utc};
use edjournal_core::{Category, ClassifiedEvent, GameState, StatusSnapshot};
use edjournal_storage::{EventFilter, EventStore, StoreStatistics};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

/// Default result limit for list queries
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Upper bound applied to caller-supplied limits
pub const MAX_QUERY_LIMIT: usize = 10_000;

/// Window covering every retained event
pub const ALL_TIME: Duration = Duration::MAX;

/// Result of a single-entity lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

/// Read-only query API for the outer layers.
///
/// **Complexity:**
/// - `events_by_type` / `events_by_category` / `last_event`: O(limit)
/// - everything else: O(retained events) scan
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Weak<EventStore>,
}

impl QueryEngine {
    pub fn new(store: &Arc<EventStore>) -> Self {
        Self {
            store: Arc::downgrade(store),
        }
    }

    fn store(&self) -> QueryResult<Arc<EventStore>> {
        self.store.upgrade().ok_or(QueryError::StoreUnavailable)
    }

    pub fn is_available(&self) -> bool {
        self.store.strong_count() > 0
    }

    // ------------------------------------------------------------------
    // Pass-throughs
    // ------------------------------------------------------------------

    pub fn events_by_type(&self, record_type: &str, limit: usize) -> QueryResult<Vec<ClassifiedEvent>> {
        Ok(self.store()?.query_by_type(record_type, clamp(limit)))
    }

    /// Category given by name, case-insensitive (`"navigation"`, `"on_foot"`).
    pub fn events_by_category(&self, category: &str, limit: usize) -> QueryResult<Vec<ClassifiedEvent>> {
        let category: Category = category
            .parse()
            .map_err(|_| QueryError::UnknownCategory(category.to_string()))?;
        Ok(self.store()?.query_by_category(category, clamp(limit)))
    }

    pub fn recent_events(&self, window: Duration) -> QueryResult<Vec<ClassifiedEvent>> {
        Ok(self.store()?.query_recent(window))
    }

    /// Case-insensitive free-text search, newest first.
    pub fn search(&self, text: &str, limit: usize) -> QueryResult<Vec<ClassifiedEvent>> {
        let filter = EventFilter::new().text(text).limit(clamp(limit));
        Ok(self.store()?.query_filtered(&filter))
    }

    pub fn filtered(&self, filter: &EventFilter) -> QueryResult<Vec<ClassifiedEvent>> {
        Ok(self.store()?.query_filtered(filter))
    }

    pub fn last_event(&self, record_type: &str) -> QueryResult<Lookup<ClassifiedEvent>> {
        Ok(self.store()?.last_of_type(record_type).into())
    }

    pub fn current_state(&self) -> QueryResult<GameState> {
        Ok(self.store()?.current_state())
    }

    pub fn status(&self) -> QueryResult<Lookup<StatusSnapshot>> {
        Ok(self.store()?.status().into())
    }

    pub fn statistics(&self) -> QueryResult<StoreStatistics> {
        Ok(self.store()?.statistics())
    }

    // ------------------------------------------------------------------
    // Summaries
    // ------------------------------------------------------------------

    pub fn trading_summary(&self, window: Duration) -> QueryResult<TradingSummary> {
        let events = self.window_query(window, |f| f.category(Category::Trading))?;
        Ok(TradingSummary::from_events(&events))
    }

    /// Jumps come from navigation, everything else from exploration.
    pub fn exploration_summary(&self, window: Duration) -> QueryResult<ExplorationSummary> {
        let mut events = self.window_query(window, |f| f.category(Category::Exploration))?;
        events.extend(self.window_query(window, |f| f.record_type("FSDJump"))?);
        events.extend(self.window_query(window, |f| f.record_type("CarrierJump"))?);
        Ok(ExplorationSummary::from_events(&events))
    }

    pub fn combat_summary(&self, window: Duration) -> QueryResult<CombatSummary> {
        let events = self.window_query(window, |f| f.category(Category::Combat))?;
        Ok(CombatSummary::from_events(&events))
    }

    pub fn mission_summary(&self, window: Duration) -> QueryResult<MissionSummary> {
        let events = self.window_query(window, |f| f.category(Category::Missions))?;
        Ok(MissionSummary::from_events(&events))
    }

    pub fn credit_change(&self, window: Duration) -> QueryResult<CreditChange> {
        let events = self.window_query(window, |f| f)?;
        Ok(CreditChange::from_events(&events))
    }

    pub fn session_overview(&self, window: Duration) -> QueryResult<SessionOverview> {
        let store = self.store()?;
        let events = store.query_filtered(&window_filter(window, Utc::now()));
        Ok(SessionOverview::from_events(
            &events,
            store.current_state(),
            store.status(),
        ))
    }

    fn window_query(
        &self,
        window: Duration,
        narrow: impl FnOnce(EventFilter) -> EventFilter,
    ) -> QueryResult<Vec<ClassifiedEvent>> {
        let store = self.store()?;
        let filter = narrow(window_filter(window, Utc::now()));
        let events = store.query_filtered(&filter);
        debug!(
            record_type = ?filter.record_type,
            category = ?filter.category,
            count = events.len(),
            "Summary query"
        );
        Ok(events)
    }
}

fn clamp(limit: usize) -> usize {
    limit.min(MAX_QUERY_LIMIT)
}

fn window_filter(window: Duration, now: DateTime<Utc>) -> EventFilter {
    let filter = EventFilter::new().until(now);
    match chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
    {
        Some(since) => filter.since(since),
        None => filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_filter_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let filter = window_filter(Duration::from_secs(3600), now);
        assert_eq!(filter.until, Some(now));
        assert_eq!(filter.since, Some(Utc.with_ymd_and_hms(2025, 5, 31, 23, 0, 0).unwrap()));

        let all = window_filter(ALL_TIME, now);
        assert_eq!(all.since, None);
    }

    #[test]
    fn test_lookup_conversions() {
        let found: Lookup<u8> = Some(3).into();
        assert!(found.is_found());
        assert_eq!(found.found(), Some(3));
        let missing: Lookup<u8> = None.into();
        assert_eq!(missing, Lookup::NotFound);
    }

    #[test]
    fn test_limit_clamped() {
        assert_eq!(clamp(usize::MAX), MAX_QUERY_LIMIT);
        assert_eq!(clamp(5), 5);
    }
}
