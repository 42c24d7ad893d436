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

//! Multi-predicate event filter.

use chrono::{DateTime, Utc};
use edjournal_core::{Category, ClassifiedEvent};
use serde::{Deserialize, Serialize};

/// Predicates for [`EventStore::query_filtered`](crate::EventStore::query_filtered).
///
/// Every predicate that is set must match (logical AND). An empty filter
/// matches every retained event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    pub record_type: Option<String>,
    pub category: Option<Category>,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive equality against the event's own system field
    pub system_name: Option<String>,
    /// Case-insensitive substring over the searchable fields
    pub text: Option<String>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn between(self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since(since).until(until)
    }

    pub fn system_name(mut self, system: impl Into<String>) -> Self {
        self.system_name = Some(system.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compile into a matcher with lowercased needles, computed once per query.
    pub(crate) fn matcher(&self) -> Matcher<'_> {
        Matcher {
            filter: self,
            system_lower: self.system_name.as_ref().map(|s| s.to_lowercase()),
            text_lower: self.text.as_ref().map(|s| s.to_lowercase()),
        }
    }
}

pub(crate) struct Matcher<'a> {
    filter: &'a EventFilter,
    system_lower: Option<String>,
    text_lower: Option<String>,
}

impl Matcher<'_> {
    pub(crate) fn matches(&self, event: &ClassifiedEvent) -> bool {
        let f = self.filter;

        if let Some(tag) = &f.record_type {
            if event.record_type() != tag {
                return false;
            }
        }
        if let Some(category) = f.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(since) = f.since {
            if event.timestamp() < since {
                return false;
            }
        }
        if let Some(until) = f.until {
            if event.timestamp() > until {
                return false;
            }
        }
        if let Some(system) = &self.system_lower {
            match event.system_name() {
                Some(name) if name.to_lowercase() == *system => {}
                _ => return false,
            }
        }
        if let Some(text) = &self.text_lower {
            if !event.matches_text(text) {
                return false;
            }
        }
        true
    }
}
