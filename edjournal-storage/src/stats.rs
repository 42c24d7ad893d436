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

//! Store statistics snapshot

use chrono::{DateTime, Utc};
use edjournal_core::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time statistics for an [`EventStore`](crate::EventStore).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    /// Retained events per category (categories with no events are omitted)
    pub counts_by_category: BTreeMap<Category, usize>,
    pub total_retained: usize,
    /// Events appended since the store was created
    pub total_appended: u64,
    /// Events dropped by the retention bound
    pub total_evicted: u64,
    pub retention_limit: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl StoreStatistics {
    pub fn count(&self, category: Category) -> usize {
        self.counts_by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_retained == 0
    }
}
