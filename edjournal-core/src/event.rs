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

//! Classified journal events

use crate::category::Category;
use crate::classify::{KeyFields, CREDITS_DELTA};
use crate::record::RawRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields searched by free-text queries, besides the type tag and the
/// string-valued key fields.
pub const SEARCHABLE_FIELDS: &[&str] = &[
    "StarSystem",
    "StationName",
    "Body",
    "BodyName",
    "Name",
    "Name_Localised",
    "Faction",
    "Message",
    "Ship",
];

/// Fields naming the star system an event happened in, in lookup order.
const SYSTEM_FIELDS: &[&str] = &["StarSystem", "SystemName", "System"];

/// A decoded record plus its derived category and key fields.
///
/// Immutable after classification; the key fields are never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub record: RawRecord,
    pub category: Category,
    pub key_fields: KeyFields,
}

impl ClassifiedEvent {
    pub fn new(record: RawRecord, category: Category, key_fields: KeyFields) -> Self {
        Self {
            record,
            category,
            key_fields,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }

    pub fn record_type(&self) -> &str {
        &self.record.record_type
    }

    /// Key field lookup.
    pub fn key(&self, name: &str) -> Option<&Value> {
        self.key_fields.get(name)
    }

    pub fn key_str(&self, name: &str) -> Option<&str> {
        self.key(name).and_then(Value::as_str)
    }

    pub fn key_i64(&self, name: &str) -> Option<i64> {
        self.key(name).and_then(Value::as_i64)
    }

    pub fn key_f64(&self, name: &str) -> Option<f64> {
        self.key(name).and_then(Value::as_f64)
    }

    /// Signed credit change caused by this event, if any.
    pub fn credits_delta(&self) -> Option<i64> {
        self.key_i64(CREDITS_DELTA)
    }

    /// Star system named by the event itself (not the commander's location).
    pub fn system_name(&self) -> Option<&str> {
        SYSTEM_FIELDS
            .iter()
            .find_map(|f| self.key_str(f).or_else(|| self.record.get_str(f)))
    }

    /// Case-insensitive substring match over the searchable fields.
    ///
    /// `needle_lower` must already be lowercased.
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(needle_lower);

        if hit(self.record_type()) {
            return true;
        }
        if self
            .key_fields
            .values()
            .filter_map(Value::as_str)
            .any(|s| hit(s))
        {
            return true;
        }
        SEARCHABLE_FIELDS
            .iter()
            .filter_map(|f| self.record.get_str(f))
            .any(hit)
    }
}
