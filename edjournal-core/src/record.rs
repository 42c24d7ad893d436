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

//! Record Decoder
//!
//! Turns one line of journal text into a [`RawRecord`], or rejects it with a
//! [`DecodeError`]. The decoded field map is passed through untouched: no
//! casing or nesting normalisation happens here.
//!
//! Every record must carry:
//! - `timestamp`: ISO-8601 in UTC (`2025-01-01T00:00:00Z`)
//! - a type tag, read from `type`, or from the game's native `event` field
//!   when `type` is absent

use crate::error::{DecodeError, DecodeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the record timestamp.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Field holding the record type tag.
pub const TYPE_FIELD: &str = "type";

/// Alias for [`TYPE_FIELD`] used by the game's own journal writer.
pub const TYPE_ALIAS_FIELD: &str = "event";

/// A decoded journal record.
///
/// Immutable once decoded. `fields` still contains `timestamp` and the type
/// tag exactly as they appeared on the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub fields: Map<String, Value>,
}

impl RawRecord {
    /// Build a record from an already-parsed JSON object.
    pub fn from_object(fields: Map<String, Value>) -> DecodeResult<Self> {
        let timestamp = match fields.get(TIMESTAMP_FIELD) {
            None | Some(Value::Null) => return Err(DecodeError::MissingField(TIMESTAMP_FIELD)),
            Some(Value::String(raw)) => parse_timestamp(raw)?,
            Some(_) => {
                return Err(DecodeError::InvalidField {
                    field: TIMESTAMP_FIELD,
                    reason: "expected a string".to_string(),
                })
            }
        };

        let tag = fields
            .get(TYPE_FIELD)
            .filter(|v| !v.is_null())
            .map(|v| (TYPE_FIELD, v))
            .or_else(|| {
                fields
                    .get(TYPE_ALIAS_FIELD)
                    .filter(|v| !v.is_null())
                    .map(|v| (TYPE_ALIAS_FIELD, v))
            });

        let record_type = match tag {
            None => return Err(DecodeError::MissingField(TYPE_FIELD)),
            Some((_, Value::String(s))) if !s.is_empty() => s.clone(),
            Some((field, _)) => {
                return Err(DecodeError::InvalidField {
                    field,
                    reason: "expected a non-empty string".to_string(),
                })
            }
        };

        Ok(Self {
            timestamp,
            record_type,
            fields,
        })
    }

    /// Raw field lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_u64().map(|u| u.min(i64::MAX as u64) as i64))
                .or_else(|| v.as_f64().map(|f| f as i64))
        })
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// Prefer the localised variant of a field (`Name_Localised`) and fall
    /// back to the raw one (`Name`).
    pub fn get_localised(&self, name: &str) -> Option<&str> {
        self.get_str(&format!("{name}_Localised"))
            .or_else(|| self.get_str(name))
    }
}

/// Decode one journal line.
///
/// Leading/trailing whitespace (including a `\r` left by CRLF writers) is
/// ignored. Invalid UTF-8 is a [`DecodeError::InvalidEncoding`], never a
/// panic.
pub fn decode_line(line: &[u8]) -> DecodeResult<RawRecord> {
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::InvalidEncoding)?;
    decode_str(text.trim())
}

/// Decode a whole file body as a single JSON object.
///
/// Used for the status file, which is rewritten in place rather than
/// appended to. Same validation rules as [`decode_line`].
pub fn decode_object(body: &[u8]) -> DecodeResult<RawRecord> {
    decode_line(body)
}

fn decode_str(text: &str) -> DecodeResult<RawRecord> {
    if text.is_empty() {
        return Err(DecodeError::MalformedJson("empty input".to_string()));
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    match value {
        Value::Object(fields) => RawRecord::from_object(fields),
        other => Err(DecodeError::MalformedJson(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn parse_timestamp(raw: &str) -> DecodeResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DecodeError::InvalidField {
            field: TIMESTAMP_FIELD,
            reason: e.to_string(),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
