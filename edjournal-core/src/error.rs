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

//! Record decoding errors

use thiserror::Error;

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reasons a line of journal text was rejected.
///
/// Every variant is recoverable: the caller logs the failure, counts it and
/// moves past the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Input is not valid UTF-8")]
    InvalidEncoding,
}

impl DecodeError {
    /// Short machine-readable reason, used as a counter label.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::MalformedJson(_) => "malformed-json",
            DecodeError::MissingField(_) => "missing-required-field",
            DecodeError::InvalidField { .. } => "invalid-field",
            DecodeError::InvalidEncoding => "invalid-encoding",
        }
    }
}
