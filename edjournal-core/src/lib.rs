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

//! EDJournal Core
//!
//! Fundamental data structures for journal ingestion: the record decoder,
//! the category table and classifier, and the derived game state model.

pub mod category;
pub mod classify;
pub mod error;
pub mod event;
pub mod record;
pub mod state;

pub use category::Category;
pub use classify::{classify, classify_record, extract_key_fields, KeyFields};
pub use error::{DecodeError, DecodeResult};
pub use event::ClassifiedEvent;
pub use record::{decode_line, decode_object, RawRecord, TIMESTAMP_FIELD, TYPE_ALIAS_FIELD, TYPE_FIELD};
pub use state::{GameState, StatusSnapshot};
