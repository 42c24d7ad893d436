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

//! EDJournal Storage Layer
//!
//! In-memory, bounded, concurrently readable index of classified journal
//! events plus the derived game state.
//!
//! ## Architecture
//!
//! - **Primary log**: FIFO of events keyed by a monotonically increasing
//!   arrival sequence number
//! - **Secondary indices**: per type tag and per category, each a FIFO of
//!   sequence numbers, so eviction stays O(1)
//! - **Derived state**: one [`GameState`](edjournal_core::GameState) and the
//!   latest [`StatusSnapshot`](edjournal_core::StatusSnapshot)
//!
//! All of it sits behind a single `parking_lot::RwLock`: mutations are
//! serialized, reads run concurrently and always see the log and the
//! indices in agreement.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edjournal_storage::{EventStore, StoreConfig};
//!
//! let store = EventStore::new(StoreConfig::default())?;
//! store.append(event);
//! let jumps = store.query_by_type("FSDJump", 10);
//! ```

pub mod error;
pub mod event_store;
pub mod filter;
pub mod stats;

pub use error::{StoreError, StoreResult};
pub use event_store::{EventStore, StoreConfig, DEFAULT_MAX_EVENTS};
pub use filter::EventFilter;
pub use stats::StoreStatistics;
