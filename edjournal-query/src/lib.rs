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

//! EDJournal Query Engine
//!
//! Summary layer over the event store. Every summary declares the
//! category and time filters it needs, delegates to
//! `EventStore::query_filtered` and folds the result. Empty input yields a
//! zeroed summary, never an error.

pub mod engine;
pub mod error;
pub mod summary;

pub use engine::{Lookup, QueryEngine, ALL_TIME, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
pub use error::{QueryError, QueryResult};
pub use summary::{
    CombatSummary, CommodityTrade, CreditChange, ExplorationSummary, MissionSummary,
    SessionOverview, TradingSummary,
};
