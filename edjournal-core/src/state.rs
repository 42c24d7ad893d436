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

//! Derived game state
//!
//! [`GameState`] is the running aggregate folded from classified events:
//! where the commander is, what they fly, their balance and ranks. The
//! event store owns the single live instance and only hands out clones.
//!
//! [`StatusSnapshot`] mirrors the separately written status file and is
//! replaced wholesale on every update.

use crate::category::Category;
use crate::event::ClassifiedEvent;
use crate::record::RawRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Rank names carried by `Rank`, `Progress` and `Promotion` events.
const RANK_FIELDS: &[&str] = &[
    "Combat",
    "Trade",
    "Explore",
    "Soldier",
    "Exobiologist",
    "Empire",
    "Federation",
    "CQC",
];

/// Aggregate snapshot of the commander's current situation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub commander: Option<String>,
    pub game_mode: Option<String>,

    // Location
    pub star_system: Option<String>,
    pub system_address: Option<u64>,
    pub body: Option<String>,
    pub station: Option<String>,
    pub docked: bool,
    pub landed: bool,

    // Vehicle
    pub ship_type: Option<String>,
    pub ship_id: Option<i64>,
    pub ship_name: Option<String>,
    pub ship_ident: Option<String>,

    // Balance
    pub credits: Option<i64>,
    pub loan: Option<i64>,

    /// Rank index per rank name (`Combat`, `Trade`, ...)
    pub ranks: BTreeMap<String, i64>,
    /// Percent progress towards the next rank
    pub progress: BTreeMap<String, i64>,

    pub last_update: Option<DateTime<Utc>>,
    /// Number of events folded into this state
    pub events_applied: u64,
}

impl GameState {
    /// Whether an event can change the state at all.
    pub fn is_relevant(event: &ClassifiedEvent) -> bool {
        event.category.affects_state() || event.credits_delta().is_some()
    }

    /// Fold one event into the state. Returns `true` if it was relevant.
    pub fn apply(&mut self, event: &ClassifiedEvent) -> bool {
        if !Self::is_relevant(event) {
            return false;
        }

        let record = &event.record;
        match (event.category, record.record_type.as_str()) {
            (Category::Session, "LoadGame") => {
                set_str(&mut self.commander, record, "Commander");
                set_str(&mut self.game_mode, record, "GameMode");
                set_str(&mut self.ship_type, record, "Ship");
                set_str(&mut self.ship_name, record, "ShipName");
                set_str(&mut self.ship_ident, record, "ShipIdent");
                if let Some(id) = record.get_i64("ShipID") {
                    self.ship_id = Some(id);
                }
                if let Some(credits) = record.get_i64("Credits") {
                    self.credits = Some(credits);
                }
                if let Some(loan) = record.get_i64("Loan") {
                    self.loan = Some(loan);
                }
            }
            (Category::Session, "Commander") | (Category::Session, "NewCommander") => {
                set_str(&mut self.commander, record, "Name");
            }
            (Category::Navigation, "Location") => {
                self.enter_system(record);
                self.body = record.get_str("Body").map(str::to_string);
                self.docked = record.get_bool("Docked").unwrap_or(false);
                self.station = if self.docked {
                    record.get_str("StationName").map(str::to_string)
                } else {
                    None
                };
                self.landed = false;
            }
            (Category::Navigation, "FSDJump") => {
                self.enter_system(record);
                self.body = record.get_str("Body").map(str::to_string);
                self.station = None;
                self.docked = false;
                self.landed = false;
            }
            (Category::Navigation, "CarrierJump") => {
                self.enter_system(record);
                self.body = record.get_str("Body").map(str::to_string);
                self.docked = record.get_bool("Docked").unwrap_or(self.docked);
                if self.docked {
                    set_str(&mut self.station, record, "StationName");
                }
            }
            (Category::Navigation, "Docked") => {
                set_str(&mut self.star_system, record, "StarSystem");
                self.station = record.get_str("StationName").map(str::to_string);
                self.docked = true;
            }
            (Category::Navigation, "Undocked") => {
                self.docked = false;
                self.station = None;
            }
            (Category::Navigation, "SupercruiseEntry") => {
                set_str(&mut self.star_system, record, "StarSystem");
                self.body = None;
                self.docked = false;
                self.landed = false;
            }
            (Category::Navigation, "SupercruiseExit") | (Category::Navigation, "ApproachBody") => {
                set_str(&mut self.star_system, record, "StarSystem");
                set_str(&mut self.body, record, "Body");
            }
            (Category::Navigation, "LeaveBody") => {
                self.body = None;
            }
            (Category::Navigation, "Touchdown") => {
                self.landed = true;
            }
            (Category::Navigation, "Liftoff") => {
                self.landed = false;
            }
            (Category::Ship, "Loadout") => {
                set_str(&mut self.ship_type, record, "Ship");
                set_str(&mut self.ship_name, record, "ShipName");
                set_str(&mut self.ship_ident, record, "ShipIdent");
                if let Some(id) = record.get_i64("ShipID") {
                    self.ship_id = Some(id);
                }
            }
            (Category::Ship, "ShipyardSwap") | (Category::Ship, "ShipyardNew") => {
                set_str(&mut self.ship_type, record, "ShipType");
                if let Some(id) = record.get_i64("ShipID").or_else(|| record.get_i64("NewShipID")) {
                    self.ship_id = Some(id);
                }
                self.ship_name = None;
                self.ship_ident = None;
            }
            (Category::Ship, "SetUserShipName") => {
                set_str(&mut self.ship_name, record, "UserShipName");
                set_str(&mut self.ship_ident, record, "UserShipId");
            }
            (Category::Progress, "Rank") | (Category::Progress, "Promotion") => {
                fold_ranks(&mut self.ranks, record);
            }
            (Category::Progress, "Progress") => {
                fold_ranks(&mut self.progress, record);
            }
            _ => {}
        }

        // LoadGame carries an absolute balance; everything else is a delta.
        if record.record_type != "LoadGame" {
            if let (Some(delta), Some(credits)) = (event.credits_delta(), self.credits.as_mut()) {
                *credits = credits.saturating_add(delta);
            }
        }

        self.last_update = Some(match self.last_update {
            Some(prev) if prev > event.timestamp() => prev,
            _ => event.timestamp(),
        });
        self.events_applied += 1;
        true
    }

    fn enter_system(&mut self, record: &RawRecord) {
        set_str(&mut self.star_system, record, "StarSystem");
        if let Some(address) = record.get("SystemAddress").and_then(Value::as_u64) {
            self.system_address = Some(address);
        }
    }
}

fn set_str(slot: &mut Option<String>, record: &RawRecord, field: &str) {
    if let Some(value) = record.get_str(field) {
        *slot = Some(value.to_string());
    }
}

fn fold_ranks(into: &mut BTreeMap<String, i64>, record: &RawRecord) {
    for name in RANK_FIELDS {
        if let Some(value) = record.get_i64(name) {
            into.insert((*name).to_string(), value);
        }
    }
}

/// Ship/SRV/on-foot status bits from the status file's `Flags` field.
pub mod flags {
    pub const DOCKED: u64 = 1 << 0;
    pub const LANDED: u64 = 1 << 1;
    pub const LANDING_GEAR_DOWN: u64 = 1 << 2;
    pub const SHIELDS_UP: u64 = 1 << 3;
    pub const SUPERCRUISE: u64 = 1 << 4;
    pub const FLIGHT_ASSIST_OFF: u64 = 1 << 5;
    pub const HARDPOINTS_DEPLOYED: u64 = 1 << 6;
    pub const IN_WING: u64 = 1 << 7;
    pub const LIGHTS_ON: u64 = 1 << 8;
    pub const CARGO_SCOOP_DEPLOYED: u64 = 1 << 9;
    pub const SILENT_RUNNING: u64 = 1 << 10;
    pub const SCOOPING_FUEL: u64 = 1 << 11;
    pub const FSD_CHARGING: u64 = 1 << 17;
    pub const LOW_FUEL: u64 = 1 << 19;
    pub const OVERHEATING: u64 = 1 << 20;
    pub const IN_DANGER: u64 = 1 << 22;
    pub const BEING_INTERDICTED: u64 = 1 << 23;
    pub const IN_MAIN_SHIP: u64 = 1 << 24;
    pub const IN_FIGHTER: u64 = 1 << 25;
    pub const IN_SRV: u64 = 1 << 26;
}

/// Latest contents of the status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub flags: u64,
    pub flags2: u64,
    pub balance: Option<i64>,
    pub legal_state: Option<String>,
    pub body_name: Option<String>,
    /// Every field of the file, untouched.
    pub fields: Map<String, Value>,
}

impl StatusSnapshot {
    pub fn from_record(record: RawRecord) -> Self {
        let flags = record.get("Flags").and_then(Value::as_u64).unwrap_or(0);
        let flags2 = record.get("Flags2").and_then(Value::as_u64).unwrap_or(0);
        Self {
            timestamp: record.timestamp,
            flags,
            flags2,
            balance: record.get_i64("Balance"),
            legal_state: record.get_str("LegalState").map(str::to_string),
            body_name: record.get_str("BodyName").map(str::to_string),
            fields: record.fields,
        }
    }

    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags & flag != 0
    }

    pub fn docked(&self) -> bool {
        self.has_flag(flags::DOCKED)
    }

    pub fn landed(&self) -> bool {
        self.has_flag(flags::LANDED)
    }

    pub fn in_supercruise(&self) -> bool {
        self.has_flag(flags::SUPERCRUISE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_record;
    use crate::record::decode_line;

    fn event(json: &str) -> ClassifiedEvent {
        classify_record(decode_line(json.as_bytes()).unwrap())
    }

    #[test]
    fn test_fold_session_and_location() {
        let mut state = GameState::default();
        assert!(state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:00:00Z","event":"LoadGame","Commander":"Jameson","Ship":"Anaconda","ShipID":7,"Credits":1000000,"Loan":0,"GameMode":"Open"}"#,
        )));
        assert!(state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:01:00Z","event":"Location","StarSystem":"Sol","SystemAddress":10477373803,"Docked":true,"StationName":"Abraham Lincoln","Body":"Earth"}"#,
        )));

        assert_eq!(state.commander.as_deref(), Some("Jameson"));
        assert_eq!(state.ship_type.as_deref(), Some("Anaconda"));
        assert_eq!(state.credits, Some(1_000_000));
        assert_eq!(state.star_system.as_deref(), Some("Sol"));
        assert_eq!(state.station.as_deref(), Some("Abraham Lincoln"));
        assert!(state.docked);

        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:02:00Z","event":"Undocked","StationName":"Abraham Lincoln"}"#,
        ));
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:05:00Z","event":"FSDJump","StarSystem":"Alpha Centauri","JumpDist":4.38}"#,
        ));
        assert!(!state.docked);
        assert_eq!(state.station, None);
        assert_eq!(state.star_system.as_deref(), Some("Alpha Centauri"));
        assert_eq!(state.events_applied, 4);
    }

    #[test]
    fn test_credit_deltas_fold() {
        let mut state = GameState::default();
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:00:00Z","event":"LoadGame","Credits":1000}"#,
        ));
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:01:00Z","event":"MarketSell","Type":"gold","Count":1,"TotalSale":500}"#,
        ));
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:02:00Z","event":"RefuelAll","Cost":200,"Amount":4.0}"#,
        ));
        assert_eq!(state.credits, Some(1300));
    }

    #[test]
    fn test_irrelevant_events_are_ignored() {
        let mut state = GameState::default();
        let before = state.clone();
        assert!(!state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:00:00Z","event":"ReceiveText","From":"x","Message":"o7"}"#,
        )));
        assert_eq!(state, before);
    }

    #[test]
    fn test_ranks() {
        let mut state = GameState::default();
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:00:00Z","event":"Rank","Combat":3,"Trade":5,"Explore":8}"#,
        ));
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:00:01Z","event":"Promotion","Trade":6}"#,
        ));
        state.apply(&event(
            r#"{"timestamp":"2025-01-01T00:00:02Z","event":"Progress","Combat":40}"#,
        ));
        assert_eq!(state.ranks["Trade"], 6);
        assert_eq!(state.ranks["Combat"], 3);
        assert_eq!(state.progress["Combat"], 40);
    }

    #[test]
    fn test_status_snapshot() {
        let record = decode_line(
            br#"{"timestamp":"2025-01-01T00:00:00Z","event":"Status","Flags":16777225,"Balance":12345,"LegalState":"Clean"}"#,
        )
        .unwrap();
        let status = StatusSnapshot::from_record(record);
        assert!(status.docked());
        assert!(status.has_flag(flags::SHIELDS_UP));
        assert!(status.has_flag(flags::IN_MAIN_SHIP));
        assert!(!status.in_supercruise());
        assert_eq!(status.balance, Some(12345));
        assert_eq!(status.legal_state.as_deref(), Some("Clean"));
    }
}
