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

//! Query engine tests against a populated store.

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use edjournal_core::{classify_record, decode_line, Category, ClassifiedEvent};
use edjournal_query::{Lookup, QueryEngine, QueryError, ALL_TIME};
use edjournal_storage::EventStore;
use std::sync::Arc;
use std::time::Duration;

fn event_ago(minutes: i64, body: &str) -> ClassifiedEvent {
    let ts = (Utc::now() - ChronoDuration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let line = format!(r#"{{"timestamp":"{ts}",{body}}}"#);
    classify_record(decode_line(line.as_bytes()).unwrap())
}

fn populated() -> Arc<EventStore> {
    let store = Arc::new(EventStore::default());
    store.append(event_ago(180, r#""event":"LoadGame","Commander":"Jameson","Credits":1000000,"Ship":"python","ShipID":3"#));
    store.append(event_ago(170, r#""event":"MarketBuy","Type":"gold","Type_Localised":"Gold","Count":10,"BuyPrice":9000,"TotalCost":90000"#));
    store.append(event_ago(120, r#""event":"FSDJump","StarSystem":"Achenar","JumpDist":20.0"#));
    store.append(event_ago(30, r#""event":"FSDJump","StarSystem":"Sol","JumpDist":15.5"#));
    store.append(event_ago(25, r#""event":"Scan","BodyName":"Earth","WasDiscovered":true,"WasMapped":true"#));
    store.append(event_ago(20, r#""event":"MarketSell","Type":"gold","Type_Localised":"Gold","Count":10,"SellPrice":9500,"TotalSale":95000,"AvgPricePaid":9000"#));
    store.append(event_ago(10, r#""event":"Bounty","TotalReward":12000,"VictimFaction":"Pirates""#));
    store.append(event_ago(5, r#""event":"MissionCompleted","MissionID":7,"Faction":"Mother Gaia","Reward":50000"#));
    store
}

/// Test the FSDJump example end to end through the engine
#[test]
fn test_fsd_jump_by_category_name() {
    let store = Arc::new(EventStore::default());
    store.append(classify_record(
        decode_line(br#"{"timestamp":"2025-01-01T00:00:00Z","type":"FSDJump","StarSystem":"Sol"}"#).unwrap(),
    ));
    let engine = QueryEngine::new(&store);

    let found = engine.events_by_category("Navigation", 10).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key_fields["StarSystem"], "Sol");

    assert!(matches!(
        engine.events_by_category("Sightseeing", 10),
        Err(QueryError::UnknownCategory(_))
    ));
}

/// Test that summaries respect their window
#[test]
fn test_summaries_over_windows() {
    let store = populated();
    let engine = QueryEngine::new(&store);

    let hour = Duration::from_secs(3600);
    let trading = engine.trading_summary(hour).unwrap();
    assert_eq!(trading.transactions, 1);
    assert_eq!(trading.total_revenue, 95_000);

    let trading_all = engine.trading_summary(ALL_TIME).unwrap();
    assert_eq!(trading_all.transactions, 2);
    assert_eq!(trading_all.commodities["Gold"].bought, 10);

    let exploration = engine.exploration_summary(hour).unwrap();
    assert_eq!(exploration.jumps, 1);
    assert_eq!(exploration.bodies_scanned, 1);
    assert!(exploration.systems_visited.contains("Sol"));

    let combat = engine.combat_summary(hour).unwrap();
    assert_eq!(combat.bounty_rewards, 12_000);

    let missions = engine.mission_summary(hour).unwrap();
    assert_eq!(missions.completed, 1);
    assert_eq!(missions.completed_by_faction["Mother Gaia"], 1);

    let credits = engine.credit_change(hour).unwrap();
    assert_eq!(credits.income, 95_000 + 50_000);
    assert_eq!(credits.expenses, 0);

    let credits_all = engine.credit_change(ALL_TIME).unwrap();
    assert_eq!(credits_all.expenses, 90_000);
    assert_eq!(credits_all.by_category[&Category::Trading], 5_000);
}

/// Test that an empty window yields zeroed summaries, not errors
#[test]
fn test_empty_window_is_not_an_error() {
    let store = populated();
    let engine = QueryEngine::new(&store);
    let minute = Duration::from_secs(60);

    assert_eq!(engine.trading_summary(minute).unwrap().transactions, 0);
    assert_eq!(engine.exploration_summary(minute).unwrap().jumps, 0);
    assert!(engine.recent_events(minute).unwrap().is_empty());

    let overview = engine.session_overview(minute).unwrap();
    assert_eq!(overview.total_events, 0);
    assert_eq!(overview.state.commander.as_deref(), Some("Jameson"));
}

/// Test session overview and lookups
#[test]
fn test_overview_and_lookups() {
    let store = populated();
    let engine = QueryEngine::new(&store);

    let overview = engine.session_overview(ALL_TIME).unwrap();
    assert_eq!(overview.total_events, 8);
    assert_eq!(overview.counts_by_category[&Category::Navigation], 2);
    assert_eq!(overview.state.star_system.as_deref(), Some("Sol"));
    assert_eq!(overview.state.credits, Some(1_000_000 - 90_000 + 95_000 + 50_000));
    assert!(overview.status.is_none());

    match engine.last_event("FSDJump").unwrap() {
        Lookup::Found(event) => assert_eq!(event.key_str("StarSystem"), Some("Sol")),
        Lookup::NotFound => panic!("expected a jump"),
    }
    assert_eq!(engine.last_event("Docked").unwrap(), Lookup::NotFound);
    assert_eq!(engine.status().unwrap(), Lookup::NotFound);

    let hits = engine.search("mother gaia", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record_type(), "MissionCompleted");

    assert_eq!(engine.events_by_type("FSDJump", 1).unwrap().len(), 1);
    assert_eq!(engine.statistics().unwrap().total_retained, 8);
}

/// Test that a dropped store is reported as unavailable
#[test]
fn test_store_unavailable_after_drop() {
    let store = populated();
    let engine = QueryEngine::new(&store);
    assert!(engine.is_available());
    drop(store);

    assert!(!engine.is_available());
    assert_eq!(engine.current_state().err(), Some(QueryError::StoreUnavailable));
    assert_eq!(
        engine.trading_summary(ALL_TIME).err(),
        Some(QueryError::StoreUnavailable)
    );
    assert_eq!(
        engine.events_by_type("FSDJump", 10).err(),
        Some(QueryError::StoreUnavailable)
    );
}
