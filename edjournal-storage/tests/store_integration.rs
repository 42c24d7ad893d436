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

//! Integration tests for the event store: retention, concurrency and the
//! derived state.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use edjournal_core::{classify_record, decode_line, Category, ClassifiedEvent};
use edjournal_storage::{EventFilter, EventStore, StoreConfig};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn event(offset_secs: i64, body: &str) -> ClassifiedEvent {
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + ChronoDuration::seconds(offset_secs);
    let line = format!(
        r#"{{"timestamp":"{}",{}}}"#,
        ts.format("%Y-%m-%dT%H:%M:%SZ"),
        body
    );
    classify_record(decode_line(line.as_bytes()).expect("valid test record"))
}

fn mixed_event(i: i64) -> ClassifiedEvent {
    match i % 4 {
        0 => event(i, &format!(r#""type":"FSDJump","StarSystem":"System {i}","JumpDist":12.5"#)),
        1 => event(i, r#""type":"MarketSell","Type":"gold","Count":4,"SellPrice":9000,"TotalSale":36000,"AvgPricePaid":8000"#),
        2 => event(i, r#""type":"Bounty","Reward":15000,"VictimFaction":"Pirates""#),
        _ => event(i, r#""type":"Scan","BodyName":"Sol 3","ScanType":"Detailed""#),
    }
}

/// Test that a session replay folds into the expected game state
#[test]
fn test_session_replay_state() {
    let store = EventStore::default();
    store.append(event(0, r#""type":"LoadGame","Commander":"Jameson","Ship":"sidewinder","ShipID":1,"Credits":1000,"Loan":0,"GameMode":"Solo""#));
    store.append(event(1, r#""type":"Location","StarSystem":"Sol","SystemAddress":10477373803,"Docked":true,"StationName":"Abraham Lincoln""#));
    store.append(event(2, r#""type":"Undocked","StationName":"Abraham Lincoln""#));
    store.append(event(3, r#""type":"FSDJump","StarSystem":"Alpha Centauri","SystemAddress":1,"JumpDist":4.38"#));
    store.append(event(4, r#""type":"MarketSell","Type":"gold","Count":1,"SellPrice":500,"TotalSale":500,"AvgPricePaid":400"#));

    let state = store.current_state();
    assert_eq!(state.commander.as_deref(), Some("Jameson"));
    assert_eq!(state.star_system.as_deref(), Some("Alpha Centauri"));
    assert!(!state.docked);
    assert_eq!(state.credits, Some(1500));
}

/// Test that retention is exact after a long run of mixed events
#[test]
fn test_retention_over_mixed_stream() {
    let store = EventStore::new(StoreConfig::with_max_events(100)).unwrap();
    for i in 0..1_000 {
        store.append(mixed_event(i));
    }

    let stats = store.statistics();
    assert_eq!(stats.total_retained, 100);
    assert_eq!(stats.total_evicted, 900);
    assert_eq!(stats.counts_by_category.values().sum::<usize>(), 100);
    assert_eq!(stats.count(Category::Navigation), 25);
    assert_eq!(stats.count(Category::Trading), 25);

    // Only the last 100 arrivals survive.
    let oldest = store.query_filtered(&EventFilter::new()).pop().unwrap();
    assert_eq!(oldest.timestamp(), Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + ChronoDuration::seconds(900));
}

/// Test that readers never observe a torn store while a writer appends
#[test]
fn test_concurrent_readers_and_writer() {
    let store = Arc::new(EventStore::new(StoreConfig::with_max_events(500)).unwrap());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..5_000 {
                store.append(mixed_event(i));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    let stats = store.statistics();
                    assert!(stats.total_retained <= 500);
                    assert_eq!(
                        stats.counts_by_category.values().sum::<usize>(),
                        stats.total_retained
                    );

                    let jumps = store.query_by_type("FSDJump", 50);
                    assert!(jumps.len() <= 50);
                    assert!(jumps.iter().all(|e| e.record_type() == "FSDJump"));
                    assert!(jumps.windows(2).all(|w| w[0].timestamp() >= w[1].timestamp()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.len(), 500);
    assert_eq!(store.statistics().total_appended, 5_000);
}

/// Test that append_batch behaves like repeated append
#[test]
fn test_append_batch_matches_append() {
    let one = EventStore::new(StoreConfig::with_max_events(10)).unwrap();
    let batch = EventStore::new(StoreConfig::with_max_events(10)).unwrap();
    let events: Vec<_> = (0..25).map(mixed_event).collect();

    for e in events.clone() {
        one.append(e);
    }
    assert_eq!(batch.append_batch(events), 25);

    assert_eq!(one.statistics(), batch.statistics());
    assert_eq!(one.current_state(), batch.current_state());
    assert_eq!(
        one.query_filtered(&EventFilter::new()),
        batch.query_filtered(&EventFilter::new())
    );
}

/// Test that statistics serialize to JSON for the CLI
#[test]
fn test_statistics_serialize() {
    let store = EventStore::default();
    store.append(mixed_event(0));
    let json = serde_json::to_value(store.statistics()).unwrap();
    assert_eq!(json["total_retained"], 1);
    assert_eq!(json["counts_by_category"]["Navigation"], 1);
}

proptest! {
    #[test]
    fn retained_never_exceeds_bound(max in 1usize..64, count in 0i64..256) {
        let store = EventStore::new(StoreConfig::with_max_events(max)).unwrap();
        for i in 0..count {
            store.append(mixed_event(i));
        }
        let stats = store.statistics();
        prop_assert_eq!(stats.total_retained, (count as usize).min(max));
        prop_assert_eq!(stats.total_appended, count as u64);
        prop_assert_eq!(stats.total_evicted as usize, (count as usize).saturating_sub(max));

        let indexed: usize = Category::ALL
            .iter()
            .map(|c| store.query_by_category(*c, usize::MAX).len())
            .sum();
        prop_assert_eq!(indexed, stats.total_retained);
    }
}
