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

//! Summary aggregates
//!
//! Each summary is a pure fold over a slice of events. Events of types a
//! summary doesn't know are ignored, so callers may pass a superset.

use chrono::{DateTime, Utc};
use edjournal_core::{Category, ClassifiedEvent, GameState, StatusSnapshot};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const UNKNOWN: &str = "unknown";

/// Per-commodity market activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommodityTrade {
    pub bought: i64,
    pub sold: i64,
    pub cost: i64,
    pub revenue: i64,
    /// Sale revenue minus average purchase price, as reported at sale
    pub profit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradingSummary {
    pub commodities: BTreeMap<String, CommodityTrade>,
    pub transactions: usize,
    pub total_cost: i64,
    pub total_revenue: i64,
    pub total_profit: i64,
}

impl TradingSummary {
    pub fn from_events(events: &[ClassifiedEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            let commodity = event.key_str("Commodity").unwrap_or(UNKNOWN);
            let count = event.key_i64("Count").unwrap_or(0);
            match event.record_type() {
                "MarketBuy" => {
                    let cost = event.key_i64("TotalCost").unwrap_or(0);
                    let entry = summary.commodities.entry(commodity.to_string()).or_default();
                    entry.bought = entry.bought.saturating_add(count);
                    entry.cost = entry.cost.saturating_add(cost);
                    summary.total_cost = summary.total_cost.saturating_add(cost);
                }
                "MarketSell" => {
                    let revenue = event.key_i64("TotalSale").unwrap_or(0);
                    let profit = event.key_i64("Profit").unwrap_or(0);
                    let entry = summary.commodities.entry(commodity.to_string()).or_default();
                    entry.sold = entry.sold.saturating_add(count);
                    entry.revenue = entry.revenue.saturating_add(revenue);
                    entry.profit = entry.profit.saturating_add(profit);
                    summary.total_revenue = summary.total_revenue.saturating_add(revenue);
                    summary.total_profit = summary.total_profit.saturating_add(profit);
                }
                _ => continue,
            }
            summary.transactions += 1;
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExplorationSummary {
    pub jumps: usize,
    pub distance_ly: f64,
    pub systems_visited: BTreeSet<String>,
    pub bodies_scanned: usize,
    pub first_discoveries: usize,
    pub first_mapped: usize,
    /// Surface mapping scans completed
    pub bodies_mapped: usize,
    pub data_sold: i64,
}

impl ExplorationSummary {
    pub fn from_events(events: &[ClassifiedEvent]) -> Self {
        let mut summary = Self::default();
        let mut scanned = BTreeSet::new();
        for event in events {
            match event.record_type() {
                "FSDJump" | "CarrierJump" => {
                    summary.jumps += 1;
                    summary.distance_ly += event.key_f64("JumpDist").unwrap_or(0.0);
                    if let Some(system) = event.key_str("StarSystem") {
                        summary.systems_visited.insert(system.to_string());
                    }
                }
                "Scan" => {
                    // repeated scans of one body count once
                    let fresh = match event.key_str("BodyName") {
                        Some(body) => scanned.insert(body.to_string()),
                        None => true,
                    };
                    if !fresh {
                        continue;
                    }
                    summary.bodies_scanned += 1;
                    if event.key("first_discovery").and_then(|v| v.as_bool()) == Some(true) {
                        summary.first_discoveries += 1;
                    }
                    if event.key("first_mapped").and_then(|v| v.as_bool()) == Some(true) {
                        summary.first_mapped += 1;
                    }
                }
                "SAAScanComplete" => summary.bodies_mapped += 1,
                "SellExplorationData" | "MultiSellExplorationData" | "SellOrganicData" => {
                    summary.data_sold = summary.data_sold.saturating_add(event.key_i64("TotalEarnings").unwrap_or(0));
                }
                _ => {}
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombatSummary {
    pub bounties: usize,
    pub bounty_rewards: i64,
    pub bonds: usize,
    pub bond_rewards: i64,
    pub pvp_kills: usize,
    /// Bounties, bonds and player kills together
    pub kills: usize,
    pub vouchers_redeemed: i64,
    pub bounties_paid: i64,
    pub deaths: usize,
    pub interdicted: usize,
    pub interdictions_escaped: usize,
    pub interdictions_made: usize,
}

impl CombatSummary {
    pub fn from_events(events: &[ClassifiedEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event.record_type() {
                "Bounty" => {
                    summary.bounties += 1;
                    let reward = event
                        .key_i64("TotalReward")
                        .or_else(|| event.key_i64("Reward"))
                        .unwrap_or(0);
                    summary.bounty_rewards = summary.bounty_rewards.saturating_add(reward);
                }
                "FactionKillBond" | "CapShipBond" => {
                    summary.bonds += 1;
                    summary.bond_rewards = summary.bond_rewards.saturating_add(event.key_i64("Reward").unwrap_or(0));
                }
                "PVPKill" => summary.pvp_kills += 1,
                "RedeemVoucher" => {
                    summary.vouchers_redeemed = summary.vouchers_redeemed.saturating_add(event.credits_delta().unwrap_or(0));
                }
                "PayBounties" => {
                    summary.bounties_paid = summary
                        .bounties_paid
                        .saturating_sub(event.credits_delta().unwrap_or(0));
                }
                "Died" => summary.deaths += 1,
                "Interdicted" => summary.interdicted += 1,
                "EscapeInterdiction" => summary.interdictions_escaped += 1,
                "Interdiction" => {
                    if event.key("Success").and_then(|v| v.as_bool()) == Some(true) {
                        summary.interdictions_made += 1;
                    }
                }
                _ => {}
            }
        }
        summary.kills = summary.bounties + summary.bonds + summary.pvp_kills;
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissionSummary {
    pub accepted: usize,
    pub completed: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub rewards: i64,
    pub donated: i64,
    /// Completed missions per issuing faction
    pub completed_by_faction: BTreeMap<String, usize>,
}

impl MissionSummary {
    pub fn from_events(events: &[ClassifiedEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event.record_type() {
                "MissionAccepted" => summary.accepted += 1,
                "MissionCompleted" => {
                    summary.completed += 1;
                    summary.rewards = summary.rewards.saturating_add(event.key_i64("Reward").unwrap_or(0));
                    summary.donated = summary.donated.saturating_add(event.key_i64("Donated").unwrap_or(0));
                    let faction = event.key_str("Faction").unwrap_or(UNKNOWN);
                    *summary
                        .completed_by_faction
                        .entry(faction.to_string())
                        .or_default() += 1;
                }
                "MissionFailed" => summary.failed += 1,
                "MissionAbandoned" => summary.abandoned += 1,
                _ => {}
            }
        }
        summary
    }

    /// Completed over completed + failed + abandoned, 0.0 when none ended.
    pub fn success_rate(&self) -> f64 {
        let ended = self.completed + self.failed + self.abandoned;
        if ended == 0 {
            0.0
        } else {
            self.completed as f64 / ended as f64
        }
    }
}

/// Net credit movement derived from `credits_delta` key fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreditChange {
    pub net: i64,
    pub income: i64,
    /// Positive amount spent
    pub expenses: i64,
    pub by_category: BTreeMap<Category, i64>,
    pub transactions: usize,
}

impl CreditChange {
    pub fn from_events(events: &[ClassifiedEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            let Some(delta) = event.credits_delta() else {
                continue;
            };
            summary.transactions += 1;
            summary.net = summary.net.saturating_add(delta);
            if delta >= 0 {
                summary.income = summary.income.saturating_add(delta);
            } else {
                summary.expenses = summary.expenses.saturating_add(delta.saturating_neg());
            }
            let slot = summary.by_category.entry(event.category).or_default();
            *slot = slot.saturating_add(delta);
        }
        summary
    }
}

/// Activity in a window plus the live state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionOverview {
    pub total_events: usize,
    pub counts_by_category: BTreeMap<Category, usize>,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
    pub state: GameState,
    pub status: Option<StatusSnapshot>,
}

impl SessionOverview {
    pub fn from_events(
        events: &[ClassifiedEvent],
        state: GameState,
        status: Option<StatusSnapshot>,
    ) -> Self {
        let mut counts_by_category = BTreeMap::new();
        for event in events {
            *counts_by_category.entry(event.category).or_default() += 1;
        }
        Self {
            total_events: events.len(),
            counts_by_category,
            first_event: events.iter().map(ClassifiedEvent::timestamp).min(),
            last_event: events.iter().map(ClassifiedEvent::timestamp).max(),
            state,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edjournal_core::{classify_record, decode_line};

    fn ev(body: &str) -> ClassifiedEvent {
        let line = format!(r#"{{"timestamp":"2025-01-01T00:00:00Z",{body}}}"#);
        classify_record(decode_line(line.as_bytes()).unwrap())
    }

    #[test]
    fn test_empty_input_gives_zeroed_summaries() {
        assert_eq!(TradingSummary::from_events(&[]), TradingSummary::default());
        assert_eq!(ExplorationSummary::from_events(&[]), ExplorationSummary::default());
        assert_eq!(CombatSummary::from_events(&[]), CombatSummary::default());
        assert_eq!(MissionSummary::from_events(&[]), MissionSummary::default());
        assert_eq!(CreditChange::from_events(&[]), CreditChange::default());
        assert_eq!(MissionSummary::default().success_rate(), 0.0);
    }

    #[test]
    fn test_trading_by_commodity() {
        let events = vec![
            ev(r#""type":"MarketBuy","Type":"gold","Type_Localised":"Gold","Count":10,"BuyPrice":9000,"TotalCost":90000"#),
            ev(r#""type":"MarketSell","Type":"gold","Type_Localised":"Gold","Count":10,"SellPrice":9500,"TotalSale":95000,"AvgPricePaid":9000"#),
            ev(r#""type":"MarketBuy","Type":"tea","Count":2,"BuyPrice":1000,"TotalCost":2000"#),
            ev(r#""type":"CollectCargo","Type":"tea""#),
        ];
        let summary = TradingSummary::from_events(&events);
        assert_eq!(summary.transactions, 3);
        assert_eq!(summary.total_cost, 92_000);
        assert_eq!(summary.total_revenue, 95_000);
        assert_eq!(summary.total_profit, 5_000);

        let gold = &summary.commodities["Gold"];
        assert_eq!((gold.bought, gold.sold, gold.profit), (10, 10, 5_000));
        assert_eq!(summary.commodities["tea"].cost, 2_000);
    }

    #[test]
    fn test_totals_saturate_on_extreme_values() {
        let events = vec![
            ev(r#""type":"MarketSell","Type":"gold","Count":9223372036854775807,"TotalSale":9223372036854775807"#),
            ev(r#""type":"MarketSell","Type":"gold","Count":1,"TotalSale":1000"#),
            ev(r#""type":"MarketBuy","Type":"gold","Count":1,"TotalCost":9223372036854775807"#),
            ev(r#""type":"MarketBuy","Type":"gold","Count":1,"TotalCost":1"#),
        ];
        let summary = TradingSummary::from_events(&events);
        assert_eq!(summary.total_revenue, i64::MAX);
        assert_eq!(summary.total_cost, i64::MAX);
        assert_eq!(summary.commodities["gold"].sold, i64::MAX);

        let missions = MissionSummary::from_events(&[
            ev(r#""type":"MissionCompleted","Reward":9223372036854775807"#),
            ev(r#""type":"MissionCompleted","Reward":1"#),
        ]);
        assert_eq!(missions.rewards, i64::MAX);
    }

    #[test]
    fn test_exploration_counts() {
        let events = vec![
            ev(r#""type":"FSDJump","StarSystem":"Sol","JumpDist":4.5"#),
            ev(r#""type":"FSDJump","StarSystem":"Achenar","JumpDist":10.5"#),
            ev(r#""type":"FSDJump","StarSystem":"Sol","JumpDist":2.0"#),
            ev(r#""type":"Scan","BodyName":"Achenar 1","WasDiscovered":false,"WasMapped":false"#),
            ev(r#""type":"Scan","BodyName":"Achenar 1","WasDiscovered":false,"WasMapped":false"#),
            ev(r#""type":"Scan","BodyName":"Achenar 2","WasDiscovered":true,"WasMapped":false"#),
            ev(r#""type":"SAAScanComplete","BodyName":"Achenar 1","ProbesUsed":5"#),
            ev(r#""type":"SellExplorationData","BaseValue":1000,"Bonus":500,"TotalEarnings":1500"#),
        ];
        let summary = ExplorationSummary::from_events(&events);
        assert_eq!(summary.jumps, 3);
        assert!((summary.distance_ly - 17.0).abs() < f64::EPSILON);
        assert_eq!(summary.systems_visited.len(), 2);
        assert_eq!(summary.bodies_scanned, 2);
        assert_eq!(summary.first_discoveries, 1);
        assert_eq!(summary.first_mapped, 2);
        assert_eq!(summary.bodies_mapped, 1);
        assert_eq!(summary.data_sold, 1500);
    }

    #[test]
    fn test_combat_counts() {
        let events = vec![
            ev(r#""type":"Bounty","TotalReward":20000,"VictimFaction":"Pirates""#),
            ev(r#""type":"FactionKillBond","Reward":5000,"AwardingFaction":"Feds","VictimFaction":"Imps""#),
            ev(r#""type":"RedeemVoucher","Type":"bounty","Amount":20000"#),
            ev(r#""type":"PayBounties","Amount":300,"Faction":"Police""#),
            ev(r#""type":"Died""#),
            ev(r#""type":"Interdicted","Submitted":true,"IsPlayer":false"#),
            ev(r#""type":"Interdiction","Success":true,"IsPlayer":false"#),
        ];
        let summary = CombatSummary::from_events(&events);
        assert_eq!(summary.kills, 2);
        assert_eq!(summary.bounty_rewards, 20_000);
        assert_eq!(summary.bond_rewards, 5_000);
        assert_eq!(summary.vouchers_redeemed, 20_000);
        assert_eq!(summary.bounties_paid, 300);
        assert_eq!(summary.deaths, 1);
        assert_eq!(summary.interdicted, 1);
        assert_eq!(summary.interdictions_made, 1);
    }

    #[test]
    fn test_missions_and_credits() {
        let events = vec![
            ev(r#""type":"MissionAccepted","MissionID":1,"Faction":"Feds","Reward":100000"#),
            ev(r#""type":"MissionAccepted","MissionID":2,"Faction":"Feds""#),
            ev(r#""type":"MissionCompleted","MissionID":1,"Faction":"Feds","Reward":100000,"Donated":10000"#),
            ev(r#""type":"MissionFailed","MissionID":2,"Fine":5000"#),
        ];
        let missions = MissionSummary::from_events(&events);
        assert_eq!((missions.accepted, missions.completed, missions.failed), (2, 1, 1));
        assert_eq!(missions.rewards, 100_000);
        assert_eq!(missions.completed_by_faction["Feds"], 1);
        assert!((missions.success_rate() - 0.5).abs() < f64::EPSILON);

        let credits = CreditChange::from_events(&events);
        assert_eq!(credits.income, 90_000);
        assert_eq!(credits.expenses, 5_000);
        assert_eq!(credits.net, 85_000);
        assert_eq!(credits.by_category[&Category::Missions], 85_000);
        assert_eq!(credits.transactions, 2);
    }
}
