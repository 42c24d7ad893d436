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

//! Classifier
//!
//! Pure functions mapping a [`RawRecord`] to its [`Category`] and to the
//! small set of key fields that summaries read. Absent source fields are
//! simply omitted from the output.
//!
//! Besides copying journal fields under their journal names, extraction adds
//! a few normalised keys:
//!
//! - `credits_delta`: signed credit change caused by the event
//! - `Commodity`: localised commodity name for market and mining events
//! - `Faction`: the faction most relevant to the event
//! - `first_discovery` / `first_mapped`: inverted `WasDiscovered` / `WasMapped`

use crate::category::Category;
use crate::event::ClassifiedEvent;
use crate::record::RawRecord;
use serde_json::Value;
use std::collections::BTreeMap;

/// Normalised subset of a record's fields.
pub type KeyFields = BTreeMap<String, Value>;

/// Key under which the signed credit change is stored.
pub const CREDITS_DELTA: &str = "credits_delta";

/// Fields copied for any record whose type has no dedicated rule.
const GENERIC_FIELDS: &[&str] = &[
    "StarSystem",
    "SystemName",
    "Body",
    "BodyName",
    "StationName",
    "Name",
    "Faction",
];

/// Classify a record by its type tag. Total: never fails.
pub fn classify(record: &RawRecord) -> Category {
    Category::for_type(&record.record_type)
}

/// Classify a record and compute its key fields once.
pub fn classify_record(record: RawRecord) -> ClassifiedEvent {
    let category = classify(&record);
    let key_fields = extract_key_fields(&record, category);
    ClassifiedEvent::new(record, category, key_fields)
}

/// Extract the category-specific key fields of a record.
pub fn extract_key_fields(record: &RawRecord, category: Category) -> KeyFields {
    let mut out = Extractor {
        record,
        fields: KeyFields::new(),
    };

    match category {
        Category::Navigation => navigation(&mut out),
        Category::Exploration => exploration(&mut out),
        Category::Trading | Category::Mining => trading(&mut out),
        Category::Combat => combat(&mut out),
        Category::Missions => missions(&mut out),
        Category::Ship | Category::Outfitting | Category::Station => ship(&mut out),
        Category::Engineering => engineering(&mut out),
        Category::Progress => progress(&mut out),
        Category::Session => session(&mut out),
        Category::Social => social(&mut out),
        Category::Powerplay => powerplay(&mut out),
        Category::Carrier => carrier(&mut out),
        Category::Squadron | Category::OnFoot | Category::Crew => generic(&mut out),
        Category::Status => status(&mut out),
        Category::Other => generic(&mut out),
    }

    out.fields
}

struct Extractor<'a> {
    record: &'a RawRecord,
    fields: KeyFields,
}

impl<'a> Extractor<'a> {
    fn tag(&self) -> &'a str {
        &self.record.record_type
    }

    fn copy(&mut self, names: &[&str]) {
        for name in names {
            if let Some(value) = self.record.get(name).filter(|v| !v.is_null()) {
                self.fields.insert((*name).to_string(), value.clone());
            }
        }
    }

    /// Copy `src` (preferring `src_Localised`) under the key `dst`.
    fn copy_localised(&mut self, src: &str, dst: &str) {
        if let Some(value) = self.record.get_localised(src) {
            self.fields
                .insert(dst.to_string(), Value::String(value.to_string()));
        }
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    fn credits(&mut self, delta: i64) {
        if delta != 0 {
            self.set(CREDITS_DELTA, delta);
        }
    }

    fn earn(&mut self, field: &str) {
        if let Some(amount) = self.record.get_i64(field) {
            self.copy(&[field]);
            self.credits(amount);
        }
    }

    fn spend(&mut self, field: &str) {
        if let Some(amount) = self.record.get_i64(field) {
            self.copy(&[field]);
            self.credits(amount.saturating_neg());
        }
    }

    /// Pull `Name` out of a nested faction object such as
    /// `"SystemFaction": {"Name": "..."}`.
    fn nested_name(&mut self, src: &str, dst: &str) {
        let name = match self.record.get(src) {
            Some(Value::Object(map)) => map.get("Name").and_then(Value::as_str),
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        };
        if let Some(name) = name {
            self.set(dst, name.to_string());
        }
    }
}

fn generic(out: &mut Extractor<'_>) {
    out.copy(GENERIC_FIELDS);
}

fn navigation(out: &mut Extractor<'_>) {
    match out.tag() {
        "FSDJump" | "CarrierJump" => {
            out.copy(&[
                "StarSystem",
                "SystemAddress",
                "JumpDist",
                "FuelUsed",
                "Body",
                "SystemAllegiance",
                "SystemSecurity_Localised",
            ]);
            out.nested_name("SystemFaction", "Faction");
        }
        "Location" => {
            out.copy(&["StarSystem", "SystemAddress", "Body", "StationName", "Docked"]);
            out.nested_name("SystemFaction", "Faction");
        }
        "Docked" => {
            out.copy(&["StationName", "StationType", "StarSystem", "MarketID"]);
            out.nested_name("StationFaction", "Faction");
        }
        "Undocked" | "DockingRequested" | "DockingGranted" | "DockingDenied"
        | "DockingCancelled" | "DockingTimeout" => {
            out.copy(&["StationName", "StationType", "LandingPad", "Reason"]);
        }
        "StartJump" => out.copy(&["JumpType", "StarSystem", "StarClass"]),
        "FSDTarget" => out.copy(&["Name", "StarClass", "RemainingJumpsInRoute"]),
        "SupercruiseEntry" | "SupercruiseExit" | "SupercruiseDestinationDrop" => {
            out.copy(&["StarSystem", "Body", "BodyType", "Type"]);
        }
        "ApproachBody" | "LeaveBody" | "Touchdown" | "Liftoff" | "ApproachSettlement" => {
            out.copy(&["StarSystem", "Body", "Name", "Latitude", "Longitude"]);
        }
        "USSDrop" => out.copy_localised("USSType", "USSType"),
        _ => generic(out),
    }
}

fn exploration(out: &mut Extractor<'_>) {
    match out.tag() {
        "Scan" => {
            out.copy(&[
                "BodyName",
                "StarSystem",
                "ScanType",
                "StarType",
                "PlanetClass",
                "TerraformState",
                "DistanceFromArrivalLS",
                "WasDiscovered",
                "WasMapped",
            ]);
            if let Some(discovered) = out.record.get_bool("WasDiscovered") {
                out.set("first_discovery", !discovered);
            }
            if let Some(mapped) = out.record.get_bool("WasMapped") {
                out.set("first_mapped", !mapped);
            }
        }
        "FSSDiscoveryScan" => out.copy(&["SystemName", "BodyCount", "NonBodyCount", "Progress"]),
        "FSSAllBodiesFound" => out.copy(&["SystemName", "Count"]),
        "SAAScanComplete" => out.copy(&["BodyName", "ProbesUsed", "EfficiencyTarget"]),
        "SAASignalsFound" | "FSSBodySignals" => {
            out.copy(&["BodyName"]);
            if let Some(Value::Array(signals)) = out.record.get("Signals") {
                let count = signals
                    .iter()
                    .filter_map(|s| s.get("Count").and_then(Value::as_i64))
                    .fold(0i64, i64::saturating_add);
                out.set("SignalCount", count);
            }
        }
        "FSSSignalDiscovered" => {
            out.copy_localised("SignalName", "SignalName");
            out.copy(&["IsStation"]);
        }
        "SellExplorationData" | "MultiSellExplorationData" => {
            out.copy(&["BaseValue", "Bonus"]);
            let total = out.record.get_i64("TotalEarnings").unwrap_or_else(|| {
                let base = out.record.get_i64("BaseValue").unwrap_or(0);
                base.saturating_add(out.record.get_i64("Bonus").unwrap_or(0))
            });
            out.set("TotalEarnings", total);
            out.credits(total);
            if let Some(Value::Array(systems)) = out.record.get("Systems") {
                out.set("SystemCount", systems.len() as i64);
            }
            if let Some(Value::Array(systems)) = out.record.get("Discovered") {
                out.set("SystemCount", systems.len() as i64);
            }
        }
        "SellOrganicData" => {
            if let Some(Value::Array(items)) = out.record.get("BioData") {
                let total = items
                    .iter()
                    .map(|item| {
                        let value = item.get("Value").and_then(Value::as_i64).unwrap_or(0);
                        value.saturating_add(item.get("Bonus").and_then(Value::as_i64).unwrap_or(0))
                    })
                    .fold(0i64, i64::saturating_add);
                out.set("TotalEarnings", total);
                out.credits(total);
            }
        }
        "BuyExplorationData" => {
            out.copy(&["System"]);
            out.spend("Cost");
        }
        "CodexEntry" => {
            out.copy_localised("Name", "Name");
            out.copy_localised("Category", "Category");
            out.copy(&["System", "IsNewEntry", "VoucherAmount"]);
        }
        "ScanOrganic" => {
            out.copy(&["ScanType", "Body"]);
            out.copy_localised("Species", "Species");
        }
        "DatalinkVoucher" => {
            out.copy(&["PayeeFaction"]);
            out.copy(&["Reward"]);
        }
        _ => generic(out),
    }
}

fn trading(out: &mut Extractor<'_>) {
    match out.tag() {
        "MarketBuy" => {
            out.copy_localised("Type", "Commodity");
            out.copy(&["Count", "BuyPrice", "MarketID"]);
            out.spend("TotalCost");
        }
        "MarketSell" => {
            out.copy_localised("Type", "Commodity");
            out.copy(&["Count", "SellPrice", "AvgPricePaid", "MarketID"]);
            out.earn("TotalSale");
            if let (Some(total), Some(avg), Some(count)) = (
                out.record.get_i64("TotalSale"),
                out.record.get_i64("AvgPricePaid"),
                out.record.get_i64("Count"),
            ) {
                out.set("Profit", total.saturating_sub(avg.saturating_mul(count)));
            }
        }
        "BuyTradeData" => {
            out.copy(&["System"]);
            out.spend("Cost");
        }
        "CollectCargo" | "EjectCargo" => {
            out.copy_localised("Type", "Commodity");
            out.copy(&["Count", "Stolen", "Abandoned"]);
        }
        "MiningRefined" => out.copy_localised("Type", "Commodity"),
        "ProspectedAsteroid" => {
            out.copy_localised("Content", "Content");
            out.copy(&["Remaining", "MotherlodeMaterial"]);
        }
        "AsteroidCracked" => out.copy(&["Body"]),
        "LaunchDrone" => out.copy(&["Type"]),
        "BuyMicroResources" => {
            out.copy_localised("Name", "Commodity");
            out.copy(&["Count"]);
            out.spend("Price");
        }
        "SellMicroResources" => out.earn("Price"),
        _ => generic(out),
    }
}

fn combat(out: &mut Extractor<'_>) {
    match out.tag() {
        "Bounty" => {
            out.copy_localised("Target", "Target");
            out.copy(&["VictimFaction", "TotalReward", "Reward", "SharedWithOthers"]);
            out.copy_localised("VictimFaction", "Faction");
        }
        "FactionKillBond" | "CapShipBond" => {
            out.copy(&["Reward", "VictimFaction"]);
            out.copy_localised("AwardingFaction", "Faction");
        }
        "RedeemVoucher" => {
            out.copy(&["Type", "Faction", "BrokerPercentage"]);
            out.earn("Amount");
        }
        "PayBounties" => {
            out.copy(&["Faction"]);
            out.spend("Amount");
        }
        "Died" => {
            out.copy_localised("KillerName", "KillerName");
            out.copy(&["KillerShip", "KillerRank"]);
        }
        "Interdicted" => {
            out.copy_localised("Interdictor", "Interdictor");
            out.copy(&["IsPlayer", "Submitted", "Faction", "Power"]);
        }
        "Interdiction" => {
            out.copy_localised("Interdicted", "Interdicted");
            out.copy(&["IsPlayer", "Success", "Faction", "Power"]);
        }
        "EscapeInterdiction" => {
            out.copy_localised("Interdictor", "Interdictor");
            out.copy(&["IsPlayer"]);
        }
        "PVPKill" => out.copy(&["Victim", "CombatRank"]),
        "CommitCrime" => {
            out.copy(&["CrimeType", "Faction", "Victim", "Fine", "Bounty"]);
        }
        "ShipTargeted" => {
            out.copy(&["TargetLocked", "Ship", "PilotName_Localised", "LegalStatus", "Faction", "Bounty"]);
        }
        "HullDamage" => out.copy(&["Health", "PlayerPilot", "Fighter"]),
        "ShieldState" => out.copy(&["ShieldsUp"]),
        "UnderAttack" => out.copy(&["Target"]),
        _ => generic(out),
    }
}

fn missions(out: &mut Extractor<'_>) {
    match out.tag() {
        "MissionAccepted" => {
            out.copy(&[
                "MissionID",
                "Name",
                "Faction",
                "Reward",
                "Expiry",
                "DestinationSystem",
                "DestinationStation",
                "Influence",
            ]);
            out.copy_localised("LocalisedName", "LocalisedName");
        }
        "MissionCompleted" => {
            out.copy(&["MissionID", "Name", "Faction", "Reward", "Donated"]);
            out.copy_localised("LocalisedName", "LocalisedName");
            let reward = out.record.get_i64("Reward").unwrap_or(0);
            let donated = out.record.get_i64("Donated").unwrap_or(0);
            out.credits(reward.saturating_sub(donated));
        }
        "MissionFailed" | "MissionAbandoned" => {
            out.copy(&["MissionID", "Name"]);
            out.copy_localised("LocalisedName", "LocalisedName");
            out.spend("Fine");
        }
        "MissionRedirected" => {
            out.copy(&["MissionID", "Name", "NewDestinationSystem", "NewDestinationStation"]);
        }
        "CommunityGoalReward" => {
            out.copy(&["CGID", "Name", "System"]);
            out.earn("Reward");
        }
        "CommunityGoalJoin" | "CommunityGoalDiscard" => out.copy(&["CGID", "Name", "System"]),
        "SearchAndRescue" => {
            out.copy_localised("Name", "Commodity");
            out.copy(&["Count"]);
            out.earn("Reward");
        }
        _ => generic(out),
    }
}

fn ship(out: &mut Extractor<'_>) {
    match out.tag() {
        "Loadout" => {
            out.copy(&[
                "Ship",
                "ShipID",
                "ShipName",
                "ShipIdent",
                "HullValue",
                "ModulesValue",
                "Rebuy",
            ]);
        }
        "ShipyardBuy" => {
            out.copy(&["ShipType", "StoreOldShip", "SellOldShip"]);
            let price = out.record.get_i64("ShipPrice").unwrap_or(0);
            let sold = out.record.get_i64("SellPrice").unwrap_or(0);
            out.copy(&["ShipPrice", "SellPrice"]);
            out.credits(sold.saturating_sub(price));
        }
        "ShipyardSell" | "SellShipOnRebuy" => {
            out.copy(&["ShipType", "SellShipID", "SellShipId"]);
            out.earn("ShipPrice");
        }
        "ShipyardSwap" | "ShipyardNew" => {
            out.copy(&["ShipType", "ShipID", "NewShipID", "StoreOldShip", "SellOldShip"]);
        }
        "ShipyardTransfer" => {
            out.copy(&["ShipType", "ShipID", "System", "Distance", "TransferTime"]);
            out.spend("TransferPrice");
        }
        "SetUserShipName" => out.copy(&["Ship", "ShipID", "UserShipName", "UserShipId"]),
        "ModuleBuy" => {
            out.copy(&["Slot", "BuyItem", "SellItem", "Ship"]);
            let price = out.record.get_i64("BuyPrice").unwrap_or(0);
            let sold = out.record.get_i64("SellPrice").unwrap_or(0);
            out.copy(&["BuyPrice", "SellPrice"]);
            out.credits(sold.saturating_sub(price));
        }
        "ModuleSell" | "ModuleSellRemote" => {
            out.copy(&["Slot", "SellItem", "Ship"]);
            out.earn("SellPrice");
        }
        "ModuleStore" | "ModuleRetrieve" | "ModuleSwap" => {
            out.copy(&["Slot", "StoredItem", "RetrievedItem", "FromItem", "ToItem", "Ship"]);
            out.spend("Cost");
        }
        "FetchRemoteModule" => {
            out.copy(&["StoredItem", "Ship"]);
            out.spend("TransferCost");
        }
        "RefuelAll" | "RefuelPartial" => {
            out.copy(&["Amount"]);
            out.spend("Cost");
        }
        "Repair" | "RepairAll" | "RestockVehicle" | "BuyAmmo" | "PayLegacyFines" => {
            out.copy(&["Item", "Type", "Count"]);
            out.spend("Cost");
        }
        "PayFines" => {
            out.copy(&["Faction", "AllFines"]);
            out.spend("Amount");
        }
        "BuyDrones" => {
            out.copy(&["Count", "BuyPrice"]);
            out.spend("TotalCost");
        }
        "SellDrones" => {
            out.copy(&["Count", "SellPrice"]);
            out.earn("TotalSale");
        }
        "FuelScoop" => out.copy(&["Scooped", "Total"]),
        "LaunchSRV" | "DockSRV" => out.copy(&["SRVType", "Loadout", "ID"]),
        _ => generic(out),
    }
}

fn engineering(out: &mut Extractor<'_>) {
    match out.tag() {
        "EngineerCraft" => {
            out.copy(&["Engineer", "BlueprintName", "Level", "Quality", "Slot"]);
            out.copy_localised("Module", "Module");
        }
        "EngineerProgress" => out.copy(&["Engineer", "Progress", "Rank"]),
        "EngineerContribution" => {
            out.copy(&["Engineer", "Type", "Quantity", "TotalQuantity"]);
            out.copy_localised("Commodity", "Commodity");
            out.copy_localised("Material", "Material");
        }
        "MaterialCollected" | "MaterialDiscarded" | "MaterialDiscovered" => {
            out.copy(&["Category", "Count", "DiscoveryNumber"]);
            out.copy_localised("Name", "Name");
        }
        "Synthesis" => out.copy(&["Name"]),
        "TechnologyBroker" => out.copy(&["BrokerType"]),
        _ => generic(out),
    }
}

fn progress(out: &mut Extractor<'_>) {
    out.copy(&[
        "Combat",
        "Trade",
        "Explore",
        "Soldier",
        "Exobiologist",
        "Empire",
        "Federation",
        "CQC",
        "Alliance",
    ]);
}

fn session(out: &mut Extractor<'_>) {
    match out.tag() {
        "LoadGame" => out.copy(&[
            "Commander",
            "FID",
            "Ship",
            "ShipID",
            "ShipName",
            "ShipIdent",
            "Credits",
            "Loan",
            "GameMode",
            "Group",
            "Odyssey",
            "Horizons",
        ]),
        "Commander" | "NewCommander" | "ClearSavedGame" => out.copy(&["Name", "FID", "Package"]),
        "Fileheader" => out.copy(&["part", "gameversion", "build", "language"]),
        "Music" => out.copy(&["MusicTrack"]),
        _ => generic(out),
    }
}

fn social(out: &mut Extractor<'_>) {
    out.copy(&["From", "To", "Channel", "Name", "Status"]);
    out.copy_localised("From", "From");
    out.copy_localised("Message", "Message");
}

fn powerplay(out: &mut Extractor<'_>) {
    out.copy(&["Power", "Rank", "Merits", "Votes", "Count", "Type"]);
    if out.tag() == "PowerplaySalary" {
        out.earn("Amount");
    } else if out.tag() == "PowerplayFastTrack" {
        out.spend("Cost");
    }
}

fn carrier(out: &mut Extractor<'_>) {
    out.copy(&["CarrierID", "Callsign", "Name", "SystemName", "Body"]);
    match out.tag() {
        "CarrierBuy" => out.spend("Price"),
        "CarrierBankTransfer" => {
            out.copy(&["PlayerBalance", "CarrierBalance"]);
            if let Some(deposit) = out.record.get_i64("Deposit") {
                out.copy(&["Deposit"]);
                out.credits(deposit.saturating_neg());
            } else {
                out.earn("Withdraw");
            }
        }
        _ => {}
    }
}

fn status(out: &mut Extractor<'_>) {
    out.copy(&[
        "Flags",
        "Flags2",
        "Balance",
        "LegalState",
        "BodyName",
        "Latitude",
        "Longitude",
        "Altitude",
        "Heading",
        "GuiFocus",
    ]);
}
