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

//! Event Category Taxonomy
//!
//! Coarse buckets assigned to every journal record. The tag table is closed
//! and built once; [`Category::for_type`] is total over all strings.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Classification bucket for a journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Jumps, supercruise, docking, planetary approach
    Navigation,
    /// Scans, discoveries, cartographic data
    Exploration,
    /// Commodity market activity and cargo handling
    Trading,
    /// Prospecting and refining
    Mining,
    /// Bounties, bonds, interdictions, deaths
    Combat,
    /// Missions, passengers, community goals
    Missions,
    /// Ship ownership, loadout and vehicles
    Ship,
    /// Module purchases and storage
    Outfitting,
    /// Engineers, materials, synthesis
    Engineering,
    /// Station services: refuel, repair, restock, fines
    Station,
    /// Chat, friends, wings
    Social,
    Powerplay,
    Squadron,
    /// Fleet carrier management
    Carrier,
    /// On-foot gameplay (suits, weapons, micro resources)
    OnFoot,
    /// Multicrew and NPC crew
    Crew,
    /// Ranks, progress, reputation
    Progress,
    /// Game session bookkeeping: file header, load, shutdown
    Session,
    /// Status file snapshots
    Status,
    /// Catch-all for unrecognised tags
    Other,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Category::Navigation,
        Category::Exploration,
        Category::Trading,
        Category::Mining,
        Category::Combat,
        Category::Missions,
        Category::Ship,
        Category::Outfitting,
        Category::Engineering,
        Category::Station,
        Category::Social,
        Category::Powerplay,
        Category::Squadron,
        Category::Carrier,
        Category::OnFoot,
        Category::Crew,
        Category::Progress,
        Category::Session,
        Category::Status,
        Category::Other,
    ];

    /// Look up the category for a record type tag.
    ///
    /// Unknown tags resolve to [`Category::Other`].
    pub fn for_type(record_type: &str) -> Category {
        CATEGORY_TABLE
            .get(record_type)
            .copied()
            .unwrap_or(Category::Other)
    }

    /// Whether events in this category may change the derived game state
    /// (location, ship, rank, commander).
    pub fn affects_state(self) -> bool {
        matches!(
            self,
            Category::Navigation | Category::Ship | Category::Progress | Category::Session
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Navigation => "Navigation",
            Category::Exploration => "Exploration",
            Category::Trading => "Trading",
            Category::Mining => "Mining",
            Category::Combat => "Combat",
            Category::Missions => "Missions",
            Category::Ship => "Ship",
            Category::Outfitting => "Outfitting",
            Category::Engineering => "Engineering",
            Category::Station => "Station",
            Category::Social => "Social",
            Category::Powerplay => "Powerplay",
            Category::Squadron => "Squadron",
            Category::Carrier => "Carrier",
            Category::OnFoot => "OnFoot",
            Category::Crew => "Crew",
            Category::Progress => "Progress",
            Category::Session => "Session",
            Category::Status => "Status",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Case-insensitive; accepts `on_foot`/`onfoot` style spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown category: {s}"))
    }
}

const NAVIGATION: &[&str] = &[
    "FSDJump",
    "Location",
    "StartJump",
    "FSDTarget",
    "SupercruiseEntry",
    "SupercruiseExit",
    "SupercruiseDestinationDrop",
    "ApproachBody",
    "LeaveBody",
    "ApproachSettlement",
    "Touchdown",
    "Liftoff",
    "NavRoute",
    "NavRouteClear",
    "JetConeBoost",
    "JetConeDamage",
    "DockingRequested",
    "DockingGranted",
    "DockingDenied",
    "DockingCancelled",
    "DockingTimeout",
    "Docked",
    "Undocked",
    "CarrierJump",
    "BookTaxi",
    "CancelTaxi",
    "BookDropship",
    "CancelDropship",
    "USSDrop",
];

const EXPLORATION: &[&str] = &[
    "Scan",
    "FSSDiscoveryScan",
    "FSSAllBodiesFound",
    "FSSBodySignals",
    "FSSSignalDiscovered",
    "SAAScanComplete",
    "SAASignalsFound",
    "DiscoveryScan",
    "NavBeaconScan",
    "MultiSellExplorationData",
    "SellExplorationData",
    "BuyExplorationData",
    "CodexEntry",
    "ScanBaryCentre",
    "ScanOrganic",
    "SellOrganicData",
    "DatalinkScan",
    "DatalinkVoucher",
    "DataScanned",
    "Screenshot",
];

const TRADING: &[&str] = &[
    "MarketBuy",
    "MarketSell",
    "Market",
    "BuyTradeData",
    "CollectCargo",
    "EjectCargo",
    "CargoTransfer",
    "CargoDepot",
    "Cargo",
    "TradeMicroResources",
    "BuyMicroResources",
    "SellMicroResources",
];

const MINING: &[&str] = &[
    "MiningRefined",
    "ProspectedAsteroid",
    "AsteroidCracked",
    "LaunchDrone",
];

const COMBAT: &[&str] = &[
    "Bounty",
    "CapShipBond",
    "FactionKillBond",
    "Died",
    "Interdicted",
    "Interdiction",
    "EscapeInterdiction",
    "PVPKill",
    "ShieldState",
    "HullDamage",
    "UnderAttack",
    "ShipTargeted",
    "RedeemVoucher",
    "PayBounties",
    "CommitCrime",
    "CrimeVictim",
    "HeatWarning",
    "HeatDamage",
    "SelfDestruct",
    "Resurrect",
    "FighterDestroyed",
    "SRVDestroyed",
    "CockpitBreached",
];

const MISSIONS: &[&str] = &[
    "MissionAccepted",
    "MissionCompleted",
    "MissionFailed",
    "MissionAbandoned",
    "MissionRedirected",
    "Missions",
    "Passengers",
    "CommunityGoal",
    "CommunityGoalJoin",
    "CommunityGoalDiscard",
    "CommunityGoalReward",
    "SearchAndRescue",
];

const SHIP: &[&str] = &[
    "Loadout",
    "ShipyardBuy",
    "ShipyardSell",
    "ShipyardSwap",
    "ShipyardNew",
    "ShipyardTransfer",
    "StoredShips",
    "Shipyard",
    "SetUserShipName",
    "SellShipOnRebuy",
    "FuelScoop",
    "ReservoirReplenished",
    "AfmuRepairs",
    "RebootRepair",
    "RepairDrone",
    "LaunchSRV",
    "DockSRV",
    "LaunchFighter",
    "DockFighter",
    "VehicleSwitch",
    "FighterRebuilt",
    "ModuleInfo",
];

const OUTFITTING: &[&str] = &[
    "ModuleBuy",
    "ModuleSell",
    "ModuleSellRemote",
    "ModuleStore",
    "ModuleRetrieve",
    "ModuleSwap",
    "MassModuleStore",
    "FetchRemoteModule",
    "StoredModules",
    "Outfitting",
];

const ENGINEERING: &[&str] = &[
    "EngineerContribution",
    "EngineerCraft",
    "EngineerProgress",
    "EngineerLegacyConvert",
    "MaterialCollected",
    "MaterialDiscarded",
    "MaterialDiscovered",
    "MaterialTrade",
    "Materials",
    "Synthesis",
    "TechnologyBroker",
    "UpgradeSuit",
    "UpgradeWeapon",
    "ScientificResearch",
];

const STATION: &[&str] = &[
    "RefuelAll",
    "RefuelPartial",
    "Repair",
    "RepairAll",
    "RestockVehicle",
    "BuyAmmo",
    "BuyDrones",
    "SellDrones",
    "PayFines",
    "PayLegacyFines",
    "ClearImpound",
    "ShipRedeemed",
];

const SOCIAL: &[&str] = &[
    "Friends",
    "ReceiveText",
    "SendText",
    "WingAdd",
    "WingInvite",
    "WingJoin",
    "WingLeave",
];

const POWERPLAY: &[&str] = &[
    "Powerplay",
    "PowerplayCollect",
    "PowerplayDefect",
    "PowerplayDeliver",
    "PowerplayFastTrack",
    "PowerplayJoin",
    "PowerplayLeave",
    "PowerplaySalary",
    "PowerplayVote",
    "PowerplayVoucher",
    "PowerplayMerits",
    "PowerplayRank",
];

const SQUADRON: &[&str] = &[
    "AppliedToSquadron",
    "DisbandedSquadron",
    "InvitedToSquadron",
    "JoinedSquadron",
    "KickedFromSquadron",
    "LeftSquadron",
    "SharedBookmarkToSquadron",
    "SquadronCreated",
    "SquadronDemotion",
    "SquadronPromotion",
    "SquadronStartup",
    "WonATrophyForSquadron",
];

const CARRIER: &[&str] = &[
    "CarrierBuy",
    "CarrierStats",
    "CarrierJumpRequest",
    "CarrierJumpCancelled",
    "CarrierDecommission",
    "CarrierCancelDecommission",
    "CarrierBankTransfer",
    "CarrierDepositFuel",
    "CarrierCrewServices",
    "CarrierFinance",
    "CarrierShipPack",
    "CarrierModulePack",
    "CarrierTradeOrder",
    "CarrierDockingPermission",
    "CarrierNameChanged",
    "CarrierLocation",
    "FCMaterials",
];

const ON_FOOT: &[&str] = &[
    "Embark",
    "Disembark",
    "BuySuit",
    "SellSuit",
    "BuyWeapon",
    "SellWeapon",
    "CreateSuitLoadout",
    "DeleteSuitLoadout",
    "RenameSuitLoadout",
    "SwitchSuitLoadout",
    "LoadoutEquipModule",
    "LoadoutRemoveModule",
    "SuitLoadout",
    "ShipLocker",
    "Backpack",
    "BackpackChange",
    "CollectItems",
    "DropItems",
    "UseConsumable",
];

const CREW: &[&str] = &[
    "CrewAssign",
    "CrewFire",
    "CrewHire",
    "CrewLaunchFighter",
    "CrewMemberJoins",
    "CrewMemberQuits",
    "CrewMemberRoleChange",
    "EndCrewSession",
    "JoinACrew",
    "KickCrewMember",
    "QuitACrew",
    "ChangeCrewRole",
    "NpcCrewPaidWage",
    "NpcCrewRank",
];

const PROGRESS: &[&str] = &["Rank", "Progress", "Promotion", "Reputation", "Statistics"];

const SESSION: &[&str] = &[
    "Fileheader",
    "Commander",
    "LoadGame",
    "NewCommander",
    "ClearSavedGame",
    "Shutdown",
    "Continued",
    "Music",
];

const STATUS: &[&str] = &["Status"];

static CATEGORY_TABLE: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    let groups: [(Category, &[&str]); 19] = [
        (Category::Navigation, NAVIGATION),
        (Category::Exploration, EXPLORATION),
        (Category::Trading, TRADING),
        (Category::Mining, MINING),
        (Category::Combat, COMBAT),
        (Category::Missions, MISSIONS),
        (Category::Ship, SHIP),
        (Category::Outfitting, OUTFITTING),
        (Category::Engineering, ENGINEERING),
        (Category::Station, STATION),
        (Category::Social, SOCIAL),
        (Category::Powerplay, POWERPLAY),
        (Category::Squadron, SQUADRON),
        (Category::Carrier, CARRIER),
        (Category::OnFoot, ON_FOOT),
        (Category::Crew, CREW),
        (Category::Progress, PROGRESS),
        (Category::Session, SESSION),
        (Category::Status, STATUS),
    ];

    let mut table = HashMap::with_capacity(256);
    for (category, tags) in groups {
        for tag in tags {
            table.insert(*tag, category);
        }
    }
    table
});

/// Number of tags with a known category.
pub fn known_type_count() -> usize {
    CATEGORY_TABLE.len()
}
