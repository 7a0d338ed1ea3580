//! Core entity structs for the Cryptopolis simulation.
//!
//! Covers placed buildings, the append-only event and ledger records, and
//! the end-of-game statistics snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BuildingType, EventKind, LedgerEntryKind};
use crate::ids::BuildingId;

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// An isometric grid coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Tile {
    /// Construct a tile from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Tile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A building placed in the city.
///
/// Immutable after creation except for `accumulated_yield`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Building {
    /// Session-unique identifier.
    pub id: BuildingId,
    /// Catalog type.
    pub building_type: BuildingType,
    /// Where the building stands.
    pub tile: Tile,
    /// Day the building was placed.
    pub built_on_day: u64,
    /// Price paid at placement.
    #[ts(as = "String")]
    pub cost_basis: Decimal,
    /// Total yield this building has credited to the treasury.
    #[ts(as = "String")]
    pub accumulated_yield: Decimal,
}

impl Building {
    /// Value locked in this building: what was paid plus what it has earned.
    pub fn value(&self) -> Decimal {
        self.cost_basis.saturating_add(self.accumulated_yield)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An entry in the append-only economic event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventRecord {
    /// What happened.
    pub kind: EventKind,
    /// Day on which it happened.
    pub day: u64,
    /// Display name of the event (disaster name, milestone name, or the
    /// rugged building's name).
    pub name: String,
    /// The affected building, for targeted events.
    pub building: Option<BuildingId>,
    /// Signed treasury delta (negative for losses, positive for rewards).
    #[ts(as = "String")]
    pub magnitude: Decimal,
    /// Whether the affected building was destroyed.
    pub destroyed: bool,
}

/// A single movement of treasury funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LedgerEntry {
    /// Day on which the movement was recorded.
    pub day: u64,
    /// Category of the movement.
    pub kind: LedgerEntryKind,
    /// Strictly positive amount; the direction comes from `kind`.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Building the movement relates to, if any.
    pub building: Option<BuildingId>,
}

// ---------------------------------------------------------------------------
// End of game
// ---------------------------------------------------------------------------

/// Immutable statistics captured exactly once when the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameEndStats {
    /// Days elapsed when the end condition matched.
    pub days_survived: u64,
    /// Highest total value locked ever observed.
    #[ts(as = "String")]
    pub peak_tvl: Decimal,
    /// Highest population ever observed.
    pub peak_population: u64,
    /// Highest number of simultaneously standing buildings.
    pub peak_building_count: u64,
    /// Sum of all building yield credited during the session.
    #[ts(as = "String")]
    pub total_yield_earned: Decimal,
    /// Treasury balance at the moment the condition matched.
    #[ts(as = "String")]
    pub final_treasury: Decimal,
}

/// The game-end record produced by the objective tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameEnd {
    /// `true` for a win condition, `false` for a lose condition.
    pub is_victory: bool,
    /// Identifier of the condition that matched.
    pub end_condition_id: String,
    /// Statistics captured at the match.
    pub stats: GameEndStats,
}
