//! The single owned simulation state.
//!
//! [`GameState`] holds everything that must survive a save/restore cycle.
//! Components (sentiment, economy, scheduler, objectives) are configuration
//! plus logic; they receive `&mut GameState` for the duration of a call and
//! never keep references into it.

use std::collections::{BTreeMap, BTreeSet};

use cryptopolis_ledger::{LedgerError, TreasuryLedger};
use cryptopolis_types::{
    Building, BuildingId, EventKind, EventRecord, GameEnd, RiskCategory, SessionId,
    SessionStatus, Tile,
};
use cryptopolis_world::{BoundedGrid, blueprint};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, ClockError};
use crate::config::SimulationConfig;
use crate::sentiment::SentimentState;

/// Errors that can occur when building a fresh state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The clock rejected the configured interval.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The treasury could not be opened.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}

/// Everything a session needs to continue from where it left off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Identifier of this session.
    pub session_id: SessionId,
    /// Day counter and sub-day accumulator.
    pub clock: Clock,
    /// Sentiment index and the random stream.
    pub sentiment: SentimentState,
    /// Balance, entries, peaks, insolvency flag.
    pub treasury: TreasuryLedger,
    /// Standing buildings keyed by id (deterministic iteration order).
    pub buildings: BTreeMap<BuildingId, Building>,
    /// Identifier the next placed building receives.
    pub next_building_id: BuildingId,
    /// Append-only log of disasters, rug pulls, and milestones.
    pub events: Vec<EventRecord>,
    /// Identifiers of milestones already unlocked.
    pub milestones: BTreeSet<String>,
    /// Objective state machine.
    pub status: SessionStatus,
    /// Whether the player continued past a game end.
    pub sandbox: bool,
    /// The game-end record, kept after a sandbox continue.
    pub end: Option<GameEnd>,
    /// Buildable area.
    pub grid: BoundedGrid,
}

impl GameState {
    /// A fresh day-0 state from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the day interval is zero or the starting
    /// treasury is negative.
    pub fn new(config: &SimulationConfig) -> Result<Self, StateError> {
        let clock = Clock::new(config.session.day_interval())?;
        let treasury = TreasuryLedger::open(
            config.session.starting_treasury,
            config.economy.insolvency_floor,
        )?;
        Ok(Self {
            session_id: SessionId::new(),
            clock,
            sentiment: SentimentState::new(config.sentiment.initial, config.session.seed),
            treasury,
            buildings: BTreeMap::new(),
            next_building_id: BuildingId(1),
            events: Vec::new(),
            milestones: BTreeSet::new(),
            status: SessionStatus::Running,
            sandbox: false,
            end: None,
            grid: BoundedGrid::new(config.session.grid_width, config.session.grid_height),
        })
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Current day.
    pub const fn day(&self) -> u64 {
        self.clock.day()
    }

    /// Treasury balance.
    pub const fn balance(&self) -> Decimal {
        self.treasury.balance()
    }

    /// Total value locked, or `None` on overflow.
    pub fn checked_tvl(&self) -> Option<Decimal> {
        self.buildings
            .values()
            .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(b.value()))
    }

    /// Total value locked (saturating).
    pub fn tvl(&self) -> Decimal {
        self.buildings
            .values()
            .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.value()))
    }

    /// Residents housed across all buildings.
    pub fn population(&self) -> u64 {
        self.buildings
            .values()
            .map(|b| blueprint(b.building_type).housing)
            .fold(0_u64, u64::saturating_add)
    }

    /// Number of standing buildings.
    pub fn building_count(&self) -> u64 {
        u64::try_from(self.buildings.len()).unwrap_or(u64::MAX)
    }

    /// Tiles covered by standing buildings.
    pub fn occupied_tiles(&self) -> BTreeSet<Tile> {
        self.buildings.values().map(|b| b.tile).collect()
    }

    /// Standing buildings in a risk category, in id order.
    pub fn buildings_in(&self, category: RiskCategory) -> impl Iterator<Item = &Building> {
        self.buildings
            .values()
            .filter(move |b| blueprint(b.building_type).risk_category == category)
    }

    /// Number of recorded events of `kind`.
    pub fn event_count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Fold current aggregates into the treasury's peak trackers.
    pub fn observe_peaks(&mut self) {
        let tvl = self.tvl();
        let population = self.population();
        let count = self.building_count();
        self.treasury.observe(tvl, population, count);
    }

    /// Whether economic ticking is frozen by a game end.
    pub const fn is_frozen(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cryptopolis_types::BuildingType;

    use super::*;

    fn building(id: u64, building_type: BuildingType, x: i32) -> Building {
        Building {
            id: BuildingId(id),
            building_type,
            tile: Tile::new(x, 0),
            built_on_day: 0,
            cost_basis: blueprint(building_type).cost,
            accumulated_yield: Decimal::from(10),
        }
    }

    #[test]
    fn fresh_state_from_defaults() {
        let state = GameState::new(&SimulationConfig::default()).unwrap();
        assert_eq!(state.day(), 0);
        assert_eq!(state.balance(), Decimal::from(10_000));
        assert_eq!(state.status, SessionStatus::Running);
        assert_eq!(state.next_building_id, BuildingId(1));
        assert_eq!(state.tvl(), Decimal::ZERO);
        assert_eq!(state.grid, BoundedGrid::new(32, 32));
    }

    #[test]
    fn zero_interval_fails() {
        let mut config = SimulationConfig::default();
        config.session.day_interval_ms = 0;
        assert!(matches!(
            GameState::new(&config),
            Err(StateError::Clock { .. })
        ));
    }

    #[test]
    fn aggregates_cover_all_buildings() {
        let mut state = GameState::new(&SimulationConfig::default()).unwrap();
        for b in [
            building(1, BuildingType::Exchange, 0),
            building(2, BuildingType::HodlerHousing, 1),
            building(3, BuildingType::NftGallery, 2),
        ] {
            state.buildings.insert(b.id, b);
        }

        assert_eq!(state.tvl(), Decimal::from(2_000 + 500 + 800 + 30));
        assert_eq!(state.checked_tvl(), Some(state.tvl()));
        assert_eq!(state.population(), 10 + 50 + 3);
        assert_eq!(state.building_count(), 3);
        assert_eq!(state.occupied_tiles().len(), 3);
        assert_eq!(state.buildings_in(RiskCategory::Speculative).count(), 1);

        state.observe_peaks();
        assert_eq!(state.treasury.peak_tvl(), state.tvl());
        assert_eq!(state.treasury.peak_building_count(), 3);
    }
}
