//! Economy: daily yields, placement, demolition, and penalties.
//!
//! A building's daily yield is
//!
//! ```text
//! base_yield(type) * sentiment_multiplier(band, category) * risk_adjustment(category)
//! ```
//!
//! rounded to cents. Safe havens earn more in fear, speculative buildings
//! earn far more in greed, residential buildings ignore the market.
//!
//! # Atomicity
//!
//! [`EconomySimulator::place_building`] validates tile and funds before it
//! touches the state. The building value is fully constructed first; the
//! debit is then the only fallible step, and the building is inserted only
//! after it succeeds. No caller can observe funds deducted without a
//! building or a building without the deduction.

use std::collections::BTreeMap;

use cryptopolis_ledger::LedgerError;
use cryptopolis_types::{
    Building, BuildingId, BuildingType, LedgerEntryKind, RiskCategory, SentimentBand, Tile,
};
use cryptopolis_world::{PlacementError, TileAuthority, blueprint};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EconomyConfig;
use crate::state::GameState;

/// Cents.
const MONEY_SCALE: u32 = 2;

// ---------------------------------------------------------------------------
// Multiplier tables
// ---------------------------------------------------------------------------

/// Yield multiplier for a risk category in a sentiment band.
pub const fn sentiment_multiplier(band: SentimentBand, category: RiskCategory) -> Decimal {
    // Hundredths, indexed ExtremeFear..ExtremeGreed.
    let row: [u32; 5] = match category {
        RiskCategory::SafeHaven => [150, 120, 100, 90, 80],
        RiskCategory::Established => [60, 80, 100, 120, 140],
        RiskCategory::Speculative => [20, 50, 100, 160, 250],
        RiskCategory::Infrastructure => [90, 95, 100, 105, 110],
        RiskCategory::Residential => [100, 100, 100, 100, 100],
    };
    let [extreme_fear, fear, neutral, greed, extreme_greed] = row;
    let hundredths = match band {
        SentimentBand::ExtremeFear => extreme_fear,
        SentimentBand::Fear => fear,
        SentimentBand::Neutral => neutral,
        SentimentBand::Greed => greed,
        SentimentBand::ExtremeGreed => extreme_greed,
    };
    Decimal::from_parts(hundredths, 0, 0, false, MONEY_SCALE)
}

/// Flat risk adjustment applied on top of the sentiment multiplier.
pub const fn risk_adjustment(category: RiskCategory) -> Decimal {
    match category {
        RiskCategory::SafeHaven => Decimal::from_parts(80, 0, 0, false, MONEY_SCALE),
        RiskCategory::Speculative => Decimal::from_parts(150, 0, 0, false, MONEY_SCALE),
        RiskCategory::Established | RiskCategory::Infrastructure | RiskCategory::Residential => {
            Decimal::ONE
        }
    }
}

/// Daily yield of one building of `building_type` in `band`.
pub fn daily_yield(building_type: BuildingType, band: SentimentBand) -> Decimal {
    let bp = blueprint(building_type);
    bp.base_yield
        .saturating_mul(sentiment_multiplier(band, bp.risk_category))
        .saturating_mul(risk_adjustment(bp.risk_category))
        .round_dp(MONEY_SCALE)
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A request to build something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRequest {
    /// Catalog type.
    pub building_type: BuildingType,
    /// Target tile.
    pub tile: Tile,
}

impl PlacementRequest {
    /// Build `building_type` at `(x, y)`.
    pub const fn new(building_type: BuildingType, x: i32, y: i32) -> Self {
        Self {
            building_type,
            tile: Tile::new(x, y),
        }
    }
}

/// What one day of yield did to the economy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickDelta {
    /// Day the yield was credited on.
    pub day: u64,
    /// Total yield credited.
    pub income: Decimal,
    /// Yield credited per building.
    pub per_building: BTreeMap<BuildingId, Decimal>,
    /// Total value locked after crediting.
    pub tvl: Decimal,
    /// Population after crediting.
    pub population: u64,
    /// Standing buildings.
    pub building_count: u64,
    /// Buildings that earned nothing because the credit failed.
    pub failures: Vec<(BuildingId, LedgerError)>,
}

/// A treasury debit caused by a stochastic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Penalty {
    /// Ledger category of the loss.
    pub kind: LedgerEntryKind,
    /// Amount to debit.
    pub amount: Decimal,
    /// Building the penalty is attributed to.
    pub target: Option<BuildingId>,
    /// Whether the target is removed.
    pub destroy: bool,
}

/// Result of [`EconomySimulator::apply_penalty`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyOutcome {
    /// Balance after the debit.
    pub balance: Decimal,
    /// Whether the balance fell below the insolvency floor.
    pub insolvent: bool,
    /// The building removed, if the penalty destroyed one.
    pub destroyed: Option<Building>,
}

/// Speculative exposure of the city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureMetrics {
    /// Value locked across all buildings.
    pub total_tvl: Decimal,
    /// Value locked in speculative buildings.
    pub speculative_tvl: Decimal,
    /// `speculative_tvl / total_tvl`, in `[0, 1]`; zero for an empty city.
    pub speculative_fraction: Decimal,
    /// Speculative buildings in id order.
    pub speculative_ids: Vec<BuildingId>,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Treasury and building accounting rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomySimulator {
    demolition_refund_pct: Decimal,
}

impl EconomySimulator {
    /// Build the simulator from configuration.
    pub const fn new(config: &EconomyConfig) -> Self {
        Self {
            demolition_refund_pct: config.demolition_refund_pct,
        }
    }

    /// Credit one day of yield for every building, in id order.
    ///
    /// The day's yield lands in the treasury as a single ledger entry.
    /// A building whose share would overflow the total is skipped; if the
    /// credit itself fails, nobody earns. Either way the affected buildings
    /// are reported in [`TickDelta::failures`].
    pub fn apply_tick(&self, state: &mut GameState) -> TickDelta {
        let day = state.day();
        let band = state.sentiment.band();
        let mut per_building = BTreeMap::new();
        let mut failures = Vec::new();
        let mut income = Decimal::ZERO;

        for building in state.buildings.values() {
            let amount = daily_yield(building.building_type, band);
            if amount <= Decimal::ZERO {
                continue;
            }
            match income.checked_add(amount) {
                Some(total) => {
                    income = total;
                    per_building.insert(building.id, amount);
                }
                None => failures.push((building.id, LedgerError::ArithmeticOverflow)),
            }
        }

        let credited = if income > Decimal::ZERO {
            state
                .treasury
                .credit(day, LedgerEntryKind::Yield, income, None)
                .map(|_| ())
        } else {
            Ok(())
        };
        if let Err(err) = credited {
            failures.extend(per_building.keys().map(|id| (*id, err.clone())));
            per_building.clear();
            income = Decimal::ZERO;
        }
        for (id, amount) in &per_building {
            if let Some(building) = state.buildings.get_mut(id) {
                building.accumulated_yield = building.accumulated_yield.saturating_add(*amount);
            }
        }

        state.observe_peaks();
        let delta = TickDelta {
            day,
            income,
            per_building,
            tvl: state.tvl(),
            population: state.population(),
            building_count: state.building_count(),
            failures,
        };
        debug!(
            day,
            %band,
            income = %delta.income,
            tvl = %delta.tvl,
            population = delta.population,
            "Yield credited"
        );
        delta
    }

    /// Place a building, debiting its cost.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError`] if the session has ended, the tile is not
    /// buildable, or the treasury cannot cover the cost. The state is
    /// unchanged on error.
    pub fn place_building(
        &self,
        state: &mut GameState,
        request: PlacementRequest,
        authority: &dyn TileAuthority,
    ) -> Result<Building, PlacementError> {
        if state.is_frozen() {
            return Err(PlacementError::SessionEnded);
        }
        authority.check(request.tile, &state.occupied_tiles())?;

        let bp = blueprint(request.building_type);
        let available = state.balance();
        if bp.cost > available {
            return Err(PlacementError::InsufficientFunds {
                required: bp.cost,
                available,
            });
        }

        let id = state.next_building_id;
        let next_id = id.next().ok_or(PlacementError::ArithmeticOverflow)?;
        let building = Building {
            id,
            building_type: request.building_type,
            tile: request.tile,
            built_on_day: state.day(),
            cost_basis: bp.cost,
            accumulated_yield: Decimal::ZERO,
        };

        state
            .treasury
            .spend(state.clock.day(), bp.cost, Some(id))
            .map_err(|err| match err {
                LedgerError::InsufficientFunds {
                    required,
                    available,
                } => PlacementError::InsufficientFunds {
                    required,
                    available,
                },
                _ => PlacementError::ArithmeticOverflow,
            })?;
        state.next_building_id = next_id;
        state.buildings.insert(id, building.clone());
        state.observe_peaks();

        debug!(
            building_id = %id,
            building_type = ?request.building_type,
            tile = %request.tile,
            cost = %bp.cost,
            "Building placed"
        );
        Ok(building)
    }

    /// Remove a building and refund part of its cost basis.
    ///
    /// Returns the removed building and the refund credited.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::UnknownBuilding`] if no building has `id`,
    /// or [`PlacementError::SessionEnded`] if the session has ended.
    pub fn demolish(
        &self,
        state: &mut GameState,
        id: BuildingId,
    ) -> Result<(Building, Decimal), PlacementError> {
        if state.is_frozen() {
            return Err(PlacementError::SessionEnded);
        }
        let cost_basis = state
            .buildings
            .get(&id)
            .map(|b| b.cost_basis)
            .ok_or(PlacementError::UnknownBuilding(id))?;

        let refund = self.refund_for(cost_basis);
        if refund > Decimal::ZERO {
            state
                .treasury
                .credit(state.clock.day(), LedgerEntryKind::Salvage, refund, Some(id))
                .map_err(|_err| PlacementError::ArithmeticOverflow)?;
        }
        let building = state
            .buildings
            .remove(&id)
            .ok_or(PlacementError::UnknownBuilding(id))?;

        debug!(building_id = %id, refund = %refund, "Building demolished");
        Ok((building, refund))
    }

    /// Salvage credited for demolishing a building with `cost_basis`.
    pub fn refund_for(&self, cost_basis: Decimal) -> Decimal {
        cost_basis
            .saturating_mul(self.demolition_refund_pct)
            .checked_div(Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
            .round_dp(MONEY_SCALE)
    }

    /// Debit a penalty, optionally destroying its target.
    ///
    /// The balance may pass below the insolvency floor; the ledger raises
    /// its insolvency flag and the pipeline settles it after objectives
    /// have seen it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the amount is invalid or the debit
    /// overflows. Nothing is destroyed in that case.
    pub fn apply_penalty(
        &self,
        state: &mut GameState,
        penalty: Penalty,
    ) -> Result<PenaltyOutcome, LedgerError> {
        let balance =
            state
                .treasury
                .charge(state.clock.day(), penalty.kind, penalty.amount, penalty.target)?;
        let destroyed = if penalty.destroy {
            penalty.target.and_then(|id| state.buildings.remove(&id))
        } else {
            None
        };
        Ok(PenaltyOutcome {
            balance,
            insolvent: state.treasury.is_insolvent(),
            destroyed,
        })
    }

    /// Current speculative exposure.
    pub fn exposure(&self, state: &GameState) -> ExposureMetrics {
        let total_tvl = state.tvl();
        let mut speculative_tvl = Decimal::ZERO;
        let mut speculative_ids = Vec::new();
        for building in state.buildings_in(RiskCategory::Speculative) {
            speculative_tvl = speculative_tvl.saturating_add(building.value());
            speculative_ids.push(building.id);
        }
        let speculative_fraction = speculative_tvl
            .checked_div(total_tvl)
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE);
        ExposureMetrics {
            total_tvl,
            speculative_tvl,
            speculative_fraction,
            speculative_ids,
        }
    }
}
