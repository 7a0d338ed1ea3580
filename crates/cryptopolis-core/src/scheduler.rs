//! Stochastic economic shocks: disasters and rug pulls.
//!
//! Each day the scheduler rolls, in fixed order, once for a disaster and
//! once for a rug pull. A roll draws `0..10_000` from the session stream and
//! fires when the draw is below the probability in basis points, so any
//! probability of 10 000 bps or more always fires.
//!
//! - **Disaster**: probability by sentiment band. Picks a kind from
//!   [`DISASTERS`] and a severity inside its range; the loss is that
//!   percentage of total value locked. Skipped while nothing is built.
//! - **Rug pull**: base probability by band, scaled by
//!   `(50 + speculative exposure %) / 100`. Picks a speculative building
//!   uniformly, takes a share of its value, and may destroy it. Skipped
//!   when no speculative building stands.

use cryptopolis_ledger::LedgerError;
use cryptopolis_types::{
    DisasterStarted, EventKind, EventRecord, LedgerEntryKind, Notification, RugPull,
};
use cryptopolis_world::blueprint;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use crate::config::{BPS_SCALE, BandTable, EventsConfig};
use crate::economy::{EconomySimulator, Penalty};
use crate::state::GameState;

/// Cents.
const MONEY_SCALE: u32 = 2;

/// A kind of city-wide disaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisasterKind {
    /// Name shown to the player.
    pub name: &'static str,
    /// Narrator flavour text.
    pub description: &'static str,
    /// Smallest loss, in percent of TVL.
    pub min_severity_pct: u32,
    /// Largest loss, in percent of TVL.
    pub max_severity_pct: u32,
}

/// Disasters the scheduler picks from, uniformly.
pub const DISASTERS: &[DisasterKind] = &[
    DisasterKind {
        name: "Exchange Hack",
        description: "Hot wallets were drained overnight.",
        min_severity_pct: 5,
        max_severity_pct: 15,
    },
    DisasterKind {
        name: "Network Outage",
        description: "The chain halted while validators argued about a fork.",
        min_severity_pct: 2,
        max_severity_pct: 8,
    },
    DisasterKind {
        name: "Regulatory Crackdown",
        description: "Regulators froze every on-ramp into the city.",
        min_severity_pct: 8,
        max_severity_pct: 20,
    },
    DisasterKind {
        name: "Stablecoin Depeg",
        description: "A major stablecoin slipped its peg and contagion spread.",
        min_severity_pct: 10,
        max_severity_pct: 25,
    },
];

/// A shock that fired, with the notification announcing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// The appended log record.
    pub record: EventRecord,
    /// The payload to publish.
    pub notification: Notification,
}

/// Everything one day of rolling produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rolls {
    /// Shocks that fired, in roll order.
    pub events: Vec<ScheduledEvent>,
    /// Shocks that fired but could not be applied.
    pub failures: Vec<LedgerError>,
}

/// Rolls disasters and rug pulls against the session stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventScheduler {
    enabled: bool,
    disaster_bps: BandTable,
    rug_pull_bps: BandTable,
    rug_pull_loss_pct: Decimal,
    rug_pull_destroy_bps: u32,
}

impl EventScheduler {
    /// Build the scheduler from configuration.
    pub const fn new(config: &EventsConfig) -> Self {
        Self {
            enabled: config.enabled,
            disaster_bps: config.disaster_bps,
            rug_pull_bps: config.rug_pull_bps,
            rug_pull_loss_pct: config.rug_pull_loss_pct,
            rug_pull_destroy_bps: config.rug_pull_destroy_bps,
        }
    }

    /// Roll today's shocks: disaster first, then rug pull.
    ///
    /// Fired shocks are applied through `economy` and appended to the
    /// state's event log.
    pub fn roll_events(&self, state: &mut GameState, economy: &EconomySimulator) -> Rolls {
        let mut rolls = Rolls::default();
        if !self.enabled {
            return rolls;
        }
        match self.roll_disaster(state, economy) {
            Ok(Some(event)) => rolls.events.push(event),
            Ok(None) => {}
            Err(err) => {
                warn!(day = state.day(), error = %err, "Disaster could not be applied");
                rolls.failures.push(err);
            }
        }
        match self.roll_rug_pull(state, economy) {
            Ok(Some(event)) => rolls.events.push(event),
            Ok(None) => {}
            Err(err) => {
                warn!(day = state.day(), error = %err, "Rug pull could not be applied");
                rolls.failures.push(err);
            }
        }
        rolls
    }

    /// Effective rug-pull probability for the current band and exposure.
    pub fn rug_pull_probability_bps(&self, state: &GameState, economy: &EconomySimulator) -> u32 {
        let base = Decimal::from(self.rug_pull_bps.get(state.sentiment.band()));
        let exposure_pct = economy
            .exposure(state)
            .speculative_fraction
            .saturating_mul(Decimal::ONE_HUNDRED);
        let scale = Decimal::from(50)
            .saturating_add(exposure_pct)
            .checked_div(Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ONE);
        base.saturating_mul(scale).trunc().to_u32().unwrap_or(u32::MAX)
    }

    fn roll_disaster(
        &self,
        state: &mut GameState,
        economy: &EconomySimulator,
    ) -> Result<Option<ScheduledEvent>, LedgerError> {
        let tvl = state.tvl();
        if tvl <= Decimal::ZERO {
            return Ok(None);
        }
        let bps = self.disaster_bps.get(state.sentiment.band());
        let rng = state.sentiment.rng_mut();
        if !fires(rng, bps) {
            return Ok(None);
        }
        let Some(kind) = DISASTERS.get(rng.random_range(0..DISASTERS.len())) else {
            return Ok(None);
        };
        let severity = rng.random_range(kind.min_severity_pct..=kind.max_severity_pct);
        let loss = percent_of(tvl, Decimal::from(severity));
        if loss <= Decimal::ZERO {
            return Ok(None);
        }

        let outcome = economy.apply_penalty(
            state,
            Penalty {
                kind: LedgerEntryKind::DisasterLoss,
                amount: loss,
                target: None,
                destroy: false,
            },
        )?;
        let record = EventRecord {
            kind: EventKind::Disaster,
            day: state.day(),
            name: kind.name.to_owned(),
            building: None,
            magnitude: Decimal::ZERO.saturating_sub(loss),
            destroyed: false,
        };
        state.events.push(record.clone());
        info!(
            day = record.day,
            disaster = kind.name,
            severity_pct = severity,
            loss = %loss,
            balance = %outcome.balance,
            "Disaster struck"
        );
        Ok(Some(ScheduledEvent {
            record,
            notification: Notification::DisasterStarted(DisasterStarted {
                name: kind.name.to_owned(),
                description: kind.description.to_owned(),
            }),
        }))
    }

    fn roll_rug_pull(
        &self,
        state: &mut GameState,
        economy: &EconomySimulator,
    ) -> Result<Option<ScheduledEvent>, LedgerError> {
        let exposure = economy.exposure(state);
        if exposure.speculative_ids.is_empty() {
            return Ok(None);
        }
        let bps = self.rug_pull_probability_bps(state, economy);
        let rng = state.sentiment.rng_mut();
        if !fires(rng, bps) {
            return Ok(None);
        }
        let pick = rng.random_range(0..exposure.speculative_ids.len());
        let destroy = fires(rng, self.rug_pull_destroy_bps);
        let Some(target) = exposure.speculative_ids.get(pick).copied() else {
            return Ok(None);
        };
        let Some((value, building_type)) = state
            .buildings
            .get(&target)
            .map(|b| (b.value(), b.building_type))
        else {
            return Ok(None);
        };
        let loss = percent_of(value, self.rug_pull_loss_pct);
        if loss <= Decimal::ZERO {
            return Ok(None);
        }

        let outcome = economy.apply_penalty(
            state,
            Penalty {
                kind: LedgerEntryKind::RugPullLoss,
                amount: loss,
                target: Some(target),
                destroy,
            },
        )?;
        let building_name = blueprint(building_type).display_name.to_owned();
        let record = EventRecord {
            kind: EventKind::RugPull,
            day: state.day(),
            name: building_name.clone(),
            building: Some(target),
            magnitude: Decimal::ZERO.saturating_sub(loss),
            destroyed: outcome.destroyed.is_some(),
        };
        state.events.push(record.clone());
        info!(
            day = record.day,
            building_id = %target,
            building = %building_name,
            loss = %loss,
            destroyed = record.destroyed,
            balance = %outcome.balance,
            "Rug pull"
        );
        Ok(Some(ScheduledEvent {
            record,
            notification: Notification::RugPull(RugPull {
                building_name,
                treasury_loss: loss,
            }),
        }))
    }
}

/// Draw once and compare against a basis-point probability.
fn fires(rng: &mut impl Rng, bps: u32) -> bool {
    rng.random_range(0..BPS_SCALE) < bps
}

/// `pct` percent of `amount`, rounded to cents.
fn percent_of(amount: Decimal, pct: Decimal) -> Decimal {
    amount
        .saturating_mul(pct)
        .checked_div(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
        .round_dp(MONEY_SCALE)
}
