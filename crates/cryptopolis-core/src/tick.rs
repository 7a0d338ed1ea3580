//! The day pipeline that drives the Cryptopolis simulation.
//!
//! A [`Session`] owns the [`GameState`], the stateless components, the
//! tile authority, and the event bus. Every day runs these phases strictly
//! in order:
//!
//! 1. **Clock** -- cross the day boundary and publish `DayChanged`.
//! 2. **Request** -- apply at most one queued placement or demolition,
//!    stamped with the new day.
//! 3. **Sentiment** -- step the index; publish `SentimentChanged` only on a
//!    band transition.
//! 4. **Economy** -- credit yields and fold aggregates into the peaks.
//! 5. **Events** -- roll a disaster, then a rug pull.
//! 6. **Objectives** -- unlock milestones, then evaluate win before lose.
//! 7. **Settle** -- raise an insolvent treasury back to its floor.
//! 8. **Flush** -- deliver every notification published during the day.
//!
//! Once the session has ended, [`Session::advance_day`] and
//! [`Session::step`] are no-ops until the player continues in sandbox mode.

use std::collections::VecDeque;
use std::time::Duration;

use cryptopolis_events::{EventBus, Filter, Handler, SubscriptionId};
use cryptopolis_ledger::LedgerError;
use cryptopolis_types::{
    Building, BuildingDemolished, BuildingId, BuildingPlaced, DayChanged, EventRecord, GameEnd,
    GameEnded, MilestoneUnlocked, Notification, SentimentBand, SentimentChanged,
};
use cryptopolis_world::{PlacementError, TileAuthority, blueprint};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::economy::{EconomySimulator, Penalty, PenaltyOutcome, PlacementRequest};
use crate::objectives::{ConditionError, ObjectiveTracker};
use crate::scheduler::EventScheduler;
use crate::sentiment::SentimentEngine;
use crate::snapshot::{self, SnapshotError};
use crate::state::{GameState, StateError};

/// A recoverable problem caught inside a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A win or lose predicate failed and was treated as no match.
    Condition {
        /// The failing condition.
        condition_id: &'static str,
        /// What went wrong.
        error: ConditionError,
    },

    /// A ledger operation failed and its effect was skipped.
    Ledger {
        /// Pipeline phase that hit the failure.
        phase: &'static str,
        /// Building involved, if any.
        building: Option<BuildingId>,
        /// The underlying ledger error.
        error: LedgerError,
    },
}

/// A player mutation waiting for the next day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Build something.
    Place(PlacementRequest),
    /// Tear a building down.
    Demolish(BuildingId),
}

/// Handle returned by [`Session::submit`], echoed back when the request is
/// processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

/// A queued request taken off the queue during a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRequest {
    /// The ticket issued when the request was submitted.
    pub ticket: RequestTicket,
    /// What happened to it.
    pub outcome: RequestOutcome,
}

/// What happened to the queued request processed during a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The building was placed.
    Placed(Building),
    /// The building was removed and part of its cost refunded.
    Demolished {
        /// The removed building.
        building: Building,
        /// Salvage credited.
        refund: Decimal,
    },
    /// The request was rejected; the state is unchanged.
    Rejected(PlacementError),
}

/// Summary of one day's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The day that was executed.
    pub day: u64,
    /// Sentiment index after the day's step.
    pub sentiment: Decimal,
    /// Band of that index.
    pub band: SentimentBand,
    /// The queued request processed today, if one was waiting.
    pub request: Option<ProcessedRequest>,
    /// Yield credited today.
    pub income: Decimal,
    /// Total value locked after the yield phase.
    pub tvl: Decimal,
    /// Population after the yield phase.
    pub population: u64,
    /// Standing buildings at the end of the day.
    pub building_count: u64,
    /// Treasury balance at the end of the day.
    pub treasury: Decimal,
    /// Disasters and rug pulls that fired today.
    pub events: Vec<EventRecord>,
    /// Milestones unlocked today.
    pub milestones: Vec<MilestoneUnlocked>,
    /// The game end, if a condition matched today.
    pub end: Option<GameEnd>,
    /// Amount credited to lift an insolvent treasury back to its floor.
    pub floor_adjustment: Option<Decimal>,
    /// Recoverable problems caught today.
    pub anomalies: Vec<Anomaly>,
}

/// A running simulation session.
pub struct Session {
    state: GameState,
    sentiment: SentimentEngine,
    economy: EconomySimulator,
    scheduler: EventScheduler,
    objectives: ObjectiveTracker,
    authority: Box<dyn TileAuthority + Send>,
    bus: EventBus,
    queue: VecDeque<(RequestTicket, Request)>,
    next_ticket: u64,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("day", &self.state.day())
            .field("status", &self.state.status)
            .field("queued", &self.queue.len())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start a fresh day-0 session from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the clock or treasury configuration is
    /// invalid.
    pub fn new(config: &SimulationConfig) -> Result<Self, StateError> {
        let state = GameState::new(config)?;
        info!(
            session_id = %state.session_id,
            seed = config.session.seed,
            treasury = %state.balance(),
            "Session started"
        );
        Ok(Self::from_state(config, state))
    }

    /// Resume a session from an existing state.
    ///
    /// Tile checks use the state's own grid bounds.
    pub fn from_state(config: &SimulationConfig, state: GameState) -> Self {
        let authority = Box::new(state.grid);
        Self {
            state,
            sentiment: SentimentEngine::new(&config.sentiment),
            economy: EconomySimulator::new(&config.economy),
            scheduler: EventScheduler::new(&config.events),
            objectives: ObjectiveTracker::new(),
            authority,
            bus: EventBus::new(),
            queue: VecDeque::new(),
            next_ticket: 0,
        }
    }

    /// Restore a session from a snapshot.
    ///
    /// A corrupt snapshot yields a fresh session plus the reason it was
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] only if the fresh fallback state cannot be
    /// built from `config`.
    pub fn restore(
        json: &str,
        config: &SimulationConfig,
    ) -> Result<(Self, Option<SnapshotError>), StateError> {
        let outcome = snapshot::restore(json, config)?;
        Ok((Self::from_state(config, outcome.state), outcome.warning))
    }

    /// Replace the tile authority.
    #[must_use]
    pub fn with_authority(mut self, authority: Box<dyn TileAuthority + Send>) -> Self {
        self.authority = authority;
        self
    }

    /// Replace the objective registries.
    #[must_use]
    pub fn with_objectives(mut self, objectives: ObjectiveTracker) -> Self {
        self.objectives = objectives;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The simulation state.
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Consume the session, returning its state.
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// The objective registries in use.
    pub const fn objectives(&self) -> &ObjectiveTracker {
        &self.objectives
    }

    /// Requests waiting for a day boundary.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Serialize the state into a snapshot envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if serialization fails.
    pub fn snapshot(&self) -> Result<String, SnapshotError> {
        snapshot::save(&self.state)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Register a notification handler.
    pub fn subscribe(&mut self, filter: Filter, handler: Handler) -> SubscriptionId {
        self.bus.subscribe(filter, handler)
    }

    /// Remove a notification handler.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------------

    /// Queue a request for the next day boundary.
    ///
    /// Requests are applied one per day in submission order.
    pub fn submit(&mut self, request: Request) -> RequestTicket {
        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.queue.push_back((ticket, request));
        ticket
    }

    /// Suspend the clock.
    pub const fn pause(&mut self) {
        self.state.clock.pause();
    }

    /// Resume the clock.
    pub const fn resume(&mut self) {
        self.state.clock.resume();
    }

    /// Pin sentiment from the next day on, or release it with `None`.
    pub fn pin_sentiment(&mut self, value: Option<Decimal>) {
        self.state.sentiment.set_pin(value);
        info!(pin = ?self.state.sentiment.pin(), "Sentiment pin changed");
    }

    /// Keep playing after a game end with win/lose evaluation disabled.
    pub fn continue_in_sandbox(&mut self) -> bool {
        self.objectives.continue_in_sandbox(&mut self.state)
    }

    /// Place a building immediately.
    ///
    /// Meant for setting a session up before its day loop starts (opening
    /// build orders, scenarios). A running driver goes through
    /// [`Session::submit`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError`] if the request is rejected; the state is
    /// unchanged.
    pub fn place_building(&mut self, request: PlacementRequest) -> Result<Building, PlacementError> {
        let result = self.place(request);
        self.bus.flush();
        result
    }

    /// Demolish a building immediately. See [`Session::place_building`].
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError`] if the building does not exist or the
    /// session has ended.
    pub fn demolish(&mut self, id: BuildingId) -> Result<(Building, Decimal), PlacementError> {
        let result = self.remove(id);
        self.bus.flush();
        result
    }

    /// Apply an operator penalty immediately, between days.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the amount is invalid.
    pub fn apply_penalty(&mut self, penalty: Penalty) -> Result<PenaltyOutcome, LedgerError> {
        self.economy.apply_penalty(&mut self.state, penalty)
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Feed elapsed real time; runs a day if a boundary was crossed.
    pub fn step(&mut self, elapsed: Duration) -> Option<TickSummary> {
        if self.state.is_frozen() {
            return None;
        }
        let advanced = self.state.clock.tick(elapsed)?;
        Some(self.run_day(advanced.day))
    }

    /// Run one day regardless of accumulated time.
    ///
    /// A no-op while paused or after the session has ended.
    pub fn advance_day(&mut self) -> Option<TickSummary> {
        if self.state.is_frozen() {
            return None;
        }
        let advanced = self.state.clock.force_advance()?;
        Some(self.run_day(advanced.day))
    }

    fn run_day(&mut self, day: u64) -> TickSummary {
        self.bus.publish(Notification::DayChanged(DayChanged { day }));
        let mut anomalies = Vec::new();

        // --- Request ---
        let request = self
            .queue
            .pop_front()
            .map(|(ticket, r)| ProcessedRequest {
                ticket,
                outcome: self.apply_request(r),
            });

        // --- Sentiment ---
        let update = self.sentiment.advance(&mut self.state.sentiment);
        if update.band_changed {
            info!(day, band = %update.band, value = %update.value, "Sentiment band changed");
            self.bus
                .publish(Notification::SentimentChanged(SentimentChanged {
                    band: update.band,
                    value: update.value,
                }));
        }

        // --- Economy ---
        let delta = self.economy.apply_tick(&mut self.state);
        for (building, error) in delta.failures {
            warn!(day, %building, %error, "Yield skipped");
            anomalies.push(Anomaly::Ledger {
                phase: "yield",
                building: Some(building),
                error,
            });
        }

        // --- Events ---
        let rolls = self.scheduler.roll_events(&mut self.state, &self.economy);
        let mut events = Vec::with_capacity(rolls.events.len());
        for event in rolls.events {
            self.bus.publish(event.notification);
            events.push(event.record);
        }
        anomalies.extend(rolls.failures.into_iter().map(|error| Anomaly::Ledger {
            phase: "events",
            building: None,
            error,
        }));

        // --- Objectives ---
        let evaluation = self.objectives.evaluate(&mut self.state);
        for milestone in &evaluation.milestones {
            self.bus
                .publish(Notification::MilestoneUnlocked(milestone.clone()));
        }
        if let Some(end) = &evaluation.end {
            self.bus.publish(Notification::GameEnd(GameEnded {
                is_victory: end.is_victory,
                end_condition_id: end.end_condition_id.clone(),
                stats: end.stats.clone(),
            }));
        }
        anomalies.extend(evaluation.condition_failures.into_iter().map(|f| {
            Anomaly::Condition {
                condition_id: f.condition_id,
                error: f.error,
            }
        }));
        anomalies.extend(
            evaluation
                .ledger_failures
                .into_iter()
                .map(|error| Anomaly::Ledger {
                    phase: "milestones",
                    building: None,
                    error,
                }),
        );

        // --- Settle ---
        let floor_adjustment = self.state.treasury.settle(day);

        // --- Flush ---
        let delivered = self.bus.flush();

        let summary = TickSummary {
            day,
            sentiment: update.value,
            band: update.band,
            request,
            income: delta.income,
            tvl: delta.tvl,
            population: delta.population,
            building_count: self.state.building_count(),
            treasury: self.state.balance(),
            events,
            milestones: evaluation.milestones,
            end: evaluation.end,
            floor_adjustment,
            anomalies,
        };
        debug!(
            day,
            band = %summary.band,
            income = %summary.income,
            treasury = %summary.treasury,
            tvl = %summary.tvl,
            events = summary.events.len(),
            delivered,
            "Day complete"
        );
        summary
    }

    fn apply_request(&mut self, request: Request) -> RequestOutcome {
        let result = match request {
            Request::Place(req) => self.place(req).map(RequestOutcome::Placed),
            Request::Demolish(id) => self
                .remove(id)
                .map(|(building, refund)| RequestOutcome::Demolished { building, refund }),
        };
        result.unwrap_or_else(RequestOutcome::Rejected)
    }

    fn place(&mut self, request: PlacementRequest) -> Result<Building, PlacementError> {
        let result = self
            .economy
            .place_building(&mut self.state, request, self.authority.as_ref());
        match &result {
            Ok(building) => {
                self.bus.publish(Notification::BuildingPlaced(BuildingPlaced {
                    building_name: blueprint(building.building_type).display_name.to_owned(),
                    x: building.tile.x,
                    y: building.tile.y,
                }));
            }
            Err(err) => {
                debug!(
                    building_type = ?request.building_type,
                    tile = %request.tile,
                    reason = %err,
                    "Placement rejected"
                );
            }
        }
        result
    }

    fn remove(&mut self, id: BuildingId) -> Result<(Building, Decimal), PlacementError> {
        let result = self.economy.demolish(&mut self.state, id);
        match &result {
            Ok((building, refund)) => {
                self.bus
                    .publish(Notification::BuildingDemolished(BuildingDemolished {
                        building_name: blueprint(building.building_type).display_name.to_owned(),
                        refund: *refund,
                    }));
            }
            Err(err) => debug!(building_id = %id, reason = %err, "Demolition rejected"),
        }
        result
    }
}
