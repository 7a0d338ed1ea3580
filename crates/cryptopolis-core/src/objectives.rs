//! Win/lose conditions and milestones.
//!
//! The session status starts `Running`. Every day the tracker first unlocks
//! any newly reached milestones, then evaluates the win registry in order,
//! then the lose registry in order. The first match ends the session, so a
//! day that satisfies both a win and a lose condition is a victory.
//!
//! Conditions are plain predicate records in static tables. A predicate that
//! returns `Err` counts as "no match" for that day; the failure is logged
//! and reported back to the pipeline so a broken condition can never
//! soft-lock a session.
//!
//! Milestones never end a session. They are evaluated in sandbox mode too.

use cryptopolis_ledger::LedgerError;
use cryptopolis_types::{
    EventKind, EventRecord, GameEnd, GameEndStats, LedgerEntryKind, MilestoneUnlocked,
    SessionStatus,
};
use cryptopolis_world::cheapest_cost;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::state::GameState;

/// Why a condition predicate could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    /// An aggregate overflowed while being computed.
    #[error("arithmetic overflow computing {what}")]
    Overflow {
        /// The aggregate being computed.
        what: &'static str,
    },

    /// The predicate could not be evaluated for another reason.
    #[error("condition unavailable: {reason}")]
    Unavailable {
        /// Explanation of the failure.
        reason: String,
    },
}

/// Signature of a condition predicate.
pub type Predicate = fn(&GameState) -> Result<bool, ConditionError>;

/// A win or lose condition.
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    /// Stable identifier, reported in the game-end record.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Icon key for the UI.
    pub icon: &'static str,
    /// The predicate.
    pub check: Predicate,
}

/// A one-time achievement with a treasury reward.
#[derive(Debug, Clone, Copy)]
pub struct Milestone {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Amount credited on unlock.
    pub reward: u32,
    /// Whether the milestone has been reached.
    pub check: fn(&GameState) -> bool,
}

/// A predicate failure surfaced to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFailure {
    /// The failing condition.
    pub condition_id: &'static str,
    /// What went wrong.
    pub error: ConditionError,
}

/// Everything one day of objective evaluation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Milestones unlocked today, in registry order.
    pub milestones: Vec<MilestoneUnlocked>,
    /// The game end, if a condition matched today.
    pub end: Option<GameEnd>,
    /// Predicates that failed today.
    pub condition_failures: Vec<ConditionFailure>,
    /// Milestone rewards that could not be credited.
    pub ledger_failures: Vec<LedgerError>,
}

// ---------------------------------------------------------------------------
// Default registries
// ---------------------------------------------------------------------------

/// Peak TVL that wins by `whale`.
pub const WHALE_TVL: u32 = 1_000_000;
/// Treasury balance that wins by `moonshot`.
pub const MOONSHOT_TREASURY: u32 = 250_000;
/// Day that wins by `diamond-hands`.
pub const DIAMOND_HANDS_DAY: u64 = 365;
/// Rug pulls that lose by `rekt`.
pub const REKT_RUG_PULLS: usize = 10;
/// First day `ghost-chain` can match.
pub const GHOST_CHAIN_DAY: u64 = 30;

/// Win conditions in precedence order.
pub const WIN_CONDITIONS: &[Condition] = &[
    Condition {
        id: "whale",
        name: "Whale",
        icon: "whale",
        check: whale,
    },
    Condition {
        id: "moonshot",
        name: "Moonshot",
        icon: "rocket",
        check: moonshot,
    },
    Condition {
        id: "diamond-hands",
        name: "Diamond Hands",
        icon: "diamond",
        check: diamond_hands,
    },
];

/// Lose conditions in precedence order.
pub const LOSE_CONDITIONS: &[Condition] = &[
    Condition {
        id: "bankruptcy",
        name: "Bankruptcy",
        icon: "skull",
        check: bankruptcy,
    },
    Condition {
        id: "rekt",
        name: "Rekt",
        icon: "rug",
        check: rekt,
    },
    Condition {
        id: "ghost-chain",
        name: "Ghost Chain",
        icon: "ghost",
        check: ghost_chain,
    },
];

/// Milestones in evaluation order.
pub const MILESTONES: &[Milestone] = &[
    Milestone {
        id: "first-block",
        name: "First Block",
        reward: 100,
        check: |s| s.treasury.peak_building_count() >= 1,
    },
    Milestone {
        id: "tvl-10k",
        name: "Five Figures Locked",
        reward: 500,
        check: |s| s.treasury.peak_tvl() >= Decimal::from(10_000),
    },
    Milestone {
        id: "tvl-100k",
        name: "Six Figures Locked",
        reward: 5_000,
        check: |s| s.treasury.peak_tvl() >= Decimal::from(100_000),
    },
    Milestone {
        id: "population-100",
        name: "Village",
        reward: 250,
        check: |s| s.treasury.peak_population() >= 100,
    },
    Milestone {
        id: "population-1000",
        name: "Metropolis",
        reward: 2_500,
        check: |s| s.treasury.peak_population() >= 1_000,
    },
    Milestone {
        id: "day-30",
        name: "One Month On-Chain",
        reward: 300,
        check: |s| s.day() >= 30,
    },
    Milestone {
        id: "day-100",
        name: "Hundred Days",
        reward: 1_000,
        check: |s| s.day() >= 100,
    },
];

fn whale(state: &GameState) -> Result<bool, ConditionError> {
    let tvl = state
        .checked_tvl()
        .ok_or(ConditionError::Overflow { what: "tvl" })?;
    Ok(tvl.max(state.treasury.peak_tvl()) >= Decimal::from(WHALE_TVL))
}

fn moonshot(state: &GameState) -> Result<bool, ConditionError> {
    Ok(state.balance() >= Decimal::from(MOONSHOT_TREASURY))
}

fn diamond_hands(state: &GameState) -> Result<bool, ConditionError> {
    Ok(state.day() >= DIAMOND_HANDS_DAY && state.balance() > state.treasury.insolvency_floor())
}

fn bankruptcy(state: &GameState) -> Result<bool, ConditionError> {
    Ok(state.treasury.is_insolvent())
}

fn rekt(state: &GameState) -> Result<bool, ConditionError> {
    Ok(state.event_count(EventKind::RugPull) >= REKT_RUG_PULLS)
}

fn ghost_chain(state: &GameState) -> Result<bool, ConditionError> {
    Ok(state.day() >= GHOST_CHAIN_DAY
        && state.buildings.is_empty()
        && state.balance() < cheapest_cost())
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Evaluates milestones and win/lose registries against the state.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveTracker {
    win: &'static [Condition],
    lose: &'static [Condition],
    milestones: &'static [Milestone],
}

impl Default for ObjectiveTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectiveTracker {
    /// Tracker over the default registries.
    pub const fn new() -> Self {
        Self::with_registries(WIN_CONDITIONS, LOSE_CONDITIONS, MILESTONES)
    }

    /// Tracker over custom registries.
    pub const fn with_registries(
        win: &'static [Condition],
        lose: &'static [Condition],
        milestones: &'static [Milestone],
    ) -> Self {
        Self {
            win,
            lose,
            milestones,
        }
    }

    /// Look up a win or lose condition for display.
    pub fn condition_by_id(&self, id: &str) -> Option<&'static Condition> {
        let (win, lose): (&'static [Condition], &'static [Condition]) = (self.win, self.lose);
        win.iter().chain(lose.iter()).find(|c| c.id == id)
    }

    /// Run today's evaluation: milestones, then win, then lose.
    ///
    /// A no-op once the session has ended. In sandbox mode only milestones
    /// are evaluated.
    pub fn evaluate(&self, state: &mut GameState) -> Evaluation {
        let mut eval = Evaluation::default();
        if state.status.is_terminal() {
            return eval;
        }
        self.unlock_milestones(state, &mut eval);
        if state.sandbox {
            return eval;
        }

        let registries = self
            .win
            .iter()
            .map(|c| (c, true))
            .chain(self.lose.iter().map(|c| (c, false)));
        for (condition, is_victory) in registries {
            match (condition.check)(state) {
                Ok(true) => {
                    eval.end = Some(finish(state, condition, is_victory));
                    break;
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        day = state.day(),
                        condition = condition.id,
                        error = %error,
                        "Condition failed; treated as no match"
                    );
                    eval.condition_failures.push(ConditionFailure {
                        condition_id: condition.id,
                        error,
                    });
                }
            }
        }
        eval
    }

    /// Leave a finished session running in sandbox mode.
    ///
    /// Win and lose conditions are no longer evaluated; the game-end record
    /// and its statistics are kept. Returns `false` if the session had not
    /// ended.
    pub fn continue_in_sandbox(&self, state: &mut GameState) -> bool {
        if !state.status.is_terminal() {
            return false;
        }
        state.status = SessionStatus::Running;
        state.sandbox = true;
        info!(day = state.day(), "Continuing in sandbox mode");
        true
    }

    fn unlock_milestones(&self, state: &mut GameState, eval: &mut Evaluation) {
        for milestone in self.milestones {
            if state.milestones.contains(milestone.id) || !(milestone.check)(state) {
                continue;
            }
            let day = state.day();
            let reward = Decimal::from(milestone.reward);
            if reward > Decimal::ZERO {
                if let Err(err) =
                    state
                        .treasury
                        .credit(day, LedgerEntryKind::MilestoneReward, reward, None)
                {
                    warn!(milestone = milestone.id, error = %err, "Milestone reward not credited");
                    eval.ledger_failures.push(err);
                }
            }
            state.milestones.insert(milestone.id.to_owned());
            state.events.push(EventRecord {
                kind: EventKind::Milestone,
                day,
                name: milestone.name.to_owned(),
                building: None,
                magnitude: reward,
                destroyed: false,
            });
            info!(day, milestone = milestone.id, reward = %reward, "Milestone unlocked");
            eval.milestones.push(MilestoneUnlocked {
                name: milestone.name.to_owned(),
                reward: format!("+{reward} treasury"),
            });
        }
    }
}

/// Move the session to its terminal status and build the end record.
fn finish(state: &mut GameState, condition: &Condition, is_victory: bool) -> GameEnd {
    state.status = if is_victory {
        SessionStatus::Won
    } else {
        SessionStatus::Lost
    };
    let stats = GameEndStats {
        days_survived: state.day(),
        peak_tvl: state.treasury.peak_tvl(),
        peak_population: state.treasury.peak_population(),
        peak_building_count: state.treasury.peak_building_count(),
        total_yield_earned: state.treasury.total_yield_earned(),
        final_treasury: state.balance(),
    };
    let end = GameEnd {
        is_victory,
        end_condition_id: condition.id.to_owned(),
        stats,
    };
    state.end = Some(end.clone());
    info!(
        day = state.day(),
        condition = condition.id,
        is_victory,
        final_treasury = %end.stats.final_treasury,
        "Session ended"
    );
    end
}
