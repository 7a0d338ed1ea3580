//! Save and restore of the full simulation state.
//!
//! A snapshot is a JSON envelope around [`GameState`], including the clock
//! accumulator and the `ChaCha8` stream position, so a restored session
//! continues exactly where the saved one would have.
//!
//! Restoring never fails on bad input. A snapshot that does not parse, has
//! the wrong version, or violates a state invariant is discarded with a
//! `warn!`, and a fresh state is built from configuration instead. The
//! reason is handed back as a non-fatal warning.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use cryptopolis_ledger::{ReconcileResult, reconcile};
use cryptopolis_types::{BuildingId, SessionId, SessionStatus, Tile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::state::{GameState, StateError};

/// Envelope format version written by [`save`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Why a snapshot could not be written or was discarded.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The state could not be serialized.
    #[error("snapshot serialization failed: {source}")]
    Serialize {
        /// The underlying serializer error.
        source: serde_json::Error,
    },

    /// The snapshot is not valid JSON or does not match the state shape.
    #[error("snapshot parse failed: {source}")]
    Parse {
        /// The underlying parser error.
        source: serde_json::Error,
    },

    /// The envelope was written by an incompatible version.
    #[error("snapshot version {found} is not supported (expected {expected})")]
    VersionMismatch {
        /// Version found in the envelope.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// The envelope and the state disagree on the session.
    #[error("envelope session {envelope} does not match state session {state}")]
    SessionMismatch {
        /// Session id on the envelope.
        envelope: SessionId,
        /// Session id inside the state.
        state: SessionId,
    },

    /// The sentiment index or pin is outside `[0, 100]`.
    #[error("sentiment {value} is outside [0, 100]")]
    SentimentOutOfRange {
        /// The offending value.
        value: Decimal,
    },

    /// Two buildings claim the same tile.
    #[error("tile {tile} is occupied more than once")]
    DuplicateTile {
        /// The contested tile.
        tile: Tile,
    },

    /// A building sits outside the grid.
    #[error("building {building} at {tile} is outside the grid")]
    OutOfGrid {
        /// The misplaced building.
        building: BuildingId,
        /// Its tile.
        tile: Tile,
    },

    /// A building is stored under another building's key.
    #[error("building {id} is stored under key {key}")]
    KeyMismatch {
        /// Map key.
        key: BuildingId,
        /// Identifier on the building.
        id: BuildingId,
    },

    /// The id counter would hand out an identifier already in use.
    #[error("next building id {next} does not exceed highest id {highest}")]
    StaleIdCounter {
        /// The stored counter.
        next: BuildingId,
        /// The highest identifier in use.
        highest: BuildingId,
    },

    /// A peak tracker is below the value it tracks.
    #[error("peak {what} is below its current value")]
    PeakBelowCurrent {
        /// The aggregate whose peak is wrong.
        what: &'static str,
    },

    /// An aggregate overflowed during validation.
    #[error("arithmetic overflow computing {what}")]
    Overflow {
        /// The aggregate being computed.
        what: &'static str,
    },

    /// Status, sandbox flag, and game-end record contradict each other.
    ///
    /// A running session has no end record, an ended one has one, and a
    /// sandbox session is running with the end record it continued past.
    #[error(
        "objective state is inconsistent: status {status:?}, sandbox {sandbox}, end record present {end_recorded}"
    )]
    ObjectiveMismatch {
        /// Stored objective status.
        status: SessionStatus,
        /// Stored sandbox flag.
        sandbox: bool,
        /// Whether a game-end record is stored.
        end_recorded: bool,
    },

    /// The treasury does not reconcile with its entry log.
    #[error("treasury does not reconcile: {result:?}")]
    Ledger {
        /// The reconciliation outcome.
        result: ReconcileResult,
    },
}

/// The on-disk envelope.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<S> {
    version: u32,
    session_id: SessionId,
    saved_at: DateTime<Utc>,
    state: S,
}

/// Just enough of the envelope to check the version before the full parse.
#[derive(Debug, Deserialize)]
struct Header {
    version: u32,
}

/// Result of [`restore`].
#[derive(Debug)]
pub struct RestoreOutcome {
    /// The restored state, or a fresh one if the snapshot was discarded.
    pub state: GameState,
    /// Why the snapshot was discarded, if it was.
    pub warning: Option<SnapshotError>,
}

/// Serialize `state` into a versioned envelope.
///
/// # Errors
///
/// Returns [`SnapshotError::Serialize`] if serialization fails.
pub fn save(state: &GameState) -> Result<String, SnapshotError> {
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        session_id: state.session_id,
        saved_at: Utc::now(),
        state,
    };
    serde_json::to_string(&envelope).map_err(|source| SnapshotError::Serialize { source })
}

/// Parse and validate a snapshot without any fallback.
///
/// # Errors
///
/// Returns [`SnapshotError`] describing the first problem found.
pub fn load(json: &str) -> Result<GameState, SnapshotError> {
    let header: Header =
        serde_json::from_str(json).map_err(|source| SnapshotError::Parse { source })?;
    if header.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: header.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    let envelope: Envelope<GameState> =
        serde_json::from_str(json).map_err(|source| SnapshotError::Parse { source })?;
    if envelope.session_id != envelope.state.session_id {
        return Err(SnapshotError::SessionMismatch {
            envelope: envelope.session_id,
            state: envelope.state.session_id,
        });
    }
    validate(&envelope.state)?;
    Ok(envelope.state)
}

/// Restore a snapshot, falling back to a fresh state if it is unusable.
///
/// # Errors
///
/// Returns [`StateError`] only if the fallback state cannot be built from
/// `config`.
pub fn restore(json: &str, config: &SimulationConfig) -> Result<RestoreOutcome, StateError> {
    match load(json) {
        Ok(state) => {
            info!(
                session_id = %state.session_id,
                day = state.day(),
                buildings = state.buildings.len(),
                "Snapshot restored"
            );
            Ok(RestoreOutcome {
                state,
                warning: None,
            })
        }
        Err(err) => {
            warn!(error = %err, "Snapshot discarded; starting a fresh session");
            Ok(RestoreOutcome {
                state: GameState::new(config)?,
                warning: Some(err),
            })
        }
    }
}

/// Check the invariants a consistent state always satisfies.
///
/// # Errors
///
/// Returns [`SnapshotError`] describing the first violated invariant.
pub fn validate(state: &GameState) -> Result<(), SnapshotError> {
    let sentiment = state.sentiment.value();
    for value in std::iter::once(sentiment).chain(state.sentiment.pin()) {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(SnapshotError::SentimentOutOfRange { value });
        }
    }

    let mut tiles = BTreeSet::new();
    for (key, building) in &state.buildings {
        if *key != building.id {
            return Err(SnapshotError::KeyMismatch {
                key: *key,
                id: building.id,
            });
        }
        if !state.grid.contains(building.tile) {
            return Err(SnapshotError::OutOfGrid {
                building: building.id,
                tile: building.tile,
            });
        }
        if !tiles.insert(building.tile) {
            return Err(SnapshotError::DuplicateTile {
                tile: building.tile,
            });
        }
    }

    let highest = state.buildings.keys().next_back().copied();
    if let Some(highest) = highest.filter(|h| state.next_building_id <= *h) {
        return Err(SnapshotError::StaleIdCounter {
            next: state.next_building_id,
            highest,
        });
    }

    let tvl = state
        .checked_tvl()
        .ok_or(SnapshotError::Overflow { what: "tvl" })?;
    let treasury = &state.treasury;
    if treasury.peak_tvl() < tvl {
        return Err(SnapshotError::PeakBelowCurrent { what: "tvl" });
    }
    if treasury.peak_population() < state.population() {
        return Err(SnapshotError::PeakBelowCurrent { what: "population" });
    }
    if treasury.peak_building_count() < state.building_count() {
        return Err(SnapshotError::PeakBelowCurrent {
            what: "building count",
        });
    }

    let end_recorded = state.end.is_some();
    let consistent = if state.status.is_terminal() {
        end_recorded && !state.sandbox
    } else {
        end_recorded == state.sandbox
    };
    if !consistent {
        return Err(SnapshotError::ObjectiveMismatch {
            status: state.status,
            sandbox: state.sandbox,
            end_recorded,
        });
    }

    match reconcile(treasury) {
        ReconcileResult::Balanced => Ok(()),
        result => Err(SnapshotError::Ledger { result }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cryptopolis_types::BuildingType;
    use cryptopolis_world::BoundedGrid;
    use serde_json::{Value, json};

    use super::*;
    use crate::economy::{EconomySimulator, PlacementRequest};
    use crate::tick::Session;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    fn built_state() -> GameState {
        let cfg = config();
        let economy = EconomySimulator::new(&cfg.economy);
        let mut state = GameState::new(&cfg).unwrap();
        let grid = state.grid;
        for (building_type, x) in [(BuildingType::Exchange, 0), (BuildingType::NftGallery, 1)] {
            economy
                .place_building(&mut state, PlacementRequest::new(building_type, x, 0), &grid)
                .unwrap();
        }
        economy.apply_tick(&mut state);
        state
    }

    fn tampered(state: &GameState, pointer: &str, value: Value) -> String {
        let mut doc: Value = serde_json::from_str(&save(state).unwrap()).unwrap();
        *doc.pointer_mut(pointer).unwrap() = value;
        doc.to_string()
    }

    #[test]
    fn save_then_load_is_lossless() {
        let state = built_state();
        let restored = load(&save(&state).unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn envelope_carries_version_and_session() {
        let state = built_state();
        let doc: Value = serde_json::from_str(&save(&state).unwrap()).unwrap();
        assert_eq!(doc.get("version"), Some(&json!(SNAPSHOT_VERSION)));
        assert_eq!(
            doc.get("session_id"),
            Some(&serde_json::to_value(state.session_id).unwrap())
        );
        assert!(doc.get("saved_at").is_some());
    }

    #[test]
    fn garbage_falls_back_to_fresh_state() {
        let outcome = restore("{ not json", &config()).unwrap();
        assert!(matches!(outcome.warning, Some(SnapshotError::Parse { .. })));
        assert_eq!(outcome.state.day(), 0);
        assert!(outcome.state.buildings.is_empty());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let json = tampered(&built_state(), "/version", json!(99));
        assert!(matches!(
            load(&json),
            Err(SnapshotError::VersionMismatch {
                found: 99,
                expected: SNAPSHOT_VERSION
            })
        ));
    }

    #[test]
    fn sentiment_out_of_range_is_rejected() {
        let json = tampered(&built_state(), "/state/sentiment/value", json!("150"));
        assert!(matches!(
            load(&json),
            Err(SnapshotError::SentimentOutOfRange { .. })
        ));
    }

    #[test]
    fn duplicate_tiles_are_rejected() {
        let json = tampered(&built_state(), "/state/buildings/2/tile", json!({"x": 0, "y": 0}));
        assert!(matches!(load(&json), Err(SnapshotError::DuplicateTile { .. })));
    }

    #[test]
    fn buildings_outside_grid_are_rejected() {
        let json = tampered(&built_state(), "/state/grid", json!({"width": 1, "height": 1}));
        assert!(matches!(load(&json), Err(SnapshotError::OutOfGrid { .. })));
    }

    #[test]
    fn lowered_peak_is_rejected() {
        let json = tampered(&built_state(), "/state/treasury/peak_building_count", json!(1));
        assert!(matches!(
            load(&json),
            Err(SnapshotError::PeakBelowCurrent { .. })
        ));
    }

    #[test]
    fn edited_balance_does_not_reconcile() {
        let json = tampered(&built_state(), "/state/treasury/balance", json!("999999"));
        let outcome = restore(&json, &config()).unwrap();
        assert!(matches!(
            outcome.warning,
            Some(SnapshotError::Ledger {
                result: ReconcileResult::BalanceDrift { .. }
            })
        ));
        assert_eq!(outcome.state.balance(), Decimal::from(10_000));
    }

    fn ended_state() -> GameState {
        let mut cfg = config();
        cfg.events.enabled = false;
        cfg.session.starting_treasury = Decimal::from(300_000);
        let mut session = Session::new(&cfg).unwrap();
        assert!(session.advance_day().unwrap().end.is_some());
        session.into_state()
    }

    #[test]
    fn objective_state_must_agree_with_end_record() {
        let ended = ended_state();
        assert!(validate(&ended).is_ok());

        let mut reopened = ended.clone();
        reopened.status = SessionStatus::Running;
        assert!(matches!(
            validate(&reopened),
            Err(SnapshotError::ObjectiveMismatch {
                status: SessionStatus::Running,
                sandbox: false,
                end_recorded: true,
            })
        ));

        let mut sandbox_without_end = built_state();
        sandbox_without_end.sandbox = true;
        assert!(matches!(
            validate(&sandbox_without_end),
            Err(SnapshotError::ObjectiveMismatch {
                sandbox: true,
                end_recorded: false,
                ..
            })
        ));

        let mut ended_in_sandbox = ended.clone();
        ended_in_sandbox.sandbox = true;
        assert!(matches!(
            validate(&ended_in_sandbox),
            Err(SnapshotError::ObjectiveMismatch { .. })
        ));

        let mut continued = ended;
        continued.status = SessionStatus::Running;
        continued.sandbox = true;
        assert!(validate(&continued).is_ok());
    }

    #[test]
    fn fresh_grid_matches_config() {
        let outcome = restore("", &config()).unwrap();
        assert_eq!(outcome.state.grid, BoundedGrid::new(32, 32));
    }
}
