//! Restoring a between-day snapshot continues the run exactly.

#![allow(clippy::unwrap_used)]

use cryptopolis_core::config::{BandTable, SimulationConfig};
use cryptopolis_core::economy::PlacementRequest;
use cryptopolis_core::snapshot::{self, SnapshotError};
use cryptopolis_core::state::GameState;
use cryptopolis_core::tick::Session;
use cryptopolis_types::{BuildingType, SessionStatus};
use rust_decimal::Decimal;

fn config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.session.seed = 1_234;
    config.session.starting_treasury = Decimal::from(15_000);
    config.events.disaster_bps = BandTable::uniform(1_000);
    config.events.rug_pull_bps = BandTable::uniform(2_000);
    config
}

fn opened(config: &SimulationConfig) -> GameState {
    let mut session = Session::new(config).unwrap();
    for (building_type, x) in [
        (BuildingType::YieldFarm, 0),
        (BuildingType::NftGallery, 1),
        (BuildingType::StablecoinBank, 2),
        (BuildingType::HodlerHousing, 3),
    ] {
        session
            .place_building(PlacementRequest::new(building_type, x, 0))
            .unwrap();
    }
    session.into_state()
}

fn advance(session: &mut Session, days: u32) {
    for _ in 0..days {
        if session.advance_day().is_none() {
            break;
        }
    }
}

#[test]
fn restored_snapshot_matches_uninterrupted_run() {
    let config = config();
    let start = opened(&config);

    let mut uninterrupted = Session::from_state(&config, start.clone());
    advance(&mut uninterrupted, 80);

    let mut first_half = Session::from_state(&config, start);
    advance(&mut first_half, 40);
    let json = first_half.snapshot().unwrap();

    let (mut resumed, warning) = Session::restore(&json, &config).unwrap();
    assert!(warning.is_none());
    assert_eq!(resumed.state(), first_half.state());
    advance(&mut resumed, 40);

    assert_eq!(resumed.state(), uninterrupted.state());
}

#[test]
fn sentiment_pin_and_clock_remainder_survive_restore() {
    let config = config();
    let mut session = Session::from_state(&config, opened(&config));
    session.pin_sentiment(Some(Decimal::from(85)));
    assert!(session.step(std::time::Duration::from_millis(1_300)).is_some());

    let json = session.snapshot().unwrap();
    let restored = snapshot::load(&json).unwrap();
    assert_eq!(restored.sentiment.pin(), Some(Decimal::from(85)));
    assert_eq!(
        restored.clock.accumulated(),
        std::time::Duration::from_millis(300)
    );
}

#[test]
fn ended_session_restores_frozen() {
    let mut config = config();
    config.session.starting_treasury = Decimal::from(500_000);
    let mut session = Session::new(&config).unwrap();
    assert!(session.advance_day().unwrap().end.is_some());

    let (mut restored, warning) = Session::restore(&session.snapshot().unwrap(), &config).unwrap();
    assert!(warning.is_none());
    assert_eq!(restored.state().status, SessionStatus::Won);
    assert!(restored.advance_day().is_none());
}

#[test]
fn corrupt_snapshot_starts_fresh_with_warning() {
    let config = config();
    let (session, warning) = Session::restore("{\"version\": 1}", &config).unwrap();
    assert!(matches!(warning, Some(SnapshotError::Parse { .. })));
    assert_eq!(session.state().day(), 0);
    assert_eq!(session.state().balance(), Decimal::from(15_000));
}
