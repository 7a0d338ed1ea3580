//! End-to-end session scenarios driven through the day pipeline.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use cryptopolis_core::config::{BandTable, SimulationConfig};
use cryptopolis_core::economy::{Penalty, PlacementRequest};
use cryptopolis_core::tick::{Request, Session};
use cryptopolis_types::{BuildingType, EventKind, LedgerEntryKind, SessionStatus};
use cryptopolis_world::PlacementError;
use rust_decimal::Decimal;

fn quiet_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.session.seed = 42;
    config.events.enabled = false;
    config
}

fn rug_config(destroy_bps: u32) -> SimulationConfig {
    let mut config = quiet_config();
    config.events.enabled = true;
    config.events.disaster_bps = BandTable::uniform(0);
    config.events.rug_pull_bps = BandTable::uniform(10_000);
    config.events.rug_pull_destroy_bps = destroy_bps;
    config
}

fn penalty(amount: u32) -> Penalty {
    Penalty {
        kind: LedgerEntryKind::DisasterLoss,
        amount: Decimal::from(amount),
        target: None,
        destroy: false,
    }
}

#[test]
fn single_exchange_under_neutral_market() {
    let mut session = Session::new(&quiet_config()).unwrap();
    session.pin_sentiment(Some(Decimal::from(50)));
    session.submit(Request::Place(PlacementRequest::new(
        BuildingType::Exchange,
        5,
        5,
    )));

    for _ in 0..10 {
        let summary = session.advance_day().unwrap();
        assert_eq!(summary.income, Decimal::from(50));
    }

    let state = session.state();
    assert_eq!(state.day(), 10);
    assert_eq!(state.treasury.total_yield_earned(), Decimal::from(500));
    // 10,000 - 2,000 + 500, plus the first-block reward.
    assert_eq!(state.balance(), Decimal::from(8_600));
    assert_eq!(
        state.milestones,
        BTreeSet::from(["first-block".to_owned()])
    );
    assert_eq!(state.status, SessionStatus::Running);
}

#[test]
fn extreme_fear_rugs_a_speculative_building() {
    let mut session = Session::new(&rug_config(0)).unwrap();
    session.pin_sentiment(Some(Decimal::from(10)));
    let gallery = session
        .place_building(PlacementRequest::new(BuildingType::NftGallery, 0, 0))
        .unwrap();

    for _ in 0..5 {
        session.advance_day().unwrap();
    }

    let state = session.state();
    let losses: Vec<Decimal> = state
        .events
        .iter()
        .filter(|e| e.kind == EventKind::RugPull)
        .map(|e| e.magnitude)
        .collect();
    // Half the building value (cost plus a day's 9.00 yield each day).
    assert_eq!(
        losses,
        vec![
            Decimal::new(-40_450, 2),
            Decimal::new(-40_900, 2),
            Decimal::new(-41_350, 2),
            Decimal::new(-41_800, 2),
            Decimal::new(-42_250, 2),
        ]
    );
    assert!(
        state
            .events
            .iter()
            .filter(|e| e.kind == EventKind::RugPull)
            .all(|e| e.building == Some(gallery.id) && !e.destroyed)
    );
    assert_eq!(state.building_count(), 1);
}

#[test]
fn destroyed_rug_target_leaves_the_city() {
    let mut session = Session::new(&rug_config(10_000)).unwrap();
    session.pin_sentiment(Some(Decimal::from(10)));
    session
        .place_building(PlacementRequest::new(BuildingType::MemeCoinCasino, 0, 0))
        .unwrap();

    let first = session.advance_day().unwrap();
    assert_eq!(first.events.len(), 1);
    assert!(first.events.iter().all(|e| e.destroyed));
    assert_eq!(first.building_count, 0);

    for _ in 0..4 {
        assert!(session.advance_day().unwrap().events.is_empty());
    }
    assert_eq!(session.state().event_count(EventKind::RugPull), 1);
    // Peaks survive the loss.
    assert_eq!(session.state().treasury.peak_building_count(), 1);
}

#[test]
fn insolvency_ends_in_bankruptcy() {
    let mut session = Session::new(&quiet_config()).unwrap();
    let outcome = session.apply_penalty(penalty(15_000)).unwrap();
    assert!(outcome.insolvent);

    let summary = session.advance_day().unwrap();
    let end = summary.end.unwrap();
    assert!(!end.is_victory);
    assert_eq!(end.end_condition_id, "bankruptcy");
    assert_eq!(end.stats.final_treasury, Decimal::from(-5_000));
    assert!(end.stats.final_treasury < session.state().treasury.insolvency_floor());
    assert_eq!(summary.floor_adjustment, Some(Decimal::from(5_000)));
    assert_eq!(session.state().status, SessionStatus::Lost);
    assert!(session.advance_day().is_none());
}

#[test]
fn simultaneous_win_and_lose_is_victory() {
    let mut config = quiet_config();
    config.session.starting_treasury = Decimal::from(400_000);
    config.economy.insolvency_floor = Decimal::from(300_000);
    let mut session = Session::new(&config).unwrap();
    let outcome = session.apply_penalty(penalty(140_000)).unwrap();
    assert!(outcome.insolvent);

    let end = session.advance_day().unwrap().end.unwrap();
    assert!(end.is_victory);
    assert_eq!(end.end_condition_id, "moonshot");
    assert_eq!(end.stats.final_treasury, Decimal::from(260_000));
    assert_eq!(session.state().status, SessionStatus::Won);
}

#[test]
fn sandbox_keeps_milestones_running() {
    let mut config = quiet_config();
    config.session.starting_treasury = Decimal::from(300_000);
    let mut session = Session::new(&config).unwrap();

    let end = session.advance_day().unwrap().end.unwrap();
    assert_eq!(end.end_condition_id, "moonshot");
    assert!(session.continue_in_sandbox());

    session
        .place_building(PlacementRequest::new(BuildingType::HodlerHousing, 3, 3))
        .unwrap();
    let summary = session.advance_day().unwrap();
    assert!(summary.end.is_none());
    assert_eq!(
        summary.milestones.first().map(|m| m.name.as_str()),
        Some("First Block")
    );
    assert!(session.state().sandbox);
    assert_eq!(session.state().end, Some(end));
}

#[test]
fn unaffordable_placement_changes_nothing() {
    let mut config = quiet_config();
    config.session.starting_treasury = Decimal::from(100);
    let mut session = Session::new(&config).unwrap();
    let before = session.state().clone();

    let err = session
        .place_building(PlacementRequest::new(BuildingType::Exchange, 0, 0))
        .unwrap_err();
    assert_eq!(
        err,
        PlacementError::InsufficientFunds {
            required: Decimal::from(2_000),
            available: Decimal::from(100),
        }
    );
    assert_eq!(session.state(), &before);
}
