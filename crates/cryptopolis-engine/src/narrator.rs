//! Log-based consumers for notifications and day summaries.
//!
//! The headless engine has no renderer or audio; instead every notification
//! is narrated as a structured log line, and every day summary is logged by
//! a [`TickCallback`].

use cryptopolis_core::runner::TickCallback;
use cryptopolis_core::state::GameState;
use cryptopolis_core::tick::TickSummary;
use cryptopolis_events::Handler;
use cryptopolis_types::Notification;
use tracing::{debug, info, warn};

/// Bus handler that narrates every notification.
pub fn handler() -> Handler {
    Box::new(narrate)
}

fn narrate(notification: &Notification) {
    match notification {
        Notification::DayChanged(n) => debug!(day = n.day, "New day"),
        Notification::BuildingPlaced(n) => {
            info!(building = %n.building_name, x = n.x, y = n.y, "Building placed");
        }
        Notification::BuildingDemolished(n) => {
            info!(building = %n.building_name, refund = %n.refund, "Building demolished");
        }
        Notification::RugPull(n) => {
            warn!(building = %n.building_name, loss = %n.treasury_loss, "Rug pull");
        }
        Notification::DisasterStarted(n) => {
            warn!(disaster = %n.name, description = %n.description, "Disaster");
        }
        Notification::MilestoneUnlocked(n) => {
            info!(milestone = %n.name, reward = %n.reward, "Milestone unlocked");
        }
        Notification::SentimentChanged(n) => {
            info!(band = %n.band, value = %n.value, "Market mood shifted");
        }
        Notification::GameEnd(n) => {
            info!(
                is_victory = n.is_victory,
                condition = %n.end_condition_id,
                days_survived = n.stats.days_survived,
                "Game over"
            );
        }
    }
}

/// Tick callback that logs each day's summary and its anomalies.
pub struct SummaryLogger;

impl TickCallback for SummaryLogger {
    fn on_tick(&mut self, summary: &TickSummary, state: &GameState) {
        debug!(
            day = summary.day,
            band = %summary.band,
            sentiment = %summary.sentiment,
            income = %summary.income,
            treasury = %summary.treasury,
            tvl = %summary.tvl,
            population = summary.population,
            buildings = summary.building_count,
            milestones = state.milestones.len(),
            "Day summary"
        );
        for anomaly in &summary.anomalies {
            warn!(day = summary.day, ?anomaly, "Anomaly during day");
        }
    }
}
