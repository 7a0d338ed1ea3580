//! Typed notifications published on the event bus.
//!
//! Every notification the simulation emits for the renderer, audio,
//! narrator, accessibility, and end-of-game UI is a variant of
//! [`Notification`] with its own payload struct. Consumers filter by
//! [`NotificationKind`] instead of matching on event-name strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::SentimentBand;
use crate::structs::GameEndStats;

/// A new day began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DayChanged {
    /// The day that just started.
    pub day: u64,
}

/// A building was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildingPlaced {
    /// Catalog display name.
    pub building_name: String,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
}

/// A building was demolished by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildingDemolished {
    /// Catalog display name.
    pub building_name: String,
    /// Salvage credited back to the treasury.
    #[ts(as = "String")]
    pub refund: Decimal,
}

/// A speculative building was rugged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RugPull {
    /// Catalog display name of the target.
    pub building_name: String,
    /// Amount debited from the treasury.
    #[ts(as = "String")]
    pub treasury_loss: Decimal,
}

/// A city-wide disaster struck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterStarted {
    /// Disaster name.
    pub name: String,
    /// Flavour text for the narrator.
    pub description: String,
}

/// A milestone was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MilestoneUnlocked {
    /// Milestone name.
    pub name: String,
    /// Human-readable reward description.
    pub reward: String,
}

/// The sentiment index crossed into a different band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SentimentChanged {
    /// The new band.
    pub band: SentimentBand,
    /// The scalar that produced it.
    #[ts(as = "String")]
    pub value: Decimal,
}

/// The session reached a win or lose condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameEnded {
    /// Whether a win condition matched.
    pub is_victory: bool,
    /// Identifier of the matching condition.
    pub end_condition_id: String,
    /// Statistics captured at the match.
    pub stats: GameEndStats,
}

/// Any notification carried by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type")]
pub enum Notification {
    /// See [`DayChanged`].
    DayChanged(DayChanged),
    /// See [`BuildingPlaced`].
    BuildingPlaced(BuildingPlaced),
    /// See [`BuildingDemolished`].
    BuildingDemolished(BuildingDemolished),
    /// See [`RugPull`].
    RugPull(RugPull),
    /// See [`DisasterStarted`].
    DisasterStarted(DisasterStarted),
    /// See [`MilestoneUnlocked`].
    MilestoneUnlocked(MilestoneUnlocked),
    /// See [`SentimentChanged`].
    SentimentChanged(SentimentChanged),
    /// See [`GameEnded`].
    GameEnd(GameEnded),
}

impl Notification {
    /// The discriminant of this notification, for subscription filters.
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::DayChanged(_) => NotificationKind::DayChanged,
            Self::BuildingPlaced(_) => NotificationKind::BuildingPlaced,
            Self::BuildingDemolished(_) => NotificationKind::BuildingDemolished,
            Self::RugPull(_) => NotificationKind::RugPull,
            Self::DisasterStarted(_) => NotificationKind::DisasterStarted,
            Self::MilestoneUnlocked(_) => NotificationKind::MilestoneUnlocked,
            Self::SentimentChanged(_) => NotificationKind::SentimentChanged,
            Self::GameEnd(_) => NotificationKind::GameEnd,
        }
    }
}

/// Payload-free discriminant of [`Notification`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum NotificationKind {
    /// [`Notification::DayChanged`].
    DayChanged,
    /// [`Notification::BuildingPlaced`].
    BuildingPlaced,
    /// [`Notification::BuildingDemolished`].
    BuildingDemolished,
    /// [`Notification::RugPull`].
    RugPull,
    /// [`Notification::DisasterStarted`].
    DisasterStarted,
    /// [`Notification::MilestoneUnlocked`].
    MilestoneUnlocked,
    /// [`Notification::SentimentChanged`].
    SentimentChanged,
    /// [`Notification::GameEnd`].
    GameEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let n = Notification::DayChanged(DayChanged { day: 3 });
        assert_eq!(n.kind(), NotificationKind::DayChanged);

        let n = Notification::RugPull(RugPull {
            building_name: "Meme Coin Casino".to_owned(),
            treasury_loss: Decimal::from(900),
        });
        assert_eq!(n.kind(), NotificationKind::RugPull);
    }

    #[test]
    fn notifications_are_tagged_on_the_wire() {
        let n = Notification::BuildingPlaced(BuildingPlaced {
            building_name: "Exchange".to_owned(),
            x: 4,
            y: -2,
        });
        let json = serde_json::to_value(&n).unwrap_or_default();
        assert_eq!(json["type"], "BuildingPlaced");
        assert_eq!(json["building_name"], "Exchange");
        assert_eq!(json["x"], 4);
    }
}
