//! Shared type definitions for the Cryptopolis simulation.
//!
//! This crate is the single source of truth for all types that cross crate
//! boundaries. Types defined here flow downstream to `TypeScript` via
//! `ts-rs` for the browser client (renderer, narrator, HUD panels).
//!
//! # Modules
//!
//! - [`ids`] -- Building and session identifiers
//! - [`enums`] -- Sentiment bands, building types, risk categories, event kinds
//! - [`structs`] -- Buildings, event and ledger records, end-of-game stats
//! - [`notifications`] -- Typed event-bus payloads

pub mod enums;
pub mod ids;
pub mod notifications;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BuildingType, EventKind, LedgerEntryKind, RiskCategory, SentimentBand, SessionStatus,
};
pub use ids::{BuildingId, SessionId};
pub use notifications::{
    BuildingDemolished, BuildingPlaced, DayChanged, DisasterStarted, GameEnded,
    MilestoneUnlocked, Notification, NotificationKind, RugPull, SentimentChanged,
};
pub use structs::{Building, EventRecord, GameEnd, GameEndStats, LedgerEntry, Tile};

#[cfg(test)]
mod tests {
    //! Triggers `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings into `bindings/` relative to the crate
        // root when `export_all` is called.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::BuildingId::export_all();
        let _ = crate::ids::SessionId::export_all();

        // Enums
        let _ = crate::enums::SentimentBand::export_all();
        let _ = crate::enums::BuildingType::export_all();
        let _ = crate::enums::RiskCategory::export_all();
        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::SessionStatus::export_all();
        let _ = crate::enums::LedgerEntryKind::export_all();

        // Structs
        let _ = crate::structs::Tile::export_all();
        let _ = crate::structs::Building::export_all();
        let _ = crate::structs::EventRecord::export_all();
        let _ = crate::structs::LedgerEntry::export_all();
        let _ = crate::structs::GameEndStats::export_all();
        let _ = crate::structs::GameEnd::export_all();

        // Notifications
        let _ = crate::notifications::Notification::export_all();
        let _ = crate::notifications::NotificationKind::export_all();
    }
}
