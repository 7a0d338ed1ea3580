//! Enumeration types for the Cryptopolis simulation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Market sentiment
// ---------------------------------------------------------------------------

/// Classification band of the market-sentiment index.
///
/// Bands are ordered from most fearful to most greedy and are always derived
/// from the scalar via [`SentimentBand::classify`] -- never stored on their
/// own as the source of truth.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum SentimentBand {
    /// Index in `[0, 20)`.
    ExtremeFear,
    /// Index in `[20, 40)`.
    Fear,
    /// Index in `[40, 60)`.
    Neutral,
    /// Index in `[60, 80)`.
    Greed,
    /// Index in `[80, 100]`.
    ExtremeGreed,
}

impl SentimentBand {
    /// All bands in ascending order.
    pub const ALL: [Self; 5] = [
        Self::ExtremeFear,
        Self::Fear,
        Self::Neutral,
        Self::Greed,
        Self::ExtremeGreed,
    ];

    /// Lower bounds of `Fear`, `Neutral`, `Greed`, and `ExtremeGreed`.
    const THRESHOLDS: [i64; 4] = [20, 40, 60, 80];

    /// Classify a sentiment scalar into its band.
    ///
    /// Values outside `[0, 100]` classify into the nearest extreme band, so
    /// the function is total.
    pub fn classify(value: Decimal) -> Self {
        let [fear, neutral, greed, extreme_greed] = Self::THRESHOLDS;
        if value < Decimal::from(fear) {
            Self::ExtremeFear
        } else if value < Decimal::from(neutral) {
            Self::Fear
        } else if value < Decimal::from(greed) {
            Self::Neutral
        } else if value < Decimal::from(extreme_greed) {
            Self::Greed
        } else {
            Self::ExtremeGreed
        }
    }

    /// Zero-based position of this band in [`SentimentBand::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::ExtremeFear => 0,
            Self::Fear => 1,
            Self::Neutral => 2,
            Self::Greed => 3,
            Self::ExtremeGreed => 4,
        }
    }

    /// Whether this is one of the two extreme bands.
    pub const fn is_extreme(self) -> bool {
        matches!(self, Self::ExtremeFear | Self::ExtremeGreed)
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtremeFear => "Extreme Fear",
            Self::Fear => "Fear",
            Self::Neutral => "Neutral",
            Self::Greed => "Greed",
            Self::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl core::fmt::Display for SentimentBand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// A type of building that can be placed in the city.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum BuildingType {
    /// Apartments for the city's holders. Houses population, small rent.
    HodlerHousing,
    /// Offline key storage. Low yield that rises in a panic.
    ColdStorageVault,
    /// Fully reserved stablecoin issuer. Safe-haven yield.
    StablecoinBank,
    /// Spot exchange collecting trading fees.
    Exchange,
    /// Proof-of-work mining operation.
    MiningFarm,
    /// Staking validator securing the chain.
    ValidatorNode,
    /// Meme-coin launch casino. Highest yield, highest rug risk.
    MemeCoinCasino,
    /// Digital collectibles gallery.
    NftGallery,
    /// Liquidity-mining farm chasing emissions.
    YieldFarm,
}

impl BuildingType {
    /// Every building type in catalog order.
    pub const ALL: [Self; 9] = [
        Self::HodlerHousing,
        Self::ColdStorageVault,
        Self::StablecoinBank,
        Self::Exchange,
        Self::MiningFarm,
        Self::ValidatorNode,
        Self::MemeCoinCasino,
        Self::NftGallery,
        Self::YieldFarm,
    ];
}

/// Risk category of a building type.
///
/// The category drives both the building's response to market sentiment and
/// its exposure to rug pulls.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum RiskCategory {
    /// Counter-cyclical: yields more when the market panics.
    SafeHaven,
    /// Pro-cyclical but durable.
    Established,
    /// Strongly pro-cyclical and the only rug-pull target.
    Speculative,
    /// Mostly insensitive to sentiment.
    Infrastructure,
    /// Houses population; sentiment-neutral.
    Residential,
}

// ---------------------------------------------------------------------------
// Events and session status
// ---------------------------------------------------------------------------

/// Kind of an [`EventRecord`](crate::EventRecord).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// Untargeted city-wide shock.
    Disaster,
    /// Targeted shock against a speculative building.
    RugPull,
    /// Positive achievement; never ends the session.
    Milestone,
}

/// Objective state machine of a session.
///
/// `Running` is initial; `Won` and `Lost` are terminal unless the player
/// explicitly continues in sandbox mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, Default,
)]
#[ts(export, export_to = "bindings/")]
pub enum SessionStatus {
    /// The session is live and conditions are being evaluated.
    #[default]
    Running,
    /// A win condition matched.
    Won,
    /// A lose condition matched.
    Lost,
}

impl SessionStatus {
    /// Whether this status ends economic ticking.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Category of a treasury ledger entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum LedgerEntryKind {
    /// Starting funds deposited when the session opens.
    Genesis,
    /// Yield credited by a building.
    Yield,
    /// Purchase price of a placed building.
    Construction,
    /// Partial refund on demolition.
    Salvage,
    /// Loss from a disaster.
    DisasterLoss,
    /// Loss from a rug pull.
    RugPullLoss,
    /// Milestone reward credit.
    MilestoneReward,
    /// Balance raised back to the insolvency floor after a tick.
    FloorAdjustment,
}

impl LedgerEntryKind {
    /// Whether entries of this kind add to the balance.
    pub const fn is_credit(self) -> bool {
        matches!(
            self,
            Self::Genesis
                | Self::Yield
                | Self::Salvage
                | Self::MilestoneReward
                | Self::FloorAdjustment
        )
    }
}
