//! Building blueprints.
//!
//! [`blueprint`] returns the static blueprint for each [`BuildingType`]:
//! price, base daily yield before sentiment, risk category, and how many
//! residents the building houses. The table is tuning data; the simulation
//! never hard-codes these numbers elsewhere.

use cryptopolis_types::{BuildingType, RiskCategory};
use rust_decimal::Decimal;
use serde::Serialize;

/// Static properties of a building type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildingBlueprint {
    /// The type this blueprint describes.
    pub building_type: BuildingType,
    /// Name shown to the player and used in notifications.
    pub display_name: &'static str,
    /// Risk category (sentiment response and rug-pull eligibility).
    pub risk_category: RiskCategory,
    /// Purchase price.
    pub cost: Decimal,
    /// Daily yield at neutral sentiment before risk adjustment.
    pub base_yield: Decimal,
    /// Residents housed.
    pub housing: u64,
}

/// Return the canonical blueprint for a given [`BuildingType`].
pub fn blueprint(building_type: BuildingType) -> BuildingBlueprint {
    let (display_name, risk_category, cost, base_yield, housing) = match building_type {
        // ---- Residential ----
        BuildingType::HodlerHousing => ("Hodler Housing", RiskCategory::Residential, 500, 5, 50),

        // ---- Safe havens ----
        BuildingType::ColdStorageVault => {
            ("Cold Storage Vault", RiskCategory::SafeHaven, 1_500, 20, 0)
        }
        BuildingType::StablecoinBank => ("Stablecoin Bank", RiskCategory::SafeHaven, 3_000, 45, 5),

        // ---- Established ----
        BuildingType::Exchange => ("Exchange", RiskCategory::Established, 2_000, 50, 10),
        BuildingType::MiningFarm => ("Mining Farm", RiskCategory::Established, 2_500, 60, 8),

        // ---- Infrastructure ----
        BuildingType::ValidatorNode => {
            ("Validator Node", RiskCategory::Infrastructure, 1_200, 25, 2)
        }

        // ---- Speculative ----
        BuildingType::MemeCoinCasino => {
            ("Meme Coin Casino", RiskCategory::Speculative, 1_000, 40, 5)
        }
        BuildingType::NftGallery => ("NFT Gallery", RiskCategory::Speculative, 800, 30, 3),
        BuildingType::YieldFarm => ("Yield Farm", RiskCategory::Speculative, 1_800, 60, 4),
    };

    BuildingBlueprint {
        building_type,
        display_name,
        risk_category,
        cost: Decimal::from(cost),
        base_yield: Decimal::from(base_yield),
        housing,
    }
}

/// The lowest purchase price in the catalog.
pub fn cheapest_cost() -> Decimal {
    BuildingType::ALL
        .iter()
        .map(|t| blueprint(*t).cost)
        .min()
        .unwrap_or(Decimal::ZERO)
}
